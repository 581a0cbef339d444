use std::path::Path;

use clap::Args;
use colored::Colorize;
use quarry_common::config::Config;
use quarry_common::dependency::Resolver;
use quarry_common::error::Result;
use quarry_common::RecipeRegistry;

use super::{parse_overrides, parse_spec_arg};

#[derive(Args, Debug)]
pub struct Resolve {
    /// Spec to resolve, e.g. `hdf5` or `scalapack@2.2.1`
    pub spec: String,

    /// Variant overrides for the root, e.g. `--with mpi=true`
    #[arg(long = "with", value_name = "NAME=VALUE")]
    pub with: Vec<String>,
}

impl Resolve {
    pub fn run(&self, config: &Config, recipes_dir: &Path) -> Result<()> {
        let registry = RecipeRegistry::load(recipes_dir)?;
        let (root, constraint) = parse_spec_arg(&self.spec)?;
        let overrides = parse_overrides(&registry, &root, &self.with)?;

        let resolver = Resolver::new(&registry, config.toolchain.clone());
        let graph = resolver.resolve_pinned(&root, constraint, &overrides)?;

        println!(
            "{} ({} specs, install order)",
            self.spec.bold(),
            graph.len()
        );
        for name in graph.install_order() {
            let spec = graph.get(&name).expect("ordered node is in graph");
            let dependencies: Vec<&str> = graph.dependencies_of(&name).collect();
            if dependencies.is_empty() {
                println!("  {spec}");
            } else {
                println!("  {spec}  {} {}", "<-".dimmed(), dependencies.join(", ").dimmed());
            }
        }
        Ok(())
    }
}
