use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use colored::Colorize;
use quarry_common::config::Config;
use quarry_common::dependency::{ResolvedGraph, Resolver};
use quarry_common::error::Result;
use quarry_common::RecipeRegistry;
use quarry_core::{
    AdapterRegistry, InstallEngine, InstallPlanner, PrefixStore, ProcessExecutor,
};

use super::{parse_overrides, parse_spec_arg};

#[derive(Args, Debug)]
pub struct Install {
    /// Spec to install, e.g. `hdf5` or `scalapack@2.2.1`
    pub spec: String,

    /// Variant overrides for the root, e.g. `--with mpi=true`
    #[arg(long = "with", value_name = "NAME=VALUE")]
    pub with: Vec<String>,

    /// Print each node's planned actions instead of executing them
    #[arg(long)]
    pub dry_run: bool,

    /// Number of concurrent install workers
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,
}

impl Install {
    pub fn run(&self, config: &Config, recipes_dir: &Path) -> Result<()> {
        let registry = RecipeRegistry::load(recipes_dir)?;
        let (root, constraint) = parse_spec_arg(&self.spec)?;
        let overrides = parse_overrides(&registry, &root, &self.with)?;

        let resolver = Resolver::new(&registry, config.toolchain.clone());
        let graph = resolver.resolve_pinned(&root, constraint, &overrides)?;

        if self.dry_run {
            return self.print_plans(config, &graph);
        }

        let store = Arc::new(PrefixStore::new(config.store_dir()));
        let mut engine = InstallEngine::new(
            AdapterRegistry::builtin(),
            Arc::new(ProcessExecutor),
            store,
        );
        if let Some(jobs) = self.jobs {
            engine = engine.with_jobs(jobs);
        }

        let report = engine.run(&graph)?;
        for name in &report.succeeded {
            println!("{} {name}", "installed".green());
        }
        for name in &report.reused {
            println!("{} {name}", "reused".cyan());
        }
        for (name, error) in &report.failed {
            println!("{} {name}: {error}", "failed".red().bold());
        }
        for (name, cause) in &report.skipped {
            println!("{} {name} (dependency '{cause}' failed)", "skipped".yellow());
        }
        if !report.all_ok() {
            println!(
                "{}",
                format!(
                    "{} installed, {} failed, {} skipped",
                    report.succeeded.len() + report.reused.len(),
                    report.failed.len(),
                    report.skipped.len()
                )
                .bold()
            );
        }
        Ok(())
    }

    fn print_plans(&self, config: &Config, graph: &ResolvedGraph) -> Result<()> {
        let adapters = AdapterRegistry::builtin();
        let store = PrefixStore::new(config.store_dir());
        for name in graph.install_order() {
            let spec = graph.get(&name).expect("ordered node is in graph");
            let planner = adapters.get(&spec.recipe.installer)?;
            let prefix = store.prefix_path(&name, &spec.version);
            let dependency_prefixes: HashMap<String, PathBuf> = graph
                .dependencies_of(&name)
                .map(|dep| {
                    let dep_spec = graph.get(dep).expect("dependency is in graph");
                    (dep.to_string(), store.prefix_path(dep, &dep_spec.version))
                })
                .collect();

            println!("{}", spec.to_string().bold());
            for action in planner.plan(spec, &prefix, &dependency_prefixes)? {
                println!("  {action}");
            }
        }
        Ok(())
    }
}
