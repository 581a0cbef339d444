use std::path::Path;

use clap::Args;
use colored::Colorize;
use quarry_common::config::Config;
use quarry_common::error::Result;
use quarry_common::model::variant::VariantKind;
use quarry_common::RecipeRegistry;

#[derive(Args, Debug)]
pub struct Info {
    /// Recipe name
    pub name: String,
}

impl Info {
    pub fn run(&self, _config: &Config, recipes_dir: &Path) -> Result<()> {
        let registry = RecipeRegistry::load(recipes_dir)?;
        let recipe = registry.get(&self.name)?;

        println!("{}", recipe.name.bold());
        if let Some(description) = &recipe.description {
            println!("  {description}");
        }
        if let Some(homepage) = &recipe.homepage {
            println!("  {}", homepage.underline());
        }
        println!("  installer: {}", recipe.installer);

        println!("\n{}", "Versions".bold());
        let mut versions: Vec<_> = recipe.versions.iter().collect();
        versions.sort_by(|a, b| b.version.cmp(&a.version));
        for entry in versions {
            println!("  {}  {}", entry.version, entry.sha256.dimmed());
        }

        if !recipe.variants.is_empty() {
            println!("\n{}", "Variants".bold());
            for variant in &recipe.variants {
                let (kind, default) = match &variant.kind {
                    VariantKind::Bool { default } => ("bool".to_string(), default.to_string()),
                    VariantKind::Enum { values, default } => {
                        (format!("[{}]", values.join(", ")), default.clone())
                    }
                };
                println!(
                    "  {}  {}  default={}  {}",
                    variant.name.cyan(),
                    kind,
                    default,
                    variant.description.as_deref().unwrap_or("")
                );
            }
        }

        if !recipe.dependencies.is_empty() {
            println!("\n{}", "Dependencies".bold());
            for edge in &recipe.dependencies {
                println!("  {edge}");
            }
        }
        Ok(())
    }
}
