// quarry/src/cli.rs
use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use quarry_common::error::{QuarryError, Result};
use quarry_common::model::variant::{self, VariantValue};
use quarry_common::model::VersionConstraint;
use quarry_common::RecipeRegistry;

pub mod info;
pub mod install;
pub mod list;
pub mod resolve;

#[derive(Parser, Debug)]
#[command(
    name = "quarry",
    version,
    about = "Recipe-driven source-build package manager"
)]
pub struct CliArgs {
    /// Increase logging verbosity (-v, -vv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Recipe directory (defaults to QUARRY_RECIPES or <root>/recipes)
    #[arg(long, global = true)]
    pub recipes: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List available recipes
    List(list::List),
    /// Show a recipe's versions, variants and dependency edges
    Info(info::Info),
    /// Resolve a spec into its dependency graph without installing
    Resolve(resolve::Resolve),
    /// Resolve a spec and run its install plans
    Install(install::Install),
}

/// Parse a `name` or `name@<constraint>` spec argument.
pub(crate) fn parse_spec_arg(arg: &str) -> Result<(String, VersionConstraint)> {
    match arg.split_once('@') {
        Some((name, constraint)) => Ok((name.to_string(), VersionConstraint::parse(constraint)?)),
        None => Ok((arg.to_string(), VersionConstraint::Any)),
    }
}

/// Parse `--with name=value` overrides against the root recipe's declared
/// variants.
pub(crate) fn parse_overrides(
    registry: &RecipeRegistry,
    root: &str,
    with: &[String],
) -> Result<BTreeMap<String, VariantValue>> {
    let recipe = registry.get(root)?;
    let mut overrides = BTreeMap::new();
    for raw in with {
        let (name, value) = raw.split_once('=').ok_or_else(|| {
            QuarryError::Config(format!(
                "invalid variant override '{raw}', expected name=value"
            ))
        })?;
        overrides.insert(name.to_string(), variant::parse_override(&recipe, name, value)?);
    }
    Ok(overrides)
}
