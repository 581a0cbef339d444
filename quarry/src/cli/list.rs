use std::collections::BTreeMap;
use std::path::Path;

use clap::Args;
use colored::Colorize;
use prettytable::{format, Cell, Row, Table};
use quarry_common::config::Config;
use quarry_common::error::Result;
use quarry_common::RecipeRegistry;
use quarry_core::PrefixStore;

#[derive(Args, Debug)]
pub struct List {}

impl List {
    pub fn run(&self, config: &Config, recipes_dir: &Path) -> Result<()> {
        let registry = RecipeRegistry::load(recipes_dir)?;
        if registry.is_empty() {
            println!("{}", "0 recipes available".yellow());
            return Ok(());
        }

        let store = PrefixStore::new(config.store_dir());
        let mut installed: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, version) in store.list_installed()? {
            installed.entry(name).or_default().push(version);
        }

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
        table.add_row(Row::new(vec![
            Cell::new("Name").style_spec("b"),
            Cell::new("Latest").style_spec("b"),
            Cell::new("Installed").style_spec("b"),
            Cell::new("Description").style_spec("b"),
        ]));

        for name in registry.names() {
            let recipe = registry.get(name)?;
            let latest = recipe
                .preferred_version()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string());
            let installed_versions = installed
                .get(name)
                .map(|versions| versions.join(", "))
                .unwrap_or_else(|| "-".to_string());
            table.add_row(Row::new(vec![
                Cell::new(name).style_spec("Fb"),
                Cell::new(&latest),
                Cell::new(&installed_versions).style_spec("Fg"),
                Cell::new(recipe.description.as_deref().unwrap_or("")),
            ]));
        }
        table.printstd();
        println!("{} recipes", registry.len());
        Ok(())
    }
}
