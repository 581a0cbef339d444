// quarry-common/src/registry.rs
// The recipe registry: loaded once, validated as a whole, immutable
// afterwards. Either every recipe in the set is structurally valid or the
// registry refuses to serve resolution requests at all.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::error::{QuarryError, Result};
use crate::model::recipe::Recipe;

#[derive(Debug)]
pub struct RecipeRegistry {
    recipes: BTreeMap<String, Arc<Recipe>>,
}

impl RecipeRegistry {
    /// Load every `*.json` recipe under a directory.
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(QuarryError::Config(format!(
                "recipe directory '{}' does not exist",
                dir.display()
            )));
        }

        let mut recipes = Vec::new();
        let mut entries: Vec<_> = fs::read_dir(dir)?
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        entries.sort();

        for path in entries {
            let raw = fs::read_to_string(&path)?;
            let recipe: Recipe = serde_json::from_str(&raw).map_err(|e| {
                QuarryError::RecipeDefinition(format!("{}: {e}", path.display()))
            })?;
            debug!("Parsed recipe '{}' from {}", recipe.name, path.display());
            recipes.push(recipe);
        }

        Self::from_recipes(recipes)
    }

    /// Build a registry from in-memory recipes, applying the same
    /// validation as `load`.
    pub fn from_recipes(recipes: Vec<Recipe>) -> Result<Self> {
        let mut map: BTreeMap<String, Arc<Recipe>> = BTreeMap::new();
        for recipe in recipes {
            recipe.validate()?;
            let name = recipe.name.clone();
            if map.insert(name.clone(), Arc::new(recipe)).is_some() {
                return Err(QuarryError::RecipeDefinition(format!(
                    "duplicate recipe name '{name}'"
                )));
            }
        }

        // Cross-recipe check: a dangling edge target fails here, never at
        // resolution time.
        for recipe in map.values() {
            for edge in &recipe.dependencies {
                if !map.contains_key(&edge.target) {
                    return Err(QuarryError::RecipeDefinition(format!(
                        "recipe '{}': dependency on unknown recipe '{}'",
                        recipe.name, edge.target
                    )));
                }
            }
        }

        debug!("Recipe registry validated with {} recipes", map.len());
        Ok(Self { recipes: map })
    }

    pub fn get(&self, name: &str) -> Result<Arc<Recipe>> {
        self.recipes
            .get(name)
            .cloned()
            .ok_or_else(|| QuarryError::NotFound(format!("recipe '{name}' not in registry")))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.recipes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}
