// quarry-common/src/model/recipe.rs
// A recipe is a named package's static build/install declaration. Created at
// load time from its JSON file and immutable thereafter; shared as
// Arc<Recipe> between the registry, the resolver and install planning.

use std::collections::HashSet;

use serde::Deserialize;

use crate::dependency::DependencyEdge;
use crate::error::{QuarryError, Result};
use crate::model::variant::VariantDef;
use crate::model::version::Version;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionEntry {
    pub version: Version,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Recipe {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    /// Identifier of the install-step implementation for this recipe,
    /// looked up in the adapter registry at install time.
    pub installer: String,
    pub versions: Vec<VersionEntry>,
    #[serde(default)]
    pub variants: Vec<VariantDef>,
    #[serde(default)]
    pub dependencies: Vec<DependencyEdge>,
}

impl Recipe {
    pub fn variant(&self, name: &str) -> Option<&VariantDef> {
        self.variants.iter().find(|v| v.name == name)
    }

    /// Highest declared version.
    pub fn preferred_version(&self) -> Option<&Version> {
        self.versions.iter().map(|e| &e.version).max()
    }

    pub fn has_version(&self, version: &Version) -> bool {
        self.versions.iter().any(|e| &e.version == version)
    }

    /// Structural validation of a single recipe, run by the registry before
    /// it serves anything. Cross-recipe checks (dangling edge targets) live
    /// in the registry itself.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(QuarryError::RecipeDefinition(
                "recipe with empty name".to_string(),
            ));
        }
        if self.installer.trim().is_empty() {
            return Err(QuarryError::RecipeDefinition(format!(
                "recipe '{}': empty installer identifier",
                self.name
            )));
        }
        if self.versions.is_empty() {
            return Err(QuarryError::RecipeDefinition(format!(
                "recipe '{}': no versions declared",
                self.name
            )));
        }

        let mut seen_versions = HashSet::new();
        for entry in &self.versions {
            if !seen_versions.insert(&entry.version) {
                return Err(QuarryError::RecipeDefinition(format!(
                    "recipe '{}': duplicate version '{}'",
                    self.name, entry.version
                )));
            }
        }

        let mut seen_variants = HashSet::new();
        for def in &self.variants {
            if !seen_variants.insert(def.name.as_str()) {
                return Err(QuarryError::RecipeDefinition(format!(
                    "recipe '{}': duplicate variant '{}'",
                    self.name, def.name
                )));
            }
            def.validate(&self.name)?;
        }

        for edge in &self.dependencies {
            if edge.target.trim().is_empty() {
                return Err(QuarryError::RecipeDefinition(format!(
                    "recipe '{}': dependency edge with empty target",
                    self.name
                )));
            }
            if edge.tags.is_empty() {
                return Err(QuarryError::RecipeDefinition(format!(
                    "recipe '{}': dependency on '{}' declares no classifiers",
                    self.name, edge.target
                )));
            }
            if let Some(condition) = &edge.when {
                condition.validate(self, &edge.target)?;
            }
        }

        Ok(())
    }
}
