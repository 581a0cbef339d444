//! Build variant declarations and override validation.
//!
//! A variant is a named build-time option with a constrained value domain:
//! boolean, or an enumeration with a fixed value set. Values are typed from
//! the moment a request enters the system; nothing downstream compares loose
//! strings.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{QuarryError, Result};
use crate::model::recipe::Recipe;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VariantKind {
    Bool { default: bool },
    Enum { values: Vec<String>, default: String },
}

/// A declared build option on a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantDef {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub kind: VariantKind,
}

impl VariantDef {
    pub fn default_value(&self) -> VariantValue {
        match &self.kind {
            VariantKind::Bool { default } => VariantValue::Bool(*default),
            VariantKind::Enum { default, .. } => VariantValue::Choice(default.clone()),
        }
    }

    /// Human description of the accepted domain, used in diagnostics.
    pub fn domain(&self) -> String {
        match &self.kind {
            VariantKind::Bool { .. } => "true or false".to_string(),
            VariantKind::Enum { values, .. } => format!("one of [{}]", values.join(", ")),
        }
    }

    pub fn accepts(&self, value: &VariantValue) -> bool {
        match (&self.kind, value) {
            (VariantKind::Bool { .. }, VariantValue::Bool(_)) => true,
            (VariantKind::Enum { values, .. }, VariantValue::Choice(c)) => {
                values.iter().any(|v| v == c)
            }
            _ => false,
        }
    }

    /// Load-time structural check for a single definition.
    pub(crate) fn validate(&self, recipe_name: &str) -> Result<()> {
        if let VariantKind::Enum { values, default } = &self.kind {
            if values.is_empty() {
                return Err(QuarryError::RecipeDefinition(format!(
                    "recipe '{recipe_name}': variant '{}' declares an empty value set",
                    self.name
                )));
            }
            if !values.iter().any(|v| v == default) {
                return Err(QuarryError::RecipeDefinition(format!(
                    "recipe '{recipe_name}': default '{default}' of variant '{}' is not in its value set",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// A concrete variant value, carrying its declared type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariantValue {
    Bool(bool),
    Choice(String),
}

impl fmt::Display for VariantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantValue::Bool(b) => write!(f, "{b}"),
            VariantValue::Choice(c) => write!(f, "{c}"),
        }
    }
}

/// Validate requested overrides against a recipe's declared variants.
///
/// Pure over immutable inputs: unknown names fail with `UnknownVariant`,
/// out-of-domain values fail with `InvalidVariant` (never clamped), and
/// unspecified variants fall back to their declared defaults.
pub fn validate_overrides(
    recipe: &Recipe,
    overrides: &BTreeMap<String, VariantValue>,
) -> Result<BTreeMap<String, VariantValue>> {
    let mut resolved: BTreeMap<String, VariantValue> = recipe
        .variants
        .iter()
        .map(|def| (def.name.clone(), def.default_value()))
        .collect();

    for (name, value) in overrides {
        let def = recipe.variant(name).ok_or_else(|| QuarryError::UnknownVariant {
            recipe: recipe.name.clone(),
            variant: name.clone(),
        })?;
        if !def.accepts(value) {
            return Err(QuarryError::InvalidVariant {
                recipe: recipe.name.clone(),
                variant: name.clone(),
                value: value.to_string(),
                expected: def.domain(),
            });
        }
        resolved.insert(name.clone(), value.clone());
    }

    Ok(resolved)
}

/// Parse a raw `name=value` override string against the variant's declared
/// kind. Booleans accept only `true`/`false`; anything else is typed as an
/// enumeration choice and checked for membership by `validate_overrides`.
pub fn parse_override(recipe: &Recipe, name: &str, raw: &str) -> Result<VariantValue> {
    let def = recipe.variant(name).ok_or_else(|| QuarryError::UnknownVariant {
        recipe: recipe.name.clone(),
        variant: name.to_string(),
    })?;
    match &def.kind {
        VariantKind::Bool { .. } => match raw {
            "true" => Ok(VariantValue::Bool(true)),
            "false" => Ok(VariantValue::Bool(false)),
            other => Err(QuarryError::InvalidVariant {
                recipe: recipe.name.clone(),
                variant: name.to_string(),
                value: other.to_string(),
                expected: def.domain(),
            }),
        },
        VariantKind::Enum { .. } => Ok(VariantValue::Choice(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::recipe::{Recipe, VersionEntry};
    use crate::model::version::Version;

    fn recipe_with_variants(variants: Vec<VariantDef>) -> Recipe {
        Recipe {
            name: "demo".to_string(),
            description: None,
            homepage: None,
            installer: "autotools".to_string(),
            versions: vec![VersionEntry {
                version: Version::parse("1.0").unwrap(),
                sha256: "0".repeat(64),
            }],
            variants,
            dependencies: Vec::new(),
        }
    }

    fn bool_variant(name: &str, default: bool) -> VariantDef {
        VariantDef {
            name: name.to_string(),
            description: None,
            kind: VariantKind::Bool { default },
        }
    }

    fn enum_variant(name: &str, values: &[&str], default: &str) -> VariantDef {
        VariantDef {
            name: name.to_string(),
            description: None,
            kind: VariantKind::Enum {
                values: values.iter().map(|s| s.to_string()).collect(),
                default: default.to_string(),
            },
        }
    }

    #[test]
    fn test_defaults_fill_unspecified() {
        let recipe = recipe_with_variants(vec![
            bool_variant("shared", true),
            enum_variant("build_type", &["Release", "Debug"], "Release"),
        ]);
        let resolved = validate_overrides(&recipe, &BTreeMap::new()).unwrap();
        assert_eq!(resolved["shared"], VariantValue::Bool(true));
        assert_eq!(
            resolved["build_type"],
            VariantValue::Choice("Release".to_string())
        );
    }

    #[test]
    fn test_unknown_variant_rejected() {
        let recipe = recipe_with_variants(vec![bool_variant("shared", true)]);
        let mut overrides = BTreeMap::new();
        overrides.insert("static".to_string(), VariantValue::Bool(true));
        let err = validate_overrides(&recipe, &overrides).unwrap_err();
        assert!(matches!(err, QuarryError::UnknownVariant { .. }));
    }

    #[test]
    fn test_out_of_domain_never_clamps() {
        let recipe = recipe_with_variants(vec![enum_variant(
            "build_type",
            &["Release", "Debug"],
            "Release",
        )]);
        let mut overrides = BTreeMap::new();
        overrides.insert(
            "build_type".to_string(),
            VariantValue::Choice("Profile".to_string()),
        );
        let err = validate_overrides(&recipe, &overrides).unwrap_err();
        assert!(matches!(err, QuarryError::InvalidVariant { .. }));

        // a boolean variant rejects an enumeration value outright
        let recipe = recipe_with_variants(vec![bool_variant("shared", false)]);
        let mut overrides = BTreeMap::new();
        overrides.insert("shared".to_string(), VariantValue::Choice("yes".to_string()));
        assert!(matches!(
            validate_overrides(&recipe, &overrides),
            Err(QuarryError::InvalidVariant { .. })
        ));
    }

    #[test]
    fn test_parse_override_typed_by_kind() {
        let recipe = recipe_with_variants(vec![
            bool_variant("shared", true),
            enum_variant("threads", &["none", "openmp"], "none"),
        ]);
        assert_eq!(
            parse_override(&recipe, "shared", "false").unwrap(),
            VariantValue::Bool(false)
        );
        assert!(parse_override(&recipe, "shared", "off").is_err());
        assert_eq!(
            parse_override(&recipe, "threads", "openmp").unwrap(),
            VariantValue::Choice("openmp".to_string())
        );
    }

    #[test]
    fn test_enum_default_outside_domain_is_definition_error() {
        let def = enum_variant("threads", &["none", "openmp"], "pthreads");
        assert!(matches!(
            def.validate("demo"),
            Err(QuarryError::RecipeDefinition(_))
        ));
    }
}
