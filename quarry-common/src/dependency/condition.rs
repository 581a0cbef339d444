//! Conditional dependency predicates.
//!
//! Conditions are a small closed expression grammar over variant values and
//! the toolchain identity, carried as data so the registry can validate them
//! structurally at load time. Evaluation is pure and total: an ill-formed
//! condition is a load-time error, never a resolution-time one.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{QuarryError, Result};
use crate::model::recipe::Recipe;
use crate::model::spec::ResolvedSpec;
use crate::model::variant::{VariantKind, VariantValue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    VariantEquals {
        variant: String,
        value: VariantValue,
    },
    VariantIn {
        variant: String,
        any_of: Vec<String>,
    },
    CompilerIs {
        any_of: Vec<String>,
    },
    PlatformIs {
        any_of: Vec<String>,
    },
    All {
        conditions: Vec<Condition>,
    },
    AnyOf {
        conditions: Vec<Condition>,
    },
    Not {
        condition: Box<Condition>,
    },
}

impl Condition {
    /// Decide whether the edge guarded by this condition is active for a
    /// concrete resolved spec.
    pub fn eval(&self, spec: &ResolvedSpec) -> bool {
        match self {
            Condition::VariantEquals { variant, value } => {
                spec.variant_value(variant) == Some(value)
            }
            Condition::VariantIn { variant, any_of } => match spec.variant_value(variant) {
                Some(VariantValue::Choice(choice)) => any_of.iter().any(|v| v == choice),
                _ => false,
            },
            Condition::CompilerIs { any_of } => any_of
                .iter()
                .any(|name| name.eq_ignore_ascii_case(spec.toolchain.compiler.name())),
            Condition::PlatformIs { any_of } => any_of
                .iter()
                .any(|name| name.eq_ignore_ascii_case(&spec.toolchain.platform)),
            Condition::All { conditions } => conditions.iter().all(|c| c.eval(spec)),
            Condition::AnyOf { conditions } => conditions.iter().any(|c| c.eval(spec)),
            Condition::Not { condition } => !condition.eval(spec),
        }
    }

    /// Load-time structural check against the declaring recipe.
    pub(crate) fn validate(&self, recipe: &Recipe, edge_target: &str) -> Result<()> {
        let fail = |msg: String| {
            Err(QuarryError::RecipeDefinition(format!(
                "recipe '{}': condition on dependency '{edge_target}': {msg}",
                recipe.name
            )))
        };

        match self {
            Condition::VariantEquals { variant, value } => {
                let Some(def) = recipe.variant(variant) else {
                    return fail(format!("references unknown variant '{variant}'"));
                };
                if !def.accepts(value) {
                    return fail(format!(
                        "value '{value}' is outside the domain of variant '{variant}' ({})",
                        def.domain()
                    ));
                }
                Ok(())
            }
            Condition::VariantIn { variant, any_of } => {
                let Some(def) = recipe.variant(variant) else {
                    return fail(format!("references unknown variant '{variant}'"));
                };
                if any_of.is_empty() {
                    return fail(format!("empty value set for variant '{variant}'"));
                }
                match &def.kind {
                    VariantKind::Enum { values, .. } => {
                        for candidate in any_of {
                            if !values.iter().any(|v| v == candidate) {
                                return fail(format!(
                                    "value '{candidate}' is outside the domain of variant '{variant}' ({})",
                                    def.domain()
                                ));
                            }
                        }
                        Ok(())
                    }
                    VariantKind::Bool { .. } => fail(format!(
                        "membership test on boolean variant '{variant}'"
                    )),
                }
            }
            Condition::CompilerIs { any_of } | Condition::PlatformIs { any_of } => {
                if any_of.is_empty() {
                    fail("empty membership set".to_string())
                } else {
                    Ok(())
                }
            }
            Condition::All { conditions } | Condition::AnyOf { conditions } => {
                if conditions.is_empty() {
                    return fail("empty condition list".to_string());
                }
                for condition in conditions {
                    condition.validate(recipe, edge_target)?;
                }
                Ok(())
            }
            Condition::Not { condition } => condition.validate(recipe, edge_target),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::VariantEquals { variant, value } => write!(f, "{variant}={value}"),
            Condition::VariantIn { variant, any_of } => {
                write!(f, "{variant} in [{}]", any_of.join(", "))
            }
            Condition::CompilerIs { any_of } => write!(f, "%[{}]", any_of.join(", ")),
            Condition::PlatformIs { any_of } => write!(f, "platform in [{}]", any_of.join(", ")),
            Condition::All { conditions } => {
                let parts: Vec<String> = conditions.iter().map(|c| c.to_string()).collect();
                write!(f, "({})", parts.join(" and "))
            }
            Condition::AnyOf { conditions } => {
                let parts: Vec<String> = conditions.iter().map(|c| c.to_string()).collect();
                write!(f, "({})", parts.join(" or "))
            }
            Condition::Not { condition } => write!(f, "not {condition}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::*;
    use crate::model::recipe::{Recipe, VersionEntry};
    use crate::model::spec::{CompilerFamily, Toolchain};
    use crate::model::variant::VariantDef;
    use crate::model::version::Version;

    fn demo_recipe() -> Recipe {
        Recipe {
            name: "demo".to_string(),
            description: None,
            homepage: None,
            installer: "autotools".to_string(),
            versions: vec![VersionEntry {
                version: Version::parse("1.0").unwrap(),
                sha256: "0".repeat(64),
            }],
            variants: vec![
                VariantDef {
                    name: "mpi".to_string(),
                    description: None,
                    kind: VariantKind::Bool { default: false },
                },
                VariantDef {
                    name: "fabrics".to_string(),
                    description: None,
                    kind: VariantKind::Enum {
                        values: vec!["ucx".to_string(), "ofi".to_string(), "none".to_string()],
                        default: "ucx".to_string(),
                    },
                },
            ],
            dependencies: Vec::new(),
        }
    }

    fn demo_spec(mpi: bool, fabrics: &str, compiler: CompilerFamily) -> ResolvedSpec {
        let mut variants = BTreeMap::new();
        variants.insert("mpi".to_string(), VariantValue::Bool(mpi));
        variants.insert(
            "fabrics".to_string(),
            VariantValue::Choice(fabrics.to_string()),
        );
        ResolvedSpec {
            recipe: Arc::new(demo_recipe()),
            version: Version::parse("1.0").unwrap(),
            variants,
            toolchain: Toolchain::new(compiler, "linux"),
        }
    }

    #[test]
    fn test_variant_equals() {
        let cond = Condition::VariantEquals {
            variant: "mpi".to_string(),
            value: VariantValue::Bool(true),
        };
        assert!(cond.eval(&demo_spec(true, "ucx", CompilerFamily::Gcc)));
        assert!(!cond.eval(&demo_spec(false, "ucx", CompilerFamily::Gcc)));
    }

    #[test]
    fn test_variant_membership() {
        let cond = Condition::VariantIn {
            variant: "fabrics".to_string(),
            any_of: vec!["ucx".to_string(), "ofi".to_string()],
        };
        assert!(cond.eval(&demo_spec(false, "ofi", CompilerFamily::Gcc)));
        assert!(!cond.eval(&demo_spec(false, "none", CompilerFamily::Gcc)));
    }

    #[test]
    fn test_compiler_and_composition() {
        let cond = Condition::All {
            conditions: vec![
                Condition::VariantEquals {
                    variant: "mpi".to_string(),
                    value: VariantValue::Bool(true),
                },
                Condition::Not {
                    condition: Box::new(Condition::CompilerIs {
                        any_of: vec!["intel".to_string()],
                    }),
                },
            ],
        };
        assert!(cond.eval(&demo_spec(true, "ucx", CompilerFamily::Gcc)));
        assert!(!cond.eval(&demo_spec(true, "ucx", CompilerFamily::Intel)));
        assert!(!cond.eval(&demo_spec(false, "ucx", CompilerFamily::Gcc)));
    }

    #[test]
    fn test_validate_unknown_variant() {
        let recipe = demo_recipe();
        let cond = Condition::VariantEquals {
            variant: "cuda".to_string(),
            value: VariantValue::Bool(true),
        };
        assert!(matches!(
            cond.validate(&recipe, "dep"),
            Err(QuarryError::RecipeDefinition(_))
        ));
    }

    #[test]
    fn test_validate_out_of_domain_value() {
        let recipe = demo_recipe();
        let cond = Condition::VariantIn {
            variant: "fabrics".to_string(),
            any_of: vec!["verbs".to_string()],
        };
        assert!(cond.validate(&recipe, "dep").is_err());

        let cond = Condition::VariantEquals {
            variant: "mpi".to_string(),
            value: VariantValue::Choice("yes".to_string()),
        };
        assert!(cond.validate(&recipe, "dep").is_err());
    }

    #[test]
    fn test_validate_empty_composites() {
        let recipe = demo_recipe();
        assert!(Condition::All { conditions: vec![] }
            .validate(&recipe, "dep")
            .is_err());
        assert!(Condition::CompilerIs { any_of: vec![] }
            .validate(&recipe, "dep")
            .is_err());
    }
}
