// quarry-common/src/model/spec.rs
// A ResolvedSpec is a recipe bound to one concrete version, one concrete
// value for every declared variant, and a concrete toolchain identity.
// Produced by resolution and never mutated afterwards; re-resolution
// produces a new one.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::model::recipe::Recipe;
use crate::model::variant::VariantValue;
use crate::model::version::Version;

/// Compiler family identity. Declared by configuration, never detected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CompilerFamily {
    Gcc,
    Clang,
    Intel,
    Other(String),
}

impl CompilerFamily {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "gcc" => CompilerFamily::Gcc,
            "clang" => CompilerFamily::Clang,
            "intel" => CompilerFamily::Intel,
            other => CompilerFamily::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CompilerFamily::Gcc => "gcc",
            CompilerFamily::Clang => "clang",
            CompilerFamily::Intel => "intel",
            CompilerFamily::Other(name) => name,
        }
    }

    /// The C compiler executable conventionally associated with the family.
    pub fn cc(&self) -> &str {
        match self {
            CompilerFamily::Gcc => "gcc",
            CompilerFamily::Clang => "clang",
            CompilerFamily::Intel => "icx",
            CompilerFamily::Other(name) => name,
        }
    }
}

impl fmt::Display for CompilerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Serialize for CompilerFamily {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for CompilerFamily {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(CompilerFamily::from_name(&s))
    }
}

/// The compiler/platform identity a resolution request runs under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toolchain {
    pub compiler: CompilerFamily,
    pub platform: String,
}

impl Toolchain {
    pub fn new(compiler: CompilerFamily, platform: impl Into<String>) -> Self {
        Self {
            compiler,
            platform: platform.into(),
        }
    }
}

impl fmt::Display for Toolchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{} ({})", self.compiler, self.platform)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSpec {
    pub recipe: Arc<Recipe>,
    pub version: Version,
    /// One concrete value for every declared variant, explicit or default.
    pub variants: BTreeMap<String, VariantValue>,
    pub toolchain: Toolchain,
}

impl ResolvedSpec {
    pub fn name(&self) -> &str {
        &self.recipe.name
    }

    pub fn variant_value(&self, name: &str) -> Option<&VariantValue> {
        self.variants.get(name)
    }
}

impl fmt::Display for ResolvedSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.recipe.name, self.version)?;
        for (name, value) in &self.variants {
            match value {
                VariantValue::Bool(true) => write!(f, " +{name}")?,
                VariantValue::Bool(false) => write!(f, " ~{name}")?,
                VariantValue::Choice(choice) => write!(f, " {name}={choice}")?,
            }
        }
        write!(f, " %{}", self.toolchain.compiler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::recipe::VersionEntry;
    use crate::model::variant::{VariantDef, VariantKind};

    #[test]
    fn test_spec_display() {
        let recipe = Arc::new(Recipe {
            name: "hdf5".to_string(),
            description: None,
            homepage: None,
            installer: "autotools".to_string(),
            versions: vec![VersionEntry {
                version: Version::parse("1.14.3").unwrap(),
                sha256: "0".repeat(64),
            }],
            variants: vec![
                VariantDef {
                    name: "mpi".to_string(),
                    description: None,
                    kind: VariantKind::Bool { default: false },
                },
                VariantDef {
                    name: "shared".to_string(),
                    description: None,
                    kind: VariantKind::Bool { default: true },
                },
            ],
            dependencies: Vec::new(),
        });
        let mut variants = BTreeMap::new();
        variants.insert("mpi".to_string(), VariantValue::Bool(false));
        variants.insert("shared".to_string(), VariantValue::Bool(true));
        let spec = ResolvedSpec {
            recipe,
            version: Version::parse("1.14.3").unwrap(),
            variants,
            toolchain: Toolchain::new(CompilerFamily::Gcc, "linux"),
        };
        assert_eq!(spec.to_string(), "hdf5@1.14.3 ~mpi +shared %gcc");
    }

    #[test]
    fn test_compiler_family_roundtrip() {
        assert_eq!(CompilerFamily::from_name("GCC"), CompilerFamily::Gcc);
        assert_eq!(CompilerFamily::from_name("clang").name(), "clang");
        assert_eq!(
            CompilerFamily::from_name("nvhpc"),
            CompilerFamily::Other("nvhpc".to_string())
        );
    }
}
