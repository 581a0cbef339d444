// quarry-common/src/dependency/definition.rs
use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Deserializer};

use crate::dependency::condition::Condition;
use crate::error::{QuarryError, Result};
use crate::model::version::VersionConstraint;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DependencyTag: u8 {
        const BUILD = 0b00000001;
        const RUN   = 0b00000010;
        const LINK  = 0b00000100;
    }
}

impl Default for DependencyTag {
    fn default() -> Self {
        // The corpus default: a dependency needed when running and linking
        // against the package, but not to build it.
        Self::RUN | Self::LINK
    }
}

impl DependencyTag {
    pub fn from_classifiers(names: &[String]) -> Result<Self> {
        let mut tags = Self::empty();
        for name in names {
            match name.as_str() {
                "build" => tags |= Self::BUILD,
                "run" => tags |= Self::RUN,
                "link" => tags |= Self::LINK,
                other => {
                    return Err(QuarryError::RecipeDefinition(format!(
                        "unknown dependency classifier '{other}'"
                    )))
                }
            }
        }
        Ok(tags)
    }

    pub fn classifier_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.contains(Self::BUILD) {
            names.push("build");
        }
        if self.contains(Self::RUN) {
            names.push("run");
        }
        if self.contains(Self::LINK) {
            names.push("link");
        }
        names
    }
}

impl fmt::Display for DependencyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.classifier_names().join(", "))
    }
}

/// A declared, optionally conditional requirement on another recipe.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencyEdge {
    pub target: String,
    #[serde(default)]
    pub constraint: VersionConstraint,
    #[serde(
        default,
        rename = "classifiers",
        deserialize_with = "tags_from_classifiers"
    )]
    pub tags: DependencyTag,
    #[serde(default)]
    pub when: Option<Condition>,
}

impl fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} [{}]", self.target, self.constraint, self.tags)?;
        if let Some(when) = &self.when {
            write!(f, " when {when}")?;
        }
        Ok(())
    }
}

fn tags_from_classifiers<'de, D>(deserializer: D) -> std::result::Result<DependencyTag, D::Error>
where
    D: Deserializer<'de>,
{
    let names = Vec::<String>::deserialize(deserializer)?;
    DependencyTag::from_classifiers(&names).map_err(serde::de::Error::custom)
}
