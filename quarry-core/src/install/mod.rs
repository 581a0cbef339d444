//! The install-step adapter boundary.
//!
//! Each recipe names an install-step implementation; the adapter turns a
//! fully resolved spec plus its dependencies' installed prefixes into an
//! ordered list of opaque actions. The core never interprets action
//! semantics beyond sequencing and error propagation, so the orchestrator
//! controls execution, retries and parallelism uniformly.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use quarry_common::error::{QuarryError, Result};
use quarry_common::model::ResolvedSpec;

mod adapters;

pub use adapters::{AutotoolsPlanner, CmakePlanner};

/// One shell-level step of an installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum InstallAction {
    SetEnv {
        key: String,
        value: String,
    },
    Run {
        program: String,
        args: Vec<String>,
        #[serde(default)]
        cwd: Option<PathBuf>,
    },
    CopyFile {
        source: PathBuf,
        dest: PathBuf,
    },
}

impl fmt::Display for InstallAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallAction::SetEnv { key, value } => write!(f, "setenv {key}={value}"),
            InstallAction::Run { program, args, cwd } => {
                write!(f, "run {program}")?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                if let Some(cwd) = cwd {
                    write!(f, " (in {})", cwd.display())?;
                }
                Ok(())
            }
            InstallAction::CopyFile { source, dest } => {
                write!(f, "copy {} -> {}", source.display(), dest.display())
            }
        }
    }
}

/// Per-recipe install-step planning: a pure data producer.
pub trait InstallPlanner: Send + Sync {
    fn plan(
        &self,
        spec: &ResolvedSpec,
        prefix: &Path,
        dependency_prefixes: &HashMap<String, PathBuf>,
    ) -> Result<Vec<InstallAction>>;
}

/// Maps recipe installer identifiers to their planner implementations.
#[derive(Clone)]
pub struct AdapterRegistry {
    planners: HashMap<String, Arc<dyn InstallPlanner>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            planners: HashMap::new(),
        }
    }

    /// Registry with the builtin build-system planners.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("autotools", Arc::new(AutotoolsPlanner));
        registry.register("cmake", Arc::new(CmakePlanner));
        registry
    }

    pub fn register(&mut self, id: impl Into<String>, planner: Arc<dyn InstallPlanner>) {
        self.planners.insert(id.into(), planner);
    }

    pub fn get(&self, id: &str) -> Result<Arc<dyn InstallPlanner>> {
        self.planners
            .get(id)
            .cloned()
            .ok_or_else(|| QuarryError::NotFound(format!("no install adapter '{id}' registered")))
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
