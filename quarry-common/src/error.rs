use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum QuarryError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Resource Not Found: {0}")]
    NotFound(String),

    #[error("Version error: {0}")]
    Version(String),

    #[error("Recipe definition error: {0}")]
    RecipeDefinition(String),

    #[error("Unknown variant '{variant}' for recipe '{recipe}'")]
    UnknownVariant { recipe: String, variant: String },

    #[error("Invalid value '{value}' for variant '{variant}' of recipe '{recipe}' (expected {expected})")]
    InvalidVariant {
        recipe: String,
        variant: String,
        value: String,
        expected: String,
    },

    #[error("Cyclic dependency: {chain} (edges '{first_edge}' and '{second_edge}')")]
    CyclicDependency {
        chain: String,
        first_edge: String,
        second_edge: String,
    },

    #[error("Unsatisfiable constraint on '{target}': '{first}' conflicts with '{second}'")]
    UnsatisfiableConstraint {
        target: String,
        first: String,
        second: String,
    },

    #[error("Install action failed for '{node}' ({action}): {cause}")]
    InstallActionFailed {
        node: String,
        action: String,
        cause: String,
    },
}

impl From<std::io::Error> for QuarryError {
    fn from(err: std::io::Error) -> Self {
        QuarryError::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for QuarryError {
    fn from(err: serde_json::Error) -> Self {
        QuarryError::Json(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, QuarryError>;
