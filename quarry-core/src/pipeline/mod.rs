pub mod engine;

pub use engine::{InstallEngine, InstallReport};
