pub mod condition;
pub mod definition;
pub mod resolver;

pub use condition::Condition;
pub use definition::{DependencyEdge, DependencyTag};
pub use resolver::{ResolvedGraph, Resolver};
