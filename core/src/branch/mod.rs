// core/src/branch/mod.rs

//! Branch stages: pick one of several sub-flows at runtime and run it on a
//! context extracted from the parent flow's data.

mod builder;
mod route;
mod source;

pub use builder::{BranchBuilder, RouteConfigurator};
pub use source::{FactorySource, FlowSource, StaticSource};
