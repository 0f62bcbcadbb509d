//! Registries keyed by string id.

mod base;
mod tool;

pub use base::{BaseRegistry, Registerable};
pub use tool::ToolRegistry;
