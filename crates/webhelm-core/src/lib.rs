//! # webhelm Core
//!
//! Tool registry and the gated dispatcher every tool call goes through.

pub mod dispatcher;
pub mod error;
pub mod registry;

pub use dispatcher::Dispatcher;
pub use error::RegistryError;
pub use registry::ToolRegistry;
