//! # webhelm Protocols
//!
//! Interface definitions shared by the webhelm crates. Contains only traits
//! and plain data types - no browser logic.
//!
//! ## Core Traits
//!
//! - [`Tool`] - A callable operation exposed to the agent
//! - [`ToolGate`] - Admission check consulted before every tool dispatch

pub mod error;
pub mod gate;
pub mod tool;
pub mod types;

pub use error::{ErrorKind, ErrorPayload, ToolError};
pub use gate::{OperationOutcome, ToolGate};
pub use tool::{Tool, ToolContext, ToolDefinition, ToolResult};
pub use types::*;
