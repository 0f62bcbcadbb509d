//! Admission gate consulted around every tool dispatch.

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, ErrorPayload};

/// Outcome of a dispatched operation, reported back to the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "kind")]
pub enum OperationOutcome {
    Success,
    Failure(ErrorKind),
}

impl OperationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Decides whether an operation may run, and learns from how it went.
///
/// `admit` is called before the tool executes; a rejection means no browser
/// call is attempted. `record` is called once per admitted call.
pub trait ToolGate: Send + Sync {
    fn admit(&self, operation: &str) -> Result<(), ErrorPayload>;

    fn record(&self, operation: &str, outcome: OperationOutcome);
}
