//! Errors surfaced by the session layer.

use thiserror::Error;
use webhelm_protocols::{ErrorKind, ErrorPayload, ToolError};

use crate::breaker::OperationClass;
use crate::classify::FailureCategory;

#[derive(Debug, Clone, Error)]
pub enum BrowserError {
    /// Illegal operation order or bad arguments; the message is shown verbatim.
    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    CircuitOpen {
        class: OperationClass,
        retry_after_ms: u64,
        message: String,
    },

    #[error("Browser launch failed: {0}")]
    BrowserLaunch(String),

    #[error("Navigation timeout: {0}")]
    NavigationTimeout(String),

    #[error("No element matches `{selector}` (tried: {})", .attempted.join(", "))]
    ElementNotFound {
        selector: String,
        attempted: Vec<String>,
    },

    #[error("Session crashed: {0}")]
    SessionCrashed(String),

    #[error("Session busy: another call held the page for more than {waited_ms} ms")]
    SessionBusy { waited_ms: u64 },

    #[error(
        "Content too large: about {estimated_tokens} tokens would need {chunks_needed} chunks (limit {max_chunks})"
    )]
    ContentTooLarge {
        estimated_tokens: usize,
        chunks_needed: usize,
        max_chunks: usize,
    },

    #[error("Invalid continuation token: {0}")]
    InvalidContinuation(String),

    #[error("No free port in {start}..={end}")]
    NoPortAvailable { start: u16, end: u16 },

    #[error("Browser executable not found: {0}")]
    BrowserNotFound(String),

    /// A classified driver failure.
    #[error("Browser error ({category}): {message}")]
    Driver {
        category: FailureCategory,
        message: String,
    },
}

impl BrowserError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            Self::BrowserLaunch(_) => ErrorKind::BrowserLaunch,
            Self::NavigationTimeout(_) => ErrorKind::NavigationTimeout,
            Self::ElementNotFound { .. } => ErrorKind::ElementNotFound,
            Self::SessionCrashed(_) => ErrorKind::SessionCrashed,
            Self::SessionBusy { .. } => ErrorKind::SessionBusy,
            Self::ContentTooLarge { .. } => ErrorKind::ContentTooLarge,
            Self::InvalidContinuation(_) => ErrorKind::InvalidContinuation,
            Self::NoPortAvailable { .. } => ErrorKind::NoPortAvailable,
            Self::BrowserNotFound(_) => ErrorKind::BrowserNotFound,
            Self::Driver { category, .. } => match category {
                FailureCategory::ElementNotFound => ErrorKind::ElementNotFound,
                FailureCategory::Validation => ErrorKind::Validation,
                FailureCategory::NavigationTimeout => ErrorKind::NavigationTimeout,
                _ => ErrorKind::Browser,
            },
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        let payload = ErrorPayload::new(self.kind(), self.to_string());
        match self {
            Self::CircuitOpen { retry_after_ms, .. } => payload.with_retry_after_ms(*retry_after_ms),
            Self::Driver { category, .. } => {
                payload.with_retryable(category.counts_toward_breaker())
            }
            _ => payload,
        }
    }

    /// Whether this error came from a missing element, however it was reported.
    pub fn is_element_not_found(&self) -> bool {
        self.kind() == ErrorKind::ElementNotFound
    }
}

impl From<BrowserError> for ToolError {
    fn from(e: BrowserError) -> Self {
        ToolError::Failed(e.to_payload())
    }
}
