//! Error types for the tool layer.
//!
//! Every rejected call reaches the caller as an [`ErrorPayload`]: a
//! machine-readable [`ErrorKind`], a human-readable message, and whether
//! retrying can help.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable error category returned to the calling agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Illegal operation order or malformed arguments.
    Validation,
    /// A circuit breaker is open for the operation class.
    CircuitOpen,
    /// The browser could not be launched.
    BrowserLaunch,
    /// Navigation or a page operation exceeded its timeout.
    NavigationTimeout,
    /// The selector (and every fallback) failed to resolve.
    ElementNotFound,
    /// The browser process or page is gone; `browser_init` is required.
    SessionCrashed,
    /// Another call held the session longer than the busy wait.
    SessionBusy,
    /// Content cannot be delivered even in chunks.
    ContentTooLarge,
    /// A continuation token is malformed or no longer matches the page.
    InvalidContinuation,
    /// No free local port in the scan range.
    NoPortAvailable,
    /// No browser executable could be located.
    BrowserNotFound,
    /// Any other failure reported by the browser.
    Browser,
    /// The call was cancelled by the caller.
    Cancelled,
}

impl ErrorKind {
    /// Default retry hint for this kind.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::CircuitOpen | Self::SessionBusy | Self::NavigationTimeout | Self::BrowserLaunch
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::CircuitOpen => "circuit_open",
            Self::BrowserLaunch => "browser_launch",
            Self::NavigationTimeout => "navigation_timeout",
            Self::ElementNotFound => "element_not_found",
            Self::SessionCrashed => "session_crashed",
            Self::SessionBusy => "session_busy",
            Self::ContentTooLarge => "content_too_large",
            Self::InvalidContinuation => "invalid_continuation",
            Self::NoPortAvailable => "no_port_available",
            Self::BrowserNotFound => "browser_not_found",
            Self::Browser => "browser",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error delivered to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
    /// Milliseconds until a retry can succeed, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

impl ErrorPayload {
    /// Create a payload using the kind's default retry hint.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: kind.is_retryable(),
            retry_after_ms: None,
        }
    }

    /// Override the retry hint.
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Attach a retry-after hint.
    pub fn with_retry_after_ms(mut self, ms: u64) -> Self {
        self.retry_after_ms = Some(ms);
        self
    }
}

impl std::fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Tool execution errors.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution was cancelled")]
    Cancelled,

    #[error("{0}")]
    Failed(ErrorPayload),
}

impl ToolError {
    /// Convert into the structured form returned to the caller.
    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            ToolError::NotFound(id) => {
                ErrorPayload::new(ErrorKind::Validation, format!("Unknown tool: {}", id))
            }
            ToolError::InvalidParameters(msg) => {
                ErrorPayload::new(ErrorKind::Validation, format!("Invalid parameters: {}", msg))
            }
            ToolError::Cancelled => ErrorPayload::new(ErrorKind::Cancelled, "Call was cancelled"),
            ToolError::Failed(payload) => payload.clone(),
        }
    }

    /// The error kind of this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::NotFound(_) | ToolError::InvalidParameters(_) => ErrorKind::Validation,
            ToolError::Cancelled => ErrorKind::Cancelled,
            ToolError::Failed(payload) => payload.kind,
        }
    }
}

impl From<ErrorPayload> for ToolError {
    fn from(payload: ErrorPayload) -> Self {
        ToolError::Failed(payload)
    }
}
