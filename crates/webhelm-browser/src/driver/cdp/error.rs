//! CDP error types.

use thiserror::Error;

use crate::driver::DriverError;

/// CDP client errors.
#[derive(Debug, Error)]
pub enum CdpError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Nothing answered on the debugging endpoint.
    #[error("Browser not available at {0}")]
    BrowserNotAvailable(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("CDP error: {message} (code: {code})")]
    Protocol { code: i64, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("JavaScript error: {0}")]
    JavaScript(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Session closed")]
    SessionClosed,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for CdpError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CdpError::WebSocket(e.to_string())
    }
}

impl From<reqwest::Error> for CdpError {
    fn from(e: reqwest::Error) -> Self {
        CdpError::Http(e.to_string())
    }
}

impl From<CdpError> for DriverError {
    fn from(e: CdpError) -> Self {
        match e {
            CdpError::ConnectionFailed(msg) | CdpError::BrowserNotAvailable(msg) => {
                DriverError::Launch(msg)
            }
            CdpError::WebSocket(msg) => DriverError::SessionClosed(format!("websocket: {}", msg)),
            CdpError::Protocol { code, message } => {
                DriverError::Protocol(format!("{} (code: {})", message, code))
            }
            CdpError::NavigationFailed(msg) => DriverError::Navigation(msg),
            CdpError::JavaScript(msg) => DriverError::JavaScript(msg),
            CdpError::Timeout(msg) => DriverError::Timeout(msg),
            CdpError::SessionClosed => {
                DriverError::SessionClosed("DevTools connection closed".to_string())
            }
            other => DriverError::Other(other.to_string()),
        }
    }
}
