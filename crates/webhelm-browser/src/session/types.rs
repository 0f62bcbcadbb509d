use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::breaker::BreakerSnapshot;
use crate::workflow::OperationRecord;

/// Lifecycle state of the browser session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
    Busy,
    Closing,
    Closed,
    Crashed,
}

impl SessionState {
    /// Whether page operations may be attempted.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Ready | Self::Busy)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Busy => "busy",
            Self::Closing => "closing",
            Self::Closed => "closed",
            Self::Crashed => "crashed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitOptions {
    /// Tear down a live session instead of reusing it.
    #[serde(default)]
    pub force: bool,
    /// Override `browser.headless` for this launch.
    #[serde(default)]
    pub headless: Option<bool>,
}

/// Returned by `init`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub state: SessionState,
    pub port: Option<u16>,
    pub executable: Option<PathBuf>,
    pub generation: u64,
    /// The call found a live session and returned it unchanged.
    pub reused: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// Diagnostics snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub generation: u64,
    pub url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub idle_ms: Option<u64>,
    pub breakers: Vec<BreakerSnapshot>,
    pub recent_operations: Vec<OperationRecord>,
}
