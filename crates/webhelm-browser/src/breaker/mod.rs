//! Per-operation-class circuit breakers.
//!
//! ```text
//!   Closed ──(threshold counting failures)──► Open
//!     ▲                                        │ cooldown elapses
//!     │ probe succeeds                         ▼
//!     └──────────────────────────────────── HalfOpen ──(probe fails)──► Open
//! ```
//!
//! Only one probe runs while half-open. Cooldowns grow exponentially with
//! the failure count and are measured against an injected [`Clock`].
//!
//! [`Clock`]: crate::clock::Clock

mod circuit;
mod registry;

pub use circuit::{CircuitBreaker, CircuitOpen, GuardError, Permit};
pub use registry::BreakerRegistry;

use serde::{Deserialize, Serialize};

/// Class of browser operation sharing one breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationClass {
    Lifecycle,
    Navigation,
    Interaction,
    Extraction,
}

impl OperationClass {
    pub const ALL: [OperationClass; 4] = [
        OperationClass::Lifecycle,
        OperationClass::Navigation,
        OperationClass::Interaction,
        OperationClass::Extraction,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lifecycle => "lifecycle",
            Self::Navigation => "navigation",
            Self::Interaction => "interaction",
            Self::Extraction => "extraction",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Lifecycle => 0,
            Self::Navigation => 1,
            Self::Interaction => 2,
            Self::Extraction => 3,
        }
    }
}

impl std::fmt::Display for OperationClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerStatus {
    Closed,
    Open,
    HalfOpen,
}

/// Point-in-time view of one breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerSnapshot {
    pub class: OperationClass,
    pub status: BreakerStatus,
    pub failure_count: u32,
    pub retry_after_ms: u64,
}

#[cfg(test)]
#[path = "breaker_tests.rs"]
mod tests;
