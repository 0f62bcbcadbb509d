//! Failure classification.
//!
//! Driver errors are sorted into categories by variant and by matching
//! their message case-insensitively. The category decides whether the
//! failure counts toward a circuit breaker.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::driver::DriverError;

/// Category of a browser failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    FrameDetached,
    SessionClosed,
    ProtocolError,
    NavigationTimeout,
    ElementNotFound,
    /// Bad input from the caller: selector syntax, URL, script exceptions.
    Validation,
    Unknown,
}

impl FailureCategory {
    /// Whether a failure of this category trips breakers.
    pub fn counts_toward_breaker(self) -> bool {
        !matches!(self, Self::ElementNotFound | Self::Validation)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FrameDetached => "frame_detached",
            Self::SessionClosed => "session_closed",
            Self::ProtocolError => "protocol_error",
            Self::NavigationTimeout => "navigation_timeout",
            Self::ElementNotFound => "element_not_found",
            Self::Validation => "validation",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Patterns {
    frame_detached: Option<Regex>,
    session_closed: Option<Regex>,
    element_not_found: Option<Regex>,
    validation: Option<Regex>,
    timeout: Option<Regex>,
    protocol: Option<Regex>,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let build = |p: &str| Regex::new(&format!("(?i){}", p)).ok();
        Patterns {
            frame_detached: build(
                r"frame (was |got )?detached|execution context was destroyed|cannot find context with specified id",
            ),
            session_closed: build(
                r"target closed|session closed|browser (has been )?(closed|disconnected)|connection (closed|reset|refused)|websocket|browser process exited",
            ),
            element_not_found: build(r"element not found|no (element|node) (found|matches)|waiting for selector"),
            validation: build(
                r"invalid selector|not a valid selector|syntaxerror|invalid url|cannot navigate to invalid",
            ),
            timeout: build(r"timed? ?out|timeout"),
            protocol: build(r"protocol error|cdp error"),
        }
    })
}

fn is_match(re: &Option<Regex>, message: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(message))
}

/// Classify a bare error message.
pub fn classify_message(message: &str) -> Option<FailureCategory> {
    let p = patterns();
    if is_match(&p.frame_detached, message) {
        Some(FailureCategory::FrameDetached)
    } else if is_match(&p.session_closed, message) {
        Some(FailureCategory::SessionClosed)
    } else if is_match(&p.element_not_found, message) {
        Some(FailureCategory::ElementNotFound)
    } else if is_match(&p.validation, message) {
        Some(FailureCategory::Validation)
    } else if is_match(&p.timeout, message) {
        Some(FailureCategory::NavigationTimeout)
    } else if is_match(&p.protocol, message) {
        Some(FailureCategory::ProtocolError)
    } else {
        None
    }
}

/// Classify a driver error.
///
/// Frame and session loss win over the variant: a click that fails because
/// the target closed is a transport failure, not a missing element.
pub fn classify(error: &DriverError) -> FailureCategory {
    let message = error.to_string();
    let p = patterns();
    if is_match(&p.frame_detached, &message) {
        return FailureCategory::FrameDetached;
    }
    if is_match(&p.session_closed, &message) {
        return FailureCategory::SessionClosed;
    }

    match error {
        DriverError::ElementNotFound(_) => FailureCategory::ElementNotFound,
        DriverError::InvalidSelector(_) | DriverError::JavaScript(_) => FailureCategory::Validation,
        DriverError::SessionClosed(_) => FailureCategory::SessionClosed,
        DriverError::Timeout(_) => FailureCategory::NavigationTimeout,
        DriverError::Protocol(msg) => {
            classify_message(msg).unwrap_or(FailureCategory::ProtocolError)
        }
        DriverError::Launch(msg) | DriverError::Navigation(msg) | DriverError::Other(msg) => {
            classify_message(msg).unwrap_or(FailureCategory::Unknown)
        }
    }
}
