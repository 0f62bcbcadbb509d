//! Legal-operation ledger.
//!
//! Every tool call is admitted (or rejected) here before it reaches the
//! session, based on the session state and on which operations have
//! succeeded since the last `browser_init`. Rejections explain the missing
//! step so the caller knows what to do next.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use webhelm_protocols::OperationOutcome;

use crate::error::BrowserError;
use crate::session::SessionState;

pub const INIT: &str = "browser_init";
pub const CLOSE: &str = "browser_close";
pub const STATUS: &str = "browser_status";
pub const NAVIGATE: &str = "browser_navigate";
pub const GET_CONTENT: &str = "browser_get_content";
pub const CLICK: &str = "browser_click";
pub const TYPE: &str = "browser_type";
pub const WAIT_FOR: &str = "browser_wait_for";
pub const EXECUTE_JS: &str = "browser_execute_js";

/// Operations that need a page that has been navigated somewhere.
const PAGE_OPERATIONS: &[&str] = &[GET_CONTENT, CLICK, TYPE, WAIT_FOR, EXECUTE_JS];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub operation: String,
    pub timestamp: DateTime<Utc>,
    pub outcome: OperationOutcome,
}

#[derive(Debug, Default)]
struct LedgerInner {
    /// Records with their sequence numbers, oldest first.
    history: VecDeque<(u64, OperationRecord)>,
    next_seq: u64,
    /// First sequence number of the current workflow.
    restarted_at: u64,
    /// First sequence number after the last successful init.
    initialized_at: u64,
    init_succeeded: bool,
    navigated: bool,
}

impl LedgerInner {
    /// Failures of `operation` since its last success, not looking back
    /// past `since`.
    fn failures_since(&self, operation: &str, since: u64) -> u32 {
        self.history
            .iter()
            .rev()
            .take_while(|(seq, _)| *seq >= since)
            .filter(|(_, r)| r.operation == operation)
            .take_while(|(_, r)| !r.outcome.is_success())
            .count() as u32
    }

    fn restart(&mut self) {
        self.init_succeeded = false;
        self.navigated = false;
        self.restarted_at = self.next_seq;
        self.initialized_at = self.next_seq;
    }
}

pub struct WorkflowLedger {
    capacity: usize,
    inner: Mutex<LedgerInner>,
}

impl WorkflowLedger {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(LedgerInner::default()),
        }
    }

    /// Admit `operation` given the current session `state`.
    ///
    /// `browser_close` and `browser_status` are admitted even for a crashed
    /// session: close releases whatever the crash left behind and status
    /// only reads.
    pub fn validate(&self, operation: &str, state: SessionState) -> Result<(), BrowserError> {
        match operation {
            INIT | CLOSE | STATUS => Ok(()),
            NAVIGATE => self.require_session(operation, state),
            op if PAGE_OPERATIONS.contains(&op) => {
                self.require_session(operation, state)?;
                self.require_navigation(operation)
            }
            other => Err(BrowserError::Validation(format!(
                "Unknown operation: {}",
                other
            ))),
        }
    }

    fn require_session(&self, operation: &str, state: SessionState) -> Result<(), BrowserError> {
        if state == SessionState::Crashed {
            return Err(BrowserError::SessionCrashed(
                "session crashed; call browser_init to start a new session".to_string(),
            ));
        }
        if state.is_live() {
            return Ok(());
        }

        let inner = self.inner.lock();
        let init_failures = inner.failures_since(INIT, inner.restarted_at);
        let message = if init_failures > 0 {
            format!(
                "browser_init failed {} time{}; fix the launch error and call browser_init again before {}",
                init_failures,
                plural(init_failures),
                operation
            )
        } else if !inner.init_succeeded {
            format!("browser_init was never called; call browser_init before {}", operation)
        } else {
            format!("browser session is {}; call browser_init before {}", state, operation)
        };
        Err(BrowserError::Validation(message))
    }

    fn require_navigation(&self, operation: &str) -> Result<(), BrowserError> {
        let inner = self.inner.lock();
        if inner.navigated {
            return Ok(());
        }
        let navigate_failures = inner.failures_since(NAVIGATE, inner.initialized_at);
        let message = if navigate_failures > 0 {
            format!(
                "browser_navigate failed {} time{}; navigate to a reachable URL before {}",
                navigate_failures,
                plural(navigate_failures),
                operation
            )
        } else {
            format!("browser_navigate must succeed before {}", operation)
        };
        Err(BrowserError::Validation(message))
    }

    pub fn record(&self, operation: &str, outcome: OperationOutcome) {
        let mut inner = self.inner.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        if inner.history.len() == self.capacity {
            inner.history.pop_front();
        }
        inner.history.push_back((
            seq,
            OperationRecord {
                operation: operation.to_string(),
                timestamp: Utc::now(),
                outcome,
            },
        ));

        match (operation, outcome.is_success()) {
            (INIT, true) => {
                inner.init_succeeded = true;
                inner.navigated = false;
                inner.initialized_at = inner.next_seq;
            }
            (INIT, false) => inner.init_succeeded = false,
            (NAVIGATE, true) => inner.navigated = true,
            (CLOSE, true) => inner.restart(),
            _ => {}
        }
    }

    /// Start the workflow over at `browser_init`. History is kept.
    pub fn restart(&self) {
        self.inner.lock().restart();
    }

    /// The last `n` records, oldest first.
    pub fn recent(&self, n: usize) -> Vec<OperationRecord> {
        let inner = self.inner.lock();
        let skip = inner.history.len().saturating_sub(n);
        inner
            .history
            .iter()
            .skip(skip)
            .map(|(_, record)| record.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Failures of `operation` since its last success in the current
    /// workflow.
    pub fn consecutive_failures(&self, operation: &str) -> u32 {
        let inner = self.inner.lock();
        inner.failures_since(operation, inner.restarted_at)
    }
}

fn plural(n: u32) -> &'static str {
    if n == 1 { "" } else { "s" }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
