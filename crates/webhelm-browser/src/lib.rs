//! Browser session and content-delivery resilience layer.
//!
//! Owns a single shared browser/page pair and protects every call made
//! against it:
//!
//! - [`workflow`] rejects operations issued out of order before they reach
//!   the browser.
//! - [`session`] serializes page access, races every call against a timeout
//!   and detects crashed browsers.
//! - [`breaker`] fails fast per operation class once a class keeps failing.
//! - [`content`] decides how much of a page can be returned to a
//!   token-limited caller, and chunks the rest behind stateless
//!   continuation tokens.
//! - [`selector`] recovers from broken selectors with ranked fallbacks.
//!
//! ## Architecture
//!
//! ```text
//! tool call ──► Dispatcher ──► WorkflowLedger (admit)
//!                                   │
//!                                   ▼
//!                            BrowserContext ──► ContentEngine / SelectorResolver
//!                                   │
//!                                   ▼
//!                   SessionManager::with_page ──► BreakerRegistry ──► PageHandle
//! ```
//!
//! The browser itself sits behind the [`driver`] traits: a Chrome DevTools
//! Protocol implementation for real browsers, and an in-memory fixture
//! browser for tests and dry runs.

pub mod breaker;
pub mod classify;
pub mod clock;
pub mod content;
mod context;
pub mod driver;
mod error;
pub mod locator;
pub mod selector;
pub mod session;
pub mod tokens;
pub mod tools;
pub mod workflow;

pub use breaker::{BreakerRegistry, BreakerSnapshot, BreakerStatus, CircuitBreaker, OperationClass};
pub use classify::FailureCategory;
pub use clock::{Clock, ManualClock, SystemClock};
pub use content::{ContentEngine, ContentFormat, ContentMode, ContentRequest, ContentResult};
pub use context::{ActionOutcome, BrowserContext, ScriptOutput, spawn_idle_reaper};
pub use driver::{BrowserHandle, BrowserLauncher, DriverError, PageHandle, WaitCondition};
pub use error::BrowserError;
pub use selector::{Intent, SelectorResolution, SelectorResolver, SelectorStrategy};
pub use session::{InitOptions, SessionInfo, SessionManager, SessionState, SessionStatus};
pub use tokens::TokenEstimator;
pub use tools::register_tools;
pub use workflow::{OperationRecord, WorkflowLedger};
