//! Ownership of the single browser/page pair.
//!
//! All page access goes through [`SessionManager::with_page`], which
//! serializes callers, routes the call through the breaker for its
//! operation class, races it against a timeout and detects crashes.

mod manager;
mod types;

pub use manager::SessionManager;
pub use types::{InitOptions, SessionInfo, SessionState, SessionStatus};
