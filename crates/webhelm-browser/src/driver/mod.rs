//! Browser driver abstraction.
//!
//! The session layer never talks to a browser directly. It launches one
//! through a [`BrowserLauncher`] and touches the page only through
//! [`PageHandle`]. Two drivers ship with the crate:
//!
//! - [`cdp`] drives Chrome/Chromium/Edge over the DevTools protocol.
//! - [`fixture`] serves static HTML from memory, with fault injection.

pub mod cdp;
pub mod fixture;
mod script;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use script::{is_xpath, strip_xpath_prefix};

/// Errors reported by a driver.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DriverError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("JavaScript error: {0}")]
    JavaScript(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Session closed: {0}")]
    SessionClosed(String),

    #[error("Browser error: {0}")]
    Other(String),
}

/// When `goto` considers navigation finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitCondition {
    #[default]
    Load,
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    None,
}

/// Cheap page statistics gathered before a capture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetrics {
    pub html_bytes: u64,
    pub node_count: u64,
    pub image_count: u64,
    pub iframe_count: u64,
    pub script_count: u64,
}

/// Everything a launcher needs to start one browser.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Resolved executable; `None` for drivers that need none.
    pub executable: Option<PathBuf>,
    pub port: u16,
    pub headless: bool,
    pub profile_dir: Option<PathBuf>,
    pub extra_args: Vec<String>,
    pub launch_timeout: Duration,
}

/// Starts browsers.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, spec: &LaunchSpec) -> Result<Arc<dyn BrowserHandle>, DriverError>;

    /// Whether a browser executable must be located before `launch`.
    fn requires_executable(&self) -> bool {
        true
    }
}

/// A running browser with one attached page.
#[async_trait]
pub trait BrowserHandle: Send + Sync {
    fn page(&self) -> Arc<dyn PageHandle>;

    async fn is_alive(&self) -> bool;

    async fn close(&self) -> Result<(), DriverError>;
}

/// Operations on the attached page.
///
/// Selectors are CSS unless they start with `/`, `(` or `xpath=`.
#[async_trait]
pub trait PageHandle: Send + Sync {
    async fn goto(&self, url: &str, wait: WaitCondition) -> Result<(), DriverError>;

    /// Evaluate a JavaScript expression and return its JSON value.
    async fn evaluate(&self, expression: &str) -> Result<Value, DriverError>;

    /// Wait until `selector` matches at least one element.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration)
    -> Result<(), DriverError>;

    async fn click(&self, selector: &str) -> Result<(), DriverError>;

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), DriverError>;

    /// Replace the set of blocked URL patterns. An empty slice clears it.
    async fn set_blocked_urls(&self, patterns: &[String]) -> Result<(), DriverError>;

    /// Serialized HTML of the current document.
    async fn content(&self) -> Result<String, DriverError>;

    async fn url(&self) -> Result<String, DriverError>;

    async fn reload(&self, wait: WaitCondition) -> Result<(), DriverError> {
        let url = self.url().await?;
        self.goto(&url, wait).await
    }

    async fn metrics(&self) -> Result<PageMetrics, DriverError> {
        let value = self.evaluate(script::METRICS).await?;
        serde_json::from_value(value)
            .map_err(|e| DriverError::Protocol(format!("invalid page metrics: {}", e)))
    }

    async fn count_matches(&self, selector: &str) -> Result<usize, DriverError> {
        let value = self.evaluate(&script::count_matches(selector)).await?;
        value
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| DriverError::Protocol(format!("unexpected match count: {}", value)))
    }

    /// Text (or outer HTML when `html` is set) of the first match, if any.
    async fn select_content(&self, selector: &str, html: bool) -> Result<Option<String>, DriverError> {
        let value = self.evaluate(&script::select_content(selector, html)).await?;
        Ok(value.as_str().map(str::to_string))
    }
}
