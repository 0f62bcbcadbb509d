//! Configuration schema definitions.

use serde::{Deserialize, Serialize};

mod schema_browser;
mod schema_content;

pub use schema_browser::*;
pub use schema_content::*;

/// Shared default helper used by submodules.
pub(crate) fn default_true() -> bool {
    true
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub breaker: BreakerConfig,

    #[serde(default)]
    pub workflow: WorkflowConfig,

    #[serde(default)]
    pub content: ContentConfig,

    #[serde(default)]
    pub selector: SelectorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for the daily-rolling log file.
    #[serde(default = "default_log_dir")]
    pub dir: String,

    #[serde(default = "default_true")]
    pub file_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: default_log_dir(),
            file_enabled: true,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    dirs::home_dir()
        .map(|h| h.join(".webhelm").join("logs").display().to_string())
        .unwrap_or_else(|| ".webhelm/logs".to_string())
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
