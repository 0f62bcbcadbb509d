//! Content delivery, selector and workflow configuration.

use serde::{Deserialize, Serialize};

use super::default_true;

/// Workflow ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Number of recent operations kept in the ring buffer.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
        }
    }
}

fn default_history_capacity() -> usize {
    64
}

/// Token budgets and resource-blocking thresholds for content extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    #[serde(default = "default_token_budget")]
    pub default_token_budget: usize,

    /// Reduced content above this recommends chunking.
    #[serde(default = "default_safe_token_limit")]
    pub safe_token_limit: usize,

    /// Hard ceiling; nothing larger is ever returned in one piece.
    #[serde(default = "default_emergency_token_limit")]
    pub emergency_token_limit: usize,

    #[serde(default = "default_summary_token_budget")]
    pub summary_token_budget: usize,

    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,

    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: f64,

    #[serde(default = "default_block_threshold_bytes")]
    pub block_threshold_bytes: u64,

    #[serde(default = "default_block_threshold_nodes")]
    pub block_threshold_nodes: u64,

    #[serde(default = "default_block_threshold_images")]
    pub block_threshold_images: u64,

    /// URL patterns blocked while capturing heavy pages.
    #[serde(default = "default_blocked_url_patterns")]
    pub blocked_url_patterns: Vec<String>,

    #[serde(default = "default_true")]
    pub reload_with_blocking: bool,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            default_token_budget: default_token_budget(),
            safe_token_limit: default_safe_token_limit(),
            emergency_token_limit: default_emergency_token_limit(),
            summary_token_budget: default_summary_token_budget(),
            max_chunks: default_max_chunks(),
            chars_per_token: default_chars_per_token(),
            block_threshold_bytes: default_block_threshold_bytes(),
            block_threshold_nodes: default_block_threshold_nodes(),
            block_threshold_images: default_block_threshold_images(),
            blocked_url_patterns: default_blocked_url_patterns(),
            reload_with_blocking: true,
        }
    }
}

fn default_token_budget() -> usize {
    8_000
}

fn default_safe_token_limit() -> usize {
    12_000
}

fn default_emergency_token_limit() -> usize {
    25_000
}

fn default_summary_token_budget() -> usize {
    500
}

fn default_max_chunks() -> usize {
    200
}

fn default_chars_per_token() -> f64 {
    4.0
}

fn default_block_threshold_bytes() -> u64 {
    500_000
}

fn default_block_threshold_nodes() -> u64 {
    5_000
}

fn default_block_threshold_images() -> u64 {
    50
}

fn default_blocked_url_patterns() -> Vec<String> {
    [
        "*.png", "*.jpg", "*.jpeg", "*.gif", "*.webp", "*.svg", "*.ico",
        "*.woff", "*.woff2", "*.ttf", "*.otf",
        "*.mp4", "*.webm", "*.mp3", "*.avi",
        "*doubleclick.net*", "*googlesyndication.com*", "*google-analytics.com*",
        "*googletagmanager.com*", "*facebook.net*", "*adservice.*",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Selector self-healing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Minimum confidence accepted for any fallback.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Minimum confidence accepted for click and type.
    #[serde(default = "default_destructive_min_confidence")]
    pub destructive_min_confidence: f64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            destructive_min_confidence: default_destructive_min_confidence(),
        }
    }
}

fn default_min_confidence() -> f64 {
    0.3
}

fn default_destructive_min_confidence() -> f64 {
    0.5
}
