//! Browser, session and breaker configuration.

use serde::{Deserialize, Serialize};

use super::default_true;

/// Browser process configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Preferred remote-debugging port; the scan starts here.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Hosts a candidate port must be bindable on.
    #[serde(default = "default_hosts")]
    pub hosts: Vec<String>,

    #[serde(default = "default_port_scan_range")]
    pub port_scan_range: u16,

    /// Environment variable holding an explicit executable path.
    #[serde(default = "default_executable_env")]
    pub executable_env: String,

    /// Explicit executable path, checked after the environment override.
    #[serde(default)]
    pub executable_path: Option<String>,

    #[serde(default = "default_true")]
    pub headless: bool,

    /// Profile directory; a temporary one is used when unset.
    #[serde(default)]
    pub profile_dir: Option<String>,

    /// Extra command-line arguments passed to the browser.
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// How long to wait for the DevTools endpoint after spawning.
    #[serde(default = "default_launch_timeout_ms")]
    pub launch_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            hosts: default_hosts(),
            port_scan_range: default_port_scan_range(),
            executable_env: default_executable_env(),
            executable_path: None,
            headless: true,
            profile_dir: None,
            extra_args: Vec::new(),
            launch_timeout_ms: default_launch_timeout_ms(),
        }
    }
}

fn default_port() -> u16 {
    9222
}

fn default_hosts() -> Vec<String> {
    vec!["127.0.0.1".to_string()]
}

fn default_port_scan_range() -> u16 {
    20
}

fn default_executable_env() -> String {
    "WEBHELM_BROWSER_PATH".to_string()
}

fn default_launch_timeout_ms() -> u64 {
    10_000
}

/// Session lifecycle and call-timing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Per-call timeout when a tool does not pass its own.
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,

    /// How long a call waits for a busy session before giving up.
    #[serde(default = "default_busy_wait_ms")]
    pub busy_wait_ms: u64,

    #[serde(default = "default_liveness_timeout_ms")]
    pub liveness_timeout_ms: u64,

    /// Extra launch attempts after the first.
    #[serde(default = "default_launch_retries")]
    pub launch_retries: u32,

    #[serde(default = "default_launch_retry_delay_ms")]
    pub launch_retry_delay_ms: u64,

    /// Idle time after which a ready session is closed; 0 disables.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            operation_timeout_ms: default_operation_timeout_ms(),
            busy_wait_ms: default_busy_wait_ms(),
            liveness_timeout_ms: default_liveness_timeout_ms(),
            launch_retries: default_launch_retries(),
            launch_retry_delay_ms: default_launch_retry_delay_ms(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

fn default_operation_timeout_ms() -> u64 {
    30_000
}

fn default_busy_wait_ms() -> u64 {
    5_000
}

fn default_liveness_timeout_ms() -> u64 {
    2_000
}

fn default_launch_retries() -> u32 {
    2
}

fn default_launch_retry_delay_ms() -> u64 {
    500
}

fn default_idle_timeout_secs() -> u64 {
    900
}

/// Circuit breaker configuration, shared by every operation class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    #[serde(default = "default_base_cooldown_ms")]
    pub base_cooldown_ms: u64,

    #[serde(default = "default_max_cooldown_ms")]
    pub max_cooldown_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            base_cooldown_ms: default_base_cooldown_ms(),
            max_cooldown_ms: default_max_cooldown_ms(),
            multiplier: default_multiplier(),
        }
    }
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_base_cooldown_ms() -> u64 {
    5_000
}

fn default_max_cooldown_ms() -> u64 {
    60_000
}

fn default_multiplier() -> f64 {
    2.0
}
