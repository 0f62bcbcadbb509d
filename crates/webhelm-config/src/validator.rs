//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Fail with every error, or return the warnings.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        if self.errors.is_empty() {
            return Ok(self.warnings);
        }
        Err(ConfigError::Invalid {
            problems: self
                .errors
                .into_iter()
                .map(|e| format!("{}: {}", e.path, e.message))
                .collect(),
        })
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_browser(config, &mut result);
        Self::validate_session(config, &mut result);
        Self::validate_breaker(config, &mut result);
        Self::validate_content(config, &mut result);
        Self::validate_selector(config, &mut result);

        if config.workflow.history_capacity == 0 {
            result.add_error(ValidationError::new(
                "workflow.history_capacity",
                "history_capacity must be greater than 0",
            ));
        }

        result
    }

    fn validate_browser(config: &Config, result: &mut ValidationResult) {
        let browser = &config.browser;
        if browser.port == 0 {
            result.add_error(ValidationError::new("browser.port", "Port cannot be 0"));
        }

        if browser.port_scan_range == 0 {
            result.add_error(ValidationError::new(
                "browser.port_scan_range",
                "port_scan_range must be greater than 0",
            ));
        } else if u32::from(browser.port) + u32::from(browser.port_scan_range) > 65_536 {
            result.add_warning(ValidationWarning::new(
                "browser.port_scan_range",
                "scan range runs past port 65535 and will be cut short",
            ));
        }

        if browser.hosts.is_empty() {
            result.add_error(ValidationError::new(
                "browser.hosts",
                "At least one host candidate is required",
            ));
        }

        if let Some(path) = &browser.executable_path {
            if !std::path::Path::new(path).exists() {
                result.add_warning(ValidationWarning::new(
                    "browser.executable_path",
                    format!("Browser executable does not exist: {}", path),
                ));
            }
        }
    }

    fn validate_session(config: &Config, result: &mut ValidationResult) {
        let session = &config.session;
        if session.operation_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "session.operation_timeout_ms",
                "operation_timeout_ms must be greater than 0",
            ));
        }

        if session.liveness_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "session.liveness_timeout_ms",
                "liveness_timeout_ms must be greater than 0",
            ));
        }

        if session.busy_wait_ms > session.operation_timeout_ms {
            result.add_warning(ValidationWarning::new(
                "session.busy_wait_ms",
                "busy_wait_ms exceeds operation_timeout_ms; queued calls may wait longer than they run",
            ));
        }

        if session.launch_retries > 10 {
            result.add_warning(ValidationWarning::new(
                "session.launch_retries",
                "launch_retries is very high (>10), init may block for a long time",
            ));
        }
    }

    fn validate_breaker(config: &Config, result: &mut ValidationResult) {
        let breaker = &config.breaker;
        if breaker.failure_threshold == 0 {
            result.add_error(ValidationError::new(
                "breaker.failure_threshold",
                "failure_threshold must be greater than 0",
            ));
        }

        if breaker.multiplier < 1.0 {
            result.add_error(ValidationError::new(
                "breaker.multiplier",
                "multiplier must be at least 1.0",
            ));
        }

        if breaker.max_cooldown_ms < breaker.base_cooldown_ms {
            result.add_error(ValidationError::new(
                "breaker.max_cooldown_ms",
                "max_cooldown_ms must be at least base_cooldown_ms",
            ));
        }
    }

    fn validate_content(config: &Config, result: &mut ValidationResult) {
        let content = &config.content;
        if content.default_token_budget == 0 {
            result.add_error(ValidationError::new(
                "content.default_token_budget",
                "default_token_budget must be greater than 0",
            ));
        }

        if content.summary_token_budget == 0 {
            result.add_error(ValidationError::new(
                "content.summary_token_budget",
                "summary_token_budget must be greater than 0",
            ));
        }

        if content.emergency_token_limit < content.default_token_budget {
            result.add_error(ValidationError::new(
                "content.emergency_token_limit",
                "emergency_token_limit must be at least default_token_budget",
            ));
        }

        if content.safe_token_limit > content.emergency_token_limit {
            result.add_error(ValidationError::new(
                "content.safe_token_limit",
                "safe_token_limit must not exceed emergency_token_limit",
            ));
        }

        if content.summary_token_budget > content.default_token_budget {
            result.add_warning(ValidationWarning::new(
                "content.summary_token_budget",
                "summary_token_budget is larger than default_token_budget",
            ));
        }

        if content.max_chunks == 0 {
            result.add_error(ValidationError::new(
                "content.max_chunks",
                "max_chunks must be greater than 0",
            ));
        }

        if !(content.chars_per_token.is_finite() && content.chars_per_token > 0.0) {
            result.add_error(ValidationError::new(
                "content.chars_per_token",
                "chars_per_token must be a positive number",
            ));
        }
    }

    fn validate_selector(config: &Config, result: &mut ValidationResult) {
        let selector = &config.selector;
        for (path, value) in [
            ("selector.min_confidence", selector.min_confidence),
            (
                "selector.destructive_min_confidence",
                selector.destructive_min_confidence,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) || value == 0.0 {
                result.add_error(ValidationError::new(
                    path,
                    "confidence threshold must be in (0, 1]",
                ));
            }
        }

        if selector.destructive_min_confidence < selector.min_confidence {
            result.add_warning(ValidationWarning::new(
                "selector.destructive_min_confidence",
                "destructive threshold is below min_confidence and has no effect",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
