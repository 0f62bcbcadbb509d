//! Configuration errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    /// Every problem found by the validator, as `path: message` lines.
    #[error("{}", describe_invalid(.problems))]
    Invalid { problems: Vec<String> },

    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
}

fn describe_invalid(problems: &[String]) -> String {
    let plural = if problems.len() == 1 { "" } else { "s" };
    format!("{} invalid setting{}: {}", problems.len(), plural, problems.join("; "))
}
