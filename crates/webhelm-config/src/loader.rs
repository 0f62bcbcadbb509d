//! Configuration loader.

use std::fs;
use std::path::Path;

use regex::Regex;

use crate::error::ConfigError;
use crate::schema::Config;

const ENV_VAR_PATTERN: &str = r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}";

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let mut config: Config = toml::from_str(&expanded)?;
        config.logging.dir = Self::expand_path(&config.logging.dir);
        if let Some(dir) = config.browser.profile_dir.take() {
            config.browser.profile_dir = Some(Self::expand_path(&dir));
        }
        if let Some(path) = config.browser.executable_path.take() {
            config.browser.executable_path = Some(Self::expand_path(&path));
        }
        Ok(config)
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();
        let re = Regex::new(ENV_VAR_PATTERN).map_err(|e| ConfigError::InvalidValue {
            field: "env_var_pattern".to_string(),
            message: e.to_string(),
        })?;

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/.webhelm`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config.browser.port, 9222);
        assert_eq!(config.content.default_token_budget, 8000);
    }

    #[test]
    fn test_load_partial_sections() {
        let content = r#"
            [browser]
            port = 9333
            headless = false

            [breaker]
            failure_threshold = 5
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.browser.port, 9333);
        assert!(!config.browser.headless);
        assert_eq!(config.breaker.failure_threshold, 5);
        // untouched fields keep their defaults
        assert_eq!(config.breaker.base_cooldown_ms, 5000);
        assert_eq!(config.session.busy_wait_ms, 5000);
    }

    #[test]
    fn test_load_content_section() {
        let content = r#"
            [content]
            default_token_budget = 2000
            emergency_token_limit = 9000
            chars_per_token = 3.5
            blocked_url_patterns = ["*.png"]
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.content.default_token_budget, 2000);
        assert_eq!(config.content.emergency_token_limit, 9000);
        assert_eq!(config.content.chars_per_token, 3.5);
        assert_eq!(config.content.blocked_url_patterns, vec!["*.png".to_string()]);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[session]").unwrap();
        writeln!(file, "operation_timeout_ms = 1500").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.session.operation_timeout_ms, 1500);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/webhelm.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_str("invalid = [unclosed");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: test-only variable name, not read elsewhere
        unsafe {
            std::env::set_var("WEBHELM_TEST_CHROME", "/opt/chrome/chrome");
        }
        let content = "[browser]\nexecutable_path = \"${WEBHELM_TEST_CHROME}\"";
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(
            config.browser.executable_path.as_deref(),
            Some("/opt/chrome/chrome")
        );
        unsafe {
            std::env::remove_var("WEBHELM_TEST_CHROME");
        }
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let content = "value = \"${WEBHELM_NONEXISTENT_VAR_12345}\"";
        let result = ConfigLoader::expand_env_vars(content);
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(name)) if name == "WEBHELM_NONEXISTENT_VAR_12345"));
    }

    #[test]
    fn test_expand_env_vars_no_vars() {
        let content = "value = \"no variables here\"";
        assert_eq!(ConfigLoader::expand_env_vars(content).unwrap(), content);
    }

    #[test]
    fn test_logging_dir_tilde_expanded() {
        let config = ConfigLoader::load_str("[logging]\ndir = \"~/logs\"").unwrap();
        assert!(!config.logging.dir.starts_with('~'));
        assert!(config.logging.dir.ends_with("/logs"));
    }

    #[test]
    fn test_expand_path_no_tilde() {
        assert_eq!(ConfigLoader::expand_path("/usr/local/bin"), "/usr/local/bin");
    }
}
