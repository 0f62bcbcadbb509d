use super::*;

#[test]
fn test_validate_default_config() {
    let config = Config::default();
    let result = ConfigValidator::validate(&config);
    assert!(result.is_valid(), "{:?}", result.errors);
}

#[test]
fn test_validate_invalid_port() {
    let mut config = Config::default();
    config.browser.port = 0;

    let result = ConfigValidator::validate(&config);
    assert!(!result.is_valid());
    assert!(result.errors.iter().any(|e| e.path == "browser.port"));
}

#[test]
fn test_validate_empty_hosts() {
    let mut config = Config::default();
    config.browser.hosts.clear();

    let result = ConfigValidator::validate(&config);
    assert!(result.errors.iter().any(|e| e.path == "browser.hosts"));
}

#[test]
fn test_validate_scan_range_past_max_port_warns() {
    let mut config = Config::default();
    config.browser.port = 65_530;

    let result = ConfigValidator::validate(&config);
    assert!(result.is_valid());
    assert!(result.warnings.iter().any(|w| w.path == "browser.port_scan_range"));
}

#[test]
fn test_validate_emergency_below_default_budget() {
    let mut config = Config::default();
    config.content.emergency_token_limit = 1_000;
    config.content.safe_token_limit = 900;

    let result = ConfigValidator::validate(&config);
    assert!(!result.is_valid());
    assert!(
        result
            .errors
            .iter()
            .any(|e| e.path == "content.emergency_token_limit")
    );
}

#[test]
fn test_validate_safe_above_emergency() {
    let mut config = Config::default();
    config.content.safe_token_limit = 30_000;

    let result = ConfigValidator::validate(&config);
    assert!(result.errors.iter().any(|e| e.path == "content.safe_token_limit"));
}

#[test]
fn test_validate_chars_per_token() {
    let mut config = Config::default();
    config.content.chars_per_token = 0.0;

    let result = ConfigValidator::validate(&config);
    assert!(result.errors.iter().any(|e| e.path == "content.chars_per_token"));
}

#[test]
fn test_validate_breaker() {
    let mut config = Config::default();
    config.breaker.failure_threshold = 0;
    config.breaker.multiplier = 0.5;
    config.breaker.max_cooldown_ms = 10;

    let result = ConfigValidator::validate(&config);
    let paths: Vec<_> = result.errors.iter().map(|e| e.path.as_str()).collect();
    assert!(paths.contains(&"breaker.failure_threshold"));
    assert!(paths.contains(&"breaker.multiplier"));
    assert!(paths.contains(&"breaker.max_cooldown_ms"));
}

#[test]
fn test_validate_selector_thresholds() {
    let mut config = Config::default();
    config.selector.min_confidence = 1.5;

    let result = ConfigValidator::validate(&config);
    assert!(result.errors.iter().any(|e| e.path == "selector.min_confidence"));
}

#[test]
fn test_validate_destructive_below_min_warns() {
    let mut config = Config::default();
    config.selector.destructive_min_confidence = 0.2;

    let result = ConfigValidator::validate(&config);
    assert!(result.is_valid());
    assert!(!result.warnings.is_empty());
}

#[test]
fn test_validate_busy_wait_warning() {
    let mut config = Config::default();
    config.session.busy_wait_ms = 60_000;

    let result = ConfigValidator::validate(&config);
    assert!(result.is_valid());
    assert!(result.warnings.iter().any(|w| w.path == "session.busy_wait_ms"));
}

#[test]
fn test_into_result() {
    let mut config = Config::default();
    config.workflow.history_capacity = 0;

    let err = ConfigValidator::validate(&config).into_result().unwrap_err();
    assert!(err.to_string().contains("workflow.history_capacity"));

    let warnings = ConfigValidator::validate(&Config::default()).into_result().unwrap();
    assert!(warnings.is_empty());
}
