use std::sync::Arc;

use webhelm_config::Config;
use webhelm_core::ToolRegistry;
use webhelm_protocols::{ErrorKind, RiskLevel, Tool, ToolContext, ToolError};

use super::*;
use crate::content::{ContentFormat, ContentMode, ContentRequest};
use crate::context::BrowserContext;
use crate::driver::WaitCondition;
use crate::driver::fixture::FixtureLauncher;

const PAGE: &str = "<!DOCTYPE html><html><body><main><h1>Docs</h1>\
    <button id=\"save\">Save</button><input id=\"name\" placeholder=\"Your name\"></main></body></html>";

fn context() -> (FixtureLauncher, Arc<BrowserContext>) {
    let fixture = FixtureLauncher::new().serve("https://docs.test", PAGE);
    let context = Arc::new(BrowserContext::new(Config::default(), Arc::new(fixture.clone())));
    (fixture, context)
}

#[test]
fn test_timeout_helper() {
    assert_eq!(timeout(None), None);
    assert_eq!(timeout(Some(0)), None);
    assert_eq!(timeout(Some(1500)), Some(std::time::Duration::from_millis(1500)));
}

#[test]
fn test_parse_params_treats_null_as_empty_object() {
    let params: InitParams = parse_params(serde_json::Value::Null).unwrap();
    assert!(!params.force);
    assert_eq!(params.headless, None);
}

#[test]
fn test_parse_params_error_is_invalid_parameters() {
    let err = parse_params::<NavigateParams>(serde_json::json!({"href": "x"})).unwrap_err();
    assert!(matches!(err, ToolError::InvalidParameters(_)));
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_navigate_params() {
    let json = serde_json::json!({
        "url": "https://example.com",
        "wait_until": "domcontentloaded",
        "timeout_ms": 60000
    });
    let params: NavigateParams = serde_json::from_value(json).unwrap();
    assert_eq!(params.url, "https://example.com");
    assert_eq!(params.wait_until, WaitCondition::DomContentLoaded);
    assert_eq!(params.timeout_ms, Some(60000));

    let params: NavigateParams =
        serde_json::from_value(serde_json::json!({"url": "https://example.com"})).unwrap();
    assert_eq!(params.wait_until, WaitCondition::Load);
    assert_eq!(params.timeout_ms, None);
}

#[test]
fn test_type_params_require_text() {
    let json = serde_json::json!({"selector": "input"});
    assert!(serde_json::from_value::<TypeParams>(json).is_err());

    let json = serde_json::json!({"selector": "input", "text": "hello"});
    let params: TypeParams = serde_json::from_value(json).unwrap();
    assert_eq!(params.selector, "input");
    assert_eq!(params.text, "hello");
}

#[test]
fn test_get_content_params_defaults() {
    let params: GetContentParams = serde_json::from_value(serde_json::json!({})).unwrap();
    assert_eq!(params.mode, ContentMode::Main);
    assert_eq!(params.format, ContentFormat::Text);
    assert_eq!(params.token_budget, None);

    let json = serde_json::json!({
        "mode": "selector",
        "selector": "#price",
        "token_budget": 200,
        "format": "html",
        "timeout_ms": 500
    });
    let request: ContentRequest = serde_json::from_value::<GetContentParams>(json)
        .unwrap()
        .into();
    assert_eq!(request.mode, ContentMode::Selector);
    assert_eq!(request.selector.as_deref(), Some("#price"));
    assert_eq!(request.budget, Some(200));
    assert_eq!(request.format, ContentFormat::Html);
    assert_eq!(request.timeout, Some(std::time::Duration::from_millis(500)));
}

#[test]
fn test_get_content_params_reject_unknown_mode() {
    let json = serde_json::json!({"mode": "everything"});
    assert!(serde_json::from_value::<GetContentParams>(json).is_err());
}

#[test]
fn test_register_tools() {
    let (_fixture, context) = context();
    let registry = ToolRegistry::new();
    register_tools(&registry, context.clone()).unwrap();

    let ids: Vec<String> = registry.list().into_iter().map(|d| d.id).collect();
    assert_eq!(
        ids,
        vec![
            "browser_click",
            "browser_close",
            "browser_execute_js",
            "browser_get_content",
            "browser_init",
            "browser_navigate",
            "browser_status",
            "browser_type",
            "browser_wait_for",
        ]
    );
    assert_eq!(
        registry.get("browser_execute_js").unwrap().risk_level(),
        RiskLevel::High
    );
    assert_eq!(registry.get("browser_click").unwrap().risk_level(), RiskLevel::Medium);

    // A second registration collides.
    assert!(register_tools(&registry, context).is_err());
}

#[tokio::test]
async fn test_tools_drive_the_context() {
    let (fixture, context) = context();

    let init = InitTool::new(context.clone())
        .execute(serde_json::json!({}), ToolContext::new())
        .await
        .unwrap();
    assert!(init.success);
    assert_eq!(init.structured_output.unwrap()["reused"], false);

    let nav = NavigateTool::new(context.clone())
        .execute(serde_json::json!({"url": "https://docs.test/"}), ToolContext::new())
        .await
        .unwrap();
    assert_eq!(nav.structured_output.unwrap()["url"], "https://docs.test/");

    let click = ClickTool::new(context.clone())
        .execute(serde_json::json!({"selector": "#Save"}), ToolContext::new())
        .await
        .unwrap();
    assert!(click.content.contains("resolved from #Save"));
    assert_eq!(fixture.clicks(), vec!["#save".to_string()]);

    let content = GetContentTool::new(context.clone())
        .execute(serde_json::json!({"mode": "main"}), ToolContext::new())
        .await
        .unwrap();
    assert!(content.content.contains("Docs"));
    let structured = content.structured_output.unwrap();
    assert!(structured.get("content").is_none());
    assert_eq!(structured["mode"], "main");

    let status = StatusTool::new(context.clone())
        .execute(serde_json::Value::Null, ToolContext::new())
        .await
        .unwrap();
    assert!(status.content.starts_with("Session ready at https://docs.test/"));

    let close = CloseTool::new(context)
        .execute(serde_json::Value::Null, ToolContext::new())
        .await
        .unwrap();
    assert_eq!(close.structured_output.unwrap()["closed"], true);
    assert_eq!(fixture.open_browsers(), 0);
}

#[tokio::test]
async fn test_tool_errors_carry_browser_kind() {
    let (_fixture, context) = context();
    context.init(Default::default()).await.unwrap();

    let err = NavigateTool::new(context)
        .execute(serde_json::json!({"url": "gopher://old.test"}), ToolContext::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_payload().message.contains("Unsupported URL scheme"));
}
