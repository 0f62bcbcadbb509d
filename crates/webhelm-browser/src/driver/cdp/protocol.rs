//! CDP protocol types and message definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// CDP request message.
#[derive(Debug, Serialize)]
pub struct CdpRequest {
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// CDP response or event message.
#[derive(Debug, Deserialize)]
pub struct CdpResponse {
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<CdpErrorResponse>,
    pub method: Option<String>,
    pub params: Option<Value>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CdpErrorResponse {
    pub code: i64,
    pub message: String,
    pub data: Option<String>,
}

/// Target info from `Target.getTargets`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    pub target_id: String,
    #[serde(rename = "type")]
    pub target_type: String,
    pub title: String,
    pub url: String,
    pub attached: Option<bool>,
}

/// Browser version info from `/json/version`.
///
/// Chrome returns PascalCase field names for this endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserVersion {
    #[serde(rename = "Browser")]
    pub browser: String,
    #[serde(rename = "Protocol-Version")]
    pub protocol_version: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MouseEventType {
    MousePressed,
    MouseReleased,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cdp_request_serialize() {
        let req = CdpRequest {
            id: 1,
            method: "Page.navigate".to_string(),
            params: Some(serde_json::json!({"url": "https://example.com"})),
            session_id: Some("S1".to_string()),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("Page.navigate"));
        assert!(json.contains("\"sessionId\":\"S1\""));
    }

    #[test]
    fn test_cdp_request_skips_empty_fields() {
        let req = CdpRequest {
            id: 2,
            method: "Browser.getVersion".to_string(),
            params: None,
            session_id: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("params"));
        assert!(!json.contains("sessionId"));
    }

    #[test]
    fn test_cdp_response_error() {
        let json = r#"{"id": 3, "error": {"code": -32000, "message": "Frame detached"}}"#;
        let resp: CdpResponse = serde_json::from_str(json).unwrap();
        let error = resp.error.unwrap();
        assert_eq!(error.code, -32000);
        assert_eq!(error.message, "Frame detached");
    }

    #[test]
    fn test_cdp_event_deserialize() {
        let json = r#"{"method": "Page.loadEventFired", "params": {"timestamp": 1.0}, "sessionId": "S1"}"#;
        let resp: CdpResponse = serde_json::from_str(json).unwrap();
        assert!(resp.id.is_none());
        assert_eq!(resp.method.as_deref(), Some("Page.loadEventFired"));
    }

    #[test]
    fn test_browser_version_deserialize() {
        let json = r#"{
            "Browser": "Chrome/126.0",
            "Protocol-Version": "1.3",
            "User-Agent": "Mozilla/5.0",
            "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/browser/abc"
        }"#;
        let version: BrowserVersion = serde_json::from_str(json).unwrap();
        assert_eq!(version.browser, "Chrome/126.0");
        assert!(version.web_socket_debugger_url.starts_with("ws://"));
    }

    #[test]
    fn test_mouse_event_serialize() {
        assert_eq!(
            serde_json::to_value(MouseEventType::MousePressed).unwrap(),
            "mousePressed"
        );
        assert_eq!(serde_json::to_value(MouseButton::Left).unwrap(), "left");
    }
}
