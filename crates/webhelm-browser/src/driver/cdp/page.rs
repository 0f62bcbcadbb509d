//! Page target driven over a flattened CDP session.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use super::client::CdpClient;
use super::error::CdpError;
use super::protocol::{MouseButton, MouseEventType};
use crate::driver::{DriverError, PageHandle, WaitCondition, script};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Which document a load wait must observe. The previous document can still
/// report `complete` right after a navigation is issued.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LoaderWait {
    /// Same-document navigation; no new loader.
    Any,
    /// The loader returned by `Page.navigate`.
    Is(String),
    /// Anything but the loader that was current before a reload.
    Not(String),
}

impl LoaderWait {
    fn is_satisfied(&self, current: Option<&str>) -> bool {
        match self {
            Self::Any => true,
            Self::Is(expected) => current == Some(expected.as_str()),
            Self::Not(previous) => current.is_some_and(|id| id != previous),
        }
    }
}

/// A session attached to a single page target.
pub struct CdpPage {
    client: Arc<CdpClient>,
    target_id: String,
    session_id: String,
}

impl CdpPage {
    pub(super) fn new(client: Arc<CdpClient>, target_id: String, session_id: String) -> Self {
        Self {
            client,
            target_id,
            session_id,
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.client.call(method, params, Some(&self.session_id)).await
    }

    pub(super) async fn enable_domains(&self) -> Result<(), CdpError> {
        self.call("Page.enable", None).await?;
        self.call("Runtime.enable", None).await?;
        self.call("Network.enable", None).await?;

        debug!("Enabled CDP domains for session {}", self.session_id);
        Ok(())
    }

    /// Loader of the main frame's current document.
    async fn loader_id(&self) -> Result<Option<String>, CdpError> {
        let tree = self.call("Page.getFrameTree", None).await?;
        Ok(tree["frameTree"]["frame"]["loaderId"]
            .as_str()
            .map(str::to_string))
    }

    /// Poll until the document behind `loader` reaches the `wait` state.
    async fn wait_for_ready(&self, wait: WaitCondition, loader: LoaderWait) -> Result<(), CdpError> {
        let accept: &[&str] = match wait {
            WaitCondition::None => return Ok(()),
            WaitCondition::Load => &["complete"],
            WaitCondition::DomContentLoaded => &["interactive", "complete"],
        };
        let start = Instant::now();

        loop {
            let current = match &loader {
                LoaderWait::Any => None,
                _ => self.loader_id().await?,
            };
            if loader.is_satisfied(current.as_deref()) {
                let result = self.js("document.readyState").await?;
                if result.as_str().is_some_and(|state| accept.contains(&state)) {
                    return Ok(());
                }
            }

            if start.elapsed() > LOAD_TIMEOUT {
                return Err(CdpError::Timeout(format!(
                    "Navigation timeout of {} ms exceeded",
                    LOAD_TIMEOUT.as_millis()
                )));
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn js(&self, expression: &str) -> Result<Value, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception["exception"]["description"]
                .as_str()
                .or_else(|| exception["text"].as_str())
                .unwrap_or("Unknown error");
            return Err(CdpError::JavaScript(text.to_string()));
        }

        Ok(result["result"]["value"].clone())
    }

    async fn mouse_click(&self, x: f64, y: f64) -> Result<(), CdpError> {
        for event in [MouseEventType::MousePressed, MouseEventType::MouseReleased] {
            self.call(
                "Input.dispatchMouseEvent",
                Some(json!({
                    "type": event,
                    "x": x,
                    "y": y,
                    "button": MouseButton::Left,
                    "clickCount": 1,
                })),
            )
            .await?;
        }
        debug!("Clicked at ({}, {})", x, y);
        Ok(())
    }
}

#[async_trait]
impl PageHandle for CdpPage {
    async fn goto(&self, url: &str, wait: WaitCondition) -> Result<(), DriverError> {
        let result = self.call("Page.navigate", Some(json!({"url": url}))).await?;

        if let Some(error) = result.get("errorText").and_then(Value::as_str) {
            return Err(CdpError::NavigationFailed(format!("{} at {}", error, url)).into());
        }

        let loader = match result.get("loaderId").and_then(Value::as_str) {
            Some(id) => LoaderWait::Is(id.to_string()),
            None => LoaderWait::Any,
        };
        self.wait_for_ready(wait, loader).await?;
        debug!("Navigated to {}", url);
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, DriverError> {
        Ok(self.js(expression).await?)
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        let start = Instant::now();
        loop {
            if self.count_matches(selector).await? > 0 {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(DriverError::ElementNotFound(format!(
                    "timed out waiting for selector `{}`",
                    selector
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn click(&self, selector: &str) -> Result<(), DriverError> {
        let center = self.js(&script::element_center(selector)).await?;
        let (Some(x), Some(y)) = (center["x"].as_f64(), center["y"].as_f64()) else {
            return Err(DriverError::ElementNotFound(selector.to_string()));
        };
        Ok(self.mouse_click(x, y).await?)
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), DriverError> {
        let focused = self.js(&script::focus_element(selector)).await?;
        if focused.as_bool() != Some(true) {
            return Err(DriverError::ElementNotFound(selector.to_string()));
        }
        self.call("Input.insertText", Some(json!({"text": text})))
            .await?;
        debug!("Typed {} characters", text.len());
        Ok(())
    }

    async fn set_blocked_urls(&self, patterns: &[String]) -> Result<(), DriverError> {
        self.call("Network.setBlockedURLs", Some(json!({"urls": patterns})))
            .await?;
        Ok(())
    }

    async fn content(&self) -> Result<String, DriverError> {
        let result = self.js("document.documentElement.outerHTML").await?;
        Ok(result.as_str().unwrap_or("").to_string())
    }

    async fn url(&self) -> Result<String, DriverError> {
        let result = self.js("window.location.href").await?;
        Ok(result.as_str().unwrap_or("").to_string())
    }

    async fn reload(&self, wait: WaitCondition) -> Result<(), DriverError> {
        let loader = match self.loader_id().await? {
            Some(previous) => LoaderWait::Not(previous),
            None => LoaderWait::Any,
        };
        self.call("Page.reload", None).await?;
        self.wait_for_ready(wait, loader).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_waits_for_its_own_loader() {
        let wait = LoaderWait::Is("L2".to_string());
        assert!(!wait.is_satisfied(Some("L1")));
        assert!(!wait.is_satisfied(None));
        assert!(wait.is_satisfied(Some("L2")));
    }

    #[test]
    fn test_reload_waits_for_a_new_loader() {
        let wait = LoaderWait::Not("L1".to_string());
        assert!(!wait.is_satisfied(Some("L1")));
        assert!(wait.is_satisfied(Some("L3")));
        assert!(LoaderWait::Any.is_satisfied(None));
    }
}
