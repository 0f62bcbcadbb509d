//! Session lifecycle tools: init, close, status.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use webhelm_protocols::{Tool, ToolContext, ToolDefinition, ToolError, ToolResult};

use crate::breaker::BreakerStatus;
use crate::context::BrowserContext;
use crate::session::InitOptions;
use crate::workflow;

use super::{parse_params, to_json};

// ============================================================================
// Init Tool
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct InitParams {
    /// Tear down a live session and start over.
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub headless: Option<bool>,
}

/// Start (or reuse) the browser session.
pub struct InitTool {
    definition: ToolDefinition,
    context: Arc<BrowserContext>,
}

impl InitTool {
    pub fn new(context: Arc<BrowserContext>) -> Self {
        Self {
            definition: ToolDefinition::new(
                workflow::INIT,
                "Browser Init",
                "Start the browser session, or return the live one unless force is set",
            )
            .with_parameters_schema(serde_json::json!({
                "type": "object",
                "properties": {
                    "force": {"type": "boolean", "default": false},
                    "headless": {"type": "boolean"}
                }
            })),
            context,
        }
    }
}

#[async_trait]
impl Tool for InitTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let params: InitParams = parse_params(params)?;

        let info = self
            .context
            .init(InitOptions {
                force: params.force,
                headless: params.headless,
            })
            .await?;

        let message = if info.reused {
            format!("Reusing browser session (generation {})", info.generation)
        } else {
            info!("Browser session {} ready", info.generation);
            format!("Browser session started (generation {})", info.generation)
        };
        Ok(ToolResult::success_json(message, to_json(&info)))
    }
}

// ============================================================================
// Close Tool
// ============================================================================

/// Close the browser session.
pub struct CloseTool {
    definition: ToolDefinition,
    context: Arc<BrowserContext>,
}

impl CloseTool {
    pub fn new(context: Arc<BrowserContext>) -> Self {
        Self {
            definition: ToolDefinition::new(
                workflow::CLOSE,
                "Browser Close",
                "Close the browser session; the workflow starts over at browser_init",
            ),
            context,
        }
    }
}

#[async_trait]
impl Tool for CloseTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(
        &self,
        _params: serde_json::Value,
        _ctx: ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let closed = self.context.close().await;
        debug!("browser_close (session was open: {})", closed);

        let message = if closed {
            "Browser session closed"
        } else {
            "No browser session was open"
        };
        Ok(ToolResult::success_json(
            message,
            serde_json::json!({ "closed": closed }),
        ))
    }
}

// ============================================================================
// Status Tool
// ============================================================================

/// Session diagnostics: state, breakers, recent operations.
pub struct StatusTool {
    definition: ToolDefinition,
    context: Arc<BrowserContext>,
}

impl StatusTool {
    pub fn new(context: Arc<BrowserContext>) -> Self {
        Self {
            definition: ToolDefinition::new(
                workflow::STATUS,
                "Browser Status",
                "Report the session state, circuit breakers and recent operations",
            ),
            context,
        }
    }
}

#[async_trait]
impl Tool for StatusTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(
        &self,
        _params: serde_json::Value,
        _ctx: ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let status = self.context.status();
        let open: Vec<&str> = status
            .breakers
            .iter()
            .filter(|b| b.status != BreakerStatus::Closed)
            .map(|b| b.class.as_str())
            .collect();

        let mut message = format!("Session {}", status.state.as_str());
        if let Some(url) = &status.url {
            message.push_str(&format!(" at {}", url));
        }
        if !open.is_empty() {
            message.push_str(&format!("; breakers not closed: {}", open.join(", ")));
        }
        Ok(ToolResult::success_json(message, to_json(&status)))
    }
}
