//! Navigation tool.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use webhelm_protocols::{Tool, ToolContext, ToolDefinition, ToolError, ToolResult};

use crate::context::BrowserContext;
use crate::driver::WaitCondition;
use crate::workflow;

use super::{parse_params, timeout};

// ============================================================================
// Navigate Tool
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct NavigateParams {
    pub url: String,
    #[serde(default)]
    pub wait_until: WaitCondition,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Navigate the session's page to a URL.
pub struct NavigateTool {
    definition: ToolDefinition,
    context: Arc<BrowserContext>,
}

impl NavigateTool {
    pub fn new(context: Arc<BrowserContext>) -> Self {
        Self {
            definition: ToolDefinition::new(
                workflow::NAVIGATE,
                "Browser Navigate",
                "Navigate the browser page to a URL",
            )
            .with_parameters_schema(serde_json::json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string"},
                    "wait_until": {"type": "string", "enum": ["load", "domcontentloaded", "none"]},
                    "timeout_ms": {"type": "integer", "minimum": 0}
                },
                "required": ["url"]
            })),
            context,
        }
    }
}

#[async_trait]
impl Tool for NavigateTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let params: NavigateParams = parse_params(params)?;

        let landed = self
            .context
            .navigate(&params.url, params.wait_until, timeout(params.timeout_ms))
            .await?;

        debug!("Navigated to {} (requested {})", landed, params.url);
        Ok(ToolResult::success_json(
            format!("Navigated to {}", landed),
            serde_json::json!({ "url": landed }),
        ))
    }
}
