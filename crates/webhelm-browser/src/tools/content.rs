//! Content tools: get content, execute JavaScript.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use webhelm_protocols::{RiskLevel, Tool, ToolContext, ToolDefinition, ToolError, ToolResult};

use crate::content::{ContentFormat, ContentMode, ContentRequest};
use crate::context::BrowserContext;
use crate::workflow;

use super::{parse_params, timeout, to_json};

// ============================================================================
// Get Content Tool
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct GetContentParams {
    #[serde(default)]
    pub mode: ContentMode,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub token_budget: Option<usize>,
    #[serde(default)]
    pub format: ContentFormat,
    /// Continuation token from a previous chunked response.
    #[serde(default)]
    pub continuation: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl From<GetContentParams> for ContentRequest {
    fn from(params: GetContentParams) -> Self {
        ContentRequest {
            mode: params.mode,
            selector: params.selector,
            budget: params.token_budget,
            format: params.format,
            continuation: params.continuation,
            timeout: timeout(params.timeout_ms),
        }
    }
}

/// Return page content sized to the caller's token budget.
pub struct GetContentTool {
    definition: ToolDefinition,
    context: Arc<BrowserContext>,
}

impl GetContentTool {
    pub fn new(context: Arc<BrowserContext>) -> Self {
        Self {
            definition: ToolDefinition::new(
                workflow::GET_CONTENT,
                "Browser Get Content",
                "Get page content within a token budget; large pages come back in chunks \
                 with a continuation token for the next one",
            )
            .with_parameters_schema(serde_json::json!({
                "type": "object",
                "properties": {
                    "mode": {"type": "string", "enum": ["full", "main", "summary", "selector"], "default": "main"},
                    "selector": {"type": "string"},
                    "token_budget": {"type": "integer", "minimum": 1},
                    "format": {"type": "string", "enum": ["text", "html"], "default": "text"},
                    "continuation": {"type": "string"},
                    "timeout_ms": {"type": "integer", "minimum": 0}
                }
            })),
            context,
        }
    }
}

#[async_trait]
impl Tool for GetContentTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let params: GetContentParams = parse_params(params)?;

        let result = self.context.get_content(params.into()).await?;

        debug!(
            "Returned {} content (~{} tokens)",
            result.mode.as_str(),
            result.estimated_tokens
        );
        let mut structured = to_json(&result);
        if let Some(map) = structured.as_object_mut() {
            // The content is already the result's text.
            map.remove("content");
        }
        Ok(ToolResult::success_json(result.content, structured))
    }
}

// ============================================================================
// Execute JS Tool
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ExecuteJsParams {
    pub script: String,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Evaluate JavaScript in the page.
pub struct ExecuteJsTool {
    definition: ToolDefinition,
    context: Arc<BrowserContext>,
}

impl ExecuteJsTool {
    pub fn new(context: Arc<BrowserContext>) -> Self {
        Self {
            definition: ToolDefinition::new(
                workflow::EXECUTE_JS,
                "Browser Execute JS",
                "Evaluate a JavaScript expression in the page and return its value",
            )
            .with_parameters_schema(serde_json::json!({
                "type": "object",
                "properties": {
                    "script": {"type": "string"},
                    "timeout_ms": {"type": "integer", "minimum": 0}
                },
                "required": ["script"]
            }))
            .with_risk_level(RiskLevel::High),
            context,
        }
    }
}

#[async_trait]
impl Tool for ExecuteJsTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let params: ExecuteJsParams = parse_params(params)?;

        let output = self
            .context
            .execute_js(&params.script, timeout(params.timeout_ms))
            .await?;

        Ok(ToolResult::success_json(
            output.result,
            serde_json::json!({ "truncated": output.truncated }),
        ))
    }
}
