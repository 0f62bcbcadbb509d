//! Interaction tools: click, type, wait for.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use webhelm_protocols::{RiskLevel, Tool, ToolContext, ToolDefinition, ToolError, ToolResult};

use crate::context::{ActionOutcome, BrowserContext};
use crate::workflow;

use super::{parse_params, timeout, to_json};

/// Describe an action, mentioning the replacement selector when one was used.
fn describe(verb: &str, requested: &str, outcome: &ActionOutcome) -> String {
    match &outcome.selector_resolution {
        Some(resolution) => format!(
            "{} {} (resolved from {} via {} match, confidence {:.2})",
            verb,
            outcome.selector,
            requested,
            resolution
                .strategy_used
                .map(|s| s.as_str())
                .unwrap_or("unknown"),
            resolution.confidence
        ),
        None => format!("{} {}", verb, outcome.selector),
    }
}

fn selector_schema(extra: serde_json::Value) -> serde_json::Value {
    let mut properties = serde_json::json!({
        "selector": {"type": "string"},
        "timeout_ms": {"type": "integer", "minimum": 0}
    });
    if let (Some(props), Some(extra)) = (properties.as_object_mut(), extra.as_object()) {
        props.extend(extra.clone());
    }
    let mut required = vec!["selector"];
    if properties.get("text").is_some() {
        required.push("text");
    }
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

// ============================================================================
// Click Tool
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ClickParams {
    pub selector: String,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Click an element.
pub struct ClickTool {
    definition: ToolDefinition,
    context: Arc<BrowserContext>,
}

impl ClickTool {
    pub fn new(context: Arc<BrowserContext>) -> Self {
        Self {
            definition: ToolDefinition::new(
                workflow::CLICK,
                "Browser Click",
                "Click an element on the page",
            )
            .with_parameters_schema(selector_schema(serde_json::json!({})))
            .with_risk_level(RiskLevel::Medium),
            context,
        }
    }
}

#[async_trait]
impl Tool for ClickTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let params: ClickParams = parse_params(params)?;

        let outcome = self
            .context
            .click(&params.selector, timeout(params.timeout_ms))
            .await?;

        debug!("Clicked {}", outcome.selector);
        Ok(ToolResult::success_json(
            describe("Clicked", &params.selector, &outcome),
            to_json(&outcome),
        ))
    }
}

// ============================================================================
// Type Tool
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TypeParams {
    pub selector: String,
    pub text: String,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Type text into an input element.
pub struct TypeTool {
    definition: ToolDefinition,
    context: Arc<BrowserContext>,
}

impl TypeTool {
    pub fn new(context: Arc<BrowserContext>) -> Self {
        Self {
            definition: ToolDefinition::new(
                workflow::TYPE,
                "Browser Type",
                "Type text into an input element",
            )
            .with_parameters_schema(selector_schema(serde_json::json!({
                "text": {"type": "string"}
            })))
            .with_risk_level(RiskLevel::Medium),
            context,
        }
    }
}

#[async_trait]
impl Tool for TypeTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let params: TypeParams = parse_params(params)?;

        let outcome = self
            .context
            .type_text(&params.selector, &params.text, timeout(params.timeout_ms))
            .await?;

        debug!("Typed {} chars into {}", params.text.chars().count(), outcome.selector);
        Ok(ToolResult::success_json(
            describe("Typed into", &params.selector, &outcome),
            to_json(&outcome),
        ))
    }
}

// ============================================================================
// Wait For Tool
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct WaitForParams {
    pub selector: String,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Wait until an element is present.
pub struct WaitForTool {
    definition: ToolDefinition,
    context: Arc<BrowserContext>,
}

impl WaitForTool {
    pub fn new(context: Arc<BrowserContext>) -> Self {
        Self {
            definition: ToolDefinition::new(
                workflow::WAIT_FOR,
                "Browser Wait For",
                "Wait until an element matching the selector is present",
            )
            .with_parameters_schema(selector_schema(serde_json::json!({}))),
            context,
        }
    }
}

#[async_trait]
impl Tool for WaitForTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let params: WaitForParams = parse_params(params)?;

        let outcome = self
            .context
            .wait_for(&params.selector, timeout(params.timeout_ms))
            .await?;

        Ok(ToolResult::success_json(
            describe("Found", &params.selector, &outcome),
            to_json(&outcome),
        ))
    }
}
