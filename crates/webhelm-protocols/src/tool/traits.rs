//! Tool trait definition.

use async_trait::async_trait;

use super::{ToolContext, ToolDefinition, ToolResult};
use crate::error::ToolError;
use crate::types::RiskLevel;

/// Core trait for tools.
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> &ToolDefinition;

    /// Execute the tool with the given parameters.
    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: ToolContext,
    ) -> Result<ToolResult, ToolError>;

    /// Cheap structural check before execution.
    fn validate(&self, params: &serde_json::Value) -> Result<(), ToolError> {
        if let Some(schema) = &self.definition().parameters_schema {
            if schema.get("type") == Some(&serde_json::json!("object")) && !params.is_object() {
                return Err(ToolError::InvalidParameters(
                    "Parameters must be an object".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn risk_level(&self) -> RiskLevel {
        self.definition().risk_level
    }
}
