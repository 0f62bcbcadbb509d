//! Browser tools exposed to the agent.

mod content;
mod interaction;
mod lifecycle;
mod navigation;

pub use content::*;
pub use interaction::*;
pub use lifecycle::*;
pub use navigation::*;

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use webhelm_core::{RegistryError, ToolRegistry};
use webhelm_protocols::ToolError;

use crate::context::BrowserContext;

/// Register every browser tool against one shared context.
pub fn register_tools(
    registry: &ToolRegistry,
    context: Arc<BrowserContext>,
) -> Result<(), RegistryError> {
    registry.register(Arc::new(InitTool::new(context.clone())))?;
    registry.register(Arc::new(CloseTool::new(context.clone())))?;
    registry.register(Arc::new(StatusTool::new(context.clone())))?;
    registry.register(Arc::new(NavigateTool::new(context.clone())))?;
    registry.register(Arc::new(GetContentTool::new(context.clone())))?;
    registry.register(Arc::new(ClickTool::new(context.clone())))?;
    registry.register(Arc::new(TypeTool::new(context.clone())))?;
    registry.register(Arc::new(WaitForTool::new(context.clone())))?;
    registry.register(Arc::new(ExecuteJsTool::new(context)))?;
    Ok(())
}

// Shared helpers used by multiple submodules.

/// Deserialize tool params; a missing argument object counts as `{}`.
pub(crate) fn parse_params<T: DeserializeOwned>(params: serde_json::Value) -> Result<T, ToolError> {
    let params = match params {
        serde_json::Value::Null => serde_json::json!({}),
        other => other,
    };
    serde_json::from_value(params).map_err(|e| ToolError::InvalidParameters(e.to_string()))
}

pub(crate) fn timeout(timeout_ms: Option<u64>) -> Option<Duration> {
    timeout_ms.filter(|ms| *ms > 0).map(Duration::from_millis)
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
