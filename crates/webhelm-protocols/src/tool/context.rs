//! Tool execution context.

/// Context for tool execution.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Correlation ID for tracing a single call through the logs.
    pub correlation_id: String,
}

impl ToolContext {
    /// Create a context with a fresh correlation ID.
    pub fn new() -> Self {
        Self {
            correlation_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl Default for ToolContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_context_new() {
        let ctx = ToolContext::new();
        assert!(!ctx.correlation_id.is_empty());
    }

    #[test]
    fn test_tool_context_correlation_id_unique() {
        assert_ne!(ToolContext::new().correlation_id, ToolContext::new().correlation_id);
    }
}
