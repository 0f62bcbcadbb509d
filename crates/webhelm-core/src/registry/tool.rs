//! Tool registry for managing available tools.

use std::sync::Arc;

use webhelm_protocols::{Tool, ToolDefinition};

use super::base::{BaseRegistry, Registerable};
use crate::error::RegistryError;

impl Registerable for dyn Tool {
    fn registry_id(&self) -> &str {
        &self.definition().id
    }
}

/// Registry for managing tools.
pub struct ToolRegistry {
    inner: BaseRegistry<dyn Tool>,
}

impl ToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self {
            inner: BaseRegistry::new(),
        }
    }

    /// Register a tool.
    pub fn register(&self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        self.inner.register(tool)
    }

    pub fn unregister(&self, id: &str) -> Result<(), RegistryError> {
        self.inner.unregister(id)
    }

    /// Get a tool by ID.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Tool>> {
        self.inner.get(id)
    }

    /// List all tool definitions, sorted by id.
    pub fn list(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> =
            self.inner.iter().map(|t| t.definition().clone()).collect();
        defs.sort_by(|a, b| a.id.cmp(&b.id));
        defs
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use webhelm_protocols::{ToolContext, ToolError, ToolResult};

    struct MockTool {
        definition: ToolDefinition,
    }

    impl MockTool {
        fn new(id: &str) -> Self {
            Self {
                definition: ToolDefinition::new(id, "Mock", "A mock tool"),
            }
        }
    }

    #[async_trait]
    impl Tool for MockTool {
        fn definition(&self) -> &ToolDefinition {
            &self.definition
        }

        async fn execute(
            &self,
            _params: serde_json::Value,
            _ctx: ToolContext,
        ) -> Result<ToolResult, ToolError> {
            Ok(ToolResult::success("executed"))
        }
    }

    #[test]
    fn test_registry_creation() {
        let registry = ToolRegistry::new();
        assert!(registry.list().is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_tool() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(MockTool::new("browser_init"))).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_duplicate() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(MockTool::new("browser_init"))).unwrap();
        assert!(registry.register(Arc::new(MockTool::new("browser_init"))).is_err());
    }

    #[test]
    fn test_unregister_tool() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(MockTool::new("browser_init"))).unwrap();
        registry.unregister("browser_init").unwrap();
        assert!(registry.list().is_empty());
        assert!(registry.unregister("browser_init").is_err());
    }

    #[test]
    fn test_get_tool() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(MockTool::new("browser_close"))).unwrap();
        assert_eq!(registry.get("browser_close").unwrap().definition().id, "browser_close");
        assert!(registry.get("browser_open").is_none());
    }

    #[test]
    fn test_list_sorted() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(MockTool::new("browser_status"))).unwrap();
        registry.register(Arc::new(MockTool::new("browser_close"))).unwrap();
        let ids: Vec<_> = registry.list().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["browser_close", "browser_status"]);
    }
}
