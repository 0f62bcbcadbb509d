//! Gated tool dispatch.
//!
//! Every call goes through the same steps: the gate admits (or rejects)
//! the operation, the tool is looked up and executed, and the outcome is
//! reported back to the gate. Rejections never reach the tool.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use webhelm_protocols::{
    ErrorKind, OperationOutcome, RiskLevel, ToolContext, ToolError, ToolGate, ToolResult,
};

use crate::registry::ToolRegistry;

/// Routes tool calls through a [`ToolGate`] into the [`ToolRegistry`].
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    gate: Arc<dyn ToolGate>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, gate: Arc<dyn ToolGate>) -> Self {
        Self { registry, gate }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Dispatch one call. Failures are returned as a failed [`ToolResult`]
    /// carrying an [`webhelm_protocols::ErrorPayload`], never as a Rust error.
    pub async fn dispatch(
        &self,
        operation: &str,
        params: serde_json::Value,
        ctx: ToolContext,
    ) -> ToolResult {
        let correlation_id = ctx.correlation_id.clone();

        if let Err(payload) = self.gate.admit(operation) {
            info!(
                operation,
                correlation_id = %correlation_id,
                kind = %payload.kind,
                "Call rejected: {}",
                payload.message
            );
            return ToolResult::failure(payload);
        }

        let Some(tool) = self.registry.get(operation) else {
            let payload = ToolError::NotFound(operation.to_string()).to_payload();
            self.gate
                .record(operation, OperationOutcome::Failure(payload.kind));
            return ToolResult::failure(payload);
        };

        let risk = tool.risk_level();
        let started = Instant::now();
        if risk >= RiskLevel::Medium {
            info!(operation, correlation_id = %correlation_id, ?risk, "Dispatching page-changing tool call");
        } else {
            debug!(operation, correlation_id = %correlation_id, "Dispatching tool call");
        }

        let outcome = match tool.validate(&params) {
            Ok(()) => tool.execute(params, ctx).await,
            Err(e) => Err(e),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(result) => result,
            Err(err) => ToolResult::failure(err.to_payload()),
        };

        let recorded = match &result.error {
            Some(payload) => {
                warn!(
                    operation,
                    correlation_id = %correlation_id,
                    elapsed_ms,
                    "Tool call failed: {}",
                    payload
                );
                OperationOutcome::Failure(payload.kind)
            }
            None if result.success => OperationOutcome::Success,
            None => OperationOutcome::Failure(ErrorKind::Browser),
        };
        self.gate.record(operation, recorded);
        debug!(operation, elapsed_ms, success = result.success, "Tool call finished");

        result
            .with_metadata("duration_ms", serde_json::json!(elapsed_ms))
            .with_metadata("risk_level", serde_json::json!(risk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use webhelm_protocols::{ErrorPayload, Tool, ToolDefinition};

    /// Gate that admits everything except `blocked` and records outcomes.
    #[derive(Default)]
    struct Recorder {
        blocked: Option<String>,
        records: Mutex<Vec<(String, OperationOutcome)>>,
    }

    impl ToolGate for Recorder {
        fn admit(&self, operation: &str) -> Result<(), ErrorPayload> {
            if self.blocked.as_deref() == Some(operation) {
                return Err(ErrorPayload::new(
                    ErrorKind::Validation,
                    "browser_init was never called",
                ));
            }
            Ok(())
        }

        fn record(&self, operation: &str, outcome: OperationOutcome) {
            self.records
                .lock()
                .unwrap()
                .push((operation.to_string(), outcome));
        }
    }

    struct CountingTool {
        definition: ToolDefinition,
        calls: AtomicU32,
        fail_with: Option<ErrorKind>,
    }

    impl CountingTool {
        fn new(id: &str, fail_with: Option<ErrorKind>) -> Self {
            Self {
                definition: ToolDefinition::new(id, id, "counting tool")
                    .with_parameters_schema(serde_json::json!({"type": "object"})),
                calls: AtomicU32::new(0),
                fail_with,
            }
        }

        fn with_risk_level(mut self, risk: RiskLevel) -> Self {
            self.definition = self.definition.with_risk_level(risk);
            self
        }
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn definition(&self) -> &ToolDefinition {
            &self.definition
        }

        async fn execute(
            &self,
            _params: serde_json::Value,
            _ctx: ToolContext,
        ) -> Result<ToolResult, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.fail_with {
                Some(kind) => Err(ErrorPayload::new(kind, "boom").into()),
                None => Ok(ToolResult::success("ok")),
            }
        }
    }

    fn setup(
        tool: Arc<CountingTool>,
        blocked: Option<&str>,
    ) -> (Dispatcher, Arc<Recorder>) {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(tool).unwrap();
        let gate = Arc::new(Recorder {
            blocked: blocked.map(String::from),
            ..Default::default()
        });
        (Dispatcher::new(registry, gate.clone()), gate)
    }

    #[tokio::test]
    async fn test_dispatch_success_records_outcome() {
        let tool = Arc::new(CountingTool::new("browser_status", None));
        let (dispatcher, gate) = setup(tool.clone(), None);

        let result = dispatcher
            .dispatch("browser_status", serde_json::json!({}), ToolContext::new())
            .await;

        assert!(result.success);
        assert!(result.metadata.contains_key("duration_ms"));
        assert_eq!(tool.calls.load(Ordering::SeqCst), 1);
        let records = gate.records.lock().unwrap();
        assert_eq!(records[0], ("browser_status".to_string(), OperationOutcome::Success));
    }

    #[tokio::test]
    async fn test_result_reports_risk_level() {
        let tool = Arc::new(
            CountingTool::new("browser_execute_js", None).with_risk_level(RiskLevel::High),
        );
        let (dispatcher, _gate) = setup(tool, None);

        let result = dispatcher
            .dispatch("browser_execute_js", serde_json::json!({}), ToolContext::new())
            .await;

        assert_eq!(result.metadata["risk_level"], serde_json::json!("high"));
    }

    #[tokio::test]
    async fn test_rejected_call_never_reaches_tool() {
        let tool = Arc::new(CountingTool::new("browser_get_content", None));
        let (dispatcher, gate) = setup(tool.clone(), Some("browser_get_content"));

        let result = dispatcher
            .dispatch("browser_get_content", serde_json::json!({}), ToolContext::new())
            .await;

        assert!(!result.success);
        let error = result.error.unwrap();
        assert_eq!(error.kind, ErrorKind::Validation);
        assert!(error.message.contains("browser_init"));
        assert_eq!(tool.calls.load(Ordering::SeqCst), 0);
        assert!(gate.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tool_error_becomes_failed_result() {
        let tool = Arc::new(CountingTool::new("browser_navigate", Some(ErrorKind::NavigationTimeout)));
        let (dispatcher, gate) = setup(tool, None);

        let result = dispatcher
            .dispatch("browser_navigate", serde_json::json!({}), ToolContext::new())
            .await;

        assert!(!result.success);
        assert!(result.error.as_ref().unwrap().retryable);
        let records = gate.records.lock().unwrap();
        assert_eq!(
            records[0].1,
            OperationOutcome::Failure(ErrorKind::NavigationTimeout)
        );
    }

    #[tokio::test]
    async fn test_invalid_params_rejected_before_execute() {
        let tool = Arc::new(CountingTool::new("browser_click", None));
        let (dispatcher, _gate) = setup(tool.clone(), None);

        let result = dispatcher
            .dispatch("browser_click", serde_json::json!("not an object"), ToolContext::new())
            .await;

        assert_eq!(result.error.unwrap().kind, ErrorKind::Validation);
        assert_eq!(tool.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unregistered_tool() {
        let tool = Arc::new(CountingTool::new("browser_click", None));
        let (dispatcher, _gate) = setup(tool, None);

        let result = dispatcher
            .dispatch("browser_scroll", serde_json::json!({}), ToolContext::new())
            .await;

        let error = result.error.unwrap();
        assert_eq!(error.kind, ErrorKind::Validation);
        assert!(error.message.contains("browser_scroll"));
    }
}
