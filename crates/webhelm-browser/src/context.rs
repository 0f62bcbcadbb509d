//! The browser context shared by every tool.

use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use webhelm_config::Config;
use webhelm_protocols::{ErrorKind, ErrorPayload, OperationOutcome, ToolGate};

use crate::breaker::{BreakerRegistry, OperationClass};
use crate::clock::{Clock, SystemClock};
use crate::content::{ContentEngine, ContentRequest, ContentResult, reduce};
use crate::driver::{BrowserLauncher, DriverError, PageHandle, WaitCondition};
use crate::error::BrowserError;
use crate::selector::{Intent, SelectorResolution, SelectorResolver};
use crate::session::{InitOptions, SessionInfo, SessionManager, SessionStatus};
use crate::workflow::WorkflowLedger;

/// Outcome of a click, type or wait.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Selector the action ran against.
    pub selector: String,
    /// Present when the given selector had to be resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector_resolution: Option<SelectorResolution>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptOutput {
    /// JSON rendering of the script's return value.
    pub result: String,
    pub truncated: bool,
}

/// Owns the session and everything that guards it.
pub struct BrowserContext {
    config: Config,
    session: Arc<SessionManager>,
    ledger: WorkflowLedger,
    content: ContentEngine,
    resolver: SelectorResolver,
}

impl BrowserContext {
    pub fn new(config: Config, launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self::with_clock(config, launcher, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: Config,
        launcher: Arc<dyn BrowserLauncher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let breakers = Arc::new(BreakerRegistry::new(&config.breaker, clock.clone()));
        let session = Arc::new(SessionManager::new(
            launcher,
            config.browser.clone(),
            config.session.clone(),
            breakers,
            clock,
        ));
        Self {
            ledger: WorkflowLedger::new(config.workflow.history_capacity),
            content: ContentEngine::new(config.content.clone()),
            resolver: SelectorResolver::new(config.selector.clone()),
            session,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn ledger(&self) -> &WorkflowLedger {
        &self.ledger
    }

    pub fn resolver(&self) -> &SelectorResolver {
        &self.resolver
    }

    pub async fn init(&self, options: InitOptions) -> Result<SessionInfo, BrowserError> {
        let info = self.session.init(options).await?;
        if !info.reused {
            self.resolver.reset();
        }
        Ok(info)
    }

    /// Close the session. Returns whether one was open.
    pub async fn close(&self) -> bool {
        self.resolver.reset();
        self.ledger.restart();
        self.session.close().await
    }

    pub async fn close_if_idle(&self) -> bool {
        let closed = self.session.close_if_idle().await;
        if closed {
            self.resolver.reset();
            self.ledger.restart();
        }
        closed
    }

    pub fn status(&self) -> SessionStatus {
        let mut status = self.session.status();
        status.recent_operations = self.ledger.recent(self.config.workflow.history_capacity);
        status
    }

    /// Navigate and return the URL the page ended up on.
    pub async fn navigate(
        &self,
        url: &str,
        wait: WaitCondition,
        timeout: Option<Duration>,
    ) -> Result<String, BrowserError> {
        let parsed = url::Url::parse(url)
            .map_err(|e| BrowserError::Validation(format!("Invalid URL '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https" | "file" | "about" | "data") {
            return Err(BrowserError::Validation(format!(
                "Unsupported URL scheme '{}' in '{}'",
                parsed.scheme(),
                url
            )));
        }

        let target = parsed.to_string();
        let landed = self
            .session
            .with_page(OperationClass::Navigation, timeout, |page| async move {
                page.goto(&target, wait).await?;
                page.url().await
            })
            .await?;
        info!("Navigated to {}", landed);
        self.session.note_url(landed.clone());
        Ok(landed)
    }

    pub async fn click(
        &self,
        selector: &str,
        timeout: Option<Duration>,
    ) -> Result<ActionOutcome, BrowserError> {
        self.act(Intent::Click, selector, timeout, |page, target| async move {
            page.click(&target).await
        })
        .await
    }

    pub async fn type_text(
        &self,
        selector: &str,
        text: &str,
        timeout: Option<Duration>,
    ) -> Result<ActionOutcome, BrowserError> {
        self.act(Intent::Type, selector, timeout, move |page, target| async move {
            page.type_text(&target, text).await
        })
        .await
    }

    /// Wait until `selector` (or its resolved replacement) is present.
    pub async fn wait_for(
        &self,
        selector: &str,
        timeout: Option<Duration>,
    ) -> Result<ActionOutcome, BrowserError> {
        let wait = timeout.unwrap_or_else(|| self.session.operation_timeout());
        // The page-side wait must give up before the session deadline does.
        let deadline = Some(wait + Duration::from_secs(1));
        self.act(Intent::Wait, selector, deadline, move |page, target| async move {
            page.wait_for_selector(&target, wait).await
        })
        .await
    }

    /// Run `op` against `selector`, falling back to the resolver when the
    /// element is missing or the selector is unusable.
    async fn act<F, Fut>(
        &self,
        intent: Intent,
        selector: &str,
        timeout: Option<Duration>,
        op: F,
    ) -> Result<ActionOutcome, BrowserError>
    where
        F: Fn(Arc<dyn PageHandle>, String) -> Fut,
        Fut: Future<Output = Result<(), DriverError>>,
    {
        let class = intent.operation_class();
        let op = &op;

        let target = selector.to_string();
        let direct = self
            .session
            .with_page(class, timeout, move |page| op(page, target))
            .await;
        match direct {
            Ok(()) => {
                self.resolver.remember(intent, selector);
                return Ok(ActionOutcome {
                    selector: selector.to_string(),
                    selector_resolution: None,
                });
            }
            Err(e) if e.is_element_not_found() || e.kind() == ErrorKind::Validation => {
                debug!("{:?} on `{}` failed, resolving: {}", intent, selector, e);
            }
            Err(e) => return Err(e),
        }

        let resolution = self
            .resolver
            .resolve(&self.session, selector, intent, timeout)
            .await?;
        let Some(resolved) = resolution.resolved_selector.clone() else {
            return Err(BrowserError::ElementNotFound {
                selector: selector.to_string(),
                attempted: resolution.attempted_names(),
            });
        };

        let target = resolved.clone();
        self.session
            .with_page(class, timeout, move |page| op(page, target))
            .await?;
        Ok(ActionOutcome {
            selector: resolved,
            selector_resolution: Some(resolution),
        })
    }

    pub async fn get_content(&self, request: ContentRequest) -> Result<ContentResult, BrowserError> {
        self.content
            .extract(&self.session, &self.resolver, request)
            .await
    }

    /// Evaluate `script` and return its value, cut to the default token budget.
    pub async fn execute_js(
        &self,
        script: &str,
        timeout: Option<Duration>,
    ) -> Result<ScriptOutput, BrowserError> {
        let value = self
            .session
            .with_page(OperationClass::Interaction, timeout, |page| async move {
                page.evaluate(script).await
            })
            .await?;

        let rendered = match value {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        let max_chars = self
            .content
            .estimator()
            .chars_for_tokens(self.config.content.default_token_budget);
        let (kept, truncated) = reduce::truncate_chars(&rendered, max_chars);
        Ok(ScriptOutput {
            result: kept.to_string(),
            truncated,
        })
    }

    pub fn breakers(&self) -> &Arc<BreakerRegistry> {
        self.session.breakers()
    }
}

impl ToolGate for BrowserContext {
    fn admit(&self, operation: &str) -> Result<(), ErrorPayload> {
        self.ledger
            .validate(operation, self.session.state())
            .map_err(|e| e.to_payload())
    }

    fn record(&self, operation: &str, outcome: OperationOutcome) {
        self.ledger.record(operation, outcome);
    }
}

/// Close the session whenever it has sat idle past its timeout. The task
/// ends once the context is dropped.
pub fn spawn_idle_reaper(context: Arc<BrowserContext>, interval: Duration) -> JoinHandle<()> {
    let context: Weak<BrowserContext> = Arc::downgrade(&context);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(context) = context.upgrade() else {
                debug!("Browser context dropped, stopping idle reaper");
                break;
            };
            if context.close_if_idle().await {
                info!("Idle browser session closed");
            }
        }
    })
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
