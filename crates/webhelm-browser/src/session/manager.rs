//! SessionManager: launch, guarded page access, liveness and teardown.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use webhelm_config::{BrowserConfig, SessionConfig};

use super::types::{InitOptions, SessionInfo, SessionState, SessionStatus};
use crate::breaker::{BreakerRegistry, GuardError, OperationClass};
use crate::classify::{FailureCategory, classify};
use crate::clock::Clock;
use crate::driver::{BrowserHandle, BrowserLauncher, DriverError, LaunchSpec, PageHandle};
use crate::error::BrowserError;
use crate::locator;

const CRASHED_MESSAGE: &str = "session crashed; call browser_init to start a new session";

struct Inner {
    state: SessionState,
    browser: Option<Arc<dyn BrowserHandle>>,
    page: Option<Arc<dyn PageHandle>>,
    generation: u64,
    port: Option<u16>,
    executable: Option<PathBuf>,
    created_at: Option<DateTime<Utc>>,
    last_activity: Option<(Instant, DateTime<Utc>)>,
    current_url: Option<String>,
}

/// Failure of a guarded page call.
enum PageFailure {
    Driver(DriverError, FailureCategory),
    TimedOut,
}

impl PageFailure {
    fn counts(&self) -> bool {
        match self {
            PageFailure::Driver(_, category) => category.counts_toward_breaker(),
            PageFailure::TimedOut => true,
        }
    }
}

/// Owns the browser and page handles. Nothing else keeps a reference to
/// them past a single `with_page` call.
pub struct SessionManager {
    launcher: Arc<dyn BrowserLauncher>,
    browser_config: BrowserConfig,
    config: SessionConfig,
    breakers: Arc<BreakerRegistry>,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
    /// Held for the duration of every page call.
    page_gate: tokio::sync::Mutex<()>,
    /// Serializes init and close.
    lifecycle: tokio::sync::Mutex<()>,
}

impl SessionManager {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        browser_config: BrowserConfig,
        config: SessionConfig,
        breakers: Arc<BreakerRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            launcher,
            browser_config,
            config,
            breakers,
            clock,
            inner: Mutex::new(Inner {
                state: SessionState::Uninitialized,
                browser: None,
                page: None,
                generation: 0,
                port: None,
                executable: None,
                created_at: None,
                last_activity: None,
                current_url: None,
            }),
            page_gate: tokio::sync::Mutex::new(()),
            lifecycle: tokio::sync::Mutex::new(()),
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    pub fn current_url(&self) -> Option<String> {
        self.inner.lock().current_url.clone()
    }

    pub fn breakers(&self) -> &Arc<BreakerRegistry> {
        &self.breakers
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.config.operation_timeout_ms)
    }

    fn busy_wait(&self) -> Duration {
        Duration::from_millis(self.config.busy_wait_ms)
    }

    fn info(&self, reused: bool) -> SessionInfo {
        let inner = self.inner.lock();
        SessionInfo {
            state: inner.state,
            port: inner.port,
            executable: inner.executable.clone(),
            generation: inner.generation,
            reused,
            created_at: inner.created_at,
        }
    }

    /// Launch the browser, or return the live session.
    ///
    /// With `force`, a live session is torn down first. Launch attempts are
    /// retried with doubling delays, each behind the lifecycle breaker.
    pub async fn init(&self, options: InitOptions) -> Result<SessionInfo, BrowserError> {
        let _lifecycle = self.lifecycle.lock().await;

        if self.state().is_live() && !options.force {
            debug!("Reusing live browser session");
            return Ok(self.info(true));
        }

        self.teardown().await;
        self.inner.lock().state = SessionState::Initializing;

        match self.launch(&options).await {
            Ok(info) => Ok(info),
            Err(e) => {
                let mut inner = self.inner.lock();
                inner.state = if inner.generation == 0 {
                    SessionState::Uninitialized
                } else {
                    SessionState::Closed
                };
                Err(e)
            }
        }
    }

    async fn launch(&self, options: &InitOptions) -> Result<SessionInfo, BrowserError> {
        let port = locator::find_available_port(
            self.browser_config.port,
            &self.browser_config.hosts,
            self.browser_config.port_scan_range,
        )?;
        let executable = if self.launcher.requires_executable() {
            Some(locator::resolve_browser_executable(
                &self.browser_config.executable_env,
                self.browser_config.executable_path.as_deref(),
            )?)
        } else {
            None
        };

        let spec = LaunchSpec {
            executable: executable.clone(),
            port,
            headless: options.headless.unwrap_or(self.browser_config.headless),
            profile_dir: self.browser_config.profile_dir.as_ref().map(PathBuf::from),
            extra_args: self.browser_config.extra_args.clone(),
            launch_timeout: Duration::from_millis(self.browser_config.launch_timeout_ms),
        };
        let attempt_timeout = spec.launch_timeout + self.operation_timeout();
        let attempts = self.config.launch_retries + 1;
        let mut last_error = String::new();
        let launcher = &self.launcher;
        let spec = &spec;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.config.launch_retry_delay_ms.saturating_mul(1 << (attempt - 1).min(16));
                debug!("Retrying launch in {} ms", delay);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            let result = self
                .breakers
                .guard(
                    OperationClass::Lifecycle,
                    move || async move {
                        match tokio::time::timeout(attempt_timeout, launcher.launch(spec)).await {
                            Ok(result) => result,
                            Err(_) => Err(DriverError::Timeout(format!(
                                "browser launch exceeded {} ms",
                                attempt_timeout.as_millis()
                            ))),
                        }
                    },
                    |e: &DriverError| classify(e).counts_toward_breaker(),
                )
                .await;

            match result {
                Ok(browser) => {
                    let now = self.clock.now();
                    let mut inner = self.inner.lock();
                    inner.generation += 1;
                    inner.state = SessionState::Ready;
                    inner.page = Some(browser.page());
                    inner.browser = Some(browser);
                    inner.port = Some(port);
                    inner.executable = executable;
                    inner.created_at = Some(Utc::now());
                    inner.last_activity = Some((now, Utc::now()));
                    inner.current_url = None;
                    info!(
                        "Browser session ready on port {} (generation {})",
                        port, inner.generation
                    );
                    drop(inner);
                    return Ok(self.info(false));
                }
                Err(GuardError::Open(open)) => return Err(open.into()),
                Err(GuardError::Inner(e)) => {
                    warn!("Browser launch attempt {}/{} failed: {}", attempt + 1, attempts, e);
                    last_error = e.to_string();
                }
            }
        }

        Err(BrowserError::BrowserLaunch(format!(
            "{} attempts failed; last error: {}",
            attempts, last_error
        )))
    }

    /// Run `f` against the page.
    ///
    /// Waits up to `session.busy_wait_ms` for a concurrent call to finish,
    /// then runs `f` behind the breaker for `class`, bounded by `timeout`
    /// (or the configured operation timeout).
    pub async fn with_page<T, F, Fut>(
        &self,
        class: OperationClass,
        timeout: Option<Duration>,
        f: F,
    ) -> Result<T, BrowserError>
    where
        F: FnOnce(Arc<dyn PageHandle>) -> Fut,
        Fut: Future<Output = Result<T, DriverError>>,
    {
        self.check_live()?;

        let busy_wait = self.busy_wait();
        let _gate = match tokio::time::timeout(busy_wait, self.page_gate.lock()).await {
            Ok(gate) => gate,
            Err(_) => {
                return Err(BrowserError::SessionBusy {
                    waited_ms: busy_wait.as_millis() as u64,
                });
            }
        };

        let (page, generation) = {
            let mut inner = self.inner.lock();
            let page = match (inner.state.is_live(), inner.page.clone()) {
                (true, Some(page)) => page,
                _ => return Err(Self::not_live_error(inner.state)),
            };
            inner.state = SessionState::Busy;
            (page, inner.generation)
        };
        let _busy = BusyGuard {
            manager: self,
            generation,
        };

        let timeout = timeout.unwrap_or_else(|| self.operation_timeout());
        let result = self
            .breakers
            .guard(
                class,
                move || async move {
                    match tokio::time::timeout(timeout, f(page)).await {
                        Ok(Ok(value)) => Ok(value),
                        Ok(Err(e)) => {
                            let category = classify(&e);
                            Err(PageFailure::Driver(e, category))
                        }
                        Err(_) => Err(PageFailure::TimedOut),
                    }
                },
                PageFailure::counts,
            )
            .await;
        self.touch(generation);

        match result {
            Ok(value) => Ok(value),
            Err(GuardError::Open(open)) => Err(open.into()),
            Err(GuardError::Inner(PageFailure::Driver(e, category))) => {
                debug!("{} call failed ({}): {}", class, category, e);
                match category {
                    FailureCategory::SessionClosed => {
                        self.mark_crashed(generation, &e.to_string());
                        Err(BrowserError::SessionCrashed(format!("{}: {}", CRASHED_MESSAGE, e)))
                    }
                    FailureCategory::NavigationTimeout => {
                        Err(BrowserError::NavigationTimeout(e.to_string()))
                    }
                    _ => Err(BrowserError::Driver {
                        category,
                        message: e.to_string(),
                    }),
                }
            }
            Err(GuardError::Inner(PageFailure::TimedOut)) => {
                if self.probe_liveness(generation).await {
                    Err(BrowserError::NavigationTimeout(format!(
                        "{} call exceeded {} ms",
                        class,
                        timeout.as_millis()
                    )))
                } else {
                    self.mark_crashed(generation, "browser stopped responding after a timeout");
                    Err(BrowserError::SessionCrashed(format!(
                        "{}: browser stopped responding",
                        CRASHED_MESSAGE
                    )))
                }
            }
        }
    }

    fn check_live(&self) -> Result<(), BrowserError> {
        let state = self.state();
        if state.is_live() {
            Ok(())
        } else {
            Err(Self::not_live_error(state))
        }
    }

    fn not_live_error(state: SessionState) -> BrowserError {
        match state {
            SessionState::Crashed => BrowserError::SessionCrashed(CRASHED_MESSAGE.to_string()),
            other => BrowserError::Validation(format!(
                "browser session is {}; call browser_init first",
                other
            )),
        }
    }

    /// Whether the browser of `generation` still answers.
    async fn probe_liveness(&self, generation: u64) -> bool {
        let browser = {
            let inner = self.inner.lock();
            if inner.generation != generation {
                return false;
            }
            inner.browser.clone()
        };
        let Some(browser) = browser else {
            return false;
        };
        let timeout = Duration::from_millis(self.config.liveness_timeout_ms);
        matches!(tokio::time::timeout(timeout, browser.is_alive()).await, Ok(true))
    }

    fn mark_crashed(&self, generation: u64, reason: &str) {
        let mut inner = self.inner.lock();
        if inner.generation == generation && inner.state.is_live() {
            warn!("Browser session crashed: {}", reason);
            inner.state = SessionState::Crashed;
        }
    }

    fn touch(&self, generation: u64) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        if inner.generation == generation {
            inner.last_activity = Some((now, Utc::now()));
        }
    }

    /// Remember the URL the page was navigated to.
    pub fn note_url(&self, url: impl Into<String>) {
        self.inner.lock().current_url = Some(url.into());
    }

    /// Close the session. Returns whether there was anything to close;
    /// closing a closed session is a no-op.
    pub async fn close(&self) -> bool {
        let _lifecycle = self.lifecycle.lock().await;
        self.teardown().await
    }

    /// Close a `Ready` session that has been idle longer than
    /// `session.idle_timeout_secs`.
    pub async fn close_if_idle(&self) -> bool {
        if !self.is_idle() {
            return false;
        }
        let _lifecycle = self.lifecycle.lock().await;
        if !self.is_idle() {
            return false;
        }
        info!("Closing idle browser session");
        self.teardown().await
    }

    fn is_idle(&self) -> bool {
        if self.config.idle_timeout_secs == 0 {
            return false;
        }
        let limit = Duration::from_secs(self.config.idle_timeout_secs);
        let now = self.clock.now();
        let inner = self.inner.lock();
        inner.state == SessionState::Ready
            && inner
                .last_activity
                .is_some_and(|(at, _)| now.saturating_duration_since(at) >= limit)
    }

    /// Release the current handles. Caller holds the lifecycle lock.
    async fn teardown(&self) -> bool {
        let (browser, had_session) = {
            let inner = self.inner.lock();
            let had_session = inner.browser.is_some()
                || matches!(inner.state, SessionState::Ready | SessionState::Busy | SessionState::Crashed);
            (inner.browser.clone(), had_session)
        };
        if !had_session {
            return false;
        }

        // Let an in-flight call finish, but do not wait forever for it.
        let _gate = tokio::time::timeout(self.busy_wait(), self.page_gate.lock())
            .await
            .ok();

        {
            let mut inner = self.inner.lock();
            inner.state = SessionState::Closing;
            inner.browser = None;
            inner.page = None;
        }

        if let Some(browser) = browser {
            match tokio::time::timeout(self.operation_timeout(), browser.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Error while closing browser: {}", e),
                Err(_) => warn!("Timed out closing browser"),
            }
        }

        let mut inner = self.inner.lock();
        inner.state = SessionState::Closed;
        inner.current_url = None;
        inner.last_activity = None;
        info!("Browser session closed (generation {})", inner.generation);
        true
    }

    /// Snapshot for diagnostics. `recent_operations` is left empty.
    pub fn status(&self) -> SessionStatus {
        let now = self.clock.now();
        let inner = self.inner.lock();
        SessionStatus {
            state: inner.state,
            generation: inner.generation,
            url: inner.current_url.clone(),
            created_at: inner.created_at,
            last_activity_at: inner.last_activity.map(|(_, at)| at),
            idle_ms: inner
                .last_activity
                .map(|(at, _)| now.saturating_duration_since(at).as_millis() as u64),
            breakers: self.breakers.snapshot(),
            recent_operations: Vec::new(),
        }
    }
}

/// Returns the session to `Ready` when a page call ends, unless the call
/// crashed the session or a newer generation has replaced it.
struct BusyGuard<'a> {
    manager: &'a SessionManager,
    generation: u64,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.manager.inner.lock();
        if inner.generation == self.generation && inner.state == SessionState::Busy {
            inner.state = SessionState::Ready;
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
