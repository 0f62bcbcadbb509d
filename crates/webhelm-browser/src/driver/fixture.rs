//! In-memory browser for tests and dry runs.
//!
//! Pages are static HTML keyed by URL (or by host). Faults can be armed per
//! operation: fail the next N calls with a given error, hang them forever,
//! or kill the browser process mid-call.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

use super::{
    BrowserHandle, BrowserLauncher, DriverError, LaunchSpec, PageHandle, PageMetrics,
    WaitCondition, is_xpath,
};

const BLANK_PAGE: &str = "<html><head></head><body></body></html>";

/// Driver operations faults can be armed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixtureOp {
    Launch,
    Goto,
    Evaluate,
    WaitForSelector,
    Click,
    Type,
    SetBlockedUrls,
    Content,
    Url,
    IsAlive,
    Close,
}

#[derive(Debug, Clone)]
pub enum Fault {
    /// Return this error.
    Fail(DriverError),
    /// Never complete.
    Hang,
    /// Kill the browser, then fail with a closed-session error.
    Crash,
}

struct ArmedFault {
    op: FixtureOp,
    remaining: u32,
    fault: Fault,
}

#[derive(Default)]
struct FixtureState {
    pages: RwLock<HashMap<String, String>>,
    default_page: RwLock<Option<String>>,
    eval_results: RwLock<HashMap<String, Value>>,
    faults: Mutex<Vec<ArmedFault>>,
    calls: Mutex<HashMap<FixtureOp, u32>>,
    launches: AtomicU32,
    open_browsers: AtomicUsize,
    current_alive: Mutex<Option<Arc<AtomicBool>>>,
    blocked: Mutex<Vec<String>>,
    block_history: Mutex<Vec<Vec<String>>>,
    clicks: Mutex<Vec<String>>,
    typed: Mutex<Vec<(String, String)>>,
}

impl FixtureState {
    /// Count the call and apply any armed fault.
    async fn enter(&self, op: FixtureOp, alive: Option<&AtomicBool>) -> Result<(), DriverError> {
        *self.calls.lock().entry(op).or_insert(0) += 1;

        let fault = {
            let mut faults = self.faults.lock();
            let pos = faults.iter().position(|f| f.op == op && f.remaining > 0);
            pos.map(|i| {
                faults[i].remaining -= 1;
                let fault = faults[i].fault.clone();
                if faults[i].remaining == 0 {
                    faults.remove(i);
                }
                fault
            })
        };

        match fault {
            Some(Fault::Fail(err)) => return Err(err),
            Some(Fault::Hang) => {
                debug!(?op, "Fixture call hanging");
                std::future::pending::<()>().await;
            }
            Some(Fault::Crash) => {
                if let Some(alive) = alive {
                    alive.store(false, Ordering::SeqCst);
                }
                return Err(DriverError::SessionClosed(
                    "Target closed: browser process exited".to_string(),
                ));
            }
            None => {}
        }

        if let Some(alive) = alive {
            if !alive.load(Ordering::SeqCst) {
                return Err(DriverError::SessionClosed(
                    "Target closed: browser process exited".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn lookup(&self, url: &str) -> Option<String> {
        if url == "about:blank" {
            return Some(BLANK_PAGE.to_string());
        }
        let pages = self.pages.read();
        if let Some(html) = pages.get(url).or_else(|| pages.get(url.trim_end_matches('/'))) {
            return Some(html.clone());
        }
        let host = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string));
        if let Some(html) = host.and_then(|h| pages.get(&h).cloned()) {
            return Some(html);
        }
        self.default_page.read().clone()
    }
}

/// Launcher for in-memory fixture browsers.
///
/// Clones share state, so a test can keep one clone to arm faults and
/// inspect calls while the session owns another.
#[derive(Clone, Default)]
pub struct FixtureLauncher {
    state: Arc<FixtureState>,
}

impl FixtureLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` for `url` (full URL or bare host).
    pub fn serve(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.set_page(url, html);
        self
    }

    /// Serve `html` for any URL without a page of its own.
    pub fn with_default_page(self, html: impl Into<String>) -> Self {
        *self.state.default_page.write() = Some(html.into());
        self
    }

    /// Replace a page, e.g. to simulate content changing between calls.
    pub fn set_page(&self, url: impl Into<String>, html: impl Into<String>) {
        self.state.pages.write().insert(url.into(), html.into());
    }

    /// Load every `*.html` file in `dir`, keyed by file stem (`example.com.html`
    /// serves `example.com`).
    pub fn from_dir(dir: &Path) -> std::io::Result<Self> {
        let launcher = Self::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("html") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                let html = std::fs::read_to_string(&path)?;
                launcher.set_page(stem, html);
            }
        }
        Ok(launcher)
    }

    /// Return `Value` when exactly `expression` is evaluated.
    pub fn set_eval_result(&self, expression: impl Into<String>, value: Value) {
        self.state.eval_results.write().insert(expression.into(), value);
    }

    pub fn fail_next(&self, op: FixtureOp, times: u32, error: DriverError) {
        self.arm(op, times, Fault::Fail(error));
    }

    pub fn hang_next(&self, op: FixtureOp, times: u32) {
        self.arm(op, times, Fault::Hang);
    }

    pub fn crash_on_next(&self, op: FixtureOp) {
        self.arm(op, 1, Fault::Crash);
    }

    fn arm(&self, op: FixtureOp, times: u32, fault: Fault) {
        if times > 0 {
            self.state.faults.lock().push(ArmedFault {
                op,
                remaining: times,
                fault,
            });
        }
    }

    /// Kill the most recently launched browser.
    pub fn kill_browser(&self) {
        if let Some(alive) = self.state.current_alive.lock().as_ref() {
            alive.store(false, Ordering::SeqCst);
        }
    }

    pub fn launch_count(&self) -> u32 {
        self.state.launches.load(Ordering::SeqCst)
    }

    /// Browsers launched and not yet closed.
    pub fn open_browsers(&self) -> usize {
        self.state.open_browsers.load(Ordering::SeqCst)
    }

    pub fn call_count(&self, op: FixtureOp) -> u32 {
        self.state.calls.lock().get(&op).copied().unwrap_or(0)
    }

    /// Currently blocked URL patterns.
    pub fn blocked_urls(&self) -> Vec<String> {
        self.state.blocked.lock().clone()
    }

    /// Every pattern list passed to `set_blocked_urls`, in order.
    pub fn block_history(&self) -> Vec<Vec<String>> {
        self.state.block_history.lock().clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.clicks.lock().clone()
    }

    pub fn typed(&self) -> Vec<(String, String)> {
        self.state.typed.lock().clone()
    }
}

#[async_trait]
impl BrowserLauncher for FixtureLauncher {
    async fn launch(&self, spec: &LaunchSpec) -> Result<Arc<dyn BrowserHandle>, DriverError> {
        self.state.enter(FixtureOp::Launch, None).await?;
        self.state.launches.fetch_add(1, Ordering::SeqCst);
        self.state.open_browsers.fetch_add(1, Ordering::SeqCst);

        let alive = Arc::new(AtomicBool::new(true));
        *self.state.current_alive.lock() = Some(alive.clone());
        debug!(port = spec.port, "Fixture browser launched");

        let page = Arc::new(FixturePage {
            state: self.state.clone(),
            alive: alive.clone(),
            current: Mutex::new(("about:blank".to_string(), BLANK_PAGE.to_string())),
        });
        Ok(Arc::new(FixtureBrowser {
            state: self.state.clone(),
            alive,
            closed: AtomicBool::new(false),
            page,
        }))
    }

    fn requires_executable(&self) -> bool {
        false
    }
}

struct FixtureBrowser {
    state: Arc<FixtureState>,
    alive: Arc<AtomicBool>,
    closed: AtomicBool,
    page: Arc<FixturePage>,
}

#[async_trait]
impl BrowserHandle for FixtureBrowser {
    fn page(&self) -> Arc<dyn PageHandle> {
        self.page.clone()
    }

    async fn is_alive(&self) -> bool {
        match self.state.enter(FixtureOp::IsAlive, None).await {
            Ok(()) => self.alive.load(Ordering::SeqCst),
            Err(_) => false,
        }
    }

    async fn close(&self) -> Result<(), DriverError> {
        let result = self.state.enter(FixtureOp::Close, None).await;
        self.alive.store(false, Ordering::SeqCst);
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.state.open_browsers.fetch_sub(1, Ordering::SeqCst);
        }
        result
    }
}

struct FixturePage {
    state: Arc<FixtureState>,
    alive: Arc<AtomicBool>,
    /// (url, html) of the loaded document.
    current: Mutex<(String, String)>,
}

impl FixturePage {
    async fn enter(&self, op: FixtureOp) -> Result<(), DriverError> {
        self.state.enter(op, Some(&self.alive)).await
    }

    fn html(&self) -> String {
        self.current.lock().1.clone()
    }
}

#[async_trait]
impl PageHandle for FixturePage {
    async fn goto(&self, url: &str, _wait: WaitCondition) -> Result<(), DriverError> {
        self.enter(FixtureOp::Goto).await?;
        if url::Url::parse(url).is_err() && url != "about:blank" {
            return Err(DriverError::Navigation(format!(
                "Cannot navigate to invalid URL: {}",
                url
            )));
        }
        let html = self
            .state
            .lookup(url)
            .ok_or_else(|| DriverError::Navigation(format!("net::ERR_NAME_NOT_RESOLVED at {}", url)))?;
        *self.current.lock() = (url.to_string(), html);
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, DriverError> {
        self.enter(FixtureOp::Evaluate).await?;
        if let Some(value) = self.state.eval_results.read().get(expression) {
            return Ok(value.clone());
        }
        if expression.trim_start().starts_with("throw") {
            return Err(DriverError::JavaScript(format!("Uncaught {}", expression.trim())));
        }
        Ok(Value::Null)
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        _timeout: Duration,
    ) -> Result<(), DriverError> {
        self.enter(FixtureOp::WaitForSelector).await?;
        if count_in(&self.html(), selector)? == 0 {
            return Err(DriverError::ElementNotFound(format!(
                "timed out waiting for selector `{}`",
                selector
            )));
        }
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), DriverError> {
        self.enter(FixtureOp::Click).await?;
        if count_in(&self.html(), selector)? == 0 {
            return Err(DriverError::ElementNotFound(selector.to_string()));
        }
        self.state.clicks.lock().push(selector.to_string());
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), DriverError> {
        self.enter(FixtureOp::Type).await?;
        if count_in(&self.html(), selector)? == 0 {
            return Err(DriverError::ElementNotFound(selector.to_string()));
        }
        self.state
            .typed
            .lock()
            .push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn set_blocked_urls(&self, patterns: &[String]) -> Result<(), DriverError> {
        self.enter(FixtureOp::SetBlockedUrls).await?;
        *self.state.blocked.lock() = patterns.to_vec();
        self.state.block_history.lock().push(patterns.to_vec());
        Ok(())
    }

    async fn content(&self) -> Result<String, DriverError> {
        self.enter(FixtureOp::Content).await?;
        Ok(self.html())
    }

    async fn url(&self) -> Result<String, DriverError> {
        self.enter(FixtureOp::Url).await?;
        Ok(self.current.lock().0.clone())
    }

    async fn reload(&self, wait: WaitCondition) -> Result<(), DriverError> {
        let url = self.current.lock().0.clone();
        self.goto(&url, wait).await
    }

    async fn metrics(&self) -> Result<PageMetrics, DriverError> {
        self.enter(FixtureOp::Evaluate).await?;
        Ok(metrics_of(&self.html()))
    }

    async fn count_matches(&self, selector: &str) -> Result<usize, DriverError> {
        self.enter(FixtureOp::Evaluate).await?;
        count_in(&self.html(), selector)
    }

    async fn select_content(&self, selector: &str, html: bool) -> Result<Option<String>, DriverError> {
        self.enter(FixtureOp::Evaluate).await?;
        first_match(&self.html(), selector, html)
    }
}

fn parse_selector(selector: &str) -> Result<Selector, DriverError> {
    if is_xpath(selector) {
        return Err(DriverError::InvalidSelector(format!(
            "XPath is not supported by the fixture driver: {}",
            selector
        )));
    }
    Selector::parse(selector)
        .map_err(|e| DriverError::InvalidSelector(format!("'{}' is not a valid selector: {}", selector, e)))
}

fn count_in(html: &str, selector: &str) -> Result<usize, DriverError> {
    let selector = parse_selector(selector)?;
    Ok(Html::parse_document(html).select(&selector).count())
}

fn first_match(html: &str, selector: &str, as_html: bool) -> Result<Option<String>, DriverError> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);
    Ok(document.select(&selector).next().map(|el| {
        if as_html {
            el.html()
        } else {
            el.text()
                .flat_map(str::split_whitespace)
                .collect::<Vec<_>>()
                .join(" ")
        }
    }))
}

fn metrics_of(html: &str) -> PageMetrics {
    let document = Html::parse_document(html);
    let count = |tag: &str| -> u64 {
        Selector::parse(tag)
            .map(|s| document.select(&s).count() as u64)
            .unwrap_or(0)
    };
    PageMetrics {
        html_bytes: html.len() as u64,
        node_count: count("*"),
        image_count: count("img"),
        iframe_count: count("iframe"),
        script_count: count("script"),
    }
}

#[cfg(test)]
#[path = "fixture_tests.rs"]
mod tests;
