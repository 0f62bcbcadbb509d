use std::time::Duration;

use tracing::{debug, warn};
use webhelm_config::ContentConfig;
use webhelm_protocols::ErrorKind;

use super::continuation::{ContinuationToken, fingerprint};
use super::{ChunkInfo, ContentFormat, ContentMode, ContentRequest, ContentResult, chunk, reduce};
use crate::breaker::OperationClass;
use crate::driver::{PageMetrics, WaitCondition};
use crate::error::BrowserError;
use crate::selector::{Intent, SelectorResolution, SelectorResolver};
use crate::session::SessionManager;
use crate::tokens::TokenEstimator;

/// Content captured from the page, before chunking.
struct Captured {
    content: String,
    truncated: bool,
    resources_blocked: bool,
    selector: Option<String>,
    selector_resolution: Option<SelectorResolution>,
    recommendation: Option<String>,
}

impl Captured {
    fn new(content: String) -> Self {
        Self {
            content,
            truncated: false,
            resources_blocked: false,
            selector: None,
            selector_resolution: None,
            recommendation: None,
        }
    }
}

/// Resolved parameters of one extraction.
struct Plan {
    mode: ContentMode,
    format: ContentFormat,
    selector: Option<String>,
    budget: usize,
    continuation: Option<ContinuationToken>,
}

pub struct ContentEngine {
    config: ContentConfig,
    estimator: TokenEstimator,
}

impl ContentEngine {
    pub fn new(config: ContentConfig) -> Self {
        let estimator = TokenEstimator::new(config.chars_per_token);
        Self { config, estimator }
    }

    pub fn estimator(&self) -> &TokenEstimator {
        &self.estimator
    }

    pub fn config(&self) -> &ContentConfig {
        &self.config
    }

    fn plan(&self, request: ContentRequest) -> Result<Plan, BrowserError> {
        if let Some(token) = request.continuation.as_deref().filter(|t| !t.is_empty()) {
            let token = ContinuationToken::decode(token)?;
            return Ok(Plan {
                mode: token.mode,
                format: token.format,
                selector: token.selector.clone(),
                budget: token.budget.min(self.config.emergency_token_limit),
                continuation: Some(token),
            });
        }

        let budget = match request.budget {
            Some(0) => {
                return Err(BrowserError::Validation(
                    "token_budget must be greater than 0".to_string(),
                ));
            }
            Some(budget) => budget,
            None => self.config.default_token_budget,
        }
        .clamp(1, self.config.emergency_token_limit.max(1));
        let selector = request.selector.filter(|s| !s.trim().is_empty());
        if request.mode == ContentMode::Selector && selector.is_none() {
            return Err(BrowserError::Validation(
                "mode \"selector\" requires a selector".to_string(),
            ));
        }

        Ok(Plan {
            mode: request.mode,
            format: request.format,
            selector,
            budget,
            continuation: None,
        })
    }

    /// Capture content for `request` and return the part that fits.
    pub async fn extract(
        &self,
        session: &SessionManager,
        resolver: &SelectorResolver,
        request: ContentRequest,
    ) -> Result<ContentResult, BrowserError> {
        let timeout = request.timeout;
        let plan = self.plan(request)?;

        let captured = match plan.mode {
            ContentMode::Full => self.capture_full(session, plan.format, timeout).await?,
            ContentMode::Main => self.capture_main(session, plan.format, timeout).await?,
            ContentMode::Summary => {
                self.capture_summary(session, plan.format, plan.budget, timeout)
                    .await?
            }
            ContentMode::Selector => {
                let selector = plan.selector.as_deref().unwrap_or_default();
                self.capture_selector(session, resolver, selector, plan.format, timeout)
                    .await?
            }
        };

        self.deliver(plan, captured)
    }

    /// Chunk captured content and pick the requested chunk.
    fn deliver(&self, plan: Plan, captured: Captured) -> Result<ContentResult, BrowserError> {
        let estimated = self.estimator.estimate(&captured.content);
        let max_chunks = self.config.max_chunks.max(1);
        let needed = estimated.div_ceil(plan.budget);
        if needed > max_chunks {
            return Err(BrowserError::ContentTooLarge {
                estimated_tokens: estimated,
                chunks_needed: needed,
                max_chunks,
            });
        }

        let fingerprint = fingerprint(&captured.content);
        let chunks = if estimated <= plan.budget {
            vec![captured.content.as_str()]
        } else {
            chunk::split(
                &captured.content,
                self.estimator.chars_for_tokens(plan.budget).max(1),
            )
        };
        let total = chunks.len().max(1);
        if total > max_chunks {
            return Err(BrowserError::ContentTooLarge {
                estimated_tokens: estimated,
                chunks_needed: total,
                max_chunks,
            });
        }

        let index = match &plan.continuation {
            Some(token) => {
                if token.fingerprint != fingerprint || token.total != total {
                    return Err(BrowserError::InvalidContinuation(
                        "page content changed since the token was issued; request the content again"
                            .to_string(),
                    ));
                }
                token.index
            }
            None => 0,
        };

        let selector = captured.selector.clone().or(plan.selector);
        let content = chunks.get(index).copied().unwrap_or_default().to_string();
        let chunk_info = (total > 1).then(|| ChunkInfo {
            index,
            total,
            continuation_token: (index + 1 < total).then(|| {
                ContinuationToken::new(
                    plan.mode,
                    plan.format,
                    selector,
                    plan.budget,
                    index + 1,
                    total,
                    fingerprint.clone(),
                )
                .encode()
            }),
        });
        if total > 1 {
            debug!(
                "Delivering chunk {}/{} of ~{} tokens",
                index + 1,
                total,
                estimated
            );
        }

        Ok(ContentResult {
            estimated_tokens: self.estimator.estimate(&content),
            content,
            mode: plan.mode,
            format: plan.format,
            truncated: captured.truncated,
            chunk_info,
            recommendation: captured.recommendation,
            resources_blocked: captured.resources_blocked,
            selector_resolution: captured.selector_resolution,
        })
    }

    async fn capture_full(
        &self,
        session: &SessionManager,
        format: ContentFormat,
        timeout: Option<Duration>,
    ) -> Result<Captured, BrowserError> {
        let html = session
            .with_page(OperationClass::Extraction, timeout, |page| async move {
                page.content().await
            })
            .await?;

        let content = match format {
            ContentFormat::Html => html,
            ContentFormat::Text => reduce::document_text(&html),
        };

        let emergency = self.config.emergency_token_limit;
        if self.estimator.estimate(&content) <= emergency {
            return Ok(Captured::new(content));
        }
        let (kept, _) = reduce::truncate_chars(&content, self.estimator.chars_for_tokens(emergency));
        warn!(
            "Full content exceeds the emergency limit of {} tokens; truncating",
            emergency
        );
        let mut captured = Captured::new(kept.to_string());
        captured.truncated = true;
        Ok(captured)
    }

    fn is_heavy(&self, metrics: &PageMetrics) -> bool {
        metrics.html_bytes > self.config.block_threshold_bytes
            || metrics.node_count > self.config.block_threshold_nodes
            || metrics.image_count > self.config.block_threshold_images
    }

    /// Capture the page HTML, blocking heavy sub-resources first when the
    /// pre-flight metrics call for it. The block list is always cleared.
    async fn capture_blocked(
        &self,
        session: &SessionManager,
        timeout: Option<Duration>,
    ) -> Result<(String, bool), BrowserError> {
        let patterns = self.config.blocked_url_patterns.clone();
        let reload = self.config.reload_with_blocking;

        session
            .with_page(OperationClass::Extraction, timeout, |page| async move {
                let heavy = match page.metrics().await {
                    Ok(metrics) if self.is_heavy(&metrics) => {
                        debug!(?metrics, "Heavy page, blocking sub-resources before capture");
                        true
                    }
                    Ok(_) => false,
                    Err(e) => {
                        warn!("Page metrics unavailable, capturing unblocked: {}", e);
                        false
                    }
                };
                let mut blocked = false;
                if heavy && !patterns.is_empty() {
                    match page.set_blocked_urls(&patterns).await {
                        Ok(()) => blocked = true,
                        Err(e) => warn!("Failed to block resources, capturing unblocked: {}", e),
                    }
                    if blocked && reload {
                        if let Err(e) = page.reload(WaitCondition::Load).await {
                            warn!("Reload with blocking failed, capturing as is: {}", e);
                        }
                    }
                }

                let html = page.content().await;
                if blocked {
                    if let Err(e) = page.set_blocked_urls(&[]).await {
                        warn!("Failed to clear blocked resources: {}", e);
                    }
                }
                Ok((html?, blocked))
            })
            .await
    }

    async fn capture_main(
        &self,
        session: &SessionManager,
        format: ContentFormat,
        timeout: Option<Duration>,
    ) -> Result<Captured, BrowserError> {
        let (html, blocked) = self.capture_blocked(session, timeout).await?;
        let content = match format {
            ContentFormat::Text => reduce::main_text(&html),
            ContentFormat::Html => reduce::main_html(&html),
        };

        let mut captured = Captured::new(content);
        captured.resources_blocked = blocked;
        if self.estimator.estimate(&captured.content) > self.config.safe_token_limit {
            captured.recommendation = Some("chunking".to_string());
        }
        Ok(captured)
    }

    async fn capture_summary(
        &self,
        session: &SessionManager,
        format: ContentFormat,
        budget: usize,
        timeout: Option<Duration>,
    ) -> Result<Captured, BrowserError> {
        let (html, blocked) = self.capture_blocked(session, timeout).await?;
        let reduced = match format {
            ContentFormat::Text => reduce::main_text(&html),
            ContentFormat::Html => reduce::main_html(&html),
        };

        let limit = self.config.summary_token_budget.min(budget);
        let max_chars = self.estimator.chars_for_tokens(limit);
        let (kept, cut) = match format {
            ContentFormat::Text => reduce::truncate_at_word(&reduced, max_chars),
            ContentFormat::Html => reduce::truncate_chars(&reduced, max_chars),
        };

        let mut captured = Captured::new(kept.to_string());
        captured.truncated = cut;
        captured.resources_blocked = blocked;
        Ok(captured)
    }

    async fn capture_selector(
        &self,
        session: &SessionManager,
        resolver: &SelectorResolver,
        selector: &str,
        format: ContentFormat,
        timeout: Option<Duration>,
    ) -> Result<Captured, BrowserError> {
        let as_html = format == ContentFormat::Html;

        match select(session, selector, as_html, timeout).await {
            Ok(Some(content)) => {
                resolver.remember(Intent::Extract, selector);
                let mut captured = Captured::new(content);
                captured.selector = Some(selector.to_string());
                captured.selector_resolution = Some(SelectorResolution::exact(selector));
                return Ok(captured);
            }
            Ok(None) => {}
            Err(e) if e.is_element_not_found() || e.kind() == ErrorKind::Validation => {
                debug!("Selector `{}` failed directly: {}", selector, e);
            }
            Err(e) => return Err(e),
        }

        let resolution = resolver
            .resolve(session, selector, Intent::Extract, timeout)
            .await?;
        let Some(resolved) = resolution.resolved_selector.clone() else {
            return Err(BrowserError::ElementNotFound {
                selector: selector.to_string(),
                attempted: resolution.attempted_names(),
            });
        };

        match select(session, &resolved, as_html, timeout).await? {
            Some(content) => {
                let mut captured = Captured::new(content);
                captured.selector = Some(resolved);
                captured.selector_resolution = Some(resolution);
                Ok(captured)
            }
            None => Err(BrowserError::ElementNotFound {
                selector: selector.to_string(),
                attempted: resolution.attempted_names(),
            }),
        }
    }
}

async fn select(
    session: &SessionManager,
    selector: &str,
    as_html: bool,
    timeout: Option<Duration>,
) -> Result<Option<String>, BrowserError> {
    let selector = selector.to_string();
    session
        .with_page(OperationClass::Extraction, timeout, move |page| async move {
            page.select_content(&selector, as_html).await
        })
        .await
}
