use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};
use webhelm_config::SelectorConfig;
use webhelm_protocols::ErrorKind;

use super::css_path::unique_selector;
use super::hints::{self, Hints, coverage, similarity, tokenize};
use super::{Intent, SelectorResolution, SelectorStrategy};
use crate::breaker::OperationClass;
use crate::driver::is_xpath;
use crate::error::BrowserError;
use crate::session::SessionManager;

/// Live confirmations attempted per tier before moving on.
const MAX_CONFIRMATIONS: usize = 5;

/// Farthest tree distance considered by the proximity tier.
const MAX_PROXIMITY_DISTANCE: usize = 4;

/// Never candidates for any intent.
const SKIPPED_TAGS: &[&str] = &[
    "html", "head", "body", "script", "style", "noscript", "template", "meta", "link", "title",
];

const CLICKABLE_TAGS: &[&str] = &["a", "button", "summary", "option", "label", "select"];

const CLICKABLE_ROLES: &[&str] = &[
    "button", "link", "tab", "menuitem", "checkbox", "radio", "option", "switch",
];

const BUTTON_INPUT_TYPES: &[&str] = &["button", "submit", "reset", "image", "checkbox", "radio"];

const NAME_ATTRIBUTES: &[&str] = &[
    "id",
    "name",
    "placeholder",
    "aria-label",
    "title",
    "alt",
    "for",
    "data-testid",
    "data-test",
    "data-qa",
];

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Candidate {
    pub selector: String,
    pub confidence: f64,
}

/// Fallback tiers in order, each with its candidates best first.
pub(crate) type RankedTiers = Vec<(SelectorStrategy, Vec<Candidate>)>;

pub struct SelectorResolver {
    config: SelectorConfig,
    /// Last selector that resolved, per intent.
    memory: Mutex<HashMap<Intent, String>>,
}

impl SelectorResolver {
    pub fn new(config: SelectorConfig) -> Self {
        Self {
            config,
            memory: Mutex::new(HashMap::new()),
        }
    }

    /// Lowest confidence accepted for `intent`.
    pub fn threshold(&self, intent: Intent) -> f64 {
        if intent.is_destructive() {
            self.config
                .destructive_min_confidence
                .max(self.config.min_confidence)
        } else {
            self.config.min_confidence
        }
    }

    pub fn remember(&self, intent: Intent, selector: &str) {
        self.memory.lock().insert(intent, selector.to_string());
    }

    pub fn remembered(&self, intent: Intent) -> Option<String> {
        self.memory.lock().get(&intent).cloned()
    }

    pub fn reset(&self) {
        self.memory.lock().clear();
    }

    /// Resolve `selector` on the current page.
    ///
    /// Returns an unresolved result (confidence 0) when no tier produced a
    /// candidate above the threshold. Browser failures other than missing
    /// elements and bad selectors are returned as errors.
    pub async fn resolve(
        &self,
        session: &SessionManager,
        selector: &str,
        intent: Intent,
        timeout: Option<Duration>,
    ) -> Result<SelectorResolution, BrowserError> {
        let class = intent.operation_class();

        if confirm(session, class, selector, timeout).await? {
            return Ok(SelectorResolution::exact(selector));
        }

        let html = session
            .with_page(class, timeout, |page| async move { page.content().await })
            .await?;
        let remembered = self.remembered(intent);
        let tiers = rank_candidates(
            &html,
            selector,
            intent,
            remembered.as_deref(),
            self.threshold(intent),
        );

        let mut attempted = vec![SelectorStrategy::Exact];
        for (strategy, candidates) in tiers {
            attempted.push(strategy);
            for candidate in candidates.into_iter().take(MAX_CONFIRMATIONS) {
                if !confirm(session, class, &candidate.selector, timeout).await? {
                    debug!(
                        "Candidate `{}` ({}) did not match on the live page",
                        candidate.selector, strategy
                    );
                    continue;
                }
                info!(
                    "Resolved `{}` to `{}` via {} (confidence {:.2})",
                    selector, candidate.selector, strategy, candidate.confidence
                );
                self.remember(intent, &candidate.selector);
                return Ok(SelectorResolution {
                    original_selector: selector.to_string(),
                    resolved_selector: Some(candidate.selector),
                    strategy_used: Some(strategy),
                    confidence: candidate.confidence,
                    attempted,
                });
            }
        }

        debug!("No fallback for `{}` cleared the threshold", selector);
        Ok(SelectorResolution::unresolved(selector, attempted))
    }
}

/// Whether `selector` matches at least one element on the live page.
/// Missing elements and invalid selectors count as no match.
async fn confirm(
    session: &SessionManager,
    class: OperationClass,
    selector: &str,
    timeout: Option<Duration>,
) -> Result<bool, BrowserError> {
    let owned = selector.to_string();
    let result = session
        .with_page(class, timeout, move |page| async move {
            page.count_matches(&owned).await
        })
        .await;
    match result {
        Ok(count) => Ok(count > 0),
        Err(e) if e.is_element_not_found() || e.kind() == ErrorKind::Validation => {
            debug!("Selector `{}` not usable: {}", selector, e);
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Rank fallback candidates for `selector` against an HTML snapshot.
///
/// Every tier is listed, even when empty. Candidates below `threshold` are
/// dropped; the rest are ordered by confidence, then document order.
pub(crate) fn rank_candidates(
    html: &str,
    selector: &str,
    intent: Intent,
    remembered: Option<&str>,
    threshold: f64,
) -> RankedTiers {
    let document = Html::parse_document(html);
    let hints = hints::parse(selector);
    let labels = label_texts(&document);
    let text_tokens = hints.text_tokens();
    let elements: Vec<ElementRef<'_>> = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| !SKIPPED_TAGS.contains(&el.value().name()))
        .collect();

    let mut tiers = vec![
        (
            SelectorStrategy::Normalized,
            normalized(&document, selector),
        ),
        (
            SelectorStrategy::TextMatch,
            scored(&document, &elements, SelectorStrategy::TextMatch, |el| {
                if !has_role(*el, intent) {
                    return 0.0;
                }
                similarity(&text_tokens, &tokenize(&role_text(*el, intent, &labels)))
            }),
        ),
        (
            SelectorStrategy::AttributeMatch,
            attribute_tier(&document, &elements, &hints, intent),
        ),
    ];
    if let Some(anchor) = remembered {
        tiers.push((
            SelectorStrategy::Proximity,
            proximity(&document, &elements, anchor, &hints, intent),
        ));
    }

    for (_, candidates) in tiers.iter_mut() {
        candidates.retain(|c| c.confidence > 0.0 && c.confidence >= threshold);
    }
    tiers
}

/// Score every element with `score` (a similarity in `[0, 1]`) scaled by
/// the tier ceiling, best first.
fn scored<F>(
    document: &Html,
    elements: &[ElementRef<'_>],
    strategy: SelectorStrategy,
    score: F,
) -> Vec<Candidate>
where
    F: Fn(&ElementRef<'_>) -> f64,
{
    let mut ranked: Vec<(f64, ElementRef<'_>)> = elements
        .iter()
        .map(|el| (strategy.ceiling() * score(el), *el))
        .filter(|(confidence, _)| *confidence > 0.0)
        .collect();
    // Stable: equal scores keep document order.
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranked
        .into_iter()
        .map(|(confidence, el)| Candidate {
            selector: unique_selector(document, el),
            confidence,
        })
        .collect()
}

/// Case variants of the selector, and elements whose id differs only in case.
fn normalized(document: &Html, selector: &str) -> Vec<Candidate> {
    let trimmed = selector.trim();
    if is_xpath(trimmed) || trimmed.starts_with("text=") {
        return Vec::new();
    }
    let confidence = SelectorStrategy::Normalized.ceiling();
    let mut out: Vec<Candidate> = Vec::new();

    let collapsed = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
    for variant in [collapsed.clone(), collapsed.to_lowercase()] {
        if variant == selector || out.iter().any(|c| c.selector == variant) {
            continue;
        }
        let matches = Selector::parse(&variant)
            .map(|parsed| document.select(&parsed).next().is_some())
            .unwrap_or(false);
        if matches {
            out.push(Candidate {
                selector: variant,
                confidence,
            });
        }
    }

    if let Some(id) = collapsed.strip_prefix('#').filter(|id| !id.contains([' ', '.', '[', ':', '>'])) {
        let found = document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().id().is_some_and(|own| own != id && own.eq_ignore_ascii_case(id)));
        if let Some(el) = found {
            let selector = unique_selector(document, el);
            if !out.iter().any(|c| c.selector == selector) {
                out.push(Candidate {
                    selector,
                    confidence,
                });
            }
        }
    }
    out
}

fn attribute_tier(
    document: &Html,
    elements: &[ElementRef<'_>],
    hints: &Hints,
    intent: Intent,
) -> Vec<Candidate> {
    let tokens = hints.attribute_tokens();
    scored(document, elements, SelectorStrategy::AttributeMatch, |el| {
        if !has_role(*el, intent) {
            return 0.0;
        }
        similarity(&tokens, &attribute_tokens(*el))
    })
}

fn attribute_tokens(element: ElementRef<'_>) -> Vec<String> {
    let value = element.value();
    let mut tokens: Vec<String> = NAME_ATTRIBUTES
        .iter()
        .filter_map(|name| value.attr(name))
        .flat_map(tokenize)
        .collect();
    tokens.extend(value.classes().flat_map(tokenize));
    tokens.sort();
    tokens.dedup();
    tokens
}

/// Elements near the one matching `anchor` that carry at least one hint
/// token. Closeness is scaled by the share of hint tokens found in the
/// element's text and attributes.
fn proximity(
    document: &Html,
    elements: &[ElementRef<'_>],
    anchor: &str,
    hints: &Hints,
    intent: Intent,
) -> Vec<Candidate> {
    let mut hint_tokens = hints.text_tokens();
    for token in hints.attribute_tokens() {
        if !hint_tokens.contains(&token) {
            hint_tokens.push(token);
        }
    }
    if hint_tokens.is_empty() {
        return Vec::new();
    }
    if is_xpath(anchor) {
        return Vec::new();
    }
    let Ok(parsed) = Selector::parse(anchor) else {
        return Vec::new();
    };
    let Some(anchor) = document.select(&parsed).next() else {
        return Vec::new();
    };
    let anchor_chain: Vec<_> = std::iter::once(anchor.id())
        .chain(anchor.ancestors().map(|n| n.id()))
        .collect();

    scored(document, elements, SelectorStrategy::Proximity, |el| {
        if !has_role(*el, intent) {
            return 0.0;
        }
        let mut tokens = tokenize(&el.text().collect::<Vec<_>>().join(" "));
        tokens.extend(attribute_tokens(*el));
        let found = coverage(&hint_tokens, &tokens);
        if found == 0.0 {
            return 0.0;
        }
        let chain = std::iter::once(el.id()).chain(el.ancestors().map(|n| n.id()));
        let distance = chain.enumerate().find_map(|(up, id)| {
            anchor_chain
                .iter()
                .position(|a| *a == id)
                .map(|down| up + down)
        });
        match distance {
            Some(d) if (1..=MAX_PROXIMITY_DISTANCE).contains(&d) => {
                found / (1.0 + 0.25 * d as f64)
            }
            _ => 0.0,
        }
    })
}

fn is_clickable(element: ElementRef<'_>) -> bool {
    let value = element.value();
    let name = value.name();
    if CLICKABLE_TAGS.contains(&name) || value.attr("onclick").is_some() {
        return true;
    }
    if name == "input" {
        return value
            .attr("type")
            .is_some_and(|t| BUTTON_INPUT_TYPES.contains(&t.to_ascii_lowercase().as_str()));
    }
    value
        .attr("role")
        .is_some_and(|role| CLICKABLE_ROLES.contains(&role.to_ascii_lowercase().as_str()))
}

fn is_editable(element: ElementRef<'_>) -> bool {
    let value = element.value();
    match value.name() {
        "textarea" | "select" => true,
        "input" => {
            let kind = value.attr("type").unwrap_or("text").to_ascii_lowercase();
            kind != "hidden" && !BUTTON_INPUT_TYPES.contains(&kind.as_str())
        }
        _ => value
            .attr("contenteditable")
            .is_some_and(|v| !v.eq_ignore_ascii_case("false")),
    }
}

/// Whether `element` plays the role `intent` acts on.
fn has_role(element: ElementRef<'_>, intent: Intent) -> bool {
    match intent {
        Intent::Click => is_clickable(element),
        Intent::Type => is_editable(element),
        Intent::Extract | Intent::Wait => true,
    }
}

/// Text a user would identify `element` by, for `intent`.
fn role_text(element: ElementRef<'_>, intent: Intent, labels: &HashMap<String, String>) -> String {
    let value = element.value();
    let mut parts: Vec<String> = Vec::new();
    match intent {
        Intent::Click => {
            parts.push(element.text().collect::<Vec<_>>().join(" "));
            parts.extend(
                ["aria-label", "value", "title", "alt"]
                    .iter()
                    .filter_map(|a| value.attr(a).map(str::to_string)),
            );
        }
        Intent::Type => {
            parts.extend(
                ["placeholder", "aria-label", "title", "name"]
                    .iter()
                    .filter_map(|a| value.attr(a).map(str::to_string)),
            );
            if let Some(label) = value.id().and_then(|id| labels.get(id)) {
                parts.push(label.clone());
            }
        }
        Intent::Extract | Intent::Wait => {
            // Own text only, so the innermost element wins over its wrappers.
            parts.extend(
                element
                    .children()
                    .filter_map(|child| child.value().as_text().map(|t| String::from(&**t))),
            );
        }
    }
    parts.join(" ")
}

/// `label[for]` text by the id it points at.
fn label_texts(document: &Html) -> HashMap<String, String> {
    let Ok(selector) = Selector::parse("label[for]") else {
        return HashMap::new();
    };
    document
        .select(&selector)
        .filter_map(|label| {
            let target = label.value().attr("for")?;
            Some((target.to_string(), label.text().collect::<Vec<_>>().join(" ")))
        })
        .collect()
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
