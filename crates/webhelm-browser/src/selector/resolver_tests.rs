use std::sync::Arc;

use webhelm_config::{BreakerConfig, BrowserConfig, SessionConfig};

use super::*;
use crate::breaker::BreakerRegistry;
use crate::clock::SystemClock;
use crate::driver::WaitCondition;
use crate::driver::fixture::{FixtureLauncher, FixtureOp};
use crate::session::InitOptions;

const URL: &str = "https://example.com/";

async fn session_on(html: &str) -> (FixtureLauncher, SessionManager) {
    let fixture = FixtureLauncher::new().serve(URL, html);
    let clock = Arc::new(SystemClock);
    let session = SessionManager::new(
        Arc::new(fixture.clone()),
        BrowserConfig::default(),
        SessionConfig::default(),
        Arc::new(BreakerRegistry::new(&BreakerConfig::default(), clock.clone())),
        clock,
    );
    session.init(InitOptions::default()).await.unwrap();
    session
        .with_page(OperationClass::Navigation, None, |page| async move {
            page.goto(URL, WaitCondition::Load).await
        })
        .await
        .unwrap();
    (fixture, session)
}

fn resolver() -> SelectorResolver {
    SelectorResolver::new(SelectorConfig::default())
}

#[tokio::test]
async fn test_exact_match_skips_snapshot() {
    let (fixture, session) = session_on("<!DOCTYPE html><html><body><h1 id=\"title\">Hi</h1></body></html>").await;

    let resolution = resolver()
        .resolve(&session, "#title", Intent::Extract, None)
        .await
        .unwrap();

    assert_eq!(resolution, SelectorResolution::exact("#title"));
    assert_eq!(fixture.call_count(FixtureOp::Content), 0);
}

#[tokio::test]
async fn test_missing_id_falls_back_to_text() {
    let (_fixture, session) = session_on(
        "<!DOCTYPE html><html><body><nav><a href=\"/\">Home</a></nav><main>\
         <h2>Missing Persons Report</h2><p>Details follow.</p></main></body></html>",
    )
    .await;

    let resolution = resolver()
        .resolve(&session, "#missing", Intent::Extract, None)
        .await
        .unwrap();

    assert!(resolution.confidence > 0.0);
    assert_eq!(resolution.strategy_used, Some(SelectorStrategy::TextMatch));
    assert_eq!(
        resolution.resolved_selector.as_deref(),
        Some("html > body:nth-of-type(1) > main:nth-of-type(1) > h2:nth-of-type(1)")
    );
    assert_eq!(
        resolution.attempted,
        vec![
            SelectorStrategy::Exact,
            SelectorStrategy::Normalized,
            SelectorStrategy::TextMatch
        ]
    );
}

#[tokio::test]
async fn test_id_case_mismatch_is_normalized() {
    let (_fixture, session) =
        session_on("<!DOCTYPE html><html><body><button id=\"Submit\">Go</button></body></html>").await;

    let resolution = resolver()
        .resolve(&session, "#submit", Intent::Click, None)
        .await
        .unwrap();

    assert_eq!(resolution.strategy_used, Some(SelectorStrategy::Normalized));
    assert_eq!(resolution.resolved_selector.as_deref(), Some("#Submit"));
    assert_eq!(resolution.confidence, 0.9);
}

#[tokio::test]
async fn test_contains_selector_resolves_interactive_element() {
    let (_fixture, session) = session_on(
        "<!DOCTYPE html><html><body><p>Sign in to continue</p>\
         <button class=\"btn\">Sign in</button></body></html>",
    )
    .await;

    let resolution = resolver()
        .resolve(&session, "button:contains(\"Sign in\")", Intent::Click, None)
        .await
        .unwrap();

    assert_eq!(resolution.strategy_used, Some(SelectorStrategy::TextMatch));
    assert_eq!(
        resolution.resolved_selector.as_deref(),
        Some("html > body:nth-of-type(1) > button:nth-of-type(1)")
    );
    assert_eq!(resolution.confidence, 0.75);
}

#[tokio::test]
async fn test_attribute_fragments_resolve_input() {
    let (_fixture, session) = session_on(
        "<!DOCTYPE html><html><body><form><input type=\"text\" name=\"email_address\">\
         <input type=\"submit\" value=\"Send\"></form></body></html>",
    )
    .await;

    let resolution = resolver()
        .resolve(&session, "#emailAddress", Intent::Type, None)
        .await
        .unwrap();

    assert!(resolution.is_resolved());
    assert!(resolution.confidence >= 0.5);
    assert_eq!(
        resolution.resolved_selector.as_deref(),
        Some("html > body:nth-of-type(1) > form:nth-of-type(1) > input:nth-of-type(1)")
    );
}

#[tokio::test]
async fn test_destructive_intent_rejects_weak_match() {
    let html = "<!DOCTYPE html><html><body>\
                <button>Proceed to checkout page now</button></body></html>";
    let (_fixture, session) = session_on(html).await;
    let resolver = resolver();

    let click = resolver
        .resolve(&session, "#checkout", Intent::Click, None)
        .await
        .unwrap();
    assert!(!click.is_resolved());
    assert_eq!(click.confidence, 0.0);
    assert_eq!(click.strategy_used, None);
    assert_eq!(
        click.attempted_names(),
        vec!["exact", "normalized", "text", "attribute"]
    );

    let extract = resolver
        .resolve(&session, "#checkout", Intent::Extract, None)
        .await
        .unwrap();
    assert_eq!(extract.strategy_used, Some(SelectorStrategy::TextMatch));
    assert!(extract.confidence >= 0.3 && extract.confidence < 0.5);
}

#[tokio::test]
async fn test_proximity_to_remembered_selector() {
    // Each span alone covers too little of the hint for the text tier.
    let (_fixture, session) = session_on(
        "<!DOCTYPE html><html><body><div id=\"feed\"><p><span>Net</span> <span>price</span> \
         <span>total</span> <span>EUR</span></p></div></body></html>",
    )
    .await;
    let resolver = resolver();
    resolver.remember(Intent::Wait, "#feed");

    let resolution = resolver
        .resolve(&session, "#net-price-total-eur", Intent::Wait, None)
        .await
        .unwrap();

    assert_eq!(resolution.strategy_used, Some(SelectorStrategy::Proximity));
    assert_eq!(resolution.resolved_selector.as_deref(), Some("#feed > p:nth-of-type(1)"));
    assert!((resolution.confidence - 0.36).abs() < 1e-9);
    assert_eq!(resolver.remembered(Intent::Wait).as_deref(), Some("#feed > p:nth-of-type(1)"));
}

#[tokio::test]
async fn test_proximity_requires_hint_overlap() {
    let (_fixture, session) = session_on(
        "<!DOCTYPE html><html><body><div id=\"feed\"><p>alpha</p></div></body></html>",
    )
    .await;
    let resolver = resolver();
    resolver.remember(Intent::Wait, "#feed");
    resolver.remember(Intent::Extract, "#feed");

    for intent in [Intent::Wait, Intent::Extract] {
        let resolution = resolver
            .resolve(&session, "#zz-qq", intent, None)
            .await
            .unwrap();
        assert_eq!(resolution.resolved_selector, None);
        assert_eq!(resolution.confidence, 0.0);
        assert_eq!(resolution.attempted.last(), Some(&SelectorStrategy::Proximity));
    }
}

#[tokio::test]
async fn test_unresolvable_selector() {
    let (_fixture, session) =
        session_on("<!DOCTYPE html><html><body><p>nothing here</p></body></html>").await;

    let resolution = resolver()
        .resolve(&session, "#qq-zz", Intent::Extract, None)
        .await
        .unwrap();

    assert_eq!(resolution.resolved_selector, None);
    assert_eq!(resolution.confidence, 0.0);
}

#[tokio::test]
async fn test_resolution_is_deterministic() {
    let (_fixture, session) = session_on(
        "<!DOCTYPE html><html><body><h3>Order status</h3><h3>Order status</h3></body></html>",
    )
    .await;
    let first = resolver()
        .resolve(&session, ".order-status", Intent::Extract, None)
        .await
        .unwrap();
    let second = resolver()
        .resolve(&session, ".order-status", Intent::Extract, None)
        .await
        .unwrap();

    assert_eq!(first, second);
    // Equal scores resolve to the first element in document order.
    assert_eq!(
        first.resolved_selector.as_deref(),
        Some("html > body:nth-of-type(1) > h3:nth-of-type(1)")
    );
}

#[tokio::test]
async fn test_crash_during_resolution_is_an_error() {
    let (fixture, session) =
        session_on("<!DOCTYPE html><html><body><p>x</p></body></html>").await;
    fixture.crash_on_next(FixtureOp::Evaluate);

    let err = resolver()
        .resolve(&session, "#gone", Intent::Extract, None)
        .await
        .unwrap_err();
    assert!(matches!(err, BrowserError::SessionCrashed(_)));
}

#[test]
fn test_reset_forgets_selectors() {
    let resolver = resolver();
    resolver.remember(Intent::Click, "#a");
    resolver.remember(Intent::Type, "#b");
    resolver.reset();
    assert_eq!(resolver.remembered(Intent::Click), None);
    assert_eq!(resolver.remembered(Intent::Type), None);
}

#[test]
fn test_threshold_by_intent() {
    let resolver = resolver();
    assert_eq!(resolver.threshold(Intent::Extract), 0.3);
    assert_eq!(resolver.threshold(Intent::Click), 0.5);
}

#[test]
fn test_rank_lists_every_tier() {
    let tiers = rank_candidates(
        "<html><body><p>x</p></body></html>",
        "#nope",
        Intent::Extract,
        Some("p"),
        0.3,
    );
    let names: Vec<_> = tiers.iter().map(|(s, _)| *s).collect();
    assert_eq!(
        names,
        vec![
            SelectorStrategy::Normalized,
            SelectorStrategy::TextMatch,
            SelectorStrategy::AttributeMatch,
            SelectorStrategy::Proximity
        ]
    );
}
