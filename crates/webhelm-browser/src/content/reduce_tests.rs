use super::*;

const ARTICLE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>News</title><style>body { color: red }</style></head>
<body>
  <nav><a href="/">Home</a> <a href="/world">World</a></nav>
  <div class="cookie-banner">We use cookies</div>
  <article>
    <h1>Rust 2024 ships</h1>
    <p>The new   edition brings <b>async closures</b> and more.</p>
    <div class="share-buttons">Share on social</div>
    <p>Upgrading is   straightforward.</p>
    <script>track()</script>
  </article>
  <aside id="sidebar">Related stories</aside>
  <footer>Copyright</footer>
</body>
</html>"#;

#[test]
fn test_main_text_picks_article_and_strips_boilerplate() {
    let text = main_text(ARTICLE_PAGE);
    assert_eq!(
        text,
        "Rust 2024 ships\n\nThe new edition brings async closures and more.\n\nUpgrading is straightforward."
    );
}

#[test]
fn test_main_text_falls_back_to_body() {
    let html = "<html><body><nav>Menu</nav><p>Only paragraph</p><footer>f</footer></body></html>";
    assert_eq!(main_text(html), "Only paragraph");
}

#[test]
fn test_role_main_root() {
    let html = r#"<body><div>outside</div><div role="main"><p>inside</p></div></body>"#;
    assert_eq!(main_text(html), "inside");
}

#[test]
fn test_marker_tokens_do_not_match_substrings() {
    let html = r#"<body><div class="header-image reading"><p>Kept</p></div><div class="ad-slot">Buy</div></body>"#;
    assert_eq!(main_text(html), "Kept");
}

#[test]
fn test_duplicate_lines_and_blank_runs_collapse() {
    let html = "<body><p>Same</p><p>Same</p><div></div><div></div><p>Next</p></body>";
    assert_eq!(main_text(html), "Same\n\nNext");
}

#[test]
fn test_document_text_keeps_navigation() {
    let text = document_text(ARTICLE_PAGE);
    assert!(text.contains("Home World"));
    assert!(text.contains("Rust 2024 ships"));
    assert!(text.contains("Copyright"));
    assert!(!text.contains("track()"));
    assert!(!text.contains("color: red"));
    assert!(!text.contains("News"));
}

#[test]
fn test_main_html_removes_dropped_subtrees() {
    let html = main_html(ARTICLE_PAGE);
    assert!(html.starts_with("<article>"));
    assert!(html.ends_with("</article>"));
    assert!(html.contains("<h1>Rust 2024 ships</h1>"));
    assert!(html.contains("<b>async closures</b>"));
    assert!(!html.contains("share-buttons"));
    assert!(!html.contains("<script"));
}

#[test]
fn test_main_html_escapes() {
    let html = main_html(r#"<body><main><p title="a &quot;b&quot;">1 &lt; 2 &amp; <br>3</p></main></body>"#);
    assert_eq!(html, r#"<main><p title="a &quot;b&quot;">1 &lt; 2 &amp; <br>3</p></main>"#);
}

#[test]
fn test_truncate_at_word() {
    let (kept, cut) = truncate_at_word("alpha beta gamma delta", 13);
    assert_eq!(kept, "alpha beta");
    assert!(cut);

    let (kept, cut) = truncate_at_word("short", 10);
    assert_eq!(kept, "short");
    assert!(!cut);

    let (kept, cut) = truncate_at_word("abcdefghijklmnop", 5);
    assert_eq!(kept, "abcde");
    assert!(cut);
}

#[test]
fn test_truncate_chars() {
    assert_eq!(truncate_chars("héllo wörld", 5), ("héllo", true));
    assert_eq!(truncate_chars("abc", 3), ("abc", false));
}
