//! JavaScript snippets evaluated in the page by the default helpers.

pub(crate) const METRICS: &str = r#"(() => ({
  htmlBytes: document.documentElement ? document.documentElement.outerHTML.length : 0,
  nodeCount: document.getElementsByTagName('*').length,
  imageCount: document.images.length,
  iframeCount: document.getElementsByTagName('iframe').length,
  scriptCount: document.scripts.length
}))()"#;

/// Whether a selector is XPath rather than CSS.
pub fn is_xpath(selector: &str) -> bool {
    let s = selector.trim_start();
    s.starts_with('/') || s.starts_with('(') || s.starts_with("xpath=")
}

pub fn strip_xpath_prefix(selector: &str) -> &str {
    let s = selector.trim_start();
    s.strip_prefix("xpath=").unwrap_or(s)
}

/// JS expression evaluating to an array of elements matching `selector`.
pub(crate) fn locate_all(selector: &str) -> String {
    if is_xpath(selector) {
        let xpath = js_string(strip_xpath_prefix(selector));
        format!(
            "(() => {{ const r = document.evaluate({xpath}, document, null, \
             XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); const out = []; \
             for (let i = 0; i < r.snapshotLength; i++) {{ const n = r.snapshotItem(i); \
             if (n.nodeType === 1) out.push(n); }} return out; }})()"
        )
    } else {
        format!("Array.from(document.querySelectorAll({}))", js_string(selector))
    }
}

pub(crate) fn count_matches(selector: &str) -> String {
    format!("{}.length", locate_all(selector))
}

pub(crate) fn select_content(selector: &str, html: bool) -> String {
    let prop = if html { "outerHTML" } else { "innerText" };
    format!(
        "(() => {{ const el = {}[0]; return el ? el.{} : null; }})()",
        locate_all(selector),
        prop
    )
}

/// Scrolls the first match into view and returns its center, or null.
pub(crate) fn element_center(selector: &str) -> String {
    format!(
        "(() => {{ const el = {}[0]; if (!el) return null; \
         el.scrollIntoView({{block: 'center', inline: 'center'}}); \
         const r = el.getBoundingClientRect(); \
         return {{x: r.left + r.width / 2, y: r.top + r.height / 2}}; }})()",
        locate_all(selector)
    )
}

/// Focuses the first match and clears its value; returns false when absent.
pub(crate) fn focus_element(selector: &str) -> String {
    format!(
        "(() => {{ const el = {}[0]; if (!el) return false; el.focus(); \
         if ('value' in el) el.value = ''; return true; }})()",
        locate_all(selector)
    )
}

/// Quote a Rust string as a JS string literal.
fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_xpath() {
        assert!(is_xpath("//button[text()='Go']"));
        assert!(is_xpath("(//a)[2]"));
        assert!(is_xpath("xpath=//div"));
        assert!(!is_xpath("#submit"));
        assert!(!is_xpath("div > a"));
    }

    #[test]
    fn test_strip_xpath_prefix() {
        assert_eq!(strip_xpath_prefix("xpath=//div"), "//div");
        assert_eq!(strip_xpath_prefix("//div"), "//div");
    }

    #[test]
    fn test_locate_all_quotes_selector() {
        let js = locate_all(r#"a[title="x"]"#);
        assert!(js.contains(r#"querySelectorAll("a[title=\"x\"]")"#));
    }

    #[test]
    fn test_locate_all_xpath() {
        let js = locate_all("xpath=//a");
        assert!(js.contains("document.evaluate(\"//a\""));
    }

    #[test]
    fn test_select_content_property() {
        assert!(select_content("p", false).contains("innerText"));
        assert!(select_content("p", true).contains("outerHTML"));
    }
}
