//! HTML reduction: main-content detection and text extraction.
//!
//! Parsing happens synchronously; `scraper::Html` never lives across an
//! `.await`.

use scraper::{ElementRef, Html, Node, Selector};

/// Candidates for the main content root, most specific first.
const MAIN_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role=\"main\"]",
    "#content",
    ".content",
    ".post-content",
    ".article-content",
    ".entry-content",
    ".post",
    ".article",
];

/// Never visible.
const INVISIBLE_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Chrome around the content.
const BOILERPLATE_TAGS: &[&str] = &[
    "nav", "header", "footer", "aside", "form", "iframe", "svg",
];

/// `id`/`class` tokens marking ads, trackers and page furniture.
const BOILERPLATE_MARKERS: &[&str] = &[
    "ad",
    "ads",
    "advert",
    "advertisement",
    "sponsored",
    "tracker",
    "tracking",
    "cookie",
    "cookies",
    "consent",
    "banner",
    "sidebar",
    "menu",
    "share",
    "social",
    "promo",
    "newsletter",
];

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "h1", "h2", "h3", "h4", "h5", "h6", "li", "ul",
    "ol", "dl", "dt", "dd", "tr", "table", "thead", "tbody", "blockquote", "pre", "br", "hr",
    "figure", "figcaption", "address", "details", "summary", "body",
];

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pruning {
    /// Drop only what a reader never sees.
    Invisible,
    /// Also drop navigation, ads and other boilerplate.
    Boilerplate,
}

impl Pruning {
    fn drops(self, element: ElementRef<'_>) -> bool {
        let name = element.value().name();
        if INVISIBLE_TAGS.contains(&name) {
            return true;
        }
        if self == Pruning::Invisible {
            return false;
        }
        BOILERPLATE_TAGS.contains(&name) || has_boilerplate_marker(element)
    }
}

fn has_boilerplate_marker(element: ElementRef<'_>) -> bool {
    let value = element.value();
    let id = value.id().into_iter();
    let classes = value.classes();
    id.chain(classes).any(|name| {
        name.split(|c: char| !c.is_ascii_alphanumeric())
            .any(|token| BOILERPLATE_MARKERS.contains(&token.to_ascii_lowercase().as_str()))
    })
}

/// Main-content root: the first [`MAIN_SELECTORS`] match, else `body`.
fn main_root(document: &Html) -> ElementRef<'_> {
    for selector in MAIN_SELECTORS.iter().chain(std::iter::once(&"body")) {
        if let Ok(selector) = Selector::parse(selector) {
            if let Some(element) = document.select(&selector).next() {
                return element;
            }
        }
    }
    document.root_element()
}

/// Readable text of the main content.
pub fn main_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();
    walk_text(main_root(&document), Pruning::Boilerplate, &mut out);
    tidy(&out)
}

/// HTML of the main content with boilerplate subtrees removed.
pub fn main_html(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();
    write_html(main_root(&document), Pruning::Boilerplate, &mut out);
    out
}

/// Visible text of the whole document.
pub fn document_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();
    walk_text(document.root_element(), Pruning::Invisible, &mut out);
    tidy(&out)
}

fn walk_text(element: ElementRef<'_>, pruning: Pruning, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            if pruning.drops(child_element) {
                continue;
            }
            let block = BLOCK_TAGS.contains(&child_element.value().name());
            if block {
                out.push('\n');
            }
            walk_text(child_element, pruning, out);
            if block {
                out.push('\n');
            }
        } else if let Some(text) = child.value().as_text() {
            push_text(text, out);
        }
    }
}

fn push_text(text: &str, out: &mut String) {
    let mut words = text.split_whitespace().peekable();
    if words.peek().is_none() {
        if !text.is_empty() && !out.ends_with(char::is_whitespace) && !out.is_empty() {
            out.push(' ');
        }
        return;
    }
    if text.starts_with(char::is_whitespace) && !out.ends_with(char::is_whitespace) && !out.is_empty() {
        out.push(' ');
    }
    let mut first = true;
    for word in words {
        if !first {
            out.push(' ');
        }
        out.push_str(word);
        first = false;
    }
    if text.ends_with(char::is_whitespace) {
        out.push(' ');
    }
}

/// Trim lines, collapse blank runs to one blank line and drop a line that
/// repeats the previous one.
fn tidy(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last: Option<&str> = None;
    let mut pending_blank = false;

    for line in raw.lines().map(str::trim) {
        if line.is_empty() {
            pending_blank = true;
            continue;
        }
        if last == Some(line) {
            continue;
        }
        if !out.is_empty() {
            out.push_str(if pending_blank { "\n\n" } else { "\n" });
        }
        out.push_str(line);
        last = Some(line);
        pending_blank = false;
    }
    out
}

fn write_html(element: ElementRef<'_>, pruning: Pruning, out: &mut String) {
    let value = element.value();
    out.push('<');
    out.push_str(value.name());
    for (name, attr) in value.attrs() {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_into(attr, true, out);
        out.push('"');
    }
    out.push('>');
    if VOID_TAGS.contains(&value.name()) {
        return;
    }

    for child in element.children() {
        match child.value() {
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    if !pruning.drops(child_element) {
                        write_html(child_element, pruning, out);
                    }
                }
            }
            Node::Text(text) => escape_into(text, false, out),
            _ => {}
        }
    }

    out.push_str("</");
    out.push_str(value.name());
    out.push('>');
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

/// Cut `text` to at most `max_chars` characters, preferring a word break.
/// Returns the kept prefix and whether anything was cut.
pub fn truncate_at_word(text: &str, max_chars: usize) -> (&str, bool) {
    let Some((end, _)) = text.char_indices().nth(max_chars) else {
        return (text, false);
    };
    let prefix = &text[..end];
    let cut = prefix
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map(|(i, _)| i)
        .filter(|&i| i >= prefix.len() / 2)
        .unwrap_or(end);
    (prefix[..cut].trim_end(), true)
}

/// Cut `text` to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => (&text[..end], true),
        None => (text, false),
    }
}

#[cfg(test)]
#[path = "reduce_tests.rs"]
mod tests;
