//! Unique CSS selectors for elements of a parsed snapshot.

use scraper::{ElementRef, Html};

fn is_plain_ident(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn id_count(document: &Html, id: &str) -> usize {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().id() == Some(id))
        .count()
}

/// `#id` when `element` carries an id that is unique in the document and
/// safe to write unescaped.
fn unique_id(document: &Html, element: ElementRef<'_>) -> Option<String> {
    let id = element.value().id()?;
    (is_plain_ident(id) && id_count(document, id) == 1).then(|| format!("#{}", id))
}

/// 1-based position of `element` among its siblings of the same tag.
fn nth_of_type(element: ElementRef<'_>) -> usize {
    let name = element.value().name();
    element
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == name)
        .count()
        + 1
}

/// A selector matching exactly `element`: `#id` when unique, otherwise an
/// `:nth-of-type` chain from the nearest uniquely-id'd ancestor or `html`.
pub(crate) fn unique_selector(document: &Html, element: ElementRef<'_>) -> String {
    if let Some(id) = unique_id(document, element) {
        return id;
    }

    let mut segments = Vec::new();
    let mut current = Some(element);
    let mut is_target = true;
    while let Some(el) = current {
        let parent = el.parent().and_then(ElementRef::wrap);
        if parent.is_none() {
            segments.push(el.value().name().to_string());
            break;
        }
        if !is_target {
            if let Some(id) = unique_id(document, el) {
                segments.push(id);
                break;
            }
        }
        segments.push(format!("{}:nth-of-type({})", el.value().name(), nth_of_type(el)));
        current = parent;
        is_target = false;
    }

    segments.reverse();
    segments.join(" > ")
}
