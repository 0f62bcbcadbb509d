//! Hint tokens recovered from a selector that no longer matches.

use std::sync::OnceLock;

use regex::Regex;

use crate::driver::is_xpath;

/// What a failed selector says about the element it was aimed at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Hints {
    /// Tokens from id, class and attribute values.
    pub names: Vec<String>,
    /// Quoted text the element was expected to contain.
    pub text: Option<String>,
}

impl Hints {
    /// Tokens to match against element text: the quoted text if any,
    /// otherwise the name tokens.
    pub fn text_tokens(&self) -> Vec<String> {
        match &self.text {
            Some(text) => tokenize(text),
            None => self.names.clone(),
        }
    }

    /// Tokens to match against element attributes.
    pub fn attribute_tokens(&self) -> Vec<String> {
        if self.names.is_empty() {
            self.text.as_deref().map(tokenize).unwrap_or_default()
        } else {
            self.names.clone()
        }
    }
}

struct Patterns {
    id: Option<Regex>,
    class: Option<Regex>,
    attr: Option<Regex>,
    xpath_attr: Option<Regex>,
    contains: Option<Regex>,
    text_eq: Option<Regex>,
    xpath_contains: Option<Regex>,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        id: Regex::new(r"#([A-Za-z0-9_-]+)").ok(),
        class: Regex::new(r"\.([A-Za-z_-][A-Za-z0-9_-]*)").ok(),
        attr: Regex::new(r#"\[\s*[\w-]+\s*[~|^$*]?=\s*["']?([^"'\]]+)["']?\s*\]"#).ok(),
        xpath_attr: Regex::new(r#"@[\w-]+\s*=\s*["']([^"']+)["']"#).ok(),
        contains: Regex::new(r#":(?:contains|has-text)\(\s*["']([^"']+)["']\s*\)"#).ok(),
        text_eq: Regex::new(r#"(?:normalize-space\(\s*\)|text\(\)|\.)\s*=\s*["']([^"']+)["']"#).ok(),
        xpath_contains: Regex::new(
            r#"contains\(\s*(?:text\(\)|\.|normalize-space\(\s*\))\s*,\s*["']([^"']+)["']\s*\)"#,
        )
        .ok(),
    })
}

fn captures<'a>(re: &Option<Regex>, haystack: &'a str) -> Vec<&'a str> {
    re.as_ref()
        .map(|re| {
            re.captures_iter(haystack)
                .filter_map(|c| c.get(1).map(|m| m.as_str()))
                .collect()
        })
        .unwrap_or_default()
}

/// Extract hints from `selector`.
pub(crate) fn parse(selector: &str) -> Hints {
    let selector = selector.trim();
    let p = patterns();

    if let Some(rest) = selector.strip_prefix("text=") {
        let text = rest.trim().trim_matches(|c| c == '"' || c == '\'').trim();
        return Hints {
            names: Vec::new(),
            text: (!text.is_empty()).then(|| text.to_string()),
        };
    }

    let mut names = Vec::new();
    let text;
    if is_xpath(selector) {
        for value in captures(&p.xpath_attr, selector) {
            names.extend(tokenize(value));
        }
        text = captures(&p.text_eq, selector)
            .into_iter()
            .chain(captures(&p.xpath_contains, selector))
            .next()
            .map(str::to_string);
    } else {
        // Quoted text may contain `.` or `#`; drop it before scanning names.
        let unquoted = p
            .contains
            .as_ref()
            .map(|re| re.replace_all(selector, "").into_owned())
            .unwrap_or_else(|| selector.to_string());
        let unquoted = p
            .attr
            .as_ref()
            .map(|re| re.replace_all(&unquoted, "").into_owned())
            .unwrap_or(unquoted);

        for value in captures(&p.id, &unquoted)
            .into_iter()
            .chain(captures(&p.class, &unquoted))
            .chain(captures(&p.attr, selector))
        {
            names.extend(tokenize(value));
        }
        text = captures(&p.contains, selector).first().map(|s| s.to_string());
    }

    Hints {
        names: dedup(names),
        text,
    }
}

/// Split on non-alphanumerics and camelCase humps, lowercase, and drop
/// tokens shorter than two characters.
pub(crate) fn tokenize(value: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for word in value.split(|c: char| !c.is_alphanumeric()) {
        let mut current = String::new();
        let mut prev_lower = false;
        for c in word.chars() {
            if c.is_uppercase() && prev_lower && !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            prev_lower = c.is_lowercase() || c.is_numeric();
            current.extend(c.to_lowercase());
        }
        if !current.is_empty() {
            tokens.push(current);
        }
    }
    tokens.retain(|t| t.chars().count() >= 2);
    dedup(tokens)
}

fn dedup(tokens: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tokens.len());
    for token in tokens {
        if !out.contains(&token) {
            out.push(token);
        }
    }
    out
}

/// Share of `hint` tokens present in `candidate`, in `[0, 1]`.
pub(crate) fn coverage(hint: &[String], candidate: &[String]) -> f64 {
    if hint.is_empty() {
        return 0.0;
    }
    let matched = hint.iter().filter(|t| candidate.contains(t)).count();
    matched as f64 / hint.len() as f64
}

/// How well `hint` tokens are covered by `candidate` tokens, in `[0, 1]`.
/// Recall dominates; precision breaks ties between loose and tight matches.
pub(crate) fn similarity(hint: &[String], candidate: &[String]) -> f64 {
    if hint.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    let matched = hint.iter().filter(|t| candidate.contains(t)).count();
    if matched == 0 {
        return 0.0;
    }
    let recall = matched as f64 / hint.len() as f64;
    let precision = (matched as f64 / candidate.len() as f64).min(1.0);
    recall * (0.5 + 0.5 * precision)
}
