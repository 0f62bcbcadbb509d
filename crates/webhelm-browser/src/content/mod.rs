//! Token-aware content delivery.
//!
//! Decides what part of a page to return (full document, main content, a
//! short summary or one element) and how much of it fits the caller's token
//! budget. Oversized content is split into chunks; the first chunk comes
//! back with a continuation token that describes how to re-derive the same
//! split, so nothing is held server-side between calls.

pub mod chunk;
mod continuation;
mod engine;
pub mod reduce;

pub use continuation::ContinuationToken;
pub use engine::ContentEngine;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::selector::SelectorResolution;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    /// The whole document.
    Full,
    /// The main content with navigation and boilerplate stripped.
    #[default]
    Main,
    /// A short preview of the main content.
    Summary,
    /// One element.
    Selector,
}

impl ContentMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Main => "main",
            Self::Summary => "summary",
            Self::Selector => "selector",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    #[default]
    Text,
    Html,
}

/// One content-returning call.
#[derive(Debug, Clone, Default)]
pub struct ContentRequest {
    pub mode: ContentMode,
    /// Required when `mode` is `Selector`.
    pub selector: Option<String>,
    /// Token budget; the configured default when absent.
    pub budget: Option<usize>,
    pub format: ContentFormat,
    /// Token from a previous chunked response. Its parameters replace
    /// `mode`, `selector`, `budget` and `format`.
    pub continuation: Option<String>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkInfo {
    pub index: usize,
    pub total: usize,
    /// Fetches chunk `index + 1`; absent on the last chunk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentResult {
    pub content: String,
    pub estimated_tokens: usize,
    pub mode: ContentMode,
    pub format: ContentFormat,
    /// Content was cut short, not just chunked.
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_info: Option<ChunkInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    pub resources_blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector_resolution: Option<SelectorResolution>,
}
