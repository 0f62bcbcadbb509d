//! Self-healing selector resolution.
//!
//! When a selector stops matching, the resolver tries ranked fallbacks
//! against one HTML snapshot of the page and returns the first candidate
//! that clears the confidence threshold and still matches on the live page.
//!
//! | Tier       | Ceiling | Source                                        |
//! |------------|---------|-----------------------------------------------|
//! | exact      | 1.0     | the selector as given, on the live page       |
//! | normalized | 0.9     | case and whitespace variants                  |
//! | text       | 0.75    | element text against hint tokens, by role     |
//! | attribute  | 0.6     | id/class/name fragments against hint tokens   |
//! | proximity  | 0.45    | near the last selector resolved for the intent |

mod css_path;
mod hints;
mod resolver;

pub use resolver::SelectorResolver;

use serde::{Deserialize, Serialize};

use crate::breaker::OperationClass;

/// What the caller intends to do with the element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Click,
    Type,
    Extract,
    Wait,
}

impl Intent {
    /// Click and type change the page; a wrong guess is not harmless.
    pub fn is_destructive(self) -> bool {
        matches!(self, Self::Click | Self::Type)
    }

    pub(crate) fn operation_class(self) -> OperationClass {
        match self {
            Self::Click | Self::Type => OperationClass::Interaction,
            Self::Extract | Self::Wait => OperationClass::Extraction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectorStrategy {
    #[serde(rename = "exact")]
    Exact,
    #[serde(rename = "normalized")]
    Normalized,
    #[serde(rename = "text")]
    TextMatch,
    #[serde(rename = "attribute")]
    AttributeMatch,
    #[serde(rename = "proximity")]
    Proximity,
}

impl SelectorStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Normalized => "normalized",
            Self::TextMatch => "text",
            Self::AttributeMatch => "attribute",
            Self::Proximity => "proximity",
        }
    }

    /// Highest confidence a match from this tier can reach.
    pub fn ceiling(self) -> f64 {
        match self {
            Self::Exact => 1.0,
            Self::Normalized => 0.9,
            Self::TextMatch => 0.75,
            Self::AttributeMatch => 0.6,
            Self::Proximity => 0.45,
        }
    }
}

impl std::fmt::Display for SelectorStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of resolving one selector.
///
/// `confidence` is 0 exactly when nothing was resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorResolution {
    pub original_selector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_selector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_used: Option<SelectorStrategy>,
    pub confidence: f64,
    /// Tiers tried, in order.
    pub attempted: Vec<SelectorStrategy>,
}

impl SelectorResolution {
    /// The selector matched as given.
    pub fn exact(selector: &str) -> Self {
        Self {
            original_selector: selector.to_string(),
            resolved_selector: Some(selector.to_string()),
            strategy_used: Some(SelectorStrategy::Exact),
            confidence: SelectorStrategy::Exact.ceiling(),
            attempted: vec![SelectorStrategy::Exact],
        }
    }

    pub(crate) fn unresolved(selector: &str, attempted: Vec<SelectorStrategy>) -> Self {
        Self {
            original_selector: selector.to_string(),
            resolved_selector: None,
            strategy_used: None,
            confidence: 0.0,
            attempted,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_selector.is_some()
    }

    pub fn attempted_names(&self) -> Vec<String> {
        self.attempted.iter().map(|s| s.as_str().to_string()).collect()
    }
}
