//! Token estimation.

const DEFAULT_CHARS_PER_TOKEN: f64 = 4.0;

/// Character-count heuristic for LLM token usage.
///
/// Deterministic and monotonic in the length of its input, so chunk
/// boundaries computed from it are reproducible across calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenEstimator {
    chars_per_token: f64,
}

impl TokenEstimator {
    pub fn new(chars_per_token: f64) -> Self {
        let chars_per_token = if chars_per_token.is_finite() && chars_per_token > 0.0 {
            chars_per_token
        } else {
            DEFAULT_CHARS_PER_TOKEN
        };
        Self { chars_per_token }
    }

    pub fn chars_per_token(&self) -> f64 {
        self.chars_per_token
    }

    /// Estimated tokens for `text`, rounded up.
    pub fn estimate(&self, text: &str) -> usize {
        self.estimate_chars(text.chars().count())
    }

    pub fn estimate_chars(&self, chars: usize) -> usize {
        (chars as f64 / self.chars_per_token).ceil() as usize
    }

    /// Largest character count whose estimate stays within `tokens`.
    pub fn chars_for_tokens(&self, tokens: usize) -> usize {
        (tokens as f64 * self.chars_per_token).floor() as usize
    }
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_CHARS_PER_TOKEN)
    }
}
