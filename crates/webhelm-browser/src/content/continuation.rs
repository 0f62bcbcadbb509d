//! Stateless continuation tokens.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{ContentFormat, ContentMode};
use crate::error::BrowserError;

const VERSION: u8 = 1;
const FINGERPRINT_HEX_LEN: usize = 16;

/// Everything needed to re-derive a chunked response and pick one chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuationToken {
    pub v: u8,
    pub mode: ContentMode,
    pub format: ContentFormat,
    pub selector: Option<String>,
    pub budget: usize,
    pub index: usize,
    pub total: usize,
    pub fingerprint: String,
}

impl ContinuationToken {
    pub fn new(
        mode: ContentMode,
        format: ContentFormat,
        selector: Option<String>,
        budget: usize,
        index: usize,
        total: usize,
        fingerprint: String,
    ) -> Self {
        Self {
            v: VERSION,
            mode,
            format,
            selector,
            budget,
            index,
            total,
            fingerprint,
        }
    }

    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(self).unwrap_or_default())
    }

    pub fn decode(token: &str) -> Result<Self, BrowserError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|e| BrowserError::InvalidContinuation(format!("not base64: {}", e)))?;
        let parsed: Self = serde_json::from_slice(&bytes)
            .map_err(|e| BrowserError::InvalidContinuation(format!("malformed token: {}", e)))?;

        if parsed.v != VERSION {
            return Err(BrowserError::InvalidContinuation(format!(
                "unsupported token version {}",
                parsed.v
            )));
        }
        if parsed.budget == 0 || parsed.index >= parsed.total {
            return Err(BrowserError::InvalidContinuation(
                "token does not describe a valid chunk".to_string(),
            ));
        }
        Ok(parsed)
    }
}

/// Short SHA-256 fingerprint of `content`.
pub fn fingerprint(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    let mut hex = String::with_capacity(FINGERPRINT_HEX_LEN);
    for byte in digest.iter().take(FINGERPRINT_HEX_LEN / 2) {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}
