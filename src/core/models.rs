//! Core data models for the translation gateway

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use utoipa::ToSchema;

/// Translation request as received from a client
///
/// Missing fields deserialize as empty strings so that they are reported by
/// validation rather than by the JSON extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRequest {
    /// Source text, used verbatim
    #[serde(default)]
    pub text: String,
    /// Caller-supplied target language identifier, e.g. "French" or "fr"
    #[serde(default)]
    pub target_lang: String,
}

impl TranslationRequest {
    pub fn new(text: impl Into<String>, target_lang: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target_lang: target_lang.into(),
        }
    }

    /// Cache key for this request. No normalization is applied.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(self.text.clone(), self.target_lang.clone())
    }
}

/// Exact-match cache key over `(text, target_lang)`
///
/// "Hello" and "hello" are different keys, as are "Hi" and "Hi ".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub text: String,
    pub target_lang: String,
}

impl CacheKey {
    pub fn new(text: impl Into<String>, target_lang: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target_lang: target_lang.into(),
        }
    }

    /// Flat string form of the key.
    ///
    /// The text length is written first, so a ':' inside the text can never
    /// make two different pairs encode to the same string.
    pub fn encode(&self) -> String {
        format!("{}:{}:{}", self.text.len(), self.text, self.target_lang)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?} -> {:?})", self.text, self.target_lang)
    }
}

/// Translation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub text: String,
    /// Whether the value was served from the cache
    pub cached: bool,
}

/// Fixed window counter for one client
#[derive(Debug, Clone)]
pub struct RateWindow {
    pub client_id: String,
    pub window_start: Instant,
    pub count: u32,
}

impl RateWindow {
    pub fn new(client_id: impl Into<String>, now: Instant) -> Self {
        Self {
            client_id: client_id.into(),
            window_start: now,
            count: 0,
        }
    }

    /// The window covers `[window_start, window_start + window)`.
    pub fn has_elapsed(&self, now: Instant, window: Duration) -> bool {
        now >= self.window_start + window
    }

    pub fn reset_at(&self, window: Duration) -> Instant {
        self.window_start + window
    }
}

/// Outcome of a rate limiter check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateDecision {
    pub permitted: bool,
    /// Configured maximum per window
    pub limit: u32,
    pub remaining: u32,
    /// Wall-clock time at which the current window ends
    pub reset_at: chrono::DateTime<chrono::Utc>,
    /// Time left until the current window ends
    pub reset_after: Duration,
}

impl RateDecision {
    /// Seconds until reset, rounded up so clients never retry early
    pub fn reset_after_secs(&self) -> u64 {
        let secs = self.reset_after.as_secs();
        if self.reset_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}
