//! Translation gateway - cached, rate-limited access to a generative translation model
//!
//! A request passes validation, a per-client fixed window rate limit and an
//! exact-match cache before the model is called. Concurrent misses for the
//! same text and language share a single model call.

#![forbid(unsafe_code)]

pub mod core;
pub mod server;
pub mod cli;

// Re-export key types for convenience
pub use crate::core::{
    cache::{CacheStore, MemoryStore, RedisStore},
    config::GatewayConfig,
    errors::{GatewayError, ProviderError, StoreError},
    models::{CacheKey, RateDecision, TranslationRequest, TranslationResult},
    pipeline::{Translated, TranslationPipeline},
    provider::{GeminiClient, TextGenerator, Translator},
    rate_limiter::RateLimiter,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
