//! Configuration management

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gateway configuration, read from the environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub api_key: String,
    pub model: String,
    pub api_endpoint: String,
    pub provider_timeout_ms: u64,
    pub cache_ttl_secs: u64,
    pub redis_url: Option<String>,
    pub redis_timeout_ms: u64,
    pub cache_key_prefix: String,
    pub rate_limit_window_secs: u64,
    pub rate_limit_max: u32,
    pub max_text_chars: usize,
    pub trust_forwarded_for: bool,
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            api_endpoint: DEFAULT_ENDPOINT.to_string(),
            provider_timeout_ms: 30_000,
            cache_ttl_secs: 86_400,
            redis_url: None,
            redis_timeout_ms: 1_000,
            cache_key_prefix: "translation:".to_string(),
            rate_limit_window_secs: 900,
            rate_limit_max: 100,
            max_text_chars: 5_000,
            trust_forwarded_for: false,
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Read `name`, falling back to `default` when unset.
fn env_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid value for {}: {}", name, e)),
        Err(_) => Ok(default),
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let redis_url = std::env::var("REDIS_URL")
            .ok()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        Ok(Self {
            api_key: std::env::var("GEMINI_API_KEY").unwrap_or_default(),
            model: env_or("GEMINI_MODEL", defaults.model)?,
            api_endpoint: env_or("GEMINI_ENDPOINT", defaults.api_endpoint)?,
            provider_timeout_ms: env_or("PROVIDER_TIMEOUT_MS", defaults.provider_timeout_ms)?,
            cache_ttl_secs: env_or("CACHE_TTL_SECS", defaults.cache_ttl_secs)?,
            redis_url,
            redis_timeout_ms: env_or("REDIS_TIMEOUT_MS", defaults.redis_timeout_ms)?,
            cache_key_prefix: env_or("CACHE_KEY_PREFIX", defaults.cache_key_prefix)?,
            rate_limit_window_secs: env_or(
                "RATE_LIMIT_WINDOW_SECS",
                defaults.rate_limit_window_secs,
            )?,
            rate_limit_max: env_or("RATE_LIMIT_MAX", defaults.rate_limit_max)?,
            max_text_chars: env_or("MAX_TEXT_CHARS", defaults.max_text_chars)?,
            trust_forwarded_for: env_or("TRUST_FORWARDED_FOR", defaults.trust_forwarded_for)?,
            host: env_or("HOST", defaults.host)?,
            port: env_or("PORT", defaults.port)?,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(anyhow::anyhow!("GEMINI_API_KEY is required"));
        }

        if self.api_endpoint.is_empty() {
            return Err(anyhow::anyhow!("API endpoint is required"));
        }

        if self.provider_timeout_ms == 0 {
            return Err(anyhow::anyhow!("provider_timeout_ms must be greater than 0"));
        }

        if self.redis_timeout_ms == 0 {
            return Err(anyhow::anyhow!("redis_timeout_ms must be greater than 0"));
        }

        if self.cache_ttl_secs == 0 {
            return Err(anyhow::anyhow!("cache_ttl_secs must be greater than 0"));
        }

        if self.rate_limit_window_secs == 0 {
            return Err(anyhow::anyhow!("rate_limit_window_secs must be greater than 0"));
        }

        if self.rate_limit_max == 0 {
            return Err(anyhow::anyhow!("rate_limit_max must be greater than 0"));
        }

        if self.max_text_chars == 0 {
            warn!("max_text_chars is 0, request text length is not bounded");
        }

        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn redis_timeout(&self) -> Duration {
        Duration::from_millis(self.redis_timeout_ms)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }
}
