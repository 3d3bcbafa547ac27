//! Translation pipeline: validation, rate limiting, caching and dispatch
//!
//! Per request: validate, count against the client's window, look up the
//! cache, and on a miss call the provider and write the result back.
//!
//! Concurrent misses for the same key share one provider call. The first
//! caller registers a shared handle in `in_flight`; later callers await that
//! handle instead of calling the provider again. The map lock only guards
//! registration and removal, never the provider call itself.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::core::cache::{build_store, CacheStore};
use crate::core::config::GatewayConfig;
use crate::core::errors::{GatewayError, ProviderError, ProviderResult, Result};
use crate::core::models::{CacheKey, RateDecision, TranslationRequest, TranslationResult};
use crate::core::provider::{GeminiClient, Translator};
use crate::core::rate_limiter::RateLimiter;

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

type InFlight = Shared<BoxFuture<'static, ProviderResult<Fetched>>>;

/// Outcome shared by every caller waiting on one fetch
#[derive(Debug, Clone)]
struct Fetched {
    text: String,
    /// Found in the cache on the re-check, no provider call made
    from_cache: bool,
}

/// Successful pipeline outcome
#[derive(Debug, Clone)]
pub struct Translated {
    pub result: TranslationResult,
    /// Rate limit state after counting this request
    pub rate: RateDecision,
}

/// Orchestrates one translation request end to end
pub struct TranslationPipeline {
    store: Arc<dyn CacheStore>,
    limiter: Arc<RateLimiter>,
    translator: Translator,
    cache_ttl: Duration,
    provider_timeout: Duration,
    in_flight: Arc<Mutex<HashMap<CacheKey, InFlight>>>,
}

impl TranslationPipeline {
    /// Create a pipeline with default TTL and provider timeout
    pub fn new(store: Arc<dyn CacheStore>, limiter: Arc<RateLimiter>, translator: Translator) -> Self {
        Self {
            store,
            limiter,
            translator,
            cache_ttl: DEFAULT_CACHE_TTL,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// Build every collaborator from configuration
    pub async fn from_config(config: &GatewayConfig) -> anyhow::Result<Self> {
        let generator = GeminiClient::from_config(config)?;
        let store = build_store(config).await;
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit_window(),
            config.rate_limit_max,
        ));

        info!(
            "Pipeline ready: model={}, cache={}, ttl={}s, limit={}/{}s",
            config.model,
            store.name(),
            config.cache_ttl_secs,
            config.rate_limit_max,
            config.rate_limit_window_secs
        );

        Ok(Self::new(store, limiter, Translator::new(Arc::new(generator)))
            .with_cache_ttl(config.cache_ttl())
            .with_provider_timeout(config.provider_timeout()))
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    /// Drop elapsed rate windows and expired cache entries
    pub async fn purge_expired(&self) -> (usize, usize) {
        let windows = self.limiter.purge_expired();
        let entries = self.store.purge_expired().await;
        (windows, entries)
    }

    /// Reject requests with a missing or blank field
    pub fn validate(request: &TranslationRequest) -> Result<()> {
        if request.text.trim().is_empty() || request.target_lang.trim().is_empty() {
            return Err(GatewayError::validation(
                "Text and target language are required.",
            ));
        }
        Ok(())
    }

    /// Translate `request` on behalf of `client_id`
    pub async fn translate(
        &self,
        client_id: &str,
        request: &TranslationRequest,
    ) -> Result<Translated> {
        Self::validate(request)?;

        let rate = self.limiter.allow(client_id);
        if !rate.permitted {
            warn!(
                "Rate limit exceeded for {}, resets in {}s",
                client_id,
                rate.reset_after_secs()
            );
            return Err(GatewayError::RateLimited { decision: rate });
        }

        let key = request.cache_key();

        match self.store.get(&key).await {
            Ok(Some(text)) => {
                debug!("Cache hit for {}", key);
                return Ok(Translated {
                    result: TranslationResult { text, cached: true },
                    rate,
                });
            }
            Ok(None) => debug!("Cache miss for {}", key),
            Err(e) => warn!("{}, treating as cache miss", e),
        }

        match self.fetch(key).await {
            Ok(fetched) => Ok(Translated {
                result: TranslationResult {
                    text: fetched.text,
                    cached: fetched.from_cache,
                },
                rate,
            }),
            Err(_) => Err(GatewayError::TranslationFailure),
        }
    }

    /// Join the in-flight call for `key`, or start one
    async fn fetch(&self, key: CacheKey) -> ProviderResult<Fetched> {
        let pending = {
            let mut in_flight = self.in_flight.lock().await;
            match in_flight.get(&key) {
                Some(pending) => {
                    debug!("Joining in-flight translation for {}", key);
                    pending.clone()
                }
                None => {
                    let pending = self.spawn_fetch(key.clone());
                    in_flight.insert(key, pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    /// Run the provider call on its own task so it completes, writes the cache
    /// and unregisters itself even if every waiting request is dropped.
    fn spawn_fetch(&self, key: CacheKey) -> InFlight {
        let translator = self.translator.clone();
        let store = self.store.clone();
        let in_flight = self.in_flight.clone();
        let ttl = self.cache_ttl;
        let timeout = self.provider_timeout;

        let task = {
            let key = key.clone();
            let in_flight = in_flight.clone();
            tokio::spawn(async move {
                // A caller that missed before the previous fetch wrote the cache
                // lands here only after that fetch unregistered, so look again.
                if let Ok(Some(text)) = store.get(&key).await {
                    debug!("Cache filled by an earlier fetch for {}", key);
                    in_flight.lock().await.remove(&key);
                    return Ok(Fetched {
                        text,
                        from_cache: true,
                    });
                }

                let outcome = match tokio::time::timeout(
                    timeout,
                    translator.translate(&key.text, &key.target_lang),
                )
                .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => Err(ProviderError::Timeout),
                };

                match &outcome {
                    Ok(text) => {
                        if let Err(e) = store.set(&key, text.clone(), ttl).await {
                            warn!("Failed to cache translation for {}: {}", key, e);
                        }
                    }
                    Err(e) => error!("Translation failed for {}: {}", key, e),
                }

                // Cache is written before unregistering, so later requests hit it.
                in_flight.lock().await.remove(&key);
                outcome.map(|text| Fetched {
                    text,
                    from_cache: false,
                })
            })
        };

        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Translation task for {} failed: {}", key, e);
                    in_flight.lock().await.remove(&key);
                    Err(ProviderError::InvalidResponse {
                        message: format!("translation task failed: {}", e),
                    })
                }
            }
        }
        .boxed()
        .shared()
    }
}
