//! Top-level price verifier combining the result cache, reconciliation
//! engine and retry scheduler.
//!
//! This is the public entry point of the crate.

use super::cache::{CacheKey, CacheLookup, ResultCache};
use super::parser::ResponseParser;
use super::reconcile::{Reconciliation, ReconciliationEngine};
use super::record::{ErrorType, PlanDescriptor, RequestContext, VerificationRecord};
use super::retry::RetryScheduler;
use crate::config::VerifierConfig;
use crate::error::Result;
use crate::event::{
    create_event_channel, VerificationEvent, VerificationEventsChannel, VerificationEventsSender,
};
use crate::model::{GeminiClient, ModelClient};
use crate::prompt::verification_prompt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Verifies advertised plan prices against provider pages.
///
/// Combines:
/// 1. A TTL cache of previously verified plans
/// 2. Concurrent primary/secondary model queries with reconciliation
/// 3. Exponential backoff retries bounded by a per-call budget
pub struct PriceVerifier {
    primary: Arc<dyn ModelClient>,
    secondary: Arc<dyn ModelClient>,
    engine: ReconciliationEngine,
    cache: ResultCache,
    retry: RetryScheduler,
    default_retry_count: u32,
    events_tx: VerificationEventsSender,
}

impl PriceVerifier {
    /// Create a verifier over two model clients.
    #[must_use]
    pub fn new(
        primary: Arc<dyn ModelClient>,
        secondary: Arc<dyn ModelClient>,
        config: &VerifierConfig,
    ) -> Self {
        let (events_tx, _) = create_event_channel();
        let engine = ReconciliationEngine::new(ResponseParser::new(config.promo_field))
            .with_model_timeout(config.model_timeout())
            .with_events(events_tx.clone());

        info!(
            "Price verifier initialized (primary={}, secondary={}, cache_timeout={}s)",
            primary.name(),
            secondary.name(),
            config.cache_timeout_secs
        );

        Self {
            primary,
            secondary,
            engine,
            cache: ResultCache::with_timeout(config.cache_timeout()),
            retry: RetryScheduler::from_config(&config.backoff),
            default_retry_count: config.retry_count,
            events_tx,
        }
    }

    /// Create a verifier backed by the Gemini models named in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or a client cannot be built.
    pub fn from_config(config: &VerifierConfig, api_key: &str) -> Result<Self> {
        let primary = GeminiClient::new(&config.api_base, api_key, config.primary.clone())?;
        let secondary = GeminiClient::new(&config.api_base, api_key, config.secondary.clone())?;
        Ok(Self::new(Arc::new(primary), Arc::new(secondary), config))
    }

    /// Use `cache` as the result store (builder).
    ///
    /// Lets several verifiers share one table, or tests start from a known one.
    #[must_use]
    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = cache;
        self
    }

    /// Use `retry` for backoff between attempts (builder).
    #[must_use]
    pub fn with_retry_scheduler(mut self, retry: RetryScheduler) -> Self {
        self.retry = retry;
        self
    }

    /// Subscribe to verification events.
    #[must_use]
    pub fn subscribe_events(&self) -> VerificationEventsChannel {
        self.events_tx.subscribe()
    }

    /// The result cache.
    #[must_use]
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Verify `plan` at `provider_url` with the configured retry budget.
    pub async fn verify(&self, provider_url: &str, plan: &PlanDescriptor) -> VerificationRecord {
        self.verify_price(provider_url, plan, self.default_retry_count, None)
            .await
    }

    /// Verify `plan` at `provider_url`.
    ///
    /// Never fails: model errors, unresolvable disagreements and timeouts are
    /// retried up to `retry_count` attempts, after which a record with
    /// [`ErrorType::VerificationFailed`] is returned. `correlation_id` defaults
    /// to the generated request id.
    pub async fn verify_price(
        &self,
        provider_url: &str,
        plan: &PlanDescriptor,
        retry_count: u32,
        correlation_id: Option<&str>,
    ) -> VerificationRecord {
        let ctx = RequestContext::new(correlation_id);
        let span = info_span!(
            "verify_price",
            correlation_id = %ctx.correlation_id,
            request_id = %ctx.request_id
        );
        self.run(provider_url, plan, retry_count, &ctx)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        provider_url: &str,
        plan: &PlanDescriptor,
        retry_count: u32,
        ctx: &RequestContext,
    ) -> VerificationRecord {
        let started = Instant::now();
        info!(
            provider_url,
            plan_name = %plan.providers_plan_name,
            speed = %format!("{}/{}", plan.download_speed, plan.upload_speed),
            "Starting price verification"
        );

        let key = CacheKey::new(provider_url, plan);
        match self.cache.lookup(&key) {
            CacheLookup::Hit { record, age } => {
                info!(cache_key = %key, age_seconds = age.as_secs_f64(), "Cache hit for plan verification");
                self.emit(VerificationEvent::CacheHit {
                    correlation_id: ctx.correlation_id.clone(),
                    cache_key: key.to_string(),
                });
                return record;
            }
            CacheLookup::Expired { age } => {
                info!(
                    cache_key = %key,
                    age_seconds = age.as_secs_f64(),
                    timeout_seconds = self.cache.timeout().as_secs(),
                    "Cache entry expired"
                );
                self.emit(VerificationEvent::CacheExpired {
                    correlation_id: ctx.correlation_id.clone(),
                    cache_key: key.to_string(),
                });
            }
            CacheLookup::Miss => {}
        }

        debug!(cache_key = %key, "Cache miss, proceeding with verification");
        self.emit(VerificationEvent::CacheMiss {
            correlation_id: ctx.correlation_id.clone(),
            cache_key: key.to_string(),
        });

        let prompt = verification_prompt(provider_url, plan.download_speed);
        let mut attempt = 0;
        let mut last_error = None;

        while attempt < retry_count {
            debug!(retry_attempt = attempt, "Sending requests to models");
            let failure = match self
                .engine
                .reconcile(&prompt, &*self.primary, &*self.secondary, plan, ctx)
                .await
            {
                Ok(Reconciliation::Resolved(record)) => {
                    self.emit(VerificationEvent::Verified {
                        correlation_id: ctx.correlation_id.clone(),
                        verified: record.verified,
                        confidence_score: record.confidence_score,
                    });
                    if record.is_cacheable() {
                        info!(
                            confidence_score = record.confidence_score,
                            price = ?record.current_price,
                            duration_ms = %started.elapsed().as_millis(),
                            "Valid result received, caching"
                        );
                        self.cache.put(key.clone(), record.clone());
                        self.emit(VerificationEvent::CacheStored {
                            correlation_id: ctx.correlation_id.clone(),
                            cache_key: key.to_string(),
                        });
                    }
                    return record;
                }
                Ok(Reconciliation::NeedsFullRetry { confidence_score }) => format!(
                    "Equal confidence ({confidence_score}) with unclear match quality requires full retry"
                ),
                Err(e) => e.to_string(),
            };

            attempt += 1;
            warn!(
                attempt,
                max_attempts = retry_count,
                error = %failure,
                duration_ms = %started.elapsed().as_millis(),
                "Verification attempt failed"
            );
            self.emit(VerificationEvent::AttemptFailed {
                correlation_id: ctx.correlation_id.clone(),
                attempt,
                error: failure.clone(),
            });
            last_error = Some(failure);

            self.retry.wait(attempt).await;
        }

        error!(
            error = ?last_error,
            total_attempts = retry_count,
            duration_ms = %started.elapsed().as_millis(),
            "All retry attempts exhausted"
        );
        self.emit(VerificationEvent::Failed {
            correlation_id: ctx.correlation_id.clone(),
            attempts: attempt,
        });

        VerificationRecord::failure(
            ErrorType::VerificationFailed,
            last_error.unwrap_or_else(|| "No verification attempts were allowed".to_string()),
        )
    }

    fn emit(&self, event: VerificationEvent) {
        let _ = self.events_tx.send(event);
    }
}
