//! Dual-model reconciliation.
//!
//! Both models receive the same prompt concurrently. When their prices agree
//! the more confident answer wins. When they disagree, the less trustworthy
//! model is asked once more and the most confident of the three answers is
//! kept. If neither confidence nor the advertised price can say which model
//! is less trustworthy, the attempt is abandoned with
//! [`Reconciliation::NeedsFullRetry`].

use super::parser::ResponseParser;
use super::record::{PlanDescriptor, RequestContext, VerificationRecord};
use crate::error::{Error, Result};
use crate::event::{VerificationEvent, VerificationEventsSender};
use crate::model::{ModelClient, ModelRole};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Outcome of one reconciliation attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// A final record was selected.
    Resolved(VerificationRecord),
    /// Prices differ at equal confidence and the advertised price does not
    /// single out one model; the whole attempt must be redone.
    NeedsFullRetry {
        /// The shared confidence score.
        confidence_score: f64,
    },
}

/// Runs the dual-model protocol for one attempt.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationEngine {
    parser: ResponseParser,
    model_timeout: Option<Duration>,
    events: Option<VerificationEventsSender>,
}

impl ReconciliationEngine {
    /// Create an engine that parses responses with `parser`.
    #[must_use]
    pub fn new(parser: ResponseParser) -> Self {
        Self {
            parser,
            model_timeout: None,
            events: None,
        }
    }

    /// Bound every individual model call by `timeout` (builder).
    #[must_use]
    pub fn with_model_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.model_timeout = timeout;
        self
    }

    /// Publish mismatch and re-query events on `events` (builder).
    #[must_use]
    pub fn with_events(mut self, events: VerificationEventsSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Run one attempt for `plan` against both models.
    ///
    /// # Errors
    ///
    /// Returns an error if any model call fails or times out. Parse failures
    /// are not errors; they become zero-confidence candidates.
    pub async fn reconcile(
        &self,
        prompt: &str,
        primary: &dyn ModelClient,
        secondary: &dyn ModelClient,
        plan: &PlanDescriptor,
        ctx: &RequestContext,
    ) -> Result<Reconciliation> {
        let started = Instant::now();
        debug!(
            primary = primary.name(),
            secondary = secondary.name(),
            "Sending requests to both models"
        );

        let (primary_raw, secondary_raw) =
            tokio::join!(self.call(primary, prompt), self.call(secondary, prompt));
        let (primary_raw, secondary_raw) = (primary_raw?, secondary_raw?);

        debug!(
            duration_ms = %started.elapsed().as_millis(),
            "Received model responses"
        );

        let first = self.parser.parse(&primary_raw);
        let second = self.parser.parse(&secondary_raw);

        if prices_agree(&first, &second) {
            let chosen = if first.confidence_score >= second.confidence_score {
                first
            } else {
                second
            };
            return Ok(Reconciliation::Resolved(chosen));
        }

        info!(
            primary_price = ?first.current_price,
            secondary_price = ?second.current_price,
            primary_confidence = first.confidence_score,
            secondary_confidence = second.confidence_score,
            "Price mismatch between models"
        );
        self.emit(VerificationEvent::PriceMismatch {
            correlation_id: ctx.correlation_id.clone(),
            primary_price: first.current_price,
            secondary_price: second.current_price,
            primary_confidence: first.confidence_score,
            secondary_confidence: second.confidence_score,
        });

        let role = match less_confident(&first, &second)
            .or_else(|| off_advertised_price(&first, &second, plan.price))
        {
            Some(role) => role,
            None => {
                warn!(
                    confidence_score = first.confidence_score,
                    "Equal confidence scores with unclear match quality - restarting attempt"
                );
                return Ok(Reconciliation::NeedsFullRetry {
                    confidence_score: first.confidence_score,
                });
            }
        };

        debug!(%role, "Re-querying model");
        self.emit(VerificationEvent::ModelRequeried {
            correlation_id: ctx.correlation_id.clone(),
            role,
        });

        let model = match role {
            ModelRole::Primary => primary,
            ModelRole::Secondary => secondary,
        };
        let retried = self.parser.parse(&self.call(model, prompt).await?);

        Ok(Reconciliation::Resolved(most_confident([
            first, second, retried,
        ])))
    }

    async fn call(&self, model: &dyn ModelClient, prompt: &str) -> Result<String> {
        match self.model_timeout {
            Some(limit) => tokio::time::timeout(limit, model.generate(prompt))
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => model.generate(prompt).await,
        }
    }

    fn emit(&self, event: VerificationEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

#[allow(clippy::float_cmp)]
fn prices_agree(first: &VerificationRecord, second: &VerificationRecord) -> bool {
    first.current_price == second.current_price
}

/// The model whose confidence is strictly lower, if any.
#[allow(clippy::float_cmp)]
fn less_confident(first: &VerificationRecord, second: &VerificationRecord) -> Option<ModelRole> {
    if first.confidence_score == second.confidence_score {
        None
    } else if first.confidence_score > second.confidence_score {
        Some(ModelRole::Secondary)
    } else {
        Some(ModelRole::Primary)
    }
}

/// The model that missed the advertised price when exactly one of them hit it.
#[allow(clippy::float_cmp)]
fn off_advertised_price(
    first: &VerificationRecord,
    second: &VerificationRecord,
    advertised: Option<f64>,
) -> Option<ModelRole> {
    let advertised = advertised?;
    let first_matches = first.current_price == Some(advertised);
    let second_matches = second.current_price == Some(advertised);
    match (first_matches, second_matches) {
        (true, false) => Some(ModelRole::Secondary),
        (false, true) => Some(ModelRole::Primary),
        _ => None,
    }
}

/// Highest confidence wins; the earliest candidate wins ties.
fn most_confident(candidates: [VerificationRecord; 3]) -> VerificationRecord {
    let [first, rest @ ..] = candidates;
    rest.into_iter().fold(first, |best, candidate| {
        if candidate.confidence_score > best.confidence_score {
            candidate
        } else {
            best
        }
    })
}
