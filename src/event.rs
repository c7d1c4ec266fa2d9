//! Verification event system.

use crate::model::ModelRole;
use tokio::sync::broadcast;

/// Events emitted while verifying a plan price.
///
/// Every event carries the `correlation_id` of the call that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationEvent {
    /// A fresh cached record answered the call.
    CacheHit {
        /// Correlation identifier.
        correlation_id: String,
        /// Cache key that hit.
        cache_key: String,
    },

    /// No usable cache entry; the models will be queried.
    CacheMiss {
        /// Correlation identifier.
        correlation_id: String,
        /// Cache key that missed.
        cache_key: String,
    },

    /// A stale entry was evicted during lookup.
    CacheExpired {
        /// Correlation identifier.
        correlation_id: String,
        /// Cache key that expired.
        cache_key: String,
    },

    /// A qualifying record was written to the cache.
    CacheStored {
        /// Correlation identifier.
        correlation_id: String,
        /// Cache key written.
        cache_key: String,
    },

    /// The two models reported different prices.
    PriceMismatch {
        /// Correlation identifier.
        correlation_id: String,
        /// Price reported by the primary model.
        primary_price: Option<f64>,
        /// Price reported by the secondary model.
        secondary_price: Option<f64>,
        /// Primary model confidence.
        primary_confidence: f64,
        /// Secondary model confidence.
        secondary_confidence: f64,
    },

    /// One model was asked again to break a disagreement.
    ModelRequeried {
        /// Correlation identifier.
        correlation_id: String,
        /// Which model was re-queried.
        role: ModelRole,
    },

    /// An attempt failed and will count against the retry budget.
    AttemptFailed {
        /// Correlation identifier.
        correlation_id: String,
        /// 1-based attempt number.
        attempt: u32,
        /// Failure description.
        error: String,
    },

    /// An attempt produced a final record.
    Verified {
        /// Correlation identifier.
        correlation_id: String,
        /// Whether the record is verified.
        verified: bool,
        /// Confidence of the selected record.
        confidence_score: f64,
    },

    /// The retry budget ran out.
    Failed {
        /// Correlation identifier.
        correlation_id: String,
        /// Attempts made.
        attempts: u32,
    },
}

impl VerificationEvent {
    /// Correlation identifier of the call that emitted this event.
    #[must_use]
    pub fn correlation_id(&self) -> &str {
        match self {
            Self::CacheHit { correlation_id, .. }
            | Self::CacheMiss { correlation_id, .. }
            | Self::CacheExpired { correlation_id, .. }
            | Self::CacheStored { correlation_id, .. }
            | Self::PriceMismatch { correlation_id, .. }
            | Self::ModelRequeried { correlation_id, .. }
            | Self::AttemptFailed { correlation_id, .. }
            | Self::Verified { correlation_id, .. }
            | Self::Failed { correlation_id, .. } => correlation_id,
        }
    }
}

/// Channel for receiving verification events.
pub type VerificationEventsChannel = broadcast::Receiver<VerificationEvent>;

/// Sender for verification events.
pub type VerificationEventsSender = broadcast::Sender<VerificationEvent>;

/// Create a new event channel pair.
#[must_use]
pub fn create_event_channel() -> (VerificationEventsSender, VerificationEventsChannel) {
    broadcast::channel(256)
}
