//! Verification input and output types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Confidence at or above which a model's `verified` claim is accepted.
pub const CONFIDENCE_THRESHOLD: f64 = 0.8;

/// The plan a caller expects to find on the provider's page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDescriptor {
    /// Plan name as the provider lists it.
    pub providers_plan_name: String,
    /// Advertised download speed in Mbps.
    pub download_speed: u32,
    /// Advertised upload speed in Mbps.
    pub upload_speed: u32,
    /// Advertised monthly price, when known.
    #[serde(default)]
    pub price: Option<f64>,
}

impl PlanDescriptor {
    /// Create a plan descriptor.
    pub fn new(
        providers_plan_name: impl Into<String>,
        download_speed: u32,
        upload_speed: u32,
        price: Option<f64>,
    ) -> Self {
        Self {
            providers_plan_name: providers_plan_name.into(),
            download_speed,
            upload_speed,
            price,
        }
    }
}

/// Failure categories carried by a [`VerificationRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    /// Model output was not valid JSON.
    InvalidJson,
    /// Required response fields were missing.
    ValidationError,
    /// Unexpected failure while interpreting the response.
    ProcessingError,
    /// A verified claim fell below the confidence threshold and was demoted.
    LowConfidence,
    /// The retry budget was exhausted.
    VerificationFailed,
}

impl ErrorType {
    /// Wire name, e.g. `INVALID_JSON`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidJson => "INVALID_JSON",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::ProcessingError => "PROCESSING_ERROR",
            Self::LowConfidence => "LOW_CONFIDENCE",
            Self::VerificationFailed => "VERIFICATION_FAILED",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model-reported match criteria.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchDetails {
    /// Whether the download speed matched the target exactly.
    #[serde(default)]
    pub speed_match: bool,
    /// Any further criteria the model reported.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Outcome of verifying one plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRecord {
    /// Whether the advertised plan was confirmed.
    pub verified: bool,
    /// Model confidence in `[0.0, 1.0]`.
    pub confidence_score: f64,
    /// Price found on the page.
    pub current_price: Option<f64>,
    /// Cleaned promotion text.
    pub promo_details: Option<String>,
    /// Cleaned plan details.
    pub plan_details: Option<String>,
    /// When this record was produced.
    pub verification_date: DateTime<Utc>,
    /// Failure description.
    pub error: Option<String>,
    /// Failure category.
    pub error_type: Option<ErrorType>,
    /// Match criteria reported by the model.
    pub match_details: MatchDetails,
}

impl VerificationRecord {
    /// A failed record: unverified, zero confidence, no price.
    pub fn failure(error_type: ErrorType, error: impl Into<String>) -> Self {
        Self {
            verified: false,
            confidence_score: 0.0,
            current_price: None,
            promo_details: None,
            plan_details: None,
            verification_date: Utc::now(),
            error: Some(error.into()),
            error_type: Some(error_type),
            match_details: MatchDetails::default(),
        }
    }

    /// Whether this record may be stored in the result cache.
    ///
    /// Strictly above the threshold: a record at exactly 0.8 is returned but
    /// never cached.
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        self.verified && self.confidence_score > CONFIDENCE_THRESHOLD
    }
}

/// Per-call identity used only for traceability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Fresh identifier for this call.
    pub request_id: String,
    /// Caller-supplied correlation identifier, or `request_id`.
    pub correlation_id: String,
}

impl RequestContext {
    /// Create a context with a fresh request id.
    ///
    /// A missing or empty `correlation_id` falls back to the request id.
    #[must_use]
    pub fn new(correlation_id: Option<&str>) -> Self {
        let request_id = Uuid::new_v4().to_string();
        let correlation_id = correlation_id
            .filter(|c| !c.is_empty())
            .map_or_else(|| request_id.clone(), str::to_string);
        Self {
            request_id,
            correlation_id,
        }
    }
}
