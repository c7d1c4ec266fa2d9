//! Model response parsing and validation.
//!
//! [`ResponseParser::parse`] never fails: every problem becomes an
//! unverified [`VerificationRecord`] with `error_type` set and zero
//! confidence, which the reconciliation engine still treats as a candidate.

use super::record::{
    ErrorType, MatchDetails, VerificationRecord, CONFIDENCE_THRESHOLD,
};
use crate::config::PromoField;
use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

/// Maximum characters kept by [`clean_details`].
pub const MAX_DETAIL_CHARS: usize = 50;

/// Text returned by [`clean_details`] for absent or blank input.
pub const NO_DETAILS: &str = "No details available";

/// Fields a model response must carry.
const REQUIRED_FIELDS: [&str; 4] = ["price", "verified", "confidence", "match_criteria"];

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Why a response could not be turned into a record.
#[derive(Debug)]
enum ParseFailure {
    InvalidJson(String),
    Validation(String),
    Processing(String),
}

/// Parses raw model text into verification records.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseParser {
    promo_field: PromoField,
}

impl ResponseParser {
    /// Create a parser that fills `promo_details` from `promo_field`.
    #[must_use]
    pub fn new(promo_field: PromoField) -> Self {
        Self { promo_field }
    }

    /// Parse raw model output.
    #[must_use]
    pub fn parse(&self, raw: &str) -> VerificationRecord {
        debug!(
            raw_length = raw.len(),
            contains_markdown = raw.contains(JSON_FENCE),
            "Parsing model response"
        );

        match self.try_parse(raw) {
            Ok(record) => {
                debug!(
                    verified = record.verified,
                    confidence_score = record.confidence_score,
                    "Response parsing complete"
                );
                record
            }
            Err(ParseFailure::InvalidJson(details)) => {
                error!(error_details = %details, "JSON parse error");
                VerificationRecord::failure(ErrorType::InvalidJson, "Failed to parse JSON response")
            }
            Err(ParseFailure::Validation(message)) => {
                error!(error_details = %message, "Validation error");
                VerificationRecord::failure(ErrorType::ValidationError, message)
            }
            Err(ParseFailure::Processing(details)) => {
                error!(error_details = %details, "Processing error");
                VerificationRecord::failure(
                    ErrorType::ProcessingError,
                    format!("Failed to process response: {details}"),
                )
            }
        }
    }

    fn try_parse(&self, raw: &str) -> Result<VerificationRecord, ParseFailure> {
        let text = extract_json(raw);
        let value: Value =
            serde_json::from_str(text).map_err(|e| ParseFailure::InvalidJson(e.to_string()))?;

        let Value::Object(data) = value else {
            return Err(ParseFailure::Processing(format!(
                "expected a JSON object, got {}",
                kind_of(&value)
            )));
        };

        let missing: Vec<&str> = REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|field| !data.contains_key(*field))
            .collect();
        if !missing.is_empty() {
            return Err(ParseFailure::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let current_price = match &data["price"] {
            Value::Null => None,
            other => Some(coerce_f64(other, "price")?),
        };
        let confidence_score = coerce_f64(&data["confidence"], "confidence")?;
        let verified = coerce_bool(&data["verified"], "verified")?;
        let match_details = match_details(&data["match_criteria"])?;

        let plan_details = Some(clean_details(text_of(data.get("plan_details")).as_deref()));
        let promo_details = match self.promo_field {
            PromoField::Promo => data
                .get(PromoField::Promo.key())
                .map(|v| clean_details(text_of(Some(v)).as_deref())),
            PromoField::PromotionDetails => Some(clean_details(
                text_of(data.get(PromoField::PromotionDetails.key())).as_deref(),
            )),
        };

        let mut record = VerificationRecord {
            verified,
            confidence_score,
            current_price,
            promo_details,
            plan_details,
            verification_date: Utc::now(),
            error: None,
            error_type: None,
            match_details,
        };

        if record.verified && record.confidence_score < CONFIDENCE_THRESHOLD {
            warn!(
                confidence_score = record.confidence_score,
                threshold = CONFIDENCE_THRESHOLD,
                "Confidence score below threshold"
            );
            record.verified = false;
            record.error_type = Some(ErrorType::LowConfidence);
            record.error = Some("Confidence score below threshold".to_string());
        }

        Ok(record)
    }
}

/// Pull the JSON payload out of raw model text.
///
/// Returns the content of the first ```` ```json ```` fence when present,
/// otherwise the whole text; surrounding whitespace is trimmed either way.
#[must_use]
pub fn extract_json(raw: &str) -> &str {
    match raw.find(JSON_FENCE) {
        Some(start) => {
            let body = &raw[start + JSON_FENCE.len()..];
            let end = body.find(FENCE).unwrap_or(body.len());
            body[..end].trim()
        }
        None => raw.trim(),
    }
}

/// Normalise free-text plan or promotion details.
///
/// Truncates to [`MAX_DETAIL_CHARS`] characters, collapses each run of
/// consecutive special characters (neither ASCII alphanumeric nor
/// whitespace) to its first character, then trims. Absent or blank input
/// yields [`NO_DETAILS`]. Applying it twice changes nothing.
#[must_use]
pub fn clean_details(input: Option<&str>) -> String {
    let mut cleaned = String::new();
    let mut previous_special = false;
    for c in input.unwrap_or_default().chars().take(MAX_DETAIL_CHARS) {
        let special = !(c.is_ascii_alphanumeric() || c.is_whitespace());
        if !(special && previous_special) {
            cleaned.push(c);
        }
        previous_special = special;
    }

    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        NO_DETAILS.to_string()
    } else {
        cleaned.to_string()
    }
}

fn text_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn coerce_f64(value: &Value, field: &str) -> Result<f64, ParseFailure> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(ParseFailure::Processing(format!(
            "could not convert {field} to float: {value}"
        ))),
    }
}

fn coerce_bool(value: &Value, field: &str) -> Result<bool, ParseFailure> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Null => Ok(false),
        Value::Number(n) => Ok(n.as_f64().is_some_and(|n| n != 0.0)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" | "" => Ok(false),
            _ => Err(ParseFailure::Processing(format!(
                "could not convert {field} to bool: {value}"
            ))),
        },
        _ => Err(ParseFailure::Processing(format!(
            "could not convert {field} to bool: {value}"
        ))),
    }
}

fn match_details(value: &Value) -> Result<MatchDetails, ParseFailure> {
    let Value::Object(criteria) = value else {
        return Err(ParseFailure::Processing(format!(
            "match_criteria must be an object, got {}",
            kind_of(value)
        )));
    };

    let speed_match = match criteria.get("speed_match") {
        Some(v) => coerce_bool(v, "speed_match")?,
        None => false,
    };
    let extra: Map<String, Value> = criteria
        .iter()
        .filter(|(key, _)| key.as_str() != "speed_match")
        .map(|(key, v)| (key.clone(), v.clone()))
        .collect();

    Ok(MatchDetails { speed_match, extra })
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
