//! Error types for price-verifier.
//!
//! These errors never reach callers of
//! [`PriceVerifier::verify_price`](crate::PriceVerifier::verify_price): the
//! orchestrator counts them against the retry budget and folds the final one
//! into the returned record.

use std::time::Duration;
use thiserror::Error;

/// Result type for price-verifier operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in price-verifier.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Model collaborator failed or returned an unusable payload.
    #[error("model error: {0}")]
    Model(String),

    /// HTTP transport error talking to a model endpoint.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A model call exceeded its deadline.
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
}
