//! # price-verifier
//!
//! Verifies advertised internet plan prices by asking two independently
//! configured language models to read a provider's page, then reconciling
//! their answers into a single [`VerificationRecord`].
//!
//! ## Overview
//!
//! ```text
//! verify_price()
//!      │
//!      ▼
//! ┌─────────────┐  hit
//! │ ResultCache ├──────────────► cached record
//! └──────┬──────┘
//!        │ miss
//!        ▼
//! ┌─────────────────────┐
//! │ ReconciliationEngine│  primary ║ secondary (concurrent)
//! └──────┬──────────────┘
//!        │ Resolved / NeedsFullRetry / Err
//!        ▼
//! ┌─────────────┐
//! │ RetryScheduler │ backoff, bounded by retry_count
//! └──────┬──────┘
//!        ▼
//!  record (cached when verified && confidence > 0.8)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use price_verifier::{PlanDescriptor, PriceVerifier, VerifierConfig};
//!
//! let verifier = PriceVerifier::from_config(&VerifierConfig::default(), api_key)?;
//! let plan = PlanDescriptor::new("NBN 100/20", 100, 20, Some(89.0));
//! let record = verifier.verify("https://provider.example/nbn", &plan).await;
//! println!("verified={} price={:?}", record.verified, record.current_price);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod event;
pub mod model;
pub mod prompt;
pub mod verification;

pub use config::VerifierConfig;
pub use error::{Error, Result};
pub use event::{VerificationEvent, VerificationEventsChannel, VerificationEventsSender};
pub use model::{GeminiClient, ModelClient, ModelRole, ScriptedModel};
pub use verification::{
    CacheKey, ErrorType, PlanDescriptor, PriceVerifier, ReconciliationEngine, RequestContext,
    ResponseParser, ResultCache, RetryScheduler, VerificationRecord,
};
