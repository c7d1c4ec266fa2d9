//! Price verification for advertised internet plans.
//!
//! Each request asks two models to read the provider page, reconciles
//! their answers and retries with backoff when they cannot be reconciled.
//!
//! # Architecture
//!
//! ```text
//! verify_price(url, plan)
//!        │
//!        ▼
//! ┌─────────────────────┐
//! │ Check result cache  │
//! └─────────┬───────────┘
//!           │
//!    ┌──────┴──────┐
//!    │             │
//!   HIT          MISS / EXPIRED
//!    │             │
//!    ▼             ▼
//! Return       Query primary ║ secondary
//!                  │
//!           ┌──────┴──────┐
//!           │             │
//!        AGREE        DISAGREE
//!           │             │
//!           ▼             ▼
//!     Most confident   Re-query weaker model
//!           │             │
//!           │      ┌──────┴──────┐
//!           │      │             │
//!           │   RESOLVED    UNRESOLVABLE
//!           │      │             │
//!           ▼      ▼             ▼
//!     Cache if confident     Backoff + retry
//! ```

mod cache;
mod parser;
mod reconcile;
mod record;
mod retry;
mod verifier;

pub use cache::{CacheKey, CacheLookup, CacheStats, ResultCache, DEFAULT_CACHE_TIMEOUT};
pub use parser::{clean_details, extract_json, ResponseParser, MAX_DETAIL_CHARS, NO_DETAILS};
pub use reconcile::{Reconciliation, ReconciliationEngine};
pub use record::{
    ErrorType, MatchDetails, PlanDescriptor, RequestContext, VerificationRecord,
    CONFIDENCE_THRESHOLD,
};
pub use retry::RetryScheduler;
pub use verifier::PriceVerifier;
