//! End-to-end tests for the price verifier.
//!
//! Each test drives [`price_verifier::PriceVerifier`] through its public API
//! with scripted model doubles, so no network access is needed.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

mod verification_tests;
