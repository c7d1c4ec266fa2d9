//! End-to-end verification flows.

use super::harness::{drain, reply, unverified_reply, TestHarness, PROVIDER_URL};
use futures::future::join_all;
use price_verifier::config::VerifierConfig;
use price_verifier::{ErrorType, ModelRole, PlanDescriptor, ResultCache, ScriptedModel, VerificationEvent};
use std::time::Duration;
use tokio::time::Instant;

// =============================================================================
// Agreement
// =============================================================================

#[tokio::test]
async fn test_agreement_selects_most_confident() {
    let harness = TestHarness::new(
        ScriptedModel::always("primary", reply(89.0, 0.85)),
        ScriptedModel::always("secondary", reply(89.0, 0.9)),
    );

    let record = harness.verify(Some(89.0), 2).await;

    assert!(record.verified);
    assert_eq!(record.current_price, Some(89.0));
    assert_eq!(record.confidence_score, 0.9);
    assert_eq!(record.error_type, None);
    assert!(record.match_details.speed_match);
    assert_eq!(record.plan_details.as_deref(), Some("NBN 100/20 - unlimited!"));
    assert_eq!(record.promo_details, None);
    assert_eq!(harness.total_calls(), 2);
}

#[tokio::test]
async fn test_both_models_receive_same_prompt() {
    let harness = TestHarness::new(
        ScriptedModel::always("primary", reply(89.0, 0.9)),
        ScriptedModel::always("secondary", reply(89.0, 0.9)),
    );

    harness.verify(Some(89.0), 2).await;

    let prompts = harness.primary.prompts();
    assert_eq!(prompts, harness.secondary.prompts());
    assert!(prompts[0].contains(PROVIDER_URL));
    assert!(prompts[0].contains("100Mbps"));
}

// =============================================================================
// Disagreement
// =============================================================================

#[tokio::test]
async fn test_disagreement_requeries_less_confident_model() {
    let harness = TestHarness::new(
        ScriptedModel::new("primary")
            .reply(reply(89.0, 0.7))
            .reply(reply(95.0, 0.95)),
        ScriptedModel::always("secondary", reply(95.0, 0.9)),
    );
    let mut events = harness.events();

    let record = harness.verify(Some(89.0), 2).await;

    assert_eq!(harness.primary.calls(), 2);
    assert_eq!(harness.secondary.calls(), 1);
    assert_eq!(record.current_price, Some(95.0));
    assert_eq!(record.confidence_score, 0.95);

    let seen = drain(&mut events);
    assert!(seen.iter().any(|e| matches!(
        e,
        VerificationEvent::PriceMismatch {
            primary_price: Some(p),
            secondary_price: Some(s),
            ..
        } if *p == 89.0 && *s == 95.0
    )));
    assert!(seen.iter().any(|e| matches!(
        e,
        VerificationEvent::ModelRequeried { role: ModelRole::Primary, .. }
    )));
}

#[tokio::test]
async fn test_disagreement_keeps_original_when_requery_is_weaker() {
    let harness = TestHarness::new(
        ScriptedModel::always("primary", reply(89.0, 0.7)),
        ScriptedModel::always("secondary", reply(95.0, 0.9)),
    );

    let record = harness.verify(Some(89.0), 2).await;

    assert_eq!(record.current_price, Some(95.0));
    assert_eq!(record.confidence_score, 0.9);
    assert_eq!(harness.total_calls(), 3);
}

#[tokio::test]
async fn test_equal_confidence_requeries_model_off_advertised_price() {
    let harness = TestHarness::new(
        ScriptedModel::always("primary", reply(89.0, 0.85)),
        ScriptedModel::new("secondary")
            .reply(reply(95.0, 0.85))
            .reply(reply(89.0, 0.92)),
    );

    let record = harness.verify(Some(89.0), 2).await;

    assert_eq!(harness.primary.calls(), 1);
    assert_eq!(harness.secondary.calls(), 2);
    assert_eq!(record.current_price, Some(89.0));
    assert_eq!(record.confidence_score, 0.92);
}

#[tokio::test(start_paused = true)]
async fn test_unresolvable_tie_consumes_one_attempt() {
    let harness = TestHarness::new(
        ScriptedModel::new("primary")
            .reply(reply(90.0, 0.85))
            .reply(reply(89.0, 0.9)),
        ScriptedModel::new("secondary")
            .reply(reply(95.0, 0.85))
            .reply(reply(89.0, 0.9)),
    );
    let mut events = harness.events();
    let started = Instant::now();

    let record = harness.verify(Some(89.0), 2).await;

    assert!(record.verified);
    assert_eq!(record.current_price, Some(89.0));
    assert_eq!(harness.primary.calls(), 2);
    assert_eq!(harness.secondary.calls(), 2);
    assert!(started.elapsed() >= Duration::from_secs(60));

    let failed: Vec<_> = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, VerificationEvent::AttemptFailed { .. }))
        .collect();
    assert_eq!(failed.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unresolvable_tie_without_advertised_price_fails() {
    let harness = TestHarness::new(
        ScriptedModel::always("primary", reply(89.0, 0.85)),
        ScriptedModel::always("secondary", reply(95.0, 0.85)),
    );

    let record = harness.verify(None, 1).await;

    assert!(!record.verified);
    assert_eq!(record.error_type, Some(ErrorType::VerificationFailed));
    assert!(record.error.as_deref().is_some_and(|e| e.contains("Equal confidence")));
    assert_eq!(harness.total_calls(), 2);
}

// =============================================================================
// Retries
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_retry_exhaustion() {
    let harness = TestHarness::new(
        ScriptedModel::new("primary").fail("connection refused"),
        ScriptedModel::always("secondary", reply(89.0, 0.9)),
    );
    let mut events = harness.events();
    let started = Instant::now();

    let record = harness.verify(Some(89.0), 2).await;

    assert!(!record.verified);
    assert_eq!(record.error_type, Some(ErrorType::VerificationFailed));
    assert_eq!(record.confidence_score, 0.0);
    assert!(record
        .error
        .as_deref()
        .is_some_and(|e| e.contains("connection refused")));
    assert_eq!(harness.primary.calls(), 2);

    // 60s after the first failure, 120s after the second.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(180) && elapsed < Duration::from_secs(181));

    let seen = drain(&mut events);
    let attempts: Vec<u32> = seen
        .iter()
        .filter_map(|e| match e {
            VerificationEvent::AttemptFailed { attempt, .. } => Some(*attempt),
            _ => None,
        })
        .collect();
    assert_eq!(attempts, vec![1, 2]);
    assert!(matches!(
        seen.last(),
        Some(VerificationEvent::Failed { attempts: 2, .. })
    ));
    assert!(harness.verifier.cache().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_model_timeout_counts_as_failed_attempt() {
    let config = VerifierConfig {
        model_timeout_secs: Some(5),
        ..VerifierConfig::default()
    };
    let harness = TestHarness::with_config(
        ScriptedModel::always("primary", reply(89.0, 0.9)).with_latency(Duration::from_secs(10)),
        ScriptedModel::always("secondary", reply(89.0, 0.9)),
        &config,
    );

    let record = harness.verify(Some(89.0), 1).await;

    assert_eq!(record.error_type, Some(ErrorType::VerificationFailed));
    assert!(record.error.as_deref().is_some_and(|e| e.contains("timed out")));
}

// =============================================================================
// Parsing through the full flow
// =============================================================================

#[tokio::test]
async fn test_malformed_json_is_returned_not_retried() {
    let harness = TestHarness::new(
        ScriptedModel::always("primary", "not json"),
        ScriptedModel::always("secondary", "not json"),
    );

    let record = harness.verify(Some(89.0), 2).await;

    assert!(!record.verified);
    assert_eq!(record.error_type, Some(ErrorType::InvalidJson));
    assert_eq!(harness.total_calls(), 2);
    assert!(harness.verifier.cache().is_empty());
}

#[tokio::test]
async fn test_low_confidence_is_demoted() {
    let harness = TestHarness::new(
        ScriptedModel::always("primary", reply(89.0, 0.5)),
        ScriptedModel::always("secondary", reply(89.0, 0.6)),
    );

    let record = harness.verify(Some(89.0), 2).await;

    assert!(!record.verified);
    assert_eq!(record.confidence_score, 0.6);
    assert_eq!(record.error_type, Some(ErrorType::LowConfidence));
    assert_eq!(record.error.as_deref(), Some("Confidence score below threshold"));
}

#[tokio::test]
async fn test_unverified_answer_is_not_cached() {
    let harness = TestHarness::new(
        ScriptedModel::always("primary", unverified_reply(0.9)),
        ScriptedModel::always("secondary", unverified_reply(0.9)),
    );

    let record = harness.verify(Some(89.0), 2).await;

    assert!(!record.verified);
    assert_eq!(record.current_price, None);
    assert_eq!(record.error_type, None);
    assert!(harness.verifier.cache().is_empty());
}

// =============================================================================
// Cache
// =============================================================================

#[tokio::test]
async fn test_cache_hit_skips_models() {
    let harness = TestHarness::new(
        ScriptedModel::always("primary", reply(89.0, 0.95)),
        ScriptedModel::always("secondary", reply(89.0, 0.9)),
    );

    let first = harness.verify(Some(89.0), 2).await;
    let mut events = harness.events();
    let second = harness.verify(Some(89.0), 2).await;

    assert_eq!(first, second);
    assert_eq!(harness.total_calls(), 2);
    assert!(matches!(
        drain(&mut events).as_slice(),
        [VerificationEvent::CacheHit { .. }]
    ));
    assert_eq!(harness.verifier.cache().stats().hits, 1);
}

#[tokio::test]
async fn test_boundary_confidence_is_not_cached() {
    let harness = TestHarness::new(
        ScriptedModel::always("primary", reply(89.0, 0.8)),
        ScriptedModel::always("secondary", reply(89.0, 0.8)),
    );

    let record = harness.verify(Some(89.0), 2).await;
    assert!(record.verified);
    assert_eq!(record.confidence_score, 0.8);

    harness.verify(Some(89.0), 2).await;
    assert_eq!(harness.total_calls(), 4);
    assert!(harness.verifier.cache().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cache_entry_expires() {
    let config = VerifierConfig {
        cache_timeout_secs: 60,
        ..VerifierConfig::default()
    };
    let harness = TestHarness::with_config(
        ScriptedModel::always("primary", reply(89.0, 0.95)),
        ScriptedModel::always("secondary", reply(89.0, 0.9)),
        &config,
    );

    harness.verify(Some(89.0), 2).await;
    tokio::time::advance(Duration::from_secs(59)).await;
    harness.verify(Some(89.0), 2).await;
    assert_eq!(harness.total_calls(), 2);

    tokio::time::advance(Duration::from_secs(1)).await;
    let mut events = harness.events();
    harness.verify(Some(89.0), 2).await;
    assert_eq!(harness.total_calls(), 4);

    let seen = drain(&mut events);
    assert!(matches!(seen[0], VerificationEvent::CacheExpired { .. }));
    assert!(matches!(seen[1], VerificationEvent::CacheMiss { .. }));
    assert_eq!(harness.verifier.cache().stats().expirations, 1);
}

#[tokio::test]
async fn test_shared_cache_between_verifiers() {
    let cache = ResultCache::new();
    let first = TestHarness::with_cache(
        ScriptedModel::always("primary", reply(89.0, 0.95)),
        ScriptedModel::always("secondary", reply(89.0, 0.9)),
        cache.clone(),
    );
    let second = TestHarness::with_cache(
        ScriptedModel::always("primary", reply(1.0, 0.99)),
        ScriptedModel::always("secondary", reply(1.0, 0.99)),
        cache,
    );

    first.verify(Some(89.0), 2).await;
    let record = second.verify(Some(89.0), 2).await;

    assert_eq!(record.current_price, Some(89.0));
    assert_eq!(second.total_calls(), 0);
}

#[tokio::test]
async fn test_cache_key_ignores_advertised_price() {
    let harness = TestHarness::new(
        ScriptedModel::always("primary", reply(89.0, 0.95)),
        ScriptedModel::always("secondary", reply(89.0, 0.9)),
    );

    harness.verify(Some(89.0), 2).await;
    harness.verify(Some(59.0), 2).await;

    assert_eq!(harness.total_calls(), 2);
}

// =============================================================================
// Concurrency and identity
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_concurrent_verifications_for_different_plans() {
    let harness = TestHarness::new(
        ScriptedModel::always("primary", reply(89.0, 0.95)).with_latency(Duration::from_secs(1)),
        ScriptedModel::always("secondary", reply(89.0, 0.9)).with_latency(Duration::from_secs(1)),
    );
    let plans: Vec<PlanDescriptor> = [(25, 5), (50, 20), (100, 20)]
        .into_iter()
        .map(|(down, up)| PlanDescriptor::new(format!("NBN {down}/{up}"), down, up, Some(89.0)))
        .collect();
    let started = Instant::now();

    let records = join_all(
        plans
            .iter()
            .map(|plan| harness.verifier.verify_price(PROVIDER_URL, plan, 2, None)),
    )
    .await;

    assert!(records.iter().all(|r| r.verified));
    assert_eq!(harness.total_calls(), 6);
    assert_eq!(harness.verifier.cache().len(), 3);
    assert!(started.elapsed() < Duration::from_secs(2));

    let prompts = harness.primary.prompts();
    for speed in ["25Mbps", "50Mbps", "100Mbps"] {
        assert!(prompts.iter().any(|p| p.contains(speed)));
    }
}

#[tokio::test]
async fn test_spawned_verifications_share_cache() {
    let harness = TestHarness::new(
        ScriptedModel::always("primary", reply(89.0, 0.95)),
        ScriptedModel::always("secondary", reply(89.0, 0.9)),
    );

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let verifier = harness.verifier.clone();
            tokio::spawn(async move {
                let plan = PlanDescriptor::new(format!("plan-{i}"), 100, 20, Some(89.0));
                verifier.verify_price(PROVIDER_URL, &plan, 2, None).await
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.expect("task panicked").verified);
    }
    assert_eq!(harness.verifier.cache().len(), 4);
}

#[tokio::test]
async fn test_correlation_id_on_every_event() {
    let harness = TestHarness::new(
        ScriptedModel::always("primary", reply(89.0, 0.7)),
        ScriptedModel::always("secondary", reply(95.0, 0.9)),
    );
    let mut events = harness.events();

    harness
        .verifier
        .verify_price(PROVIDER_URL, &TestHarness::plan(Some(89.0)), 2, Some("audit-7"))
        .await;

    let seen = drain(&mut events);
    assert!(seen.len() >= 4);
    assert!(seen.iter().all(|e| e.correlation_id() == "audit-7"));
}

#[tokio::test]
async fn test_default_correlation_id_is_generated_per_call() {
    let harness = TestHarness::new(
        ScriptedModel::always("primary", "not json"),
        ScriptedModel::always("secondary", "not json"),
    );
    let mut events = harness.events();

    harness.verify(Some(89.0), 2).await;
    harness.verify(Some(89.0), 2).await;

    let ids: Vec<String> = drain(&mut events)
        .iter()
        .filter(|e| matches!(e, VerificationEvent::CacheMiss { .. }))
        .map(|e| e.correlation_id().to_string())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(!ids[0].is_empty());
    assert_ne!(ids[0], ids[1]);
}

#[tokio::test]
async fn test_empty_correlation_id_falls_back_to_request_id() {
    let harness = TestHarness::new(
        ScriptedModel::always("primary", reply(89.0, 0.95)),
        ScriptedModel::always("secondary", reply(89.0, 0.9)),
    );
    let mut events = harness.events();

    harness
        .verifier
        .verify_price(PROVIDER_URL, &TestHarness::plan(Some(89.0)), 2, Some(""))
        .await;

    let seen = drain(&mut events);
    assert!(!seen.is_empty());
    assert!(seen.iter().all(|e| !e.correlation_id().is_empty()));
}
