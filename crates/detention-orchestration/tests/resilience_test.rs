//! Retry, version conflicts, circuit breakers and credential handling as seen
//! from a batch run.

use rust_decimal::Decimal;

use detention_orchestration::testing::fixtures::{scenario_rules, test_config};
use detention_orchestration::testing::TestHarness;
use detention_shared::config::CircuitBreakerComponentConfig;
use detention_shared::models::ReportStatus;
use detention_shared::DetentionError;

const SHIPPER: &str = "ACME Foods";

#[tokio::test]
async fn test_version_conflict_refetches_once() -> anyhow::Result<()> {
    let harness = TestHarness::new(test_config(), [scenario_rules(SHIPPER)])?;
    harness.add_late_order("ORD-1", SHIPPER, 95);
    harness.backend.edit_concurrently_before_next_write();

    let summary = harness
        .context
        .batch_orchestrator()
        .start(vec!["ORD-1".to_string()])
        .await?;

    assert_eq!(summary.report[0].action, "Charge Created");
    // Rejected append, retried append, comment
    assert_eq!(harness.backend.write_calls(), 3);
    assert_eq!(harness.backend.snapshot_calls(), 2);

    let order = harness
        .backend
        .order("ORD-1")
        .ok_or_else(|| anyhow::anyhow!("order vanished"))?;
    let charges: Vec<Decimal> = order
        .pricing_lines
        .iter()
        .filter(|line| line.charge_code == "DETENTION")
        .map(|line| line.amount)
        .collect();
    assert_eq!(charges, vec![Decimal::new(70, 0)]);
    Ok(())
}

#[tokio::test]
async fn test_transient_network_errors_are_retried() -> anyhow::Result<()> {
    let harness = TestHarness::new(test_config(), [scenario_rules(SHIPPER)])?;
    harness.add_late_order("ORD-1", SHIPPER, 95);
    harness
        .backend
        .fail_facts(2, DetentionError::network("order_facts", "connection reset"));

    let summary = harness
        .context
        .batch_orchestrator()
        .start(vec!["ORD-1".to_string()])
        .await?;

    assert_eq!(harness.backend.facts_calls(), 3);
    assert_eq!(summary.report[0].status, ReportStatus::Success);
    Ok(())
}

#[tokio::test]
async fn test_exhausted_retries_yield_failure_entry() -> anyhow::Result<()> {
    let harness = TestHarness::new(test_config(), [scenario_rules(SHIPPER)])?;
    harness.add_late_order("ORD-1", SHIPPER, 95);
    harness
        .backend
        .fail_facts(3, DetentionError::timeout("order_facts"));

    let summary = harness
        .context
        .batch_orchestrator()
        .start(vec!["ORD-1".to_string()])
        .await?;

    let entry = &summary.report[0];
    assert_eq!(entry.status, ReportStatus::Failed);
    assert!(entry.notes.contains("Timeout"));
    assert_eq!(summary.counts.failed, 1);
    Ok(())
}

#[tokio::test]
async fn test_open_breaker_short_circuits_remaining_orders() -> anyhow::Result<()> {
    let mut config = test_config();
    config.batch.parallel_group_size = 1;
    config.circuit_breakers.component_configs.order_facts = Some(CircuitBreakerComponentConfig {
        failure_threshold: 2,
        success_threshold: 1,
    });
    let harness = TestHarness::new(config, [scenario_rules(SHIPPER)])?;
    for id in ["ORD-1", "ORD-2", "ORD-3"] {
        harness.add_late_order(id, SHIPPER, 95);
    }
    harness
        .backend
        .fail_facts(100, DetentionError::network("order_facts", "connection refused"));

    let summary = harness
        .context
        .batch_orchestrator()
        .start(vec!["ORD-1".into(), "ORD-2".into(), "ORD-3".into()])
        .await?;

    // Two real attempts trip the breaker; everything after is rejected locally
    assert_eq!(harness.backend.facts_calls(), 2);
    assert_eq!(summary.counts.failed, 3);
    assert!(summary.report[2].notes.contains("Circuit breaker open"));
    assert!(!harness.context.breakers.all_healthy());
    Ok(())
}

#[tokio::test]
async fn test_auth_rejection_invalidates_credential_without_retry() -> anyhow::Result<()> {
    let harness = TestHarness::new(test_config(), [scenario_rules(SHIPPER)])?;
    harness.add_late_order("ORD-1", SHIPPER, 95);
    harness
        .backend
        .fail_next_write(DetentionError::Authentication("session expired".into()));

    let summary = harness
        .context
        .batch_orchestrator()
        .start(vec!["ORD-1".to_string()])
        .await?;

    assert_eq!(summary.report[0].status, ReportStatus::Failed);
    assert_eq!(harness.backend.write_calls(), 1);
    assert!(harness.context.credentials.current_token().is_none());
    Ok(())
}

#[tokio::test]
async fn test_credential_refreshed_once_for_whole_run() -> anyhow::Result<()> {
    let harness = TestHarness::new(test_config(), [scenario_rules(SHIPPER)])?;
    let ids: Vec<String> = (1..=25).map(|i| format!("ORD-{i}")).collect();
    for id in &ids {
        harness.add_late_order(id, SHIPPER, 95);
    }

    harness.context.batch_orchestrator().start(ids).await?;

    assert_eq!(harness.credentials.refresh_calls(), 1);
    assert!(harness
        .backend
        .tokens_seen()
        .iter()
        .all(|token| token == "token-1"));
    Ok(())
}
