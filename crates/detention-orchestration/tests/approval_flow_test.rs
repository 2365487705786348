//! Deferred approvals resolved after the last chunk.

use rust_decimal::Decimal;

use detention_orchestration::orchestration::approval::ApprovalDecision;
use detention_orchestration::testing::fixtures::{
    departed_late, hold_line, live_pickup_order, scenario_rules, test_config,
};
use detention_orchestration::testing::{ScriptedPresenter, ScriptedReply, TestHarness};
use detention_shared::models::{BillingRules, LoadType, ReportStatus, Stop, StopType};

const SHIPPER: &str = "ACME Foods";

fn approval_rules() -> BillingRules {
    let mut rules = scenario_rules(SHIPPER);
    rules.requires_approval = true;
    rules
}

fn detention_total(harness: &TestHarness, order_id: &str) -> Decimal {
    harness
        .backend
        .order(order_id)
        .map(|order| {
            order
                .pricing_lines
                .iter()
                .filter(|line| line.charge_code == "DETENTION")
                .map(|line| line.amount)
                .sum()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn test_approved_charge_carries_auth_code() -> anyhow::Result<()> {
    let harness = TestHarness::new(test_config(), [approval_rules()])?;
    harness.add_late_order("ORD-1", SHIPPER, 95);
    harness.presenter.push(ScriptedPresenter::approving(Some("AUTH-77")));

    let summary = harness
        .context
        .batch_orchestrator()
        .start(vec!["ORD-1".to_string()])
        .await?;

    let presented = harness.presenter.presented();
    assert_eq!(presented.len(), 1);
    assert_eq!(presented[0].total, Decimal::new(70, 0));
    assert_eq!(presented[0].lines.len(), 1);

    let entry = &summary.report[0];
    assert_eq!(entry.action, "Charge Created");
    assert_eq!(entry.status, ReportStatus::Success);
    assert!(entry.notes.contains("Auth #AUTH-77"));
    assert_eq!(summary.counts.approvals.approved, 1);
    assert_eq!(detention_total(&harness, "ORD-1"), Decimal::new(70, 0));

    let comments = harness.backend.comments();
    assert!(comments[0].1.contains("Auth #AUTH-77"));
    Ok(())
}

#[tokio::test]
async fn test_decline_releases_hold() -> anyhow::Result<()> {
    let harness = TestHarness::new(test_config(), [approval_rules()])?;
    harness.add_late_order_with_hold("ORD-2", SHIPPER, 95);
    harness
        .presenter
        .push(ScriptedReply::Decide(ApprovalDecision::Declined));

    let summary = harness
        .context
        .batch_orchestrator()
        .start(vec!["ORD-2".to_string()])
        .await?;

    let entry = &summary.report[0];
    assert_eq!(entry.action, "Declined, Hold Released");
    assert_eq!(entry.status, ReportStatus::Declined);
    assert_eq!(entry.amount, Some(Decimal::new(70, 0)));
    assert_eq!(summary.counts.approvals.declined, 1);
    assert_eq!(summary.counts.released, 1);

    let order = harness
        .backend
        .order("ORD-2")
        .ok_or_else(|| anyhow::anyhow!("order vanished"))?;
    assert!(order
        .pricing_lines
        .iter()
        .all(|line| line.charge_code != "DETENTION"));
    Ok(())
}

#[tokio::test]
async fn test_decline_without_hold_writes_nothing() -> anyhow::Result<()> {
    let harness = TestHarness::new(test_config(), [approval_rules()])?;
    harness.add_late_order("ORD-3", SHIPPER, 95);
    harness
        .presenter
        .push(ScriptedReply::Decide(ApprovalDecision::Declined));

    let summary = harness
        .context
        .batch_orchestrator()
        .start(vec!["ORD-3".to_string()])
        .await?;

    assert_eq!(summary.report[0].action, "Declined");
    assert_eq!(harness.backend.write_calls(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_approval_times_out() -> anyhow::Result<()> {
    let harness = TestHarness::new(test_config(), [approval_rules()])?;
    harness.add_late_order("ORD-4", SHIPPER, 95);
    harness.presenter.push(ScriptedReply::Ignore);

    let summary = harness
        .context
        .batch_orchestrator()
        .start(vec!["ORD-4".to_string()])
        .await?;

    let entry = &summary.report[0];
    assert_eq!(entry.status, ReportStatus::TimedOut);
    assert_eq!(entry.action, "Approval Timed Out");
    assert_eq!(entry.amount, Some(Decimal::new(70, 0)));
    assert_eq!(summary.counts.approvals.timed_out, 1);
    assert_eq!(harness.backend.write_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_missing_auth_code_is_reprompted() -> anyhow::Result<()> {
    let mut rules = approval_rules();
    rules.auth_number_required = true;
    let harness = TestHarness::new(test_config(), [rules])?;
    harness.add_late_order("ORD-5", SHIPPER, 95);
    harness.presenter.push(ScriptedPresenter::approving(None));
    harness.presenter.push(ScriptedPresenter::approving(Some("A-1")));

    let summary = harness
        .context
        .batch_orchestrator()
        .start(vec!["ORD-5".to_string()])
        .await?;

    assert_eq!(harness.presenter.presented().len(), 2);
    assert_eq!(harness.presenter.reprompt_reasons().len(), 1);
    assert!(summary.report[0].notes.contains("Auth #A-1"));
    assert_eq!(detention_total(&harness, "ORD-5"), Decimal::new(70, 0));
    Ok(())
}

#[tokio::test]
async fn test_approvals_wait_for_all_chunks() -> anyhow::Result<()> {
    let mut config = test_config();
    config.batch.chunk_size = 1;
    let mut plain = scenario_rules("Plain Co");
    plain.requires_approval = false;
    let harness = TestHarness::new(config, [approval_rules(), plain])?;
    harness.add_late_order("ORD-APPROVE", SHIPPER, 95);
    harness.add_late_order("ORD-AUTO", "Plain Co", 95);
    harness.presenter.push(ScriptedPresenter::approving(None));

    let summary = harness
        .context
        .batch_orchestrator()
        .start(vec!["ORD-APPROVE".to_string(), "ORD-AUTO".to_string()])
        .await?;

    let order: Vec<&str> = summary.report.iter().map(|e| e.order_id.as_str()).collect();
    assert_eq!(order, vec!["ORD-AUTO", "ORD-APPROVE"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_approval_reports_release_on_other_stop() -> anyhow::Result<()> {
    let harness = TestHarness::new(test_config(), [approval_rules()])?;

    // Stop 1 is chargeable and needs approval; stop 2 left within free time
    let mut facts = live_pickup_order("ORD-6", SHIPPER, "TOUR-ORD-6");
    facts.order.stops.push(Stop {
        stop_type: StopType::Delivery,
        load_type: LoadType::Live,
        location: Some("Store 12".to_string()),
    });
    facts.order.pricing_lines.push(hold_line("ORD-6", 1));
    harness.backend.insert(facts);
    let mut timestamps = departed_late("TOUR-ORD-6", 95);
    let within_free_time = departed_late("TOUR-ORD-6", 30).stops;
    timestamps.stops.extend(within_free_time);
    harness.timestamps.insert(timestamps);
    harness.presenter.push(ScriptedReply::Ignore);

    let summary = harness
        .context
        .batch_orchestrator()
        .start(vec!["ORD-6".to_string()])
        .await?;

    let entry = &summary.report[0];
    assert_eq!(entry.action, "Approval Timed Out, Hold Released");
    assert_eq!(entry.status, ReportStatus::TimedOut);
    assert_eq!(entry.amount, Some(Decimal::new(70, 0)));
    assert_eq!(summary.counts.released, 1);
    assert_eq!(detention_total(&harness, "ORD-6"), Decimal::ZERO);

    let order = harness
        .backend
        .order("ORD-6")
        .ok_or_else(|| anyhow::anyhow!("order vanished"))?;
    assert!(order
        .pricing_lines
        .iter()
        .all(|line| line.line_id != "ORD-6-HOLD-1"));
    Ok(())
}
