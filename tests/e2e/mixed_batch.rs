//! One run mixing auto-charge, free-time, approval and missing-rules orders.

use rust_decimal::Decimal;
use tempfile::TempDir;

use detention_core::orchestration::orchestration::report::render_csv;
use detention_core::shared::models::ReportStatus;
use detention_core::BatchState;
use detention_orchestration::testing::fixtures::scenario_rules;
use detention_orchestration::testing::ScriptedPresenter;

use crate::common::{file_backed_config, World};

#[tokio::test]
async fn test_mixed_batch_settles_every_order() -> anyhow::Result<()> {
    let mut approval = scenario_rules("Initech");
    approval.requires_approval = true;
    approval.auth_number_required = true;
    let world = World::new([scenario_rules("ACME Foods"), approval]);

    world.add_late_order("ORD-CHARGE", "ACME Foods", 95);
    world.add_late_order("ORD-FREE", "ACME Foods", 30);
    world.add_late_order("ORD-APPROVE", "Initech", 95);
    world.add_late_order("ORD-NORULES", "Umbrella", 95);
    world
        .presenter
        .push(ScriptedPresenter::approving(Some("AUTH-9")));

    let checkpoints = TempDir::new()?;
    let config = file_backed_config(checkpoints.path());
    let key = config.checkpoint.key.clone();
    let context = world.context(config)?;

    let ids = ["ORD-CHARGE", "ORD-FREE", "ORD-APPROVE", "ORD-NORULES"]
        .map(String::from)
        .to_vec();
    let summary = context.batch_orchestrator().start(ids).await?;

    assert_eq!(summary.state, BatchState::Completed);
    assert_eq!(summary.total_requested, 4);
    assert_eq!(summary.counts.charged, 2);
    assert_eq!(summary.counts.failed, 1);
    assert_eq!(summary.counts.approvals.approved, 1);
    assert_eq!(summary.counts.total_charged, Decimal::new(140, 0));

    let actions: Vec<(&str, &str)> = summary
        .report
        .iter()
        .map(|entry| (entry.order_id.as_str(), entry.action.as_str()))
        .collect();
    assert_eq!(actions.len(), 4);
    // Approvals settle after every chunk has been processed
    assert_eq!(actions[3], ("ORD-APPROVE", "Charge Created"));
    assert!(actions.contains(&("ORD-CHARGE", "Charge Created")));
    assert!(actions.contains(&("ORD-FREE", "No Action")));
    assert!(actions.contains(&("ORD-NORULES", "Error")));

    let failed = summary
        .report
        .iter()
        .find(|entry| entry.status == ReportStatus::Failed)
        .ok_or_else(|| anyhow::anyhow!("expected a failure entry"))?;
    assert!(failed.notes.contains("Umbrella"));

    // Completed runs leave nothing to resume
    assert!(context.checkpoints.load(&key).await?.is_none());

    let csv = render_csv(&summary.report)?;
    assert_eq!(csv.lines().count(), 5);
    assert!(csv.contains("Auth #AUTH-9"));

    let text = summary.format_summary();
    assert!(text.contains("Total charged:     $140.00"));
    assert!(text.contains("1 approved"));
    Ok(())
}

#[tokio::test]
async fn test_config_file_drives_context() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("detention.toml");
    std::fs::write(
        &path,
        format!(
            "[batch]\nchunk_size = 2\ninter_chunk_cooldown_ms = 0\n\n[checkpoint]\ndirectory = {:?}\n",
            dir.path().join("checkpoints")
        ),
    )?;
    let config = detention_core::shared::ConfigManager::load_from_path(&path)?;
    assert_eq!(config.batch.chunk_size, 2);

    let world = World::new([scenario_rules("ACME Foods")]);
    for id in ["A-1", "A-2", "A-3"] {
        world.add_late_order(id, "ACME Foods", 95);
    }
    let context = world.context(config)?;
    let orchestrator = context.batch_orchestrator();
    let progress = orchestrator.subscribe_progress();

    let summary = orchestrator
        .start(vec!["A-1".into(), "A-2".into(), "A-3".into()])
        .await?;

    assert_eq!(summary.counts.charged, 3);
    assert_eq!(progress.borrow().total_chunks, 2);
    Ok(())
}
