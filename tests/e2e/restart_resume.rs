//! A cancelled run picked up by a freshly built context, the way a restarted
//! process would find it on disk.

use std::sync::Arc;

use tempfile::TempDir;

use detention_core::orchestration::orchestration::checkpoint::{
    CheckpointStore, FileCheckpointStore,
};
use detention_core::BatchState;
use detention_orchestration::testing::fixtures::scenario_rules;

use crate::common::{file_backed_config, order_ids, World};

const SHIPPER: &str = "ACME Foods";

#[tokio::test]
async fn test_cancelled_run_resumes_after_restart() -> anyhow::Result<()> {
    let world = World::new([scenario_rules(SHIPPER)]);
    let ids = order_ids("ORD", 15);
    for id in &ids {
        world.add_late_order(id, SHIPPER, 95);
    }

    let checkpoints = TempDir::new()?;
    let mut config = file_backed_config(checkpoints.path());
    config.batch.chunk_size = 5;
    config.batch.inter_chunk_cooldown_ms = 60_000;
    let key = config.checkpoint.key.clone();

    // First process: one chunk, then the operator cancels during the cooldown
    let first = world.context(config.clone())?;
    let orchestrator = Arc::new(first.batch_orchestrator());
    let mut progress = orchestrator.subscribe_progress();
    let run = {
        let orchestrator = Arc::clone(&orchestrator);
        let ids = ids.clone();
        tokio::spawn(async move { orchestrator.start(ids).await })
    };
    progress.wait_for(|p| p.chunk_index >= 1).await?;
    assert!(orchestrator.cancel());
    let cancelled = run.await??;
    assert_eq!(cancelled.state, BatchState::Cancelled);
    assert_eq!(world.backend.facts_calls(), 5);

    let on_disk = FileCheckpointStore::new(checkpoints.path());
    assert!(on_disk.path_for(&key).exists());

    // Second process: same external systems, new context
    let second = world.context(config)?;
    let orchestrator = second.batch_orchestrator();
    let checkpoint = orchestrator
        .resume_candidate()
        .await?
        .ok_or_else(|| anyhow::anyhow!("cancelled run should be resumable"))?;
    assert_eq!(checkpoint.run_id, cancelled.run_id);
    assert_eq!(checkpoint.remaining().len(), 10);

    let resumed = orchestrator.resume_from(checkpoint).await?;
    assert_eq!(resumed.state, BatchState::Completed);
    assert_eq!(resumed.skipped_by_resume, 5);
    assert_eq!(resumed.counts.charged, 10);
    assert_eq!(resumed.report.len(), 15);
    assert_eq!(world.backend.facts_calls(), 15);
    assert!(on_disk.load(&key).await?.is_none());

    // Every order was charged exactly once across both processes
    for id in &ids {
        let order = world
            .backend
            .order(id)
            .ok_or_else(|| anyhow::anyhow!("{id} vanished"))?;
        let charges = order
            .pricing_lines
            .iter()
            .filter(|line| line.charge_code == "DETENTION")
            .count();
        assert_eq!(charges, 1, "{id}");
    }
    Ok(())
}

#[tokio::test]
async fn test_stale_checkpoint_is_discarded() -> anyhow::Result<()> {
    let world = World::new([scenario_rules(SHIPPER)]);
    let checkpoints = TempDir::new()?;
    let config = file_backed_config(checkpoints.path());
    let key = config.checkpoint.key.clone();

    let store = FileCheckpointStore::new(checkpoints.path());
    let mut stale = detention_core::orchestration::orchestration::checkpoint::BatchCheckpoint::new(
        uuid::Uuid::now_v7(),
        order_ids("OLD", 3),
    );
    stale.saved_at = chrono::Utc::now() - chrono::Duration::hours(25);
    store.save(&key, &stale).await?;

    let context = world.context(config)?;
    assert!(context.batch_orchestrator().resume_candidate().await?.is_none());
    assert!(!store.path_for(&key).exists());
    Ok(())
}
