//! `detention-ctl checkpoint show|clear`

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;

use detention_orchestration::orchestration::checkpoint::{
    BatchCheckpoint, CheckpointStore, FileCheckpointStore, CHECKPOINT_SCHEMA_VERSION,
};
use detention_shared::config::CheckpointConfig;

use crate::{load_config, output, CheckpointCommands, CheckpointLocation};

/// Store and key named by the flags, falling back to configuration
#[derive(Debug)]
pub(crate) struct ResolvedCheckpoint {
    pub store: FileCheckpointStore,
    pub key: String,
    pub settings: CheckpointConfig,
}

pub(crate) fn resolve(
    location: &CheckpointLocation,
    config_path: Option<&Path>,
) -> anyhow::Result<ResolvedCheckpoint> {
    let settings = load_config(config_path)?.checkpoint;
    let directory: PathBuf = location
        .dir
        .clone()
        .or_else(|| settings.directory.clone())
        .context("No checkpoint directory: pass --dir or set checkpoint.directory")?;
    let key = location.key.clone().unwrap_or_else(|| settings.key.clone());

    Ok(ResolvedCheckpoint {
        store: FileCheckpointStore::new(directory),
        key,
        settings,
    })
}

pub(crate) async fn load_required(resolved: &ResolvedCheckpoint) -> anyhow::Result<BatchCheckpoint> {
    resolved
        .store
        .load(&resolved.key)
        .await?
        .with_context(|| {
            format!(
                "No checkpoint at {}",
                resolved.store.path_for(&resolved.key).display()
            )
        })
}

fn show(checkpoint: &BatchCheckpoint, settings: &CheckpointConfig) {
    let remaining = checkpoint.remaining().len();
    let fresh = checkpoint.is_fresh(Utc::now(), settings.max_age());

    output::header(format!("Checkpoint for run {}", checkpoint.run_id));
    output::label("Saved at", checkpoint.saved_at.to_rfc3339());
    output::label("Chunks completed", checkpoint.chunk_index);
    output::label("Orders", checkpoint.order_ids.len());
    output::label("Processed", checkpoint.processed.len());
    output::label("Failed", checkpoint.failed.len());
    output::label("Remaining", remaining);
    output::label("Report entries", checkpoint.report.len());

    if checkpoint.schema_version != CHECKPOINT_SCHEMA_VERSION {
        output::warning(format!(
            "Schema version {} does not match {}; a run would discard this checkpoint",
            checkpoint.schema_version, CHECKPOINT_SCHEMA_VERSION
        ));
    } else if !fresh {
        output::warning(format!(
            "Older than {}h; a run would discard this checkpoint",
            settings.max_age_hours
        ));
    } else if remaining > 0 {
        output::dim(format!("{remaining} orders will be offered for resumption"));
    }
}

pub(crate) async fn handle_checkpoint_command(
    cmd: CheckpointCommands,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    match cmd {
        CheckpointCommands::Show { location, json } => {
            let resolved = resolve(&location, config_path)?;
            let checkpoint = load_required(&resolved).await?;
            if json {
                output::plain(serde_json::to_string_pretty(&checkpoint)?);
            } else {
                show(&checkpoint, &resolved.settings);
            }
        }
        CheckpointCommands::Clear { location } => {
            let resolved = resolve(&location, config_path)?;
            let path = resolved.store.path_for(&resolved.key);
            if resolved.store.load(&resolved.key).await?.is_none() {
                output::dim(format!("No checkpoint at {}", path.display()));
                return Ok(());
            }
            resolved.store.clear(&resolved.key).await?;
            tracing::info!(path = %path.display(), "Checkpoint cleared");
            output::success(format!("Cleared checkpoint {}", path.display()));
        }
    }
    Ok(())
}
