//! `detention-ctl report`: render a checkpoint's report-so-far.

use std::path::Path;

use anyhow::Context;

use detention_orchestration::orchestration::report::{render_csv, render_text};

use super::checkpoint::{load_required, resolve};
use crate::{output, CheckpointLocation, ReportFormat};

pub(crate) async fn handle_report_command(
    location: &CheckpointLocation,
    format: ReportFormat,
    destination: Option<&Path>,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    let resolved = resolve(location, config_path)?;
    let checkpoint = load_required(&resolved).await?;

    let rendered = match format {
        ReportFormat::Csv => render_csv(&checkpoint.report).context("Failed to render CSV")?,
        ReportFormat::Text => render_text(&checkpoint.report, None),
    };

    match destination {
        Some(path) => {
            tokio::fs::write(path, rendered)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            output::success(format!(
                "Wrote {} entries to {}",
                checkpoint.report.len(),
                path.display()
            ));
        }
        None => {
            let mut out = anstream::stdout().lock();
            std::io::Write::write_all(&mut out, rendered.as_bytes())?;
        }
    }
    Ok(())
}
