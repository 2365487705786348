//! # Report Rendering
//!
//! The two fixed serializations of a run's report: delimited text (CSV with
//! a header row) and a human-readable table.

use std::fmt::Write as _;

use rust_decimal::Decimal;

use detention_shared::models::ReportEntry;

use crate::orchestration::batch::BatchSummary;

const CSV_HEADERS: [&str; 6] = ["Order", "Shipper", "Action", "Amount", "Status", "Notes"];

fn amount_cell(amount: Option<Decimal>) -> String {
    amount.map(|a| format!("{a:.2}")).unwrap_or_default()
}

pub fn render_csv(entries: &[ReportEntry]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADERS)?;
    for entry in entries {
        writer.write_record([
            entry.order_id.as_str(),
            entry.shipper.as_str(),
            entry.action.as_str(),
            amount_cell(entry.amount).as_str(),
            entry.status.to_string().as_str(),
            entry.notes.as_str(),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let mut cut: String = value.chars().take(width.saturating_sub(3)).collect();
        cut.push_str("...");
        cut
    }
}

/// Plain-text table, followed by the run summary when one is supplied
pub fn render_text(entries: &[ReportEntry], summary: Option<&BatchSummary>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "DETENTION REPORT");
    let _ = writeln!(out, "{}", "=".repeat(96));
    let _ = writeln!(
        out,
        "{:<14} {:<20} {:<24} {:>10} {:<10} Notes",
        "Order", "Shipper", "Action", "Amount", "Status"
    );
    let _ = writeln!(out, "{}", "-".repeat(96));

    for entry in entries {
        let amount = entry
            .amount
            .map(|a| format!("${a:.2}"))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:<14} {:<20} {:<24} {:>10} {:<10} {}",
            truncate(&entry.order_id, 14),
            truncate(&entry.shipper, 20),
            truncate(&entry.action, 24),
            amount,
            entry.status.to_string(),
            entry.notes
        );
    }

    if entries.is_empty() {
        let _ = writeln!(out, "(no entries)");
    }

    if let Some(summary) = summary {
        let _ = writeln!(out, "{}", "-".repeat(96));
        let _ = writeln!(out, "{}", summary.format_summary());
    }
    out
}
