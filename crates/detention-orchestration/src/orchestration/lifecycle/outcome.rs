//! Consolidated report entry for one order.

use rust_decimal::Decimal;

use detention_shared::models::{
    Classification, DetentionAction, OrderRecord, ProcessedAction, ReportEntry, ReportStatus,
};

use super::order_pipeline::OrderFailure;
use crate::orchestration::approval::ApprovalOutcome;

fn stop_notes(record: &OrderRecord) -> String {
    record
        .results
        .iter()
        .map(|r| {
            let mut note = format!(
                "Stop {} ({}): {} - {}",
                r.stop_index + 1,
                r.stop_type,
                r.classification,
                r.breakdown
            );
            if let Some(error) = r.process_error() {
                note.push_str(&format!(" [error: {error}]"));
            }
            note
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn processed_total(record: &OrderRecord, actions: &[ProcessedAction]) -> Decimal {
    record
        .results
        .iter()
        .filter(|r| r.processed_action().is_some_and(|a| actions.contains(&a)))
        .filter_map(|r| r.processed_amount())
        .sum()
}

fn any_processed(record: &OrderRecord, action: ProcessedAction) -> bool {
    record
        .results
        .iter()
        .any(|r| r.processed_action() == Some(action))
}

/// Net outcome of an order, with `approval` set when it went through the gate
pub fn report_entry(record: &OrderRecord, approval: Option<&ApprovalOutcome>) -> ReportEntry {
    let shipper = record.shipper_label();
    let mut notes = stop_notes(record);
    if let Some(code) = approval.and_then(ApprovalOutcome::auth_code) {
        notes.push_str(&format!("; Auth #{code}"));
    }
    let entry = |action: &str, amount: Option<Decimal>, status: ReportStatus, notes: String| {
        ReportEntry::new(&record.order_id, shipper, action, amount, status, notes)
    };

    if record.results.iter().any(|r| r.process_error().is_some()) {
        return entry("Error", None, ReportStatus::Failed, notes);
    }

    let charged = processed_total(record, &[ProcessedAction::Created, ProcessedAction::Updated]);
    let created = any_processed(record, ProcessedAction::Created);
    let updated = any_processed(record, ProcessedAction::Updated);
    let released = any_processed(record, ProcessedAction::Released);

    let charge_label = match (created, updated) {
        (true, false) => Some("Charge Created"),
        (false, true) => Some("Charge Updated"),
        (true, true) => Some("Charged"),
        (false, false) => None,
    };

    // Unresolved approvals still report what the order's other stops did
    let unresolved = match approval {
        Some(ApprovalOutcome::Declined) => Some(("Declined", ReportStatus::Declined)),
        Some(ApprovalOutcome::TimedOut) => Some(("Approval Timed Out", ReportStatus::TimedOut)),
        Some(ApprovalOutcome::Skipped) => Some(("Approval Skipped", ReportStatus::Skipped)),
        Some(ApprovalOutcome::Approved { .. }) | None => None,
    };
    if let Some((label, status)) = unresolved {
        let mut action = label.to_string();
        if let Some(charge) = charge_label {
            action.push_str(&format!(", {charge}"));
            notes.push_str(&format!("; Charged ${charged:.2}"));
        }
        if released {
            action.push_str(", Hold Released");
        }
        return entry(&action, Some(record.pending_approval_total()), status, notes);
    }

    if let Some(action) = charge_label {
        return entry(action, Some(charged), ReportStatus::Success, notes);
    }
    if released {
        return entry("Hold Released", None, ReportStatus::Success, notes);
    }
    if any_processed(record, ProcessedAction::AnalysisOnly) {
        let amount = processed_total(record, &[ProcessedAction::AnalysisOnly]);
        return entry("Analysis Only", Some(amount), ReportStatus::Info, notes);
    }
    if record
        .results
        .iter()
        .any(|r| r.action == DetentionAction::PendingRetry)
    {
        return entry("Awaiting Timestamps", None, ReportStatus::Skipped, notes);
    }
    if record.results.is_empty() {
        return entry("No Stops", None, ReportStatus::Skipped, "Order has no stops".to_string());
    }
    if record
        .results
        .iter()
        .all(|r| r.classification == Classification::ChargeExists)
    {
        return entry("Already Charged", None, ReportStatus::Info, notes);
    }
    entry("No Action", None, ReportStatus::Skipped, notes)
}

pub fn failure_entry(failure: &OrderFailure) -> ReportEntry {
    ReportEntry::failure(
        &failure.order_id,
        failure.shipper.as_deref().unwrap_or(""),
        failure.error.to_string(),
    )
}
