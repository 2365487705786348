//! Mutable bookkeeping for one run: which identifiers remain, what has been
//! reported, and the counters that feed the final summary.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use detention_shared::models::{OrderRecord, ProcessedAction, ReportEntry, ReportStatus};

use crate::orchestration::approval::ApprovalOutcome;
use crate::orchestration::checkpoint::{BatchCheckpoint, CHECKPOINT_SCHEMA_VERSION};
use crate::orchestration::lifecycle::OrderFailure;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub order_id: String,
    pub error: String,
    pub at: DateTime<Utc>,
}

/// Resolutions of the approval gate within a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalCounts {
    pub approved: usize,
    pub declined: usize,
    pub skipped: usize,
    pub timed_out: usize,
}

impl ApprovalCounts {
    fn record(&mut self, outcome: &ApprovalOutcome) {
        match outcome {
            ApprovalOutcome::Approved { .. } => self.approved += 1,
            ApprovalOutcome::Declined => self.declined += 1,
            ApprovalOutcome::Skipped => self.skipped += 1,
            ApprovalOutcome::TimedOut => self.timed_out += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.approved + self.declined + self.skipped + self.timed_out
    }
}

/// Counters accumulated while orders settle in this session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchCounts {
    pub processed: usize,
    /// Stops charged (created or updated)
    pub charged: usize,
    pub released: usize,
    /// Orders settled as analysis only
    pub analysis_only: usize,
    pub failed: usize,
    pub approvals: ApprovalCounts,
    pub total_charged: Decimal,
}

#[derive(Debug, Clone)]
pub struct BatchJob {
    pub run_id: Uuid,
    /// Every identifier of the run, including ones settled before a resume
    pub order_ids: Vec<String>,
    pub chunk_index: usize,
    pub processed: BTreeSet<String>,
    pub failed: BTreeSet<String>,
    pub failures: Vec<BatchFailure>,
    pub report: Vec<ReportEntry>,
    /// Orders waiting for the approval pass
    pub deferred: Vec<OrderRecord>,
    pub counts: BatchCounts,
    /// Identifiers already settled by the checkpoint this run resumed from
    pub skipped_by_resume: usize,
    pub started_at: DateTime<Utc>,
}

impl BatchJob {
    pub fn new(order_ids: Vec<String>) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            order_ids,
            chunk_index: 0,
            processed: BTreeSet::new(),
            failed: BTreeSet::new(),
            failures: Vec::new(),
            report: Vec::new(),
            deferred: Vec::new(),
            counts: BatchCounts::default(),
            skipped_by_resume: 0,
            started_at: Utc::now(),
        }
    }

    pub fn from_checkpoint(checkpoint: BatchCheckpoint) -> Self {
        let skipped_by_resume = checkpoint.processed.len() + checkpoint.failed.len();
        Self {
            run_id: checkpoint.run_id,
            order_ids: checkpoint.order_ids,
            chunk_index: checkpoint.chunk_index,
            processed: checkpoint.processed,
            failed: checkpoint.failed,
            failures: Vec::new(),
            report: checkpoint.report,
            deferred: Vec::new(),
            counts: BatchCounts::default(),
            skipped_by_resume,
            started_at: Utc::now(),
        }
    }

    pub fn to_checkpoint(&self) -> BatchCheckpoint {
        BatchCheckpoint {
            schema_version: CHECKPOINT_SCHEMA_VERSION,
            run_id: self.run_id,
            order_ids: self.order_ids.clone(),
            chunk_index: self.chunk_index,
            processed: self.processed.clone(),
            failed: self.failed.clone(),
            report: self.report.clone(),
            saved_at: Utc::now(),
        }
    }

    /// Identifiers not yet settled, in original order
    pub fn pending_ids(&self) -> Vec<String> {
        self.order_ids
            .iter()
            .filter(|id| !self.processed.contains(*id) && !self.failed.contains(*id))
            .cloned()
            .collect()
    }

    /// Record a settled order and its consolidated report entry
    pub fn record_settled(
        &mut self,
        record: &OrderRecord,
        approval: Option<&ApprovalOutcome>,
        entry: ReportEntry,
    ) {
        if let Some(outcome) = approval {
            self.counts.approvals.record(outcome);
        }

        for result in &record.results {
            match result.processed_action() {
                Some(ProcessedAction::Created | ProcessedAction::Updated) => {
                    self.counts.charged += 1;
                    self.counts.total_charged += result.processed_amount().unwrap_or_default();
                }
                Some(ProcessedAction::Released) => self.counts.released += 1,
                _ => {}
            }
        }

        if entry.status == ReportStatus::Failed {
            self.counts.failed += 1;
            self.failures.push(BatchFailure {
                order_id: record.order_id.clone(),
                error: entry.notes.clone(),
                at: Utc::now(),
            });
            self.failed.insert(record.order_id.clone());
        } else {
            if entry.status == ReportStatus::Info {
                self.counts.analysis_only += 1;
            }
            self.counts.processed += 1;
            self.processed.insert(record.order_id.clone());
        }
        self.report.push(entry);
    }

    pub fn record_failure(&mut self, failure: &OrderFailure, entry: ReportEntry) {
        self.counts.failed += 1;
        self.failures.push(BatchFailure {
            order_id: failure.order_id.clone(),
            error: failure.error.to_string(),
            at: Utc::now(),
        });
        self.failed.insert(failure.order_id.clone());
        self.report.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use detention_shared::models::{
        AnalysisResult, Classification, DetentionAction, ProcessingState, StopType,
    };
    use detention_shared::DetentionError;

    fn charged_record(id: &str) -> OrderRecord {
        let mut record = OrderRecord::new(id);
        let mut result = AnalysisResult {
            stop_index: 0,
            stop_type: StopType::Delivery,
            classification: Classification::Chargeable,
            action: DetentionAction::CreateCharge,
            charge: Decimal::new(70, 0),
            hit_max: false,
            chargeable_minutes: 35,
            breakdown: "35 min".to_string(),
            has_hold: false,
            hold_line_id: None,
            existing_charge: Decimal::ZERO,
            requires_approval: false,
            auto_charge_allowed: true,
            auth_number_required: false,
            processing: ProcessingState::Unprocessed,
        };
        result.mark_processed(ProcessedAction::Created, Some(Decimal::new(70, 0)));
        record.results.push(result);
        record
    }

    #[test]
    fn test_pending_ids_skip_settled() {
        let mut job = BatchJob::new((1..=5).map(|i| format!("ORD-{i}")).collect());
        let record = charged_record("ORD-2");
        job.record_settled(
            &record,
            None,
            ReportEntry::new("ORD-2", "", "Charge Created", None, ReportStatus::Success, ""),
        );
        let failure = OrderFailure::new("ORD-4", None, DetentionError::timeout("order_facts"));
        job.record_failure(&failure, ReportEntry::failure("ORD-4", "", "timeout"));

        assert_eq!(job.pending_ids(), vec!["ORD-1", "ORD-3", "ORD-5"]);
        assert_eq!(job.counts.charged, 1);
        assert_eq!(job.counts.total_charged, Decimal::new(70, 0));
        assert_eq!(job.counts.failed, 1);
        assert_eq!(job.report.len(), 2);
    }

    #[test]
    fn test_checkpoint_conversion_counts_resumed() {
        let mut job = BatchJob::new((1..=4).map(|i| format!("ORD-{i}")).collect());
        job.processed.insert("ORD-1".to_string());
        job.failed.insert("ORD-3".to_string());
        job.chunk_index = 2;

        let resumed = BatchJob::from_checkpoint(job.to_checkpoint());
        assert_eq!(resumed.run_id, job.run_id);
        assert_eq!(resumed.chunk_index, 2);
        assert_eq!(resumed.skipped_by_resume, 2);
        assert_eq!(resumed.pending_ids(), vec!["ORD-2", "ORD-4"]);
    }

    #[test]
    fn test_failed_entry_moves_order_to_failed_set() {
        let mut job = BatchJob::new(vec!["ORD-1".to_string()]);
        let mut record = OrderRecord::new("ORD-1");
        record.results.push(charged_record("ORD-1").results.remove(0));
        record.results[0].mark_failed("network");
        job.record_settled(
            &record,
            None,
            ReportEntry::new("ORD-1", "", "Error", None, ReportStatus::Failed, "network"),
        );
        assert!(job.failed.contains("ORD-1"));
        assert_eq!(job.counts.processed, 0);
        assert_eq!(job.failures.len(), 1);
    }
}
