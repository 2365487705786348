use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use detention_shared::models::ReportEntry;

use super::controller::BatchState;
use super::job::{BatchCounts, BatchJob};

/// Point-in-time view of a run, published on every transition and chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub run_id: Option<Uuid>,
    pub state: BatchState,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub total_orders: usize,
    pub processed: usize,
    pub failed: usize,
    pub deferred: usize,
}

impl Default for BatchProgress {
    fn default() -> Self {
        Self {
            run_id: None,
            state: BatchState::Idle,
            chunk_index: 0,
            total_chunks: 0,
            total_orders: 0,
            processed: 0,
            failed: 0,
            deferred: 0,
        }
    }
}

/// Final counts of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub run_id: Uuid,
    pub state: BatchState,
    pub total_requested: usize,
    pub counts: BatchCounts,
    pub skipped_by_resume: usize,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
    pub report: Vec<ReportEntry>,
}

impl BatchSummary {
    pub fn from_job(job: &BatchJob, state: BatchState, elapsed: Duration) -> Self {
        Self {
            run_id: job.run_id,
            state,
            total_requested: job.order_ids.len(),
            counts: job.counts.clone(),
            skipped_by_resume: job.skipped_by_resume,
            elapsed,
            report: job.report.clone(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state == BatchState::Cancelled
    }

    pub fn format_summary(&self) -> String {
        let approvals = &self.counts.approvals;
        let mut lines = vec![
            format!("Run {} ({})", self.run_id, self.state),
            format!("  Requested:         {}", self.total_requested),
            format!("  Processed:         {}", self.counts.processed),
            format!("  Charged stops:     {}", self.counts.charged),
            format!("  Total charged:     ${:.2}", self.counts.total_charged),
            format!("  Holds released:    {}", self.counts.released),
            format!("  Analysis only:     {}", self.counts.analysis_only),
            format!(
                "  Approvals:         {} approved, {} declined, {} skipped, {} timed out",
                approvals.approved, approvals.declined, approvals.skipped, approvals.timed_out
            ),
            format!("  Failed:            {}", self.counts.failed),
        ];
        if self.skipped_by_resume > 0 {
            lines.push(format!("  Resumed past:      {}", self.skipped_by_resume));
        }
        lines.push(format!("  Elapsed:           {:.1}s", self.elapsed.as_secs_f64()));
        lines.join("\n")
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_format_summary_mentions_counts() {
        let mut job = BatchJob::new((1..=3).map(|i| format!("ORD-{i}")).collect());
        job.counts.processed = 2;
        job.counts.charged = 1;
        job.counts.total_charged = Decimal::new(7000, 2);
        job.counts.approvals.declined = 1;
        job.skipped_by_resume = 4;

        let summary = BatchSummary::from_job(&job, BatchState::Completed, Duration::from_millis(1500));
        let text = summary.format_summary();
        assert!(text.contains("(completed)"));
        assert!(text.contains("Total charged:     $70.00"));
        assert!(text.contains("1 declined"));
        assert!(text.contains("Resumed past:      4"));
        assert!(text.contains("1.5s"));
        assert!(!summary.is_cancelled());

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["elapsed"], 1500);
    }
}
