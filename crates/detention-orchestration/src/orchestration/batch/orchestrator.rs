//! # Batch Orchestrator
//!
//! Drives one run end to end:
//!
//! 1. Reject lists larger than the session ceiling.
//! 2. Split the pending identifiers into fixed-size chunks, preserving order.
//! 3. Per chunk: wait while paused, stop if cancelled, make sure the credential
//!    outlives the chunk, then run the chunk's orders in parallel groups.
//! 4. Orders with pending-approval stops are deferred; everything else is
//!    executed and reported immediately.
//! 5. A checkpoint is saved after every chunk; chunks are separated by a
//!    cooldown that cancellation cuts short.
//! 6. Deferred approvals are resolved one at a time after the last chunk.
//! 7. Completion clears the checkpoint; cancellation keeps it for resumption.
//!
//! An orchestrator drives a single run. Build a fresh one from the
//! [`SystemContext`](crate::system_context::SystemContext) for the next run.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use detention_shared::config::{BatchConfig, CheckpointConfig, DetentionConfig};
use detention_shared::models::OrderRecord;
use detention_shared::{DetentionError, DetentionResult};

use super::controller::{BatchController, BatchState};
use super::job::BatchJob;
use super::summary::{BatchProgress, BatchSummary};
use crate::orchestration::approval::{ApprovalGate, ApprovalRequest};
use crate::orchestration::checkpoint::{load_resumable, BatchCheckpoint, CheckpointStore};
use crate::orchestration::credentials::CredentialManager;
use crate::orchestration::lifecycle::{
    failure_entry, report_entry, ActionExecutor, OrderFailure, OrderPipeline,
};

/// How a single order left the chunk loop
#[derive(Debug)]
enum OrderOutcome {
    Settled(Box<OrderRecord>),
    Deferred(Box<OrderRecord>),
    Failed(OrderFailure),
}

#[derive(Debug)]
pub struct BatchOrchestrator {
    batch: BatchConfig,
    checkpoint: CheckpointConfig,
    refresh_margin: Duration,
    pipeline: OrderPipeline,
    executor: ActionExecutor,
    gate: ApprovalGate,
    credentials: Arc<CredentialManager>,
    checkpoints: Arc<dyn CheckpointStore>,
    controller: BatchController,
    progress: watch::Sender<BatchProgress>,
}

impl BatchOrchestrator {
    pub fn new(
        config: &DetentionConfig,
        pipeline: OrderPipeline,
        executor: ActionExecutor,
        gate: ApprovalGate,
        credentials: Arc<CredentialManager>,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> Self {
        let (progress, _) = watch::channel(BatchProgress::default());
        Self {
            batch: config.batch.clone(),
            checkpoint: config.checkpoint.clone(),
            refresh_margin: config.credentials.refresh_margin(),
            pipeline,
            executor,
            gate,
            credentials,
            checkpoints,
            controller: BatchController::new(),
            progress,
        }
    }

    pub fn controller(&self) -> &BatchController {
        &self.controller
    }

    pub fn state(&self) -> BatchState {
        self.controller.state()
    }

    pub fn pause(&self) -> bool {
        self.controller.pause()
    }

    pub fn resume(&self) -> bool {
        self.controller.resume()
    }

    pub fn cancel(&self) -> bool {
        self.controller.cancel()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<BatchProgress> {
        self.progress.subscribe()
    }

    /// A stored checkpoint worth offering for resumption, if any
    pub async fn resume_candidate(&self) -> DetentionResult<Option<BatchCheckpoint>> {
        load_resumable(
            self.checkpoints.as_ref(),
            &self.checkpoint.key,
            self.checkpoint.max_age(),
        )
        .await
        .map_err(|e| DetentionError::State(format!("checkpoint unavailable: {e}")))
    }

    /// Start a fresh run over `order_ids`, discarding any stored checkpoint
    pub async fn start(&self, order_ids: Vec<String>) -> DetentionResult<BatchSummary> {
        if order_ids.len() > self.batch.max_orders_per_session {
            return Err(DetentionError::validation(format!(
                "{} orders exceeds the session limit of {}",
                order_ids.len(),
                self.batch.max_orders_per_session
            )));
        }
        self.controller.begin()?;

        if let Err(error) = self.checkpoints.clear(&self.checkpoint.key).await {
            warn!(error = %error, "Failed to clear previous checkpoint");
        }

        self.run(BatchJob::new(order_ids)).await
    }

    /// Continue a run from `checkpoint`; settled identifiers are not revisited
    pub async fn resume_from(&self, checkpoint: BatchCheckpoint) -> DetentionResult<BatchSummary> {
        self.controller.begin()?;
        self.run(BatchJob::from_checkpoint(checkpoint)).await
    }

    #[instrument(skip_all, fields(run_id = %job.run_id))]
    async fn run(&self, mut job: BatchJob) -> DetentionResult<BatchSummary> {
        let started = Instant::now();

        let pending = job.pending_ids();
        let chunk_size = self.batch.chunk_size.max(1);
        let group_size = self.batch.parallel_group_size.max(1);
        let chunks: Vec<&[String]> = pending.chunks(chunk_size).collect();
        // Chunks settled by earlier sessions count toward the total
        let total_chunks = job.chunk_index + chunks.len();

        info!(
            total = job.order_ids.len(),
            pending = pending.len(),
            resumed = job.skipped_by_resume,
            chunks = chunks.len(),
            "Batch run started"
        );
        self.publish(&job, total_chunks);

        let mut cancelled = false;
        for (position, chunk) in chunks.iter().enumerate() {
            if self
                .controller
                .wait_while_paused(self.batch.pause_poll_interval())
                .await
                .is_err()
            {
                cancelled = true;
                break;
            }

            if let Err(error) = self.credentials.ensure_fresh_for(self.refresh_margin).await {
                warn!(error = %error, "Could not refresh credential before chunk");
            }

            debug!(chunk_index = job.chunk_index, orders = chunk.len(), "Processing chunk");
            for group in chunk.chunks(group_size) {
                let outcomes = join_all(group.iter().map(|id| self.process_order(id))).await;
                for outcome in outcomes {
                    self.absorb(&mut job, outcome);
                }
            }

            job.chunk_index += 1;
            self.save_checkpoint(&job).await;
            self.publish(&job, total_chunks);

            if position + 1 < chunks.len() && !self.cooldown().await {
                cancelled = true;
                break;
            }
        }

        if !cancelled {
            cancelled = !self.resolve_deferred(&mut job, total_chunks).await
                || self
                    .controller
                    .wait_while_paused(self.batch.pause_poll_interval())
                    .await
                    .is_err();
        }

        let elapsed = started.elapsed();
        self.log_dependency_health();
        if cancelled || self.controller.is_cancelled() {
            self.save_checkpoint(&job).await;
            self.publish(&job, total_chunks);
            info!(
                processed = job.processed.len(),
                failed = job.failed.len(),
                "Batch run cancelled; checkpoint kept"
            );
            return Ok(BatchSummary::from_job(&job, BatchState::Cancelled, elapsed));
        }

        self.controller.complete();
        if let Err(error) = self.checkpoints.clear(&self.checkpoint.key).await {
            warn!(error = %error, "Failed to clear checkpoint after completion");
        }
        self.publish(&job, total_chunks);

        let summary = BatchSummary::from_job(&job, BatchState::Completed, elapsed);
        info!(
            processed = summary.counts.processed,
            charged = summary.counts.charged,
            total_charged = %summary.counts.total_charged,
            failed = summary.counts.failed,
            elapsed_ms = elapsed.as_millis() as u64,
            "Batch run completed"
        );
        Ok(summary)
    }

    async fn process_order(&self, order_id: &str) -> OrderOutcome {
        let mut record = match self.pipeline.prepare(order_id).await {
            Ok(record) => record,
            Err(failure) => {
                warn!(order_id = %order_id, error = %failure.error, "Order failed");
                return OrderOutcome::Failed(failure);
            }
        };

        if record.needs_approval() {
            debug!(order_id = %order_id, total = %record.pending_approval_total(), "Deferring for approval");
            return OrderOutcome::Deferred(Box::new(record));
        }

        self.executor.execute(&mut record).await;
        OrderOutcome::Settled(Box::new(record))
    }

    fn absorb(&self, job: &mut BatchJob, outcome: OrderOutcome) {
        match outcome {
            OrderOutcome::Settled(record) => {
                let entry = report_entry(&record, None);
                job.record_settled(&record, None, entry);
            }
            OrderOutcome::Deferred(record) => job.deferred.push(*record),
            OrderOutcome::Failed(failure) => {
                let entry = failure_entry(&failure);
                job.record_failure(&failure, entry);
            }
        }
    }

    /// Resolve deferred approvals in order; `false` when cancelled midway
    async fn resolve_deferred(&self, job: &mut BatchJob, total_chunks: usize) -> bool {
        if job.deferred.is_empty() {
            return true;
        }
        info!(orders = job.deferred.len(), "Resolving deferred approvals");

        let token = self.controller.cancellation_token();
        let deferred = std::mem::take(&mut job.deferred);
        let mut remaining = deferred.into_iter();

        while let Some(mut record) = remaining.next() {
            if self
                .controller
                .wait_while_paused(self.batch.pause_poll_interval())
                .await
                .is_err()
            {
                job.deferred.push(record);
                job.deferred.extend(remaining);
                return false;
            }

            let outcome = self
                .gate
                .request(ApprovalRequest::from_record(&record), &token)
                .await;
            if token.is_cancelled() {
                job.deferred.push(record);
                job.deferred.extend(remaining);
                return false;
            }

            info!(order_id = %record.order_id, outcome = %outcome, "Approval resolved");
            self.executor.execute_approved(&mut record, &outcome).await;
            let entry = report_entry(&record, Some(&outcome));
            job.record_settled(&record, Some(&outcome), entry);

            self.save_checkpoint(job).await;
            self.publish(job, total_chunks);
        }
        true
    }

    /// Inter-chunk pause; `false` if cancelled while waiting
    async fn cooldown(&self) -> bool {
        let token = self.controller.cancellation_token();
        tokio::select! {
            () = token.cancelled() => false,
            () = tokio::time::sleep(self.batch.inter_chunk_cooldown()) => true,
        }
    }

    fn log_dependency_health(&self) {
        for (name, metrics) in self.pipeline.breakers().metrics() {
            if metrics.is_clean() {
                debug!(circuit_breaker = %name, metrics = %metrics.format_summary(), "Dependency healthy");
            } else {
                warn!(
                    circuit_breaker = %name,
                    metrics = %metrics.format_summary(),
                    "Dependency degraded during run"
                );
            }
        }
    }

    async fn save_checkpoint(&self, job: &BatchJob) {
        if let Err(error) = self
            .checkpoints
            .save(&self.checkpoint.key, &job.to_checkpoint())
            .await
        {
            warn!(error = %error, chunk_index = job.chunk_index, "Failed to save checkpoint");
        }
    }

    fn publish(&self, job: &BatchJob, total_chunks: usize) {
        self.progress.send_replace(BatchProgress {
            run_id: Some(job.run_id),
            state: self.controller.state(),
            chunk_index: job.chunk_index,
            total_chunks,
            total_orders: job.order_ids.len(),
            processed: job.processed.len(),
            failed: job.failed.len(),
            deferred: job.deferred.len(),
        });
    }
}
