//! Chunked batch runs with pause/resume/cancel, checkpointing and a deferred
//! approval pass.

pub mod controller;
pub mod job;
pub mod orchestrator;
pub mod summary;

pub use controller::{BatchController, BatchState};
pub use job::{ApprovalCounts, BatchCounts, BatchFailure, BatchJob};
pub use orchestrator::BatchOrchestrator;
pub use summary::{BatchProgress, BatchSummary};
