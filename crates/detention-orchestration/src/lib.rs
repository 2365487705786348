//! # Detention Orchestration
//!
//! Decision engine and batch pipeline for detention charges: the per-stop
//! analyzer, the protected gateway in front of the order system, the approval
//! gate, and the chunked batch orchestrator with checkpointed resumption.
//!
//! Components are assembled by [`SystemContext`] from a set of
//! [`Collaborators`]; see `testing` for in-memory fakes.

pub mod orchestration;
pub mod system_context;

#[cfg(feature = "test-utils")]
pub mod testing;

pub use orchestration::{
    ApprovalGate, ApprovalOutcome, BatchOrchestrator, BatchState, BatchSummary, DetentionAnalyzer,
};
pub use system_context::{Collaborators, SystemContext};
