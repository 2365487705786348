//! # Detention Core
//!
//! Batch adjudication engine for freight detention charges. Given a list of
//! order identifiers it reads each order's facts and execution timestamps,
//! decides per stop whether detention is owed under the shipper's billing
//! rules, applies the resulting pricing changes (gated by human approval where
//! the rules require it) and reports what happened.
//!
//! This crate re-exports the workspace members:
//!
//! - [`shared`]: configuration, errors, logging, domain models, collaborator traits
//! - [`orchestration`]: analyzer, protected gateway, approval gate, batch orchestrator
//!
//! ```ignore
//! use detention_core::{Collaborators, SystemContext};
//!
//! let config = detention_core::shared::ConfigManager::load()?;
//! let context = SystemContext::new(config, collaborators)?;
//! let orchestrator = context.batch_orchestrator();
//! let summary = match orchestrator.resume_candidate().await? {
//!     Some(checkpoint) => orchestrator.resume_from(checkpoint).await?,
//!     None => orchestrator.start(order_ids).await?,
//! };
//! println!("{}", summary.format_summary());
//! ```

pub use detention_orchestration as orchestration;
pub use detention_shared as shared;

pub use detention_orchestration::{
    ApprovalGate, ApprovalOutcome, BatchOrchestrator, BatchState, BatchSummary, Collaborators,
    DetentionAnalyzer, SystemContext,
};
pub use detention_shared::{DetentionConfig, DetentionError, DetentionResult};
