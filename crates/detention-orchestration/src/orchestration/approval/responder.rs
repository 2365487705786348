use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use super::{ApprovalDecision, ApprovalError};

/// Handle a human (or UI) uses to answer one prompt.
///
/// Clones share one slot: the first `respond` wins, every later call fails,
/// and the gate closes the slot when the prompt expires or is cancelled.
#[derive(Debug, Clone)]
pub struct ApprovalResponder {
    slot: Arc<Mutex<Option<oneshot::Sender<ApprovalDecision>>>>,
}

impl ApprovalResponder {
    pub(super) fn new(sender: oneshot::Sender<ApprovalDecision>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(sender))),
        }
    }

    pub fn respond(&self, decision: ApprovalDecision) -> Result<(), ApprovalError> {
        let sender = self
            .slot
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take()
            .ok_or(ApprovalError::AlreadyResolved)?;
        sender.send(decision).map_err(|_| ApprovalError::Abandoned)
    }

    pub fn approve(&self, auth_code: Option<String>) -> Result<(), ApprovalError> {
        self.respond(ApprovalDecision::Approved { auth_code })
    }

    pub fn decline(&self) -> Result<(), ApprovalError> {
        self.respond(ApprovalDecision::Declined)
    }

    pub fn skip(&self) -> Result<(), ApprovalError> {
        self.respond(ApprovalDecision::Skipped)
    }

    pub fn is_resolved(&self) -> bool {
        self.slot.lock().unwrap_or_else(|p| p.into_inner()).is_none()
    }

    /// Refuse all further decisions
    pub(super) fn close(&self) {
        self.slot.lock().unwrap_or_else(|p| p.into_inner()).take();
    }
}
