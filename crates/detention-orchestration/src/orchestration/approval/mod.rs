//! # Approval Gate
//!
//! Time-boxed human decision for orders carrying pending-approval charges.
//!
//! The gate hands an [`ApprovalPrompt`] to an [`ApprovalPresenter`] and then
//! races three events: the decision, the deadline and the cancellation token.
//! Whichever settles first determines the outcome; the responder slot is
//! closed under its lock before the gate gives up, so a decision is either
//! observed or refused, never silently dropped.
//!
//! An approval without a required authorization code is refused and the
//! prompt is re-issued within the same deadline.

mod responder;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use detention_shared::models::{DetentionAction, OrderRecord, StopType};

pub use responder::ApprovalResponder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ApprovalError {
    #[error("approval already resolved")]
    AlreadyResolved,
    #[error("approval gate is no longer waiting for a decision")]
    Abandoned,
}

/// What the human chose
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approved { auth_code: Option<String> },
    Declined,
    Skipped,
}

/// How the gate resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ApprovalOutcome {
    #[display("approved")]
    Approved { auth_code: Option<String> },
    #[display("declined")]
    Declined,
    #[display("skipped")]
    Skipped,
    #[display("timed_out")]
    TimedOut,
}

impl ApprovalOutcome {
    pub fn auth_code(&self) -> Option<&str> {
        match self {
            Self::Approved { auth_code } => auth_code.as_deref(),
            _ => None,
        }
    }
}

/// One stop awaiting approval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalLine {
    pub stop_index: usize,
    pub stop_type: StopType,
    pub charge: Decimal,
    pub breakdown: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub order_id: String,
    pub shipper: String,
    pub total: Decimal,
    pub lines: Vec<ApprovalLine>,
    pub auth_number_required: bool,
}

impl ApprovalRequest {
    pub fn from_record(record: &OrderRecord) -> Self {
        let lines = record
            .results
            .iter()
            .filter(|r| r.action == DetentionAction::PendingApproval)
            .map(|r| ApprovalLine {
                stop_index: r.stop_index,
                stop_type: r.stop_type,
                charge: r.charge,
                breakdown: r.breakdown.clone(),
            })
            .collect();

        Self {
            order_id: record.order_id.clone(),
            shipper: record.shipper_label().to_string(),
            total: record.pending_approval_total(),
            lines,
            auth_number_required: record.auth_number_required(),
        }
    }
}

/// A request presented for decision
#[derive(Debug, Clone)]
pub struct ApprovalPrompt {
    pub request: ApprovalRequest,
    pub responder: ApprovalResponder,
    pub deadline: Instant,
    /// Why the previous answer was refused, when re-prompting
    pub reprompt_reason: Option<String>,
}

/// Surface that shows prompts to a human; must not block on the decision
#[async_trait]
pub trait ApprovalPresenter: Send + Sync + std::fmt::Debug {
    async fn present(&self, prompt: ApprovalPrompt);
}

/// Forwards prompts over a channel to whatever drives the decisions
#[derive(Debug, Clone)]
pub struct ChannelPresenter {
    sender: mpsc::UnboundedSender<ApprovalPrompt>,
}

impl ChannelPresenter {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ApprovalPrompt>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl ApprovalPresenter for ChannelPresenter {
    async fn present(&self, prompt: ApprovalPrompt) {
        if self.sender.send(prompt).is_err() {
            debug!("Approval prompt receiver dropped");
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApprovalGate {
    presenter: Arc<dyn ApprovalPresenter>,
    timeout: Duration,
}

fn has_code(code: &Option<String>) -> bool {
    code.as_deref().is_some_and(|c| !c.trim().is_empty())
}

impl ApprovalGate {
    pub fn new(presenter: Arc<dyn ApprovalPresenter>, timeout: Duration) -> Self {
        Self { presenter, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Present `request` and wait for its resolution.
    ///
    /// Cancellation resolves as `Skipped`.
    pub async fn request(
        &self,
        request: ApprovalRequest,
        cancel: &CancellationToken,
    ) -> ApprovalOutcome {
        let deadline = Instant::now() + self.timeout;
        let mut reprompt_reason = None;

        info!(
            order_id = %request.order_id,
            total = %request.total,
            stops = request.lines.len(),
            "Awaiting approval"
        );

        loop {
            let (sender, mut receiver) = oneshot::channel();
            let responder = ApprovalResponder::new(sender);

            self.presenter
                .present(ApprovalPrompt {
                    request: request.clone(),
                    responder: responder.clone(),
                    deadline,
                    reprompt_reason: reprompt_reason.take(),
                })
                .await;

            let decision = tokio::select! {
                biased;
                decision = &mut receiver => decision.ok(),
                () = cancel.cancelled() => {
                    responder.close();
                    match receiver.try_recv() {
                        Ok(decision) => Some(decision),
                        Err(_) => {
                            info!(order_id = %request.order_id, "Approval cancelled");
                            return ApprovalOutcome::Skipped;
                        }
                    }
                }
                () = tokio::time::sleep_until(deadline) => {
                    responder.close();
                    match receiver.try_recv() {
                        Ok(decision) => Some(decision),
                        Err(_) => {
                            warn!(order_id = %request.order_id, "Approval timed out");
                            return ApprovalOutcome::TimedOut;
                        }
                    }
                }
            };

            let Some(decision) = decision else {
                // Sender dropped without a decision
                warn!(order_id = %request.order_id, "Approval abandoned by presenter");
                return ApprovalOutcome::Skipped;
            };

            match decision {
                ApprovalDecision::Approved { auth_code }
                    if request.auth_number_required && !has_code(&auth_code) =>
                {
                    debug!(order_id = %request.order_id, "Approval missing authorization code");
                    reprompt_reason = Some("An authorization number is required".to_string());
                }
                ApprovalDecision::Approved { auth_code } => {
                    let auth_code = auth_code
                        .map(|c| c.trim().to_string())
                        .filter(|c| !c.is_empty());
                    info!(order_id = %request.order_id, "Approval granted");
                    return ApprovalOutcome::Approved { auth_code };
                }
                ApprovalDecision::Declined => return ApprovalOutcome::Declined,
                ApprovalDecision::Skipped => return ApprovalOutcome::Skipped,
            }
        }
    }
}
