//! # Action Executor
//!
//! Applies an order's mutation decisions one stop at a time. Every write
//! starts from a freshly fetched snapshot; a version conflict re-fetches and
//! retries that single write once.

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use detention_shared::models::{
    AnalysisResult, DetentionAction, NewPricingLine, OrderRecord, OrderView, ProcessedAction,
};
use detention_shared::{DetentionError, DetentionResult};

use crate::orchestration::approval::ApprovalOutcome;
use crate::orchestration::gateway::ProtectedGateway;

#[derive(Debug, Clone)]
pub struct ActionExecutor {
    gateway: ProtectedGateway,
    charge_code: String,
}

/// Result of applying one stop's action
type StopOutcome = (ProcessedAction, Option<Decimal>);

impl ActionExecutor {
    pub fn new(gateway: ProtectedGateway, charge_code: impl Into<String>) -> Self {
        Self {
            gateway,
            charge_code: charge_code.into(),
        }
    }

    /// Apply every pending mutation on `record`, in stop order, and mark
    /// analysis-only stops. Per-stop failures are recorded on the stop.
    /// Pending-approval stops are left untouched.
    pub async fn execute(&self, record: &mut OrderRecord) {
        self.execute_with(record, None).await;
    }

    /// Apply `record` once its approval has resolved.
    ///
    /// Approved stops are charged (updating an existing hold, else creating a
    /// line). Declined stops release their hold, or are skipped when there is
    /// none. Skipped and timed-out approvals leave the order untouched.
    pub async fn execute_approved(&self, record: &mut OrderRecord, outcome: &ApprovalOutcome) {
        self.execute_with(record, Some(outcome)).await;
    }

    async fn execute_with(&self, record: &mut OrderRecord, approval: Option<&ApprovalOutcome>) {
        let order_id = record.order_id.clone();
        let auth_code = approval.and_then(ApprovalOutcome::auth_code);

        for result in record.results.iter_mut() {
            if result.is_processed() {
                continue;
            }
            let action = match (result.action, approval) {
                (DetentionAction::AnalysisOnly, _) => {
                    result.mark_processed(ProcessedAction::AnalysisOnly, Some(result.charge));
                    continue;
                }
                (DetentionAction::PendingApproval, Some(outcome)) => {
                    match approved_action(result, outcome) {
                        Ok(action) => action,
                        Err(processed) => {
                            result.mark_processed(processed, None);
                            continue;
                        }
                    }
                }
                (action, _) if action.is_mutation() => action,
                _ => continue,
            };

            match self.execute_stop(&order_id, result, action, auth_code).await {
                Ok((processed, amount)) => {
                    info!(
                        order_id = %order_id,
                        stop_index = result.stop_index,
                        action = %processed,
                        "Stop action applied"
                    );
                    result.mark_processed(processed, amount);
                }
                Err(error) => {
                    warn!(
                        order_id = %order_id,
                        stop_index = result.stop_index,
                        error = %error,
                        "Stop action failed"
                    );
                    result.mark_failed(error.to_string());
                }
            }
        }
    }

    async fn execute_stop(
        &self,
        order_id: &str,
        result: &AnalysisResult,
        action: DetentionAction,
        auth_code: Option<&str>,
    ) -> DetentionResult<StopOutcome> {
        let mut retried = false;
        loop {
            let snapshot = self.gateway.order_snapshot(order_id).await?;
            match self.write_once(&snapshot, result, action, auth_code).await {
                Err(DetentionError::VersionConflict { expected, .. }) if !retried => {
                    info!(
                        order_id = %order_id,
                        stale_version = expected,
                        "Version conflict, re-fetching snapshot"
                    );
                    retried = true;
                }
                outcome => return outcome,
            }
        }
    }

    async fn write_once(
        &self,
        snapshot: &OrderView,
        result: &AnalysisResult,
        action: DetentionAction,
        auth_code: Option<&str>,
    ) -> DetentionResult<StopOutcome> {
        let order_id = snapshot.order_id.as_str();
        let current = snapshot.hold_for(result.stop_index, &self.charge_code);

        match action {
            DetentionAction::Release => {
                let Some(hold_id) = current.hold_line_id else {
                    debug!(order_id = %order_id, stop_index = result.stop_index, "Hold already gone");
                    return Ok((ProcessedAction::Skipped, None));
                };
                let lines = snapshot
                    .pricing_lines
                    .iter()
                    .filter(|line| line.line_id != hold_id)
                    .cloned()
                    .collect();
                self.gateway
                    .update_order(order_id, snapshot.version, lines)
                    .await?;
                Ok((ProcessedAction::Released, None))
            }
            DetentionAction::CreateCharge | DetentionAction::UpdateCharge => {
                if current.existing_charge > Decimal::ZERO {
                    info!(
                        order_id = %order_id,
                        stop_index = result.stop_index,
                        "Charge appeared since analysis, not charging again"
                    );
                    return Ok((ProcessedAction::Skipped, None));
                }

                let description = format!("Detention {} stop {}", result.stop_type, result.stop_index + 1);
                let (version, processed) = match current.hold_line_id {
                    Some(hold_id) => {
                        let lines = snapshot
                            .pricing_lines
                            .iter()
                            .cloned()
                            .map(|mut line| {
                                if line.line_id == hold_id {
                                    line.amount = result.charge;
                                    line.description = Some(description.clone());
                                }
                                line
                            })
                            .collect();
                        let version = self
                            .gateway
                            .update_order(order_id, snapshot.version, lines)
                            .await?;
                        (version, ProcessedAction::Updated)
                    }
                    None => {
                        let line = NewPricingLine {
                            charge_code: self.charge_code.clone(),
                            amount: result.charge,
                            stop_index: result.stop_index,
                            description,
                        };
                        let version = self
                            .gateway
                            .append_pricing_line(order_id, snapshot.version, line)
                            .await?;
                        (version, ProcessedAction::Created)
                    }
                };

                self.comment(order_id, version, &charge_comment(result, auth_code))
                    .await;
                Ok((processed, Some(result.charge)))
            }
            other => Err(DetentionError::State(format!(
                "action {other} is not a mutation"
            ))),
        }
    }

    /// Best-effort comment; the charge stands even if the comment fails
    async fn comment(&self, order_id: &str, version: u64, comment: &str) {
        let outcome = match self.gateway.append_comment(order_id, version, comment).await {
            Err(DetentionError::VersionConflict { .. }) => {
                match self.gateway.order_snapshot(order_id).await {
                    Ok(snapshot) => self
                        .gateway
                        .append_comment(order_id, snapshot.version, comment)
                        .await,
                    Err(error) => Err(error),
                }
            }
            other => other,
        };
        if let Err(error) = outcome {
            warn!(order_id = %order_id, error = %error, "Failed to append charge comment");
        }
    }
}

/// Effective action for a pending-approval stop, or the terminal state it
/// settles in without a write
fn approved_action(
    result: &AnalysisResult,
    outcome: &ApprovalOutcome,
) -> Result<DetentionAction, ProcessedAction> {
    match outcome {
        ApprovalOutcome::Approved { .. } if result.has_hold => Ok(DetentionAction::UpdateCharge),
        ApprovalOutcome::Approved { .. } => Ok(DetentionAction::CreateCharge),
        ApprovalOutcome::Declined if result.has_hold => Ok(DetentionAction::Release),
        ApprovalOutcome::Declined | ApprovalOutcome::Skipped => Err(ProcessedAction::Skipped),
        ApprovalOutcome::TimedOut => Err(ProcessedAction::Timeout),
    }
}

/// Comment recorded alongside a detention charge
pub fn charge_comment(result: &AnalysisResult, auth_code: Option<&str>) -> String {
    let mut comment = format!(
        "Detention ${:.2} ({} stop {}): {}",
        result.charge,
        result.stop_type,
        result.stop_index + 1,
        result.breakdown
    );
    if let Some(code) = auth_code {
        comment.push_str(&format!(". Auth #{code}"));
    }
    comment
}
