//! # Analysis Results
//!
//! The analyzer's per-stop verdict plus the post-execution bookkeeping the
//! orchestrator fills in once the decision has been applied or resolved.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::order::StopType;

/// Outcome of the decision ladder; the first matching rule wins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    #[display("ORDER_CANCELLED")]
    OrderCancelled,
    #[display("ORDER_INVOICED")]
    OrderInvoiced,
    #[display("CHARGE_EXISTS")]
    ChargeExists,
    #[display("FMC_DATA_UNAVAILABLE")]
    FmcDataUnavailable,
    #[display("MISSING_ARRIVAL")]
    MissingArrival,
    #[display("MISSING_DEPARTURE")]
    MissingDeparture,
    #[display("NO_DETENTION_DROP_HOOK")]
    NoDetentionDropHook,
    #[display("DRIVER_LATE")]
    DriverLate,
    #[display("WITHIN_FREE_TIME")]
    WithinFreeTime,
    #[display("NO_HOLD_NO_CHARGE")]
    NoHoldNoCharge,
    #[display("BELOW_MINIMUM_THRESHOLD")]
    BelowMinimumThreshold,
    #[display("CHARGEABLE")]
    Chargeable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum DetentionAction {
    #[display("no_action")]
    NoAction,
    #[display("pending_retry")]
    PendingRetry,
    #[display("release")]
    Release,
    #[display("create_charge")]
    CreateCharge,
    #[display("update_charge")]
    UpdateCharge,
    #[display("pending_approval")]
    PendingApproval,
    #[display("analysis_only")]
    AnalysisOnly,
}

impl DetentionAction {
    /// Actions that write to the order
    pub fn is_mutation(self) -> bool {
        matches!(self, Self::Release | Self::CreateCharge | Self::UpdateCharge)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum ProcessedAction {
    #[display("updated")]
    Updated,
    #[display("created")]
    Created,
    #[display("released")]
    Released,
    #[display("skipped")]
    Skipped,
    #[display("timeout")]
    Timeout,
    #[display("analysis_only")]
    AnalysisOnly,
}

/// Post-execution state of one stop. Holding the action inside the
/// `Processed` variant keeps "processed" and "exactly one action" in lockstep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProcessingState {
    #[default]
    Unprocessed,
    Processed {
        action: ProcessedAction,
        amount: Option<Decimal>,
    },
    Failed {
        error: String,
    },
}

/// Verdict for one stop of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub stop_index: usize,
    pub stop_type: StopType,
    pub classification: Classification,
    pub action: DetentionAction,
    /// Computed charge after rounding and cap; zero when not chargeable
    pub charge: Decimal,
    /// Pre-cap charge reached `max_charge`
    pub hit_max: bool,
    pub chargeable_minutes: i64,
    pub breakdown: String,
    pub has_hold: bool,
    pub hold_line_id: Option<String>,
    pub existing_charge: Decimal,
    pub requires_approval: bool,
    pub auto_charge_allowed: bool,
    pub auth_number_required: bool,
    #[serde(default)]
    pub processing: ProcessingState,
}

impl AnalysisResult {
    pub fn is_processed(&self) -> bool {
        matches!(self.processing, ProcessingState::Processed { .. })
    }

    pub fn processed_action(&self) -> Option<ProcessedAction> {
        match self.processing {
            ProcessingState::Processed { action, .. } => Some(action),
            _ => None,
        }
    }

    pub fn processed_amount(&self) -> Option<Decimal> {
        match self.processing {
            ProcessingState::Processed { amount, .. } => amount,
            _ => None,
        }
    }

    pub fn process_error(&self) -> Option<&str> {
        match &self.processing {
            ProcessingState::Failed { error } => Some(error),
            _ => None,
        }
    }

    pub fn mark_processed(&mut self, action: ProcessedAction, amount: Option<Decimal>) {
        self.processing = ProcessingState::Processed { action, amount };
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.processing = ProcessingState::Failed {
            error: error.into(),
        };
    }
}
