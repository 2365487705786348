use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
pub enum ReportStatus {
    Success,
    Info,
    Skipped,
    Failed,
    Declined,
    #[display("Timed Out")]
    TimedOut,
}

/// One consolidated line per order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub order_id: String,
    pub shipper: String,
    pub action: String,
    pub amount: Option<Decimal>,
    pub status: ReportStatus,
    pub notes: String,
}

impl ReportEntry {
    pub fn new(
        order_id: impl Into<String>,
        shipper: impl Into<String>,
        action: impl Into<String>,
        amount: Option<Decimal>,
        status: ReportStatus,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            shipper: shipper.into(),
            action: action.into(),
            amount,
            status,
            notes: notes.into(),
        }
    }

    pub fn failure(
        order_id: impl Into<String>,
        shipper: impl Into<String>,
        notes: impl Into<String>,
    ) -> Self {
        Self::new(order_id, shipper, "Error", None, ReportStatus::Failed, notes)
    }
}
