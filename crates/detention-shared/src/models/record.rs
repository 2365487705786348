use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::analysis::{AnalysisResult, DetentionAction};
use crate::models::billing_rules::BillingRules;
use crate::models::order::{ExecutionLinkage, OrderView};
use crate::models::timestamps::TourTimestamps;

/// Working state for one order; owned by the task processing it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: String,
    pub order: Option<OrderView>,
    pub linkage: Option<ExecutionLinkage>,
    pub timestamps: Option<TourTimestamps>,
    pub results: Vec<AnalysisResult>,
    pub shipper: Option<String>,
    #[serde(skip)]
    pub rules: Option<Arc<BillingRules>>,
}

impl OrderRecord {
    pub fn new(order_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            order: None,
            linkage: None,
            timestamps: None,
            results: Vec::new(),
            shipper: None,
            rules: None,
        }
    }

    pub fn needs_approval(&self) -> bool {
        self.results
            .iter()
            .any(|r| r.action == DetentionAction::PendingApproval)
    }

    pub fn needs_mutation(&self) -> bool {
        self.results.iter().any(|r| r.action.is_mutation())
    }

    /// Sum of charges awaiting approval
    pub fn pending_approval_total(&self) -> Decimal {
        self.results
            .iter()
            .filter(|r| r.action == DetentionAction::PendingApproval)
            .map(|r| r.charge)
            .sum()
    }

    pub fn auth_number_required(&self) -> bool {
        self.results
            .iter()
            .any(|r| r.action == DetentionAction::PendingApproval && r.auth_number_required)
    }

    pub fn shipper_label(&self) -> &str {
        self.shipper.as_deref().unwrap_or("")
    }
}
