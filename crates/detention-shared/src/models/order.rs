//! Order facts as read from the order-management backend.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[display("OPEN")]
    Open,
    #[display("IN_TRANSIT")]
    InTransit,
    #[display("DELIVERED")]
    Delivered,
    #[display("CANCELLED")]
    Cancelled,
    #[display("REJECTED")]
    Rejected,
    #[display("INVOICED")]
    Invoiced,
    #[display("PAID")]
    Paid,
    #[serde(other)]
    #[display("UNKNOWN")]
    Unknown,
}

impl OrderStatus {
    pub fn is_cancelled(self) -> bool {
        matches!(self, Self::Cancelled | Self::Rejected)
    }

    pub fn is_invoiced(self) -> bool {
        matches!(self, Self::Invoiced | Self::Paid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum StopType {
    #[display("pickup")]
    Pickup,
    #[display("delivery")]
    Delivery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum LoadType {
    #[display("live")]
    Live,
    #[display("drop_hook")]
    DropHook,
}

/// One pickup or delivery on an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stop {
    pub stop_type: StopType,
    pub load_type: LoadType,
    #[serde(default)]
    pub location: Option<String>,
}

/// A priced line on an order. Detention holds and charges share one charge
/// code and are tied to their stop by `stop_index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingLine {
    pub line_id: String,
    pub charge_code: String,
    pub amount: Decimal,
    #[serde(default)]
    pub stop_index: Option<usize>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Mutable order snapshot; `version` keys every write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderView {
    pub order_id: String,
    pub status: OrderStatus,
    pub shipper_name: String,
    pub version: u64,
    pub stops: Vec<Stop>,
    #[serde(default)]
    pub pricing_lines: Vec<PricingLine>,
}

impl OrderView {
    /// Detention lines attached to `stop_index`
    pub fn detention_lines_for<'a>(
        &'a self,
        stop_index: usize,
        charge_code: &'a str,
    ) -> impl Iterator<Item = &'a PricingLine> + 'a {
        self.pricing_lines.iter().filter(move |line| {
            line.stop_index == Some(stop_index) && line.charge_code.eq_ignore_ascii_case(charge_code)
        })
    }

    /// Existing detention state for one stop: the first zero-value line is
    /// the hold, the sum of non-zero lines is the existing charge.
    pub fn hold_for(&self, stop_index: usize, charge_code: &str) -> ExistingHold {
        let mut hold = ExistingHold::default();
        for line in self.detention_lines_for(stop_index, charge_code) {
            if line.amount.is_zero() {
                if hold.hold_line_id.is_none() {
                    hold.hold_line_id = Some(line.line_id.clone());
                }
            } else {
                hold.existing_charge += line.amount;
                if hold.charge_line_id.is_none() {
                    hold.charge_line_id = Some(line.line_id.clone());
                }
            }
        }
        hold
    }
}

/// Execution linkage: the tour (and its lanes) that carried the order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLinkage {
    pub tour_id: Option<String>,
    #[serde(default)]
    pub lane_ids: Vec<String>,
}

/// Everything the order-facts source returns for one identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFacts {
    pub order: OrderView,
    pub linkage: ExecutionLinkage,
}

/// Detention lines already present on one stop
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExistingHold {
    pub hold_line_id: Option<String>,
    pub charge_line_id: Option<String>,
    pub existing_charge: Decimal,
}

impl ExistingHold {
    pub fn has_hold(&self) -> bool {
        self.hold_line_id.is_some()
    }
}

/// A pricing line to append to an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPricingLine {
    pub charge_code: String,
    pub amount: Decimal,
    pub stop_index: usize,
    pub description: String,
}
