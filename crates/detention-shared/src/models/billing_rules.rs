//! # Billing Rules
//!
//! Per-shipper detention billing policy. Rules arrive from a tabular source as
//! loosely-typed strings ([`RawBillingRule`]) and are parsed exactly once, at
//! the boundary, into the strict [`BillingRules`] value the engine consumes.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use bon::Builder;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::{DetentionError, DetentionResult};
use crate::interfaces::BillingRulesSource;
use crate::models::order::{LoadType, StopType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateUnit {
    PerHour,
    PerMinute,
}

impl FromStr for RateUnit {
    type Err = DetentionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String = value
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect();
        match normalized.as_str() {
            "hour" | "hr" | "perhour" | "hourly" | "perhr" => Ok(Self::PerHour),
            "minute" | "min" | "perminute" | "permin" => Ok(Self::PerMinute),
            _ => Err(DetentionError::parse("rate unit", format!("unrecognized '{value}'"))),
        }
    }
}

/// How chargeable minutes snap to the billing increment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundingMode {
    Up,
    Down,
    Nearest,
}

impl RoundingMode {
    /// Lenient parse: anything unrecognized rounds up
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "DOWN" => Self::Down,
            "NEAREST" => Self::Nearest,
            _ => Self::Up,
        }
    }
}

/// Free minutes per stop/load combination; `None` means the combination is
/// not eligible for detention at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeTimeTable {
    pub pickup_live: Option<u32>,
    pub pickup_drop_hook: Option<u32>,
    pub delivery_live: Option<u32>,
    pub delivery_drop_hook: Option<u32>,
}

impl FreeTimeTable {
    /// Live loads at both ends get the same allowance; drop-and-hook is ineligible
    pub fn live_only(minutes: u32) -> Self {
        Self {
            pickup_live: Some(minutes),
            pickup_drop_hook: None,
            delivery_live: Some(minutes),
            delivery_drop_hook: None,
        }
    }

    pub fn minutes_for(&self, stop_type: StopType, load_type: LoadType) -> Option<u32> {
        match (stop_type, load_type) {
            (StopType::Pickup, LoadType::Live) => self.pickup_live,
            (StopType::Pickup, LoadType::DropHook) => self.pickup_drop_hook,
            (StopType::Delivery, LoadType::Live) => self.delivery_live,
            (StopType::Delivery, LoadType::DropHook) => self.delivery_drop_hook,
        }
    }
}

/// Strict, validated billing policy for one shipper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct BillingRules {
    #[builder(into)]
    pub shipper: String,
    pub rate: Decimal,
    pub rate_unit: RateUnit,
    pub max_charge: Decimal,
    pub free_time: FreeTimeTable,
    pub billing_increment_minutes: Option<u32>,
    pub rounding_mode: Option<RoundingMode>,
    pub minimum_chargeable_minutes: Option<u32>,
    #[builder(default)]
    pub requires_approval: bool,
    #[builder(default)]
    pub auto_charge_allowed: bool,
    #[builder(default)]
    pub auth_number_required: bool,
    #[builder(default = true)]
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl BillingRules {
    /// Increment and mode, only when both are configured
    pub fn rounding(&self) -> Option<(u32, RoundingMode)> {
        match (self.billing_increment_minutes, self.rounding_mode) {
            (Some(increment), Some(mode)) if increment > 0 => Some((increment, mode)),
            _ => None,
        }
    }
}

/// Billing rule row as delivered by the external tabular source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawBillingRule {
    pub shipper: Option<String>,
    pub rate: Option<String>,
    pub rate_unit: Option<String>,
    pub max_charge: Option<String>,
    pub free_time_pickup_live: Option<String>,
    pub free_time_pickup_drop: Option<String>,
    pub free_time_delivery_live: Option<String>,
    pub free_time_delivery_drop: Option<String>,
    pub billing_increment: Option<String>,
    pub rounding_mode: Option<String>,
    pub minimum_minutes: Option<String>,
    pub requires_approval: Option<String>,
    pub auto_charge: Option<String>,
    pub auth_number_required: Option<String>,
    pub is_active: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Parse a boolean-like cell; blank or missing cells yield `default`
pub fn parse_flag(value: &Option<String>, default: bool) -> bool {
    match non_blank(value) {
        None => default,
        Some(v) => matches!(
            v.to_ascii_lowercase().as_str(),
            "true" | "yes" | "y" | "1" | "x" | "on"
        ),
    }
}

fn parse_money(field: &str, value: &Option<String>) -> DetentionResult<Option<Decimal>> {
    let Some(raw) = non_blank(value) else {
        return Ok(None);
    };
    let cleaned: String = raw.chars().filter(|c| *c != '$' && *c != ',').collect();
    let amount = Decimal::from_str(cleaned.trim())
        .map_err(|e| DetentionError::parse(field, format!("'{raw}': {e}")))?;
    if amount.is_sign_negative() {
        return Err(DetentionError::validation(format!("{field} must not be negative")));
    }
    Ok(Some(amount))
}

fn parse_minutes(field: &str, value: &Option<String>) -> DetentionResult<Option<u32>> {
    let Some(raw) = non_blank(value) else {
        return Ok(None);
    };
    if matches!(raw.to_ascii_lowercase().as_str(), "n/a" | "na" | "none" | "-") {
        return Ok(None);
    }
    raw.parse::<u32>()
        .map(Some)
        .map_err(|e| DetentionError::parse(field, format!("'{raw}': {e}")))
}

impl TryFrom<RawBillingRule> for BillingRules {
    type Error = DetentionError;

    fn try_from(raw: RawBillingRule) -> Result<Self, Self::Error> {
        let shipper = non_blank(&raw.shipper)
            .ok_or_else(|| DetentionError::validation("billing rule is missing a shipper"))?
            .to_string();

        let rate = parse_money("Rate", &raw.rate)?
            .ok_or_else(|| DetentionError::validation(format!("{shipper}: Rate is required")))?;
        let max_charge = parse_money("MaxCharge", &raw.max_charge)?.ok_or_else(|| {
            DetentionError::validation(format!("{shipper}: MaxCharge is required"))
        })?;
        if max_charge <= Decimal::ZERO {
            return Err(DetentionError::validation(format!(
                "{shipper}: MaxCharge must be greater than zero"
            )));
        }
        let rate_unit = match non_blank(&raw.rate_unit) {
            Some(unit) => unit.parse()?,
            None => RateUnit::PerHour,
        };

        let free_time = FreeTimeTable {
            pickup_live: parse_minutes("FreeTimePickupLive", &raw.free_time_pickup_live)?,
            pickup_drop_hook: parse_minutes("FreeTimePickupDrop", &raw.free_time_pickup_drop)?,
            delivery_live: parse_minutes("FreeTimeDeliveryLive", &raw.free_time_delivery_live)?,
            delivery_drop_hook: parse_minutes(
                "FreeTimeDeliveryDrop",
                &raw.free_time_delivery_drop,
            )?,
        };

        Ok(BillingRules {
            shipper,
            rate,
            rate_unit,
            max_charge,
            free_time,
            billing_increment_minutes: parse_minutes("BillingIncrement", &raw.billing_increment)?
                .filter(|increment| *increment > 0),
            rounding_mode: non_blank(&raw.rounding_mode).map(RoundingMode::parse_lenient),
            minimum_chargeable_minutes: parse_minutes("MinimumMinutes", &raw.minimum_minutes)?,
            requires_approval: parse_flag(&raw.requires_approval, false),
            auto_charge_allowed: parse_flag(&raw.auto_charge, false),
            auth_number_required: parse_flag(&raw.auth_number_required, false),
            // A missing IsActive cell keeps the rule active
            is_active: parse_flag(&raw.is_active, true),
        })
    }
}

/// In-memory billing-rules source keyed by case-insensitive shipper name
#[derive(Debug, Clone, Default)]
pub struct StaticRulesCatalog {
    rules: HashMap<String, Arc<BillingRules>>,
}

impl StaticRulesCatalog {
    pub fn new(rules: impl IntoIterator<Item = BillingRules>) -> Self {
        let rules = rules
            .into_iter()
            .filter(|rule| rule.is_active)
            .map(|rule| (rule.shipper.trim().to_lowercase(), Arc::new(rule)))
            .collect();
        Self { rules }
    }

    /// Parse raw rows, skipping (and logging) rows that fail validation
    pub fn from_raw(rows: impl IntoIterator<Item = RawBillingRule>) -> Self {
        let parsed = rows.into_iter().filter_map(|row| {
            let shipper = row.shipper.clone().unwrap_or_default();
            match BillingRules::try_from(row) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    warn!(shipper = %shipper, error = %e, "Skipping invalid billing rule row");
                    None
                }
            }
        });
        Self::new(parsed)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl BillingRulesSource for StaticRulesCatalog {
    fn rules_for(&self, shipper: &str) -> Option<Arc<BillingRules>> {
        self.rules.get(&shipper.trim().to_lowercase()).cloned()
    }
}
