//! # Detention Analyzer
//!
//! Pure per-stop decision function. Given a stop, its timestamps, the
//! shipper's billing rules, the order status and the detention lines already
//! on the stop, it produces an [`AnalysisResult`] without touching any I/O.
//!
//! ## Decision ladder (first match wins)
//!
//! ```text
//! cancelled/rejected        -> ORDER_CANCELLED          no action
//! invoiced/paid             -> ORDER_INVOICED           no action
//! non-zero charge on stop   -> CHARGE_EXISTS            no action
//! no timestamps             -> FMC_DATA_UNAVAILABLE     pending retry
//! no arrival                -> MISSING_ARRIVAL          pending retry
//! no departure              -> MISSING_DEPARTURE        pending retry
//! no free time for combo    -> NO_DETENTION_DROP_HOOK   release hold | no action
//! late beyond threshold     -> DRIVER_LATE              release hold | no action
//! chargeable <= 0           -> WITHIN_FREE_TIME | NO_HOLD_NO_CHARGE
//! below minimum             -> BELOW_MINIMUM_THRESHOLD  release hold | no action
//! otherwise                 -> CHARGEABLE               policy matrix
//! ```

pub mod charge;

use rust_decimal::Decimal;

use detention_shared::config::AnalyzerConfig;
use detention_shared::models::{
    AnalysisResult, BillingRules, Classification, DetentionAction, ExistingHold, OrderStatus,
    ProcessingState, RateUnit, Stop, StopTimestamps,
};

pub use charge::{apply_increment, compute_charge, ChargeComputation};

/// Deterministic detention analyzer
#[derive(Debug, Clone, Default)]
pub struct DetentionAnalyzer {
    config: AnalyzerConfig,
}

/// Per-stop verdict before it is expanded into an [`AnalysisResult`]
struct Verdict {
    classification: Classification,
    action: DetentionAction,
    charge: Decimal,
    hit_max: bool,
    chargeable_minutes: i64,
    breakdown: String,
}

impl Verdict {
    fn new(classification: Classification, action: DetentionAction, breakdown: String) -> Self {
        Self {
            classification,
            action,
            charge: Decimal::ZERO,
            hit_max: false,
            chargeable_minutes: 0,
            breakdown,
        }
    }
}

fn release_or_nothing(existing: &ExistingHold) -> DetentionAction {
    if existing.has_hold() {
        DetentionAction::Release
    } else {
        DetentionAction::NoAction
    }
}

fn rate_label(rate: Decimal, unit: RateUnit) -> String {
    match unit {
        RateUnit::PerMinute => format!("${rate:.2}/min"),
        RateUnit::PerHour => format!("${rate:.2}/hr"),
    }
}

impl DetentionAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyze one stop
    pub fn analyze(
        &self,
        stop: &Stop,
        timestamps: Option<&StopTimestamps>,
        rules: &BillingRules,
        order_status: OrderStatus,
        existing: &ExistingHold,
        stop_index: usize,
    ) -> AnalysisResult {
        let verdict = self.decide(stop, timestamps, rules, order_status, existing);

        AnalysisResult {
            stop_index,
            stop_type: stop.stop_type,
            classification: verdict.classification,
            action: verdict.action,
            charge: verdict.charge,
            hit_max: verdict.hit_max,
            chargeable_minutes: verdict.chargeable_minutes,
            breakdown: verdict.breakdown,
            has_hold: existing.has_hold(),
            hold_line_id: existing.hold_line_id.clone(),
            existing_charge: existing.existing_charge,
            requires_approval: rules.requires_approval,
            auto_charge_allowed: rules.auto_charge_allowed,
            auth_number_required: rules.auth_number_required,
            processing: ProcessingState::Unprocessed,
        }
    }

    fn decide(
        &self,
        stop: &Stop,
        timestamps: Option<&StopTimestamps>,
        rules: &BillingRules,
        order_status: OrderStatus,
        existing: &ExistingHold,
    ) -> Verdict {
        use Classification as C;
        use DetentionAction as A;

        if order_status.is_cancelled() {
            return Verdict::new(C::OrderCancelled, A::NoAction, format!("Order is {order_status}"));
        }
        if order_status.is_invoiced() {
            return Verdict::new(C::OrderInvoiced, A::NoAction, format!("Order is {order_status}"));
        }
        if existing.existing_charge > Decimal::ZERO {
            return Verdict::new(
                C::ChargeExists,
                A::NoAction,
                format!("Detention of ${:.2} already charged", existing.existing_charge),
            );
        }

        let Some(ts) = timestamps else {
            return Verdict::new(
                C::FmcDataUnavailable,
                A::PendingRetry,
                "No execution timestamps available".to_string(),
            );
        };
        if ts.actual_arrival.is_none() {
            return Verdict::new(C::MissingArrival, A::PendingRetry, "No recorded arrival".to_string());
        }
        if ts.actual_departure.is_none() {
            return Verdict::new(
                C::MissingDeparture,
                A::PendingRetry,
                "No recorded departure".to_string(),
            );
        }

        let Some(free_minutes) = rules.free_time.minutes_for(stop.stop_type, stop.load_type) else {
            return Verdict::new(
                C::NoDetentionDropHook,
                release_or_nothing(existing),
                format!("{} {} stops are not eligible for detention", stop.load_type, stop.stop_type),
            );
        };

        if let Some(late) = ts.arrival_lateness_minutes() {
            if late > self.config.driver_late_threshold_minutes {
                return Verdict::new(
                    C::DriverLate,
                    release_or_nothing(existing),
                    format!(
                        "Driver arrived {late} min late (threshold {} min)",
                        self.config.driver_late_threshold_minutes
                    ),
                );
            }
        }

        let delay = ts.departure_delay_minutes().unwrap_or(0).max(0);
        let chargeable = delay - i64::from(free_minutes);
        let mut breakdown = format!("Delay {delay} min - free {free_minutes} min = {chargeable} min");

        if chargeable <= 0 {
            let classification = if existing.has_hold() {
                C::WithinFreeTime
            } else {
                C::NoHoldNoCharge
            };
            breakdown.push_str(" (within free time)");
            return Verdict::new(classification, release_or_nothing(existing), breakdown);
        }

        if let Some(minimum) = rules.minimum_chargeable_minutes {
            if chargeable < i64::from(minimum) {
                breakdown.push_str(&format!(" (below {minimum} min minimum)"));
                let mut verdict =
                    Verdict::new(C::BelowMinimumThreshold, release_or_nothing(existing), breakdown);
                verdict.chargeable_minutes = chargeable;
                return verdict;
            }
        }

        let billed = match rules.rounding() {
            Some((increment, mode)) => {
                let rounded = apply_increment(chargeable, increment, mode);
                if rounded != chargeable {
                    breakdown.push_str(&format!(
                        ", rounded {mode:?} to {rounded} min ({increment} min increment)"
                    ));
                }
                rounded
            }
            None => chargeable,
        };

        if billed <= 0 {
            // Rounding down erased the billable time entirely
            breakdown.push_str(" (nothing billable after rounding)");
            let mut verdict =
                Verdict::new(C::BelowMinimumThreshold, release_or_nothing(existing), breakdown);
            verdict.chargeable_minutes = chargeable;
            return verdict;
        }

        let computation = compute_charge(billed, rules.rate, rules.rate_unit, rules.max_charge);
        breakdown.push_str(&format!(
            "; {billed} min x {} = ${:.2}",
            rate_label(rules.rate, rules.rate_unit),
            computation.uncapped
        ));
        if computation.hit_max {
            breakdown.push_str(&format!(", capped at ${:.2}", rules.max_charge));
        }

        let action = match (rules.auto_charge_allowed, rules.requires_approval) {
            (true, false) if existing.has_hold() => A::UpdateCharge,
            (true, false) => A::CreateCharge,
            (_, true) => A::PendingApproval,
            (false, false) => A::AnalysisOnly,
        };

        Verdict {
            classification: C::Chargeable,
            action,
            charge: computation.charge,
            hit_max: computation.hit_max,
            chargeable_minutes: chargeable,
            breakdown,
        }
    }
}
