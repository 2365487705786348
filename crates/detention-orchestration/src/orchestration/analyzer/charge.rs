//! Minute rounding and charge arithmetic.

use rust_decimal::{Decimal, RoundingStrategy};

use detention_shared::models::{RateUnit, RoundingMode};

/// Snap `minutes` to a multiple of `increment`.
///
/// `Nearest` breaks ties upward. A zero increment leaves `minutes` untouched.
pub fn apply_increment(minutes: i64, increment: u32, mode: RoundingMode) -> i64 {
    if increment == 0 || minutes <= 0 {
        return minutes.max(0);
    }
    let k = i64::from(increment);
    let remainder = minutes % k;
    if remainder == 0 {
        return minutes;
    }
    let down = minutes - remainder;
    match mode {
        RoundingMode::Up => down + k,
        RoundingMode::Down => down,
        RoundingMode::Nearest => {
            if remainder * 2 >= k {
                down + k
            } else {
                down
            }
        }
    }
}

/// Charge for `minutes` before and after the cap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChargeComputation {
    pub uncapped: Decimal,
    pub charge: Decimal,
    pub hit_max: bool,
}

pub fn compute_charge(
    minutes: i64,
    rate: Decimal,
    unit: RateUnit,
    max_charge: Decimal,
) -> ChargeComputation {
    let minutes = Decimal::from(minutes.max(0));
    let raw = match unit {
        RateUnit::PerMinute => minutes * rate,
        RateUnit::PerHour => minutes * rate / Decimal::from(60),
    };
    let uncapped = raw.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let hit_max = uncapped >= max_charge;
    let charge = if hit_max { max_charge } else { uncapped };
    ChargeComputation {
        uncapped,
        charge: charge.round_dp(2),
        hit_max,
    }
}
