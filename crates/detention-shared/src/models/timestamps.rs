//! Execution timing facts, in epoch milliseconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopTimestamps {
    pub planned_arrival: Option<i64>,
    pub actual_arrival: Option<i64>,
    pub planned_departure: Option<i64>,
    pub actual_departure: Option<i64>,
}

impl StopTimestamps {
    /// Minutes actual departure trails planned departure; dwell time when no
    /// plan exists.
    pub fn departure_delay_minutes(&self) -> Option<i64> {
        let actual = self.actual_departure?;
        let reference = self.planned_departure.or(self.actual_arrival)?;
        Some((actual - reference).div_euclid(60_000))
    }

    /// Minutes actual arrival trails planned arrival
    pub fn arrival_lateness_minutes(&self) -> Option<i64> {
        Some((self.actual_arrival? - self.planned_arrival?).div_euclid(60_000))
    }

    pub fn to_datetime(millis: Option<i64>) -> Option<DateTime<Utc>> {
        millis.and_then(DateTime::from_timestamp_millis)
    }
}

/// Per-stop timestamps for one tour, indexed like the order's stops
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TourTimestamps {
    pub tour_id: String,
    pub stops: Vec<StopTimestamps>,
}

impl TourTimestamps {
    pub fn for_stop(&self, stop_index: usize) -> Option<&StopTimestamps> {
        self.stops.get(stop_index)
    }
}
