//! ChargingSession entity: an active metering record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::request::Mode;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargingSession {
    pub session_id: String,
    pub car_id: String,
    pub pile_id: String,
    pub mode: Mode,
    pub power_kw: f64,
    pub start_time: DateTime<Utc>,
    pub requested_kwh: f64,
}

impl ChargingSession {
    /// delivered_kwh = min(power_kw × elapsed_hours, requested_kwh) — invariant 6.
    pub fn delivered_kwh_at(&self, at: DateTime<Utc>) -> f64 {
        let elapsed_hours = (at - self.start_time).num_milliseconds() as f64 / 3_600_000.0;
        let elapsed_hours = elapsed_hours.max(0.0);
        (self.power_kw * elapsed_hours).min(self.requested_kwh)
    }
}
