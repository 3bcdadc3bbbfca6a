//! Bill entity: the immutable, itemized cost record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::request::Mode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub bill_id: String,
    pub car_id: String,
    pub pile_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub delivered_kwh: f64,
    pub mode: Mode,
    pub charge_fee: f64,
    pub service_fee: f64,
    pub total_fee: f64,
}
