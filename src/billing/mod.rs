//! Tariff table and billing engine (§4.1).

pub mod tariff;

use chrono::{DateTime, Utc};

use crate::domain::{Bill, ChargingSession};
use crate::support::generate_id;

pub use tariff::compute_cost;

/// Build the itemized [`Bill`] for a session ending at `end_time`.
pub fn build_bill(session: &ChargingSession, end_time: DateTime<Utc>) -> Bill {
    let delivered_kwh = session.delivered_kwh_at(end_time);
    let (charge_fee, service_fee, total_fee) = compute_cost(delivered_kwh, session.start_time, end_time);

    Bill {
        bill_id: generate_id(),
        car_id: session.car_id.clone(),
        pile_id: session.pile_id.clone(),
        start_time: session.start_time,
        end_time,
        delivered_kwh: (delivered_kwh * 100.0).round() / 100.0,
        mode: session.mode,
        charge_fee,
        service_fee,
        total_fee,
    }
}
