//! ChargingPile entity and its state machine.

use serde::{Deserialize, Serialize};

use super::request::Mode;

/// Operational state of a [`ChargingPile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PileState {
    Idle,
    Charging,
    Faulty,
    Offline,
}

/// Cumulative, all-time counters updated on every `end_charging`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PileCounters {
    pub sessions_served: u64,
    pub total_charging_hours: f64,
    pub total_energy_kwh: f64,
    pub total_income: f64,
}

/// A physical charging point.
///
/// The scheduler (§4.4) assigns directly from the shared per-mode main
/// queue rather than staging cars through a per-pile local queue, so
/// `ChargingPile` carries no local-queue field; `get_pile_queue` reports
/// the main queue for this pile's mode instead (`Router::get_pile_queue`).
/// `local_queue_capacity` is kept as configured, admin-visible metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargingPile {
    pub pile_id: String,
    pub mode: Mode,
    pub power_kw: f64,
    pub state: PileState,
    pub local_queue_capacity: usize,
    pub current_session_id: Option<String>,
    pub counters: PileCounters,
}

impl ChargingPile {
    pub fn new(pile_id: impl Into<String>, mode: Mode, power_kw: f64, local_queue_capacity: usize) -> Self {
        Self {
            pile_id: pile_id.into(),
            mode,
            power_kw,
            state: PileState::Idle,
            local_queue_capacity,
            current_session_id: None,
            counters: PileCounters::default(),
        }
    }

    /// Invariant 1: CHARGING iff a current session is held.
    pub fn invariant_holds(&self) -> bool {
        (self.state == PileState::Charging) == self.current_session_id.is_some()
    }
}
