//! ChargingRequest entity and its mode/state enumerations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Charging mode: determines which main queue a request enters and
/// which pile type may serve it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Fast,
    Trickle,
}

impl Mode {
    /// The letter used as the queue-number prefix ("F" or "T").
    pub fn letter(self) -> char {
        match self {
            Mode::Fast => 'F',
            Mode::Trickle => 'T',
        }
    }

    /// Parse the wire-level mode strings, including the Chinese labels
    /// used by the original driver client (`快充`/`慢充`).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "FAST" | "快充" => Some(Mode::Fast),
            "TRICKLE" | "慢充" => Some(Mode::Trickle),
            _ => None,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Fast => write!(f, "FAST"),
            Mode::Trickle => write!(f, "TRICKLE"),
        }
    }
}

/// Lifecycle state of a [`ChargingRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestState {
    WaitingMain,
    WaitingAtPile,
    Charging,
    Completed,
    AwaitingPayment,
}

impl RequestState {
    /// Whether this request still counts toward invariant 2 (at most
    /// one active request per car).
    pub fn is_active(self) -> bool {
        !matches!(self, RequestState::Completed)
    }
}

/// A driver's request to charge a car.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargingRequest {
    pub car_id: String,
    pub mode: Mode,
    pub requested_kwh: f64,
    pub request_time: DateTime<Utc>,
    pub state: RequestState,
    pub queue_number: Option<String>,
    pub pile_id: Option<String>,
}

impl ChargingRequest {
    pub fn new(car_id: impl Into<String>, mode: Mode, requested_kwh: f64, now: DateTime<Utc>) -> Self {
        Self {
            car_id: car_id.into(),
            mode,
            requested_kwh,
            request_time: now,
            state: RequestState::WaitingMain,
            queue_number: None,
            pile_id: None,
        }
    }
}
