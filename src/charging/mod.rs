//! Charging service (§4.5): request intake, session start/end, and
//! the fault/recovery protocol.

pub mod service;

pub use service::{ChargingService, Wake};
