//! `watt_station`: the dispatching and charging-lifecycle engine for
//! an EV charging station — waiting-area admission, per-mode queueing,
//! the per-pile charging state machine, time-of-use billing, and the
//! fault/recovery protocol, behind a JSON-over-TCP request surface.

pub mod billing;
pub mod charging;
pub mod config;
pub mod domain;
pub mod identity;
pub mod queue;
pub mod reports;
pub mod router;
pub mod scheduler;
pub mod server;
pub mod station;
pub mod store;
pub mod support;

pub use config::{default_config_path, AppConfig};
pub use station::{ChargingStation, StoreSet};
