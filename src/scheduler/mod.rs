//! Scheduler (§4.6) and optional batch dispatcher (§4.7).

pub mod dispatcher;
pub mod tick;

pub use tick::{Scheduler, DEFAULT_TICK_INTERVAL};
