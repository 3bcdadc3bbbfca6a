//! Core business entities: Users, Piles, Requests, Sessions, Bills.

pub mod bill;
pub mod pile;
pub mod request;
pub mod session;
pub mod user;

pub use bill::Bill;
pub use pile::{ChargingPile, PileCounters, PileState};
pub use request::{ChargingRequest, Mode, RequestState};
pub use session::ChargingSession;
pub use user::{Car, User};
