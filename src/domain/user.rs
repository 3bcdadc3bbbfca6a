//! User and Car entities.

use serde::{Deserialize, Serialize};

/// A registered driver's car.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Car {
    pub car_id: String,
    pub user_id: String,
    pub battery_capacity_kwh: f64,
}

/// A registered driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    /// SHA-256 hex digest of the password. Not a full credential-
    /// management subsystem (no salt, no KDF tuning) — see §4.9.
    pub password_digest: String,
    pub car: Car,
}
