//! Identity service (§4.9): registration and login, reduced to the
//! ambient minimum this spec needs — a SHA-256 password digest and a
//! put-if-absent registration. No session tokens, no password-strength
//! policy, no salts or KDF tuning (§1 Non-goals).

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::domain::{Car, User};
use crate::store::Store;
use crate::support::{DomainError, DomainResult};

fn digest(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub struct IdentityService {
    users: Arc<dyn Store<User>>,
}

impl IdentityService {
    pub fn new(users: Arc<dyn Store<User>>) -> Self {
        Self { users }
    }

    /// Registers a new driver and their single car. Fails with
    /// [`DomainError::Conflict`] if `user_id` is already taken.
    pub async fn register(
        &self,
        user_id: &str,
        password: &str,
        car_id: &str,
        battery_capacity_kwh: f64,
    ) -> DomainResult<User> {
        if user_id.is_empty() || password.is_empty() || car_id.is_empty() {
            return Err(DomainError::Validation(
                "user_id, password, and car_id must be non-empty".to_string(),
            ));
        }
        if battery_capacity_kwh <= 0.0 {
            return Err(DomainError::Validation(
                "battery_capacity_kwh must be > 0".to_string(),
            ));
        }

        let user = User {
            user_id: user_id.to_string(),
            password_digest: digest(password),
            car: Car {
                car_id: car_id.to_string(),
                user_id: user_id.to_string(),
                battery_capacity_kwh,
            },
        };

        if !self.users.put_if_absent(user_id, user.clone()).await {
            return Err(DomainError::Conflict(format!("user {user_id} already registered")));
        }
        Ok(user)
    }

    /// Looks up `user_id` and compares its stored digest against
    /// `password`'s. Both "no such user" and "wrong password" surface
    /// as the same [`DomainError::Auth`] to avoid leaking which one it was.
    pub async fn login(&self, user_id: &str, password: &str) -> DomainResult<User> {
        let invalid = || DomainError::Auth("invalid user_id or password".to_string());
        let user = self.users.get(user_id).await.ok_or_else(invalid)?;
        if user.password_digest != digest(password) {
            return Err(invalid());
        }
        Ok(user)
    }
}
