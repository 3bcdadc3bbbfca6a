//! ID generation.

use uuid::Uuid;

/// Generate a UUIDv4 string, used for session and bill ids.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
