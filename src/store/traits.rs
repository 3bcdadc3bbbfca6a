//! The entity store abstraction (§4.2).
//!
//! Every persisted entity kind (User, ChargingPile, ChargingSession,
//! Bill, ChargingRequest) is kept behind the same small trait; the
//! charging service and queue manager never reach into a concrete
//! backend. Two backends implement it: [`crate::store::memory::InMemoryStore`]
//! (the default, used by tests and the in-process engine) and
//! [`crate::store::json_file::JsonFileStore`] (write-temp-then-rename
//! with rotating backups, used by the server binary).

use async_trait::async_trait;

/// A uniform keyed store for one entity kind.
///
/// Every operation holds a per-store mutex internally and snapshots
/// entities by value, so callers never observe torn state.
#[async_trait]
pub trait Store<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    /// Overwrite whatever is at `key`.
    async fn put(&self, key: &str, value: V);

    /// Insert `value` at `key` only if nothing is there yet. Returns
    /// `false` (without modifying the store) if the key was already
    /// present — used by registration to avoid races.
    async fn put_if_absent(&self, key: &str, value: V) -> bool;

    async fn get(&self, key: &str) -> Option<V>;

    async fn get_all(&self) -> Vec<V>;

    /// Remove and return whatever was at `key`, if anything.
    async fn delete(&self, key: &str) -> Option<V>;
}
