//! In-memory store backend.

use async_trait::async_trait;
use dashmap::DashMap;

use super::traits::Store;

/// `DashMap`-backed store used by the engine by default and throughout
/// tests — matches the reference stack's `InMemoryStorage`.
pub struct InMemoryStore<V> {
    entries: DashMap<String, V>,
}

impl<V> InMemoryStore<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<V> Default for InMemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> Store<V> for InMemoryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn put(&self, key: &str, value: V) {
        self.entries.insert(key.to_string(), value);
    }

    async fn put_if_absent(&self, key: &str, value: V) -> bool {
        use dashmap::mapref::entry::Entry;
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }

    async fn get(&self, key: &str) -> Option<V> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    async fn get_all(&self) -> Vec<V> {
        self.entries.iter().map(|e| e.value().clone()).collect()
    }

    async fn delete(&self, key: &str) -> Option<V> {
        self.entries.remove(key).map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_if_absent_rejects_existing_key() {
        let store: InMemoryStore<i32> = InMemoryStore::new();
        assert!(store.put_if_absent("a", 1).await);
        assert!(!store.put_if_absent("a", 2).await);
        assert_eq!(store.get("a").await, Some(1));
    }

    #[tokio::test]
    async fn delete_returns_removed_value() {
        let store: InMemoryStore<&'static str> = InMemoryStore::new();
        store.put("k", "v").await;
        assert_eq!(store.delete("k").await, Some("v"));
        assert_eq!(store.get("k").await, None);
    }
}
