//! JSON-file-backed store backend (§6 "Persisted state").
//!
//! Keeps an in-memory map as the fast path and mirrors every mutation
//! to a single JSON file via write-temp-then-rename. Before replacing
//! the file, the previous version is copied to a timestamped backup;
//! at most five backups per file are retained.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use super::traits::Store;

pub struct JsonFileStore<V> {
    path: PathBuf,
    entries: Mutex<HashMap<String, V>>,
}

impl<V> JsonFileStore<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    /// Open (or create) the store at `path`, loading whatever is
    /// already there.
    pub fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();

        let entries = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            if contents.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&contents)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn flush(&self) {
        let json = {
            let entries = self.entries.lock().expect("store mutex poisoned");
            match serde_json::to_string_pretty(&*entries) {
                Ok(j) => j,
                Err(e) => {
                    warn!("failed to serialize store for {}: {e}", self.path.display());
                    return;
                }
            }
        };

        if let Err(e) = write_with_backup(&self.path, &json) {
            warn!("failed to persist store to {}: {e}", self.path.display());
        }
    }
}

fn write_with_backup(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if path.exists() {
        backup_existing(path)?;
    }

    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

fn backup_existing(path: &Path) -> std::io::Result<()> {
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.f");
    let backup_name = format!(
        "{}.{}.bak",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("store"),
        stamp
    );
    let backup_path = path.with_file_name(backup_name);
    std::fs::copy(path, backup_path)?;
    prune_backups(path)
}

fn prune_backups(path: &Path) -> std::io::Result<()> {
    const MAX_BACKUPS: usize = 5;

    let parent = match path.parent() {
        Some(p) => p,
        None => return Ok(()),
    };
    let prefix = format!(
        "{}.",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("store")
    );

    let mut backups: Vec<PathBuf> = std::fs::read_dir(parent)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(&prefix) && n.ends_with(".bak"))
                .unwrap_or(false)
        })
        .collect();

    backups.sort();

    while backups.len() > MAX_BACKUPS {
        let oldest = backups.remove(0);
        let _ = std::fs::remove_file(oldest);
    }

    Ok(())
}

#[async_trait]
impl<V> Store<V> for JsonFileStore<V>
where
    V: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    async fn put(&self, key: &str, value: V) {
        {
            let mut entries = self.entries.lock().expect("store mutex poisoned");
            entries.insert(key.to_string(), value);
        }
        self.flush();
    }

    async fn put_if_absent(&self, key: &str, value: V) -> bool {
        let inserted = {
            let mut entries = self.entries.lock().expect("store mutex poisoned");
            if entries.contains_key(key) {
                false
            } else {
                entries.insert(key.to_string(), value);
                true
            }
        };
        if inserted {
            self.flush();
        }
        inserted
    }

    async fn get(&self, key: &str) -> Option<V> {
        self.entries.lock().expect("store mutex poisoned").get(key).cloned()
    }

    async fn get_all(&self) -> Vec<V> {
        self.entries
            .lock()
            .expect("store mutex poisoned")
            .values()
            .cloned()
            .collect()
    }

    async fn delete(&self, key: &str) -> Option<V> {
        let removed = self
            .entries
            .lock()
            .expect("store mutex poisoned")
            .remove(key);
        if removed.is_some() {
            self.flush();
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_through_disk() {
        let dir = std::env::temp_dir().join(format!("watt-station-test-{}", crate::support::generate_id()));
        let path = dir.join("widgets.json");

        {
            let store: JsonFileStore<i32> = JsonFileStore::open(&path).unwrap();
            store.put("a", 1).await;
            store.put("b", 2).await;
        }

        let reopened: JsonFileStore<i32> = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("a").await, Some(1));
        assert_eq!(reopened.get("b").await, Some(2));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn keeps_at_most_five_backups() {
        let dir = std::env::temp_dir().join(format!("watt-station-test-{}", crate::support::generate_id()));
        let path = dir.join("widgets.json");
        let store: JsonFileStore<i32> = JsonFileStore::open(&path).unwrap();

        for i in 0..8 {
            store.put(&format!("k{i}"), i).await;
        }

        let backups: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".bak"))
            .collect();
        assert!(backups.len() <= 5);

        std::fs::remove_dir_all(&dir).ok();
    }
}
