// ── Durable cache backing ──
//
// The cache only needs get/set/delete from a durable store. Freshness is
// decided by the cache: a store hands back whatever it has, along with the
// wall-clock time it was written and the TTL it was written with.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// One persisted cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub value: Value,
    pub stored_at: DateTime<Utc>,
    pub ttl_ms: u64,
}

#[async_trait]
pub trait PersistentStore: Send + Sync {
    async fn load(&self, scope: &str, key: &str) -> Result<Option<StoredEntry>, CoreError>;

    async fn store(&self, scope: &str, key: &str, entry: &StoredEntry) -> Result<(), CoreError>;

    async fn delete(&self, scope: &str, key: &str) -> Result<(), CoreError>;

    async fn delete_scope(&self, scope: &str) -> Result<(), CoreError>;

    async fn delete_all(&self) -> Result<(), CoreError>;
}

// ── File-backed store ────────────────────────────────────────────────

/// One JSON file per entry at `<root>/<scope>/<key>.json`.
///
/// Scope and key are escaped so that any string maps to a single path
/// component.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn scope_dir(&self, scope: &str) -> PathBuf {
        self.root.join(escape(scope))
    }

    fn entry_path(&self, scope: &str, key: &str) -> PathBuf {
        self.scope_dir(scope).join(format!("{}.json", escape(key)))
    }
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Percent-escape everything outside `[A-Za-z0-9_-]`.
fn escape(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    for byte in component.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

fn store_error(scope: &str, key: &str, err: impl std::fmt::Display) -> CoreError {
    CoreError::Cache {
        scope: scope.to_owned(),
        key: key.to_owned(),
        message: err.to_string(),
    }
}

fn ignore_missing(result: std::io::Result<()>) -> std::io::Result<()> {
    match result {
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[async_trait]
impl PersistentStore for FileStore {
    async fn load(&self, scope: &str, key: &str) -> Result<Option<StoredEntry>, CoreError> {
        let path = self.entry_path(scope, key);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(store_error(scope, key, err)),
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|err| store_error(scope, key, err))
    }

    async fn store(&self, scope: &str, key: &str, entry: &StoredEntry) -> Result<(), CoreError> {
        let path = self.entry_path(scope, key);
        let body = serde_json::to_vec(entry).map_err(|err| store_error(scope, key, err))?;
        tokio::fs::create_dir_all(self.scope_dir(scope))
            .await
            .map_err(|err| store_error(scope, key, err))?;

        // Write-then-rename so readers never see a torn file. Each write
        // gets its own temp file so overlapping writers cannot collide.
        let tmp = self.scope_dir(scope).join(format!(
            "{}.{}.{}.tmp",
            escape(key),
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|err| store_error(scope, key, err))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|err| store_error(scope, key, err))
    }

    async fn delete(&self, scope: &str, key: &str) -> Result<(), CoreError> {
        ignore_missing(tokio::fs::remove_file(self.entry_path(scope, key)).await)
            .map_err(|err| store_error(scope, key, err))
    }

    async fn delete_scope(&self, scope: &str) -> Result<(), CoreError> {
        ignore_missing(tokio::fs::remove_dir_all(self.scope_dir(scope)).await)
            .map_err(|err| store_error(scope, "*", err))
    }

    async fn delete_all(&self) -> Result<(), CoreError> {
        ignore_missing(tokio::fs::remove_dir_all(&self.root).await)
            .map_err(|err| store_error("*", "*", err))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entry(value: Value) -> StoredEntry {
        StoredEntry {
            value,
            stored_at: Utc::now(),
            ttl_ms: 60_000,
        }
    }

    #[test]
    fn escape_keeps_paths_flat() {
        assert_eq!(escape("8863"), "8863");
        assert_eq!(escape("rust|story/0"), "rust%7Cstory%2F0");
        assert_eq!(escape(".."), "%2E%2E");
    }

    #[tokio::test]
    async fn store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let saved = entry(serde_json::json!({"id": 1}));

        store.store("story", "1", &saved).await.unwrap();
        assert!(dir.path().join("story").join("1.json").exists());
        assert_eq!(store.load("story", "1").await.unwrap(), Some(saved));
        assert_eq!(store.load("story", "2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn concurrent_writes_to_one_key_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let writes = (0..8).map(|n| {
            let store = store.clone();
            tokio::spawn(async move { store.store("story", "1", &entry(serde_json::json!(n))).await })
        });
        for write in futures_util::future::join_all(writes).await {
            write.unwrap().unwrap();
        }

        let loaded = store.load("story", "1").await.unwrap().unwrap();
        assert!(loaded.value.as_u64().is_some_and(|n| n < 8));
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("story"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("1.json")]);
    }

    #[tokio::test]
    async fn deletes_ignore_missing_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("cache"));
        store.delete("story", "1").await.unwrap();
        store.delete_scope("story").await.unwrap();
        store.delete_all().await.unwrap();

        store.store("story", "1", &entry(Value::Null)).await.unwrap();
        store.store("user", "pg", &entry(Value::Null)).await.unwrap();
        store.delete_scope("story").await.unwrap();
        assert!(store.load("story", "1").await.unwrap().is_none());
        assert!(store.load("user", "pg").await.unwrap().is_some());

        store.delete_all().await.unwrap();
        assert!(store.load("user", "pg").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        std::fs::create_dir_all(dir.path().join("story")).unwrap();
        std::fs::write(dir.path().join("story").join("1.json"), b"{not json").unwrap();
        let err = store.load("story", "1").await.unwrap_err();
        assert!(matches!(err, CoreError::Cache { .. }));
    }
}
