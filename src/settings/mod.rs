// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Persistent settings addressed by dotted keys (`editor.fontSize`).
//!
//! The document is loaded lazily on first access and written through to disk
//! on every mutation. One async mutex guards the document across load and
//! persist, so concurrent first accesses share a single load and mutations
//! never interleave.

/// Default schema and backfill rules.
pub mod schema;

use serde::Serialize;
use serde_json::{Map, Value};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::bridge::error::{ServiceError, ServiceResult};
use crate::config::EnvironmentDefaults;
pub use schema::{SCHEMA_VERSION, SettingsSchema};

/// Result of a settings lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum SettingValue {
    /// The key exists; `null` is a legitimate stored value.
    Defined(Value),
    /// Some segment of the key is absent.
    Undefined,
}

/// Write-through settings store backed by a JSON file.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    defaults: Map<String, Value>,
    document: Mutex<Option<Map<String, Value>>>,
    loads: AtomicUsize,
}

impl SettingsStore {
    /// Creates a store for the document at `path`. Nothing is read until the
    /// first access.
    #[must_use]
    pub fn new(path: PathBuf, env: &EnvironmentDefaults) -> Self {
        let defaults = match SettingsSchema::defaults(env).to_document() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            path,
            defaults,
            document: Mutex::new(None),
            loads: AtomicUsize::new(0),
        }
    }

    /// Path of the persisted document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Looks up a dotted key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for empty keys or empty segments.
    pub async fn get(&self, key: &str) -> ServiceResult<SettingValue> {
        let segments = split_key(key)?;
        let mut guard = self.document.lock().await;
        let document = self.ensure_loaded(&mut guard).await;

        debug!(key, "Getting setting");
        Ok(lookup(document, &segments).map_or(SettingValue::Undefined, |v| {
            SettingValue::Defined(v.clone())
        }))
    }

    /// Sets a dotted key, creating or overwriting intermediate objects, and
    /// persists the whole document before returning.
    ///
    /// The in-memory document only changes once the write succeeded.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for malformed keys and `Persistence` if the
    /// document cannot be written.
    pub async fn set(&self, key: &str, value: Value) -> ServiceResult<()> {
        let segments = split_key(key)?;
        let mut guard = self.document.lock().await;
        let mut updated = self.ensure_loaded(&mut guard).await.clone();

        debug!(key, "Setting value");
        assign(&mut updated, &segments, value);
        self.persist(&updated).await?;

        *guard = Some(updated);
        Ok(())
    }

    /// Replaces the document with the defaults and persists it.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the document cannot be written.
    pub async fn reset(&self) -> ServiceResult<()> {
        info!("Resetting settings to defaults");
        let mut guard = self.document.lock().await;
        let defaults = self.defaults.clone();
        self.persist(&defaults).await?;
        *guard = Some(defaults);
        Ok(())
    }

    /// Snapshot of the whole document.
    pub async fn snapshot(&self) -> Value {
        let mut guard = self.document.lock().await;
        Value::Object(self.ensure_loaded(&mut guard).await.clone())
    }

    #[cfg(test)]
    fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    async fn ensure_loaded<'a>(
        &self,
        slot: &'a mut Option<Map<String, Value>>,
    ) -> &'a mut Map<String, Value> {
        if slot.is_none() {
            let loads = self.loads.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(loads, path = %self.path.display(), "Loading settings");
            *slot = Some(self.load().await);
        }
        slot.get_or_insert_with(Map::new)
    }

    /// Reads the persisted document, falling back to defaults.
    async fn load(&self) -> Map<String, Value> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let defaults = self.defaults.clone();
                match self.persist(&defaults).await {
                    Ok(()) => info!(path = %self.path.display(), "Created default settings file"),
                    Err(e) => warn!(error = %e, "Using in-memory default settings"),
                }
                return defaults;
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Failed to load settings");
                return self.defaults.clone();
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(mut document)) => {
                let filled = schema::backfill(&mut document, &self.defaults);
                info!(filled, "Settings loaded");
                document
            }
            Ok(_) => {
                error!(path = %self.path.display(), "Settings document is not an object");
                self.defaults.clone()
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Failed to parse settings");
                self.defaults.clone()
            }
        }
    }

    /// Writes the document to a temporary sibling, then renames it into
    /// place.
    async fn persist(&self, document: &Map<String, Value>) -> ServiceResult<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(ServiceError::Persistence)?;
        }

        let data = serde_json::to_string_pretty(document)
            .map_err(|e| ServiceError::Persistence(io::Error::other(e)))?;

        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        tokio::fs::write(&staging, data)
            .await
            .map_err(ServiceError::Persistence)?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(ServiceError::Persistence)?;

        debug!("Settings saved");
        Ok(())
    }
}

fn split_key(key: &str) -> ServiceResult<Vec<&str>> {
    let segments: Vec<&str> = key.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(ServiceError::InvalidRequest(format!(
            "invalid settings key '{key}'"
        )));
    }
    Ok(segments)
}

fn lookup<'a>(document: &'a Map<String, Value>, segments: &[&str]) -> Option<&'a Value> {
    let (first, rest) = segments.split_first()?;
    rest.iter()
        .try_fold(document.get(*first)?, |node, segment| {
            node.as_object()?.get(*segment)
        })
}

fn assign(document: &mut Map<String, Value>, segments: &[&str], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    let node = document.entry((*first).to_string()).or_insert(Value::Null);
    if rest.is_empty() {
        *node = value;
        return;
    }
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(child) = node {
        assign(child, rest, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> SettingsStore {
        SettingsStore::new(
            dir.path().join("settings.json"),
            &EnvironmentDefaults::default(),
        )
    }

    fn on_disk(dir: &TempDir) -> Result<Value> {
        let raw = std::fs::read_to_string(dir.path().join("settings.json"))?;
        Ok(serde_json::from_str(&raw)?)
    }

    #[tokio::test]
    async fn test_first_access_creates_default_file() -> Result<()> {
        let dir = TempDir::new()?;
        let store = store(&dir);

        let size = store.get("editor.fontSize").await?;

        assert_eq!(size, SettingValue::Defined(json!(14)));
        assert_eq!(on_disk(&dir)?["editor"]["tabSize"], json!(2));
        Ok(())
    }

    #[tokio::test]
    async fn test_set_then_get_nested() -> Result<()> {
        let dir = TempDir::new()?;
        let store = store(&dir);

        store.set("a.b.c", json!({"deep": true})).await?;

        assert_eq!(
            store.get("a.b.c").await?,
            SettingValue::Defined(json!({"deep": true}))
        );
        assert_eq!(store.get("a.b.x").await?, SettingValue::Undefined);
        assert_eq!(store.get("a.b.c.deep.more").await?, SettingValue::Undefined);
        assert_eq!(on_disk(&dir)?["a"]["b"]["c"]["deep"], json!(true));
        Ok(())
    }

    #[tokio::test]
    async fn test_set_overwrites_scalar_on_path() -> Result<()> {
        let dir = TempDir::new()?;
        let store = store(&dir);

        store.set("editor.fontSize.small", json!(10)).await?;

        assert_eq!(
            store.get("editor.fontSize").await?,
            SettingValue::Defined(json!({"small": 10}))
        );
        assert_eq!(
            store.get("editor.tabSize").await?,
            SettingValue::Defined(json!(2))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_null_is_defined() -> Result<()> {
        let dir = TempDir::new()?;
        let store = store(&dir);

        store.set("ai.defaultModel", Value::Null).await?;

        assert_eq!(
            store.get("ai.defaultModel").await?,
            SettingValue::Defined(Value::Null)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_reset_is_idempotent() -> Result<()> {
        let dir = TempDir::new()?;
        let store = store(&dir);
        store.set("editor.fontSize", json!(22)).await?;

        store.reset().await?;
        let once = on_disk(&dir)?;
        store.reset().await?;
        let twice = on_disk(&dir)?;

        assert_eq!(once, twice);
        assert_eq!(store.snapshot().await, once);
        assert_eq!(once["editor"]["fontSize"], json!(14));
        Ok(())
    }

    #[tokio::test]
    async fn test_existing_document_is_backfilled() -> Result<()> {
        let dir = TempDir::new()?;
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"editor": {"fontSize": 20}, "extra": 1}"#,
        )?;
        let store = store(&dir);

        assert_eq!(
            store.get("editor.fontSize").await?,
            SettingValue::Defined(json!(20))
        );
        assert_eq!(
            store.get("editor.minimap").await?,
            SettingValue::Defined(json!(true))
        );
        assert_eq!(store.get("extra").await?, SettingValue::Defined(json!(1)));
        assert_eq!(
            store.get("version").await?,
            SettingValue::Defined(json!(SCHEMA_VERSION))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_document_falls_back_without_overwriting() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json")?;
        let store = store(&dir);

        assert_eq!(
            store.get("terminal.fontSize").await?,
            SettingValue::Defined(json!(12))
        );
        assert_eq!(std::fs::read_to_string(&path)?, "{ not json");
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_keys_rejected() -> Result<()> {
        let dir = TempDir::new()?;
        let store = store(&dir);

        for key in ["", ".", "editor.", ".editor", "a..b"] {
            assert!(
                matches!(store.get(key).await, Err(ServiceError::InvalidRequest(_))),
                "{key:?}"
            );
        }
        assert!(matches!(
            store.set("", json!(1)).await,
            Err(ServiceError::InvalidRequest(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_persist_keeps_memory_unchanged() -> Result<()> {
        let dir = TempDir::new()?;
        // The parent "directory" is a regular file, so every write fails.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "")?;
        let store = SettingsStore::new(
            blocker.join("settings.json"),
            &EnvironmentDefaults::default(),
        );

        assert_eq!(
            store.get("editor.fontSize").await?,
            SettingValue::Defined(json!(14))
        );
        assert!(matches!(
            store.set("editor.fontSize", json!(30)).await,
            Err(ServiceError::Persistence(_))
        ));
        assert_eq!(
            store.get("editor.fontSize").await?,
            SettingValue::Defined(json!(14))
        );
        assert!(matches!(
            store.reset().await,
            Err(ServiceError::Persistence(_))
        ));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_access_loads_once() -> Result<()> {
        let dir = TempDir::new()?;
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"editor": {"fontSize": 16}}"#,
        )?;
        let store = Arc::new(store(&dir));
        assert_eq!(store.load_count(), 0);

        let mut writers = Vec::new();
        let mut readers = Vec::new();
        for i in 0..16 {
            let writer = Arc::clone(&store);
            writers.push(tokio::spawn(async move {
                writer.set(&format!("counters.c{i}"), json!(i)).await
            }));
            let reader = Arc::clone(&store);
            readers.push(tokio::spawn(
                async move { reader.get("editor.fontSize").await },
            ));
        }
        for writer in writers {
            writer.await??;
        }
        for reader in readers {
            assert_eq!(reader.await??, SettingValue::Defined(json!(16)));
        }

        assert_eq!(store.load_count(), 1);
        let disk = on_disk(&dir)?;
        for i in 0..16 {
            assert_eq!(disk["counters"][format!("c{i}")], json!(i));
        }
        assert_eq!(disk["editor"]["fontSize"], json!(16));
        Ok(())
    }

    #[test]
    fn test_lookup_walks_objects_only() {
        let doc = match json!({"a": {"b": [1, 2]}, "s": "text"}) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        assert_eq!(lookup(&doc, &["a", "b"]), Some(&json!([1, 2])));
        assert_eq!(lookup(&doc, &["a", "b", "0"]), None);
        assert_eq!(lookup(&doc, &["s", "len"]), None);
    }
}
