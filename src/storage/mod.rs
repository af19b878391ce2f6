//! Best-effort durable storage for cache snapshots, keyed by cache type.
use std::{collections::HashMap, path::PathBuf, sync::Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotKey {
    Assets,
    Pairs,
}

impl SnapshotKey {
    pub fn file_name(&self) -> &'static str {
        match self {
            SnapshotKey::Assets => "stonfi_assets.json",
            SnapshotKey::Pairs => "stonfi_pairs.json",
        }
    }
}

#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// `Ok(None)` when nothing has been stored under `key` yet.
    async fn load(&self, key: SnapshotKey) -> Result<Option<String>>;

    async fn save(&self, key: SnapshotKey, value: &str) -> Result<()>;
}

/// One JSON file per snapshot inside `dir`.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: SnapshotKey) -> PathBuf {
        self.dir.join(key.file_name())
    }
}

#[async_trait]
impl SnapshotStorage for FileStorage {
    async fn load(&self, key: SnapshotKey) -> Result<Option<String>> {
        let path = self.path(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    async fn save(&self, key: SnapshotKey, value: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        // Replaced via rename: readers see either the old or the new snapshot
        let path = self.path(key);
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, value)
            .await
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<SnapshotKey, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStorage for MemoryStorage {
    async fn load(&self, key: SnapshotKey) -> Result<Option<String>> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(&key).cloned())
    }

    async fn save(&self, key: SnapshotKey, value: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key, value.to_string());
        Ok(())
    }
}
