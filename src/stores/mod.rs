//! Time-limited snapshots of the swap asset list and pair graph.
//!
//! Each store owns one snapshot. Reads return it while valid; otherwise the
//! store refreshes from its loader, falling back to the last known snapshot
//! when the refresh fails. Refreshes are serialized by an async mutex, so
//! concurrent readers of an expired snapshot wait for a single fetch.
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{Mutex, MutexGuard};

use crate::storage::{SnapshotKey, SnapshotStorage};

pub mod assets_store;
pub mod observers;
pub mod pairs_store;

pub use assets_store::{AssetsLoader, StonfiAssetsStore};
pub use observers::{ObservationToken, ObserverRegistry};
pub use pairs_store::{PairsLoader, StonfiPairsStore};

pub trait Snapshot: Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    const KEY: SnapshotKey;

    fn is_valid(&self) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Produces a fresh snapshot from the remote source.
#[async_trait]
pub trait SnapshotLoader<T>: Send + Sync {
    async fn load(&self) -> anyhow::Result<T>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Absent,
    Valid,
    Expired,
}

pub struct SnapshotStore<T: Snapshot> {
    loader: Arc<dyn SnapshotLoader<T>>,
    storage: Arc<dyn SnapshotStorage>,
    // None until the persisted snapshot has been read
    snapshot: Mutex<Option<T>>,
    observers: ObserverRegistry<T>,
}

impl<T: Snapshot> SnapshotStore<T> {
    pub fn new(loader: Arc<dyn SnapshotLoader<T>>, storage: Arc<dyn SnapshotStorage>) -> Self {
        Self {
            loader,
            storage,
            snapshot: Mutex::new(None),
            observers: ObserverRegistry::new(),
        }
    }

    /// Current snapshot if valid, otherwise a refreshed one. Never fails: a failed
    /// refresh returns the last known (possibly expired or empty) snapshot.
    pub async fn get(&self) -> T {
        let mut guard = self.locked().await;
        let current = guard.clone().unwrap_or_default();
        if current.is_valid() {
            log::debug!("{:?} cache hit ({} items)", T::KEY, current.len());
            return current;
        }

        log::debug!("{:?} cache expired, refreshing", T::KEY);
        match self.loader.load().await {
            Ok(fresh) => {
                self.replace(&mut guard, fresh.clone()).await;
                fresh
            }
            Err(e) => {
                log::warn!("{:?} refresh failed, serving last known snapshot: {:#}", T::KEY, e);
                current
            }
        }
    }

    /// Refresh regardless of validity. Unlike [`get`](Self::get) the loader error
    /// is returned; the kept snapshot is untouched in that case.
    pub async fn refresh(&self) -> anyhow::Result<T> {
        let mut guard = self.locked().await;
        let fresh = self.loader.load().await?;
        self.replace(&mut guard, fresh.clone()).await;
        Ok(fresh)
    }

    /// Replace the snapshot, persist it and notify observers.
    pub async fn set(&self, snapshot: T) {
        let mut guard = self.locked().await;
        self.replace(&mut guard, snapshot).await;
    }

    pub async fn state(&self) -> CacheState {
        let guard = self.locked().await;
        match guard.as_ref() {
            Some(snapshot) if snapshot.is_valid() => CacheState::Valid,
            Some(snapshot) if !snapshot.is_empty() => CacheState::Expired,
            _ => CacheState::Absent,
        }
    }

    pub fn add_event_observer<O, F>(&self, observer: &Arc<O>, closure: F) -> ObservationToken
    where
        O: Send + Sync + 'static,
        F: Fn(&O, &T) + Send + Sync + 'static,
    {
        self.observers.add_event_observer(observer, closure)
    }

    async fn locked(&self) -> MutexGuard<'_, Option<T>> {
        let mut guard = self.snapshot.lock().await;
        if guard.is_none() {
            *guard = Some(self.load_persisted().await);
        }
        guard
    }

    async fn replace(&self, guard: &mut MutexGuard<'_, Option<T>>, snapshot: T) {
        log::info!("{:?} snapshot replaced ({} items)", T::KEY, snapshot.len());
        **guard = Some(snapshot.clone());

        match serde_json::to_string(&snapshot) {
            Ok(encoded) => {
                if let Err(e) = self.storage.save(T::KEY, &encoded).await {
                    log::warn!("Failed to persist {:?} snapshot: {:#}", T::KEY, e);
                }
            }
            Err(e) => log::warn!("Failed to encode {:?} snapshot: {}", T::KEY, e),
        }

        self.observers.notify(&snapshot);
    }

    async fn load_persisted(&self) -> T {
        match self.storage.load(T::KEY).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                log::warn!("Discarding unreadable {:?} snapshot: {}", T::KEY, e);
                T::default()
            }),
            Ok(None) => T::default(),
            Err(e) => {
                log::warn!("Failed to load {:?} snapshot: {:#}", T::KEY, e);
                T::default()
            }
        }
    }
}

/// `now + ttl`, saturating at the far future.
pub(crate) fn expiration_after(ttl: std::time::Duration) -> DateTime<Utc> {
    Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
