use std::{collections::HashSet, sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::chain::stonfi_client::StonfiApi;
use crate::models::{PairKey, Pairs};
use crate::storage::{SnapshotKey, SnapshotStorage};
use crate::stores::{expiration_after, Snapshot, SnapshotLoader, SnapshotStore};

pub type StonfiPairsStore = SnapshotStore<Pairs>;

impl Snapshot for Pairs {
    const KEY: SnapshotKey = SnapshotKey::Pairs;

    fn is_valid(&self) -> bool {
        Pairs::is_valid(self)
    }

    fn len(&self) -> usize {
        self.pairs.len()
    }
}

pub struct PairsLoader {
    api: Arc<dyn StonfiApi>,
    ttl: Duration,
}

impl PairsLoader {
    pub fn new(api: Arc<dyn StonfiApi>, ttl: Duration) -> Self {
        Self { api, ttl }
    }
}

#[async_trait]
impl SnapshotLoader<Pairs> for PairsLoader {
    async fn load(&self) -> anyhow::Result<Pairs> {
        let pairs: HashSet<PairKey> = self
            .api
            .get_pairs()
            .await?
            .iter()
            .map(|(one, two)| PairKey::new(one, two))
            .collect();
        Ok(Pairs::new(expiration_after(self.ttl), pairs))
    }
}

impl SnapshotStore<Pairs> {
    pub fn with_api(
        api: Arc<dyn StonfiApi>,
        storage: Arc<dyn SnapshotStorage>,
        ttl: Duration,
    ) -> Self {
        Self::new(Arc::new(PairsLoader::new(api, ttl)), storage)
    }

    pub async fn get_pairs(&self) -> Pairs {
        self.get().await
    }

    pub async fn set_pairs(&self, pairs: Pairs) {
        self.set(pairs).await
    }
}
