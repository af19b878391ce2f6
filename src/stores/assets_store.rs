use std::{cmp::Ordering, iter::Peekable, str::Chars, sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::chain::stonfi_client::StonfiApi;
use crate::models::Assets;
use crate::storage::{SnapshotKey, SnapshotStorage};
use crate::stores::{expiration_after, Snapshot, SnapshotLoader, SnapshotStore};

pub type StonfiAssetsStore = SnapshotStore<Assets>;

impl Snapshot for Assets {
    const KEY: SnapshotKey = SnapshotKey::Assets;

    fn is_valid(&self) -> bool {
        Assets::is_valid(self)
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// Loads the asset list, drops assets that must not be offered and sorts the
/// rest by symbol.
pub struct AssetsLoader {
    api: Arc<dyn StonfiApi>,
    ttl: Duration,
}

impl AssetsLoader {
    pub fn new(api: Arc<dyn StonfiApi>, ttl: Duration) -> Self {
        Self { api, ttl }
    }
}

#[async_trait]
impl SnapshotLoader<Assets> for AssetsLoader {
    async fn load(&self) -> anyhow::Result<Assets> {
        let fetched = self.api.get_assets().await?;
        let total = fetched.len();

        let mut items: Vec<_> = fetched.into_iter().filter(|a| a.is_swappable()).collect();
        items.sort_by(|a, b| localized_standard_cmp(&a.symbol, &b.symbol));

        log::debug!("Loaded {} swappable assets out of {}", items.len(), total);
        Ok(Assets::new(expiration_after(self.ttl), items))
    }
}

impl SnapshotStore<Assets> {
    pub fn with_api(
        api: Arc<dyn StonfiApi>,
        storage: Arc<dyn SnapshotStorage>,
        ttl: Duration,
    ) -> Self {
        Self::new(Arc::new(AssetsLoader::new(api, ttl)), storage)
    }

    pub async fn get_assets(&self) -> Assets {
        self.get().await
    }

    pub async fn set_assets(&self, assets: Assets) {
        self.set(assets).await
    }
}

/// Finder-style ordering: case-insensitive, runs of digits compared by value.
pub fn localized_standard_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => break,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let l_digits = take_digits(&mut left);
                let r_digits = take_digits(&mut right);
                let l_num = l_digits.trim_start_matches('0');
                let r_num = r_digits.trim_start_matches('0');
                let ord = l_num.len().cmp(&r_num.len()).then_with(|| l_num.cmp(r_num));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(l), Some(r)) => {
                let ord = l.to_lowercase().cmp(r.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                left.next();
                right.next();
            }
        }
    }

    a.cmp(b)
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied().filter(|c| c.is_ascii_digit()) {
        digits.push(c);
        chars.next();
    }
    digits
}
