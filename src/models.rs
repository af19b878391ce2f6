use std::collections::HashSet;

use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Native coin symbol.
pub const TON_SYMBOL: &str = "TON";

/// Asset record as loaded from the liquidity provider, flags included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StonfiAsset {
    pub contract_address: String,
    pub symbol: String,
    pub display_name: Option<String>,
    pub decimals: usize,
    pub kind: String,
    pub is_community: bool,
    pub is_deprecated: bool,
    pub is_blacklisted: bool,
}

impl StonfiAsset {
    pub fn is_toncoin(&self) -> bool {
        self.symbol == TON_SYMBOL && self.kind.to_uppercase() == "TON"
    }

    /// Wrapped native placeholders and flagged assets are never offered for swaps.
    pub fn is_swappable(&self) -> bool {
        self.kind.to_uppercase() != "WTON"
            && !self.is_community
            && !self.is_deprecated
            && !self.is_blacklisted
    }
}

/// Snapshot of the swappable asset list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assets {
    pub expiration_date: DateTime<Utc>,
    pub items: Vec<StonfiAsset>,
}

impl Assets {
    pub fn new(expiration_date: DateTime<Utc>, items: Vec<StonfiAsset>) -> Self {
        Self { expiration_date, items }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expiration_date && !self.items.is_empty()
    }
}

/// Unordered pair of asset addresses. The two halves are kept sorted so that
/// `(a, b)` and `(b, a)` hash and compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairKey(String, String);

impl PairKey {
    pub fn new(one: &str, two: &str) -> Self {
        if one <= two {
            Self(one.to_string(), two.to_string())
        } else {
            Self(two.to_string(), one.to_string())
        }
    }
}

/// Snapshot of the tradeable pair graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pairs {
    pub expiration_date: DateTime<Utc>,
    pub pairs: HashSet<PairKey>,
}

impl Pairs {
    pub fn new(expiration_date: DateTime<Utc>, pairs: HashSet<PairKey>) -> Self {
        Self { expiration_date, pairs }
    }

    pub fn has_pair(&self, key_one: &str, key_two: &str) -> bool {
        self.pairs.contains(&PairKey::new(key_one, key_two))
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expiration_date && !self.pairs.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Ton,
    Jetton,
}

/// Asset as presented to the swap screen.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SwapAsset {
    pub contract_address: String,
    pub kind: AssetKind,
    pub symbol: String,
    pub display_name: String,
    pub fraction_digits: usize,
}

impl From<&StonfiAsset> for SwapAsset {
    fn from(asset: &StonfiAsset) -> Self {
        let kind = if asset.is_toncoin() { AssetKind::Ton } else { AssetKind::Jetton };
        Self {
            contract_address: asset.contract_address.clone(),
            kind,
            symbol: asset.symbol.clone(),
            display_name: asset.display_name.clone().unwrap_or_else(|| asset.symbol.clone()),
            fraction_digits: asset.decimals,
        }
    }
}

/// Raw quote as returned by the quoting endpoint, in smallest units.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapQuote {
    pub offer_units: BigUint,
    pub ask_units: BigUint,
    pub min_ask_units: BigUint,
    pub fee_units: BigUint,
    pub swap_rate: Decimal,
    pub price_impact: Decimal,
}

/// Display-ready simulation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapSimulationModel {
    pub send_amount: String,
    pub receive_amount: String,
    pub swap_rate: SwapRate,
    pub info: SwapInfo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRate {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapInfo {
    pub price_impact: String,
    pub minimum_received: String,
    pub liquidity_provider_fee: String,
    pub blockchain_fee: String,
    pub route: SwapRoute,
    pub provider_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRoute {
    pub token_symbol_send: String,
    pub token_symbol_receive: String,
}
