// tests/common/mod.rs
// ===================================
// Hand-written fakes of the remote STON.fi sources shared by the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use num_bigint::BigUint;
use rust_decimal::Decimal;
use tokio::sync::Semaphore;

use keeper_swap::chain::stonfi_client::{StonfiApi, StonfiError};
use keeper_swap::chain::swap_service::SwapService;
use keeper_swap::engine::swap_controller::{SwapController, SwapSettings};
use keeper_swap::models::{StonfiAsset, SwapAsset, SwapQuote};
use keeper_swap::storage::{MemoryStorage, SnapshotStorage};
use keeper_swap::stores::{StonfiAssetsStore, StonfiPairsStore};

pub const TTL: Duration = Duration::from_secs(3600);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn stonfi_asset(symbol: &str, kind: &str, decimals: usize) -> StonfiAsset {
    StonfiAsset {
        contract_address: format!("EQ_{}", symbol),
        symbol: symbol.to_string(),
        display_name: None,
        decimals,
        kind: kind.to_string(),
        is_community: false,
        is_deprecated: false,
        is_blacklisted: false,
    }
}

pub fn ton() -> SwapAsset {
    SwapAsset::from(&stonfi_asset("TON", "Ton", 9))
}

pub fn usdt() -> SwapAsset {
    SwapAsset::from(&stonfi_asset("USDT", "Jetton", 6))
}

pub fn not() -> SwapAsset {
    SwapAsset::from(&stonfi_asset("NOT", "Jetton", 9))
}

pub struct FakeApi {
    pub assets: Mutex<Vec<StonfiAsset>>,
    pub pairs: Vec<(String, String)>,
    pub asset_calls: AtomicUsize,
    pub pair_calls: AtomicUsize,
    pub fail: AtomicBool,
    pub latency: Duration,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            assets: Mutex::new(vec![
                stonfi_asset("TON", "Ton", 9),
                stonfi_asset("USDT", "Jetton", 6),
                stonfi_asset("NOT", "Jetton", 9),
            ]),
            pairs: vec![
                ("EQ_TON".to_string(), "EQ_USDT".to_string()),
                ("EQ_NOT".to_string(), "EQ_TON".to_string()),
            ],
            asset_calls: AtomicUsize::new(0),
            pair_calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            latency: Duration::ZERO,
        }
    }
}

impl FakeApi {
    pub fn failing() -> Self {
        let api = Self::default();
        api.fail.store(true, Ordering::SeqCst);
        api
    }

    pub fn asset_calls(&self) -> usize {
        self.asset_calls.load(Ordering::SeqCst)
    }

    pub fn pair_calls(&self) -> usize {
        self.pair_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), StonfiError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(StonfiError::Status { endpoint: "/v1/assets".to_string(), status: 503 })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StonfiApi for FakeApi {
    async fn get_assets(&self) -> Result<Vec<StonfiAsset>, StonfiError> {
        self.asset_calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.check()?;
        Ok(self.assets.lock().unwrap().clone())
    }

    async fn get_pairs(&self) -> Result<Vec<(String, String)>, StonfiError> {
        self.pair_calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.check()?;
        Ok(self.pairs.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationCall {
    pub reverse: bool,
    pub from: String,
    pub to: String,
    pub amount: BigUint,
}

/// Quotes at a fixed rate of `rate` receive units per send unit (in smallest
/// units). When a gate is installed every call waits for one permit.
pub struct FakeSwapService {
    pub calls: Mutex<Vec<SimulationCall>>,
    pub rate: u64,
    pub fail: AtomicBool,
    pub gate: Option<Arc<Semaphore>>,
}

impl Default for FakeSwapService {
    fn default() -> Self {
        Self { calls: Mutex::new(Vec::new()), rate: 5, fail: AtomicBool::new(false), gate: None }
    }
}

impl FakeSwapService {
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        (Self { gate: Some(gate.clone()), ..Self::default() }, gate)
    }

    pub fn failing() -> Self {
        let service = Self::default();
        service.fail.store(true, Ordering::SeqCst);
        service
    }

    pub fn calls(&self) -> Vec<SimulationCall> {
        self.calls.lock().unwrap().clone()
    }

    async fn respond(&self, call: SimulationCall) -> Result<SwapQuote, StonfiError> {
        self.calls.lock().unwrap().push(call.clone());
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(StonfiError::Status {
                endpoint: "/v1/swap/simulate".to_string(),
                status: 500,
            });
        }

        let (offer, ask) = if call.reverse {
            (&call.amount / self.rate, call.amount.clone())
        } else {
            (call.amount.clone(), &call.amount * self.rate)
        };
        Ok(SwapQuote {
            min_ask_units: ask.clone(),
            offer_units: offer,
            ask_units: ask,
            fee_units: BigUint::from(0u8),
            swap_rate: Decimal::from(self.rate),
            price_impact: Decimal::new(1, 3),
        })
    }
}

#[async_trait]
impl SwapService for FakeSwapService {
    async fn simulate_direct_swap(
        &self,
        from: &str,
        to: &str,
        offer_amount: &BigUint,
        _slippage_tolerance: Decimal,
        _referral: Option<String>,
    ) -> Result<SwapQuote, StonfiError> {
        self.respond(SimulationCall {
            reverse: false,
            from: from.to_string(),
            to: to.to_string(),
            amount: offer_amount.clone(),
        })
        .await
    }

    async fn simulate_reverse_swap(
        &self,
        from: &str,
        to: &str,
        ask_amount: &BigUint,
        _slippage_tolerance: Decimal,
        _referral: Option<String>,
    ) -> Result<SwapQuote, StonfiError> {
        self.respond(SimulationCall {
            reverse: true,
            from: from.to_string(),
            to: to.to_string(),
            amount: ask_amount.clone(),
        })
        .await
    }
}

pub fn controller(api: Arc<FakeApi>, service: Arc<FakeSwapService>) -> Arc<SwapController> {
    controller_with_storage(api, service, Arc::new(MemoryStorage::new()))
}

pub fn controller_with_storage(
    api: Arc<FakeApi>,
    service: Arc<FakeSwapService>,
    storage: Arc<dyn SnapshotStorage>,
) -> Arc<SwapController> {
    Arc::new(SwapController::new(
        Arc::new(StonfiAssetsStore::with_api(api.clone(), storage.clone(), TTL)),
        Arc::new(StonfiPairsStore::with_api(api, storage, TTL)),
        service,
        SwapSettings::default(),
    ))
}
