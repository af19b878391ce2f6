use std::sync::{Arc, Mutex, RwLock};

use num_bigint::BigUint;
use rust_decimal::Decimal;

use crate::chain::stonfi_client::StonfiError;
use crate::chain::swap_service::SwapService;
use crate::math::amount::AmountFormatter;
use crate::models::{
    Assets, Pairs, SwapAsset, SwapInfo, SwapQuote, SwapRate, SwapRoute, SwapSimulationModel,
};
use crate::stores::{ObservationToken, StonfiAssetsStore, StonfiPairsStore};

pub const PROVIDER_NAME: &str = "STON.fi";
pub const BLOCKCHAIN_FEE: &str = "0.08 - 0.25 TON";

const SWAP_RATE_DIGITS: u32 = 4;
const PRICE_IMPACT_DIGITS: u32 = 3;
const DETAILS_AMOUNT_DIGITS: usize = 4;

#[derive(Debug, Clone)]
pub struct SwapSettings {
    pub slippage_tolerance: Decimal,
    pub referral_address: Option<String>,
    pub amount_formatter: AmountFormatter,
}

impl Default for SwapSettings {
    fn default() -> Self {
        Self {
            slippage_tolerance: Decimal::new(5, 3),
            referral_address: None,
            amount_formatter: AmountFormatter::default(),
        }
    }
}

#[derive(Default)]
struct ControllerState {
    assets: Assets,
    pairs: Pairs,
}

/// Sits between the swap screen and the asset/pair stores and quoting service.
/// Keeps its own copy of both snapshots, kept current through store events.
pub struct SwapController {
    assets_store: Arc<StonfiAssetsStore>,
    pairs_store: Arc<StonfiPairsStore>,
    swap_service: Arc<dyn SwapService>,
    settings: SwapSettings,
    state: RwLock<ControllerState>,
    observation_tokens: Mutex<Vec<ObservationToken>>,
}

impl SwapController {
    pub fn new(
        assets_store: Arc<StonfiAssetsStore>,
        pairs_store: Arc<StonfiPairsStore>,
        swap_service: Arc<dyn SwapService>,
        settings: SwapSettings,
    ) -> Self {
        Self {
            assets_store,
            pairs_store,
            swap_service,
            settings,
            state: RwLock::new(ControllerState::default()),
            observation_tokens: Mutex::new(Vec::new()),
        }
    }

    /// Subscribe to both stores, load assets, and refresh pairs in the background.
    /// Store subscriptions are made once until [`stop`](Self::stop).
    pub async fn start(self: &Arc<Self>) {
        {
            let mut tokens = self.observation_tokens.lock().unwrap_or_else(|e| e.into_inner());
            if tokens.is_empty() {
                let assets_token = self.assets_store.add_event_observer(
                    self,
                    |controller: &SwapController, assets: &Assets| {
                        controller.did_update_assets(assets.clone())
                    },
                );
                let pairs_token = self.pairs_store.add_event_observer(
                    self,
                    |controller: &SwapController, pairs: &Pairs| {
                        controller.did_update_pairs(pairs.clone())
                    },
                );
                tokens.extend([assets_token, pairs_token]);
            } else {
                log::debug!("Swap controller already observing stores");
            }
        }

        self.update_assets().await;

        let controller = Arc::clone(self);
        tokio::spawn(async move {
            controller.update_pairs().await;
        });
    }

    /// Stop following store events.
    pub fn stop(&self) {
        let tokens: Vec<_> = self
            .observation_tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        for token in tokens {
            token.cancel();
        }
    }

    pub async fn update_assets(&self) {
        let assets = self.assets_store.get_assets().await;
        self.did_update_assets(assets);
    }

    pub async fn update_pairs(&self) {
        let pairs = self.pairs_store.get_pairs().await;
        self.did_update_pairs(pairs);
    }

    /// The native coin, if the asset list offers it.
    pub async fn get_initial_swap_asset(&self) -> Option<SwapAsset> {
        let assets = self.stonfi_assets().await;
        assets.items.iter().find(|a| a.is_toncoin()).map(SwapAsset::from)
    }

    /// An unset side never conflicts.
    pub async fn is_pair_exists_for_assets(
        &self,
        asset_one: Option<&SwapAsset>,
        asset_two: Option<&SwapAsset>,
    ) -> bool {
        let (Some(asset_one), Some(asset_two)) = (asset_one, asset_two) else {
            return true;
        };
        let pairs = self.stonfi_pairs().await;
        pairs.has_pair(&asset_one.contract_address, &asset_two.contract_address)
    }

    pub async fn simulate_direct_swap(
        &self,
        send_amount: &BigUint,
        send_asset: &SwapAsset,
        receive_asset: &SwapAsset,
    ) -> Result<SwapSimulationModel, StonfiError> {
        log::debug!(
            "Direct simulation {} {} -> {}",
            send_amount,
            send_asset.symbol,
            receive_asset.symbol
        );
        let quote = self
            .swap_service
            .simulate_direct_swap(
                &send_asset.contract_address,
                &receive_asset.contract_address,
                send_amount,
                self.settings.slippage_tolerance,
                self.settings.referral_address.clone(),
            )
            .await?;
        Ok(self.map_swap_simulation(&quote, send_asset, receive_asset))
    }

    pub async fn simulate_reverse_swap(
        &self,
        receive_amount: &BigUint,
        send_asset: &SwapAsset,
        receive_asset: &SwapAsset,
    ) -> Result<SwapSimulationModel, StonfiError> {
        log::debug!(
            "Reverse simulation {} -> {} {}",
            send_asset.symbol,
            receive_amount,
            receive_asset.symbol
        );
        let quote = self
            .swap_service
            .simulate_reverse_swap(
                &send_asset.contract_address,
                &receive_asset.contract_address,
                receive_amount,
                self.settings.slippage_tolerance,
                self.settings.referral_address.clone(),
            )
            .await?;
        Ok(self.map_swap_simulation(&quote, send_asset, receive_asset))
    }

    /// Assets whose symbol or name contains `query`, symbol-prefix matches first.
    pub async fn search_assets(&self, query: &str) -> Vec<SwapAsset> {
        let assets = self.stonfi_assets().await;
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return assets.items.iter().map(SwapAsset::from).collect();
        }

        let mut prefix_matches = Vec::new();
        let mut other_matches = Vec::new();
        for asset in &assets.items {
            let symbol = asset.symbol.to_lowercase();
            let name = asset.display_name.as_deref().unwrap_or_default().to_lowercase();
            if symbol.starts_with(&query) {
                prefix_matches.push(SwapAsset::from(asset));
            } else if symbol.contains(&query) || name.contains(&query) {
                other_matches.push(SwapAsset::from(asset));
            }
        }
        prefix_matches.extend(other_matches);
        prefix_matches
    }

    pub fn convert_string_to_amount(
        &self,
        string: &str,
        target_fraction_digits: usize,
    ) -> (BigUint, usize) {
        self.settings
            .amount_formatter
            .string_to_amount(string, target_fraction_digits)
    }

    pub fn convert_amount_to_string(
        &self,
        amount: &BigUint,
        fraction_digits: usize,
        maximum_fraction_digits: Option<usize>,
    ) -> String {
        self.settings
            .amount_formatter
            .amount_to_string(amount, fraction_digits, maximum_fraction_digits)
    }

    pub fn amount_formatter(&self) -> &AmountFormatter {
        &self.settings.amount_formatter
    }

    fn did_update_assets(&self, assets: Assets) {
        self.state.write().unwrap_or_else(|e| e.into_inner()).assets = assets;
    }

    fn did_update_pairs(&self, pairs: Pairs) {
        self.state.write().unwrap_or_else(|e| e.into_inner()).pairs = pairs;
    }

    async fn stonfi_assets(&self) -> Assets {
        let local = self.state.read().unwrap_or_else(|e| e.into_inner()).assets.clone();
        if local.is_valid() {
            local
        } else {
            self.assets_store.get_assets().await
        }
    }

    async fn stonfi_pairs(&self) -> Pairs {
        let local = self.state.read().unwrap_or_else(|e| e.into_inner()).pairs.clone();
        if local.is_valid() {
            local
        } else {
            self.pairs_store.get_pairs().await
        }
    }

    fn map_swap_simulation(
        &self,
        quote: &SwapQuote,
        send_asset: &SwapAsset,
        receive_asset: &SwapAsset,
    ) -> SwapSimulationModel {
        let formatter = &self.settings.amount_formatter;
        let receive_digits = receive_asset.fraction_digits;

        let price_impact_percent = quote
            .price_impact
            .checked_mul(Decimal::ONE_HUNDRED)
            .unwrap_or(quote.price_impact);

        SwapSimulationModel {
            send_amount: self.convert_amount_to_string(
                &quote.offer_units,
                send_asset.fraction_digits,
                None,
            ),
            receive_amount: self.convert_amount_to_string(&quote.ask_units, receive_digits, None),
            swap_rate: SwapRate {
                value: formatter.format_decimal(quote.swap_rate, SWAP_RATE_DIGITS),
            },
            info: SwapInfo {
                price_impact: formatter.format_decimal(price_impact_percent, PRICE_IMPACT_DIGITS),
                minimum_received: self.convert_amount_to_string(
                    &quote.min_ask_units,
                    receive_digits,
                    Some(DETAILS_AMOUNT_DIGITS),
                ),
                liquidity_provider_fee: self.convert_amount_to_string(
                    &quote.fee_units,
                    receive_digits,
                    Some(DETAILS_AMOUNT_DIGITS),
                ),
                blockchain_fee: BLOCKCHAIN_FEE.to_string(),
                route: SwapRoute {
                    token_symbol_send: send_asset.symbol.clone(),
                    token_symbol_receive: receive_asset.symbol.clone(),
                },
                provider_name: PROVIDER_NAME.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use std::time::Duration;

    use crate::chain::stonfi_client::MockStonfiApi;
    use crate::chain::swap_service::MockSwapService;
    use crate::models::StonfiAsset;
    use crate::storage::MemoryStorage;
    use crate::stores::expiration_after;

    fn asset(symbol: &str, kind: &str, decimals: usize, name: Option<&str>) -> StonfiAsset {
        StonfiAsset {
            contract_address: format!("EQ_{}", symbol),
            symbol: symbol.to_string(),
            display_name: name.map(str::to_string),
            decimals,
            kind: kind.to_string(),
            is_community: false,
            is_deprecated: false,
            is_blacklisted: false,
        }
    }

    fn default_api() -> MockStonfiApi {
        let mut api = MockStonfiApi::new();
        api.expect_get_assets().returning(|| {
            Ok(vec![
                asset("TON", "Ton", 9, Some("Toncoin")),
                asset("USDT", "Jetton", 6, Some("Tether USD")),
                asset("NOT", "Jetton", 9, Some("Notcoin")),
                asset("jUSDT", "Jetton", 6, Some("USDT Bridged")),
            ])
        });
        api.expect_get_pairs()
            .returning(|| Ok(vec![("EQ_USDT".to_string(), "EQ_TON".to_string())]));
        api
    }

    fn controller_with(api: MockStonfiApi, service: MockSwapService) -> Arc<SwapController> {
        let api = Arc::new(api);
        let storage = Arc::new(MemoryStorage::new());
        let ttl = Duration::from_secs(3600);
        Arc::new(SwapController::new(
            Arc::new(StonfiAssetsStore::with_api(api.clone(), storage.clone(), ttl)),
            Arc::new(StonfiPairsStore::with_api(api, storage, ttl)),
            Arc::new(service),
            SwapSettings::default(),
        ))
    }

    fn ton() -> SwapAsset {
        SwapAsset::from(&asset("TON", "Ton", 9, Some("Toncoin")))
    }

    fn usdt() -> SwapAsset {
        SwapAsset::from(&asset("USDT", "Jetton", 6, Some("Tether USD")))
    }

    fn quote() -> SwapQuote {
        SwapQuote {
            offer_units: BigUint::from(300_000_000_000u64),
            ask_units: BigUint::from(1_561_234_567u64),
            min_ask_units: BigUint::from(1_553_428_394u64),
            fee_units: BigUint::from(4_683_703u64),
            swap_rate: Decimal::from_str("5.20411522").unwrap(),
            price_impact: Decimal::from_str("0.0012").unwrap(),
        }
    }

    #[tokio::test]
    async fn test_initial_swap_asset_is_native_coin() {
        let controller = controller_with(default_api(), MockSwapService::new());
        controller.start().await;

        let initial = controller.get_initial_swap_asset().await.expect("TON is listed");
        assert_eq!(initial.symbol, "TON");
        assert_eq!(initial.fraction_digits, 9);
    }

    #[tokio::test]
    async fn test_pair_lookup() {
        let controller = controller_with(default_api(), MockSwapService::new());
        controller.start().await;

        let not = SwapAsset::from(&asset("NOT", "Jetton", 9, None));
        assert!(controller.is_pair_exists_for_assets(None, Some(&ton())).await);
        assert!(controller.is_pair_exists_for_assets(Some(&ton()), None).await);
        assert!(controller.is_pair_exists_for_assets(Some(&ton()), Some(&usdt())).await);
        assert!(!controller.is_pair_exists_for_assets(Some(&not), Some(&usdt())).await);
    }

    #[tokio::test]
    async fn test_direct_simulation_is_mapped_for_display() {
        let mut service = MockSwapService::new();
        service
            .expect_simulate_direct_swap()
            .times(1)
            .returning(|from, to, amount, slippage, referral| {
                assert_eq!(from, "EQ_TON");
                assert_eq!(to, "EQ_USDT");
                assert_eq!(amount, &BigUint::from(300_000_000_000u64));
                assert_eq!(slippage, Decimal::new(5, 3));
                assert!(referral.is_none());
                Ok(quote())
            });
        let controller = controller_with(default_api(), service);

        let model = controller
            .simulate_direct_swap(&BigUint::from(300_000_000_000u64), &ton(), &usdt())
            .await
            .expect("simulation succeeds");

        assert_eq!(model.send_amount, "300");
        assert_eq!(model.receive_amount, "1 561.234567");
        assert_eq!(model.swap_rate.value, "5.2041");
        assert_eq!(model.info.price_impact, "0.12");
        assert_eq!(model.info.minimum_received, "1 553.4283");
        assert_eq!(model.info.liquidity_provider_fee, "4.6837");
        assert_eq!(model.info.route.token_symbol_send, "TON");
        assert_eq!(model.info.route.token_symbol_receive, "USDT");
        assert_eq!(model.info.provider_name, PROVIDER_NAME);
        assert_eq!(model.info.blockchain_fee, BLOCKCHAIN_FEE);
    }

    #[tokio::test]
    async fn test_reverse_simulation_error_propagates() {
        let mut service = MockSwapService::new();
        service
            .expect_simulate_reverse_swap()
            .times(1)
            .returning(|_, _, _, _, _| {
                Err(StonfiError::Status {
                    endpoint: "/v1/reverse_swap/simulate".to_string(),
                    status: 500,
                })
            });
        let controller = controller_with(default_api(), service);

        let result = controller
            .simulate_reverse_swap(&BigUint::from(10_000_000u64), &ton(), &usdt())
            .await;
        assert!(matches!(result, Err(StonfiError::Status { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_search_assets_prefers_symbol_prefix() {
        let controller = controller_with(default_api(), MockSwapService::new());
        controller.start().await;

        let symbols: Vec<_> = controller
            .search_assets("usdt")
            .await
            .into_iter()
            .map(|a| a.symbol)
            .collect();
        assert_eq!(symbols, vec!["USDT", "jUSDT"]);

        let by_name: Vec<_> =
            controller.search_assets("coin").await.into_iter().map(|a| a.symbol).collect();
        assert_eq!(by_name, vec!["NOT", "TON"]);

        assert_eq!(controller.search_assets("  ").await.len(), 4);
    }

    #[tokio::test]
    async fn test_store_events_update_local_snapshot() {
        let controller = controller_with(default_api(), MockSwapService::new());
        controller.start().await;

        let replacement = Assets::new(
            expiration_after(Duration::from_secs(3600)),
            vec![asset("USDT", "Jetton", 6, None)],
        );
        controller.assets_store.set_assets(replacement).await;

        assert!(controller.get_initial_swap_asset().await.is_none());

        controller.stop();
        controller
            .assets_store
            .set_assets(Assets::new(
                expiration_after(Duration::from_secs(3600)),
                vec![asset("TON", "Ton", 9, None)],
            ))
            .await;
        // no longer observing: the local snapshot still holds the USDT-only list
        assert!(controller.get_initial_swap_asset().await.is_none());
    }

    #[tokio::test]
    async fn test_repeated_start_subscribes_once() {
        let controller = controller_with(default_api(), MockSwapService::new());
        controller.start().await;
        controller.start().await;
        controller.start().await;
        assert_eq!(controller.observation_tokens.lock().unwrap().len(), 2);

        controller.stop();
        assert!(controller.observation_tokens.lock().unwrap().is_empty());

        controller.start().await;
        assert_eq!(controller.observation_tokens.lock().unwrap().len(), 2);
    }
}
