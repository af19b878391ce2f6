use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::chain::stonfi_client::StonfiClient;
use crate::config::Config;
use crate::engine::swap_controller::{SwapController, SwapSettings};
use crate::engine::swap_view_model::{SwapEvent, SwapViewModel, TokenBalanceProvider};
use crate::math::amount::AmountFormatter;
use crate::storage::FileStorage;
use crate::stores::{StonfiAssetsStore, StonfiPairsStore};

pub struct AppState {
    pub config: Config,
    pub stonfi_client: Arc<StonfiClient>,
    pub assets_store: Arc<StonfiAssetsStore>,
    pub pairs_store: Arc<StonfiPairsStore>,
    pub swap_controller: Arc<SwapController>,
}

impl AppState {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let stonfi_client = Arc::new(
            StonfiClient::new(&config.stonfi_api_url, config.stonfi_timeout)
                .context("Failed to create STON.fi client")?,
        );
        let storage = Arc::new(FileStorage::new(config.cache_dir.clone()));

        let assets_store = Arc::new(StonfiAssetsStore::with_api(
            stonfi_client.clone(),
            storage.clone(),
            config.assets_ttl,
        ));
        let pairs_store = Arc::new(StonfiPairsStore::with_api(
            stonfi_client.clone(),
            storage,
            config.pairs_ttl,
        ));

        let settings = SwapSettings {
            slippage_tolerance: config.slippage_tolerance,
            referral_address: config.referral_address.clone(),
            amount_formatter: AmountFormatter::new(
                config.decimal_separator.clone(),
                config.group_separator.clone(),
            ),
        };
        let swap_controller = Arc::new(SwapController::new(
            assets_store.clone(),
            pairs_store.clone(),
            stonfi_client.clone(),
            settings,
        ));

        log::info!(
            "Swap core ready (api {}, cache dir {})",
            stonfi_client.base_url(),
            config.cache_dir.display()
        );

        Ok(AppState {
            config: config.clone(),
            stonfi_client,
            assets_store,
            pairs_store,
            swap_controller,
        })
    }

    pub fn swap_view_model(
        &self,
        balances: Arc<dyn TokenBalanceProvider>,
    ) -> (Arc<SwapViewModel>, UnboundedReceiver<SwapEvent>) {
        SwapViewModel::new(
            self.swap_controller.clone(),
            balances,
            self.config.simulation_debounce,
        )
    }
}
