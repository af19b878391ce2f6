use std::sync::Arc;

use anyhow::{bail, Context};

use keeper_swap::bootstrap::AppState;
use keeper_swap::config::Config;
use keeper_swap::engine::swap_state::SwapDetailsModel;
use keeper_swap::engine::swap_view_model::{StaticBalances, SwapEvent, SwapInput};
use keeper_swap::models::SwapAsset;

async fn find_asset(app_state: &AppState, symbol: &str) -> anyhow::Result<SwapAsset> {
    app_state
        .swap_controller
        .search_assets(symbol)
        .await
        .into_iter()
        .find(|asset| asset.symbol.eq_ignore_ascii_case(symbol))
        .with_context(|| format!("Asset {} is not swappable", symbol))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let send_symbol = args.next().unwrap_or_else(|| "TON".to_string());
    let receive_symbol = args.next().unwrap_or_else(|| "USDT".to_string());
    let amount_text = args.next().unwrap_or_else(|| "1".to_string());

    let config = Config::from_env().context("Failed to load configuration")?;
    let app_state = AppState::new(&config).context("Failed to initialize application state")?;
    let controller = app_state.swap_controller.clone();
    controller.start().await;

    let (send_asset, receive_asset) = futures::try_join!(
        find_asset(&app_state, &send_symbol),
        find_asset(&app_state, &receive_symbol)
    )?;
    if !controller
        .is_pair_exists_for_assets(Some(&send_asset), Some(&receive_asset))
        .await
    {
        bail!("No {}/{} pool on STON.fi", send_asset.symbol, receive_asset.symbol);
    }

    // the demo wallet holds exactly the amount being quoted
    let unformatted = controller.amount_formatter().unformat(&amount_text);
    let (send_amount, _) =
        controller.convert_string_to_amount(&unformatted, send_asset.fraction_digits);
    let balances =
        StaticBalances::new().with_balance(send_asset.contract_address.clone(), send_amount);

    let (view_model, mut events) = app_state.swap_view_model(Arc::new(balances));
    view_model.choose_token(send_asset.clone(), SwapInput::Send).await;
    view_model.choose_token(receive_asset.clone(), SwapInput::Receive).await;
    view_model.input_amount_send(&amount_text);

    let wait = config.simulation_debounce + config.stonfi_timeout;
    let details = tokio::time::timeout(wait, async {
        while let Some(event) = events.recv().await {
            match event {
                SwapEvent::DetailsModel(Some(details)) => return Ok(details),
                SwapEvent::StateModel(_) if view_model.state().is_last_simulation_failed => {
                    bail!("Swap simulation failed")
                }
                _ => {}
            }
        }
        bail!("Swap screen closed before a quote arrived")
    })
    .await
    .context("Timed out waiting for a quote")??;

    let state = view_model.state();
    println!(
        "{} {} -> {} {}",
        state.operation.send.amount,
        send_asset.symbol,
        state.operation.receive.amount,
        receive_asset.symbol
    );
    print_details(&details);
    println!("{:<18}{:?}", "State:", state.swap_state);

    controller.stop();
    Ok(())
}

fn print_details(details: &SwapDetailsModel) {
    println!("{:<18}{}", "Rate:", details.swap_rate);
    for row in &details.info_rows {
        println!("{:<18}{}", format!("{}:", row.title), row.value);
    }
}
