//! Derived swap screen state and the display models built from it.
//!
//! Nothing here touches the network or mutable state: the view model feeds the
//! current inputs in and publishes whatever comes out.
use crate::models::{SwapSimulationModel, TON_SYMBOL};

pub const ZERO_AMOUNT: &str = "0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapState {
    EnterAmount,
    ChooseToken,
    InsufficientBalanceTon,
    InsufficientBalance { token_symbol: String },
    ContinueSwap,
    SimulationFail,
}

/// What is left of the send balance after the typed amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Remaining {
    Remaining(String),
    Insufficient,
}

impl Remaining {
    pub fn value(&self) -> &str {
        match self {
            Remaining::Remaining(value) => value,
            Remaining::Insufficient => ZERO_AMOUNT,
        }
    }

    pub fn is_insufficient(&self) -> bool {
        matches!(self, Remaining::Insufficient)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SwapStateInputs<'a> {
    pub amount_send: &'a str,
    pub amount_receive: &'a str,
    pub send_token_symbol: Option<&'a str>,
    pub has_receive_token: bool,
    pub send_balance_remaining: &'a Remaining,
    pub has_quote: bool,
    pub is_last_simulation_failed: bool,
}

/// A failed last simulation overrides every other combination.
pub fn recalculate_swap_state(inputs: &SwapStateInputs<'_>) -> SwapState {
    if inputs.is_last_simulation_failed {
        return SwapState::SimulationFail;
    }

    let has_send_token = inputs.send_token_symbol.is_some();
    let has_receive_token = inputs.has_receive_token;
    let is_zero = |amount: &str| amount == ZERO_AMOUNT;
    let is_blank = |amount: &str| amount.is_empty() || is_zero(amount);

    let inputs_are_not_empty = !is_blank(inputs.amount_send) && !is_blank(inputs.amount_receive);
    let can_continue_swap = inputs_are_not_empty
        && inputs.has_quote
        && !inputs.send_balance_remaining.is_insufficient();

    let send_zero = is_zero(inputs.amount_send);
    let receive_zero = is_zero(inputs.amount_receive);

    match (has_send_token, has_receive_token) {
        (true, true) if send_zero && receive_zero => SwapState::EnterAmount,
        (true, false) if send_zero => SwapState::EnterAmount,
        (false, true) if receive_zero => SwapState::ChooseToken,
        (true, _) if inputs.send_balance_remaining.is_insufficient() => {
            insufficient_state(inputs.send_token_symbol.unwrap_or_default())
        }
        (true, false) | (false, true) => SwapState::ChooseToken,
        (true, true) if can_continue_swap => SwapState::ContinueSwap,
        _ => SwapState::EnterAmount,
    }
}

fn insufficient_state(symbol: &str) -> SwapState {
    if symbol.to_uppercase() == TON_SYMBOL {
        SwapState::InsufficientBalanceTon
    } else {
        SwapState::InsufficientBalance { token_symbol: symbol.to_string() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFieldState {
    Active,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary,
    Secondary,
}

/// Action the host screen should run when the button is tapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapAction {
    BuyTon,
    Continue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionButtonModel {
    pub title: String,
    pub style: ButtonStyle,
    pub is_enabled: bool,
    pub is_activity: bool,
    pub action: Option<SwapAction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapStateModel {
    pub send_text_field_state: TextFieldState,
    pub action_button: ActionButtonModel,
}

pub fn swap_state_model(state: &SwapState, is_resolving: bool, has_quote: bool) -> SwapStateModel {
    let send_text_field_state = match state {
        SwapState::InsufficientBalance { .. } => TextFieldState::Error,
        _ => TextFieldState::Active,
    };
    SwapStateModel {
        send_text_field_state,
        action_button: action_button(state, is_resolving, has_quote),
    }
}

fn action_button(state: &SwapState, is_resolving: bool, has_quote: bool) -> ActionButtonModel {
    let secondary =
        |title: &str, is_enabled: bool, is_activity: bool, action: Option<SwapAction>| {
            ActionButtonModel {
                title: title.to_string(),
                style: ButtonStyle::Secondary,
                is_enabled,
                is_activity,
                action,
            }
        };
    let waiting_for_quote = is_resolving && !has_quote;

    match state {
        SwapState::EnterAmount => secondary("Enter Amount", !is_resolving, is_resolving, None),
        SwapState::ChooseToken => secondary("Choose Token", !is_resolving, is_resolving, None),
        SwapState::InsufficientBalanceTon => secondary(
            "Insufficient Balance. Buy TON",
            true,
            waiting_for_quote,
            Some(SwapAction::BuyTon),
        ),
        SwapState::InsufficientBalance { token_symbol } => secondary(
            &format!("Insufficient {} balance", token_symbol),
            true,
            waiting_for_quote,
            None,
        ),
        SwapState::ContinueSwap => ActionButtonModel {
            title: "Continue".to_string(),
            style: ButtonStyle::Primary,
            is_enabled: !is_resolving,
            is_activity: is_resolving,
            action: Some(SwapAction::Continue),
        },
        SwapState::SimulationFail => secondary("Simulation fail", true, false, None),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapModel {
    pub title: String,
}

impl Default for SwapModel {
    fn default() -> Self {
        Self { title: "Swap".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenButtonModel {
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapInputContainerModel {
    pub header_title: String,
    pub balance_title: Option<String>,
    pub has_max_button: bool,
    pub token_button: TokenButtonModel,
    pub is_input_enabled: bool,
}

pub fn balance_title(balance: &str) -> String {
    format!("Balance: {}", balance)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapInfoRow {
    pub title: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapDetailsModel {
    pub swap_rate: String,
    pub info_rows: Vec<SwapInfoRow>,
}

impl From<&SwapSimulationModel> for SwapDetailsModel {
    fn from(model: &SwapSimulationModel) -> Self {
        let route = &model.info.route;
        let receive = &route.token_symbol_receive;
        let row = |title: &str, value: String| SwapInfoRow { title: title.to_string(), value };

        Self {
            swap_rate: format!(
                "1 {} ≈ {} {}",
                route.token_symbol_send, model.swap_rate.value, receive
            ),
            info_rows: vec![
                row("Price impact", format!("{}%", model.info.price_impact)),
                row("Minimum received", format!("{} {}", model.info.minimum_received, receive)),
                row(
                    "Liquidity provider fee",
                    format!("{} {}", model.info.liquidity_provider_fee, receive),
                ),
                row("Blockchain fee", model.info.blockchain_fee.clone()),
                row("Route", format!("{} » {}", route.token_symbol_send, receive)),
                row("Provider", model.info.provider_name.clone()),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SwapInfo, SwapRate, SwapRoute};

    fn inputs<'a>(
        amount_send: &'a str,
        amount_receive: &'a str,
        send_token_symbol: Option<&'a str>,
        has_receive_token: bool,
        remaining: &'a Remaining,
    ) -> SwapStateInputs<'a> {
        SwapStateInputs {
            amount_send,
            amount_receive,
            send_token_symbol,
            has_receive_token,
            send_balance_remaining: remaining,
            has_quote: false,
            is_last_simulation_failed: false,
        }
    }

    #[test]
    fn test_enter_amount_and_choose_token() {
        let ok = Remaining::Remaining("10".to_string());
        let state = |send, receive, token, has_receive| {
            recalculate_swap_state(&inputs(send, receive, token, has_receive, &ok))
        };
        assert_eq!(state("0", "0", Some("TON"), true), SwapState::EnterAmount);
        assert_eq!(state("0", "5", Some("TON"), false), SwapState::EnterAmount);
        assert_eq!(state("1", "0", None, true), SwapState::ChooseToken);
        assert_eq!(state("1", "0", Some("TON"), false), SwapState::ChooseToken);
        assert_eq!(state("0", "0", None, false), SwapState::EnterAmount);
    }

    #[test]
    fn test_insufficient_balance_variants() {
        let insufficient = Remaining::Insufficient;
        assert_eq!(
            recalculate_swap_state(&inputs("150", "780", Some("TON"), true, &insufficient)),
            SwapState::InsufficientBalanceTon
        );
        assert_eq!(
            recalculate_swap_state(&inputs("150", "0", Some("USDT"), true, &insufficient)),
            SwapState::InsufficientBalance { token_symbol: "USDT".to_string() }
        );
    }

    #[test]
    fn test_continue_requires_quote_and_amounts() {
        let ok = Remaining::Remaining("10".to_string());
        let mut state = inputs("300", "1 561.23", Some("TON"), true, &ok);
        assert_eq!(recalculate_swap_state(&state), SwapState::EnterAmount);

        state.has_quote = true;
        assert_eq!(recalculate_swap_state(&state), SwapState::ContinueSwap);

        state.amount_receive = "";
        assert_eq!(recalculate_swap_state(&state), SwapState::EnterAmount);
    }

    #[test]
    fn test_failure_overrides_everything() {
        let insufficient = Remaining::Insufficient;
        let mut state = inputs("150", "0", Some("TON"), true, &insufficient);
        state.is_last_simulation_failed = true;
        assert_eq!(recalculate_swap_state(&state), SwapState::SimulationFail);
    }

    #[test]
    fn test_action_buttons() {
        let model = swap_state_model(&SwapState::ContinueSwap, false, true);
        assert_eq!(model.action_button.style, ButtonStyle::Primary);
        assert!(model.action_button.is_enabled);
        assert_eq!(model.action_button.action, Some(SwapAction::Continue));

        let resolving = swap_state_model(&SwapState::EnterAmount, true, false);
        assert!(!resolving.action_button.is_enabled);
        assert!(resolving.action_button.is_activity);

        let ton = swap_state_model(&SwapState::InsufficientBalanceTon, true, true);
        assert!(!ton.action_button.is_activity);
        assert_eq!(ton.action_button.action, Some(SwapAction::BuyTon));
        assert_eq!(ton.send_text_field_state, TextFieldState::Active);

        let jetton = swap_state_model(
            &SwapState::InsufficientBalance { token_symbol: "USDT".to_string() },
            false,
            false,
        );
        assert_eq!(jetton.action_button.title, "Insufficient USDT balance");
        assert_eq!(jetton.send_text_field_state, TextFieldState::Error);
        assert_eq!(jetton.action_button.action, None);

        let failed = swap_state_model(&SwapState::SimulationFail, true, false);
        assert!(failed.action_button.is_enabled);
        assert!(!failed.action_button.is_activity);
    }

    #[test]
    fn test_details_model_rows() {
        let simulation = SwapSimulationModel {
            send_amount: "300".to_string(),
            receive_amount: "1 561.234567".to_string(),
            swap_rate: SwapRate { value: "5.2041".to_string() },
            info: SwapInfo {
                price_impact: "0.12".to_string(),
                minimum_received: "1 553.4283".to_string(),
                liquidity_provider_fee: "4.6837".to_string(),
                blockchain_fee: "0.08 - 0.25 TON".to_string(),
                route: SwapRoute {
                    token_symbol_send: "TON".to_string(),
                    token_symbol_receive: "USDT".to_string(),
                },
                provider_name: "STON.fi".to_string(),
            },
        };

        let details = SwapDetailsModel::from(&simulation);
        assert_eq!(details.swap_rate, "1 TON ≈ 5.2041 USDT");
        assert_eq!(details.info_rows[0].value, "0.12%");
        assert_eq!(details.info_rows[1].value, "1 553.4283 USDT");
        assert_eq!(details.info_rows[4].value, "TON » USDT");
        assert_eq!(details.info_rows.len(), 6);
    }
}
