//! State machine behind the swap screen.
//!
//! All entry points mutate one [`Inner`] under a std mutex that is never held
//! across an await. Every display change is published as a [`SwapEvent`] on an
//! unbounded channel handed out by [`SwapViewModel::new`].
//!
//! Simulations are debounced: each user action aborts the pending timer and
//! schedules a new one. Network calls themselves are never cancelled. Each
//! scheduled simulation carries a request token, and a completion is applied
//! only if its token is still the latest and both selected assets are
//! unchanged.
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

#[cfg(test)]
use mockall::automock;
use num_bigint::BigUint;
use num_traits::Zero;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::chain::stonfi_client::StonfiError;
use crate::engine::swap_controller::SwapController;
use crate::engine::swap_state::{
    balance_title, recalculate_swap_state, swap_state_model, Remaining, SwapDetailsModel,
    SwapInputContainerModel, SwapModel, SwapState, SwapStateInputs, SwapStateModel,
    TokenButtonModel, ZERO_AMOUNT,
};
use crate::models::{SwapAsset, SwapSimulationModel};

/// Wallet balances of the assets offered on the swap screen.
#[cfg_attr(test, automock)]
pub trait TokenBalanceProvider: Send + Sync {
    fn balance(&self, asset: &SwapAsset) -> BigUint;
}

/// Fixed balances keyed by contract address. Unknown assets have none.
#[derive(Debug, Clone, Default)]
pub struct StaticBalances {
    balances: HashMap<String, BigUint>,
}

impl StaticBalances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(mut self, contract_address: impl Into<String>, amount: BigUint) -> Self {
        self.balances.insert(contract_address.into(), amount);
        self
    }
}

impl TokenBalanceProvider for StaticBalances {
    fn balance(&self, asset: &SwapAsset) -> BigUint {
        self.balances
            .get(&asset.contract_address)
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapInput {
    Send,
    Receive,
}

impl SwapInput {
    pub fn opposite(self) -> Self {
        match self {
            SwapInput::Send => SwapInput::Receive,
            SwapInput::Receive => SwapInput::Send,
        }
    }

    fn direction(self) -> SwapSimulationDirection {
        match self {
            SwapInput::Send => SwapSimulationDirection::Direct,
            SwapInput::Receive => SwapSimulationDirection::Reverse,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapSimulationDirection {
    Direct,
    Reverse,
}

impl SwapSimulationDirection {
    /// Side whose amount drives the quote.
    fn driving_input(self) -> SwapInput {
        match self {
            SwapSimulationDirection::Direct => SwapInput::Send,
            SwapSimulationDirection::Reverse => SwapInput::Receive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapToken {
    pub asset: SwapAsset,
    pub balance: BigUint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapLeg {
    pub token: Option<SwapToken>,
    pub amount: String,
}

impl Default for SwapLeg {
    fn default() -> Self {
        Self { token: None, amount: ZERO_AMOUNT.to_string() }
    }
}

impl SwapLeg {
    pub fn asset(&self) -> Option<&SwapAsset> {
        self.token.as_ref().map(|t| &t.asset)
    }
}

/// The two legs of the swap being composed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwapOperationItem {
    pub send: SwapLeg,
    pub receive: SwapLeg,
}

impl SwapOperationItem {
    pub fn leg(&self, input: SwapInput) -> &SwapLeg {
        match input {
            SwapInput::Send => &self.send,
            SwapInput::Receive => &self.receive,
        }
    }

    pub fn leg_mut(&mut self, input: SwapInput) -> &mut SwapLeg {
        match input {
            SwapInput::Send => &mut self.send,
            SwapInput::Receive => &mut self.receive,
        }
    }

    /// Exchange tokens and amounts of both legs in one step.
    pub fn swap_sides(&mut self) {
        std::mem::swap(&mut self.send, &mut self.receive);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapSimulationResult {
    Empty,
    Success(SwapSimulationModel),
    Fail,
}

impl SwapSimulationResult {
    pub fn is_simulation_failed(&self) -> bool {
        matches!(self, SwapSimulationResult::Fail)
    }

    pub fn into_model(self) -> Option<SwapSimulationModel> {
        match self {
            SwapSimulationResult::Success(model) => Some(model),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapEvent {
    Model(SwapModel),
    StateModel(SwapStateModel),
    DetailsModel(Option<SwapDetailsModel>),
    AmountSend(String),
    AmountReceive(String),
    SendTokenBalance(String),
    ReceiveTokenBalance(String),
    SendContainer(SwapInputContainerModel),
    ReceiveContainer(SwapInputContainerModel),
}

/// Read-only copy of the machine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapViewState {
    pub operation: SwapOperationItem,
    pub last_input: SwapInput,
    pub is_resolving: bool,
    pub is_last_simulation_failed: bool,
    pub current_quote: Option<SwapSimulationModel>,
    pub swap_state: SwapState,
    pub send_balance_remaining: Remaining,
    pub receive_balance: String,
}

struct Inner {
    operation: SwapOperationItem,
    send_balance_remaining: Remaining,
    receive_balance: String,
    last_input: SwapInput,
    is_last_simulation_failed: bool,
    current_quote: Option<SwapSimulationModel>,
    swap_state: SwapState,
    is_resolving: bool,
    pending_simulation: Option<JoinHandle<()>>,
    request_token: u64,
    events: UnboundedSender<SwapEvent>,
}

impl Inner {
    fn emit(&self, event: SwapEvent) {
        // receiver gone: nobody is displaying the screen any more
        let _ = self.events.send(event);
    }

    fn update_input_amount(&mut self, input: SwapInput, amount: String) {
        self.operation.leg_mut(input).amount = amount.clone();
        match input {
            SwapInput::Send => self.emit(SwapEvent::AmountSend(amount)),
            SwapInput::Receive => self.emit(SwapEvent::AmountReceive(amount)),
        }
    }

    fn clear_input(&mut self, input: SwapInput) {
        self.update_input_amount(input, ZERO_AMOUNT.to_string());
    }

    fn set_current_quote(&mut self, quote: Option<SwapSimulationModel>) {
        self.current_quote = quote;
        let details = self.current_quote.as_ref().map(SwapDetailsModel::from);
        self.emit(SwapEvent::DetailsModel(details));
    }

    fn set_swap_state(&mut self, state: SwapState) {
        let changed = state != self.swap_state;
        self.swap_state = state;
        if changed && !self.is_resolving {
            self.update_swap_state();
        }
    }

    fn set_resolving(&mut self, is_resolving: bool) {
        if is_resolving != self.is_resolving {
            self.is_resolving = is_resolving;
            self.update_swap_state();
        }
    }

    fn update_swap_state(&self) {
        let model =
            swap_state_model(&self.swap_state, self.is_resolving, self.current_quote.is_some());
        self.emit(SwapEvent::StateModel(model));
    }

    fn recalculate_swap_state(&mut self) {
        let state = recalculate_swap_state(&SwapStateInputs {
            amount_send: &self.operation.send.amount,
            amount_receive: &self.operation.receive.amount,
            send_token_symbol: self.operation.send.asset().map(|a| a.symbol.as_str()),
            has_receive_token: self.operation.receive.token.is_some(),
            send_balance_remaining: &self.send_balance_remaining,
            has_quote: self.current_quote.is_some(),
            is_last_simulation_failed: self.is_last_simulation_failed,
        });
        self.set_swap_state(state);
    }

    fn is_need_start_resolving(&self) -> bool {
        self.operation.send.token.is_some()
            && self.operation.receive.token.is_some()
            && (self.operation.send.amount != ZERO_AMOUNT
                || self.operation.receive.amount != ZERO_AMOUNT)
    }

    fn complete_simulation(&mut self, result: SwapSimulationResult) {
        self.is_last_simulation_failed = result.is_simulation_failed();
        self.set_current_quote(result.into_model());
        self.recalculate_swap_state();
        self.set_resolving(false);
    }

    fn send_container_model(&self) -> SwapInputContainerModel {
        let token = self.operation.send.token.as_ref();
        SwapInputContainerModel {
            header_title: "Send".to_string(),
            balance_title: token.map(|_| balance_title(self.send_balance_remaining.value())),
            has_max_button: token.is_some(),
            token_button: TokenButtonModel { symbol: token.map(|t| t.asset.symbol.clone()) },
            is_input_enabled: token.is_some(),
        }
    }

    fn receive_container_model(&self) -> SwapInputContainerModel {
        let token = self.operation.receive.token.as_ref();
        SwapInputContainerModel {
            header_title: "Receive".to_string(),
            balance_title: token.map(|_| balance_title(&self.receive_balance)),
            has_max_button: false,
            token_button: TokenButtonModel { symbol: token.map(|t| t.asset.symbol.clone()) },
            is_input_enabled: token.is_some(),
        }
    }

    fn update(&self) {
        self.emit(SwapEvent::Model(SwapModel::default()));
        self.emit(SwapEvent::SendContainer(self.send_container_model()));
        self.emit(SwapEvent::ReceiveContainer(self.receive_container_model()));
    }
}

pub struct SwapViewModel {
    controller: Arc<SwapController>,
    balances: Arc<dyn TokenBalanceProvider>,
    debounce: Duration,
    inner: Mutex<Inner>,
}

impl SwapViewModel {
    pub fn new(
        controller: Arc<SwapController>,
        balances: Arc<dyn TokenBalanceProvider>,
        debounce: Duration,
    ) -> (Arc<Self>, UnboundedReceiver<SwapEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let view_model = Arc::new(Self {
            controller,
            balances,
            debounce,
            inner: Mutex::new(Inner {
                operation: SwapOperationItem::default(),
                send_balance_remaining: Remaining::Remaining(ZERO_AMOUNT.to_string()),
                receive_balance: ZERO_AMOUNT.to_string(),
                last_input: SwapInput::Send,
                is_last_simulation_failed: false,
                current_quote: None,
                swap_state: SwapState::EnterAmount,
                is_resolving: false,
                pending_simulation: None,
                request_token: 0,
                events,
            }),
        });
        (view_model, receiver)
    }

    pub fn state(&self) -> SwapViewState {
        let inner = self.lock();
        SwapViewState {
            operation: inner.operation.clone(),
            last_input: inner.last_input,
            is_resolving: inner.is_resolving,
            is_last_simulation_failed: inner.is_last_simulation_failed,
            current_quote: inner.current_quote.clone(),
            swap_state: inner.swap_state.clone(),
            send_balance_remaining: inner.send_balance_remaining.clone(),
            receive_balance: inner.receive_balance.clone(),
        }
    }

    /// Publish the initial models, start the controller and preselect the native coin.
    pub async fn view_did_load(self: &Arc<Self>) {
        {
            let inner = self.lock();
            inner.update();
            inner.update_swap_state();
        }

        self.controller.start().await;
        match self.controller.get_initial_swap_asset().await {
            Some(asset) => self.choose_token(asset, SwapInput::Send).await,
            None => log::warn!("Native coin missing from the asset list"),
        }
    }

    pub fn input_amount_send(self: &Arc<Self>, text: &str) {
        let mut inner = self.lock();
        self.input_amount(&mut inner, text, SwapInput::Send);
    }

    pub fn input_amount_receive(self: &Arc<Self>, text: &str) {
        let mut inner = self.lock();
        self.input_amount(&mut inner, text, SwapInput::Receive);
    }

    /// Type the whole send balance.
    pub fn tap_max(self: &Arc<Self>) {
        let mut inner = self.lock();
        let Some(token) = inner.operation.send.token.clone() else {
            return;
        };
        inner.last_input = SwapInput::Send;

        let digits = token.asset.fraction_digits;
        let balance = self.controller.convert_amount_to_string(&token.balance, digits, None);
        let unformatted = self.controller.amount_formatter().unformat(&balance);
        let (amount, _) = self.controller.convert_string_to_amount(&unformatted, digits);
        let formatted = self.controller.convert_amount_to_string(&amount, digits, None);

        inner.update_input_amount(SwapInput::Send, formatted.clone());
        self.input_amount(&mut inner, &formatted, SwapInput::Send);
    }

    pub fn tap_swap_direction(self: &Arc<Self>) {
        let mut inner = self.lock();
        inner.operation.swap_sides();
        inner.last_input = inner.last_input.opposite();

        let send_amount = inner.operation.send.amount.clone();
        let receive_amount = inner.operation.receive.amount.clone();
        inner.emit(SwapEvent::AmountSend(send_amount));
        inner.emit(SwapEvent::AmountReceive(receive_amount));

        inner.is_last_simulation_failed = false;
        inner.set_current_quote(None);

        self.refresh_all(&mut inner);
        let direction = inner.last_input.direction();
        self.simulate_swap(&mut inner, direction);
    }

    /// Select `asset` on `input`. The opposite token is dropped when the two
    /// assets do not form a pair or are the same asset.
    pub async fn choose_token(self: &Arc<Self>, asset: SwapAsset, input: SwapInput) {
        let new_token = SwapToken { balance: self.balances.balance(&asset), asset };
        let opposite_asset = {
            let mut inner = self.lock();
            let opposite_asset = inner.operation.leg(input.opposite()).asset().cloned();

            if inner.operation.leg(input).asset() != Some(&new_token.asset) {
                inner.is_last_simulation_failed = false;
                inner.set_current_quote(None);
                inner.clear_input(input);
                if input == inner.last_input {
                    inner.clear_input(input.opposite());
                }
            }
            inner.operation.leg_mut(input).token = Some(new_token.clone());
            opposite_asset
        };

        let is_opposite_same = opposite_asset.as_ref() == Some(&new_token.asset);
        let has_pair = self
            .controller
            .is_pair_exists_for_assets(Some(&new_token.asset), opposite_asset.as_ref())
            .await;

        let mut inner = self.lock();
        if !has_pair || is_opposite_same {
            log::debug!(
                "Clearing {:?} token, unusable with {}",
                input.opposite(),
                new_token.asset.symbol
            );
            inner.operation.leg_mut(input.opposite()).token = None;
            inner.clear_input(input.opposite());
            inner.last_input = input;
        }

        self.refresh_all(&mut inner);
        let direction = inner.last_input.direction();
        self.simulate_swap(&mut inner, direction);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn input_amount(self: &Arc<Self>, inner: &mut Inner, text: &str, input: SwapInput) {
        inner.operation.leg_mut(input).amount = text.to_string();
        inner.last_input = input;
        if text == ZERO_AMOUNT {
            inner.clear_input(input.opposite());
        }
        self.update_send_balance(inner);
        self.simulate_swap(inner, input.direction());
    }

    fn refresh_all(&self, inner: &mut Inner) {
        self.update_send_balance(inner);
        self.update_receive_balance(inner);
        inner.update();
    }

    fn parse_amount(&self, text: &str, fraction_digits: usize) -> BigUint {
        let unformatted = self.controller.amount_formatter().unformat(text);
        self.controller.convert_string_to_amount(&unformatted, fraction_digits).0
    }

    fn update_send_balance(&self, inner: &mut Inner) {
        let Some(token) = inner.operation.send.token.as_ref() else {
            inner.send_balance_remaining = Remaining::Insufficient;
            return;
        };

        let digits = token.asset.fraction_digits;
        let input_amount = self.parse_amount(&inner.operation.send.amount, digits);
        inner.send_balance_remaining = if input_amount <= token.balance {
            let remaining = &token.balance - &input_amount;
            Remaining::Remaining(self.controller.convert_amount_to_string(&remaining, digits, None))
        } else {
            Remaining::Insufficient
        };

        let title = balance_title(inner.send_balance_remaining.value());
        inner.emit(SwapEvent::SendTokenBalance(title));
    }

    fn update_receive_balance(&self, inner: &mut Inner) {
        let Some(token) = inner.operation.receive.token.as_ref() else {
            inner.receive_balance = ZERO_AMOUNT.to_string();
            return;
        };

        let balance = self
            .controller
            .convert_amount_to_string(&token.balance, token.asset.fraction_digits, None);
        inner.receive_balance = balance.clone();
        inner.emit(SwapEvent::ReceiveTokenBalance(balance_title(&balance)));
    }

    fn simulate_swap(self: &Arc<Self>, inner: &mut Inner, direction: SwapSimulationDirection) {
        inner.recalculate_swap_state();
        let is_resolving = inner.is_need_start_resolving();
        inner.set_resolving(is_resolving);

        if let Some(pending) = inner.pending_simulation.take() {
            pending.abort();
        }
        inner.request_token += 1;
        let request_token = inner.request_token;

        let view_model: Weak<Self> = Arc::downgrade(self);
        let delay = self.debounce;
        inner.pending_simulation = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(view_model) = view_model.upgrade() {
                view_model.fire_simulation(request_token, direction);
            }
        }));
    }

    fn fire_simulation(self: &Arc<Self>, request_token: u64, direction: SwapSimulationDirection) {
        let mut inner = self.lock();
        if request_token != inner.request_token {
            return;
        }
        inner.pending_simulation = None;

        let (Some(send_asset), Some(receive_asset)) = (
            inner.operation.send.asset().cloned(),
            inner.operation.receive.asset().cloned(),
        ) else {
            inner.complete_simulation(SwapSimulationResult::Empty);
            return;
        };

        let driving = direction.driving_input();
        let driving_asset = match driving {
            SwapInput::Send => &send_asset,
            SwapInput::Receive => &receive_asset,
        };
        let amount =
            self.parse_amount(&inner.operation.leg(driving).amount, driving_asset.fraction_digits);

        if amount.is_zero() {
            inner.is_last_simulation_failed = false;
            inner.clear_input(driving.opposite());
            self.update_send_balance(&mut inner);
            inner.complete_simulation(SwapSimulationResult::Empty);
            return;
        }
        drop(inner);

        log::debug!(
            "Simulating {:?} swap {} -> {} (request {})",
            direction,
            send_asset.symbol,
            receive_asset.symbol,
            request_token
        );
        let view_model = Arc::clone(self);
        tokio::spawn(async move {
            let result = match direction {
                SwapSimulationDirection::Direct => {
                    view_model
                        .controller
                        .simulate_direct_swap(&amount, &send_asset, &receive_asset)
                        .await
                }
                SwapSimulationDirection::Reverse => {
                    view_model
                        .controller
                        .simulate_reverse_swap(&amount, &send_asset, &receive_asset)
                        .await
                }
            };
            view_model.did_receive_simulation(
                request_token,
                direction,
                &send_asset,
                &receive_asset,
                result,
            );
        });
    }

    fn did_receive_simulation(
        &self,
        request_token: u64,
        direction: SwapSimulationDirection,
        send_asset: &SwapAsset,
        receive_asset: &SwapAsset,
        result: Result<SwapSimulationModel, StonfiError>,
    ) {
        let mut inner = self.lock();
        let is_current = request_token == inner.request_token
            && inner.operation.send.asset() == Some(send_asset)
            && inner.operation.receive.asset() == Some(receive_asset);
        if !is_current {
            log::debug!("Dropping stale simulation result (request {})", request_token);
            return;
        }

        let opposite = direction.driving_input().opposite();
        match result {
            Ok(model) => {
                let amount = match opposite {
                    SwapInput::Receive => model.receive_amount.clone(),
                    SwapInput::Send => model.send_amount.clone(),
                };
                inner.update_input_amount(opposite, amount);
                self.update_send_balance(&mut inner);
                inner.complete_simulation(SwapSimulationResult::Success(model));
            }
            Err(e) => {
                log::warn!("Swap simulation failed: {}", e);
                inner.clear_input(opposite);
                inner.complete_simulation(SwapSimulationResult::Fail);
            }
        }
    }
}
