use std::str::FromStr;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use num_bigint::BigUint;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::chain::stonfi_client::{StonfiClient, StonfiError};
use crate::models::SwapQuote;

/// Stateless quoting of a swap in either direction. No retries: an error is
/// returned to the caller as-is.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SwapService: Send + Sync {
    /// Quote for offering exactly `offer_amount` of `from`.
    async fn simulate_direct_swap(
        &self,
        from: &str,
        to: &str,
        offer_amount: &BigUint,
        slippage_tolerance: Decimal,
        referral: Option<String>,
    ) -> Result<SwapQuote, StonfiError>;

    /// Quote for receiving exactly `ask_amount` of `to`.
    async fn simulate_reverse_swap(
        &self,
        from: &str,
        to: &str,
        ask_amount: &BigUint,
        slippage_tolerance: Decimal,
        referral: Option<String>,
    ) -> Result<SwapQuote, StonfiError>;
}

#[derive(Debug, Deserialize)]
struct SwapSimulationDto {
    offer_units: String,
    ask_units: String,
    min_ask_units: String,
    fee_units: String,
    swap_rate: String,
    price_impact: String,
}

impl TryFrom<SwapSimulationDto> for SwapQuote {
    type Error = StonfiError;

    fn try_from(dto: SwapSimulationDto) -> Result<Self, Self::Error> {
        Ok(SwapQuote {
            offer_units: parse_units("offer_units", &dto.offer_units)?,
            ask_units: parse_units("ask_units", &dto.ask_units)?,
            min_ask_units: parse_units("min_ask_units", &dto.min_ask_units)?,
            fee_units: parse_units("fee_units", &dto.fee_units)?,
            swap_rate: parse_ratio("swap_rate", &dto.swap_rate)?,
            price_impact: parse_ratio("price_impact", &dto.price_impact)?,
        })
    }
}

fn parse_units(field: &'static str, raw: &str) -> Result<BigUint, StonfiError> {
    BigUint::from_str(raw.trim()).map_err(|e| StonfiError::InvalidResponse {
        field,
        reason: format!("{} ({:?})", e, raw),
    })
}

fn parse_ratio(field: &'static str, raw: &str) -> Result<Decimal, StonfiError> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|e| StonfiError::InvalidResponse {
            field,
            reason: format!("{} ({:?})", e, raw),
        })
}

fn simulation_query(
    from: &str,
    to: &str,
    units: &BigUint,
    slippage_tolerance: Decimal,
    referral: Option<String>,
) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("offer_address", from.to_string()),
        ("ask_address", to.to_string()),
        ("units", units.to_string()),
        ("slippage_tolerance", slippage_tolerance.to_string()),
    ];
    if let Some(referral) = referral {
        query.push(("referral_address", referral));
    }
    query
}

#[async_trait]
impl SwapService for StonfiClient {
    async fn simulate_direct_swap(
        &self,
        from: &str,
        to: &str,
        offer_amount: &BigUint,
        slippage_tolerance: Decimal,
        referral: Option<String>,
    ) -> Result<SwapQuote, StonfiError> {
        let query = simulation_query(from, to, offer_amount, slippage_tolerance, referral);
        let dto: SwapSimulationDto = self.post_json("v1/swap/simulate", &query).await?;
        SwapQuote::try_from(dto)
    }

    async fn simulate_reverse_swap(
        &self,
        from: &str,
        to: &str,
        ask_amount: &BigUint,
        slippage_tolerance: Decimal,
        referral: Option<String>,
    ) -> Result<SwapQuote, StonfiError> {
        let query = simulation_query(from, to, ask_amount, slippage_tolerance, referral);
        let dto: SwapSimulationDto = self.post_json("v1/reverse_swap/simulate", &query).await?;
        SwapQuote::try_from(dto)
    }
}
