use std::{env, path::PathBuf, str::FromStr, time::Duration};

use rust_decimal::Decimal;
use thiserror::Error;
use url::Url;

pub const DEFAULT_STONFI_API_URL: &str = "https://api.ston.fi";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} has invalid value {value:?}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub stonfi_api_url: String,
    pub stonfi_timeout: Duration,

    // Swap parameters
    pub slippage_tolerance: Decimal,
    pub referral_address: Option<String>,
    pub simulation_debounce: Duration,

    // Cache validity windows
    pub assets_ttl: Duration,
    pub pairs_ttl: Duration,
    pub cache_dir: PathBuf,

    // Amount rendering
    pub decimal_separator: String,
    pub group_separator: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stonfi_api_url: DEFAULT_STONFI_API_URL.to_string(),
            stonfi_timeout: Duration::from_secs(10),
            slippage_tolerance: Decimal::new(5, 3),
            referral_address: None,
            simulation_debounce: Duration::from_millis(300),
            assets_ttl: Duration::from_secs(60 * 60),
            pairs_ttl: Duration::from_secs(60 * 60),
            cache_dir: env::temp_dir().join("keeper-swap"),
            decimal_separator: ".".to_string(),
            group_separator: " ".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load configuration files (secrets first, then public config)
        dotenv::from_filename("secrets.env").ok();
        dotenv::from_filename("config/swap.env").ok();
        dotenv::dotenv().ok();

        let defaults = Config::default();

        let stonfi_api_url = match env::var("STONFI_API_URL") {
            Ok(raw) => {
                Url::parse(&raw).map_err(|e| ConfigError::InvalidValue {
                    name: "STONFI_API_URL",
                    value: raw.clone(),
                    reason: e.to_string(),
                })?;
                raw
            }
            Err(_) => defaults.stonfi_api_url,
        };

        let decimal_separator =
            env::var("AMOUNT_DECIMAL_SEPARATOR").unwrap_or(defaults.decimal_separator);
        let group_separator =
            env::var("AMOUNT_GROUP_SEPARATOR").unwrap_or(defaults.group_separator);
        validate_separators(&decimal_separator, &group_separator)?;

        Ok(Config {
            stonfi_api_url,
            stonfi_timeout: parse_var("STONFI_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.stonfi_timeout),

            slippage_tolerance: parse_var("SWAP_SLIPPAGE_TOLERANCE")?
                .unwrap_or(defaults.slippage_tolerance),
            referral_address: env::var("SWAP_REFERRAL_ADDRESS").ok().filter(|s| !s.is_empty()),
            simulation_debounce: parse_var("SWAP_DEBOUNCE_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.simulation_debounce),

            assets_ttl: parse_var("ASSETS_CACHE_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.assets_ttl),
            pairs_ttl: parse_var("PAIRS_CACHE_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.pairs_ttl),
            cache_dir: env::var("SWAP_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),

            decimal_separator,
            group_separator,
        })
    }
}

/// The decimal separator must be non-empty, digit-free and distinct from the
/// group separator.
fn validate_separators(decimal: &str, group: &str) -> Result<(), ConfigError> {
    let invalid = |name: &'static str, value: &str, reason: &str| ConfigError::InvalidValue {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    };

    if decimal.is_empty() {
        return Err(invalid("AMOUNT_DECIMAL_SEPARATOR", decimal, "must not be empty"));
    }
    if decimal.chars().any(|c| c.is_ascii_digit()) {
        return Err(invalid("AMOUNT_DECIMAL_SEPARATOR", decimal, "must not contain digits"));
    }
    if group.chars().any(|c| c.is_ascii_digit()) {
        return Err(invalid("AMOUNT_GROUP_SEPARATOR", group, "must not contain digits"));
    }
    if decimal == group {
        return Err(invalid(
            "AMOUNT_GROUP_SEPARATOR",
            group,
            "must differ from AMOUNT_DECIMAL_SEPARATOR",
        ));
    }
    Ok(())
}

/// Absent variables are `Ok(None)`; present but unparsable ones are errors.
fn parse_var<T>(name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                name,
                value: raw,
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}
