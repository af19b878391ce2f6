//! HTTP access to the STON.fi v1 API: asset list, pair graph and (see
//! `swap_service`) swap simulations.
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::{Client, Url};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;

use crate::models::StonfiAsset;

#[derive(Error, Debug)]
pub enum StonfiError {
    /// The configured base url failed to parse.
    #[error("Failed to parse URL: {0}. Error: {1}")]
    InvalidUrl(String, String),

    /// Errors forwarded from the HTTP client (connect, timeout, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {endpoint}")]
    Status { endpoint: String, status: u16 },

    /// The body was not the JSON shape we expect.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// A field was present but held an unusable value.
    #[error("Invalid response field {field}: {reason}")]
    InvalidResponse { field: &'static str, reason: String },
}

#[derive(Debug, Deserialize)]
struct AssetListResponse {
    asset_list: Vec<AssetDto>,
}

#[derive(Debug, Deserialize)]
struct AssetDto {
    contract_address: String,
    symbol: String,
    #[serde(default)]
    display_name: Option<String>,
    decimals: usize,
    kind: String,
    #[serde(default)]
    community: bool,
    #[serde(default)]
    deprecated: bool,
    #[serde(default)]
    blacklisted: bool,
}

impl From<AssetDto> for StonfiAsset {
    fn from(dto: AssetDto) -> Self {
        Self {
            contract_address: dto.contract_address,
            symbol: dto.symbol,
            display_name: dto.display_name,
            decimals: dto.decimals,
            kind: dto.kind,
            is_community: dto.community,
            is_deprecated: dto.deprecated,
            is_blacklisted: dto.blacklisted,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MarketListResponse {
    pairs: Vec<(String, String)>,
}

/// Fetch-all access to the asset list and pair graph.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StonfiApi: Send + Sync {
    async fn get_assets(&self) -> Result<Vec<StonfiAsset>, StonfiError>;

    /// Every tradeable pair as a tuple of contract addresses.
    async fn get_pairs(&self) -> Result<Vec<(String, String)>, StonfiError>;
}

pub struct StonfiClient {
    client: Client,
    base_url: Url,
}

impl StonfiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, StonfiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| StonfiError::InvalidUrl(base_url.to_string(), e.to_string()))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, StonfiError> {
        self.base_url.join(path).map_err(|e| {
            StonfiError::InvalidUrl(format!("{}{}", self.base_url, path), e.to_string())
        })
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, StonfiError> {
        let url = self.endpoint(path)?;
        log::debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;
        Self::decode(url, response).await
    }

    pub(crate) async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, StonfiError> {
        let url = self.endpoint(path)?;
        log::debug!("POST {} {:?}", url, query);
        let response = self.client.post(url.clone()).query(query).send().await?;
        Self::decode(url, response).await
    }

    async fn decode<T: DeserializeOwned>(
        url: Url,
        response: reqwest::Response,
    ) -> Result<T, StonfiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(StonfiError::Status {
                endpoint: url.path().to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| StonfiError::Parse(e.to_string()))
    }
}

#[async_trait]
impl StonfiApi for StonfiClient {
    async fn get_assets(&self) -> Result<Vec<StonfiAsset>, StonfiError> {
        let response: AssetListResponse = self.get_json("v1/assets").await?;
        Ok(response.asset_list.into_iter().map(StonfiAsset::from).collect())
    }

    async fn get_pairs(&self) -> Result<Vec<(String, String)>, StonfiError> {
        let response: MarketListResponse = self.get_json("v1/markets").await?;
        Ok(response.pairs)
    }
}
