use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    config::Config,
    metrics::track_tonapi_call,
    services::public_key::PublicKeySource,
    ton::{StateInit, TonAddress},
};

#[derive(Debug, thiserror::Error)]
pub enum TonApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("TonAPI responded with status {0}")]
    Status(reqwest::StatusCode),
    #[error("Invalid public key in response: {0}")]
    InvalidKey(String),
}

pub type TonApiResult<T> = Result<T, TonApiError>;

#[derive(Debug, Deserialize)]
struct PublicKeyResponse {
    public_key: String,
}

/// Chain-query fallback: fetches the public key of a deployed wallet from TonAPI.
#[derive(Debug, Clone)]
pub struct TonApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl TonApiClient {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: std::time::Duration) -> TonApiResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.is_empty()),
        })
    }

    pub fn from_config(config: &Config) -> TonApiResult<Self> {
        Self::new(
            &config.tonapi.base_url,
            config.tonapi.api_key.clone(),
            config.get_tonapi_timeout(),
        )
    }

    pub async fn get_public_key(&self, address: &TonAddress) -> TonApiResult<[u8; 32]> {
        let url = format!("{}/v2/accounts/{}/publickey", self.base_url, address.to_raw());

        track_tonapi_call("get_public_key", async {
            let mut request = self.client.get(&url);
            if let Some(api_key) = &self.api_key {
                request = request.bearer_auth(api_key);
            }

            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(TonApiError::Status(response.status()));
            }

            let body: PublicKeyResponse = response.json().await?;
            decode_public_key(&body.public_key)
        })
        .await
    }
}

fn decode_public_key(value: &str) -> TonApiResult<[u8; 32]> {
    let bytes = hex::decode(value).map_err(|e| TonApiError::InvalidKey(e.to_string()))?;

    bytes
        .try_into()
        .map_err(|bytes: Vec<u8>| TonApiError::InvalidKey(format!("expected 32 bytes, got {}", bytes.len())))
}

#[async_trait]
impl PublicKeySource for TonApiClient {
    async fn resolve_public_key(&self, address: &TonAddress, _state_init: &StateInit) -> Option<[u8; 32]> {
        match self.get_public_key(address).await {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::warn!(address = %address, error = %e, "TonAPI public key lookup failed");
                None
            }
        }
    }
}
