//! Legacy REST backend.
//!
//! Earlier revisions of the dashboard kept stake and vote state behind a
//! small HTTP API instead of reading contracts directly. The client is kept
//! for deployments that still run it; without a base URL pages use demo
//! state instead.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::BtcvoteError;

/// Errors from the legacy API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-success status. `message` carries the
    /// payload's `error` field when present.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl From<ApiError> for BtcvoteError {
    fn from(err: ApiError) -> Self {
        BtcvoteError::Api(err.to_string())
    }
}

/// Body of `GET /stake/:address` and `POST /stake`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakePayload {
    pub staked_amount: Option<f64>,
    pub voting_power: Option<f64>,
    pub dot_balance: Option<f64>,
    pub minted_vdot: Option<f64>,
    pub ticket_balance: Option<f64>,
    pub last_mint_time: Option<String>,
    pub error: Option<String>,
}

/// Body of `GET /vote/:address` and `POST /vote`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotePayload {
    pub has_voted: Option<bool>,
    pub ticket_balance: Option<f64>,
    pub voting_power: Option<f64>,
    pub success: Option<bool>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
struct StakeRequest<'a> {
    address: &'a str,
    amount: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoteRequest<'a> {
    address: &'a str,
    option: u64,
    voting_power: f64,
}

/// HTTP client for the legacy stake/vote endpoints.
pub struct LegacyApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl LegacyApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn stake_url(&self, address: Option<&str>) -> String {
        match address {
            Some(addr) => format!("{}/stake/{addr}", self.base_url),
            None => format!("{}/stake", self.base_url),
        }
    }

    pub fn vote_url(&self, address: Option<&str>) -> String {
        match address {
            Some(addr) => format!("{}/vote/{addr}", self.base_url),
            None => format!("{}/vote", self.base_url),
        }
    }

    pub async fn get_stake(&self, address: &str) -> Result<StakePayload, ApiError> {
        self.get_json(&self.stake_url(Some(address))).await
    }

    pub async fn get_vote(&self, address: &str) -> Result<VotePayload, ApiError> {
        self.get_json(&self.vote_url(Some(address))).await
    }

    pub async fn post_stake(&self, address: &str, amount: f64) -> Result<StakePayload, ApiError> {
        let body = StakeRequest { address, amount };
        let payload: StakePayload = self.post_json(&self.stake_url(None), &body).await?;
        Ok(payload)
    }

    pub async fn post_vote(
        &self,
        address: &str,
        option: u64,
        voting_power: f64,
    ) -> Result<VotePayload, ApiError> {
        let body = VoteRequest {
            address,
            option,
            voting_power,
        };
        self.post_json(&self.vote_url(None), &body).await
    }

    async fn get_json<T>(&self, url: &str) -> Result<T, ApiError>
    where
        T: for<'de> Deserialize<'de> + ErrorField,
    {
        debug!(%url, "legacy api GET");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::decode(resp).await
    }

    async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: for<'de> Deserialize<'de> + ErrorField,
    {
        debug!(%url, "legacy api POST");
        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::decode(resp).await
    }

    async fn decode<T>(resp: reqwest::Response) -> Result<T, ApiError>
    where
        T: for<'de> Deserialize<'de> + ErrorField,
    {
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        decode_body(status.as_u16(), status.is_success(), &text)
    }
}

/// Payloads that may carry a server-side `error` string.
pub trait ErrorField {
    fn error_field(&self) -> Option<&str>;
}

impl ErrorField for StakePayload {
    fn error_field(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl ErrorField for VotePayload {
    fn error_field(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

fn decode_body<T>(status: u16, ok: bool, text: &str) -> Result<T, ApiError>
where
    T: for<'de> Deserialize<'de> + ErrorField,
{
    let parsed: Result<T, _> = serde_json::from_str(text);
    if ok {
        return parsed.map_err(|e| ApiError::Decode(e.to_string()));
    }
    let message = parsed
        .ok()
        .and_then(|p| p.error_field().map(str::to_string))
        .unwrap_or_else(|| "未知错误".to_string());
    warn!(status, %message, "legacy api request failed");
    Err(ApiError::Server { status, message })
}
