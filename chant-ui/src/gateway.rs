//! Chant backend gateway
//!
//! [`ChantGateway`] is the seam between the flow controller and the network.
//! [`HttpGateway`] implements it over HTTP with `reqwest`; tests substitute an
//! in-memory implementation.
//!
//! Every identifier crossing this boundary is a [`CanonicalId`], so the
//! gateway never normalizes anything itself.

use async_trait::async_trait;
use chant_common::api::{
    ApiReply, ApiResponse, ChantEntry, CreateUserRequest, TotalChantsResponse, UserChantCount,
    UserStats,
};
use chant_common::CanonicalId;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("chant-ui/", env!("CARGO_PKG_VERSION"));

/// Gateway failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Connection refused, reset, DNS failure and the like
    #[error("Network error: {0}")]
    Network(String),

    /// No response within the configured request timeout
    #[error("Request timed out")]
    Timeout,

    /// Non-success HTTP status
    #[error("HTTP {0}: {1}")]
    Status(u16, String),

    /// Response body did not match the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Base URL unusable for building endpoint paths
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),
}

impl GatewayError {
    /// Transport-level failure: the backend's answer, if any, is unknown
    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Network(_) | GatewayError::Timeout)
    }

    /// The backend reported the resource as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::Status(404, _))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Timeout
        } else if e.is_decode() {
            GatewayError::Parse(e.to_string())
        } else {
            GatewayError::Network(e.to_string())
        }
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Operations offered by the chant backend
///
/// All calls are safe to retry except [`ChantGateway::add_chant`], which
/// appends a count on every successful call.
#[async_trait]
pub trait ChantGateway: Send + Sync {
    /// Claim an identifier
    async fn create_user(&self, userid: &CanonicalId) -> GatewayResult<ApiReply>;

    /// Append a chant count. Not idempotent.
    async fn add_chant(&self, entry: &ChantEntry) -> GatewayResult<ApiReply>;

    /// Per-user running total
    async fn user_total(&self, userid: &CanonicalId) -> GatewayResult<UserStats>;

    /// Sum of all chants across users
    async fn total_chants(&self) -> GatewayResult<u64>;

    async fn user_exists(&self, userid: &CanonicalId) -> GatewayResult<bool>;

    /// Totals for every user
    async fn user_counts(&self) -> GatewayResult<Vec<UserChantCount>>;
}

/// HTTP implementation of [`ChantGateway`]
#[derive(Debug, Clone)]
pub struct HttpGateway {
    http_client: reqwest::Client,
    base_url: Url,
}

impl HttpGateway {
    /// Create a gateway for `base_url` (e.g. `http://localhost:8080/api`)
    ///
    /// Every request is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> GatewayResult<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| GatewayError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::InvalidUrl(base_url.to_string()));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join path segments onto the base URL, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base() was rejected in new(), so this always succeeds
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> GatewayResult<T> {
        let url = self.endpoint(segments);
        debug!(%url, "GET");

        let response = self.http_client.get(url.clone()).send().await.map_err(|e| {
            warn!(%url, error = %e, "GET failed");
            GatewayError::from(e)
        })?;

        Self::decode(response).await
    }

    async fn post_json<B: serde::Serialize + ?Sized>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> GatewayResult<ApiReply> {
        let url = self.endpoint(segments);
        debug!(%url, "POST");

        let response = self
            .http_client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(%url, error = %e, "POST failed");
                GatewayError::from(e)
            })?;

        let status = response.status();
        if status.is_success() {
            let api_response: ApiResponse = Self::decode(response).await?;
            return Ok(api_response.into_reply());
        }

        // Backend exception handlers answer with the usual envelope
        let body = response.text().await.unwrap_or_default();
        match error_envelope(&body) {
            Some(api_response) => {
                warn!(
                    status = status.as_u16(),
                    message = %api_response.message,
                    "Backend refused request"
                );
                Ok(api_response.into_reply())
            }
            None => Err(Self::status_error(status, body)),
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> GatewayResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = match error_envelope(&body) {
                Some(api_response) => api_response.message,
                None => body,
            };
            return Err(Self::status_error(status, detail));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))
    }

    fn status_error(status: StatusCode, detail: String) -> GatewayError {
        if status != StatusCode::NOT_FOUND {
            warn!(status = status.as_u16(), "Backend returned error status");
        }
        GatewayError::Status(status.as_u16(), detail)
    }
}

/// Failure envelope carried by an error-status body, if it is one
fn error_envelope(body: &str) -> Option<ApiResponse> {
    serde_json::from_str::<ApiResponse>(body)
        .ok()
        .filter(|api_response| !api_response.success && !api_response.message.is_empty())
}

#[async_trait]
impl ChantGateway for HttpGateway {
    async fn create_user(&self, userid: &CanonicalId) -> GatewayResult<ApiReply> {
        let request = CreateUserRequest {
            userid: userid.clone(),
        };
        self.post_json(&["users", "create"], &request).await
    }

    async fn add_chant(&self, entry: &ChantEntry) -> GatewayResult<ApiReply> {
        self.post_json(&["chants", "add"], &entry.to_request()).await
    }

    async fn user_total(&self, userid: &CanonicalId) -> GatewayResult<UserStats> {
        self.get_json(&["chants", "user", userid.as_str(), "total"])
            .await
    }

    async fn total_chants(&self) -> GatewayResult<u64> {
        let total: TotalChantsResponse = self.get_json(&["chants", "total"]).await?;
        Ok(total.total_chants)
    }

    async fn user_exists(&self, userid: &CanonicalId) -> GatewayResult<bool> {
        self.get_json(&["users", "exists", userid.as_str()]).await
    }

    async fn user_counts(&self) -> GatewayResult<Vec<UserChantCount>> {
        self.get_json(&["chants", "usersCounts"]).await
    }
}
