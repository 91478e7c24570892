//! # API Client
//!
//! Shared HTTP plumbing for the cart, checkout, and payment-intent services.
//! One place owns bearer-credential attachment and the mapping from transport
//! and `{ "error": ... }` responses to typed failures.

use crate::config::RemoteConfig;
use checkout_core::CheckoutError;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

/// Low-level failure from one service round trip.
///
/// Adapters map `Remote` rejections onto the domain taxonomy per endpoint;
/// the other variants convert one-to-one.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Non-auth remote rejection with the parsed `{ "error": ... }` message
    #[error("HTTP {status}: {message}")]
    Remote { status: u16, message: String },
}

impl ApiError {
    /// Convert with the given mapping for remote business rejections
    pub fn into_checkout(self, on_remote: impl FnOnce(u16, String) -> CheckoutError) -> CheckoutError {
        match self {
            ApiError::Network(msg) => CheckoutError::Network(msg),
            ApiError::Auth(msg) => CheckoutError::Auth(msg),
            ApiError::Serialization(msg) => CheckoutError::Serialization(msg),
            ApiError::Remote { status, message } => on_remote(status, message),
        }
    }
}

/// Error body shape shared by all services
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Authenticated JSON client for one service base URL
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &RemoteConfig) -> Result<Self, CheckoutError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CheckoutError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
            bearer_token: config.bearer_token.clone(),
        })
    }

    /// Replace the bearer credential (e.g. after re-authentication)
    pub fn set_bearer_token(&mut self, token: impl Into<String>) {
        self.bearer_token = Some(token.into());
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<(), T>(Method::GET, path, None).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn delete<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::DELETE, path, Some(body)).await
    }

    async fn request<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        // The credential comes from the external auth collaborator; without
        // it every call is an auth failure, reported before any I/O.
        let token = self
            .bearer_token
            .as_deref()
            .ok_or_else(|| ApiError::Auth("no bearer credential".to_string()))?;

        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "service request");

        let mut request = self
            .http
            .request(method, &url)
            .header("Authorization", format!("Bearer {token}"));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            error!(%url, %status, %body, "service request rejected");
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_else(|_| format!("HTTP {status}"));

            // 401 and 422 are the auth collaborator's token rejections
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::UNPROCESSABLE_ENTITY {
                return Err(ApiError::Auth(message));
            }
            return Err(ApiError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| ApiError::Serialization(format!("failed to parse response: {e}")))
    }
}
