//! # Remote Configuration
//!
//! Configuration for the remote cart/checkout services and the payment
//! gateway. Loaded from environment variables; the bearer credential comes
//! from the external auth collaborator and is injected here, never minted.

use checkout_core::{CheckoutError, Currency};
use std::env;
use std::time::Duration;

/// Configuration for the HTTP adapters
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the cart/checkout/intent services
    pub api_base_url: String,

    /// Base URL of the external gateway's own confirm endpoint
    pub gateway_base_url: String,

    /// Bearer credential for all cart and checkout calls. Absence surfaces
    /// as `CheckoutError::Auth` at call time, not here, so an unauthenticated
    /// process can still construct the adapters.
    pub bearer_token: Option<String>,

    /// Currency the cart service reports amounts in
    pub currency: Currency,

    /// Per-request timeout
    pub timeout: Duration,
}

impl RemoteConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `CHECKOUT_API_URL`
    ///
    /// Optional:
    /// - `CHECKOUT_API_TOKEN` (bearer credential)
    /// - `CHECKOUT_GATEWAY_URL` (defaults to the public gateway endpoint)
    pub fn from_env() -> Result<Self, CheckoutError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let api_base_url = env::var("CHECKOUT_API_URL")
            .map_err(|_| CheckoutError::Configuration("CHECKOUT_API_URL not set".to_string()))?;

        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(CheckoutError::Configuration(
                "CHECKOUT_API_URL must start with http:// or https://".to_string(),
            ));
        }

        let gateway_base_url = env::var("CHECKOUT_GATEWAY_URL")
            .unwrap_or_else(|_| "https://api.stripe.com".to_string());

        let bearer_token = env::var("CHECKOUT_API_TOKEN").ok().filter(|t| !t.is_empty());

        Ok(Self {
            api_base_url: trim_trailing_slash(api_base_url),
            gateway_base_url: trim_trailing_slash(gateway_base_url),
            bearer_token,
            currency: Currency::USD,
            timeout: Duration::from_secs(30),
        })
    }

    /// Create config with explicit values (for testing)
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: trim_trailing_slash(api_base_url.into()),
            gateway_base_url: "https://api.stripe.com".to_string(),
            bearer_token: None,
            currency: Currency::USD,
            timeout: Duration::from_secs(30),
        }
    }

    /// Builder: set the bearer credential
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Builder: set the gateway base URL (for testing)
    pub fn with_gateway_base_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_base_url = trim_trailing_slash(url.into());
        self
    }

    /// Builder: set the cart currency
    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    /// Builder: set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn trim_trailing_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
