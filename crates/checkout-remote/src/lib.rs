//! # checkout-remote
//!
//! HTTP-backed implementations of the checkout-core capabilities:
//!
//! - **RemoteCartService** — the cart service client (`GET /cart`,
//!   `POST /cart/add`, `PUT /cart/update`, `DELETE /cart/remove`)
//! - **RemoteGateway** — legacy settlement (`POST /checkout`) and the
//!   payment-intent lifecycle (`GET /stripe-config`,
//!   `POST /create-payment-intent`, `POST /confirm-payment`)
//! - **HttpGatewayProtocol** — the gateway's own confirm call, treated as a
//!   black box
//!
//! All calls carry the bearer credential from [`RemoteConfig`]; its absence
//! or rejection surfaces as `CheckoutError::Auth`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use checkout_core::{CartStore, CheckoutMethod, CheckoutOrchestrator};
//! use checkout_remote::{ApiClient, RemoteCartService, RemoteConfig, RemoteGateway};
//! use std::sync::Arc;
//!
//! let config = RemoteConfig::from_env()?;
//! let client = ApiClient::new(&config)?;
//!
//! let cart_service = Arc::new(RemoteCartService::new(client.clone(), config.currency));
//! let gateway = Arc::new(RemoteGateway::from_config(&config)?);
//!
//! let mut cart = CartStore::new(cart_service, config.currency);
//! cart.load().await?;
//! let mut checkout = CheckoutOrchestrator::new(cart, gateway);
//! checkout.start_checkout(CheckoutMethod::Legacy).await?;
//! checkout.submit().await?;
//! ```

pub mod cart;
pub mod client;
pub mod config;
pub mod gateway;

// Re-exports
pub use cart::RemoteCartService;
pub use client::{ApiClient, ApiError};
pub use config::RemoteConfig;
pub use gateway::{HttpGatewayProtocol, RemoteGateway};
