//! # checkout-core
//!
//! Cart state and checkout orchestration for swift-checkout-rs.
//!
//! This crate provides:
//! - `Money` and `Currency` for amounts in smallest currency units
//! - `Cart`, `CartItem`, and `CartStore` for the server-mirrored cart snapshot
//! - `PaymentGateway` and `GatewayProtocol` traits for the payment capability
//! - `CheckoutOrchestrator`, the state machine over both checkout paths
//! - `CheckoutError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use checkout_core::{CartStore, CheckoutMethod, CheckoutOrchestrator, Currency};
//!
//! // Wire the store and gateway (HTTP-backed implementations live in
//! // checkout-remote)
//! let mut cart = CartStore::new(service, Currency::USD);
//! cart.load().await?;
//! let mut checkout = CheckoutOrchestrator::new(cart, gateway);
//!
//! // Legacy path: one settlement round trip
//! checkout.start_checkout(CheckoutMethod::Legacy).await?;
//! match checkout.submit().await? {
//!     CheckoutState::Succeeded { order } => println!("order {}", order.id),
//!     state => println!("checkout ended in {state}"),
//! }
//! ```

pub mod cart;
pub mod checkout;
pub mod error;
pub mod gateway;
pub mod intent;
pub mod money;
pub mod order;

// Re-exports for convenience
pub use cart::{BoxedCartService, Cart, CartItem, CartService, CartStore};
pub use checkout::{
    CheckoutAttempt, CheckoutIntent, CheckoutMethod, CheckoutOrchestrator, CheckoutState,
};
pub use error::{CheckoutError, CheckoutResult};
pub use gateway::{BoxedGatewayProtocol, BoxedPaymentGateway, GatewayProtocol, PaymentGateway};
pub use intent::{
    CardDetails, ConfirmationStatus, GatewayConfirmation, IntentStatus, PaymentIntent,
};
pub use money::{Currency, Money};
pub use order::{Order, OrderStatus};
