//! # Payment Gateway Trait
//!
//! Capability surface over the two checkout paths. One trait covers both so
//! the orchestrator can hold a single handle and keep the one-attempt-at-a-time
//! invariant uniform across paths.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    PaymentGateway (trait)                    │
//! │  ├── settle()                      Legacy: one settlement    │
//! │  ├── ensure_card_capability()      GatewayCard: gating       │
//! │  ├── create_intent()               GatewayCard: open intent  │
//! │  ├── confirm_card_payment()        GatewayCard: charge       │
//! │  └── notify_server_confirmed()     GatewayCard: finalize     │
//! └──────────────────────────────────────────────────────────────┘
//!                              ▲
//!               ┌──────────────┴──────────────┐
//!               │                             │
//!       ┌───────┴────────┐           ┌────────┴────────┐
//!       │ RemoteGateway  │           │  test doubles   │
//!       │ (checkout-     │           │  (scripted)     │
//!       │  remote)       │           │                 │
//!       └────────────────┘           └─────────────────┘
//! ```

use crate::error::CheckoutResult;
use crate::intent::{CardDetails, GatewayConfirmation, PaymentIntent};
use crate::order::Order;
use async_trait::async_trait;
use std::sync::Arc;

/// Payment capability consumed by the checkout orchestrator.
///
/// The legacy path is a single [`settle`](Self::settle) round trip. The card
/// path runs [`create_intent`](Self::create_intent) →
/// [`confirm_card_payment`](Self::confirm_card_payment) →
/// [`notify_server_confirmed`](Self::notify_server_confirmed), strictly in
/// that order, each step observed before the next starts.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Settle the authoritative cart in one request (legacy path).
    ///
    /// The server computes the final order atomically and clears its cart.
    /// Never retried automatically: an ambiguous failure may already have
    /// settled, and a blind retry could double-charge.
    async fn settle(&self) -> CheckoutResult<Order>;

    /// Check that the card method is usable.
    ///
    /// Fails with [`CheckoutError::GatewayConfigMissing`] when the gateway's
    /// public configuration is absent or malformed; the card method must then
    /// present as unavailable rather than fail at submission time.
    ///
    /// [`CheckoutError::GatewayConfigMissing`]: crate::error::CheckoutError::GatewayConfigMissing
    async fn ensure_card_capability(&self) -> CheckoutResult<()>;

    /// Open a fresh payment intent. Called exactly once per attempt.
    async fn create_intent(&self) -> CheckoutResult<PaymentIntent>;

    /// Confirm the charge with the gateway's own protocol.
    ///
    /// The adapter only shapes input and output; cryptographic and PCI
    /// handling belong to the gateway.
    async fn confirm_card_payment(
        &self,
        client_secret: &str,
        card: &CardDetails,
    ) -> CheckoutResult<GatewayConfirmation>;

    /// Tell the server the gateway confirmed the charge.
    ///
    /// This is the step that creates the server-side order and clears the
    /// server cart; success must not be declared before it returns.
    async fn notify_server_confirmed(&self, payment_intent_id: &str) -> CheckoutResult<Order>;

    /// Provider name (for logging)
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared payment gateway (dynamic dispatch)
pub type BoxedPaymentGateway = Arc<dyn PaymentGateway>;

/// The gateway's own client protocol, treated as a black box.
///
/// Accepts a client secret plus card details and reports the charge outcome.
/// Split out so the HTTP-backed implementation can be swapped for a scripted
/// double in tests.
#[async_trait]
pub trait GatewayProtocol: Send + Sync {
    async fn confirm_card(
        &self,
        client_secret: &str,
        card: &CardDetails,
    ) -> CheckoutResult<GatewayConfirmation>;
}

/// Type alias for a shared gateway protocol handle
pub type BoxedGatewayProtocol = Arc<dyn GatewayProtocol>;
