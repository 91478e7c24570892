//! # Checkout Error Types
//!
//! Typed error handling for swift-checkout-rs.
//! All cart and checkout operations return `Result<T, CheckoutError>`; no
//! failure crosses a component boundary as a panic.

use thiserror::Error;

/// Core error type for all cart and checkout operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CheckoutError {
    /// Bad input caught before any I/O (zero quantity, malformed id)
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Checkout attempted against an empty cart
    #[error("Cart is empty")]
    EmptyCart,

    /// Cart service rejected the add because stock ran out
    #[error("Product out of stock: {product_id}")]
    OutOfStock { product_id: String },

    /// Transport failure talking to the cart, checkout, or intent service
    #[error("Network error: {0}")]
    Network(String),

    /// Bearer credential missing, expired, or rejected
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Remote business-rule rejection during settlement
    #[error("Settlement failed: {0}")]
    Settlement(String),

    /// Gateway rejected the card confirmation (e.g. card declined)
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// Card method disabled: the gateway public configuration is absent
    #[error("Card payments are not configured")]
    GatewayConfigMissing,

    /// Gateway could not be reached to open the attempt
    #[error("Gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// Server already processed this payment intent
    #[error("Payment intent already confirmed")]
    AlreadyConfirmed,

    /// A checkout attempt is already in flight
    #[error("A checkout attempt is already in progress")]
    AttemptInProgress,

    /// Cart total changed between attempt start and card submission
    #[error("Cart changed during checkout: expected {expected}, found {actual}")]
    StaleCart { expected: String, actual: String },

    /// Action is not legal in the current checkout state
    #[error("Cannot {action} while checkout is {state}")]
    InvalidTransition { action: String, state: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration errors (missing env vars, invalid base URL)
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CheckoutError {
    /// Returns true if re-invoking the failed operation is safe.
    ///
    /// Money-moving calls (settle, confirm) are deliberately excluded: a
    /// timeout there is ambiguous and an automatic retry could double-charge.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CheckoutError::Network(_) | CheckoutError::GatewayUnavailable(_)
        )
    }

    /// Returns true for failures that end the in-flight attempt (as opposed
    /// to guards that reject an action without touching the attempt).
    pub fn is_attempt_fatal(&self) -> bool {
        !matches!(
            self,
            CheckoutError::AttemptInProgress
                | CheckoutError::InvalidTransition { .. }
                | CheckoutError::EmptyCart
                | CheckoutError::Validation(_)
                | CheckoutError::GatewayConfigMissing
        )
    }
}

/// Result type alias for cart and checkout operations
pub type CheckoutResult<T> = Result<T, CheckoutError>;
