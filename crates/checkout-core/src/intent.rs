//! # Payment Intent Types
//!
//! Types for the create-intent / confirm-intent card flow. A payment intent
//! belongs to exactly one checkout attempt and is discarded with it; a new
//! attempt always requests a fresh intent.

use serde::{Deserialize, Serialize};

/// Lifecycle of a payment intent within one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    /// Intent created, card not yet confirmed
    Created,
    /// Gateway confirmed the charge
    Confirmed,
    /// Gateway rejected the charge
    Failed,
}

/// A gateway-issued authorization-to-charge handle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Opaque token the gateway protocol confirms against
    pub client_secret: String,

    /// Server-side order id opened for this intent
    pub order_id: String,

    /// Intent status
    pub status: IntentStatus,
}

impl PaymentIntent {
    pub fn new(client_secret: impl Into<String>, order_id: impl Into<String>) -> Self {
        Self {
            client_secret: client_secret.into(),
            order_id: order_id.into(),
            status: IntentStatus::Created,
        }
    }
}

/// Card input collected by the presentation layer.
///
/// Forwarded verbatim to the gateway protocol; the gateway owns all
/// cryptographic and PCI handling.
#[derive(Clone, Serialize)]
pub struct CardDetails {
    pub number: String,
    pub exp_month: u8,
    pub exp_year: u16,
    pub cvc: String,
}

impl CardDetails {
    pub fn new(
        number: impl Into<String>,
        exp_month: u8,
        exp_year: u16,
        cvc: impl Into<String>,
    ) -> Self {
        Self {
            number: number.into(),
            exp_month,
            exp_year,
            cvc: cvc.into(),
        }
    }

    /// Last four digits, the only part of the number safe to show
    pub fn last4(&self) -> &str {
        let len = self.number.len();
        if len >= 4 {
            &self.number[len - 4..]
        } else {
            &self.number
        }
    }
}

// Card numbers must never reach logs; Debug shows the last four only.
impl std::fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardDetails")
            .field("number", &format!("****{}", self.last4()))
            .field("exp_month", &self.exp_month)
            .field("exp_year", &self.exp_year)
            .field("cvc", &"***")
            .finish()
    }
}

/// Outcome of the gateway's confirm call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationStatus {
    /// Charge went through; the server must now be notified
    Succeeded,
    /// Gateway needs additional authentication from the shopper
    RequiresAction,
    /// Gateway rejected the charge
    Failed,
}

/// Result of [`confirm_card_payment`](crate::gateway::PaymentGateway::confirm_card_payment)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfirmation {
    pub status: ConfirmationStatus,

    /// Gateway-side intent id, used to notify the server
    pub payment_intent_id: String,

    /// Human-readable detail on non-success outcomes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl GatewayConfirmation {
    pub fn succeeded(payment_intent_id: impl Into<String>) -> Self {
        Self {
            status: ConfirmationStatus::Succeeded,
            payment_intent_id: payment_intent_id.into(),
            message: None,
        }
    }

    pub fn failed(payment_intent_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: ConfirmationStatus::Failed,
            payment_intent_id: payment_intent_id.into(),
            message: Some(message.into()),
        }
    }

    pub fn requires_action(payment_intent_id: impl Into<String>) -> Self {
        Self {
            status: ConfirmationStatus::RequiresAction,
            payment_intent_id: payment_intent_id.into(),
            message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_intent_is_created() {
        let intent = PaymentIntent::new("secret_1", "ord_1");
        assert_eq!(intent.status, IntentStatus::Created);
    }

    #[test]
    fn test_card_debug_redacts() {
        let card = CardDetails::new("4242424242424242", 12, 2030, "123");
        let debug = format!("{card:?}");
        assert!(debug.contains("****4242"));
        assert!(!debug.contains("4242424242424242"));
        assert!(!debug.contains("123"));
    }

    #[test]
    fn test_last4_short_number() {
        let card = CardDetails::new("42", 1, 2030, "000");
        assert_eq!(card.last4(), "42");
    }
}
