//! # Order Types
//!
//! The order is owned by the remote checkout service; the client only reads
//! the fields needed to render a confirmation.

use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Order lifecycle status as reported by the checkout service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
    Refunded,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Completed
    }
}

/// A settled order, the result artifact of a successful checkout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Server-assigned order id
    pub id: String,

    /// Total charged, as reported by the authority that owns money
    pub total_amount: Money,

    /// Order status
    #[serde(default)]
    pub status: OrderStatus,
}

impl Order {
    pub fn new(id: impl Into<String>, total_amount: Money) -> Self {
        Self {
            id: id.into(),
            total_amount,
            status: OrderStatus::Completed,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == OrderStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    #[test]
    fn test_order_defaults_completed() {
        let order = Order::new("7", Money::from_major(20.0, Currency::USD));
        assert!(order.is_completed());
        assert_eq!(order.total_amount.amount, 2000);
    }
}
