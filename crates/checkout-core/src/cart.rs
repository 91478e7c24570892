//! # Cart Types
//!
//! The client-held mirror of the authoritative server cart.
//!
//! The remote cart service owns price and stock truth. Every mutating call is
//! one round trip whose response fully replaces the local snapshot; nothing is
//! incremented locally and nothing is re-rounded locally.

use crate::error::{CheckoutError, CheckoutResult};
use crate::money::{sum_amounts, Currency, Money};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// One line of the cart, mirrored from the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Server-assigned cart line id
    pub id: String,

    /// Product id
    pub product_id: String,

    /// Product name (denormalized for display)
    pub product_name: String,

    /// Unit price
    pub unit_price: Money,

    /// Quantity, at least 1
    pub quantity: u32,

    /// Line total as the server computed it
    pub total: Money,
}

impl CartItem {
    /// Whether the mirrored line total matches `unit_price * quantity` within
    /// the smallest currency unit. Diagnostic only; the server value stands.
    pub fn line_total_matches(&self) -> bool {
        self.total.approx_eq(self.unit_price.times(self.quantity))
    }
}

/// The cart snapshot: items in server-reported order plus the grand total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
    pub grand_total: Money,
}

impl Cart {
    /// An empty cart in the given currency
    pub fn empty(currency: Currency) -> Self {
        Self {
            items: Vec::new(),
            grand_total: Money::zero(currency),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() || self.grand_total.is_zero()
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn currency(&self) -> Currency {
        self.grand_total.currency
    }

    /// Whether the mirrored grand total matches the sum of line totals within
    /// the smallest currency unit
    pub fn totals_match(&self) -> bool {
        let computed = sum_amounts(self.items.iter().map(|i| &i.total), self.currency());
        self.grand_total.approx_eq(computed)
    }
}

/// Remote cart service capability.
///
/// Every call is a single round trip returning the full authoritative cart.
#[async_trait]
pub trait CartService: Send + Sync {
    /// Fetch the current cart
    async fn fetch_cart(&self) -> CheckoutResult<Cart>;

    /// Add `quantity` of a product; returns the updated cart
    async fn add_item(&self, product_id: &str, quantity: u32) -> CheckoutResult<Cart>;

    /// Set the quantity of an existing cart line; returns the updated cart
    async fn update_item(&self, item_id: &str, quantity: u32) -> CheckoutResult<Cart>;

    /// Remove a cart line; returns the updated cart
    async fn remove_item(&self, item_id: &str) -> CheckoutResult<Cart>;
}

/// Type alias for a shared cart service (dynamic dispatch)
pub type BoxedCartService = Arc<dyn CartService>;

/// Owner of the client-visible cart snapshot.
///
/// All I/O goes through the injected [`CartService`]; the snapshot is replaced
/// wholesale by each response (last writer wins, the server is the single
/// source of truth). `clear` is local-only and must follow a confirmed
/// checkout success.
pub struct CartStore {
    service: BoxedCartService,
    snapshot: Cart,
}

impl CartStore {
    pub fn new(service: BoxedCartService, currency: Currency) -> Self {
        Self {
            service,
            snapshot: Cart::empty(currency),
        }
    }

    /// Fetch the authoritative cart and replace the snapshot.
    ///
    /// Called on mount and whenever the cart may have changed server-side
    /// outside this session.
    pub async fn load(&mut self) -> CheckoutResult<&Cart> {
        let cart = self.service.fetch_cart().await?;
        self.install(cart);
        Ok(&self.snapshot)
    }

    /// Add a product to the cart. The server response replaces the snapshot;
    /// price and stock are server-owned truth.
    pub async fn add_item(&mut self, product_id: &str, quantity: u32) -> CheckoutResult<&Cart> {
        if quantity == 0 {
            return Err(CheckoutError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }
        let cart = self.service.add_item(product_id, quantity).await?;
        self.install(cart);
        Ok(&self.snapshot)
    }

    /// Set the quantity of an existing cart line
    pub async fn update_item(&mut self, item_id: &str, quantity: u32) -> CheckoutResult<&Cart> {
        if quantity == 0 {
            return Err(CheckoutError::Validation(
                "quantity must be at least 1; remove the line instead".to_string(),
            ));
        }
        let cart = self.service.update_item(item_id, quantity).await?;
        self.install(cart);
        Ok(&self.snapshot)
    }

    /// Remove a cart line
    pub async fn remove_item(&mut self, item_id: &str) -> CheckoutResult<&Cart> {
        let cart = self.service.remove_item(item_id).await?;
        self.install(cart);
        Ok(&self.snapshot)
    }

    /// The last-loaded snapshot. Never triggers I/O.
    pub fn snapshot(&self) -> &Cart {
        &self.snapshot
    }

    /// Reset the local snapshot to empty.
    ///
    /// Only legal after an external signal confirms the cart was consumed by a
    /// successful checkout; a failed checkout must leave the cart intact for
    /// retry.
    pub fn clear(&mut self) {
        debug!("clearing local cart snapshot");
        self.snapshot = Cart::empty(self.snapshot.currency());
    }

    fn install(&mut self, cart: Cart) {
        if !cart.totals_match() {
            // Server values stand regardless; the mismatch is a server bug
            warn!(
                grand_total = %cart.grand_total,
                "cart grand total does not match sum of line totals"
            );
        }
        for item in &cart.items {
            if !item.line_total_matches() {
                warn!(item = %item.id, "cart line total does not match unit price * quantity");
            }
        }
        debug!(items = cart.items.len(), total = %cart.grand_total, "cart snapshot replaced");
        self.snapshot = cart;
    }
}
