//! # Remote Cart Service
//!
//! `CartService` over the remote cart endpoints. The service computes prices
//! and totals in decimal; conversion to minor units happens exactly once,
//! here, so mirrored totals are never re-rounded downstream.

use crate::client::{ApiClient, ApiError};
use checkout_core::{Cart, CartItem, CartService, CheckoutError, CheckoutResult, Currency, Money};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Cart response shape shared by every cart endpoint
#[derive(Debug, Deserialize)]
struct WireCart {
    // The original service named this field cart_items
    #[serde(alias = "cart_items")]
    items: Vec<WireCartItem>,
    cart_total: f64,
}

#[derive(Debug, Deserialize)]
struct WireCartItem {
    id: String,
    product_id: String,
    product_name: String,
    price: f64,
    quantity: u32,
    total: f64,
}

#[derive(Debug, Serialize)]
struct AddItemRequest<'a> {
    product_id: &'a str,
    quantity: u32,
}

#[derive(Debug, Serialize)]
struct UpdateItemRequest<'a> {
    item_id: &'a str,
    quantity: u32,
}

#[derive(Debug, Serialize)]
struct RemoveItemRequest<'a> {
    item_id: &'a str,
}

/// HTTP-backed implementation of [`CartService`]
pub struct RemoteCartService {
    client: ApiClient,
    currency: Currency,
}

impl RemoteCartService {
    pub fn new(client: ApiClient, currency: Currency) -> Self {
        Self { client, currency }
    }

    fn convert(&self, wire: WireCart) -> Cart {
        let currency = self.currency;
        let items = wire
            .items
            .into_iter()
            .map(|item| CartItem {
                id: item.id,
                product_id: item.product_id,
                product_name: item.product_name,
                unit_price: Money::from_major(item.price, currency),
                quantity: item.quantity,
                total: Money::from_major(item.total, currency),
            })
            .collect();
        Cart {
            items,
            grand_total: Money::from_major(wire.cart_total, currency),
        }
    }
}

/// The service reports business rejections as `{ "error": string }` with no
/// machine-readable code; stock exhaustion is recognized by phrasing.
fn map_add_error(err: ApiError, product_id: &str) -> CheckoutError {
    let product_id = product_id.to_string();
    err.into_checkout(|_, message| {
        if message.to_ascii_lowercase().contains("stock") {
            CheckoutError::OutOfStock { product_id }
        } else {
            CheckoutError::Validation(message)
        }
    })
}

fn map_cart_error(err: ApiError) -> CheckoutError {
    err.into_checkout(|_, message| CheckoutError::Validation(message))
}

#[async_trait]
impl CartService for RemoteCartService {
    #[instrument(skip(self))]
    async fn fetch_cart(&self) -> CheckoutResult<Cart> {
        let wire: WireCart = self.client.get("/cart").await.map_err(map_cart_error)?;
        Ok(self.convert(wire))
    }

    #[instrument(skip(self))]
    async fn add_item(&self, product_id: &str, quantity: u32) -> CheckoutResult<Cart> {
        let wire: WireCart = self
            .client
            .post(
                "/cart/add",
                &AddItemRequest {
                    product_id,
                    quantity,
                },
            )
            .await
            .map_err(|e| map_add_error(e, product_id))?;
        Ok(self.convert(wire))
    }

    #[instrument(skip(self))]
    async fn update_item(&self, item_id: &str, quantity: u32) -> CheckoutResult<Cart> {
        let wire: WireCart = self
            .client
            .put("/cart/update", &UpdateItemRequest { item_id, quantity })
            .await
            .map_err(map_cart_error)?;
        Ok(self.convert(wire))
    }

    #[instrument(skip(self))]
    async fn remove_item(&self, item_id: &str) -> CheckoutResult<Cart> {
        let wire: WireCart = self
            .client
            .delete("/cart/remove", &RemoveItemRequest { item_id })
            .await
            .map_err(map_cart_error)?;
        Ok(self.convert(wire))
    }
}
