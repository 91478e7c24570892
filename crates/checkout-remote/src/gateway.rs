//! # Remote Payment Gateway
//!
//! `PaymentGateway` over the checkout and payment-intent services, plus the
//! HTTP form of the gateway's opaque confirm protocol.
//!
//! The gateway's public configuration is resolved once per process through an
//! explicitly owned, lazily-initialized handle: a missing key disables the
//! card method for good, while a transport failure is surfaced but left
//! uncached so a later attempt can succeed.

use crate::client::{ApiClient, ApiError};
use crate::config::RemoteConfig;
use checkout_core::{
    CardDetails, CheckoutError, CheckoutResult, Currency, GatewayConfirmation, GatewayProtocol,
    Money, Order, OrderStatus, PaymentGateway, PaymentIntent,
};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct OrderEnvelope {
    order: WireOrder,
}

#[derive(Debug, Deserialize)]
struct WireOrder {
    #[serde(deserialize_with = "id_string_or_number")]
    id: String,
    total_amount: f64,
    #[serde(default)]
    status: Option<String>,
}

/// Order ids arrive as JSON numbers from the legacy service and as strings
/// from the intent service.
fn id_string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        Text(String),
        Number(i64),
    }
    Ok(match IdRepr::deserialize(deserializer)? {
        IdRepr::Text(s) => s,
        IdRepr::Number(n) => n.to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct GatewayConfigResponse {
    #[serde(rename = "publicKey")]
    public_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateIntentResponse {
    client_secret: String,
    order_id: String,
}

#[derive(Debug, Serialize)]
struct ConfirmPaymentRequest<'a> {
    payment_intent_id: &'a str,
}

fn parse_order_status(status: Option<&str>) -> OrderStatus {
    match status {
        Some("pending") => OrderStatus::Pending,
        Some("failed") => OrderStatus::Failed,
        Some("cancelled") => OrderStatus::Cancelled,
        Some("refunded") => OrderStatus::Refunded,
        _ => OrderStatus::Completed,
    }
}

// =============================================================================
// RemoteGateway
// =============================================================================

/// HTTP-backed implementation of [`PaymentGateway`].
///
/// The legacy path settles against `POST /checkout`; the card path runs
/// `POST /create-payment-intent`, the gateway protocol confirm, and
/// `POST /confirm-payment`.
pub struct RemoteGateway {
    client: ApiClient,
    protocol: Arc<dyn GatewayProtocol>,
    currency: Currency,
    card_config: OnceCell<Option<String>>,
}

impl RemoteGateway {
    pub fn new(client: ApiClient, protocol: Arc<dyn GatewayProtocol>, currency: Currency) -> Self {
        Self {
            client,
            protocol,
            currency,
            card_config: OnceCell::new(),
        }
    }

    /// Build from config with the HTTP gateway protocol
    pub fn from_config(config: &RemoteConfig) -> CheckoutResult<Self> {
        let client = ApiClient::new(config)?;
        let protocol = Arc::new(HttpGatewayProtocol::new(config)?);
        Ok(Self::new(client, protocol, config.currency))
    }

    fn convert_order(&self, wire: WireOrder) -> Order {
        Order {
            id: wire.id,
            total_amount: Money::from_major(wire.total_amount, self.currency),
            status: parse_order_status(wire.status.as_deref()),
        }
    }

    /// Fetch the gateway public configuration, caching only definitive
    /// answers.
    async fn card_public_key(&self) -> CheckoutResult<Option<String>> {
        self.card_config
            .get_or_try_init(|| async {
                let response: GatewayConfigResponse = self
                    .client
                    .get("/stripe-config")
                    .await
                    .map_err(|e| match e {
                        ApiError::Auth(msg) => CheckoutError::Auth(msg),
                        other => CheckoutError::GatewayUnavailable(other.to_string()),
                    })?;

                let key = response.public_key.filter(|k| !k.is_empty());
                match &key {
                    Some(_) => info!("card payments enabled by gateway configuration"),
                    None => warn!("gateway configuration has no public key; card payments disabled"),
                }
                Ok(key)
            })
            .await
            .map(Clone::clone)
    }
}

#[async_trait]
impl PaymentGateway for RemoteGateway {
    #[instrument(skip(self))]
    async fn settle(&self) -> CheckoutResult<Order> {
        let envelope: OrderEnvelope = self
            .client
            .post("/checkout", &serde_json::json!({}))
            .await
            .map_err(|e| {
                e.into_checkout(|_, message| {
                    if message.to_ascii_lowercase().contains("empty") {
                        CheckoutError::EmptyCart
                    } else {
                        CheckoutError::Settlement(message)
                    }
                })
            })?;

        let order = self.convert_order(envelope.order);
        info!(order_id = %order.id, total = %order.total_amount, "legacy settlement completed");
        Ok(order)
    }

    async fn ensure_card_capability(&self) -> CheckoutResult<()> {
        match self.card_public_key().await? {
            Some(_) => Ok(()),
            None => Err(CheckoutError::GatewayConfigMissing),
        }
    }

    #[instrument(skip(self))]
    async fn create_intent(&self) -> CheckoutResult<PaymentIntent> {
        let response: CreateIntentResponse = self
            .client
            .post("/create-payment-intent", &serde_json::json!({}))
            .await
            .map_err(|e| e.into_checkout(|_, message| CheckoutError::Gateway(message)))?;

        debug!(order_id = %response.order_id, "payment intent opened");
        Ok(PaymentIntent::new(response.client_secret, response.order_id))
    }

    #[instrument(skip(self, client_secret, card))]
    async fn confirm_card_payment(
        &self,
        client_secret: &str,
        card: &CardDetails,
    ) -> CheckoutResult<GatewayConfirmation> {
        self.protocol.confirm_card(client_secret, card).await
    }

    #[instrument(skip(self))]
    async fn notify_server_confirmed(&self, payment_intent_id: &str) -> CheckoutResult<Order> {
        let envelope: OrderEnvelope = self
            .client
            .post("/confirm-payment", &ConfirmPaymentRequest { payment_intent_id })
            .await
            .map_err(|e| {
                e.into_checkout(|status, message| {
                    if status == 409 || message.to_ascii_lowercase().contains("already") {
                        CheckoutError::AlreadyConfirmed
                    } else {
                        CheckoutError::Settlement(message)
                    }
                })
            })?;

        let order = self.convert_order(envelope.order);
        info!(order_id = %order.id, "server acknowledged confirmed payment");
        Ok(order)
    }

    fn provider_name(&self) -> &'static str {
        "stripe"
    }
}

// =============================================================================
// HTTP Gateway Protocol
// =============================================================================

#[derive(Debug, Serialize)]
struct WireConfirmRequest<'a> {
    client_secret: &'a str,
    payment_method: WirePaymentMethod<'a>,
}

#[derive(Debug, Serialize)]
struct WirePaymentMethod<'a> {
    card: &'a CardDetails,
}

#[derive(Debug, Deserialize)]
struct WireConfirmResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(rename = "paymentIntent", default)]
    payment_intent: Option<WirePaymentIntent>,
}

#[derive(Debug, Deserialize)]
struct WirePaymentIntent {
    id: String,
    status: String,
}

/// The gateway's own confirm call over HTTP.
///
/// The client secret authorizes the call; no merchant credential is attached.
/// Card data goes straight to the gateway and never touches our services.
pub struct HttpGatewayProtocol {
    http: reqwest::Client,
    base_url: String,
}

impl HttpGatewayProtocol {
    pub fn new(config: &RemoteConfig) -> CheckoutResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CheckoutError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.gateway_base_url.clone(),
        })
    }
}

#[async_trait]
impl GatewayProtocol for HttpGatewayProtocol {
    async fn confirm_card(
        &self,
        client_secret: &str,
        card: &CardDetails,
    ) -> CheckoutResult<GatewayConfirmation> {
        let url = format!("{}/v1/payment_intents/confirm", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&WireConfirmRequest {
                client_secret,
                payment_method: WirePaymentMethod { card },
            })
            .send()
            .await
            .map_err(|e| CheckoutError::Network(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| CheckoutError::Network(e.to_string()))?;

        let outcome: WireConfirmResponse = serde_json::from_str(&body)
            .map_err(|e| CheckoutError::Serialization(format!("unexpected gateway response: {e}")))?;

        if let Some(message) = outcome.error {
            return Err(CheckoutError::Gateway(message));
        }

        let intent = outcome.payment_intent.ok_or_else(|| {
            CheckoutError::Serialization("gateway response carries neither error nor intent".into())
        })?;

        debug!(intent_id = %intent.id, status = %intent.status, "gateway confirm resolved");
        Ok(match intent.status.as_str() {
            "succeeded" => GatewayConfirmation::succeeded(intent.id),
            "requires_action" | "requires_source_action" => {
                GatewayConfirmation::requires_action(intent.id)
            }
            other => GatewayConfirmation::failed(intent.id, format!("payment {other}")),
        })
    }
}
