//! # Checkout Orchestration
//!
//! The state machine that drives one checkout attempt from cart to a terminal
//! outcome, across both payment paths:
//!
//! ```text
//! Idle ──start_checkout──> MethodChosen{Legacy|GatewayCard}
//!
//!   Legacy:       MethodChosen ──submit──> Settling ──> Succeeded | Failed
//!
//!   GatewayCard:  MethodChosen ──submit──> AwaitingCardInput
//!                 AwaitingCardInput ──submit_card──> ConfirmingWithGateway
//!                 ConfirmingWithGateway ──> ConfirmingWithServer
//!                                         | RequiresAction | Failed
//!                 ConfirmingWithServer ──> Succeeded | Failed
//!
//!   AwaitingCardInput ──cancel──> Idle
//!   Succeeded | Failed | RequiresAction ──start_checkout──> MethodChosen
//! ```
//!
//! Transitions are explicit result-returning calls, so the machine is
//! synchronously testable without a rendering harness. All orchestration runs
//! on one logical thread; network operations are suspension points, and each
//! step's result is observed before the next step starts.

use crate::cart::CartStore;
use crate::error::{CheckoutError, CheckoutResult};
use crate::gateway::BoxedPaymentGateway;
use crate::intent::{CardDetails, ConfirmationStatus, IntentStatus, PaymentIntent};
use crate::money::Money;
use crate::order::Order;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The two mutually exclusive checkout paths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMethod {
    /// Immediate server-side settlement, no external gateway
    Legacy,
    /// Card payment via the external gateway's intent protocol
    GatewayCard,
}

impl std::fmt::Display for CheckoutMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckoutMethod::Legacy => write!(f, "legacy"),
            CheckoutMethod::GatewayCard => write!(f, "gateway card"),
        }
    }
}

/// State of the in-flight (or most recently finished) checkout attempt
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutState {
    /// No attempt in flight
    Idle,
    /// Attempt started, nothing submitted yet
    MethodChosen { method: CheckoutMethod },
    /// Legacy settlement request in flight
    Settling,
    /// Intent created; waiting for the shopper's card details
    AwaitingCardInput,
    /// Gateway confirm call in flight
    ConfirmingWithGateway,
    /// Server notification in flight; the charge already went through
    ConfirmingWithServer,
    /// Terminal: checkout confirmed by the authority that owns money
    Succeeded { order: Order },
    /// Terminal for this attempt: the gateway needs additional shopper
    /// authentication the client cannot drive itself
    RequiresAction { payment_intent_id: String },
    /// Terminal: the attempt failed; the cart is intact for retry
    Failed { reason: CheckoutError },
}

impl CheckoutState {
    /// Whether a new attempt may not start while in this state
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            CheckoutState::MethodChosen { .. }
                | CheckoutState::Settling
                | CheckoutState::AwaitingCardInput
                | CheckoutState::ConfirmingWithGateway
                | CheckoutState::ConfirmingWithServer
        )
    }

    fn describe(&self) -> &'static str {
        match self {
            CheckoutState::Idle => "idle",
            CheckoutState::MethodChosen { .. } => "method chosen",
            CheckoutState::Settling => "settling",
            CheckoutState::AwaitingCardInput => "awaiting card input",
            CheckoutState::ConfirmingWithGateway => "confirming with gateway",
            CheckoutState::ConfirmingWithServer => "confirming with server",
            CheckoutState::Succeeded { .. } => "succeeded",
            CheckoutState::RequiresAction { .. } => "awaiting gateway action",
            CheckoutState::Failed { .. } => "failed",
        }
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// One end-to-end effort to convert the cart into a paid order
#[derive(Debug, Clone)]
pub struct CheckoutAttempt {
    /// Opaque attempt id, generated at start
    pub id: Uuid,

    /// The chosen path
    pub method: CheckoutMethod,

    /// Current state
    pub state: CheckoutState,

    /// Grand total captured once at attempt start, guarding against the cart
    /// changing mid-flow
    pub cart_total_at_start: Money,

    /// The intent owned by this attempt (card path only); discarded with the
    /// attempt, never reused
    pub intent: Option<PaymentIntent>,

    /// When the attempt started
    pub started_at: DateTime<Utc>,
}

impl CheckoutAttempt {
    fn new(method: CheckoutMethod, cart_total_at_start: Money) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            state: CheckoutState::MethodChosen { method },
            cart_total_at_start,
            intent: None,
            started_at: Utc::now(),
        }
    }
}

/// A user intent forwarded by the presentation layer
#[derive(Debug, Clone)]
pub enum CheckoutIntent {
    StartCheckout(CheckoutMethod),
    Submit,
    SubmitCard(CardDetails),
    Cancel,
}

static IDLE: CheckoutState = CheckoutState::Idle;

/// Drives checkout attempts against the cart store and the payment gateway.
///
/// Owns the single-in-flight-attempt guarantee: at most one
/// [`CheckoutAttempt`] exists at a time, and `start_checkout` while one is in
/// flight fails with [`CheckoutError::AttemptInProgress`] without touching it.
pub struct CheckoutOrchestrator {
    cart: CartStore,
    gateway: BoxedPaymentGateway,
    attempt: Option<CheckoutAttempt>,
}

impl CheckoutOrchestrator {
    pub fn new(cart: CartStore, gateway: BoxedPaymentGateway) -> Self {
        Self {
            cart,
            gateway,
            attempt: None,
        }
    }

    /// The cart store, for loading and mutating the cart between attempts
    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    pub fn cart_mut(&mut self) -> &mut CartStore {
        &mut self.cart
    }

    /// Current state; [`CheckoutState::Idle`] when no attempt exists
    pub fn state(&self) -> &CheckoutState {
        self.attempt.as_ref().map_or(&IDLE, |a| &a.state)
    }

    /// The current attempt, terminal or in flight
    pub fn attempt(&self) -> Option<&CheckoutAttempt> {
        self.attempt.as_ref()
    }

    /// Route a presentation-layer intent to the matching transition
    pub async fn dispatch(&mut self, intent: CheckoutIntent) -> CheckoutResult<CheckoutState> {
        match intent {
            CheckoutIntent::StartCheckout(method) => self.start_checkout(method).await,
            CheckoutIntent::Submit => self.submit().await,
            CheckoutIntent::SubmitCard(card) => self.submit_card(card).await,
            CheckoutIntent::Cancel => self.cancel(),
        }
    }

    /// Begin a new attempt with the chosen method.
    ///
    /// Acknowledges a terminal previous attempt (discarding its intent),
    /// rejects an empty cart, and for the card method requires the gateway's
    /// public configuration to be usable. Captures the cart total.
    pub async fn start_checkout(&mut self, method: CheckoutMethod) -> CheckoutResult<CheckoutState> {
        if self.state().is_in_flight() {
            return Err(CheckoutError::AttemptInProgress);
        }

        // Explicit ack of Succeeded / Failed / RequiresAction; any old intent
        // dies here and is never resubmitted.
        if let Some(old) = self.attempt.take() {
            debug!(attempt = %old.id, outcome = %old.state, "previous attempt acknowledged");
        }

        let snapshot = self.cart.snapshot();
        if snapshot.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        if method == CheckoutMethod::GatewayCard {
            self.gateway.ensure_card_capability().await?;
        }

        let attempt = CheckoutAttempt::new(method, snapshot.grand_total);
        info!(
            attempt = %attempt.id,
            %method,
            total = %attempt.cart_total_at_start,
            "checkout started"
        );
        self.attempt = Some(attempt);
        Ok(self.state().clone())
    }

    /// Submit the chosen method.
    ///
    /// Legacy: one settlement round trip to a terminal outcome. GatewayCard:
    /// opens a fresh payment intent and waits for card input.
    pub async fn submit(&mut self) -> CheckoutResult<CheckoutState> {
        let method = match self.state() {
            CheckoutState::MethodChosen { method } => *method,
            state => return Err(self.invalid("submit", state)),
        };

        match method {
            CheckoutMethod::Legacy => self.settle_legacy().await,
            CheckoutMethod::GatewayCard => self.open_intent().await,
        }
    }

    async fn settle_legacy(&mut self) -> CheckoutResult<CheckoutState> {
        self.set_state(CheckoutState::Settling);

        // No automatic retry: an ambiguous failure may already have settled
        // server-side, and a second request could double-charge.
        let result = self.gateway.clone().settle().await;
        match result {
            Ok(order) => Ok(self.succeed(order)),
            Err(err) => Err(self.fail(err)),
        }
    }

    async fn open_intent(&mut self) -> CheckoutResult<CheckoutState> {
        let result = self.gateway.clone().create_intent().await;
        match result {
            Ok(intent) => {
                debug!(order_id = %intent.order_id, "payment intent created");
                let attempt = self.attempt.as_mut().ok_or(CheckoutError::AttemptInProgress)?;
                attempt.intent = Some(intent);
                attempt.state = CheckoutState::AwaitingCardInput;
                Ok(self.state().clone())
            }
            Err(CheckoutError::Auth(msg)) => Err(self.fail(CheckoutError::Auth(msg))),
            Err(err) => Err(self.fail(CheckoutError::GatewayUnavailable(err.to_string()))),
        }
    }

    /// Confirm the charge with the shopper's card and finish the attempt.
    ///
    /// Guards against a stale cart first; after the gateway confirms, the
    /// server notification runs to a terminal outcome even if the cart has
    /// moved on — the server is the authority on the order it settles.
    pub async fn submit_card(&mut self, card: CardDetails) -> CheckoutResult<CheckoutState> {
        match self.state() {
            CheckoutState::AwaitingCardInput => {}
            state => return Err(self.invalid("submit card", state)),
        }

        let (expected, intent) = {
            let attempt = self
                .attempt
                .as_ref()
                .ok_or(CheckoutError::AttemptInProgress)?;
            (attempt.cart_total_at_start, attempt.intent.clone())
        };
        let actual = self.cart.snapshot().grand_total;
        if !expected.approx_eq(actual) {
            warn!(%expected, %actual, "cart changed since attempt start");
            let reason = CheckoutError::StaleCart {
                expected: expected.display(),
                actual: actual.display(),
            };
            return Err(self.fail(reason));
        }

        let Some(intent) = intent else {
            return Err(self.invalid("submit card", &CheckoutState::AwaitingCardInput));
        };

        self.set_state(CheckoutState::ConfirmingWithGateway);
        let result = self
            .gateway
            .clone()
            .confirm_card_payment(&intent.client_secret, &card)
            .await;
        let confirmation = match result {
            Ok(confirmation) => confirmation,
            Err(err) => return Err(self.fail(err)),
        };

        match confirmation.status {
            ConfirmationStatus::Failed => {
                if let Some(attempt) = self.attempt.as_mut() {
                    if let Some(intent) = attempt.intent.as_mut() {
                        intent.status = IntentStatus::Failed;
                    }
                }
                let reason = CheckoutError::Gateway(
                    confirmation
                        .message
                        .unwrap_or_else(|| "card payment declined".to_string()),
                );
                Err(self.fail(reason))
            }
            ConfirmationStatus::RequiresAction => {
                info!(intent_id = %confirmation.payment_intent_id, "gateway requires shopper action");
                self.set_state(CheckoutState::RequiresAction {
                    payment_intent_id: confirmation.payment_intent_id,
                });
                Ok(self.state().clone())
            }
            ConfirmationStatus::Succeeded => {
                if let Some(attempt) = self.attempt.as_mut() {
                    if let Some(intent) = attempt.intent.as_mut() {
                        intent.status = IntentStatus::Confirmed;
                    }
                }
                self.set_state(CheckoutState::ConfirmingWithServer);
                let result = self
                    .gateway
                    .clone()
                    .notify_server_confirmed(&confirmation.payment_intent_id)
                    .await;
                match result {
                    Ok(order) => Ok(self.succeed(order)),
                    Err(err) => Err(self.fail(err)),
                }
            }
        }
    }

    /// Abandon the attempt before the card is submitted.
    ///
    /// Only legal from `AwaitingCardInput`; once the gateway confirm has
    /// begun there is no safe client-side cancellation of an in-flight
    /// charge, so the attempt must run to a terminal outcome.
    pub fn cancel(&mut self) -> CheckoutResult<CheckoutState> {
        if !matches!(self.state(), CheckoutState::AwaitingCardInput) {
            let state = self.state().clone();
            return Err(self.invalid("cancel", &state));
        }
        if let Some(attempt) = self.attempt.take() {
            info!(attempt = %attempt.id, "checkout cancelled before card submission");
        }
        Ok(CheckoutState::Idle)
    }

    fn set_state(&mut self, state: CheckoutState) {
        if let Some(attempt) = self.attempt.as_mut() {
            debug!(attempt = %attempt.id, from = %attempt.state, to = %state, "transition");
            attempt.state = state;
        }
    }

    /// Terminal success: clear the cart exactly once, hold the state for
    /// display until the next `start_checkout` acknowledges it.
    fn succeed(&mut self, order: Order) -> CheckoutState {
        info!(order_id = %order.id, total = %order.total_amount, "checkout succeeded");
        self.set_state(CheckoutState::Succeeded { order });
        self.cart.clear();
        self.state().clone()
    }

    /// Terminal failure: record the reason, leave the cart untouched.
    fn fail(&mut self, reason: CheckoutError) -> CheckoutError {
        warn!(%reason, "checkout attempt failed");
        self.set_state(CheckoutState::Failed {
            reason: reason.clone(),
        });
        reason
    }

    fn invalid(&self, action: &str, state: &CheckoutState) -> CheckoutError {
        CheckoutError::InvalidTransition {
            action: action.to_string(),
            state: state.describe().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::tests::{cart_of, item, ScriptedCartService};
    use crate::cart::CartStore;
    use crate::gateway::PaymentGateway;
    use crate::intent::GatewayConfirmation;
    use crate::money::Currency;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Scripted gateway: pops the next response per operation, records calls
    #[derive(Default)]
    struct ScriptedGateway {
        capability: Mutex<Vec<CheckoutResult<()>>>,
        settlements: Mutex<Vec<CheckoutResult<Order>>>,
        intents: Mutex<Vec<CheckoutResult<PaymentIntent>>>,
        confirmations: Mutex<Vec<CheckoutResult<GatewayConfirmation>>>,
        notifications: Mutex<Vec<CheckoutResult<Order>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedGateway {
        fn pop<T>(queue: &Mutex<Vec<CheckoutResult<T>>>, op: &str) -> CheckoutResult<T> {
            let mut queue = queue.lock().unwrap();
            if queue.is_empty() {
                panic!("scripted gateway exhausted for {op}");
            }
            queue.remove(0)
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PaymentGateway for ScriptedGateway {
        async fn settle(&self) -> CheckoutResult<Order> {
            self.record("settle".to_string());
            Self::pop(&self.settlements, "settle")
        }

        async fn ensure_card_capability(&self) -> CheckoutResult<()> {
            self.record("capability".to_string());
            Self::pop(&self.capability, "capability")
        }

        async fn create_intent(&self) -> CheckoutResult<PaymentIntent> {
            self.record("create_intent".to_string());
            Self::pop(&self.intents, "create_intent")
        }

        async fn confirm_card_payment(
            &self,
            client_secret: &str,
            _card: &CardDetails,
        ) -> CheckoutResult<GatewayConfirmation> {
            self.record(format!("confirm {client_secret}"));
            Self::pop(&self.confirmations, "confirm_card_payment")
        }

        async fn notify_server_confirmed(&self, payment_intent_id: &str) -> CheckoutResult<Order> {
            self.record(format!("notify {payment_intent_id}"));
            Self::pop(&self.notifications, "notify_server_confirmed")
        }

        fn provider_name(&self) -> &'static str {
            "scripted"
        }
    }

    fn card() -> CardDetails {
        CardDetails::new("4242424242424242", 12, 2030, "123")
    }

    fn usd(major: f64) -> Money {
        Money::from_major(major, Currency::USD)
    }

    /// Orchestrator whose cart snapshot is preloaded with the given cart
    async fn orchestrator_with(
        cart: crate::cart::Cart,
        gateway: Arc<ScriptedGateway>,
    ) -> CheckoutOrchestrator {
        let service = Arc::new(ScriptedCartService::new(vec![Ok(cart)]));
        let mut store = CartStore::new(service, Currency::USD);
        store.load().await.unwrap();
        CheckoutOrchestrator::new(store, gateway)
    }

    #[tokio::test]
    async fn test_legacy_settlement_success() {
        // Scenario: one item at $10.00 x2, legacy settle returns order #7
        let gateway = Arc::new(ScriptedGateway::default());
        gateway
            .settlements
            .lock()
            .unwrap()
            .push(Ok(Order::new("7", usd(20.0))));
        let mut orch = orchestrator_with(cart_of(vec![item("a", 1000, 2)]), gateway).await;

        orch.start_checkout(CheckoutMethod::Legacy).await.unwrap();
        let state = orch.submit().await.unwrap();

        match state {
            CheckoutState::Succeeded { order } => {
                assert_eq!(order.id, "7");
                assert_eq!(order.total_amount, usd(20.0));
            }
            other => panic!("expected Succeeded, got {other:?}"),
        }
        assert!(orch.cart().snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let gateway = Arc::new(ScriptedGateway::default());
        let mut orch =
            orchestrator_with(crate::cart::Cart::empty(Currency::USD), gateway.clone()).await;

        let err = orch.start_checkout(CheckoutMethod::Legacy).await.unwrap_err();
        assert_eq!(err, CheckoutError::EmptyCart);
        assert_eq!(*orch.state(), CheckoutState::Idle);
        assert!(orch.attempt().is_none());
    }

    #[tokio::test]
    async fn test_card_method_unavailable_without_config() {
        // Scenario: stripe-config reports no public key
        let gateway = Arc::new(ScriptedGateway::default());
        gateway
            .capability
            .lock()
            .unwrap()
            .extend([Err(CheckoutError::GatewayConfigMissing)]);
        gateway
            .settlements
            .lock()
            .unwrap()
            .push(Ok(Order::new("8", usd(20.0))));
        let mut orch = orchestrator_with(cart_of(vec![item("a", 1000, 2)]), gateway).await;

        let err = orch
            .start_checkout(CheckoutMethod::GatewayCard)
            .await
            .unwrap_err();
        assert_eq!(err, CheckoutError::GatewayConfigMissing);
        assert_eq!(*orch.state(), CheckoutState::Idle);

        // Legacy remains available
        orch.start_checkout(CheckoutMethod::Legacy).await.unwrap();
        let state = orch.submit().await.unwrap();
        assert!(matches!(state, CheckoutState::Succeeded { .. }));
    }

    #[tokio::test]
    async fn test_declined_card_fails_and_restart_gets_fresh_intent() {
        // Scenario: first intent's confirm is declined; the retry must run on
        // a brand-new client secret
        let gateway = Arc::new(ScriptedGateway::default());
        gateway.capability.lock().unwrap().extend([Ok(()), Ok(())]);
        gateway.intents.lock().unwrap().extend([
            Ok(PaymentIntent::new("secret_1", "ord_1")),
            Ok(PaymentIntent::new("secret_2", "ord_2")),
        ]);
        gateway.confirmations.lock().unwrap().extend([
            Err(CheckoutError::Gateway("card_declined".into())),
            Ok(GatewayConfirmation::succeeded("pi_2")),
        ]);
        gateway
            .notifications
            .lock()
            .unwrap()
            .push(Ok(Order::new("9", usd(20.0))));
        let mut orch = orchestrator_with(cart_of(vec![item("a", 1000, 2)]), gateway.clone()).await;

        orch.start_checkout(CheckoutMethod::GatewayCard).await.unwrap();
        orch.submit().await.unwrap();
        let err = orch.submit_card(card()).await.unwrap_err();
        assert_eq!(err, CheckoutError::Gateway("card_declined".into()));
        assert!(matches!(orch.state(), CheckoutState::Failed { .. }));
        // Failure leaves the cart intact for retry
        assert_eq!(orch.cart().snapshot().grand_total, usd(20.0));

        orch.start_checkout(CheckoutMethod::GatewayCard).await.unwrap();
        orch.submit().await.unwrap();
        orch.submit_card(card()).await.unwrap();

        let calls = gateway.calls();
        let confirms: Vec<_> = calls.iter().filter(|c| c.starts_with("confirm")).collect();
        assert_eq!(confirms, ["confirm secret_1", "confirm secret_2"]);
    }

    #[tokio::test]
    async fn test_full_card_flow_succeeds_and_clears_cart() {
        let gateway = Arc::new(ScriptedGateway::default());
        gateway.capability.lock().unwrap().push(Ok(()));
        gateway
            .intents
            .lock()
            .unwrap()
            .push(Ok(PaymentIntent::new("secret_1", "ord_1")));
        gateway
            .confirmations
            .lock()
            .unwrap()
            .push(Ok(GatewayConfirmation::succeeded("pi_1")));
        // The server order total is authoritative even when it differs from
        // the local snapshot; no client-side reconciliation happens here
        gateway
            .notifications
            .lock()
            .unwrap()
            .push(Ok(Order::new("10", usd(47.5))));
        let mut orch = orchestrator_with(cart_of(vec![item("a", 2500, 2)]), gateway.clone()).await;

        orch.start_checkout(CheckoutMethod::GatewayCard).await.unwrap();
        orch.submit().await.unwrap();
        let state = orch.submit_card(card()).await.unwrap();

        match state {
            CheckoutState::Succeeded { order } => assert_eq!(order.total_amount, usd(47.5)),
            other => panic!("expected Succeeded, got {other:?}"),
        }
        assert!(orch.cart().snapshot().is_empty());
        assert_eq!(
            gateway.calls().last().map(String::as_str),
            Some("notify pi_1")
        );
    }

    #[tokio::test]
    async fn test_stale_cart_detected_at_card_submission() {
        let gateway = Arc::new(ScriptedGateway::default());
        gateway.capability.lock().unwrap().push(Ok(()));
        gateway
            .intents
            .lock()
            .unwrap()
            .push(Ok(PaymentIntent::new("secret_1", "ord_1")));
        let service = Arc::new(ScriptedCartService::new(vec![
            Ok(cart_of(vec![item("a", 2500, 2)])), // $50.00 at attempt start
            Ok(cart_of(vec![item("a", 1500, 2)])), // mutated to $30.00
        ]));
        let mut store = CartStore::new(service, Currency::USD);
        store.load().await.unwrap();
        let mut orch = CheckoutOrchestrator::new(store, gateway);

        orch.start_checkout(CheckoutMethod::GatewayCard).await.unwrap();
        orch.submit().await.unwrap();

        // Another tab changed the cart; this session reloads it
        orch.cart_mut().load().await.unwrap();

        let err = orch.submit_card(card()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::StaleCart { .. }));
        assert!(matches!(orch.state(), CheckoutState::Failed { .. }));
        // A fresh start_checkout is required and the cart survives
        assert_eq!(orch.cart().snapshot().grand_total, usd(30.0));
    }

    #[tokio::test]
    async fn test_single_attempt_in_flight() {
        let gateway = Arc::new(ScriptedGateway::default());
        let mut orch = orchestrator_with(cart_of(vec![item("a", 1000, 1)]), gateway).await;

        orch.start_checkout(CheckoutMethod::Legacy).await.unwrap();
        let first_id = orch.attempt().unwrap().id;

        let err = orch.start_checkout(CheckoutMethod::Legacy).await.unwrap_err();
        assert_eq!(err, CheckoutError::AttemptInProgress);
        // The first attempt is untouched
        assert_eq!(orch.attempt().unwrap().id, first_id);
        assert_eq!(
            *orch.state(),
            CheckoutState::MethodChosen {
                method: CheckoutMethod::Legacy
            }
        );
    }

    #[tokio::test]
    async fn test_cancel_only_from_awaiting_card_input() {
        let gateway = Arc::new(ScriptedGateway::default());
        gateway.capability.lock().unwrap().push(Ok(()));
        gateway
            .intents
            .lock()
            .unwrap()
            .push(Ok(PaymentIntent::new("secret_1", "ord_1")));
        let mut orch = orchestrator_with(cart_of(vec![item("a", 1000, 1)]), gateway).await;

        // Not yet legal: method chosen but nothing submitted
        orch.start_checkout(CheckoutMethod::GatewayCard).await.unwrap();
        let err = orch.cancel().unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidTransition { .. }));

        orch.submit().await.unwrap();
        let state = orch.cancel().unwrap();
        assert_eq!(state, CheckoutState::Idle);
        assert!(orch.attempt().is_none());
        // No side effects on the cart
        assert_eq!(orch.cart().snapshot().grand_total, usd(10.0));
    }

    #[tokio::test]
    async fn test_cancel_rejected_while_confirming_with_gateway() {
        // Once the gateway confirm has begun the attempt must run to a
        // terminal outcome
        let gateway = Arc::new(ScriptedGateway::default());
        let mut orch = orchestrator_with(cart_of(vec![item("a", 1000, 1)]), gateway).await;
        orch.attempt = Some(CheckoutAttempt {
            id: Uuid::new_v4(),
            method: CheckoutMethod::GatewayCard,
            state: CheckoutState::ConfirmingWithGateway,
            cart_total_at_start: usd(10.0),
            intent: Some(PaymentIntent::new("secret_1", "ord_1")),
            started_at: Utc::now(),
        });

        let err = orch.cancel().unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidTransition { .. }));
        assert_eq!(*orch.state(), CheckoutState::ConfirmingWithGateway);
    }

    #[tokio::test]
    async fn test_requires_action_is_a_distinct_state() {
        let gateway = Arc::new(ScriptedGateway::default());
        gateway.capability.lock().unwrap().push(Ok(()));
        gateway
            .intents
            .lock()
            .unwrap()
            .push(Ok(PaymentIntent::new("secret_1", "ord_1")));
        gateway
            .confirmations
            .lock()
            .unwrap()
            .push(Ok(GatewayConfirmation::requires_action("pi_1")));
        let mut orch = orchestrator_with(cart_of(vec![item("a", 1000, 1)]), gateway).await;

        orch.start_checkout(CheckoutMethod::GatewayCard).await.unwrap();
        orch.submit().await.unwrap();
        let state = orch.submit_card(card()).await.unwrap();

        assert_eq!(
            state,
            CheckoutState::RequiresAction {
                payment_intent_id: "pi_1".to_string()
            }
        );
        // Not a success: the cart is untouched
        assert_eq!(orch.cart().snapshot().grand_total, usd(10.0));
        // Terminal for this attempt: only a fresh start_checkout leaves it
        let err = orch.submit_card(card()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_intent_creation_failure_fails_attempt() {
        let gateway = Arc::new(ScriptedGateway::default());
        gateway.capability.lock().unwrap().push(Ok(()));
        gateway
            .intents
            .lock()
            .unwrap()
            .push(Err(CheckoutError::Network("connect timeout".into())));
        let mut orch = orchestrator_with(cart_of(vec![item("a", 1000, 1)]), gateway).await;

        orch.start_checkout(CheckoutMethod::GatewayCard).await.unwrap();
        let err = orch.submit().await.unwrap_err();
        assert!(matches!(err, CheckoutError::GatewayUnavailable(_)));
        assert!(matches!(orch.state(), CheckoutState::Failed { .. }));
        assert_eq!(orch.cart().snapshot().grand_total, usd(10.0));
    }

    #[tokio::test]
    async fn test_server_notification_failure_fails_attempt_and_keeps_cart() {
        let gateway = Arc::new(ScriptedGateway::default());
        gateway.capability.lock().unwrap().push(Ok(()));
        gateway
            .intents
            .lock()
            .unwrap()
            .push(Ok(PaymentIntent::new("secret_1", "ord_1")));
        gateway
            .confirmations
            .lock()
            .unwrap()
            .push(Ok(GatewayConfirmation::succeeded("pi_1")));
        gateway
            .notifications
            .lock()
            .unwrap()
            .push(Err(CheckoutError::Network("reset by peer".into())));
        let mut orch = orchestrator_with(cart_of(vec![item("a", 1000, 1)]), gateway).await;

        orch.start_checkout(CheckoutMethod::GatewayCard).await.unwrap();
        orch.submit().await.unwrap();
        let err = orch.submit_card(card()).await.unwrap_err();

        assert_eq!(err, CheckoutError::Network("reset by peer".into()));
        assert!(matches!(orch.state(), CheckoutState::Failed { .. }));
        // The charge may have landed server-side; the cart is preserved and
        // nothing is retried automatically
        assert_eq!(orch.cart().snapshot().grand_total, usd(10.0));
    }

    #[tokio::test]
    async fn test_auth_failure_aborts_attempt() {
        let gateway = Arc::new(ScriptedGateway::default());
        gateway
            .settlements
            .lock()
            .unwrap()
            .push(Err(CheckoutError::Auth("token expired".into())));
        let mut orch = orchestrator_with(cart_of(vec![item("a", 1000, 1)]), gateway).await;

        orch.start_checkout(CheckoutMethod::Legacy).await.unwrap();
        let err = orch.submit().await.unwrap_err();
        assert_eq!(err, CheckoutError::Auth("token expired".into()));
        assert!(matches!(
            orch.state(),
            CheckoutState::Failed {
                reason: CheckoutError::Auth(_)
            }
        ));
    }

    #[tokio::test]
    async fn test_success_is_held_until_next_start_acks() {
        let gateway = Arc::new(ScriptedGateway::default());
        gateway
            .settlements
            .lock()
            .unwrap()
            .push(Ok(Order::new("7", usd(10.0))));
        let mut orch = orchestrator_with(cart_of(vec![item("a", 1000, 1)]), gateway).await;

        orch.start_checkout(CheckoutMethod::Legacy).await.unwrap();
        orch.submit().await.unwrap();
        // The confirmation stays visible for the presentation layer
        assert!(matches!(orch.state(), CheckoutState::Succeeded { .. }));

        // The ack happens on the next start_checkout; the cart is now empty
        // so it lands back in Idle
        let err = orch.start_checkout(CheckoutMethod::Legacy).await.unwrap_err();
        assert_eq!(err, CheckoutError::EmptyCart);
        assert_eq!(*orch.state(), CheckoutState::Idle);
    }

    #[tokio::test]
    async fn test_dispatch_routes_intents() {
        let gateway = Arc::new(ScriptedGateway::default());
        gateway
            .settlements
            .lock()
            .unwrap()
            .push(Ok(Order::new("7", usd(10.0))));
        let mut orch = orchestrator_with(cart_of(vec![item("a", 1000, 1)]), gateway).await;

        orch.dispatch(CheckoutIntent::StartCheckout(CheckoutMethod::Legacy))
            .await
            .unwrap();
        let state = orch.dispatch(CheckoutIntent::Submit).await.unwrap();
        assert!(matches!(state, CheckoutState::Succeeded { .. }));

        let err = orch.dispatch(CheckoutIntent::Cancel).await.unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidTransition { .. }));
    }
}
