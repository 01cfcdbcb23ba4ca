//! Order checkout flow.
//!
//! Sequences the three remote steps of a checkout attempt against a cart
//! snapshot:
//!
//! 1. create a payment intent for the snapshot total,
//! 2. confirm the payment with the shopper's payment method,
//! 3. record the order as `pending`.
//!
//! The steps run strictly in order; a failure at any step halts the attempt
//! without rolling back earlier steps. The cart is cleared and the phase
//! advances to the confirmation page if and only if order recording succeeds.
//! A failed attempt leaves the cart and phase untouched, and a retry creates
//! a brand-new payment intent: no idempotency key is sent, so two attempts
//! against the same cart produce two independent intent resources.
//!
//! The payment collaborator and the order store sit behind the
//! [`PaymentGateway`] and [`OrderRecorder`] seams so the sequencing rules can
//! be exercised without the network.

use rust_decimal::Decimal;
use tracing::instrument;

use sprig_core::{CurrencyCode, OrderId, OrderStatus, Price, PriceError, ProductId, UserId, VariantId};

use crate::models::cart::{Cart, CartSnapshot};

// =============================================================================
// Collaborator seams
// =============================================================================

/// A payment collaborator failure.
///
/// Carries the message shown verbatim to the shopper (e.g. `card_declined`).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct PaymentError(pub String);

/// An order persistence failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct RecordError(pub String);

/// One line of a payment intent request, taken from the cart snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentLine {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub name: String,
    pub quantity: u32,
}

/// Request to create one payment intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRequest {
    /// Amount in minor currency units; always > 0.
    pub amount_minor: i64,
    pub currency: CurrencyCode,
    /// Cart lines, forwarded as intent metadata.
    pub lines: Vec<IntentLine>,
    /// Email for the payment receipt, when the shopper is signed in.
    pub receipt_email: Option<String>,
}

/// A created payment intent, identified to the browser by its client secret.
#[derive(Debug, Clone)]
pub struct PaymentIntentHandle {
    pub payment_intent_id: String,
    pub client_secret: String,
    /// Receipt email echoed back by the collaborator.
    pub receipt_email: Option<String>,
}

/// Request to confirm a created intent with the shopper's payment method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmRequest {
    pub payment_intent_id: String,
    /// Client secret returned at intent creation.
    pub client_secret: String,
    /// Payment method reference collected by the payment page.
    pub payment_method: String,
    /// Where the collaborator may send the shopper if the method mandates a
    /// redirect; same-process confirmation is preferred.
    pub return_url: String,
    pub receipt_email: Option<String>,
}

/// The payment collaborator: intent creation and confirmation.
///
/// Each `create_intent` call creates one remote intent resource. The flow is
/// responsible for calling it at most once per attempt.
pub trait PaymentGateway {
    fn create_intent(
        &self,
        request: &IntentRequest,
    ) -> impl Future<Output = Result<PaymentIntentHandle, PaymentError>> + Send;

    fn confirm(
        &self,
        request: &ConfirmRequest,
    ) -> impl Future<Output = Result<(), PaymentError>> + Send;
}

/// One line of an order record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: u32,
}

/// The order record written after a confirmed payment.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// Always [`OrderStatus::Pending`]; nothing in this flow transitions it.
    pub status: OrderStatus,
    /// Order total in major currency units.
    pub total: Decimal,
    pub payment_intent_id: String,
    pub user_id: Option<UserId>,
    pub lines: Vec<OrderLine>,
}

/// The order store. Does not retry and does not roll back the payment.
pub trait OrderRecorder {
    fn record(&self, order: &NewOrder) -> impl Future<Output = Result<OrderId, RecordError>> + Send;
}

// =============================================================================
// Flow
// =============================================================================

/// Per-attempt inputs collected by the payment page.
#[derive(Debug, Clone)]
pub struct CheckoutParams {
    pub currency: CurrencyCode,
    pub payment_method: String,
    pub return_url: String,
    /// Signed-in shopper, if any; attached to the order and the receipt.
    pub user_id: Option<UserId>,
    pub receipt_email: Option<String>,
}

/// Why a checkout attempt stopped.
///
/// Every variant is terminal for the attempt; there are no automatic retries.
/// The payment-step variants carry the collaborator's message verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    /// The cart had no items when the attempt started.
    #[error("your cart is empty")]
    EmptyCart,
    /// The cart total could not be expressed in minor currency units.
    #[error("invalid order total: {0}")]
    InvalidAmount(#[from] PriceError),
    /// Intent creation failed; no payment UI interaction happened.
    #[error("{0}")]
    IntentCreation(String),
    /// Confirmation failed; the intent is left unconfirmed, never cleaned up.
    #[error("{0}")]
    Confirmation(String),
    /// The payment succeeded but the order could not be recorded. The charge
    /// stands; this attempt's payment intent is never reused.
    #[error("payment received but the order could not be saved: {0}")]
    OrderRecording(String),
}

/// A successfully completed checkout.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    pub payment_intent_id: String,
    /// The charged total in major currency units.
    pub total: Decimal,
}

/// Run one checkout attempt against the given cart.
///
/// Takes a snapshot of the cart up front; edits to the live cart after that
/// point do not affect this attempt. On success the cart is cleared and its
/// phase set to the confirmation page. On any error the cart is left exactly
/// as it was.
///
/// # Errors
///
/// Returns a [`CheckoutError`] naming the step that halted the attempt.
#[instrument(skip_all, fields(lines = cart.items().len()))]
pub async fn run_checkout<G, R>(
    cart: &mut Cart,
    gateway: &G,
    recorder: &R,
    params: &CheckoutParams,
) -> Result<CheckoutReceipt, CheckoutError>
where
    G: PaymentGateway,
    R: OrderRecorder,
{
    let snapshot = cart.snapshot();
    if snapshot.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let amount_minor = Price::new(snapshot.total(), params.currency).minor_units()?;

    let intent = gateway
        .create_intent(&IntentRequest {
            amount_minor,
            currency: params.currency,
            lines: intent_lines(&snapshot),
            receipt_email: params.receipt_email.clone(),
        })
        .await
        .map_err(|e| CheckoutError::IntentCreation(e.to_string()))?;

    tracing::debug!(intent = %intent.payment_intent_id, "payment intent created");

    gateway
        .confirm(&ConfirmRequest {
            payment_intent_id: intent.payment_intent_id.clone(),
            client_secret: intent.client_secret.clone(),
            payment_method: params.payment_method.clone(),
            return_url: params.return_url.clone(),
            receipt_email: intent
                .receipt_email
                .clone()
                .or_else(|| params.receipt_email.clone()),
        })
        .await
        .map_err(|e| CheckoutError::Confirmation(e.to_string()))?;

    let order = NewOrder {
        status: OrderStatus::Pending,
        total: snapshot.total(),
        payment_intent_id: intent.payment_intent_id.clone(),
        user_id: params.user_id,
        lines: order_lines(&snapshot),
    };

    let order_id = recorder
        .record(&order)
        .await
        .map_err(|e| CheckoutError::OrderRecording(e.to_string()))?;

    // The order exists; only now does the cart go away.
    cart.complete();

    tracing::info!(order = %order_id, intent = %intent.payment_intent_id, "checkout complete");

    Ok(CheckoutReceipt {
        order_id,
        payment_intent_id: intent.payment_intent_id,
        total: snapshot.total(),
    })
}

fn intent_lines(snapshot: &CartSnapshot) -> Vec<IntentLine> {
    snapshot
        .items()
        .iter()
        .map(|item| IntentLine {
            product_id: item.product_id,
            variant_id: item.variant_id,
            name: item.name.clone(),
            quantity: item.quantity,
        })
        .collect()
}

fn order_lines(snapshot: &CartSnapshot) -> Vec<OrderLine> {
    snapshot
        .items()
        .iter()
        .map(|item| OrderLine {
            product_id: item.product_id,
            variant_id: item.variant_id,
            quantity: item.quantity,
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use rust_decimal::Decimal;

    use super::*;
    use crate::models::cart::{CartItem, CheckoutPhase};

    // =========================================================================
    // Fakes
    // =========================================================================

    /// Scripted payment collaborator that records every call it receives.
    #[derive(Default)]
    struct FakeGateway {
        intents: Mutex<Vec<IntentRequest>>,
        confirms: Mutex<Vec<ConfirmRequest>>,
        fail_intent: Option<String>,
        fail_confirm: Option<String>,
    }

    impl FakeGateway {
        fn failing_intent(message: &str) -> Self {
            Self {
                fail_intent: Some(message.to_string()),
                ..Self::default()
            }
        }

        fn failing_confirm(message: &str) -> Self {
            Self {
                fail_confirm: Some(message.to_string()),
                ..Self::default()
            }
        }

        fn intent_calls(&self) -> Vec<IntentRequest> {
            self.intents.lock().unwrap().clone()
        }

        fn confirm_calls(&self) -> Vec<ConfirmRequest> {
            self.confirms.lock().unwrap().clone()
        }
    }

    impl PaymentGateway for FakeGateway {
        async fn create_intent(
            &self,
            request: &IntentRequest,
        ) -> Result<PaymentIntentHandle, PaymentError> {
            self.intents.lock().unwrap().push(request.clone());

            if let Some(message) = &self.fail_intent {
                return Err(PaymentError(message.clone()));
            }

            let serial = self.intents.lock().unwrap().len();
            Ok(PaymentIntentHandle {
                payment_intent_id: format!("pi_test_{serial}"),
                client_secret: format!("pi_test_{serial}_secret"),
                receipt_email: request.receipt_email.clone(),
            })
        }

        async fn confirm(&self, request: &ConfirmRequest) -> Result<(), PaymentError> {
            self.confirms.lock().unwrap().push(request.clone());

            match &self.fail_confirm {
                Some(message) => Err(PaymentError(message.clone())),
                None => Ok(()),
            }
        }
    }

    /// In-memory order store.
    #[derive(Default)]
    struct FakeRecorder {
        orders: Mutex<Vec<NewOrder>>,
        fail: bool,
    }

    impl FakeRecorder {
        const fn failing() -> Self {
            Self {
                orders: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn recorded(&self) -> Vec<NewOrder> {
            self.orders.lock().unwrap().clone()
        }
    }

    impl OrderRecorder for FakeRecorder {
        async fn record(&self, order: &NewOrder) -> Result<OrderId, RecordError> {
            if self.fail {
                return Err(RecordError("connection reset".to_string()));
            }

            let mut orders = self.orders.lock().unwrap();
            orders.push(order.clone());
            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            Ok(OrderId::new(orders.len() as i32))
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn cart_with(lines: &[(i32, i32, i64, u32)]) -> Cart {
        // (product, variant, price_cents, quantity)
        let mut cart = Cart::new();
        for &(product, variant, cents, quantity) in lines {
            cart.add(CartItem {
                product_id: ProductId::new(product),
                variant_id: VariantId::new(variant),
                name: format!("Product {product}"),
                price: Decimal::new(cents, 2),
                image: String::new(),
                quantity,
            });
        }
        cart.begin_payment();
        cart
    }

    fn params() -> CheckoutParams {
        CheckoutParams {
            currency: CurrencyCode::USD,
            payment_method: "pm_card_visa".to_string(),
            return_url: "http://localhost:3000/checkout/confirmation".to_string(),
            user_id: Some(UserId::new(7)),
            receipt_email: Some("shopper@example.com".to_string()),
        }
    }

    // =========================================================================
    // Tests
    // =========================================================================

    #[tokio::test]
    async fn test_intent_amount_is_total_in_minor_units() {
        // cart = [{product 1, variant 10, qty 2, price 25.00}], total 50.00
        let mut cart = cart_with(&[(1, 10, 2500, 2)]);
        let gateway = FakeGateway::default();
        let recorder = FakeRecorder::default();

        run_checkout(&mut cart, &gateway, &recorder, &params())
            .await
            .unwrap();

        let intents = gateway.intent_calls();
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].amount_minor, 5000);
        assert_eq!(intents[0].currency, CurrencyCode::USD);
    }

    #[tokio::test]
    async fn test_successful_flow_records_pending_order_and_clears_cart() {
        let mut cart = cart_with(&[(1, 10, 2500, 2)]);
        let gateway = FakeGateway::default();
        let recorder = FakeRecorder::default();

        let receipt = run_checkout(&mut cart, &gateway, &recorder, &params())
            .await
            .unwrap();

        let orders = recorder.recorded();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, OrderStatus::Pending);
        assert_eq!(orders[0].total, Decimal::new(5000, 2));
        assert_eq!(orders[0].payment_intent_id, receipt.payment_intent_id);
        assert_eq!(
            orders[0].lines,
            vec![OrderLine {
                product_id: ProductId::new(1),
                variant_id: VariantId::new(10),
                quantity: 2,
            }]
        );

        assert!(cart.is_empty());
        assert_eq!(cart.phase(), CheckoutPhase::ConfirmationPage);
        assert_eq!(receipt.total, Decimal::new(5000, 2));
    }

    #[tokio::test]
    async fn test_intent_error_surfaces_verbatim_and_halts() {
        let mut cart = cart_with(&[(1, 10, 2500, 2)]);
        let gateway = FakeGateway::failing_intent("card_declined");
        let recorder = FakeRecorder::default();

        let err = run_checkout(&mut cart, &gateway, &recorder, &params())
            .await
            .unwrap_err();

        assert_eq!(err, CheckoutError::IntentCreation("card_declined".into()));
        assert_eq!(err.to_string(), "card_declined");

        // Confirmation and recording never ran; cart and phase are unchanged.
        assert!(gateway.confirm_calls().is_empty());
        assert!(recorder.recorded().is_empty());
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.phase(), CheckoutPhase::Payment);
    }

    #[tokio::test]
    async fn test_confirmation_error_skips_recorder_and_keeps_cart() {
        let mut cart = cart_with(&[(1, 10, 2500, 2), (2, 20, 999, 1)]);
        let gateway = FakeGateway::failing_confirm("insufficient_funds");
        let recorder = FakeRecorder::default();

        let err = run_checkout(&mut cart, &gateway, &recorder, &params())
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Confirmation(_)));
        assert!(recorder.recorded().is_empty());
        assert!(!cart.is_empty());
        assert_eq!(cart.phase(), CheckoutPhase::Payment);
    }

    #[tokio::test]
    async fn test_recorder_failure_keeps_cart_after_captured_payment() {
        let mut cart = cart_with(&[(1, 10, 2500, 2)]);
        let gateway = FakeGateway::default();
        let recorder = FakeRecorder::failing();

        let err = run_checkout(&mut cart, &gateway, &recorder, &params())
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::OrderRecording(_)));

        // The payment went through; the cart must survive for the retry.
        assert_eq!(gateway.confirm_calls().len(), 1);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.phase(), CheckoutPhase::Payment);
    }

    #[tokio::test]
    async fn test_retry_after_recorder_failure_creates_second_intent() {
        let mut cart = cart_with(&[(1, 10, 2500, 2)]);
        let gateway = FakeGateway::default();
        let failing = FakeRecorder::failing();
        let working = FakeRecorder::default();

        run_checkout(&mut cart, &gateway, &failing, &params())
            .await
            .unwrap_err();
        run_checkout(&mut cart, &gateway, &working, &params())
            .await
            .unwrap();

        // No idempotency key: the second attempt created a fresh intent.
        let intents = gateway.intent_calls();
        assert_eq!(intents.len(), 2);
        assert_eq!(intents[0], intents[1]);
        assert_ne!(
            gateway.confirm_calls()[0].payment_intent_id,
            gateway.confirm_calls()[1].payment_intent_id
        );
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected_before_any_remote_call() {
        let mut cart = Cart::new();
        cart.begin_payment();
        let gateway = FakeGateway::default();
        let recorder = FakeRecorder::default();

        let err = run_checkout(&mut cart, &gateway, &recorder, &params())
            .await
            .unwrap_err();

        assert_eq!(err, CheckoutError::EmptyCart);
        assert!(gateway.intent_calls().is_empty());
    }

    #[tokio::test]
    async fn test_confirm_receives_intent_and_receipt_email() {
        let mut cart = cart_with(&[(1, 10, 2500, 1)]);
        let gateway = FakeGateway::default();
        let recorder = FakeRecorder::default();

        run_checkout(&mut cart, &gateway, &recorder, &params())
            .await
            .unwrap();

        let confirms = gateway.confirm_calls();
        assert_eq!(confirms.len(), 1);
        assert_eq!(confirms[0].payment_method, "pm_card_visa");
        assert_eq!(
            confirms[0].receipt_email.as_deref(),
            Some("shopper@example.com")
        );
        assert_eq!(confirms[0].payment_intent_id, "pi_test_1");
        assert_eq!(confirms[0].client_secret, "pi_test_1_secret");
    }

    #[tokio::test]
    async fn test_guest_checkout_records_order_without_user() {
        let mut cart = cart_with(&[(1, 10, 1500, 1)]);
        let gateway = FakeGateway::default();
        let recorder = FakeRecorder::default();
        let guest = CheckoutParams {
            user_id: None,
            receipt_email: None,
            ..params()
        };

        run_checkout(&mut cart, &gateway, &recorder, &guest)
            .await
            .unwrap();

        assert_eq!(recorder.recorded()[0].user_id, None);
        assert_eq!(gateway.confirm_calls()[0].receipt_email, None);
    }
}
