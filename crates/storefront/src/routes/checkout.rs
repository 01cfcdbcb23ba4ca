//! Checkout route handlers.
//!
//! `GET /checkout` renders the payment page and advances the session cart to
//! the payment phase. `POST /checkout/pay` drives the checkout flow; on
//! success the shopper lands on the confirmation page with an emptied cart,
//! on failure the payment page re-renders with the error and the cart intact.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::checkout::{CheckoutParams, run_checkout};
use crate::db::orders::OrderRepository;
use crate::error::AppError;
use crate::filters;
use crate::middleware::MaybeUser;
use crate::models::cart::CheckoutPhase;
use crate::routes::cart::{CartView, load_cart, save_cart};
use crate::state::AppState;

/// Session key for the receipt shown on the confirmation page.
const LAST_ORDER_KEY: &str = "last_order";

/// Receipt summary carried from the pay handler to the confirmation page.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReceiptView {
    order_id: i32,
    total: String,
}

/// Payment form data: the payment method reference collected by Stripe.js.
#[derive(Debug, Deserialize)]
pub struct PayForm {
    pub payment_method: String,
}

/// Payment page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/payment.html")]
pub struct CheckoutPaymentTemplate {
    pub cart: CartView,
    pub publishable_key: String,
    /// Non-empty when the previous attempt failed.
    pub error_message: String,
}

/// Confirmation page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/confirmation.html")]
pub struct CheckoutConfirmationTemplate {
    pub order_id: String,
    pub total: String,
}

/// Display the payment page, entering the payment phase.
#[instrument(skip(state, session))]
pub async fn payment_page(
    State(state): State<AppState>,
    session: Session,
) -> Result<Response, AppError> {
    let mut cart = load_cart(&session).await;
    if cart.is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }

    cart.begin_payment();
    save_cart(&session, &cart).await?;

    Ok(CheckoutPaymentTemplate {
        cart: CartView::from(&cart),
        publishable_key: state.config().stripe.publishable_key.clone(),
        error_message: String::new(),
    }
    .into_response())
}

/// Run one checkout attempt.
///
/// Sequences intent creation, confirmation, and order recording against the
/// session cart. Each attempt creates a brand-new payment intent; a failed
/// attempt changes nothing and the shopper may retry.
#[instrument(skip_all)]
pub async fn pay(
    State(state): State<AppState>,
    session: Session,
    MaybeUser(user): MaybeUser,
    Form(form): Form<PayForm>,
) -> Result<Response, AppError> {
    let mut cart = load_cart(&session).await;

    let base_url = state.config().base_url.trim_end_matches('/');
    let params = CheckoutParams {
        currency: state.config().stripe.currency,
        payment_method: form.payment_method,
        return_url: format!("{base_url}/checkout/confirmation"),
        user_id: user.as_ref().map(|u| u.id),
        receipt_email: user.as_ref().map(|u| u.email.to_string()),
    };

    let recorder = OrderRepository::new(state.pool());

    match run_checkout(&mut cart, state.payments(), &recorder, &params).await {
        Ok(receipt) => {
            tracing::debug!(intent = %receipt.payment_intent_id, "redirecting to confirmation");
            save_cart(&session, &cart).await?;
            session
                .insert(
                    LAST_ORDER_KEY,
                    ReceiptView {
                        order_id: receipt.order_id.as_i32(),
                        total: format!("${:.2}", receipt.total),
                    },
                )
                .await?;

            Ok(Redirect::to("/checkout/confirmation").into_response())
        }
        Err(error) => {
            tracing::warn!(%error, "checkout attempt failed");

            // The flow left the cart untouched; re-render the payment step
            // with the error surfaced to the shopper.
            Ok(CheckoutPaymentTemplate {
                cart: CartView::from(&cart),
                publishable_key: state.config().stripe.publishable_key.clone(),
                error_message: error.to_string(),
            }
            .into_response())
        }
    }
}

/// Display the order confirmation page.
///
/// Only reachable once the flow has advanced the cart to the
/// confirmation-page phase; otherwise the shopper is sent back to the cart.
#[instrument(skip(session))]
pub async fn confirmation(session: Session) -> Result<Response, AppError> {
    let cart = load_cart(&session).await;
    if cart.phase() != CheckoutPhase::ConfirmationPage {
        return Ok(Redirect::to("/cart").into_response());
    }

    let receipt: Option<ReceiptView> = session.get(LAST_ORDER_KEY).await.ok().flatten();
    let (order_id, total) = receipt.map_or_else(
        || (String::new(), String::new()),
        |r| (r.order_id.to_string(), r.total),
    );

    Ok(CheckoutConfirmationTemplate { order_id, total }.into_response())
}
