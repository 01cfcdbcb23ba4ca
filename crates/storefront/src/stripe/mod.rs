//! Stripe payment API client.
//!
//! Talks to Stripe's REST API with `reqwest`: form-encoded requests, JSON
//! responses, HTTP basic auth with the secret key. Implements the checkout
//! flow's [`PaymentGateway`] seam.
//!
//! Intent creation sends no idempotency key: every call creates a fresh
//! intent resource, and a retried checkout attempt pays against a new intent.

pub mod types;

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::checkout::{
    ConfirmRequest, IntentRequest, PaymentError, PaymentGateway, PaymentIntentHandle,
};
use crate::config::StripeConfig;

use types::{ApiErrorEnvelope, PaymentIntent};

/// Errors from the Stripe API client.
#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    /// HTTP request failed before a response was read.
    #[error("payment service unreachable: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned an error object. The message is the stable
    /// machine-readable code when the API provides one (e.g. `card_declined`).
    #[error("{0}")]
    Api(String),

    /// The response body could not be parsed.
    #[error("unexpected payment service response: {0}")]
    Parse(#[from] serde_json::Error),

    /// A created intent came back without the expected fields.
    #[error("payment intent missing {0}")]
    MissingField(&'static str),
}

/// Client for the Stripe payment API.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    api_base: String,
    secret_key: SecretString,
}

impl StripeClient {
    /// Create a new Stripe API client.
    #[must_use]
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            inner: Arc::new(StripeClientInner {
                client: reqwest::Client::new(),
                api_base: config.api_base.trim_end_matches('/').to_string(),
                secret_key: config.secret_key.clone(),
            }),
        }
    }

    /// POST a form-encoded request and parse the JSON response.
    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, StripeError> {
        let url = format!("{}{path}", self.inner.api_base);

        let response = self
            .inner
            .client
            .post(&url)
            .basic_auth(self.inner.secret_key.expose_secret(), None::<&str>)
            .form(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Error responses carry {"error": {...}}; fall back to the raw
            // status line if the body is not in that shape.
            return match serde_json::from_str::<ApiErrorEnvelope>(&body) {
                Ok(envelope) => Err(StripeError::Api(envelope.error.display_message())),
                Err(_) => {
                    tracing::error!(
                        status = %status,
                        body = %body.chars().take(500).collect::<String>(),
                        "Stripe API returned non-success status"
                    );
                    Err(StripeError::Api(format!("HTTP {status}")))
                }
            };
        }

        Ok(serde_json::from_str::<T>(&body)?)
    }

    /// Create a payment intent for the given amount.
    ///
    /// The cart lines travel as `metadata[lines]`, a compact
    /// `product:variant:quantity` summary for the Stripe dashboard.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Api` with the collaborator's code/message when
    /// the intent is rejected.
    #[instrument(skip_all, fields(amount = request.amount_minor, currency = %request.currency))]
    pub async fn create_payment_intent(
        &self,
        request: &IntentRequest,
    ) -> Result<PaymentIntent, StripeError> {
        let mut params = vec![
            ("amount".to_string(), request.amount_minor.to_string()),
            ("currency".to_string(), request.currency.code().to_string()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
            ("description".to_string(), line_description(request)),
            ("metadata[lines]".to_string(), line_summary(request)),
        ];
        if let Some(email) = &request.receipt_email {
            params.push(("receipt_email".to_string(), email.clone()));
        }

        let intent = self
            .post_form::<PaymentIntent>("/v1/payment_intents", &params)
            .await?;

        debug!(intent = %intent.id, "payment intent created");
        Ok(intent)
    }

    /// Confirm a payment intent with the shopper's payment method.
    ///
    /// The return URL is only used if the payment method mandates a redirect;
    /// confirmation is otherwise same-process.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Api` when the collaborator rejects the
    /// confirmation or the intent does not reach a confirmed status.
    #[instrument(skip_all, fields(intent = %request.payment_intent_id))]
    pub async fn confirm_payment_intent(
        &self,
        request: &ConfirmRequest,
    ) -> Result<PaymentIntent, StripeError> {
        let mut params = vec![
            (
                "payment_method".to_string(),
                request.payment_method.clone(),
            ),
            ("client_secret".to_string(), request.client_secret.clone()),
            ("return_url".to_string(), request.return_url.clone()),
        ];
        if let Some(email) = &request.receipt_email {
            params.push(("receipt_email".to_string(), email.clone()));
        }

        let path = format!("/v1/payment_intents/{}/confirm", request.payment_intent_id);
        let intent = self.post_form::<PaymentIntent>(&path, &params).await?;

        if intent.status.is_confirmed() {
            return Ok(intent);
        }

        // The API can answer 200 with an unconfirmed intent; surface the
        // attached payment error when there is one.
        let message = intent.last_payment_error.as_ref().map_or_else(
            || format!("payment not completed (status {:?})", intent.status),
            types::ApiErrorBody::display_message,
        );
        Err(StripeError::Api(message))
    }
}

/// Compact `product:variant:quantity` summary of the cart lines.
fn line_summary(request: &IntentRequest) -> String {
    request
        .lines
        .iter()
        .map(|line| {
            format!(
                "{}:{}:{}",
                line.product_id, line.variant_id, line.quantity
            )
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Human-readable order description shown in the Stripe dashboard.
fn line_description(request: &IntentRequest) -> String {
    request
        .lines
        .iter()
        .map(|line| format!("{} x{}", line.name, line.quantity))
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// PaymentGateway
// =============================================================================

impl PaymentGateway for StripeClient {
    async fn create_intent(
        &self,
        request: &IntentRequest,
    ) -> Result<PaymentIntentHandle, PaymentError> {
        let intent = self
            .create_payment_intent(request)
            .await
            .map_err(|e| PaymentError(e.to_string()))?;

        let client_secret = intent
            .client_secret
            .ok_or(StripeError::MissingField("client_secret"))
            .map_err(|e| PaymentError(e.to_string()))?;

        Ok(PaymentIntentHandle {
            payment_intent_id: intent.id,
            client_secret,
            receipt_email: intent.receipt_email,
        })
    }

    async fn confirm(&self, request: &ConfirmRequest) -> Result<(), PaymentError> {
        self.confirm_payment_intent(request)
            .await
            .map(|_| ())
            .map_err(|e| PaymentError(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sprig_core::{CurrencyCode, ProductId, VariantId};

    use super::*;
    use crate::checkout::IntentLine;

    #[test]
    fn test_line_summary_format() {
        let request = IntentRequest {
            amount_minor: 5000,
            currency: CurrencyCode::USD,
            lines: vec![
                IntentLine {
                    product_id: ProductId::new(1),
                    variant_id: VariantId::new(10),
                    name: "Sticker".to_string(),
                    quantity: 2,
                },
                IntentLine {
                    product_id: ProductId::new(3),
                    variant_id: VariantId::new(31),
                    name: "Mug".to_string(),
                    quantity: 1,
                },
            ],
            receipt_email: None,
        };

        assert_eq!(line_summary(&request), "1:10:2,3:31:1");
        assert_eq!(line_description(&request), "Sticker x2, Mug x1");
    }

    #[test]
    fn test_api_error_display_is_bare_message() {
        let err = StripeError::Api("card_declined".to_string());
        assert_eq!(err.to_string(), "card_declined");
    }
}
