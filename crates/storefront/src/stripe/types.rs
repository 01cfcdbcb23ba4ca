//! Stripe API response types.
//!
//! Only the fields this application reads are modeled; everything else in
//! Stripe's responses is ignored during deserialization.

use serde::Deserialize;

/// A payment intent as returned by create and confirm calls.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    /// Secret handed to the browser; present on server-side calls.
    pub client_secret: Option<String>,
    /// Lifecycle status, e.g. `requires_confirmation`, `succeeded`.
    pub status: PaymentIntentStatus,
    pub receipt_email: Option<String>,
    /// Populated when the most recent confirmation attempt failed.
    pub last_payment_error: Option<ApiErrorBody>,
}

/// Payment intent lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Succeeded,
    Canceled,
}

impl PaymentIntentStatus {
    /// Whether the intent is settled from the storefront's point of view.
    ///
    /// `processing` counts: the collaborator accepted the payment method and
    /// will settle asynchronously.
    #[must_use]
    pub const fn is_confirmed(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Processing | Self::RequiresCapture
        )
    }
}

/// Error object embedded in non-2xx responses and failed intents.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Machine-readable code, e.g. `card_declined`.
    pub code: Option<String>,
    /// Human-readable message.
    pub message: Option<String>,
}

impl ApiErrorBody {
    /// The string surfaced to the shopper: the code when present (stable and
    /// terse), otherwise the message, otherwise a generic fallback.
    #[must_use]
    pub fn display_message(&self) -> String {
        self.code
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "payment failed".to_string())
    }
}

/// Top-level error envelope: `{"error": {...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_payment_intent() {
        let json = r#"{
            "id": "pi_3Abc",
            "object": "payment_intent",
            "amount": 5000,
            "client_secret": "pi_3Abc_secret_xyz",
            "currency": "usd",
            "status": "requires_confirmation",
            "receipt_email": "shopper@example.com",
            "last_payment_error": null
        }"#;

        let intent: PaymentIntent = serde_json::from_str(json).unwrap();
        assert_eq!(intent.id, "pi_3Abc");
        assert_eq!(intent.client_secret.as_deref(), Some("pi_3Abc_secret_xyz"));
        assert_eq!(intent.status, PaymentIntentStatus::RequiresConfirmation);
        assert!(!intent.status.is_confirmed());
    }

    #[test]
    fn test_deserialize_error_envelope() {
        let json = r#"{
            "error": {
                "code": "card_declined",
                "message": "Your card was declined.",
                "type": "card_error"
            }
        }"#;

        let envelope: ApiErrorEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.error.display_message(), "card_declined");
    }

    #[test]
    fn test_display_message_falls_back_to_message() {
        let body = ApiErrorBody {
            code: None,
            message: Some("No such payment_intent".to_string()),
        };
        assert_eq!(body.display_message(), "No such payment_intent");
    }

    #[test]
    fn test_confirmed_statuses() {
        assert!(PaymentIntentStatus::Succeeded.is_confirmed());
        assert!(PaymentIntentStatus::Processing.is_confirmed());
        assert!(!PaymentIntentStatus::RequiresAction.is_confirmed());
        assert!(!PaymentIntentStatus::Canceled.is_confirmed());
    }
}
