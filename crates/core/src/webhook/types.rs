//! Webhook wire types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use numera_shared::types::InvoiceId;

use crate::billing::InvoiceType;

/// A payment confirmation event from the billing gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfirmation {
    /// Invoice identifier on the gateway side.
    pub external_invoice_id: String,
    /// Free-text field embedding our `Provider:{id}` reference.
    pub notes: String,
    /// Amount collected, as reported by the gateway.
    pub amount: Option<Decimal>,
    /// When the gateway collected the payment.
    pub paid_at: Option<DateTime<Utc>>,
}

/// An overdue notice event from the billing gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct OverdueNotice {
    /// Invoice identifier on the gateway side.
    pub external_invoice_id: String,
    /// Free-text field embedding our `Provider:{id}` reference.
    pub notes: String,
    /// End of the billed period the invoice covers.
    pub period_end: Option<NaiveDate>,
}

/// Acknowledgement returned to the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    /// Outcome: `processed`, `already_processed`, `already_paid`, or
    /// `no_handler`.
    pub status: &'static str,
    /// The resolved invoice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<InvoiceId>,
    /// The resolved invoice type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_type: Option<InvoiceType>,
    /// Handler-specific detail.
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub detail: serde_json::Value,
}

impl WebhookAck {
    /// Builds an acknowledgement for a resolved invoice.
    #[must_use]
    pub fn for_invoice(status: &'static str, id: InvoiceId, invoice_type: InvoiceType) -> Self {
        Self {
            status,
            invoice_id: Some(id),
            invoice_type: Some(invoice_type),
            detail: serde_json::Value::Null,
        }
    }

    /// Attaches handler-specific detail.
    #[must_use]
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = detail;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payment_confirmation_deserializes_minimal_body() {
        let body = r#"{"external_invoice_id":"EXT-1","notes":"Provider:x"}"#;
        let event: PaymentConfirmation = serde_json::from_str(body).unwrap();
        assert_eq!(event.external_invoice_id, "EXT-1");
        assert!(event.amount.is_none());
        assert!(event.paid_at.is_none());
    }

    #[test]
    fn test_ack_serializes_without_null_fields() {
        let ack = WebhookAck::for_invoice(
            "processed",
            InvoiceId::new(),
            InvoiceType::DidRenewal,
        );
        let json = serde_json::to_value(&ack).unwrap();
        assert_eq!(json["status"], "processed");
        assert_eq!(json["invoice_type"], "did_renewal");
        assert!(json.get("detail").is_none());
    }

    #[test]
    fn test_ack_detail_roundtrip() {
        let ack = WebhookAck::for_invoice("processed", InvoiceId::new(), InvoiceType::DidRenewal)
            .with_detail(json!({"released": 2}));
        let json = serde_json::to_value(&ack).unwrap();
        assert_eq!(json["detail"]["released"], 2);
    }
}
