//! Domain-error to HTTP-response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use numera_core::billing::BillingError;
use numera_core::byon::ByonError;
use numera_core::inventory::InventoryError;
use numera_core::orders::OrderError;
use numera_core::webhook::WebhookError;

/// An API error: HTTP status, machine-readable code, human message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: u16, code: &'static str, message: String) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            code,
            message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({
                "error": self.code,
                "message": self.message,
            })),
        )
            .into_response()
    }
}

macro_rules! from_domain_error {
    ($error:ty) => {
        impl From<$error> for ApiError {
            fn from(err: $error) -> Self {
                Self::new(err.status_code(), err.error_code(), err.to_string())
            }
        }
    };
}

from_domain_error!(InventoryError);
from_domain_error!(BillingError);
from_domain_error!(OrderError);
from_domain_error!(ByonError);
from_domain_error!(WebhookError);
