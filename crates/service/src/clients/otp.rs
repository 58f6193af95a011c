//! OTP provider client.
//!
//! The provider sends a one-time passcode to a number and checks codes
//! against the open verification session. Network failures and provider 5xx
//! responses surface as a single generic error; the raw cause is logged but
//! never propagated to callers.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

/// Errors from the OTP provider client.
#[derive(Debug, Error)]
pub enum OtpClientError {
    /// The provider is unreachable or failing; details are logged only.
    #[error("verification service unavailable")]
    Unavailable,
}

/// Client contract for the OTP verification provider.
#[async_trait]
pub trait OtpProvider: Send + Sync {
    /// Sends a verification code to the number, returning the provider's
    /// session id.
    async fn send_verification(&self, e164: &str) -> Result<String, OtpClientError>;

    /// Checks a code against the open session for the number.
    ///
    /// Returns `true` if the provider approved the code.
    async fn check_verification(&self, e164: &str, code: &str) -> Result<bool, OtpClientError>;
}

/// HTTP client for the OTP provider.
pub struct HttpOtpProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendResponse {
    success: bool,
    session_id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckResponse {
    success: bool,
    #[serde(default)]
    approved: bool,
    error: Option<String>,
}

impl HttpOtpProvider {
    /// Creates a client for the provider at `base_url`.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(format!("{}{path}", self.base_url));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }
}

#[async_trait]
impl OtpProvider for HttpOtpProvider {
    async fn send_verification(&self, e164: &str) -> Result<String, OtpClientError> {
        let response = self
            .post("/verifications")
            .json(&json!({ "to": e164 }))
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "otp provider unreachable");
                OtpClientError::Unavailable
            })?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "otp provider send failed");
            return Err(OtpClientError::Unavailable);
        }

        let body: SendResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "otp provider returned malformed send response");
            OtpClientError::Unavailable
        })?;

        match (body.success, body.session_id) {
            (true, Some(session_id)) => Ok(session_id),
            _ => {
                warn!(
                    error = body.error.as_deref().unwrap_or("unspecified"),
                    "otp provider rejected send"
                );
                Err(OtpClientError::Unavailable)
            }
        }
    }

    async fn check_verification(&self, e164: &str, code: &str) -> Result<bool, OtpClientError> {
        let response = self
            .post("/verifications/check")
            .json(&json!({ "to": e164, "code": code }))
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "otp provider unreachable");
                OtpClientError::Unavailable
            })?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "otp provider check failed");
            return Err(OtpClientError::Unavailable);
        }

        let body: CheckResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "otp provider returned malformed check response");
            OtpClientError::Unavailable
        })?;

        if !body.success {
            warn!(
                error = body.error.as_deref().unwrap_or("unspecified"),
                "otp provider reported check failure"
            );
            return Err(OtpClientError::Unavailable);
        }

        Ok(body.approved)
    }
}
