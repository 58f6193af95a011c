//! Balance ledger client.
//!
//! The internal ledger owns customer balances. Every balance mutation is
//! followed by a movement append carrying the post-mutation balance and the
//! signed delta.

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::sync::Mutex;
use thiserror::Error;
use tracing::warn;

use numera_core::billing::LedgerMovement;
use numera_shared::types::{CustomerId, TenantId};

/// Errors from the balance ledger client.
#[derive(Debug, Error)]
pub enum LedgerClientError {
    /// The balance does not cover the requested debit.
    #[error("insufficient funds: available {available}")]
    InsufficientFunds {
        /// Balance at the time the ledger rejected the debit.
        available: Decimal,
    },

    /// The ledger service is unreachable or failing.
    #[error("ledger service unavailable: {0}")]
    Unavailable(String),
}

/// Client contract for the internal balance ledger.
#[async_trait]
pub trait BalanceLedger: Send + Sync {
    /// Returns the current balance for a customer.
    async fn balance(
        &self,
        tenant: TenantId,
        customer: CustomerId,
    ) -> Result<Decimal, LedgerClientError>;

    /// Debits the customer's balance, returning the new balance.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientFunds` if the balance no longer covers the
    /// amount (a race with a concurrent debit).
    async fn debit(
        &self,
        customer: CustomerId,
        amount: Decimal,
    ) -> Result<Decimal, LedgerClientError>;

    /// Credits the customer's balance, returning the new balance.
    async fn credit(
        &self,
        customer: CustomerId,
        amount: Decimal,
    ) -> Result<Decimal, LedgerClientError>;

    /// Appends a movement record after a balance mutation.
    async fn append_movement(&self, movement: LedgerMovement) -> Result<(), LedgerClientError>;
}

// ============================================================================
// HTTP implementation
// ============================================================================

/// HTTP client for the ledger service.
pub struct HttpBalanceLedger {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    balance: Decimal,
}

#[derive(Debug, Deserialize)]
struct MutationResponse {
    success: bool,
    balance: Decimal,
    error: Option<String>,
}

impl HttpBalanceLedger {
    /// Creates a client for the ledger service at `base_url`.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, format!("{}{path}", self.base_url));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }

    async fn mutate(
        &self,
        customer: CustomerId,
        action: &str,
        amount: Decimal,
    ) -> Result<Decimal, LedgerClientError> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/customers/{customer}/{action}"),
            )
            .json(&json!({ "amount": amount }))
            .send()
            .await
            .map_err(|e| LedgerClientError::Unavailable(e.to_string()))?;

        if response.status().is_server_error() {
            return Err(LedgerClientError::Unavailable(format!(
                "ledger returned {}",
                response.status()
            )));
        }

        let body: MutationResponse = response
            .json()
            .await
            .map_err(|e| LedgerClientError::Unavailable(e.to_string()))?;

        if body.success {
            Ok(body.balance)
        } else {
            warn!(
                customer = %customer,
                action,
                error = body.error.as_deref().unwrap_or("unspecified"),
                "ledger rejected balance mutation"
            );
            Err(LedgerClientError::InsufficientFunds {
                available: body.balance,
            })
        }
    }
}

#[async_trait]
impl BalanceLedger for HttpBalanceLedger {
    async fn balance(
        &self,
        tenant: TenantId,
        customer: CustomerId,
    ) -> Result<Decimal, LedgerClientError> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/tenants/{tenant}/customers/{customer}/balance"),
            )
            .send()
            .await
            .map_err(|e| LedgerClientError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LedgerClientError::Unavailable(format!(
                "ledger returned {}",
                response.status()
            )));
        }

        let body: BalanceResponse = response
            .json()
            .await
            .map_err(|e| LedgerClientError::Unavailable(e.to_string()))?;
        Ok(body.balance)
    }

    async fn debit(
        &self,
        customer: CustomerId,
        amount: Decimal,
    ) -> Result<Decimal, LedgerClientError> {
        self.mutate(customer, "debit", amount).await
    }

    async fn credit(
        &self,
        customer: CustomerId,
        amount: Decimal,
    ) -> Result<Decimal, LedgerClientError> {
        self.mutate(customer, "credit", amount).await
    }

    async fn append_movement(&self, movement: LedgerMovement) -> Result<(), LedgerClientError> {
        let response = self
            .request(reqwest::Method::POST, "/movements")
            .json(&movement)
            .send()
            .await
            .map_err(|e| LedgerClientError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LedgerClientError::Unavailable(format!(
                "ledger returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

// ============================================================================
// In-memory implementation (tests, demo server)
// ============================================================================

/// In-memory ledger with atomic check-and-debit semantics.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: DashMap<CustomerId, Decimal>,
    movements: Mutex<Vec<LedgerMovement>>,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a customer's balance directly.
    pub fn set_balance(&self, customer: CustomerId, balance: Decimal) {
        self.balances.insert(customer, balance);
    }

    /// Returns the recorded movements for a customer.
    ///
    /// # Panics
    ///
    /// Panics if the movement log lock is poisoned.
    #[must_use]
    pub fn movements_for(&self, customer: CustomerId) -> Vec<LedgerMovement> {
        self.movements
            .lock()
            .expect("movement log lock poisoned")
            .iter()
            .filter(|m| m.customer_id == customer)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl BalanceLedger for InMemoryLedger {
    async fn balance(
        &self,
        _tenant: TenantId,
        customer: CustomerId,
    ) -> Result<Decimal, LedgerClientError> {
        Ok(self
            .balances
            .get(&customer)
            .map_or(Decimal::ZERO, |entry| *entry))
    }

    async fn debit(
        &self,
        customer: CustomerId,
        amount: Decimal,
    ) -> Result<Decimal, LedgerClientError> {
        let mut entry = self.balances.entry(customer).or_insert(Decimal::ZERO);
        if *entry < amount {
            return Err(LedgerClientError::InsufficientFunds { available: *entry });
        }
        *entry -= amount;
        Ok(*entry)
    }

    async fn credit(
        &self,
        customer: CustomerId,
        amount: Decimal,
    ) -> Result<Decimal, LedgerClientError> {
        let mut entry = self.balances.entry(customer).or_insert(Decimal::ZERO);
        *entry += amount;
        Ok(*entry)
    }

    async fn append_movement(&self, movement: LedgerMovement) -> Result<(), LedgerClientError> {
        self.movements
            .lock()
            .map_err(|e| LedgerClientError::Unavailable(e.to_string()))?
            .push(movement);
        Ok(())
    }
}
