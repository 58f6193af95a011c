//! BYON verification error types.

use thiserror::Error;

use numera_shared::types::phone::PhoneNumberError;

use crate::inventory::InventoryError;

/// Errors that can occur during BYON verification.
#[derive(Debug, Error)]
pub enum ByonError {
    /// The supplied number is not a valid E.164 number.
    #[error("Invalid phone number: {0}")]
    InvalidPhoneNumber(#[from] PhoneNumberError),

    /// The number was already verified by a different customer.
    #[error("Number is already registered as BYON by another customer")]
    NumberAlreadyByon,

    /// The number exists as marketplace inventory.
    #[error("Number already exists in the marketplace inventory")]
    NumberInInventory,

    /// The customer hit the daily OTP send allowance.
    #[error("Daily verification send limit of {limit} reached")]
    DailySendLimitReached {
        /// The configured daily limit.
        limit: u32,
    },

    /// The customer holds the maximum number of BYON numbers.
    #[error("BYON number limit of {limit} reached")]
    NumberLimitReached {
        /// The configured number limit.
        limit: u32,
    },

    /// No pending verification exists for this customer and number.
    #[error("No pending verification found for this number")]
    VerificationNotFound,

    /// The verification window has lapsed.
    #[error("Verification has expired")]
    Expired,

    /// All attempts were consumed.
    #[error("Maximum verification attempts reached")]
    MaxAttemptsReached,

    /// The code did not match.
    #[error("Invalid code ({attempts_remaining} attempts remaining)")]
    InvalidCode {
        /// Attempts the customer still has.
        attempts_remaining: u32,
    },

    /// The OTP provider is unreachable or failing.
    #[error("Verification service unavailable")]
    ProviderUnavailable,

    /// Inventory failure while creating the BYON DID.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ByonError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidPhoneNumber(_) | Self::InvalidCode { .. } => 400,
            Self::NumberAlreadyByon | Self::NumberInInventory => 409,
            Self::DailySendLimitReached { .. } => 429,
            Self::NumberLimitReached { .. } | Self::Expired | Self::MaxAttemptsReached => 422,
            Self::VerificationNotFound => 404,
            Self::ProviderUnavailable => 502,
            Self::Inventory(e) => e.status_code(),
            Self::Storage(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidPhoneNumber(_) => "INVALID_PHONE_NUMBER",
            Self::NumberAlreadyByon => "NUMBER_ALREADY_BYON",
            Self::NumberInInventory => "NUMBER_IN_INVENTORY",
            Self::DailySendLimitReached { .. } => "DAILY_SEND_LIMIT_REACHED",
            Self::NumberLimitReached { .. } => "BYON_NUMBER_LIMIT_REACHED",
            Self::VerificationNotFound => "VERIFICATION_NOT_FOUND",
            Self::Expired => "VERIFICATION_EXPIRED",
            Self::MaxAttemptsReached => "MAX_ATTEMPTS_REACHED",
            Self::InvalidCode { .. } => "INVALID_CODE",
            Self::ProviderUnavailable => "OTP_PROVIDER_UNAVAILABLE",
            Self::Inventory(e) => e.error_code(),
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }
}
