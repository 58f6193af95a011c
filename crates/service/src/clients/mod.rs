//! External-client traits and implementations.
//!
//! Two remote collaborators sit behind narrow request/response contracts:
//! the internal balance ledger and the OTP verification provider. HTTP
//! implementations use `reqwest`; an in-memory ledger backs tests and the
//! demo server.

pub mod ledger;
pub mod otp;

pub use ledger::{BalanceLedger, HttpBalanceLedger, InMemoryLedger, LedgerClientError};
pub use otp::{HttpOtpProvider, OtpClientError, OtpProvider};
