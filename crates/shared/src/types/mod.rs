//! Common types used across the application.

pub mod id;
pub mod phone;

pub use id::*;
pub use phone::{PhoneNumber, PhoneNumberError};
