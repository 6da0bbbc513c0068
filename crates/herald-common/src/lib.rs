//! # Herald Common
//!
//! Shared types, errors, and constants used across Herald components.
//!
//! ## Modules
//! - `types` - Core data structures (Challenge, DeliveryMethod, wire bodies)
//! - `error` - The OTP error taxonomy
//! - `constants` - Defaults, header names, and client-facing messages

pub mod constants;
pub mod error;
pub mod types;

pub use error::OtpError;
pub use types::*;
