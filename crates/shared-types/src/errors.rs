//! # Error Types
//!
//! Errors raised while parsing wire-level identities.

use thiserror::Error;

/// Errors from parsing a MAC address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MacAddressError {
    /// Input does not contain exactly 12 hex digits.
    #[error("MAC address must contain 12 hex digits, got {digits} in {input:?}")]
    WrongLength { input: String, digits: usize },

    /// Input contains a character that is neither a hex digit nor a separator.
    #[error("invalid character {found:?} in MAC address {input:?}")]
    InvalidCharacter { input: String, found: char },
}
