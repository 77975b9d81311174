//! Error types for logical id parsing and validation.

use thiserror::Error;

/// Errors that can occur when parsing or validating logical ids.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The id string is empty.
    #[error("logical id cannot be empty")]
    Empty,

    /// The id is longer than the template engine allows.
    #[error("logical id too long: {len} characters (max {max})")]
    TooLong { len: usize, max: usize },

    /// The id contains a character outside `[A-Za-z0-9]`.
    #[error("invalid character {found:?} in logical id '{id}'")]
    InvalidCharacter { id: String, found: char },
}

impl IdError {
    /// Returns true if this error indicates the input was empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, IdError::Empty)
    }
}
