//! Common error types for the chant client

use thiserror::Error;

/// Common result type for chant operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the chant crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),
}

/// Form-level validation failure
///
/// Raised before any network call is made; a submission carrying one of
/// these never reaches the backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a valid 10-digit phone number")]
    InvalidPhone,

    #[error("Username must be at least {min} characters")]
    UsernameTooShort { min: usize },

    #[error("Username may only contain letters and numbers")]
    UsernameCharacters,

    #[error("Usernames do not match")]
    ConfirmationMismatch,

    #[error("Chant count must be a whole number of at least 1")]
    InvalidCount,

    #[error("Date cannot be in the future")]
    FutureDate,

    #[error("Date must be formatted as YYYY-MM-DD")]
    InvalidDate,

    #[error("Choose whether you are an existing or a new user")]
    UserTypeUnset,

    #[error("Verify your username before adding chants")]
    NotVerified,
}
