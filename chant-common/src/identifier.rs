//! User identifier validation and normalization
//!
//! Users are identified either by a 10-digit phone number or by a
//! self-chosen username. The backend stores usernames uppercased, so every
//! identifier is canonicalized once, at the API boundary, via [`normalize`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ValidationError;

/// Number of digits in a phone identifier
pub const PHONE_DIGITS: usize = 10;

/// Minimum username length
pub const MIN_USERNAME_LEN: usize = 8;

/// Which identification rule applies to a raw identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    Phone,
    Username,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierKind::Phone => f.write_str("phone"),
            IdentifierKind::Username => f.write_str("username"),
        }
    }
}

/// Identifier in the form the backend expects
///
/// Only [`normalize`] produces one, which keeps normalization from being
/// applied twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CanonicalId(String);

impl CanonicalId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the canonical form is a phone number
    pub fn is_phone(&self) -> bool {
        is_phone_number(&self.0)
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Exactly ten ASCII decimal digits
pub fn is_phone_number(raw: &str) -> bool {
    raw.len() == PHONE_DIGITS && raw.bytes().all(|b| b.is_ascii_digit())
}

/// Map a raw identifier to its canonical backend form
///
/// Phone numbers pass through unchanged; anything else is uppercased.
/// Does not validate: callers run [`validate`] first.
pub fn normalize(raw: &str) -> CanonicalId {
    let raw = raw.trim();
    if is_phone_number(raw) {
        CanonicalId(raw.to_string())
    } else {
        CanonicalId(raw.to_uppercase())
    }
}

/// Check a raw identifier against the rule for `kind`
///
/// Returns the trimmed identifier on success.
pub fn validate(raw: &str, kind: IdentifierKind) -> Result<&str, ValidationError> {
    let trimmed = raw.trim();
    match kind {
        IdentifierKind::Phone => {
            if is_phone_number(trimmed) {
                Ok(trimmed)
            } else {
                Err(ValidationError::InvalidPhone)
            }
        }
        IdentifierKind::Username => {
            if trimmed.chars().count() < MIN_USERNAME_LEN {
                return Err(ValidationError::UsernameTooShort {
                    min: MIN_USERNAME_LEN,
                });
            }
            if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(ValidationError::UsernameCharacters);
            }
            Ok(trimmed)
        }
    }
}

/// Validate a new username and its confirmation entry
///
/// Comparison is exact: the confirmation must repeat the username as typed.
pub fn validate_username_confirmation<'a>(
    username: &'a str,
    confirmation: &str,
) -> Result<&'a str, ValidationError> {
    let name = validate(username, IdentifierKind::Username)?;
    if name != confirmation.trim() {
        return Err(ValidationError::ConfirmationMismatch);
    }
    Ok(name)
}
