//! # Chant Common Library
//!
//! Shared code for the chant counter client:
//! - Identifier validation and normalization
//! - Request/response types for the chant backend HTTP contract
//! - Configuration loading
//! - Calendar date helpers

pub mod api;
pub mod config;
pub mod error;
pub mod identifier;
pub mod time;

pub use error::{Error, Result, ValidationError};
pub use identifier::{normalize, CanonicalId, IdentifierKind};
