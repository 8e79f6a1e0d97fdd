// models/src/errors.rs

use std::io;
pub use thiserror::Error;

use crate::identifiers::ProfileId;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Storage error: {0}")]
    StorageError(String), // General storage operation error
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("profile with id {0} was not found")]
    NotFound(ProfileId),
    #[error("storage operation '{0}' timed out")]
    Timeout(&'static str),
    #[error("QR encoding failed: {0}")]
    EncodingError(String),
    #[error("Unauthorized: admin key invalid or missing")]
    Unauthorized,
    #[error("server configuration missing: {0}")]
    ServerMisconfigured(&'static str),
    #[error("An internal error occurred: {0}")]
    InternalError(String),

    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl From<serde_json::Error> for ProfileError {
    fn from(err: serde_json::Error) -> Self {
        ProfileError::SerializationError(format!("JSON processing error: {}", err))
    }
}

/// A validation error.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A required field was absent or empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    /// An identifier is invalid (e.g., malformed string).
    #[error("identifier '{0}' is invalid")]
    InvalidIdentifier(String),
    /// A blood group outside the accepted set was provided.
    #[error("invalid blood group '{0}'")]
    InvalidBloodGroup(String),
    /// A gender outside the accepted set was provided.
    #[error("invalid gender '{0}'")]
    InvalidGender(String),
    /// A numeric field that must be non-negative was negative (or not finite).
    #[error("field {0} must be a non-negative number")]
    NegativeValue(&'static str),
}

/// A type alias for a `Result` that returns a `ProfileError` on failure.
pub type ProfileResult<T> = Result<T, ProfileError>;

/// A type alias for a `Result` that returns a `ValidationError` on failure.
pub type ValidationResult<T> = Result<T, ValidationError>;
