// models/src/identifiers.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ValidationError, ValidationResult};

/// A profile identifier. Identifiers are UUIDs assigned at creation time and
/// stable for the lifetime of the record; they appear in canonical hyphenated
/// form in URLs and API payloads.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ProfileId(Uuid);

impl ProfileId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses an identifier from its string form.
    ///
    /// # Errors
    /// Returns `ValidationError::InvalidIdentifier` if `value` is not a
    /// syntactically valid UUID. Callers are expected to perform this check
    /// before consulting storage, so a malformed id never reads as "not
    /// found".
    pub fn parse(value: &str) -> ValidationResult<Self> {
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|_| ValidationError::InvalidIdentifier(value.to_string()))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// The raw 16-byte form, used as the storage key.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl FromStr for ProfileId {
    type Err = ValidationError;

    fn from_str(s: &str) -> ValidationResult<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_hyphenated())
    }
}

impl From<ProfileId> for String {
    fn from(value: ProfileId) -> Self {
        value.to_string()
    }
}
