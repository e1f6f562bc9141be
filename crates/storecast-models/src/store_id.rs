//! Store identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ArtifactError;

/// Longest identifier we accept; real store codes are a handful of characters.
const MAX_LEN: usize = 128;

/// Opaque key naming one store's model.
///
/// Used as the cache key, as the artifact filename stem and as a URL path
/// segment, so only `[A-Za-z0-9_.-]` is allowed and a leading `.` is
/// rejected (no hidden files, no `..`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StoreId(String);

impl StoreId {
    /// Validates and wraps a store identifier.
    ///
    /// # Errors
    /// Returns `ArtifactError::InvalidStoreId` if the identifier is empty,
    /// too long, starts with `.`, or contains characters that are not safe in
    /// a filename or URL.
    pub fn new(raw: impl Into<String>) -> Result<Self, ArtifactError> {
        let raw = raw.into();
        let valid = !raw.is_empty()
            && raw.len() <= MAX_LEN
            && !raw.starts_with('.')
            && raw.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));

        if valid { Ok(Self(raw)) } else { Err(ArtifactError::InvalidStoreId(raw)) }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StoreId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for StoreId {
    type Err = ArtifactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for StoreId {
    type Error = ArtifactError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StoreId> for String {
    fn from(id: StoreId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_store_codes() {
        for raw in ["CA_1", "TX_3", "WI-2", "store.v2"] {
            assert_eq!(StoreId::new(raw).unwrap().as_str(), raw);
        }
    }

    #[test]
    fn test_rejects_unsafe_ids() {
        for raw in ["", "..", ".hidden", "CA/1", "CA\\1", "CA 1", "ü"] {
            assert!(
                matches!(StoreId::new(raw), Err(ArtifactError::InvalidStoreId(_))),
                "expected {raw:?} to be rejected"
            );
        }
        assert!(StoreId::new("x".repeat(MAX_LEN + 1)).is_err());
    }

    #[test]
    fn test_serde_round_trip_validates() {
        let id: StoreId = serde_json::from_str("\"CA_1\"").unwrap();
        assert_eq!(id.to_string(), "CA_1");
        assert!(serde_json::from_str::<StoreId>("\"../etc\"").is_err());
    }
}
