//! Internal implementation of record identifiers.

use crate::{IdError, IdResult};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// Prefix used for bundle entry locators (`fullUrl`) that are not server addressable.
const URN_UUID_PREFIX: &str = "urn:uuid:";

/// ptmatch's canonical record identifier (32 lowercase hex characters, no hyphens).
///
/// # Construction
/// - [`RecordId::new`] generates a fresh identifier (for newly persisted resources).
/// - [`RecordId::parse`] validates an externally supplied identifier.
///
/// # Display format
/// Always the canonical 32-character lowercase hex form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(Uuid);

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordId {
    /// Generates a new identifier in canonical form.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses an identifier that must already be in canonical form.
    ///
    /// Hyphenated or uppercase UUIDs are **not** normalised; callers must supply the canonical
    /// representation.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidInput`] if `input` is not in canonical form.
    pub fn parse(input: &str) -> IdResult<Self> {
        if !Self::is_canonical(input) {
            return Err(IdError::InvalidInput(format!(
                "record id must be 32 lowercase hex characters without hyphens, got: '{}'",
                input
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| IdError::InvalidInput(format!("invalid record id '{input}': {e}")))
    }

    /// Returns the underlying `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `input` is in canonical form.
    ///
    /// This is a purely syntactic check: exactly 32 bytes, `0-9` and `a-f` only.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    /// Maps an identifier chosen by an external system onto a stable record id.
    ///
    /// Any UUID spelling (canonical, hyphenated, `urn:uuid:`) maps to that UUID. Every other id is
    /// hashed into a name-based (v5) UUID, so writing the same external id twice always targets the
    /// same record.
    pub fn from_external(input: &str) -> Self {
        match Uuid::parse_str(input) {
            Ok(uuid) => Self(uuid),
            Err(_) => Self(Uuid::new_v5(&Uuid::NAMESPACE_URL, input.as_bytes())),
        }
    }

    /// Reuses `candidate` when it is already a canonical identifier, otherwise mints a new one.
    ///
    /// Returns the identifier and whether it was reused.
    pub fn reuse_or_mint(candidate: Option<&str>) -> (Self, bool) {
        match candidate.map(Self::parse) {
            Some(Ok(id)) => (id, true),
            _ => (Self::new(), false),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for RecordId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RecordId::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Returns a fresh hyphenated v4 UUID, the form FHIR resource ids use in outbound messages.
pub fn fresh_hyphenated() -> String {
    Uuid::new_v4().hyphenated().to_string()
}

/// Builds a `urn:uuid:` locator for a resource id inside a bundle.
pub fn fresh_urn_uuid(id: &str) -> String {
    format!("{URN_UUID_PREFIX}{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_generates_canonical_id() {
        let id = RecordId::new();
        let canonical = id.to_string();

        assert_eq!(canonical.len(), 32);
        assert!(RecordId::is_canonical(&canonical));
    }

    #[test]
    fn test_parse_valid_canonical_id() {
        let canonical = "550e8400e29b41d4a716446655440000";
        let id = RecordId::parse(canonical).expect("canonical id");
        assert_eq!(id.to_string(), canonical);
    }

    #[test]
    fn test_parse_rejects_hyphenated_id() {
        let result = RecordId::parse("550e8400-e29b-41d4-a716-446655440000");
        match result {
            Err(IdError::InvalidInput(msg)) => {
                assert!(msg.contains("32 lowercase hex characters"));
            }
            other => panic!("Expected InvalidInput error, got {other:?}"),
        }
    }

    #[test]
    fn test_is_canonical_invalid() {
        assert!(!RecordId::is_canonical("550E8400E29B41D4A716446655440000"));
        assert!(!RecordId::is_canonical("550e8400e29b41d4a71644665544000"));
        assert!(!RecordId::is_canonical("550e8400e29b41d4a716446655440zzz"));
        // bson object ids are 24 hex characters and are not store-native here
        assert!(!RecordId::is_canonical("5616b6a11cd462440e001586"));
        assert!(!RecordId::is_canonical(""));
    }

    #[test]
    fn test_reuse_or_mint() {
        let (id, reused) = RecordId::reuse_or_mint(Some("550e8400e29b41d4a716446655440000"));
        assert!(reused);
        assert_eq!(id.to_string(), "550e8400e29b41d4a716446655440000");

        let (minted, reused) = RecordId::reuse_or_mint(Some("response-bundle-1"));
        assert!(!reused);
        assert!(RecordId::is_canonical(&minted.to_string()));

        let (_, reused) = RecordId::reuse_or_mint(None);
        assert!(!reused);
    }

    #[test]
    fn test_from_external_is_stable() {
        let hyphenated = "6f1c2b9e-3a4d-4e5f-8a7b-1c2d3e4f5a6b";
        assert_eq!(
            RecordId::from_external(hyphenated).to_string(),
            "6f1c2b9e3a4d4e5f8a7b1c2d3e4f5a6b"
        );

        let canonical = "550e8400e29b41d4a716446655440000";
        assert_eq!(RecordId::from_external(canonical).to_string(), canonical);

        let object_id = "65f1c0ffee0ddba11c0ffee0";
        assert_eq!(
            RecordId::from_external(object_id),
            RecordId::from_external(object_id)
        );
        assert_ne!(
            RecordId::from_external(object_id),
            RecordId::from_external("65f1c0ffee0ddba11c0ffee1")
        );
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let id = RecordId::parse("550e8400e29b41d4a716446655440000").expect("canonical id");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"550e8400e29b41d4a716446655440000\"");

        let back: RecordId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
        assert!(serde_json::from_str::<RecordId>("\"not-an-id\"").is_err());
    }

    #[test]
    fn test_urn_locators() {
        let id = fresh_hyphenated();
        assert_eq!(id.len(), 36);
        assert_eq!(fresh_urn_uuid(&id), format!("urn:uuid:{id}"));
    }
}
