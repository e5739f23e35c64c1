//! Validated primitive types shared across the ptmatch crates.
//!
//! These wrappers make invalid states unrepresentable at the boundaries where configuration
//! documents are decoded: endpoints that must not be blank and the closed set of matching modes.

use std::fmt;
use std::str::FromStr;

/// Errors that can occur when creating validated primitive types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,

    /// The input did not name a supported matching mode
    #[error("unknown matching mode: '{0}' (expected 'deduplication' or 'query')")]
    UnknownMatchingMode(String),
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction, so a value made
/// only of whitespace is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Empty`] if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the owned string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// How a record matching system is asked to compare records.
///
/// - `Deduplication`: one record set is matched against itself.
/// - `Query`: a query record set is matched against a separate master record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchingMode {
    Deduplication,
    Query,
}

impl MatchingMode {
    /// Returns the wire representation of this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deduplication => "deduplication",
            Self::Query => "query",
        }
    }

    /// Number of record sets a request in this mode carries.
    pub fn record_set_count(&self) -> usize {
        match self {
            Self::Deduplication => 1,
            Self::Query => 2,
        }
    }
}

impl fmt::Display for MatchingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchingMode {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "deduplication" => Ok(Self::Deduplication),
            "query" => Ok(Self::Query),
            _ => Err(TextError::UnknownMatchingMode(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims_input() {
        let text = NonEmptyText::new("  http://localhost:3001  ").expect("valid text");
        assert_eq!(text.as_str(), "http://localhost:3001");
    }

    #[test]
    fn non_empty_text_rejects_whitespace() {
        assert_eq!(NonEmptyText::new("   "), Err(TextError::Empty));
        assert_eq!(NonEmptyText::new(""), Err(TextError::Empty));
    }

    #[test]
    fn non_empty_text_deserialize_rejects_blank() {
        let err = serde_json::from_str::<NonEmptyText>("\" \"").expect_err("blank must fail");
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn matching_mode_parses_case_insensitively() {
        assert_eq!(
            "Deduplication".parse::<MatchingMode>(),
            Ok(MatchingMode::Deduplication)
        );
        assert_eq!(" query ".parse::<MatchingMode>(), Ok(MatchingMode::Query));
        assert!(matches!(
            "fuzzy".parse::<MatchingMode>(),
            Err(TextError::UnknownMatchingMode(_))
        ));
    }

    #[test]
    fn matching_mode_serializes_lowercase() {
        let json = serde_json::to_string(&MatchingMode::Query).expect("serialize");
        assert_eq!(json, "\"query\"");
        assert_eq!(MatchingMode::Deduplication.record_set_count(), 1);
        assert_eq!(MatchingMode::Query.record_set_count(), 2);
    }
}
