//! Record identifier utilities.
//!
//! Every resource persisted by ptmatch (configurations, system interfaces, record sets, jobs,
//! stored response records) is keyed by a *store-native* identifier. To keep identifiers
//! consistent between the in-memory and MongoDB stores, ptmatch uses a single canonical
//! representation: **32 lowercase hexadecimal characters** (no hyphens).
//!
//! This crate provides:
//! - [`RecordId`], a wrapper that *guarantees* the canonical format once constructed.
//! - [`RecordId::is_canonical`], a cheap syntactic check used to decide whether an identifier
//!   supplied by an external system (for example a response bundle id) can be reused as a
//!   storage key.
//! - [`fresh_urn_uuid`] and [`fresh_hyphenated`], generators for the FHIR-facing identifiers
//!   embedded in outbound messages.
//!
//! ## Canonical form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`

mod service;

// Re-export public types
pub use service::{fresh_hyphenated, fresh_urn_uuid, RecordId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type IdResult<T> = Result<T, IdError>;
