//! FHIR wire/boundary support for the ptmatch record-matching harness.
//!
//! This crate provides **wire models** for the small slice of FHIR that the harness produces and
//! consumes when talking to a record matching engine:
//! - message and document `Bundle`s with their entries, links and search results
//! - `MessageHeader` (request envelope and response correlation)
//! - `Parameters` (record set descriptors)
//! - `Composition` (answer key summary)
//!
//! Resources embedded in bundle entries are modelled as a closed sum type, [`Resource`],
//! discriminated on the `resourceType` tag at decode time. Resource types the harness never
//! inspects are kept verbatim in [`Resource::Other`] so that inbound bundles round-trip.
//!
//! This crate is free of transport concerns: no HTTP, no storage.

pub mod bundle;
pub mod composition;
pub mod message_header;
pub mod parameters;
pub mod resource;

// Re-export facades
pub use bundle::{Bundle, BundleEntry, BundleEntrySearch, BundleLink, BundleType, Extension};
pub use composition::Composition;
pub use message_header::{
    Coding, MessageDestination, MessageHeader, MessageResponse, MessageSource, Reference,
};
pub use parameters::{Parameter, Parameters};
pub use resource::{is_valid_id, OtherResource, Resource};

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;
