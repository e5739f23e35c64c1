use crate::models::ResourceKind;
use ptmatch_uuid::RecordId;

/// Errors raised by the ptmatch core.
///
/// Variants follow the failure taxonomy of the harness: validation and missing dependencies are
/// the caller's fault, dispatch and store failures are ours, and a correlation miss means an
/// inbound response could not be tied to any job.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("unable to find {kind} '{id}'")]
    MissingDependency { kind: ResourceKind, id: String },

    #[error("{kind} '{id}' not found")]
    NotFound { kind: ResourceKind, id: String },

    #[error("failed to send record match request: {0}")]
    Dispatch(String),

    #[error("no record match job is associated with request message '{0}'")]
    CorrelationMiss(String),

    #[error("invalid answer key: {0}")]
    InvalidAnswerKey(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("FHIR error: {0}")]
    Fhir(#[from] fhir::FhirError),

    #[error("invalid identifier: {0}")]
    InvalidId(#[from] ptmatch_uuid::IdError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl CoreError {
    /// Shorthand for a [`CoreError::MissingDependency`] with an optional id.
    pub fn missing(kind: ResourceKind, id: Option<RecordId>) -> Self {
        Self::MissingDependency {
            kind,
            id: id.map_or_else(|| "<unset>".to_owned(), |id| id.to_string()),
        }
    }

    /// True for errors caused by the caller's input rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::MissingDependency { .. }
                | Self::NotFound { .. }
                | Self::CorrelationMiss(_)
                | Self::InvalidAnswerKey(_)
                | Self::InvalidId(_)
                | Self::Fhir(_)
        )
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
