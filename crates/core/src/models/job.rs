use super::{now_millis, RecordMeta};
use crate::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use fhir::Bundle;
use ptmatch_types::MatchingMode;
use ptmatch_uuid::RecordId;
use serde::{Deserialize, Serialize};

/// One run of the matching workflow.
///
/// The request is populated when the job is created. Responses and status entries are only ever
/// appended; metrics are overwritten after each accepted response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchJob {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,

    #[serde(default)]
    pub meta: RecordMeta,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_match_configuration_id: Option<RecordId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matching_mode: Option<MatchingMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_resource_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_match_system_interface_id: Option<RecordId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_record_set_id: Option<RecordId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_record_set_id: Option<RecordId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<MatchRequest>,

    #[serde(default)]
    pub responses: Vec<MatchResponse>,

    #[serde(default)]
    pub metrics: Metrics,

    #[serde(default)]
    pub status: Vec<StatusEntry>,
}

impl MatchJob {
    /// Correlation id of the request this job issued.
    pub fn correlation_id(&self) -> Option<&str> {
        self.request.as_ref().and_then(MatchRequest::correlation_id)
    }

    /// Whether a response with this message id has already been recorded.
    pub fn has_response(&self, message_id: &str) -> bool {
        self.responses.iter().any(|r| r.message_id == message_id)
    }

    /// True when either of the job's record sets is `record_set_id`.
    pub fn uses_record_set(&self, record_set_id: RecordId) -> bool {
        self.master_record_set_id == Some(record_set_id)
            || self.query_record_set_id == Some(record_set_id)
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary {
            id: self.id,
            meta: self.meta.clone(),
            note: self.note.clone(),
            record_match_configuration_id: self.record_match_configuration_id,
            matching_mode: self.matching_mode,
            record_resource_type: self.record_resource_type.clone(),
            record_match_system_interface_id: self.record_match_system_interface_id,
            master_record_set_id: self.master_record_set_id,
            query_record_set_id: self.query_record_set_id,
            metrics: self.metrics.clone(),
        }
    }
}

/// The request envelope a job sent to the matching engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequest {
    pub id: RecordId,

    #[serde(default)]
    pub meta: RecordMeta,

    pub message: Bundle,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_on: Option<DateTime<Utc>>,
}

impl MatchRequest {
    pub fn new(message: Bundle) -> Self {
        Self {
            id: RecordId::new(),
            meta: RecordMeta::created_now(),
            message,
            submitted_on: None,
        }
    }

    /// The message header id; responses echo it in `response.identifier`.
    pub fn correlation_id(&self) -> Option<&str> {
        self.message
            .message_header()
            .and_then(|h| h.id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

/// A stored copy of an inbound response message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResponse {
    pub id: RecordId,

    #[serde(default)]
    pub meta: RecordMeta,

    /// Identifier of the response message; unique within a job.
    pub message_id: String,

    pub message: Bundle,

    pub received_on: DateTime<Utc>,
}

impl MatchResponse {
    /// Wraps an inbound response bundle.
    ///
    /// The message id is the bundle id, falling back to the message header id. The storage id
    /// reuses the bundle id when it is already a store-native identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] when the bundle carries no usable id.
    pub fn from_message(message: Bundle) -> CoreResult<Self> {
        let message_id = response_message_id(&message)
            .ok_or_else(|| CoreError::Validation("response message has no id".into()))?
            .to_owned();
        let (id, _) = RecordId::reuse_or_mint(message.id.as_deref());
        let now = now_millis();

        Ok(Self {
            id,
            meta: RecordMeta {
                created_on: Some(now),
                last_updated_on: Some(now),
            },
            message_id,
            message,
            received_on: now,
        })
    }
}

/// The id a response message is deduplicated by.
pub(crate) fn response_message_id(message: &Bundle) -> Option<&str> {
    message
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .or_else(|| {
            message
                .message_header()
                .and_then(|h| h.id.as_deref())
                .filter(|id| !id.is_empty())
        })
}

/// Cumulative match-quality metrics of a job.
///
/// Ratios are `None` while undefined (zero denominator) and whenever no answer key applies.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    #[serde(default)]
    pub match_count: u64,

    #[serde(default)]
    pub true_positive_count: u64,

    #[serde(default)]
    pub false_positive_count: u64,

    #[serde(default)]
    pub precision: Option<f64>,

    #[serde(default)]
    pub recall: Option<f64>,

    #[serde(default)]
    pub f1: Option<f64>,
}

/// One line of a job's audit log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
    pub message: String,
    pub created_on: DateTime<Utc>,
}

impl StatusEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            created_on: now_millis(),
        }
    }

    pub fn request_sent(status: &str) -> Self {
        Self::new(format!("Request Sent [{status}]"))
    }

    pub fn request_failed(status: &str) -> Self {
        Self::new(format!("Error Sending Request to Record Matcher [{status}]"))
    }

    pub fn response_received(message_id: &str) -> Self {
        Self::new(format!("Response Received [{message_id}]"))
    }

    pub fn duplicate_response(message_id: &str) -> Self {
        Self::new(format!("Duplicate Response Received and Ignored [{message_id}]"))
    }

    pub fn metrics_updated(message_id: &str) -> Self {
        Self::new(format!("Metrics Updated [{message_id}]"))
    }
}

/// A link reported by the matching engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub source: String,
    pub target: String,

    /// Match grade (`certain`, `probable`, `possible`), when reported.
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub match_grade: Option<String>,

    pub score: f64,
}

/// The metrics view of a job, without its request and responses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,

    pub meta: RecordMeta,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_match_configuration_id: Option<RecordId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matching_mode: Option<MatchingMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_resource_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_match_system_interface_id: Option<RecordId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_record_set_id: Option<RecordId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_record_set_id: Option<RecordId>,

    pub metrics: Metrics,
}
