use super::RecordMeta;
use crate::{CoreError, CoreResult};
use fhir::{Bundle, Parameters};
use ptmatch_types::{MatchingMode, NonEmptyText};
use ptmatch_uuid::RecordId;
use serde::{Deserialize, Serialize};

/// Describes what an external engine should match: one record set against itself, or a query
/// record set against a master record set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,

    #[serde(default)]
    pub meta: RecordMeta,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

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
}

/// The validated references a job needs out of a [`MatchConfiguration`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchPlan {
    pub mode: MatchingMode,
    pub system_interface_id: RecordId,
    pub master_record_set_id: RecordId,
    /// Present exactly when `mode` is [`MatchingMode::Query`].
    pub query_record_set_id: Option<RecordId>,
}

impl MatchConfiguration {
    /// Checks the mode/record-set combination and returns the references to load.
    ///
    /// Deduplication needs a master record set; query needs master and query record sets. A
    /// query record set on a deduplication configuration is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] when the mode or a required reference is missing.
    pub fn plan(&self) -> CoreResult<MatchPlan> {
        let mode = self
            .matching_mode
            .ok_or_else(|| CoreError::Validation("matching mode is required".into()))?;

        let system_interface_id = self.record_match_system_interface_id.ok_or_else(|| {
            CoreError::Validation("record match system interface id is required".into())
        })?;

        let master_record_set_id = self.master_record_set_id.ok_or_else(|| {
            CoreError::Validation(format!("{mode} mode requires a master record set"))
        })?;

        let query_record_set_id = match mode {
            MatchingMode::Deduplication => None,
            MatchingMode::Query => Some(self.query_record_set_id.ok_or_else(|| {
                CoreError::Validation("query mode requires a query record set".into())
            })?),
        };

        Ok(MatchPlan {
            mode,
            system_interface_id,
            master_record_set_id,
            query_record_set_id,
        })
    }
}

/// An external record matching engine and the endpoints used to talk to it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInterface {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,

    #[serde(default)]
    pub meta: RecordMeta,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Where match requests are ultimately delivered.
    #[serde(default)]
    pub destination_endpoint: String,

    /// FHIR server the request bundle is PUT to.
    #[serde(default)]
    pub server_endpoint: String,

    /// Where the engine is told to send its results.
    #[serde(default)]
    pub response_endpoint: String,
}

/// The three endpoints of a usable [`SystemInterface`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceEndpoints {
    pub destination_name: Option<String>,
    pub destination: NonEmptyText,
    pub server: NonEmptyText,
    pub response: NonEmptyText,
}

impl SystemInterface {
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] naming the first blank endpoint.
    pub fn endpoints(&self) -> CoreResult<InterfaceEndpoints> {
        fn required(value: &str, field: &str) -> CoreResult<NonEmptyText> {
            NonEmptyText::new(value)
                .map_err(|_| CoreError::Validation(format!("system interface {field} is required")))
        }

        Ok(InterfaceEndpoints {
            destination_name: self.name.clone(),
            destination: required(&self.destination_endpoint, "destination endpoint")?,
            server: required(&self.server_endpoint, "server endpoint")?,
            response: required(&self.response_endpoint, "response endpoint")?,
        })
    }
}

/// A named collection of source records plus an optional answer key.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,

    #[serde(default)]
    pub meta: RecordMeta,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    /// Search parameters selecting the records, sent verbatim in the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Parameters>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_key: Option<Bundle>,
}

impl RecordSet {
    /// Resource type of the records; defaults to `Patient`.
    pub fn resource_type_or_default(&self) -> &str {
        self.resource_type
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or("Patient")
    }
}
