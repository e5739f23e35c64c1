//! Domain model for the record-matching harness.
//!
//! - [`configuration`]: match configurations, system interfaces and record sets
//! - [`job`]: match jobs with their request, responses, metrics and status log
//! - [`resource`]: the closed set of stored resource kinds and their generic envelope

mod configuration;
mod job;
mod resource;

pub use configuration::{InterfaceEndpoints, MatchConfiguration, MatchPlan, RecordSet, SystemInterface};
pub use job::{JobSummary, Link, MatchJob, MatchRequest, MatchResponse, Metrics, StatusEntry};
pub use resource::{ResourceKind, StoredBundle, StoredResource};

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Current time at the millisecond precision every stored timestamp uses.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Creation and modification timestamps carried by every stored resource.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_on: Option<DateTime<Utc>>,
}

impl RecordMeta {
    /// Meta for a resource created now.
    pub fn created_now() -> Self {
        let now = now_millis();
        Self {
            created_on: Some(now),
            last_updated_on: Some(now),
        }
    }

    /// Meta for a replacement write: creation time is taken from `previous` when known.
    pub fn replacing(previous: Option<&RecordMeta>) -> Self {
        let now = now_millis();
        Self {
            created_on: previous.and_then(|m| m.created_on).or(Some(now)),
            last_updated_on: Some(now),
        }
    }

    pub fn touch(&mut self) {
        self.last_updated_on = Some(now_millis());
    }
}
