//! Response correlator.
//!
//! Runs inline after an inbound bundle has been written. A bundle is a record-match response
//! when it is a message whose header answers a request (`response.identifier`) and carries the
//! `record-match` event. The job is found by that identifier; a response already recorded on the
//! job is acknowledged with a status entry and otherwise ignored, so redelivery is safe.

use crate::constants::{RECORD_MATCH_EVENT_CODE, RECORD_MATCH_EVENT_SYSTEM};
use crate::metrics::{MetricsEngine, MetricsOutcome};
use crate::models::{MatchResponse, StatusEntry};
use crate::store::ResourceStore;
use crate::{CoreError, CoreResult};
use fhir::Bundle;
use ptmatch_uuid::RecordId;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Why a bundle was not treated as a record-match response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    NotAMessage,
    NoResponseField,
    NotRecordMatchEvent,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CorrelationOutcome {
    Ignored(IgnoreReason),
    /// The job already holds a response with this message id.
    Duplicate { job_id: RecordId, message_id: String },
    Accepted {
        job_id: RecordId,
        response_id: RecordId,
        metrics: MetricsOutcome,
    },
}

#[derive(Clone)]
pub struct ResponseCorrelator {
    store: Arc<dyn ResourceStore>,
    metrics: MetricsEngine,
}

impl ResponseCorrelator {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self {
            metrics: MetricsEngine::new(store.clone()),
            store,
        }
    }

    /// Correlates an inbound bundle with the job that issued the request it answers.
    ///
    /// Metrics failures are logged and reported in the outcome; they never fail the call.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CorrelationMiss`] when no job issued the request, and store errors
    /// from recording the response or its status entries. Writes made before an error are kept.
    pub async fn correlate(&self, bundle: &Bundle) -> CoreResult<CorrelationOutcome> {
        if !bundle.is_message() {
            debug!(bundle_id = bundle.id_or_empty(), "Bundle is not a message; ignored");
            return Ok(CorrelationOutcome::Ignored(IgnoreReason::NotAMessage));
        }

        let Some(header) = bundle.message_header() else {
            debug!(bundle_id = bundle.id_or_empty(), "Message has no header; ignored");
            return Ok(CorrelationOutcome::Ignored(IgnoreReason::NoResponseField));
        };
        let Some(request_id) = header.in_response_to() else {
            debug!(bundle_id = bundle.id_or_empty(), "Message is not a response; ignored");
            return Ok(CorrelationOutcome::Ignored(IgnoreReason::NoResponseField));
        };
        if !header.has_event(RECORD_MATCH_EVENT_SYSTEM, RECORD_MATCH_EVENT_CODE) {
            debug!(bundle_id = bundle.id_or_empty(), "Message is not a record-match response; ignored");
            return Ok(CorrelationOutcome::Ignored(IgnoreReason::NotRecordMatchEvent));
        }

        let Some(job) = self.store.find_job_by_correlation_id(request_id).await? else {
            warn!(request_id, "Unable to find record match job associated with request");
            return Err(CoreError::CorrelationMiss(request_id.to_owned()));
        };
        let job_id = job
            .id
            .ok_or_else(|| CoreError::Store("stored job has no id".into()))?;

        let response = MatchResponse::from_message(bundle.clone())?;
        let message_id = response.message_id.clone();

        if job.has_response(&message_id) || !self.store.push_response_if_absent(job_id, &response).await? {
            info!(job_id = %job_id, response_id = %message_id, "Record match response seen before");
            self.store
                .push_status(job_id, &StatusEntry::duplicate_response(&message_id))
                .await?;
            return Ok(CorrelationOutcome::Duplicate { job_id, message_id });
        }

        self.store
            .push_status(job_id, &StatusEntry::response_received(&message_id))
            .await?;
        info!(job_id = %job_id, response_id = %message_id, "Record match response received");

        let metrics = match self.metrics.update(&job, &response).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(job_id = %job_id, response_id = %message_id, "Metrics update failed: {e}");
                MetricsOutcome::Failed(e.to_string())
            }
        };

        Ok(CorrelationOutcome::Accepted {
            job_id,
            response_id: response.id,
            metrics,
        })
    }
}
