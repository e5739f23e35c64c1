//! Metrics engine.
//!
//! After every accepted response the job's metrics are recomputed over all of its responses and
//! compared with the master record set's answer key. Only deduplication jobs are scored; query
//! jobs are skipped and keep their previous metrics.
//!
//! Undefined ratios are `None`: precision with no classified links, recall with an empty key,
//! and F1 whenever precision or recall is undefined. F1 is `0.0` when both are zero.

use crate::answer_key::GroundTruth;
use crate::models::{MatchJob, MatchResponse, Metrics, ResourceKind, StatusEntry, StoredResource};
use crate::store::ResourceStore;
use crate::{CoreError, CoreResult};
use fhir::Bundle;
use ptmatch_types::MatchingMode;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Why metrics were not recomputed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    QueryMode,
    NoMatchingMode,
}

/// Result of a metrics update.
#[derive(Clone, Debug, PartialEq)]
pub enum MetricsOutcome {
    Updated(Metrics),
    Skipped(SkipReason),
    /// The update failed; the job keeps its previous metrics.
    Failed(String),
}

#[derive(Clone)]
pub struct MetricsEngine {
    store: Arc<dyn ResourceStore>,
    /// Held from reloading a job until its metrics are written, so the last write in this
    /// process always scores every response appended before it.
    updates: Arc<Mutex<()>>,
}

impl MetricsEngine {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self {
            store,
            updates: Arc::new(Mutex::new(())),
        }
    }

    /// Recomputes `job`'s metrics after `latest` was accepted, and persists them with a
    /// "Metrics Updated" status entry.
    ///
    /// The job is reloaded before scoring, so responses appended concurrently by other
    /// deliveries are included; `job` is only used if it can no longer be loaded. `latest` is
    /// counted exactly once either way.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingDependency`] if the master record set cannot be found, and
    /// store errors as they occur. Nothing is persisted on error.
    pub async fn update(&self, job: &MatchJob, latest: &MatchResponse) -> CoreResult<MetricsOutcome> {
        let job_id = job
            .id
            .ok_or_else(|| CoreError::Validation("job has no id".into()))?;

        match job.matching_mode {
            Some(MatchingMode::Deduplication) => {}
            Some(MatchingMode::Query) => {
                warn!(job_id = %job_id, "Calculating metrics for query mode is not supported");
                return Ok(MetricsOutcome::Skipped(SkipReason::QueryMode));
            }
            None => {
                warn!(job_id = %job_id, "Job has no matching mode; metrics not calculated");
                return Ok(MetricsOutcome::Skipped(SkipReason::NoMatchingMode));
            }
        }

        let _guard = self.updates.lock().await;
        let current = match self.store.load(ResourceKind::RecordMatchJob, job_id).await? {
            Some(StoredResource::Job(current)) => current,
            _ => job.clone(),
        };
        let job = &current;

        let ground_truth = self.ground_truth(job).await?;

        let messages = job
            .responses
            .iter()
            .filter(|r| r.message_id != latest.message_id)
            .chain(std::iter::once(latest))
            .map(|r| &r.message);
        let metrics = score(messages, ground_truth.as_ref());

        info!(
            job_id = %job_id,
            response_id = %latest.message_id,
            match_count = metrics.match_count,
            true_positive = metrics.true_positive_count,
            false_positive = metrics.false_positive_count,
            "Metrics calculated"
        );

        self.store
            .set_metrics(job_id, &metrics, &StatusEntry::metrics_updated(&latest.message_id))
            .await?;

        Ok(MetricsOutcome::Updated(metrics))
    }

    async fn ground_truth(&self, job: &MatchJob) -> CoreResult<Option<GroundTruth>> {
        let master_id = job
            .master_record_set_id
            .ok_or_else(|| CoreError::missing(ResourceKind::RecordSet, None))?;

        let record_set = match self.store.load(ResourceKind::RecordSet, master_id).await? {
            Some(StoredResource::RecordSet(set)) => set,
            _ => {
                warn!(record_set_id = %master_id, "Unable to find master record set");
                return Err(CoreError::missing(ResourceKind::RecordSet, Some(master_id)));
            }
        };

        let truth = record_set
            .answer_key
            .as_ref()
            .and_then(GroundTruth::from_answer_key);
        if truth.is_none() {
            debug!(record_set_id = %master_id, "No usable answer key; counting matches only");
        }
        Ok(truth)
    }
}

/// Scores every reported link in `messages`.
///
/// Without ground truth only `match_count` is set.
pub fn score<'a>(
    messages: impl IntoIterator<Item = &'a Bundle>,
    ground_truth: Option<&GroundTruth>,
) -> Metrics {
    let mut metrics = Metrics::default();
    let mut confirmed: HashSet<&str> = HashSet::new();

    for message in messages {
        for entry in &message.entry {
            let Some(source) = entry.scored_match_source() else {
                continue;
            };
            for link in entry.related_links() {
                metrics.match_count += 1;
                let Some(truth) = ground_truth else {
                    continue;
                };
                match truth.confirmed_source(source, &link.url) {
                    Some(key) => {
                        metrics.true_positive_count += 1;
                        confirmed.insert(key);
                    }
                    None => metrics.false_positive_count += 1,
                }
            }
        }
    }

    if let Some(truth) = ground_truth {
        metrics.precision = ratio(
            metrics.true_positive_count,
            metrics.true_positive_count + metrics.false_positive_count,
        );
        metrics.recall = ratio(confirmed.len() as u64, truth.total() as u64);
        metrics.f1 = f1(metrics.precision, metrics.recall);
    }

    metrics
}

fn ratio(numerator: u64, denominator: u64) -> Option<f64> {
    (denominator > 0).then(|| numerator as f64 / denominator as f64)
}

fn f1(precision: Option<f64>, recall: Option<f64>) -> Option<f64> {
    let (p, r) = (precision?, recall?);
    if p + r == 0.0 {
        return Some(0.0);
    }
    Some(2.0 * p * r / (p + r))
}
