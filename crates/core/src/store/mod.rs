//! Resource persistence.
//!
//! [`ResourceStore`] is the only shared mutable state in the harness. Services receive it as an
//! `Arc<dyn ResourceStore>`; nothing reaches for a process-wide handle.
//!
//! Job mutations are field scoped (push a response, push a status entry, set metrics) so that
//! concurrent deliveries for the same job never rewrite each other's fields.

pub mod memory;
pub mod mongo;

use crate::models::{MatchJob, MatchResponse, Metrics, ResourceKind, StatusEntry, StoredResource};
use crate::CoreResult;
use async_trait::async_trait;
use ptmatch_uuid::RecordId;

/// Kind-specific search filters for [`ResourceStore::find`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceFilter {
    All,
    /// Jobs or configurations using this record set as master or query set.
    RecordSet(RecordId),
    /// Jobs or configurations using this system interface.
    SystemInterface(RecordId),
    /// Jobs created from this configuration.
    Configuration(RecordId),
}

impl ResourceFilter {
    /// Whether `resource` passes this filter.
    ///
    /// Reference filters only apply to configurations and jobs; other kinds never match them.
    pub fn matches(&self, resource: &StoredResource) -> bool {
        match (self, resource) {
            (Self::All, _) => true,
            (Self::RecordSet(id), StoredResource::Job(job)) => job.uses_record_set(*id),
            (Self::RecordSet(id), StoredResource::Configuration(cfg)) => {
                cfg.master_record_set_id == Some(*id) || cfg.query_record_set_id == Some(*id)
            }
            (Self::SystemInterface(id), StoredResource::Job(job)) => {
                job.record_match_system_interface_id == Some(*id)
            }
            (Self::SystemInterface(id), StoredResource::Configuration(cfg)) => {
                cfg.record_match_system_interface_id == Some(*id)
            }
            (Self::Configuration(id), StoredResource::Job(job)) => {
                job.record_match_configuration_id == Some(*id)
            }
            _ => false,
        }
    }
}

/// Document store holding every [`ResourceKind`].
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn load(&self, kind: ResourceKind, id: RecordId) -> CoreResult<Option<StoredResource>>;

    /// Inserts a resource whose id is already assigned.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Store`] when the resource has no id or the id is taken.
    async fn insert(&self, resource: &StoredResource) -> CoreResult<()>;

    /// Replaces or inserts by id. Returns true when a resource was replaced.
    async fn upsert(&self, resource: &StoredResource) -> CoreResult<bool>;

    /// Returns true when a resource was deleted.
    async fn delete(&self, kind: ResourceKind, id: RecordId) -> CoreResult<bool>;

    async fn find(
        &self,
        kind: ResourceKind,
        filter: ResourceFilter,
    ) -> CoreResult<Vec<StoredResource>>;

    /// The job whose request message header id equals `correlation_id`.
    async fn find_job_by_correlation_id(&self, correlation_id: &str)
        -> CoreResult<Option<MatchJob>>;

    /// Appends `response` unless the job already holds a response with the same message id.
    ///
    /// The check and the append happen as one store operation. Returns false when a response
    /// with that message id was already present, or the job does not exist.
    async fn push_response_if_absent(
        &self,
        job_id: RecordId,
        response: &MatchResponse,
    ) -> CoreResult<bool>;

    /// Appends a status entry and stamps the job's last-updated time.
    async fn push_status(&self, job_id: RecordId, entry: &StatusEntry) -> CoreResult<()>;

    /// Overwrites the job's metrics, appends `entry` and stamps the job's last-updated time.
    async fn set_metrics(
        &self,
        job_id: RecordId,
        metrics: &Metrics,
        entry: &StatusEntry,
    ) -> CoreResult<()>;
}
