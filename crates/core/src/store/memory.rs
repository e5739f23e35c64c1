//! Process-local [`ResourceStore`].
//!
//! Used when no MongoDB URI is configured, and by tests. Each job mutation runs under a single
//! write lock, so the conditional response append is atomic.

use super::{ResourceFilter, ResourceStore};
use crate::models::{MatchJob, MatchResponse, Metrics, ResourceKind, StatusEntry, StoredResource};
use crate::{CoreError, CoreResult};
use async_trait::async_trait;
use ptmatch_uuid::RecordId;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<ResourceKind, Vec<StoredResource>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn with_job<T>(
        &self,
        job_id: RecordId,
        apply: impl FnOnce(&mut MatchJob) -> T + Send,
    ) -> CoreResult<T> {
        let mut collections = self.collections.write().await;
        let job = collections
            .get_mut(&ResourceKind::RecordMatchJob)
            .and_then(|jobs| {
                jobs.iter_mut().find_map(|r| match r {
                    StoredResource::Job(job) if job.id == Some(job_id) => Some(job),
                    _ => None,
                })
            })
            .ok_or_else(|| CoreError::NotFound {
                kind: ResourceKind::RecordMatchJob,
                id: job_id.to_string(),
            })?;
        Ok(apply(job))
    }
}

fn require_id(resource: &StoredResource) -> CoreResult<RecordId> {
    resource
        .id()
        .ok_or_else(|| CoreError::Store(format!("cannot store {} without an id", resource.kind())))
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn load(&self, kind: ResourceKind, id: RecordId) -> CoreResult<Option<StoredResource>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&kind)
            .and_then(|items| items.iter().find(|r| r.id() == Some(id)))
            .cloned())
    }

    async fn insert(&self, resource: &StoredResource) -> CoreResult<()> {
        let id = require_id(resource)?;
        let mut collections = self.collections.write().await;
        let items = collections.entry(resource.kind()).or_default();
        if items.iter().any(|r| r.id() == Some(id)) {
            return Err(CoreError::Store(format!(
                "{} '{id}' already exists",
                resource.kind()
            )));
        }
        items.push(resource.clone());
        Ok(())
    }

    async fn upsert(&self, resource: &StoredResource) -> CoreResult<bool> {
        let id = require_id(resource)?;
        let mut collections = self.collections.write().await;
        let items = collections.entry(resource.kind()).or_default();
        match items.iter_mut().find(|r| r.id() == Some(id)) {
            Some(existing) => {
                *existing = resource.clone();
                Ok(true)
            }
            None => {
                items.push(resource.clone());
                Ok(false)
            }
        }
    }

    async fn delete(&self, kind: ResourceKind, id: RecordId) -> CoreResult<bool> {
        let mut collections = self.collections.write().await;
        let Some(items) = collections.get_mut(&kind) else {
            return Ok(false);
        };
        let before = items.len();
        items.retain(|r| r.id() != Some(id));
        Ok(items.len() != before)
    }

    async fn find(
        &self,
        kind: ResourceKind,
        filter: ResourceFilter,
    ) -> CoreResult<Vec<StoredResource>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&kind)
            .map(|items| items.iter().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default())
    }

    async fn find_job_by_correlation_id(
        &self,
        correlation_id: &str,
    ) -> CoreResult<Option<MatchJob>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&ResourceKind::RecordMatchJob)
            .and_then(|jobs| {
                jobs.iter().find_map(|r| match r {
                    StoredResource::Job(job) if job.correlation_id() == Some(correlation_id) => {
                        Some(job.clone())
                    }
                    _ => None,
                })
            }))
    }

    async fn push_response_if_absent(
        &self,
        job_id: RecordId,
        response: &MatchResponse,
    ) -> CoreResult<bool> {
        let outcome = self
            .with_job(job_id, |job| {
                if job.has_response(&response.message_id) {
                    return false;
                }
                job.responses.push(response.clone());
                true
            })
            .await;

        match outcome {
            Err(CoreError::NotFound { .. }) => Ok(false),
            other => other,
        }
    }

    async fn push_status(&self, job_id: RecordId, entry: &StatusEntry) -> CoreResult<()> {
        self.with_job(job_id, |job| {
            job.status.push(entry.clone());
            job.meta.touch();
        })
        .await
    }

    async fn set_metrics(
        &self,
        job_id: RecordId,
        metrics: &Metrics,
        entry: &StatusEntry,
    ) -> CoreResult<()> {
        self.with_job(job_id, |job| {
            job.metrics = metrics.clone();
            job.status.push(entry.clone());
            job.meta.touch();
        })
        .await
    }
}
