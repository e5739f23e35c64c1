//! Job creation.
//!
//! A job is created by loading a match configuration and everything it references, building the
//! request, submitting it, and persisting the job with the submission outcome in its status log.

use crate::dispatch::RequestDispatcher;
use crate::models::{
    MatchConfiguration, MatchJob, MatchRequest, RecordMeta, RecordSet, ResourceKind, StoredResource,
    SystemInterface,
};
use crate::request::build_request;
use crate::store::ResourceStore;
use crate::{CoreError, CoreResult};
use ptmatch_uuid::RecordId;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Input for [`JobService::create_job`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    pub record_match_configuration_id: Option<RecordId>,

    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Clone)]
pub struct JobService {
    store: Arc<dyn ResourceStore>,
    dispatcher: RequestDispatcher,
}

impl JobService {
    pub fn new(store: Arc<dyn ResourceStore>, dispatcher: RequestDispatcher) -> Self {
        Self { store, dispatcher }
    }

    /// Creates a job and submits its request to the matching engine.
    ///
    /// The job is persisted whether or not the engine accepted the request; the outcome is the
    /// first status entry.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Validation`] if the configuration id is missing, the configuration's
    ///   mode/record-set combination is invalid, or an interface endpoint is blank.
    /// - [`CoreError::MissingDependency`] if a referenced resource does not exist.
    /// - [`CoreError::Dispatch`] if the engine's server could not be reached. No job is stored.
    pub async fn create_job(&self, new_job: NewJob) -> CoreResult<MatchJob> {
        let configuration_id = new_job.record_match_configuration_id.ok_or_else(|| {
            CoreError::Validation("recordMatchConfigurationId is required".into())
        })?;

        let configuration = self.configuration(configuration_id).await?;
        let plan = configuration.plan()?;

        let interface = self.system_interface(plan.system_interface_id).await?;
        let endpoints = interface.endpoints()?;

        let master = self.record_set(plan.master_record_set_id).await?;
        let query = match plan.query_record_set_id {
            Some(id) => Some(self.record_set(id).await?),
            None => None,
        };

        let message = build_request(plan.mode, &master, query.as_ref(), &endpoints)?;
        let mut request = MatchRequest::new(message);
        let status = self
            .dispatcher
            .dispatch(&mut request, endpoints.server.as_str())
            .await?;

        let job = MatchJob {
            id: Some(RecordId::new()),
            meta: RecordMeta::created_now(),
            note: new_job.note,
            record_match_configuration_id: Some(configuration_id),
            matching_mode: Some(plan.mode),
            record_resource_type: configuration
                .record_resource_type
                .clone()
                .or_else(|| master.resource_type.clone()),
            record_match_system_interface_id: Some(plan.system_interface_id),
            master_record_set_id: Some(plan.master_record_set_id),
            query_record_set_id: plan.query_record_set_id,
            request: Some(request),
            responses: Vec::new(),
            metrics: Default::default(),
            status: vec![status],
        };

        self.store.insert(&StoredResource::Job(job.clone())).await?;
        info!(
            job_id = ?job.id,
            request_id = job.correlation_id().unwrap_or_default(),
            "Record match job created"
        );

        Ok(job)
    }

    async fn configuration(&self, id: RecordId) -> CoreResult<MatchConfiguration> {
        match self.store.load(ResourceKind::RecordMatchConfiguration, id).await? {
            Some(StoredResource::Configuration(cfg)) => Ok(cfg),
            _ => Err(CoreError::missing(ResourceKind::RecordMatchConfiguration, Some(id))),
        }
    }

    async fn system_interface(&self, id: RecordId) -> CoreResult<SystemInterface> {
        match self.store.load(ResourceKind::RecordMatchSystemInterface, id).await? {
            Some(StoredResource::SystemInterface(iface)) => Ok(iface),
            _ => Err(CoreError::missing(ResourceKind::RecordMatchSystemInterface, Some(id))),
        }
    }

    async fn record_set(&self, id: RecordId) -> CoreResult<RecordSet> {
        match self.store.load(ResourceKind::RecordSet, id).await? {
            Some(StoredResource::RecordSet(set)) => Ok(set),
            _ => Err(CoreError::missing(ResourceKind::RecordSet, Some(id))),
        }
    }
}
