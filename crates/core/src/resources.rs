//! Generic resource operations over every [`ResourceKind`].

use crate::answer_key;
use crate::models::{
    JobSummary, MatchJob, RecordMeta, RecordSet, ResourceKind, StoredBundle, StoredResource,
};
use crate::store::{ResourceFilter, ResourceStore};
use crate::{CoreError, CoreResult};
use fhir::Bundle;
use ptmatch_uuid::RecordId;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct ResourceService {
    store: Arc<dyn ResourceStore>,
}

impl ResourceService {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    pub async fn list(
        &self,
        kind: ResourceKind,
        filter: ResourceFilter,
    ) -> CoreResult<Vec<StoredResource>> {
        self.store.find(kind, filter).await
    }

    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] when no resource has this id.
    pub async fn get(&self, kind: ResourceKind, id: RecordId) -> CoreResult<StoredResource> {
        self.store
            .load(kind, id)
            .await?
            .ok_or_else(|| not_found(kind, id))
    }

    /// Stores a new resource under a generated id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] when `body` does not decode as `kind`.
    pub async fn create(&self, kind: ResourceKind, body: Value) -> CoreResult<StoredResource> {
        let mut resource = kind.decode_body(body)?;
        let id = RecordId::new();
        resource.set_id(id);
        resource.set_meta(RecordMeta::created_now());

        self.store.insert(&resource).await?;
        info!(kind = %kind, id = %id, "Resource created");
        Ok(resource)
    }

    /// Replaces (or creates) the resource with this id. Returns the stored resource and whether
    /// it was newly created.
    ///
    /// The original creation time is preserved on replacement.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] when `body` does not decode as `kind`.
    pub async fn update(
        &self,
        kind: ResourceKind,
        id: RecordId,
        body: Value,
    ) -> CoreResult<(StoredResource, bool)> {
        let mut resource = kind.decode_body(body)?;
        let previous = self.store.load(kind, id).await?;

        resource.set_id(id);
        resource.set_meta(RecordMeta::replacing(previous.as_ref().map(StoredResource::meta)));

        let replaced = self.store.upsert(&resource).await?;
        info!(kind = %kind, id = %id, replaced, "Resource written");
        Ok((resource, !replaced))
    }

    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] when no resource has this id.
    pub async fn delete(&self, kind: ResourceKind, id: RecordId) -> CoreResult<()> {
        if !self.store.delete(kind, id).await? {
            return Err(not_found(kind, id));
        }
        info!(kind = %kind, id = %id, "Resource deleted");
        Ok(())
    }

    /// Writes an inbound bundle; `fhir_id` is `None` for a POST.
    ///
    /// A PUT may use any FHIR logical id. It is stored under [`RecordId::from_external`], so
    /// repeated writes to the same id replace one record, and fills in the bundle's own id when
    /// the body has none.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] when `fhir_id` is not a FHIR logical id or `body` is not
    /// a bundle.
    pub async fn write_bundle(
        &self,
        fhir_id: Option<&str>,
        body: Value,
    ) -> CoreResult<(StoredBundle, bool)> {
        let (resource, created) = match fhir_id {
            Some(fhir_id) => {
                if !fhir::is_valid_id(fhir_id) {
                    return Err(CoreError::Validation(format!(
                        "invalid Bundle id '{fhir_id}'"
                    )));
                }
                let mut body = body;
                if let Value::Object(fields) = &mut body {
                    fields
                        .entry("id")
                        .or_insert_with(|| Value::String(fhir_id.to_owned()));
                }
                self.update(ResourceKind::Bundle, RecordId::from_external(fhir_id), body)
                    .await?
            }
            None => (self.create(ResourceKind::Bundle, body).await?, true),
        };
        match resource {
            StoredResource::Bundle(bundle) => Ok((bundle, created)),
            other => Err(CoreError::Store(format!(
                "expected a Bundle, stored {}",
                other.kind()
            ))),
        }
    }

    /// Replaces a record set's answer key.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidAnswerKey`] when `key` is not a usable answer key and
    /// [`CoreError::NotFound`] when the record set does not exist.
    pub async fn set_answer_key(&self, record_set_id: RecordId, key: Bundle) -> CoreResult<RecordSet> {
        answer_key::validate(&key)?;

        let mut record_set = match self.get(ResourceKind::RecordSet, record_set_id).await? {
            StoredResource::RecordSet(set) => set,
            _ => return Err(not_found(ResourceKind::RecordSet, record_set_id)),
        };
        record_set.answer_key = Some(key);
        record_set.meta.touch();

        self.store
            .upsert(&StoredResource::RecordSet(record_set.clone()))
            .await?;
        info!(record_set_id = %record_set_id, "Answer key associated with record set");
        Ok(record_set)
    }

    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] when no job has this id.
    pub async fn job(&self, id: RecordId) -> CoreResult<MatchJob> {
        match self.get(ResourceKind::RecordMatchJob, id).await? {
            StoredResource::Job(job) => Ok(job),
            _ => Err(not_found(ResourceKind::RecordMatchJob, id)),
        }
    }

    /// Metrics view of the jobs passing `filter`.
    pub async fn job_summaries(&self, filter: ResourceFilter) -> CoreResult<Vec<JobSummary>> {
        Ok(self
            .store
            .find(ResourceKind::RecordMatchJob, filter)
            .await?
            .iter()
            .filter_map(|r| match r {
                StoredResource::Job(job) => Some(job.summary()),
                _ => None,
            })
            .collect())
    }
}

fn not_found(kind: ResourceKind, id: RecordId) -> CoreError {
    CoreError::NotFound {
        kind,
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer_key::tests::answer_key;
    use crate::store::memory::MemoryStore;
    use serde_json::json;

    fn service() -> ResourceService {
        ResourceService::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn create_assigns_id_and_meta() {
        let svc = service();
        assert!(matches!(
            svc.create(ResourceKind::RecordSet, json!({"name": 7})).await,
            Err(CoreError::Validation(_))
        ));

        let created = svc
            .create(ResourceKind::RecordSet, json!({"name": "A", "id": "client-id"}))
            .await
            .expect("create");
        let id = created.id().expect("id");
        assert_ne!(id.to_string(), "client-id");
        assert!(created.meta().created_on.is_some());
        assert_eq!(svc.get(ResourceKind::RecordSet, id).await.expect("get"), created);
    }

    #[tokio::test]
    async fn update_preserves_created_on_and_reports_creation() {
        let svc = service();
        let id = RecordId::new();

        let (first, created) = svc
            .update(ResourceKind::RecordMatchSystemInterface, id, json!({"name": "v1"}))
            .await
            .expect("first write");
        assert!(created);

        let (second, created) = svc
            .update(ResourceKind::RecordMatchSystemInterface, id, json!({"name": "v2"}))
            .await
            .expect("second write");
        assert!(!created);
        assert_eq!(second.meta().created_on, first.meta().created_on);

        let StoredResource::SystemInterface(iface) = second else {
            panic!("expected interface");
        };
        assert_eq!(iface.name.as_deref(), Some("v2"));
        assert_eq!(iface.id, Some(id));
    }

    #[tokio::test]
    async fn get_and_delete_unknown_ids_are_not_found() {
        let svc = service();
        let id = RecordId::new();
        assert!(matches!(
            svc.get(ResourceKind::RecordSet, id).await,
            Err(CoreError::NotFound { .. })
        ));
        assert!(matches!(
            svc.delete(ResourceKind::RecordSet, id).await,
            Err(CoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn bundles_are_written_with_store_ids() {
        let svc = service();
        let body = json!({"resourceType": "Bundle", "id": "engine-1", "type": "message"});

        let (posted, created) = svc.write_bundle(None, body.clone()).await.expect("post");
        assert!(created);
        assert!(posted.id.is_some());
        assert_eq!(posted.bundle.id.as_deref(), Some("engine-1"));

        let id = RecordId::new().to_string();
        let (_, created) = svc.write_bundle(Some(&id), body.clone()).await.expect("put");
        assert!(created);
        let (_, created) = svc.write_bundle(Some(&id), body).await.expect("put again");
        assert!(!created);
    }

    #[tokio::test]
    async fn bundles_accept_fhir_logical_ids() {
        let svc = service();
        let fhir_id = "6f1c2b9e-3a4d-4e5f-8a7b-1c2d3e4f5a6b";
        let body = json!({"resourceType": "Bundle", "type": "message"});

        let (stored, created) = svc.write_bundle(Some(fhir_id), body.clone()).await.expect("put");
        assert!(created);
        assert_eq!(stored.id, Some(RecordId::from_external(fhir_id)));
        assert_eq!(stored.bundle.id.as_deref(), Some(fhir_id));

        let (_, created) = svc.write_bundle(Some(fhir_id), body.clone()).await.expect("put again");
        assert!(!created);

        let err = svc
            .write_bundle(Some("not/an id"), body)
            .await
            .expect_err("invalid id");
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn answer_key_is_validated_and_attached() {
        let svc = service();
        let set = svc
            .create(ResourceKind::RecordSet, json!({"name": "A"}))
            .await
            .expect("create");
        let set_id = set.id().expect("id");

        let mut invalid = answer_key(&[("S", &["T"])]);
        invalid.id = None;
        assert!(matches!(
            svc.set_answer_key(set_id, invalid).await,
            Err(CoreError::InvalidAnswerKey(_))
        ));

        let updated = svc
            .set_answer_key(set_id, answer_key(&[("S", &["T"])]))
            .await
            .expect("attach");
        assert_eq!(updated.answer_key.map(|k| k.entry.len()), Some(2));

        assert!(matches!(
            svc.set_answer_key(RecordId::new(), answer_key(&[])).await,
            Err(CoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn job_summaries_filter_by_reference() {
        let svc = service();
        let set_id = RecordId::new();
        svc.create(
            ResourceKind::RecordMatchJob,
            json!({"masterRecordSetId": set_id.to_string(), "metrics": {"matchCount": 2}}),
        )
        .await
        .expect("job");
        svc.create(ResourceKind::RecordMatchJob, json!({}))
            .await
            .expect("job");

        let all = svc.job_summaries(ResourceFilter::All).await.expect("all");
        assert_eq!(all.len(), 2);

        let filtered = svc
            .job_summaries(ResourceFilter::RecordSet(set_id))
            .await
            .expect("filtered");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].metrics.match_count, 2);
    }
}
