//! MongoDB-backed [`ResourceStore`].
//!
//! One collection per [`ResourceKind`]. Documents are the resource's JSON shape with `_id` set
//! to the record id, so the stored form matches what the REST API returns.

use super::{ResourceFilter, ResourceStore};
use crate::models::{
    now_millis, MatchJob, MatchResponse, Metrics, ResourceKind, StatusEntry, StoredResource,
};
use crate::{CoreError, CoreResult};
use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures_util::TryStreamExt;
use mongodb::{Client, Collection, Database};
use ptmatch_uuid::RecordId;
use serde::Serialize;
use tracing::info;

/// Correlation id path inside a stored job: the id of the request's message header.
const CORRELATION_ID_PATH: &str = "request.message.entry.0.resource.id";

#[derive(Clone)]
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    /// Connects and verifies the connection with a `ping`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Store`] if the server cannot be reached.
    pub async fn connect(uri: &str, database: &str) -> CoreResult<Self> {
        info!("Connecting to MongoDB database '{}'", database);

        // Fail fast on an unreachable server instead of waiting for the driver default.
        let timeout_uri = if uri.contains('?') {
            format!("{uri}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000")
        } else {
            format!("{uri}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000")
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| CoreError::Store(format!("failed to connect to MongoDB: {e}")))?;

        let database = client.database(database);
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| CoreError::Store(format!("MongoDB ping failed: {e}")))?;

        info!("Connected to MongoDB database '{}'", database.name());
        Ok(Self { database })
    }

    fn collection(&self, kind: ResourceKind) -> Collection<Document> {
        self.database.collection(kind.collection_name())
    }

    fn jobs(&self) -> Collection<Document> {
        self.collection(ResourceKind::RecordMatchJob)
    }
}

fn store_error(context: &str) -> impl Fn(mongodb::error::Error) -> CoreError + '_ {
    move |e| CoreError::Store(format!("{context} failed: {e}"))
}

fn to_bson<T: Serialize>(value: &T) -> CoreResult<Bson> {
    let json = serde_json::to_value(value)?;
    bson::to_bson(&json).map_err(|e| CoreError::Store(format!("BSON encoding failed: {e}")))
}

fn id_filter(id: RecordId) -> Document {
    doc! { "_id": id.to_string() }
}

fn require_id(resource: &StoredResource) -> CoreResult<RecordId> {
    resource
        .id()
        .ok_or_else(|| CoreError::Store(format!("cannot store {} without an id", resource.kind())))
}

fn to_document(resource: &StoredResource) -> CoreResult<Document> {
    let id = require_id(resource)?;
    let mut document = bson::to_document(&resource.to_json()?)
        .map_err(|e| CoreError::Store(format!("BSON encoding failed: {e}")))?;
    document.insert("_id", id.to_string());
    Ok(document)
}

fn from_document(kind: ResourceKind, mut document: Document) -> CoreResult<StoredResource> {
    document.remove("_id");
    kind.decode_stored(Bson::Document(document).into_relaxed_extjson())
        .map_err(|e| CoreError::Store(format!("stored document is unreadable: {e}")))
}

/// Query document for `filter`, or `None` when no document of `kind` can match it.
fn filter_document(kind: ResourceKind, filter: ResourceFilter) -> Option<Document> {
    let references = matches!(
        kind,
        ResourceKind::RecordMatchJob | ResourceKind::RecordMatchConfiguration
    );
    match filter {
        ResourceFilter::All => Some(doc! {}),
        ResourceFilter::RecordSet(id) if references => Some(doc! {
            "$or": [
                { "masterRecordSetId": id.to_string() },
                { "queryRecordSetId": id.to_string() },
            ]
        }),
        ResourceFilter::SystemInterface(id) if references => {
            Some(doc! { "recordMatchSystemInterfaceId": id.to_string() })
        }
        ResourceFilter::Configuration(id) if kind == ResourceKind::RecordMatchJob => {
            Some(doc! { "recordMatchConfigurationId": id.to_string() })
        }
        _ => None,
    }
}

#[async_trait]
impl ResourceStore for MongoStore {
    async fn load(&self, kind: ResourceKind, id: RecordId) -> CoreResult<Option<StoredResource>> {
        self.collection(kind)
            .find_one(id_filter(id))
            .await
            .map_err(store_error("find"))?
            .map(|document| from_document(kind, document))
            .transpose()
    }

    async fn insert(&self, resource: &StoredResource) -> CoreResult<()> {
        self.collection(resource.kind())
            .insert_one(to_document(resource)?)
            .await
            .map_err(store_error("insert"))?;
        Ok(())
    }

    async fn upsert(&self, resource: &StoredResource) -> CoreResult<bool> {
        let id = require_id(resource)?;
        let result = self
            .collection(resource.kind())
            .replace_one(id_filter(id), to_document(resource)?)
            .upsert(true)
            .await
            .map_err(store_error("replace"))?;
        Ok(result.matched_count > 0)
    }

    async fn delete(&self, kind: ResourceKind, id: RecordId) -> CoreResult<bool> {
        let result = self
            .collection(kind)
            .delete_one(id_filter(id))
            .await
            .map_err(store_error("delete"))?;
        Ok(result.deleted_count > 0)
    }

    async fn find(
        &self,
        kind: ResourceKind,
        filter: ResourceFilter,
    ) -> CoreResult<Vec<StoredResource>> {
        let Some(query) = filter_document(kind, filter) else {
            return Ok(Vec::new());
        };

        let documents: Vec<Document> = self
            .collection(kind)
            .find(query)
            .await
            .map_err(store_error("find"))?
            .try_collect()
            .await
            .map_err(store_error("cursor"))?;

        documents
            .into_iter()
            .map(|document| from_document(kind, document))
            .collect()
    }

    async fn find_job_by_correlation_id(
        &self,
        correlation_id: &str,
    ) -> CoreResult<Option<MatchJob>> {
        let mut filter = Document::new();
        filter.insert(CORRELATION_ID_PATH, correlation_id);
        let document = self
            .jobs()
            .find_one(filter)
            .await
            .map_err(store_error("find"))?;

        match document.map(|d| from_document(ResourceKind::RecordMatchJob, d)).transpose()? {
            Some(StoredResource::Job(job)) => Ok(Some(job)),
            _ => Ok(None),
        }
    }

    async fn push_response_if_absent(
        &self,
        job_id: RecordId,
        response: &MatchResponse,
    ) -> CoreResult<bool> {
        let filter = doc! {
            "_id": job_id.to_string(),
            "responses.messageId": { "$ne": response.message_id.as_str() },
        };
        let update = doc! { "$push": { "responses": to_bson(response)? } };
        let result = self
            .jobs()
            .update_one(filter, update)
            .await
            .map_err(store_error("update"))?;
        Ok(result.modified_count == 1)
    }

    async fn push_status(&self, job_id: RecordId, entry: &StatusEntry) -> CoreResult<()> {
        let update = doc! {
            "$push": { "status": to_bson(entry)? },
            "$set": { "meta.lastUpdatedOn": to_bson(&now_millis())? },
        };
        let result = self
            .jobs()
            .update_one(id_filter(job_id), update)
            .await
            .map_err(store_error("update"))?;
        if result.matched_count == 0 {
            return Err(CoreError::NotFound {
                kind: ResourceKind::RecordMatchJob,
                id: job_id.to_string(),
            });
        }
        Ok(())
    }

    async fn set_metrics(
        &self,
        job_id: RecordId,
        metrics: &Metrics,
        entry: &StatusEntry,
    ) -> CoreResult<()> {
        let update = doc! {
            "$push": { "status": to_bson(entry)? },
            "$set": {
                "metrics": to_bson(metrics)?,
                "meta.lastUpdatedOn": to_bson(&now_millis())?,
            },
        };
        let result = self
            .jobs()
            .update_one(id_filter(job_id), update)
            .await
            .map_err(store_error("update"))?;
        if result.matched_count == 0 {
            return Err(CoreError::NotFound {
                kind: ResourceKind::RecordMatchJob,
                id: job_id.to_string(),
            });
        }
        Ok(())
    }
}
