//! Closed set of resource kinds the harness stores.
//!
//! Every generic operation (CRUD, store collections) dispatches on [`ResourceKind`]; decoded
//! payloads are carried as [`StoredResource`].

use super::{MatchConfiguration, MatchJob, RecordMeta, RecordSet, SystemInterface};
use crate::{CoreError, CoreResult};
use fhir::Bundle;
use ptmatch_uuid::RecordId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    RecordMatchConfiguration,
    RecordMatchSystemInterface,
    RecordSet,
    RecordMatchJob,
    Bundle,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        Self::RecordMatchConfiguration,
        Self::RecordMatchSystemInterface,
        Self::RecordSet,
        Self::RecordMatchJob,
        Self::Bundle,
    ];

    /// Resource type name as used in URL paths.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RecordMatchConfiguration => "RecordMatchConfiguration",
            Self::RecordMatchSystemInterface => "RecordMatchSystemInterface",
            Self::RecordSet => "RecordSet",
            Self::RecordMatchJob => "RecordMatchJob",
            Self::Bundle => "Bundle",
        }
    }

    /// Store collection holding resources of this kind.
    pub fn collection_name(&self) -> &'static str {
        match self {
            Self::RecordMatchConfiguration => "recordMatchConfigurations",
            Self::RecordMatchSystemInterface => "recordMatchSystemInterfaces",
            Self::RecordSet => "recordSets",
            Self::RecordMatchJob => "recordMatchJobs",
            Self::Bundle => "bundles",
        }
    }

    /// Decodes a client-supplied payload of this kind.
    ///
    /// Bundles arrive as plain FHIR bundles; every other kind arrives in its stored shape, minus
    /// the server-managed `id` and `meta` fields, which are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] when the payload does not describe this kind.
    pub fn decode_body(&self, body: Value) -> CoreResult<StoredResource> {
        match self {
            Self::Bundle => {
                let bundle = Bundle::from_value(body)
                    .map_err(|e| CoreError::Validation(format!("invalid Bundle: {e}")))?;
                Ok(StoredResource::Bundle(StoredBundle {
                    id: None,
                    meta: RecordMeta::default(),
                    bundle,
                }))
            }
            _ => {
                let mut body = body;
                if let Value::Object(fields) = &mut body {
                    fields.remove("id");
                    fields.remove("meta");
                }
                self.decode_stored(body)
            }
        }
    }

    /// Decodes a resource of this kind in the shape the store keeps it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] when the document does not describe this kind.
    pub fn decode_stored(&self, value: Value) -> CoreResult<StoredResource> {
        fn typed<T: serde::de::DeserializeOwned>(kind: ResourceKind, value: Value) -> CoreResult<T> {
            serde_json::from_value(value)
                .map_err(|e| CoreError::Validation(format!("invalid {kind}: {e}")))
        }

        Ok(match self {
            Self::RecordMatchConfiguration => {
                StoredResource::Configuration(typed(*self, value)?)
            }
            Self::RecordMatchSystemInterface => {
                StoredResource::SystemInterface(typed(*self, value)?)
            }
            Self::RecordSet => StoredResource::RecordSet(typed(*self, value)?),
            Self::RecordMatchJob => StoredResource::Job(typed(*self, value)?),
            Self::Bundle => StoredResource::Bundle(typed(*self, value)?),
        })
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResourceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| CoreError::Validation(format!("unknown resource type '{s}'")))
    }
}

/// A bundle written through the generic resource path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredBundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,

    #[serde(default)]
    pub meta: RecordMeta,

    pub bundle: Bundle,
}

/// A decoded resource of any [`ResourceKind`].
#[derive(Clone, Debug, PartialEq)]
pub enum StoredResource {
    Configuration(MatchConfiguration),
    SystemInterface(SystemInterface),
    RecordSet(RecordSet),
    Job(MatchJob),
    Bundle(StoredBundle),
}

impl StoredResource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Configuration(_) => ResourceKind::RecordMatchConfiguration,
            Self::SystemInterface(_) => ResourceKind::RecordMatchSystemInterface,
            Self::RecordSet(_) => ResourceKind::RecordSet,
            Self::Job(_) => ResourceKind::RecordMatchJob,
            Self::Bundle(_) => ResourceKind::Bundle,
        }
    }

    pub fn id(&self) -> Option<RecordId> {
        match self {
            Self::Configuration(r) => r.id,
            Self::SystemInterface(r) => r.id,
            Self::RecordSet(r) => r.id,
            Self::Job(r) => r.id,
            Self::Bundle(r) => r.id,
        }
    }

    pub fn set_id(&mut self, id: RecordId) {
        match self {
            Self::Configuration(r) => r.id = Some(id),
            Self::SystemInterface(r) => r.id = Some(id),
            Self::RecordSet(r) => r.id = Some(id),
            Self::Job(r) => r.id = Some(id),
            Self::Bundle(r) => r.id = Some(id),
        }
    }

    pub fn meta(&self) -> &RecordMeta {
        match self {
            Self::Configuration(r) => &r.meta,
            Self::SystemInterface(r) => &r.meta,
            Self::RecordSet(r) => &r.meta,
            Self::Job(r) => &r.meta,
            Self::Bundle(r) => &r.meta,
        }
    }

    pub fn set_meta(&mut self, meta: RecordMeta) {
        match self {
            Self::Configuration(r) => r.meta = meta,
            Self::SystemInterface(r) => r.meta = meta,
            Self::RecordSet(r) => r.meta = meta,
            Self::Job(r) => r.meta = meta,
            Self::Bundle(r) => r.meta = meta,
        }
    }

    /// The resource in its stored JSON shape.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Serialization`] if serialisation fails.
    pub fn to_json(&self) -> CoreResult<Value> {
        Ok(match self {
            Self::Configuration(r) => serde_json::to_value(r)?,
            Self::SystemInterface(r) => serde_json::to_value(r)?,
            Self::RecordSet(r) => serde_json::to_value(r)?,
            Self::Job(r) => serde_json::to_value(r)?,
            Self::Bundle(r) => serde_json::to_value(r)?,
        })
    }
}
