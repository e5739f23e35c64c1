//! FHIR `Bundle` wire model.
//!
//! Bundles are the unit of exchange with a record matching engine:
//! - outbound requests are `message` bundles led by a [`MessageHeader`]
//! - inbound responses are `message` bundles whose header points back at the request
//! - answer keys are `document` bundles led by a [`Composition`]
//!
//! Link results reported by an engine appear as *bare* entries (no embedded resource) that carry
//! a `fullUrl`, a search score and one or more `related` links.

use crate::{FhirError, FhirResult, MessageHeader, Resource};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Tag value for the `resourceType` field of a bundle.
const BUNDLE_RESOURCE_TYPE: &str = "Bundle";

/// Link relation used by matching engines to report a candidate match.
pub const RELATED_RELATION: &str = "related";

fn bundle_resource_type() -> String {
    BUNDLE_RESOURCE_TYPE.to_owned()
}

/// Bundle type (`Bundle.type`).
///
/// Only the types the harness branches on are named; everything else is preserved verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BundleType {
    Message,
    Document,
    SearchSet,
    Collection,
    Other(String),
}

impl BundleType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Message => "message",
            Self::Document => "document",
            Self::SearchSet => "searchset",
            Self::Collection => "collection",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for BundleType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "message" => Self::Message,
            "document" => Self::Document,
            "searchset" => Self::SearchSet,
            "collection" => Self::Collection,
            _ => Self::Other(value),
        }
    }
}

impl From<BundleType> for String {
    fn from(value: BundleType) -> Self {
        value.as_str().to_owned()
    }
}

impl fmt::Display for BundleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A FHIR `Bundle`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    #[serde(default = "bundle_resource_type")]
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "type")]
    pub bundle_type: BundleType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<BundleEntry>,

    /// Elements the harness does not interpret (`meta`, `timestamp`, `link`, `signature`, ...),
    /// kept so a stored bundle is the bundle that was sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Bundle {
    /// Creates an empty bundle of the given type.
    pub fn new(bundle_type: BundleType, id: Option<String>) -> Self {
        Self {
            resource_type: bundle_resource_type(),
            id,
            bundle_type,
            total: None,
            entry: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Parse a bundle from JSON text.
    ///
    /// This uses `serde_path_to_error` so that a schema mismatch reports the failing field
    /// (for example `entry[0].search.score`).
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::Translation`] if the JSON does not describe a bundle, and
    /// [`FhirError::InvalidInput`] if `resourceType` is present but is not `Bundle`.
    pub fn parse_json(json_text: &str) -> FhirResult<Self> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);
        let bundle: Bundle = match serde_path_to_error::deserialize(&mut deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() || path == "." {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(FhirError::Translation(format!(
                    "Bundle schema mismatch at {path}: {source}"
                )));
            }
        };
        bundle.ensure_bundle_tag()?;
        Ok(bundle)
    }

    /// Decode a bundle from an already parsed JSON value.
    pub fn from_value(value: Value) -> FhirResult<Self> {
        let bundle: Bundle = serde_json::from_value(value)?;
        bundle.ensure_bundle_tag()?;
        Ok(bundle)
    }

    fn ensure_bundle_tag(&self) -> FhirResult<()> {
        if self.resource_type != BUNDLE_RESOURCE_TYPE {
            return Err(FhirError::InvalidInput(format!(
                "expected resourceType 'Bundle', got '{}'",
                self.resource_type
            )));
        }
        Ok(())
    }

    /// Serialise this bundle to JSON bytes.
    pub fn to_json_vec(&self) -> FhirResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Returns true when `Bundle.type` is `message`.
    pub fn is_message(&self) -> bool {
        self.bundle_type == BundleType::Message
    }

    /// Returns true when `Bundle.type` is `document`.
    pub fn is_document(&self) -> bool {
        self.bundle_type == BundleType::Document
    }

    /// The resource of the first entry, if any.
    pub fn first_resource(&self) -> Option<&Resource> {
        self.entry.first().and_then(|e| e.resource.as_ref())
    }

    /// The message header leading a message bundle.
    ///
    /// Returns `None` when the first entry is missing or is not a `MessageHeader`.
    pub fn message_header(&self) -> Option<&MessageHeader> {
        match self.first_resource() {
            Some(Resource::MessageHeader(header)) => Some(header),
            _ => None,
        }
    }

    /// The bundle id, or an empty string when absent.
    pub fn id_or_empty(&self) -> &str {
        self.id.as_deref().unwrap_or("")
    }
}

/// A single `Bundle.entry`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub link: Vec<BundleLink>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Resource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<BundleEntrySearch>,

    /// Uninterpreted entry elements such as `request` and `response`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BundleEntry {
    /// Creates an entry carrying `resource` at the given locator.
    pub fn with_resource(full_url: impl Into<String>, resource: Resource) -> Self {
        Self {
            full_url: Some(full_url.into()),
            resource: Some(resource),
            ..Self::default()
        }
    }

    /// Non-empty `fullUrl`, if any.
    pub fn full_url(&self) -> Option<&str> {
        self.full_url.as_deref().filter(|u| !u.is_empty())
    }

    /// `search.score`, if any.
    pub fn score(&self) -> Option<f64> {
        self.search.as_ref().and_then(|s| s.score)
    }

    /// Links whose relation is `related` (compared case-insensitively).
    pub fn related_links(&self) -> impl Iterator<Item = &BundleLink> {
        self.link
            .iter()
            .filter(|l| l.relation.eq_ignore_ascii_case(RELATED_RELATION))
    }

    /// Returns the `fullUrl` of an entry that reports a scored candidate match.
    ///
    /// A qualifying entry has no embedded resource, a non-empty `fullUrl`, a search component
    /// with a positive score, and at least one `related` link.
    pub fn scored_match_source(&self) -> Option<&str> {
        if self.resource.is_some() {
            return None;
        }
        let source = self.full_url()?;
        let score = self.score()?;
        if score <= 0.0 || self.related_links().next().is_none() {
            return None;
        }
        Some(source)
    }
}

/// A `Bundle.entry.link` (or `Bundle.link`) element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleLink {
    pub relation: String,
    pub url: String,
}

/// `Bundle.entry.search`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleEntrySearch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,
}

impl BundleEntrySearch {
    /// `valueCode` of the first extension with the given url.
    pub fn extension_code(&self, url: &str) -> Option<&str> {
        self.extension
            .iter()
            .find(|e| e.url == url)
            .and_then(|e| e.value_code.as_deref())
    }
}

/// A FHIR extension carrying a code or string value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,
}
