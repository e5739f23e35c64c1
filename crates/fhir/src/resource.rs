//! Closed sum type over the resources carried inside bundle entries.
//!
//! Discrimination happens once, at decode time, on the `resourceType` tag. Known kinds decode
//! into their typed wire models; anything else is retained as raw JSON in
//! [`Resource::Other`] so it can be stored and echoed back unchanged.

use crate::{Composition, MessageHeader, Parameters};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::ser::{self, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const RESOURCE_TYPE_FIELD: &str = "resourceType";

/// Maximum length of a FHIR logical id.
const MAX_ID_LEN: usize = 64;

/// Returns true when `id` is a valid FHIR logical id: 1 to 64 characters from `A-Z a-z 0-9 - .`.
pub fn is_valid_id(id: &str) -> bool {
    (1..=MAX_ID_LEN).contains(&id.len())
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'.')
}

/// A resource embedded in a bundle entry or parameter.
#[derive(Clone, Debug, PartialEq)]
pub enum Resource {
    MessageHeader(MessageHeader),
    Parameters(Parameters),
    Composition(Composition),
    Other(OtherResource),
}

/// A resource of a kind the harness does not interpret.
#[derive(Clone, Debug, PartialEq)]
pub struct OtherResource {
    pub resource_type: String,
    /// The complete JSON object, including its `resourceType` tag.
    pub content: Value,
}

impl Resource {
    /// The `resourceType` tag of this resource.
    pub fn resource_type(&self) -> &str {
        match self {
            Self::MessageHeader(_) => "MessageHeader",
            Self::Parameters(_) => "Parameters",
            Self::Composition(_) => "Composition",
            Self::Other(other) => &other.resource_type,
        }
    }

    /// The resource id, when present.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::MessageHeader(h) => h.id.as_deref(),
            Self::Parameters(p) => p.id.as_deref(),
            Self::Composition(c) => c.id.as_deref(),
            Self::Other(o) => o.content.get("id").and_then(Value::as_str),
        }
    }
}

impl Serialize for Resource {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let typed = match self {
            Self::MessageHeader(h) => serde_json::to_value(h),
            Self::Parameters(p) => serde_json::to_value(p),
            Self::Composition(c) => serde_json::to_value(c),
            Self::Other(other) => return other.content.serialize(serializer),
        };
        let mut value = typed.map_err(ser::Error::custom)?;
        match value.as_object_mut() {
            Some(map) => {
                map.insert(
                    RESOURCE_TYPE_FIELD.to_owned(),
                    Value::String(self.resource_type().to_owned()),
                );
            }
            None => return Err(ser::Error::custom("resource did not serialize to an object")),
        }
        value.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Resource {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let tag = value
            .get(RESOURCE_TYPE_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| de::Error::missing_field(RESOURCE_TYPE_FIELD))?
            .to_owned();

        match tag.as_str() {
            "MessageHeader" => decode_typed(value).map(Self::MessageHeader),
            "Parameters" => decode_typed(value).map(Self::Parameters),
            "Composition" => decode_typed(value).map(Self::Composition),
            _ => Ok(Self::Other(OtherResource {
                resource_type: tag,
                content: value,
            })),
        }
    }
}

/// Decodes a typed resource without its tag; [`Resource`]'s serializer writes the tag back.
fn decode_typed<T, E>(mut value: Value) -> Result<T, E>
where
    T: DeserializeOwned,
    E: de::Error,
{
    if let Some(map) = value.as_object_mut() {
        map.remove(RESOURCE_TYPE_FIELD);
    }
    serde_json::from_value(value).map_err(E::custom)
}
