//! FHIR `Parameters` wire model, used to describe record sets inside a match request.

use crate::Resource;
use serde::{Deserialize, Serialize};

/// A FHIR `Parameters` resource.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameter: Vec<Parameter>,
}

impl Parameters {
    /// Looks up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameter.iter().find(|p| p.name == name)
    }

    /// The `valueString` of the named parameter.
    pub fn value_string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|p| p.value_string.as_deref())
    }
}

/// `Parameters.parameter`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Box<Resource>>,
}

impl Parameter {
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_string: Some(value.into()),
            resource: None,
        }
    }

    pub fn resource(name: impl Into<String>, resource: Resource) -> Self {
        Self {
            name: name.into(),
            value_string: None,
            resource: Some(Box::new(resource)),
        }
    }
}
