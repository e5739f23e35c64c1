//! FHIR `MessageHeader` wire model.
//!
//! A message header leads every message bundle. The harness relies on three of its fields:
//! - `id`: the correlation key of an outbound request
//! - `event`: classifies the message (`record-match` under a private event system)
//! - `response.identifier`: on inbound responses, echoes the request header id

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A FHIR `MessageHeader`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<Coding>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<MessageResponse>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<MessageSource>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub destination: Vec<MessageDestination>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<Reference>,

    /// Header elements the harness does not interpret (`meta`, `sender`, `focus`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MessageHeader {
    /// Returns true when the header's event carries exactly `code` under `system`.
    pub fn has_event(&self, system: &str, code: &str) -> bool {
        self.event
            .as_ref()
            .is_some_and(|e| e.system.as_deref() == Some(system) && e.code.as_deref() == Some(code))
    }

    /// The identifier of the request this message responds to, when present and non-empty.
    pub fn in_response_to(&self) -> Option<&str> {
        self.response
            .as_ref()
            .map(|r| r.identifier.as_str())
            .filter(|id| !id.is_empty())
    }
}

/// A FHIR `Coding`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Coding {
    pub fn new(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            code: Some(code.into()),
            display: None,
        }
    }
}

/// `MessageHeader.response`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub identifier: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// `MessageHeader.source`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub endpoint: String,
}

/// `MessageHeader.destination`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDestination {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub endpoint: String,
}

/// A FHIR `Reference`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub reference: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_match_requires_code_and_system() {
        let header = MessageHeader {
            event: Some(Coding::new("urn:events", "record-match")),
            ..MessageHeader::default()
        };
        assert!(header.has_event("urn:events", "record-match"));
        assert!(!header.has_event("urn:other", "record-match"));
        assert!(!header.has_event("urn:events", "record-link"));
        assert!(!MessageHeader::default().has_event("urn:events", "record-match"));
    }

    #[test]
    fn blank_response_identifier_is_absent() {
        let mut header = MessageHeader {
            response: Some(MessageResponse::default()),
            ..MessageHeader::default()
        };
        assert_eq!(header.in_response_to(), None);

        header.response = Some(MessageResponse {
            identifier: "abc".into(),
            code: Some("ok".into()),
        });
        assert_eq!(header.in_response_to(), Some("abc"));
    }
}
