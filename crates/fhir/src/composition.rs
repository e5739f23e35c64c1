//! FHIR `Composition` wire model.
//!
//! Answer keys are document bundles whose first entry must be a composition summarising the
//! document. The harness only checks for its presence, so just the summary fields are modelled.

use serde::{Deserialize, Serialize};

/// A FHIR `Composition`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Composition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}
