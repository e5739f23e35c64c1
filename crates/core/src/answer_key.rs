//! Answer keys: the known-correct links of a record set.
//!
//! An answer key is a FHIR document bundle. Its first entry is a `Composition` summarising the
//! key; the following entries use the same shape an engine reports links in (a bare entry with a
//! `fullUrl`, a positive `search.score` and `related` links).

use crate::constants::MIN_ANSWER_KEY_ENTRIES;
use crate::{CoreError, CoreResult};
use fhir::{Bundle, Resource};
use std::collections::{BTreeSet, HashMap};

/// Checks that `bundle` can be stored as an answer key.
///
/// # Errors
///
/// Returns [`CoreError::InvalidAnswerKey`] unless the bundle is a `document` with a non-empty id
/// whose first entry is a `Composition`.
pub fn validate(bundle: &Bundle) -> CoreResult<()> {
    if !bundle.is_document() {
        return Err(CoreError::InvalidAnswerKey(format!(
            "bundle type must be 'document', got '{}'",
            bundle.bundle_type
        )));
    }
    if bundle.id.as_deref().map_or(true, str::is_empty) {
        return Err(CoreError::InvalidAnswerKey("bundle id is required".into()));
    }
    match bundle.first_resource() {
        Some(Resource::Composition(_)) => Ok(()),
        _ => Err(CoreError::InvalidAnswerKey(
            "first entry must be a Composition".into(),
        )),
    }
}

pub fn is_valid_answer_key(bundle: &Bundle) -> bool {
    validate(bundle).is_ok()
}

/// Known-correct links keyed by source `fullUrl`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroundTruth {
    links: HashMap<String, BTreeSet<String>>,
}

impl GroundTruth {
    /// Builds the lookup from an answer key.
    ///
    /// Returns `None` when the key has too few entries or names no scored links; such a key is
    /// treated as absent.
    pub fn from_answer_key(answer_key: &Bundle) -> Option<Self> {
        if answer_key.entry.len() <= MIN_ANSWER_KEY_ENTRIES {
            return None;
        }

        let mut links: HashMap<String, BTreeSet<String>> = HashMap::new();
        for entry in &answer_key.entry {
            let Some(source) = entry.scored_match_source() else {
                continue;
            };
            links
                .entry(source.to_owned())
                .or_default()
                .extend(entry.related_links().map(|l| l.url.clone()));
        }

        (!links.is_empty()).then_some(Self { links })
    }

    /// Number of distinct sources in the key; the recall denominator.
    pub fn total(&self) -> usize {
        self.links.len()
    }

    /// The key source a reported `source -> target` link confirms, if any.
    ///
    /// Links are checked in both directions: `target` listed under `source`, or `source` listed
    /// under `target`.
    pub fn confirmed_source<'a>(&'a self, source: &str, target: &str) -> Option<&'a str> {
        if let Some((key, targets)) = self.links.get_key_value(source) {
            if targets.contains(target) {
                return Some(key);
            }
        }
        match self.links.get_key_value(target) {
            Some((key, targets)) if targets.contains(source) => Some(key),
            _ => None,
        }
    }
}
