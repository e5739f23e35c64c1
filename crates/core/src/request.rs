//! Request builder.
//!
//! Builds the FHIR message bundle that asks a matching engine to link records. The message
//! header id is minted fresh on every call and is the key responses are correlated by.

use crate::constants::{
    PARAM_RESOURCE_TYPE, PARAM_SEARCH_EXPRESSION, PARAM_TYPE, RECORD_MATCH_EVENT_CODE,
    RECORD_MATCH_EVENT_SYSTEM, RECORD_SET_MASTER, RECORD_SET_QUERY,
};
use crate::models::{InterfaceEndpoints, RecordSet};
use crate::{CoreError, CoreResult};
use chrono::{SecondsFormat, Utc};
use fhir::{
    Bundle, BundleEntry, BundleType, Coding, MessageDestination, MessageHeader, MessageSource,
    Parameter, Parameters, Reference, Resource,
};
use ptmatch_types::MatchingMode;
use ptmatch_uuid::{fresh_hyphenated, fresh_urn_uuid, RecordId};

/// Builds a record-match request message.
///
/// The bundle holds the message header followed by one `Parameters` entry for the master record
/// set and, in query mode, one for the query record set. The header's `data` references point
/// at those entries in order, and its source endpoint is where the engine must send results.
///
/// A query record set passed in deduplication mode is ignored.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] if `mode` is query and no query record set is given.
pub fn build_request(
    mode: MatchingMode,
    master: &RecordSet,
    query: Option<&RecordSet>,
    endpoints: &InterfaceEndpoints,
) -> CoreResult<Bundle> {
    let mut record_sets = vec![(RECORD_SET_MASTER, master)];
    if mode == MatchingMode::Query {
        let query = query.ok_or_else(|| {
            CoreError::Validation("query mode requires a query record set".into())
        })?;
        record_sets.push((RECORD_SET_QUERY, query));
    }

    let parameter_entries: Vec<BundleEntry> = record_sets
        .into_iter()
        .map(|(set_type, set)| {
            let id = fresh_hyphenated();
            let parameters = record_set_parameters(&id, set_type, set);
            BundleEntry::with_resource(fresh_urn_uuid(&id), Resource::Parameters(parameters))
        })
        .collect();

    let header_id = fresh_hyphenated();
    let header = MessageHeader {
        id: Some(header_id.clone()),
        timestamp: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        event: Some(Coding::new(RECORD_MATCH_EVENT_SYSTEM, RECORD_MATCH_EVENT_CODE)),
        source: Some(MessageSource {
            name: None,
            endpoint: endpoints.response.to_string(),
        }),
        destination: vec![MessageDestination {
            name: endpoints.destination_name.clone(),
            endpoint: endpoints.destination.to_string(),
        }],
        data: parameter_entries
            .iter()
            .filter_map(|entry| entry.full_url.clone())
            .map(|reference| Reference { reference })
            .collect(),
        ..MessageHeader::default()
    };

    let mut bundle = Bundle::new(BundleType::Message, Some(RecordId::new().to_string()));
    bundle.entry.push(BundleEntry::with_resource(
        fresh_urn_uuid(&header_id),
        Resource::MessageHeader(header),
    ));
    bundle.entry.extend(parameter_entries);

    Ok(bundle)
}

fn record_set_parameters(id: &str, set_type: &str, set: &RecordSet) -> Parameters {
    Parameters {
        id: Some(id.to_owned()),
        parameter: vec![
            Parameter::string(PARAM_TYPE, set_type),
            Parameter::string(PARAM_RESOURCE_TYPE, set.resource_type_or_default()),
            Parameter::resource(
                PARAM_SEARCH_EXPRESSION,
                Resource::Parameters(set.parameters.clone().unwrap_or_default()),
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptmatch_types::NonEmptyText;

    fn endpoints() -> InterfaceEndpoints {
        InterfaceEndpoints {
            destination_name: Some("Engine".into()),
            destination: NonEmptyText::new("http://engine.example/match").expect("text"),
            server: NonEmptyText::new("http://fhir.example").expect("text"),
            response: NonEmptyText::new("http://harness.example/Bundle").expect("text"),
        }
    }

    fn record_set(name: &str) -> RecordSet {
        RecordSet {
            id: Some(RecordId::new()),
            name: Some(name.into()),
            resource_type: Some("Patient".into()),
            parameters: Some(Parameters {
                id: None,
                parameter: vec![Parameter::string("_tag", name)],
            }),
            ..RecordSet::default()
        }
    }

    fn parameters_at(bundle: &Bundle, index: usize) -> &Parameters {
        match bundle.entry[index].resource.as_ref() {
            Some(Resource::Parameters(p)) => p,
            other => panic!("expected Parameters at {index}, got {other:?}"),
        }
    }

    #[test]
    fn deduplication_request_has_header_and_master() {
        let bundle = build_request(
            MatchingMode::Deduplication,
            &record_set("master"),
            Some(&record_set("ignored")),
            &endpoints(),
        )
        .expect("request");

        assert!(bundle.is_message());
        assert_eq!(bundle.entry.len(), 2);
        assert!(bundle.message_header().is_some());
        assert_eq!(parameters_at(&bundle, 1).value_string(PARAM_TYPE), Some("master"));
        assert_eq!(
            parameters_at(&bundle, 1).value_string(PARAM_RESOURCE_TYPE),
            Some("Patient")
        );
    }

    #[test]
    fn query_request_has_three_entries() {
        let bundle = build_request(
            MatchingMode::Query,
            &record_set("master"),
            Some(&record_set("query")),
            &endpoints(),
        )
        .expect("request");

        assert_eq!(bundle.entry.len(), 3);
        assert_eq!(parameters_at(&bundle, 1).value_string(PARAM_TYPE), Some("master"));
        assert_eq!(parameters_at(&bundle, 2).value_string(PARAM_TYPE), Some("query"));

        let search = parameters_at(&bundle, 2)
            .get(PARAM_SEARCH_EXPRESSION)
            .and_then(|p| p.resource.as_deref());
        match search {
            Some(Resource::Parameters(p)) => assert_eq!(p.value_string("_tag"), Some("query")),
            other => panic!("expected search parameters, got {other:?}"),
        }
    }

    #[test]
    fn query_mode_without_query_set_is_rejected() {
        let err = build_request(MatchingMode::Query, &record_set("master"), None, &endpoints())
            .expect_err("missing query set");
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn header_carries_event_endpoints_and_data_references() {
        for mode in [MatchingMode::Deduplication, MatchingMode::Query] {
            let bundle = build_request(
                mode,
                &record_set("master"),
                Some(&record_set("query")),
                &endpoints(),
            )
            .expect("request");
            let header = bundle.message_header().expect("header");

            assert!(header.has_event(RECORD_MATCH_EVENT_SYSTEM, RECORD_MATCH_EVENT_CODE));
            assert_eq!(
                header.source.as_ref().map(|s| s.endpoint.as_str()),
                Some("http://harness.example/Bundle")
            );
            assert_eq!(header.destination[0].endpoint, "http://engine.example/match");
            assert_eq!(header.destination[0].name.as_deref(), Some("Engine"));

            let references: Vec<&str> = header.data.iter().map(|r| r.reference.as_str()).collect();
            let locators: Vec<&str> = bundle.entry[1..]
                .iter()
                .filter_map(|e| e.full_url())
                .collect();
            assert_eq!(references, locators);
            assert_eq!(references.len(), mode.record_set_count());
            assert!(references.iter().all(|r| r.starts_with("urn:uuid:")));
        }
    }

    #[test]
    fn header_id_is_fresh_per_call() {
        let build = || {
            build_request(MatchingMode::Deduplication, &record_set("m"), None, &endpoints())
                .expect("request")
        };
        let first = build();
        let second = build();
        let id = |b: &Bundle| b.message_header().and_then(|h| h.id.clone());

        assert!(id(&first).is_some());
        assert_ne!(id(&first), id(&second));
        assert_ne!(first.id, second.id);
        assert_eq!(
            first.entry[0].full_url(),
            id(&first).map(|i| format!("urn:uuid:{i}")).as_deref()
        );
    }
}
