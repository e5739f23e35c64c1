//! Constants used throughout the ptmatch core crate.

/// Event code carried by every record-match request and response header.
pub const RECORD_MATCH_EVENT_CODE: &str = "record-match";

/// Private event vocabulary under which [`RECORD_MATCH_EVENT_CODE`] is defined.
pub const RECORD_MATCH_EVENT_SYSTEM: &str = "http://github.com/mitre/ptmatch/fhir/message-events";

/// Search extension whose `valueCode` grades a reported link (certain, probable, possible).
pub const MPI_MATCH_EXTENSION_URL: &str =
    "http://hl7.org/fhir/StructureDefinition/patient-mpi-match";

/// Content type used when submitting a request bundle.
pub const REQUEST_CONTENT_TYPE: &str = "application/json";

/// Collection segment of the FHIR server path that request bundles are PUT into.
pub const BUNDLE_PATH_SEGMENT: &str = "Bundle";

/// Parameter names describing a record set in a request.
pub const PARAM_TYPE: &str = "type";
pub const PARAM_RESOURCE_TYPE: &str = "resourceType";
pub const PARAM_SEARCH_EXPRESSION: &str = "searchExpression";

/// `type` values of the record set parameters.
pub const RECORD_SET_MASTER: &str = "master";
pub const RECORD_SET_QUERY: &str = "query";

/// Answer keys with this many entries or fewer are treated as absent.
pub const MIN_ANSWER_KEY_ENTRIES: usize = 1;

/// Default number of links returned by the best/worst links query.
pub const DEFAULT_LINKS_LIMIT: usize = 10;

/// Default REST listen address.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3001";

/// Default MongoDB database name.
pub const DEFAULT_DATABASE_NAME: &str = "ptmatch";
