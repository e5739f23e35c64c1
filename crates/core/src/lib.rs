//! # ptmatch core
//!
//! Core business logic for the ptmatch record-matching test harness.
//!
//! The harness asks an external record matching engine to link patient records, collects the
//! engine's asynchronous answers, and scores them against an optional answer key:
//!
//! - [`request`]: builds a correlatable FHIR message bundle from a match configuration
//! - [`dispatch`]: submits the request to the engine's FHIR server and records the outcome
//! - [`correlator`]: matches inbound response bundles back to the job that issued the request
//! - [`metrics`]: computes cumulative precision/recall/F1 against the answer key
//! - [`links`]: ranks the links reported across a job's responses
//! - [`jobs`]: creates jobs (load, validate, build, dispatch, persist)
//! - [`resources`]: generic CRUD over every resource kind, plus answer key upload
//!
//! Persistence goes through the [`store::ResourceStore`] trait, passed explicitly into every
//! service. Two stores are provided: an in-memory store and a MongoDB store.
//!
//! **No API concerns**: HTTP routing and request decoding belong in `api-rest`.

pub mod answer_key;
pub mod config;
pub mod constants;
pub mod correlator;
pub mod dispatch;
pub mod error;
pub mod jobs;
pub mod links;
pub mod metrics;
pub mod models;
pub mod request;
pub mod resources;
pub mod store;

pub use config::{AppConfig, StoreBackend};
pub use correlator::{CorrelationOutcome, IgnoreReason, ResponseCorrelator};
pub use dispatch::{HttpTransport, MatchTransport, RequestDispatcher, TransportStatus};
pub use error::{CoreError, CoreResult};
pub use jobs::{JobService, NewJob};
pub use links::LinkCategory;
pub use metrics::{MetricsEngine, MetricsOutcome, SkipReason};
pub use models::{
    InterfaceEndpoints, JobSummary, Link, MatchConfiguration, MatchJob, MatchPlan, MatchRequest,
    MatchResponse, Metrics, RecordMeta, RecordSet, ResourceKind, StatusEntry, StoredBundle,
    StoredResource, SystemInterface,
};
pub use resources::ResourceService;
pub use store::{memory::MemoryStore, mongo::MongoStore, ResourceFilter, ResourceStore};

pub use ptmatch_types::{MatchingMode, NonEmptyText};
pub use ptmatch_uuid::RecordId;
