//! # API REST
//!
//! REST API for the ptmatch record-matching harness.
//!
//! Handles:
//! - resource CRUD for every [`ResourceKind`], one route set per kind
//! - job creation (`POST /RecordMatchJob`), which submits the match request
//! - bundle ingestion (`POST /Bundle`, `PUT /Bundle/{id}`), which runs the response correlator
//! - metrics and link queries, answer key upload, health and the OpenAPI document
//!
//! All business rules live in `ptmatch-core`; handlers only decode, delegate and map errors.

#![warn(rust_2018_idioms)]

mod answer_key;
mod bundles;
mod error;
mod jobs;
mod resources;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use ptmatch_core::{
    JobService, MatchTransport, RequestDispatcher, ResourceKind, ResourceService, ResourceStore,
    ResponseCorrelator,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{OpenApi, ToSchema};

pub use error::{api_error, status_for, ApiError};

/// Application state shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    resources: ResourceService,
    jobs: JobService,
    correlator: ResponseCorrelator,
}

impl AppState {
    /// Wires the core services over one store and one outbound transport.
    pub fn new(store: Arc<dyn ResourceStore>, transport: Arc<dyn MatchTransport>) -> Self {
        Self {
            resources: ResourceService::new(store.clone()),
            jobs: JobService::new(store.clone(), RequestDispatcher::new(transport)),
            correlator: ResponseCorrelator::new(store),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        resources::list_resources,
        resources::create_resource,
        resources::get_resource,
        resources::update_resource,
        resources::delete_resource,
        jobs::create_job,
        jobs::job_links,
        jobs::job_metrics,
        bundles::post_bundle,
        bundles::put_bundle,
        answer_key::upload_answer_key,
    ),
    components(schemas(HealthRes, jobs::CreateJobReq))
)]
pub struct ApiDoc;

/// Builds the REST router.
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi))
        .route("/RecordMatchJobMetrics", get(jobs::job_metrics))
        .route("/RecordMatchJob/:id/links", get(jobs::job_links))
        .route("/AnswerKey", post(answer_key::upload_answer_key));

    for kind in ResourceKind::ALL {
        app = app.merge(resource_routes(kind));
    }

    app.layer(CorsLayer::permissive()).with_state(state)
}

/// CRUD routes for one resource kind.
///
/// Jobs are created by submitting a match request, and bundle writes run the correlator; every
/// other write is a plain store operation.
fn resource_routes(kind: ResourceKind) -> Router<AppState> {
    let collection_path = format!("/{}", kind.name());
    let item_path = format!("/{}/:id", kind.name());

    let collection = match kind {
        ResourceKind::RecordMatchJob => get(resources::list_resources).post(jobs::create_job),
        ResourceKind::Bundle => get(resources::list_resources).post(bundles::post_bundle),
        _ => get(resources::list_resources).post(resources::create_resource),
    };
    let item = match kind {
        ResourceKind::Bundle => get(resources::get_resource)
            .put(bundles::put_bundle)
            .delete(resources::delete_resource),
        _ => get(resources::get_resource)
            .put(resources::update_resource)
            .delete(resources::delete_resource),
    };

    Router::new()
        .route(&collection_path, collection)
        .route(&item_path, item)
        .layer(Extension(kind))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "ptmatch REST API is alive".into(),
    })
}

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
