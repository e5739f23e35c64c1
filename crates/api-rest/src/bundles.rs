use crate::error::{api_error, ApiError};
use crate::resources::to_json;
use crate::AppState;
use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::Json,
};
use ptmatch_core::{CorrelationOutcome, StoredBundle, StoredResource};
use serde_json::Value;

#[utoipa::path(
    post,
    path = "/Bundle",
    responses(
        (status = 201, description = "Bundle stored"),
        (status = 400, description = "Body is not a bundle"),
        (status = 422, description = "Response does not answer any known request"),
        (status = 500, description = "Internal server error")
    )
)]
/// Store a bundle and, if it is a record match response, attach it to its job
pub async fn post_bundle(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    ingest(&state, None, body).await
}

#[utoipa::path(
    put,
    path = "/Bundle/{id}",
    params(("id" = String, Path, description = "FHIR logical id of the bundle")),
    responses(
        (status = 200, description = "Bundle replaced"),
        (status = 201, description = "Bundle stored"),
        (status = 400, description = "Invalid id or body"),
        (status = 422, description = "Response does not answer any known request"),
        (status = 500, description = "Internal server error")
    )
)]
/// Store a bundle under a caller-chosen id, then correlate it like `POST /Bundle`
pub async fn put_bundle(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    ingest(&state, Some(&id), body).await
}

async fn ingest(
    state: &AppState,
    fhir_id: Option<&str>,
    body: Value,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (stored, created): (StoredBundle, bool) = state
        .resources
        .write_bundle(fhir_id, body)
        .await
        .map_err(api_error)?;

    let outcome = state
        .correlator
        .correlate(&stored.bundle)
        .await
        .map_err(api_error)?;

    match &outcome {
        CorrelationOutcome::Ignored(_) => {}
        CorrelationOutcome::Duplicate { job_id, message_id } => {
            tracing::info!(job_id = %job_id, message_id = %message_id, "Duplicate response acknowledged");
        }
        CorrelationOutcome::Accepted {
            job_id,
            response_id,
            metrics,
        } => {
            tracing::info!(job_id = %job_id, response_id = %response_id, metrics = ?metrics, "Response accepted");
        }
    }

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, to_json(&StoredResource::Bundle(stored))?))
}
