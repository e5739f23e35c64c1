use crate::error::{api_error, bad_request, ApiError};
use crate::resources::{parse_id, to_json};
use crate::AppState;
use axum::{
    extract::{Multipart, State},
    response::Json,
};
use fhir::Bundle;
use ptmatch_core::{ResourceKind, StoredResource};
use serde_json::Value;

#[utoipa::path(
    post,
    path = "/AnswerKey",
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "`recordSetId` text field and `answerKey` bundle file"
    ),
    responses(
        (status = 200, description = "Record set with its new answer key"),
        (status = 400, description = "Missing field or invalid answer key"),
        (status = 404, description = "Record set not found")
    )
)]
/// Replace a record set's answer key with an uploaded document bundle
pub async fn upload_answer_key(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut record_set_id = None;
    let mut answer_key = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Malformed multipart body: {}", e);
        bad_request("Malformed multipart body")
    })? {
        let name = field.name().unwrap_or_default().to_owned();
        let text = field.text().await.map_err(|e| {
            tracing::warn!("Unreadable multipart field '{}': {}", name, e);
            bad_request(format!("Unreadable field '{name}'"))
        })?;

        match name.as_str() {
            "recordSetId" => record_set_id = Some(text),
            "answerKey" => answer_key = Some(text),
            other => tracing::debug!("Ignoring multipart field '{}'", other),
        }
    }

    let record_set_id = record_set_id.ok_or_else(|| bad_request("recordSetId is required"))?;
    let record_set_id = parse_id(ResourceKind::RecordSet, record_set_id.trim())?;
    let answer_key = answer_key.ok_or_else(|| bad_request("answerKey is required"))?;

    let key = Bundle::parse_json(&answer_key).map_err(|e| {
        tracing::warn!("Answer key is not a bundle: {}", e);
        bad_request(format!("Answer key is not a bundle: {e}"))
    })?;

    let record_set = state
        .resources
        .set_answer_key(record_set_id, key)
        .await
        .map_err(api_error)?;

    to_json(&StoredResource::RecordSet(record_set))
}
