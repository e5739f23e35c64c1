use crate::error::{api_error, bad_request, ApiError};
use crate::AppState;
use axum::{
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use ptmatch_core::{RecordId, ResourceFilter, ResourceKind, StoredResource};
use serde::Deserialize;
use serde_json::Value;
use utoipa::IntoParams;

/// Reference filters accepted by list and metrics queries.
///
/// Values that are not valid record ids are ignored.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ReferenceQuery {
    pub record_set_id: Option<String>,
    pub record_match_system_interface_id: Option<String>,
    pub record_match_configuration_id: Option<String>,
}

impl ReferenceQuery {
    pub fn filter(&self) -> ResourceFilter {
        let valid = |value: &Option<String>| value.as_deref().and_then(|v| RecordId::parse(v).ok());

        if let Some(id) = valid(&self.record_set_id) {
            ResourceFilter::RecordSet(id)
        } else if let Some(id) = valid(&self.record_match_system_interface_id) {
            ResourceFilter::SystemInterface(id)
        } else if let Some(id) = valid(&self.record_match_configuration_id) {
            ResourceFilter::Configuration(id)
        } else {
            ResourceFilter::All
        }
    }
}

/// Parses a path id. Bundles are addressed by any FHIR logical id, other kinds by record id.
pub fn parse_id(kind: ResourceKind, id: &str) -> Result<RecordId, ApiError> {
    if kind == ResourceKind::Bundle && fhir::is_valid_id(id) {
        return Ok(RecordId::from_external(id));
    }
    RecordId::parse(id).map_err(|e| {
        tracing::warn!("Invalid {} id '{}': {:?}", kind, id, e);
        bad_request(format!("Invalid {kind} id"))
    })
}

pub fn to_json(resource: &StoredResource) -> Result<Json<Value>, ApiError> {
    resource.to_json().map(Json).map_err(api_error)
}

#[utoipa::path(
    get,
    path = "/{resource_type}",
    params(
        ("resource_type" = String, Path, description = "Resource type, e.g. RecordSet"),
        ReferenceQuery
    ),
    responses(
        (status = 200, description = "Resources of this type"),
        (status = 500, description = "Internal server error")
    )
)]
/// List resources of one type, optionally filtered by a referenced record set, system interface
/// or configuration.
pub async fn list_resources(
    State(state): State<AppState>,
    Extension(kind): Extension<ResourceKind>,
    Query(query): Query<ReferenceQuery>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let resources = state
        .resources
        .list(kind, query.filter())
        .await
        .map_err(api_error)?;

    resources
        .iter()
        .map(|r| r.to_json().map_err(api_error))
        .collect::<Result<Vec<_>, _>>()
        .map(Json)
}

#[utoipa::path(
    post,
    path = "/{resource_type}",
    params(("resource_type" = String, Path, description = "Resource type, e.g. RecordSet")),
    responses(
        (status = 201, description = "Resource created"),
        (status = 400, description = "Bad request"),
        (status = 500, description = "Internal server error")
    )
)]
/// Create a resource under a generated id
pub async fn create_resource(
    State(state): State<AppState>,
    Extension(kind): Extension<ResourceKind>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let resource = state.resources.create(kind, body).await.map_err(api_error)?;
    Ok((StatusCode::CREATED, to_json(&resource)?))
}

#[utoipa::path(
    get,
    path = "/{resource_type}/{id}",
    params(
        ("resource_type" = String, Path, description = "Resource type, e.g. RecordSet"),
        ("id" = String, Path, description = "Resource id")
    ),
    responses(
        (status = 200, description = "Resource"),
        (status = 400, description = "Invalid id"),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_resource(
    State(state): State<AppState>,
    Extension(kind): Extension<ResourceKind>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(kind, &id)?;
    let resource = state.resources.get(kind, id).await.map_err(api_error)?;
    to_json(&resource)
}

#[utoipa::path(
    put,
    path = "/{resource_type}/{id}",
    params(
        ("resource_type" = String, Path, description = "Resource type, e.g. RecordSet"),
        ("id" = String, Path, description = "Resource id")
    ),
    responses(
        (status = 200, description = "Resource replaced"),
        (status = 201, description = "Resource created"),
        (status = 400, description = "Bad request")
    )
)]
/// Replace a resource, creating it when the id is unknown
pub async fn update_resource(
    State(state): State<AppState>,
    Extension(kind): Extension<ResourceKind>,
    AxumPath(id): AxumPath<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let id = parse_id(kind, &id)?;
    let (resource, created) = state
        .resources
        .update(kind, id, body)
        .await
        .map_err(api_error)?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, to_json(&resource)?))
}

#[utoipa::path(
    delete,
    path = "/{resource_type}/{id}",
    params(
        ("resource_type" = String, Path, description = "Resource type, e.g. RecordSet"),
        ("id" = String, Path, description = "Resource id")
    ),
    responses(
        (status = 204, description = "Resource deleted"),
        (status = 400, description = "Invalid id"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_resource(
    State(state): State<AppState>,
    Extension(kind): Extension<ResourceKind>,
    AxumPath(id): AxumPath<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(kind, &id)?;
    state.resources.delete(kind, id).await.map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_reference_ids_are_ignored() {
        let set_id = RecordId::new();
        let query = ReferenceQuery {
            record_set_id: Some("not-an-id".into()),
            record_match_system_interface_id: Some(set_id.to_string()),
            record_match_configuration_id: None,
        };
        assert_eq!(query.filter(), ResourceFilter::SystemInterface(set_id));
        assert_eq!(ReferenceQuery::default().filter(), ResourceFilter::All);
    }

    #[test]
    fn bundles_take_fhir_ids() {
        let fhir_id = "6f1c2b9e-3a4d-4e5f-8a7b-1c2d3e4f5a6b";
        assert_eq!(
            parse_id(ResourceKind::Bundle, fhir_id).expect("bundle id"),
            RecordId::from_external(fhir_id)
        );
        assert!(parse_id(ResourceKind::RecordSet, fhir_id).is_err());
        assert!(parse_id(ResourceKind::Bundle, "a b").is_err());
    }
}
