use crate::error::{api_error, ApiError};
use crate::resources::{parse_id, to_json, ReferenceQuery};
use crate::AppState;
use axum::{
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    response::Json,
};
use ptmatch_core::constants::DEFAULT_LINKS_LIMIT;
use ptmatch_core::{
    links, JobSummary, Link, LinkCategory, NewJob, RecordId, ResourceKind, StoredResource,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobReq {
    pub record_match_configuration_id: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LinksQuery {
    /// `best` (default) or `worst`
    pub category: Option<String>,
    /// Maximum number of links, default 10
    pub limit: Option<String>,
}

impl LinksQuery {
    fn category(&self) -> LinkCategory {
        self.category
            .as_deref()
            .and_then(|c| c.parse().ok())
            .unwrap_or_default()
    }

    fn limit(&self) -> usize {
        self.limit
            .as_deref()
            .and_then(|l| l.trim().parse::<usize>().ok())
            .filter(|&l| l > 0)
            .unwrap_or(DEFAULT_LINKS_LIMIT)
    }
}

#[utoipa::path(
    post,
    path = "/RecordMatchJob",
    request_body = CreateJobReq,
    responses(
        (status = 201, description = "Job created and request submitted"),
        (status = 400, description = "Invalid or incomplete configuration"),
        (status = 502, description = "Record matcher unreachable")
    )
)]
/// Create a record match job and submit its request to the configured matcher
pub async fn create_job(
    State(state): State<AppState>,
    Json(req): Json<CreateJobReq>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let record_match_configuration_id = req
        .record_match_configuration_id
        .as_deref()
        .map(|id| parse_id(ResourceKind::RecordMatchConfiguration, id))
        .transpose()?;

    let job = state
        .jobs
        .create_job(NewJob {
            record_match_configuration_id,
            note: req.note,
        })
        .await
        .map_err(api_error)?;

    tracing::info!(job_id = ?job.id, "Record match job created");
    Ok((StatusCode::CREATED, to_json(&StoredResource::Job(job))?))
}

#[utoipa::path(
    get,
    path = "/RecordMatchJob/{id}/links",
    params(("id" = String, Path, description = "Job id"), LinksQuery),
    responses(
        (status = 200, description = "Links ordered by ascending score"),
        (status = 400, description = "Invalid id"),
        (status = 404, description = "Job not found")
    )
)]
/// Best or worst scored links across every response a job received
pub async fn job_links(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Query(query): Query<LinksQuery>,
) -> Result<Json<Vec<Link>>, ApiError> {
    let id: RecordId = parse_id(ResourceKind::RecordMatchJob, &id)?;
    let job = state.resources.job(id).await.map_err(api_error)?;

    let sorted = links::job_links(&job);
    Ok(Json(
        links::select_links(&sorted, query.category(), query.limit()).to_vec(),
    ))
}

#[utoipa::path(
    get,
    path = "/RecordMatchJobMetrics",
    params(ReferenceQuery),
    responses(
        (status = 200, description = "Job summaries with their latest metrics"),
        (status = 500, description = "Internal server error")
    )
)]
/// Job summaries, optionally restricted to jobs referencing a record set, system interface or
/// configuration
pub async fn job_metrics(
    State(state): State<AppState>,
    Query(query): Query<ReferenceQuery>,
) -> Result<Json<Vec<JobSummary>>, ApiError> {
    state
        .resources
        .job_summaries(query.filter())
        .await
        .map(Json)
        .map_err(api_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(category: Option<&str>, limit: Option<&str>) -> LinksQuery {
        LinksQuery {
            category: category.map(str::to_owned),
            limit: limit.map(str::to_owned),
        }
    }

    #[test]
    fn limit_defaults_when_missing_zero_or_garbage() {
        assert_eq!(query(None, None).limit(), DEFAULT_LINKS_LIMIT);
        assert_eq!(query(None, Some("0")).limit(), DEFAULT_LINKS_LIMIT);
        assert_eq!(query(None, Some("lots")).limit(), DEFAULT_LINKS_LIMIT);
        assert_eq!(query(None, Some("3")).limit(), 3);
    }

    #[test]
    fn unknown_category_means_best() {
        assert_eq!(query(Some("worst"), None).category(), LinkCategory::Worst);
        assert_eq!(query(Some("middling"), None).category(), LinkCategory::Best);
        assert_eq!(query(None, None).category(), LinkCategory::Best);
    }
}
