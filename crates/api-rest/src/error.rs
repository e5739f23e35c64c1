use axum::http::StatusCode;
use ptmatch_core::CoreError;

/// Error half of every handler's result: a status code and a plain-text message.
pub type ApiError = (StatusCode, String);

pub fn status_for(err: &CoreError) -> StatusCode {
    match err {
        CoreError::Validation(_)
        | CoreError::MissingDependency { .. }
        | CoreError::InvalidAnswerKey(_)
        | CoreError::InvalidId(_)
        | CoreError::Fhir(_) => StatusCode::BAD_REQUEST,
        CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        CoreError::CorrelationMiss(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CoreError::Dispatch(_) => StatusCode::BAD_GATEWAY,
        CoreError::Store(_) | CoreError::Serialization(_) | CoreError::Config(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Logs `err` and converts it into an [`ApiError`].
///
/// Client and dispatch errors carry their message; anything else is reported as
/// `Internal error`.
pub fn api_error(err: CoreError) -> ApiError {
    let status = status_for(&err);
    if err.is_client_error() {
        tracing::warn!("Request rejected ({}): {}", status, err);
        (status, err.to_string())
    } else if matches!(err, CoreError::Dispatch(_)) {
        tracing::error!("Record matcher unreachable: {}", err);
        (status, err.to_string())
    } else {
        tracing::error!("Request failed: {:?}", err);
        (status, "Internal error".into())
    }
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, message.into())
}
