use std::collections::BTreeMap;

use axum::{
    extract::rejection::JsonRejection,
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde_json::json;

type JsonPathError = serde_path_to_error::Error<serde_json::Error>;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Field name -> messages, body of 400 responses
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid movie: {0}")]
    Validation(#[from] garde::Report),

    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),

    #[error("Path id {path} does not match body id {body}")]
    IdMismatch { path: i64, body: i64 },

    #[error("Record not found")]
    NotFound,

    #[error("Update of movie {0} failed, but record still exists")]
    UnresolvedConflict(i64),

    #[error("Storage error: {0}")]
    Storage(#[from] movies_dal::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

fn field_errors(report: &garde::Report) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for (path, error) in report.iter() {
        errors
            .entry(path.to_string())
            .or_default()
            .push(error.to_string());
    }
    errors
}

/// Field and message of a body that is valid JSON, but a field has wrong type or is null
fn rejected_field(rejection: &JsonRejection) -> Option<(String, String)> {
    let JsonRejection::JsonDataError(_) = rejection else {
        return None;
    };
    let mut source = std::error::Error::source(rejection);
    while let Some(err) = source {
        if let Some(e) = err.downcast_ref::<JsonPathError>() {
            let field = e.path().to_string();
            return (field != ".").then(|| (field, e.inner().to_string()));
        }
        source = err.source();
    }
    None
}

fn single_field_error(field: &str, message: String) -> FieldErrors {
    FieldErrors::from([(field.to_string(), vec![message])])
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(ref report) => {
                tracing::debug!("Validation failed: {report}");
                (StatusCode::BAD_REQUEST, Json(field_errors(report))).into_response()
            }
            ApiError::InvalidBody(rejection) => {
                tracing::debug!("Rejected body: {rejection}");
                let errors = match rejected_field(&rejection) {
                    Some((field, message)) => single_field_error(&field, message),
                    None => single_field_error("body", rejection.body_text()),
                };
                (StatusCode::BAD_REQUEST, Json(errors)).into_response()
            }
            ApiError::IdMismatch { .. } => (
                StatusCode::BAD_REQUEST,
                Json(single_field_error("id", self.to_string())),
            )
                .into_response(),
            ApiError::NotFound => StatusCode::NOT_FOUND.into_response(),
            ApiError::UnresolvedConflict(id) => {
                tracing::error!("Update of movie {id} conflicted and the record still exists");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "Update failed"})),
                )
                    .into_response()
            }
            ApiError::Storage(e) => {
                tracing::error!(error = ?e, "Storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "An internal storage error occurred"})),
                )
                    .into_response()
            }
            ApiError::Url(e) => {
                tracing::error!(error = ?e, "Cannot build URL");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "Invalid server URL"})),
                )
                    .into_response()
            }
        }
    }
}
