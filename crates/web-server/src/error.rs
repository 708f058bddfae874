use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use database::DbError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),
    #[error("Bad request: {0}")]
    BadRequest(String),
    /// An extractor refused the request for a reason other than bad input,
    /// e.g. a missing `Content-Type` header.
    #[error("Rejected request ({0}): {1}")]
    Rejected(StatusCode, String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
                AppError::BadRequest(rejection.body_text())
            }
            other => AppError::Rejected(other.status(), other.body_text()),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<core_types::CoreError> for AppError {
    fn from(err: core_types::CoreError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Database(DbError::NotFound) => {
                (StatusCode::NOT_FOUND, "The requested record was not found".to_string())
            }
            AppError::Database(DbError::Validation(err)) => (StatusCode::BAD_REQUEST, err.to_string()),
            AppError::Database(db_err) => {
                tracing::error!(error = ?db_err, "Database error.");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal database error occurred".to_string(),
                )
            }
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            AppError::Rejected(status, message) => (status, message),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
