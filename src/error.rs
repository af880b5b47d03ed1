use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::error;

#[derive(Debug, ThisError)]
pub enum StudentsError {
    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("store did not report a generated id")]
    MissingInsertId,

    #[error("Too many requests waiting for a database connection")]
    PoolSaturated,

    #[error("Not allowed by CORS")]
    CorsRejected,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl StudentsError {
    pub fn status(&self) -> StatusCode {
        match self {
            StudentsError::Validation(_) => StatusCode::BAD_REQUEST,
            StudentsError::CorsRejected => StatusCode::FORBIDDEN,
            StudentsError::PoolSaturated => StatusCode::SERVICE_UNAVAILABLE,
            StudentsError::DatabaseError(_)
            | StudentsError::MissingInsertId
            | StudentsError::Config(_)
            | StudentsError::UrlParse(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for StudentsError {
    fn from(rejection: JsonRejection) -> Self {
        StudentsError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for StudentsError {
    fn from(rejection: PathRejection) -> Self {
        StudentsError::Validation(rejection.body_text())
    }
}

impl IntoResponse for StudentsError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match &self {
            StudentsError::DatabaseError(_)
            | StudentsError::MissingInsertId
            | StudentsError::Config(_)
            | StudentsError::UrlParse(_) => {
                // Log the real cause, hand the client a generic message.
                error!(error = %self, "request failed");
                "An internal server error occurred.".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ApiErrorBody { error: message })).into_response()
    }
}

/// Error body shared by every failing route: `{"error": "..."}`.
#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
}
