use std::time::Duration;

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::db::models::{NewStudent, Student};
use crate::{StudentsError, router::StudentsState};

pub const ROOT_BANNER: &str = "Backend API is running!";

const HEALTH_PING_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentCreated {
    pub message: &'static str,
    pub student_id: i64,
}

#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: &'static str,
}

/// GET /
pub async fn root() -> &'static str {
    ROOT_BANNER
}

/// GET /students
pub async fn list_students(
    State(state): State<StudentsState>,
) -> Result<Json<Vec<Student>>, StudentsError> {
    let students = state.storage.list().await?;
    Ok(Json(students))
}

/// POST /students
pub async fn create_student(
    State(state): State<StudentsState>,
    payload: Result<Json<NewStudent>, JsonRejection>,
) -> Result<(StatusCode, Json<StudentCreated>), StudentsError> {
    let Json(student) = payload?;
    let student_id = state.storage.insert(&student).await?;
    info!(student_id, "student registered");
    Ok((
        StatusCode::CREATED,
        Json(StudentCreated {
            message: "Student registered successfully",
            student_id,
        }),
    ))
}

/// DELETE /students/{id}
///
/// Answers 200 whether or not a row matched.
pub async fn delete_student(
    State(state): State<StudentsState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageBody>, StudentsError> {
    let Path(id) = id?;
    let affected = state.storage.delete(id).await?;
    info!(id, affected, "student delete handled");
    Ok(Json(MessageBody {
        message: "Student deleted successfully",
    }))
}

/// GET /health
pub async fn health(State(state): State<StudentsState>) -> Response {
    let reason = match tokio::time::timeout(HEALTH_PING_TIMEOUT, state.storage.ping()).await {
        Ok(Ok(())) => return Json(json!({ "status": "ok" })).into_response(),
        Ok(Err(e)) => e.to_string(),
        Err(_) => "timed out".to_string(),
    };
    warn!(%reason, "store ping failed");
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "error": "database unavailable" })),
    )
        .into_response()
}
