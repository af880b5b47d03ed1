use axum::{
    Router, middleware,
    routing::{delete, get},
};
use tower_http::trace::TraceLayer;

use crate::db::StudentsStorage;
use crate::handlers::students::{create_student, delete_student, health, list_students, root};
use crate::middleware::cors::{AllowedOrigins, cors_gate};

#[derive(Clone)]
pub struct StudentsState {
    pub storage: StudentsStorage,
    pub origins: AllowedOrigins,
}

impl StudentsState {
    pub fn new(storage: StudentsStorage, origins: AllowedOrigins) -> Self {
        Self { storage, origins }
    }
}

/// Routes, wrapped (outermost first) in request tracing, the origin gate and
/// the CORS header layer.
pub fn students_router(state: StudentsState) -> Router {
    let origins = state.origins.clone();

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/students", get(list_students).post(create_student))
        .route("/students/{id}", delete(delete_student))
        .layer(origins.layer())
        .layer(middleware::from_fn_with_state(origins, cors_gate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
