use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use std::time::Duration;
use student_registry::db::{PoolSettings, StorePool, StudentsStorage};
use student_registry::middleware::AllowedOrigins;
use student_registry::router::{StudentsState, students_router};
use tempfile::TempDir;
use tower::ServiceExt;

const ALLOWED: &str = "https://frontend.example";

struct TestApp {
    app: Router,
    _dir: TempDir,
}

fn open_storage(dir: &TempDir, max_connections: u32) -> StudentsStorage {
    let database_url = format!(
        "sqlite:{}?mode=rwc",
        dir.path().join("students.sqlite").display()
    );
    let pool = StorePool::open(
        &database_url,
        PoolSettings {
            max_connections,
            queue_limit: 0,
            acquire_timeout: Duration::from_secs(30),
        },
    )
    .expect("pool opens");
    StudentsStorage::new(pool)
}

fn router_for(storage: StudentsStorage) -> Router {
    let origins = AllowedOrigins::new([ALLOWED]).expect("valid origins");
    students_router(StudentsState::new(storage, origins))
}

async fn spawn_app(max_connections: u32) -> TestApp {
    let dir = tempfile::tempdir().expect("temp dir");
    let storage = open_storage(&dir, max_connections);
    storage.init_schema().await.expect("schema created");
    TestApp {
        app: router_for(storage),
        _dir: dir,
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = app.clone().oneshot(req).await.expect("request failed");
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    (status, body.to_vec())
}

fn post_student(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/students")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("failed to build request")
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .expect("failed to build request")
}

async fn list(app: &Router) -> Vec<Value> {
    let (status, body) = send(app, get("/students")).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).expect("student list is json")
}

#[tokio::test]
async fn root_reports_running() {
    let t = spawn_app(2).await;
    let (status, body) = send(&t.app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"Backend API is running!");
}

#[tokio::test]
async fn registered_student_is_listed() {
    let t = spawn_app(2).await;

    let (status, body) = send(
        &t.app,
        post_student(&json!({"name": "Ann", "email": "a@x.com", "idNumber": "S1"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let created: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(created["studentId"], 1);
    assert!(created["message"].as_str().is_some_and(|m| !m.is_empty()));

    let students = list(&t.app).await;
    assert_eq!(students.len(), 1);
    let ann = &students[0];
    assert_eq!(ann["id"], 1);
    assert_eq!(ann["name"], "Ann");
    assert_eq!(ann["email"], "a@x.com");
    assert_eq!(ann["idNumber"], "S1");
    for optional in [
        "phone",
        "address",
        "courses",
        "emergencyContactEmail",
        "emergencyContactPhone",
    ] {
        assert!(ann[optional].is_null(), "{optional} should be null");
    }
}

#[tokio::test]
async fn all_optional_fields_are_stored() {
    let t = spawn_app(2).await;
    let payload = json!({
        "name": "Bo",
        "email": "bo@x.com",
        "phone": "555-0100",
        "address": "1 Main St",
        "courses": "Math",
        "idNumber": "S2",
        "emergencyContactEmail": "parent@x.com",
        "emergencyContactPhone": "555-0199"
    });
    let (status, _) = send(&t.app, post_student(&payload)).await;
    assert_eq!(status, StatusCode::CREATED);

    let students = list(&t.app).await;
    let mut expected = payload.clone();
    expected["id"] = json!(1);
    assert_eq!(students, vec![expected]);
}

#[tokio::test]
async fn missing_required_fields_are_rejected_without_persisting() {
    let t = spawn_app(2).await;

    for payload in [
        json!({"email": "a@x.com", "idNumber": "S1"}),
        json!({"name": "Ann", "idNumber": "S1"}),
        json!({"name": "Ann", "email": "a@x.com"}),
        json!({"name": "", "email": "a@x.com", "idNumber": "S1"}),
        json!({"name": "Ann", "email": "a@x.com", "idNumber": ""}),
    ] {
        let (status, body) = send(&t.app, post_student(&payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
        let err: Value = serde_json::from_slice(&body).unwrap();
        assert!(err["error"].is_string());
    }

    assert!(list(&t.app).await.is_empty());
}

#[tokio::test]
async fn malformed_json_is_a_400_with_error_body() {
    let t = spawn_app(2).await;
    let req = Request::builder()
        .method("POST")
        .uri("/students")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&t.app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let err: Value = serde_json::from_slice(&body).unwrap();
    assert!(err["error"].is_string());
    assert!(list(&t.app).await.is_empty());
}

#[tokio::test]
async fn delete_removes_exactly_one_row() {
    let t = spawn_app(2).await;
    for (name, id_number) in [("Ann", "S1"), ("Bo", "S2"), ("Cy", "S3")] {
        let (status, _) = send(
            &t.app,
            post_student(&json!({"name": name, "email": "e@x.com", "idNumber": id_number})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&t.app, delete("/students/2")).await;
    assert_eq!(status, StatusCode::OK);
    let msg: Value = serde_json::from_slice(&body).unwrap();
    assert!(msg["message"].is_string());

    let ids: Vec<i64> = list(&t.app)
        .await
        .iter()
        .map(|s| s["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 3]);
}

#[tokio::test]
async fn deleting_unknown_id_still_succeeds() {
    let t = spawn_app(2).await;
    let (status, body) = send(&t.app, delete("/students/424242")).await;
    assert_eq!(status, StatusCode::OK);
    let msg: Value = serde_json::from_slice(&body).unwrap();
    assert!(msg["message"].is_string());
}

#[tokio::test]
async fn non_numeric_id_is_a_400() {
    let t = spawn_app(2).await;
    let (status, body) = send(&t.app, delete("/students/abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let err: Value = serde_json::from_slice(&body).unwrap();
    assert!(err["error"].is_string());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registrations_get_distinct_ids() {
    let t = spawn_app(4).await;

    let requests = (0..20).map(|i| {
        let app = t.app.clone();
        async move {
            let payload = json!({
                "name": format!("Student {i}"),
                "email": format!("s{i}@x.com"),
                "idNumber": format!("S{i}")
            });
            let (status, body) = send(&app, post_student(&payload)).await;
            assert_eq!(status, StatusCode::CREATED);
            let created: Value = serde_json::from_slice(&body).unwrap();
            created["studentId"].as_i64().expect("numeric id")
        }
    });
    let mut ids = futures::future::join_all(requests).await;

    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 20);
    assert_eq!(list(&t.app).await.len(), 20);
}

#[tokio::test]
async fn disallowed_origin_never_reaches_handler() {
    let t = spawn_app(2).await;
    let req = Request::builder()
        .method("POST")
        .uri("/students")
        .header(header::ORIGIN, "https://evil.example")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"name": "Eve", "email": "e@x.com", "idNumber": "S9"}).to_string(),
        ))
        .unwrap();
    let (status, body) = send(&t.app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let err: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(err["error"], "Not allowed by CORS");

    assert!(list(&t.app).await.is_empty());
}

#[tokio::test]
async fn allowed_origin_gets_cors_headers() {
    let t = spawn_app(2).await;
    let req = Request::builder()
        .uri("/students")
        .header(header::ORIGIN, ALLOWED)
        .body(Body::empty())
        .unwrap();
    let resp = t.app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some(ALLOWED)
    );
}

#[tokio::test]
async fn preflight_advertises_permitted_methods() {
    let t = spawn_app(2).await;
    let req = Request::builder()
        .method("OPTIONS")
        .uri("/students")
        .header(header::ORIGIN, ALLOWED)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "DELETE")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();
    let resp = t.app.clone().oneshot(req).await.unwrap();
    assert!(resp.status().is_success());
    let methods = resp
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    for m in ["GET", "POST", "DELETE"] {
        assert!(methods.contains(m), "{methods}");
    }
    assert!(!methods.contains("PUT"));
}

#[tokio::test]
async fn health_reports_store_reachable() {
    let t = spawn_app(2).await;
    let (status, body) = send(&t.app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["status"], "ok");
}

#[tokio::test]
async fn store_failures_answer_500_with_generic_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    // No schema: every statement against `students` fails in the store.
    let app = router_for(open_storage(&dir, 2));

    for req in [
        get("/students"),
        post_student(&json!({"name": "Ann", "email": "a@x.com", "idNumber": "S1"})),
        delete("/students/1"),
    ] {
        let route = format!("{} {}", req.method(), req.uri());
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{route}");
        let err: Value = serde_json::from_slice(&body).expect("error body is json");
        assert_eq!(err["error"], "An internal server error occurred.", "{route}");
    }
}

#[tokio::test]
async fn health_is_503_when_store_is_gone() {
    let dir = tempfile::tempdir().expect("temp dir");
    let storage = open_storage(&dir, 2);
    storage.pool().close().await;
    let app = router_for(storage);

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let err: Value = serde_json::from_slice(&body).unwrap();
    assert!(err["error"].is_string());
}
