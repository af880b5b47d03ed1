use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::error::StudentsError;

/// Exact-match origin allow-list shared by the gate and the CORS header layer.
#[derive(Debug, Clone)]
pub struct AllowedOrigins {
    origins: Arc<[HeaderValue]>,
}

impl AllowedOrigins {
    pub fn new<I, S>(origins: I) -> Result<Self, StudentsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let origins = origins
            .into_iter()
            .map(|o| {
                HeaderValue::from_str(o.as_ref()).map_err(|_| {
                    StudentsError::Config(format!("invalid CORS origin `{}`", o.as_ref()))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            origins: origins.into(),
        })
    }

    pub fn allows(&self, origin: &HeaderValue) -> bool {
        self.origins.iter().any(|allowed| allowed == origin)
    }

    /// Browser-facing CORS headers: GET/POST/DELETE with `Content-Type` only.
    pub fn layer(&self) -> CorsLayer {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(self.origins.iter().cloned()))
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE])
    }
}

/// Requests without an `Origin` header, or with an allow-listed one, pass.
/// Anything else is turned away before routing.
pub fn ensure_origin_allowed(
    headers: &HeaderMap,
    origins: &AllowedOrigins,
) -> Result<(), StudentsError> {
    match headers.get(header::ORIGIN) {
        None => Ok(()),
        Some(origin) if origins.allows(origin) => Ok(()),
        Some(origin) => {
            warn!(origin = ?origin, "rejecting request from disallowed origin");
            Err(StudentsError::CorsRejected)
        }
    }
}

pub async fn cors_gate(
    State(origins): State<AllowedOrigins>,
    req: Request,
    next: Next,
) -> Response {
    match ensure_origin_allowed(req.headers(), &origins) {
        Ok(()) => next.run(req).await,
        Err(e) => e.into_response(),
    }
}
