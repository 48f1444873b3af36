use axum::http::HeaderMap;
use std::time::Instant;

/// Per-request context carrying metadata for logging, metrics and the
/// entitlement collaborator. Injected as an axum `Extension` by the
/// request context middleware; it lives in request extensions, never in the
/// header map, so it is never copied to the backend.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique request identifier (UUID v4).
    pub request_id: String,
    /// When the request was received.
    pub start_time: Instant,
    /// Client IP address, if available.
    pub client_ip: Option<String>,
}

impl RequestContext {
    pub fn new(client_ip: Option<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            start_time: Instant::now(),
            client_ip,
        }
    }

    /// Returns elapsed time since request start.
    pub fn elapsed_ms(&self) -> u128 {
        self.start_time.elapsed().as_millis()
    }
}

/// What the entitlement collaborator gets to see about the caller.
#[derive(Debug, Clone)]
pub struct CallerContext<'a> {
    pub request: &'a RequestContext,
    pub headers: &'a HeaderMap,
    pub path: &'a str,
}

impl CallerContext<'_> {
    /// Credential presented by the caller: `Authorization: Bearer <token>`
    /// first, then `x-api-key`.
    pub fn credential(&self) -> Option<&str> {
        self.headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .or_else(|| {
                self.headers
                    .get("x-api-key")
                    .and_then(|v| v.to_str().ok())
            })
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}
