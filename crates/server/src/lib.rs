pub mod authorize;
pub mod forward;
pub mod handler;
pub mod middleware;

use arc_swap::ArcSwap;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Router, middleware as axum_mw};
use forward::Forwarder;
use model_gateway_core::config::Config;
use model_gateway_core::entitlements::EntitlementService;
use model_gateway_core::error::GatewayError;
use model_gateway_core::metrics::Metrics;
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ArcSwap<Config>>,
    pub entitlements: Arc<dyn EntitlementService>,
    pub forwarder: Arc<Forwarder>,
    pub metrics: Arc<Metrics>,
}

/// The gateway listener. Every request, whatever its method or path, goes
/// through the model pipeline.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .fallback(handler::model::model_request)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::request_logging::request_logging_middleware,
        ))
        .layer(axum_mw::from_fn(
            middleware::request_context::request_context_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The operational listener: read-only health, metrics and config views.
/// Served on its own address so no path on the gateway listener is taken.
pub fn build_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handler::health::health))
        .route("/metrics", get(handler::health::metrics))
        .route("/config", get(handler::health::config_summary))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Last-resort conversion of a handler panic into a JSON 500.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unexpected panic".to_string()
    };
    tracing::error!(panic = %detail, "Request handler panicked");
    GatewayError::Internal(detail).into_response()
}
