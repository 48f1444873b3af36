use crate::AppState;
use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}

/// Configuration summary without secrets.
pub async fn config_summary(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.config.load();
    Json(serde_json::json!({
        "server_name": config.server_name,
        "port": config.port,
        "body_limit_mb": config.body_limit_mb,
        "backend": config.backend,
        "egress_proxy": config.proxy_url.is_some(),
        "entitlements": {
            "mode": config.entitlements.mode,
            "keys_count": config.entitlements.keys.len(),
        },
    }))
}
