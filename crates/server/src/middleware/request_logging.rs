use crate::AppState;
use axum::extract::State;
use axum::{extract::Request, middleware::Next, response::Response};
use model_gateway_core::context::RequestContext;
use tracing::Instrument;

/// Runs the rest of the stack inside a `request` span so every pipeline
/// event carries the request id, then logs the outcome and records latency.
pub async fn request_logging_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(ctx) = request.extensions().get::<RequestContext>().cloned() else {
        return next.run(request).await;
    };

    let span = tracing::info_span!(
        "request",
        request_id = %ctx.request_id,
        client_ip = ctx.client_ip.as_deref().unwrap_or("-"),
        method = %request.method(),
        path = %request.uri().path(),
    );

    async move {
        tracing::info!("Request received");
        let response = next.run(request).await;

        let elapsed = ctx.elapsed_ms();
        state.metrics.record_latency_ms(elapsed);

        let status = response.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), elapsed_ms = elapsed as u64, "Request completed");
        } else {
            tracing::info!(status = status.as_u16(), elapsed_ms = elapsed as u64, "Request completed");
        }
        response
    }
    .instrument(span)
    .await
}
