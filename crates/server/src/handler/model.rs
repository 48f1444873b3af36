//! The model request pipeline: validate, authorize, then redirect or
//! normalize-and-forward.

use crate::AppState;
use crate::authorize::authorize;
use crate::forward::OutboundRequest;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use model_gateway_core::backend_url::{BackendTarget, model_path};
use model_gateway_core::context::{CallerContext, RequestContext};
use model_gateway_core::error::GatewayError;
use model_gateway_core::headers::filter_outbound;
use model_gateway_core::normalize::{is_embeddings_path, normalize_embeddings};
use model_gateway_core::request::{
    declared_content_length, ensure_post, ensure_within_limit, parse_model_request,
    read_body_prefix,
};

const REDIRECT_BODY: &str = "Redirecting to model endpoint";

/// Entry point for every request that is not an operational endpoint.
/// Always produces a complete response; failures are rendered here.
pub async fn model_request(State(state): State<AppState>, request: Request) -> Response {
    state.metrics.record_request();

    match route(&state, request).await {
        Ok(response) => response,
        Err(e) => {
            state.metrics.record_rejection(e.kind());
            if matches!(e, GatewayError::BadGateway(_)) {
                state.metrics.record_backend_failure();
            }
            e.into_response()
        }
    }
}

async fn route(state: &AppState, request: Request) -> Result<Response, GatewayError> {
    let (parts, body) = request.into_parts();
    let ctx = parts
        .extensions
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_else(|| RequestContext::new(None));
    let path = parts.uri.path();

    ensure_post(&parts.method)?;
    let declared = declared_content_length(&parts.headers);
    ensure_within_limit(declared, state.config.load().body_limit_bytes())?;
    let raw = read_body_prefix(body, declared).await?;
    let mut model_req = parse_model_request(&raw)?;

    tracing::info!(
        request_id = %ctx.request_id,
        path = %path,
        model = %model_req.model,
        "Model request"
    );

    let caller = CallerContext {
        request: &ctx,
        headers: &parts.headers,
        path,
    };
    let user = authorize(state.entitlements.as_ref(), &caller, &model_req.model).await?;

    if !is_embeddings_path(path) {
        state.metrics.record_redirect();
        return redirect(&model_req.model, path);
    }

    normalize_embeddings(&mut model_req)?;

    let config = state.config.load();
    let target = BackendTarget::resolve(
        &parts.uri,
        &parts.headers,
        &config.server_name,
        Some(config.port),
    );
    let outbound = OutboundRequest {
        url: target.url_for(&model_req.model, path),
        method: parts.method.clone(),
        headers: filter_outbound(&parts.headers),
        body: model_req.to_json_bytes()?,
    };

    tracing::debug!(
        request_id = %ctx.request_id,
        user = %user.id,
        url = %outbound.url,
        "Forwarding embeddings request"
    );

    let response = state.forwarder.forward(outbound).await?;
    state.metrics.record_forwarded();
    Ok(response)
}

/// 307 to the proxy-relative model endpoint; the outer proxy follows it.
fn redirect(model: &str, path: &str) -> Result<Response, GatewayError> {
    Response::builder()
        .status(StatusCode::TEMPORARY_REDIRECT)
        .header(header::LOCATION, model_path(model, path))
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(REDIRECT_BODY))
        .map_err(|e| GatewayError::Internal(format!("failed to build redirect: {e}")))
}
