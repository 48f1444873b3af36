use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::{HeaderMap, Method};
use axum::response::Response;
use bytes::Bytes;
use model_gateway_core::config::Config;
use model_gateway_core::error::GatewayError;
use model_gateway_core::headers::filter_inbound;
use std::sync::Arc;
use std::time::Duration;

/// A fully prepared backend call. Built per request and consumed by
/// [`Forwarder::forward`].
#[derive(Debug)]
pub struct OutboundRequest {
    pub url: String,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Executes backend calls over a pooled client whose timeouts follow the
/// current configuration.
pub struct Forwarder {
    client: ArcSwap<reqwest::Client>,
}

impl Forwarder {
    pub fn from_config(config: &Config) -> Result<Self, anyhow::Error> {
        Ok(Self {
            client: ArcSwap::from_pointee(build_client(config)?),
        })
    }

    /// Rebuild the client after a configuration change. In-flight calls keep
    /// the client they started with.
    pub fn update_from_config(&self, config: &Config) -> Result<(), anyhow::Error> {
        self.client.store(Arc::new(build_client(config)?));
        Ok(())
    }

    /// Send the request and relay the backend's answer, whatever its status.
    /// Only transport failures become errors (`BadGateway`); the backend body
    /// is buffered and relayed byte for byte.
    pub async fn forward(&self, req: OutboundRequest) -> Result<Response, GatewayError> {
        let client = self.client.load_full();

        let resp = client
            .request(req.method, &req.url)
            .headers(req.headers)
            .body(req.body)
            .send()
            .await
            .map_err(|e| log_transport_error(&req.url, e))?;

        let status = resp.status();
        let backend_headers = resp.headers().clone();
        let body = resp
            .bytes()
            .await
            .map_err(|e| log_transport_error(&req.url, e))?;

        tracing::debug!(
            url = %req.url,
            status = status.as_u16(),
            bytes = body.len(),
            "Backend responded"
        );

        let headers = filter_inbound(&backend_headers, body.len());
        let mut response = Response::new(Body::from(body));
        // Only the code survives: reqwest drops the backend's reason text, so
        // the client sees the canonical phrase for this status.
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

fn build_client(config: &Config) -> Result<reqwest::Client, anyhow::Error> {
    model_gateway_core::proxy::build_http_client(
        config.proxy_url.as_deref(),
        Duration::from_secs(config.backend.connect_timeout),
        Duration::from_secs(config.backend.request_timeout),
    )
}

fn log_transport_error(url: &str, e: reqwest::Error) -> GatewayError {
    let err = GatewayError::from(e);
    tracing::error!(url = %url, error = %err, "Backend call failed");
    err
}
