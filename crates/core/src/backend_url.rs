//! Internal backend addressing.
//!
//! The outer reverse proxy routes `/model/<name>/v1/...` to the physical
//! backend serving `<name>`. Both the forwarded URL and the redirect target
//! follow that layout, so the two must change together with the proxy's
//! configuration.

use axum::http::{HeaderMap, Uri, header};

/// Inputs needed to address the backend, resolved from one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    pub scheme: String,
    pub host: String,
}

impl BackendTarget {
    /// Resolve scheme and host from the request. The scheme comes from an
    /// absolute-form request URI, then `X-Forwarded-Proto`, then `http`.
    /// The host comes from the `Host` header, then `server_name:server_port`,
    /// then `server_name`.
    pub fn resolve(
        uri: &Uri,
        headers: &HeaderMap,
        server_name: &str,
        server_port: Option<u16>,
    ) -> Self {
        let scheme = uri
            .scheme_str()
            .map(str::to_ascii_lowercase)
            .or_else(|| {
                headers
                    .get("x-forwarded-proto")
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.trim().to_ascii_lowercase())
                    .filter(|v| v == "http" || v == "https")
            })
            .unwrap_or_else(|| "http".to_string());

        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| match server_port {
                Some(port) => format!("{server_name}:{port}"),
                None => server_name.to_string(),
            });

        Self { scheme, host }
    }

    /// `{scheme}://{host}/model/{model}/v1{path}`
    pub fn url_for(&self, model: &str, path: &str) -> String {
        format!("{}://{}{}", self.scheme, self.host, model_path(model, path))
    }
}

/// Proxy-relative location of a model endpoint: `/model/{model}/v1{path}`.
pub fn model_path(model: &str, path: &str) -> String {
    format!("/model/{model}/v1{path}")
}
