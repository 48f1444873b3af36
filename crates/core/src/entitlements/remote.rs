use super::{EntitlementError, Entitlements, User};
use crate::config::RemoteEntitlementsConfig;
use crate::context::CallerContext;
use serde::Deserialize;
use std::time::Duration;

/// Caller headers passed through to the remote entitlement service.
const FORWARDED_CREDENTIAL_HEADERS: &[&str] = &["authorization", "x-api-key"];

/// Entitlements resolved by an HTTP authorization service.
///
/// The gateway POSTs `{"model": "<model>"}` with the caller's credential
/// headers; a 2xx reply carries the user and the model grants.
pub struct RemoteEntitlements {
    client: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct RemoteGrant {
    user: String,
    #[serde(default)]
    completion_models: Vec<String>,
    #[serde(default)]
    embedding_models: Vec<String>,
}

impl RemoteEntitlements {
    pub fn from_config(config: &RemoteEntitlementsConfig) -> Result<Self, anyhow::Error> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("entitlements.remote.url is not set"))?;
        let timeout = Duration::from_secs(config.timeout.max(1));
        let client = crate::proxy::build_http_client(None, timeout, timeout)?;
        Ok(Self { client, url })
    }

    pub async fn validate_entitlements(
        &self,
        caller: &CallerContext<'_>,
        model: &str,
    ) -> Result<(User, Entitlements), EntitlementError> {
        let mut req = self
            .client
            .post(&self.url)
            .header("x-request-id", caller.request.request_id.as_str())
            .json(&serde_json::json!({ "model": model, "path": caller.path }));

        for name in FORWARDED_CREDENTIAL_HEADERS {
            if let Some(value) = caller.headers.get(*name) {
                req = req.header(*name, value.clone());
            }
        }

        let resp = req
            .send()
            .await
            .map_err(|e| EntitlementError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(EntitlementError::Rejected(status.as_u16()));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| EntitlementError::Unavailable(e.to_string()))?;
        let grant: RemoteGrant = serde_json::from_slice(&body)
            .map_err(|e| EntitlementError::Malformed(e.to_string()))?;

        if grant.user.is_empty() {
            return Err(EntitlementError::Malformed("empty user".into()));
        }

        Ok((
            User { id: grant.user },
            Entitlements::new(grant.completion_models, grant.embedding_models),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use axum::Json;
    use axum::http::{HeaderMap, HeaderValue, StatusCode};
    use axum::routing::post;

    async fn spawn_authz(router: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/check")
    }

    fn remote(url: String) -> RemoteEntitlements {
        RemoteEntitlements::from_config(&RemoteEntitlementsConfig {
            url: Some(url),
            timeout: 2,
        })
        .unwrap()
    }

    async fn validate(
        remote: &RemoteEntitlements,
        headers: &HeaderMap,
    ) -> Result<(User, Entitlements), EntitlementError> {
        let ctx = RequestContext::new(None);
        let caller = CallerContext {
            request: &ctx,
            headers,
            path: "/embeddings",
        };
        remote.validate_entitlements(&caller, "bge-m3").await
    }

    #[tokio::test]
    async fn test_grant_is_parsed() {
        let router = axum::Router::new().route(
            "/check",
            post(|headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                assert_eq!(headers.get("authorization").unwrap(), "Bearer sk-1");
                assert_eq!(body["model"], "bge-m3");
                Json(serde_json::json!({
                    "user": "alice",
                    "embedding_models": ["bge-*"],
                }))
            }),
        );
        let remote = remote(spawn_authz(router).await);

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer sk-1"));
        let (user, ent) = validate(&remote, &headers).await.unwrap();
        assert_eq!(user.id, "alice");
        assert!(ent.grants_embedding("bge-m3"));
        assert!(!ent.grants_completion("bge-m3"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_rejection() {
        let router =
            axum::Router::new().route("/check", post(|| async { StatusCode::UNAUTHORIZED }));
        let remote = remote(spawn_authz(router).await);
        assert!(matches!(
            validate(&remote, &HeaderMap::new()).await,
            Err(EntitlementError::Rejected(401))
        ));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let router = axum::Router::new().route("/check", post(|| async { "not json" }));
        let remote = remote(spawn_authz(router).await);
        assert!(matches!(
            validate(&remote, &HeaderMap::new()).await,
            Err(EntitlementError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let remote = remote(format!("http://{addr}/check"));
        assert!(matches!(
            validate(&remote, &HeaderMap::new()).await,
            Err(EntitlementError::Unavailable(_))
        ));
    }
}
