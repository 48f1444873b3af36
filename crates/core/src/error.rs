use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Every way a model request can fail. Each variant maps to exactly one
/// HTTP status and renders as `{"error": "<message>"}`.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Only POST method is supported")]
    MethodNotAllowed,

    #[error("Invalid JSON in request body")]
    InvalidJson,

    #[error("Request body must be a JSON object")]
    BodyNotObject,

    #[error("Missing 'model' field in request body")]
    ModelMissing,

    #[error("Request body exceeds the {0}-byte limit")]
    PayloadTooLarge(usize),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Model '{0}' is not allowed for this caller")]
    Forbidden(String),

    #[error("Missing 'text' or 'input' field for embeddings request")]
    MissingEmbeddingField,

    #[error("Backend request failed: {0}")]
    BadGateway(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InvalidJson
            | Self::BodyNotObject
            | Self::ModelMissing
            | Self::MissingEmbeddingField => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable snake_case name of the error kind, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed => "method_not_allowed",
            Self::InvalidJson => "invalid_json",
            Self::BodyNotObject => "body_not_object",
            Self::ModelMissing => "model_missing",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::MissingEmbeddingField => "missing_embedding_field",
            Self::BadGateway(_) => "bad_gateway",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({ "error": self.to_string() });

        (
            status,
            [("content-type", "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            Self::Internal(format!("failed to build backend request: {e}"))
        } else if e.is_timeout() {
            Self::BadGateway(format!("request timed out: {e}"))
        } else if e.is_connect() {
            Self::BadGateway(format!("connection failed: {e}"))
        } else {
            Self::BadGateway(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(GatewayError::MethodNotAllowed.status_code(), 405);
        assert_eq!(GatewayError::InvalidJson.status_code(), 400);
        assert_eq!(GatewayError::BodyNotObject.status_code(), 400);
        assert_eq!(GatewayError::ModelMissing.status_code(), 400);
        assert_eq!(GatewayError::PayloadTooLarge(1024).status_code(), 413);
        assert_eq!(GatewayError::Unauthorized("x".into()).status_code(), 401);
        assert_eq!(GatewayError::Forbidden("m".into()).status_code(), 403);
        assert_eq!(GatewayError::MissingEmbeddingField.status_code(), 400);
        assert_eq!(GatewayError::BadGateway("x".into()).status_code(), 502);
        assert_eq!(GatewayError::Internal("x".into()).status_code(), 500);
    }

    #[tokio::test]
    async fn test_method_not_allowed_body() {
        let resp = GatewayError::MethodNotAllowed.into_response();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "application/json"
        );
        assert_eq!(
            body_json(resp).await,
            json!({"error": "Only POST method is supported"})
        );
    }

    #[tokio::test]
    async fn test_unauthorized_carries_reason() {
        let resp = GatewayError::Unauthorized("token expired".into()).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(resp).await,
            json!({"error": "Unauthorized: token expired"})
        );
    }
}
