//! Inbound body validation: method gate, bounded body read, JSON parsing and
//! model extraction.

use crate::error::GatewayError;
use axum::body::Body;
use axum::http::{HeaderMap, Method, header};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use serde_json::{Map, Value};

/// A validated model request: the requested model plus the full JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub model: String,
    pub body: Map<String, Value>,
}

impl ModelRequest {
    /// Serialize the (possibly normalized) body for the outbound call.
    pub fn to_json_bytes(&self) -> Result<Bytes, GatewayError> {
        serde_json::to_vec(&self.body)
            .map(Bytes::from)
            .map_err(|e| GatewayError::Internal(format!("failed to serialize body: {e}")))
    }
}

/// Only POST reaches the rest of the pipeline.
pub fn ensure_post(method: &Method) -> Result<(), GatewayError> {
    if *method == Method::POST {
        Ok(())
    } else {
        Err(GatewayError::MethodNotAllowed)
    }
}

/// Number of body bytes the client declared. Missing, unparsable and
/// non-positive values all mean "read nothing".
pub fn declared_content_length(headers: &HeaderMap) -> usize {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0)
}

/// Reject bodies whose declared length is over the configured limit. Runs
/// after the method gate, so non-POST requests are never answered 413.
pub fn ensure_within_limit(declared: usize, limit: usize) -> Result<(), GatewayError> {
    if declared > limit {
        Err(GatewayError::PayloadTooLarge(limit))
    } else {
        Ok(())
    }
}

/// Read at most `limit` bytes from the body. Stops pulling frames as soon as
/// the limit is reached and discards anything beyond it.
pub async fn read_body_prefix(body: Body, limit: usize) -> Result<Bytes, GatewayError> {
    if limit == 0 {
        return Ok(Bytes::new());
    }

    let mut stream = body.into_data_stream();
    let mut buf = BytesMut::with_capacity(limit.min(64 * 1024));

    while buf.len() < limit {
        match stream.next().await {
            Some(Ok(chunk)) => buf.extend_from_slice(&chunk),
            Some(Err(e)) => {
                return Err(GatewayError::Internal(format!(
                    "failed to read request body: {e}"
                )));
            }
            None => break,
        }
    }

    buf.truncate(limit);
    Ok(buf.freeze())
}

/// Parse and validate a raw body. An empty body is an empty object.
pub fn parse_model_request(raw: &[u8]) -> Result<ModelRequest, GatewayError> {
    let value: Value = if raw.is_empty() {
        Value::Object(Map::new())
    } else {
        serde_json::from_slice(raw).map_err(|_| GatewayError::InvalidJson)?
    };

    let Value::Object(body) = value else {
        return Err(GatewayError::BodyNotObject);
    };

    let model = body
        .get("model")
        .and_then(|m| m.as_str())
        .filter(|m| !m.is_empty())
        .ok_or(GatewayError::ModelMissing)?
        .to_string();

    Ok(ModelRequest { model, body })
}
