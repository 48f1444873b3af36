//! Header filtering for both legs of a forwarded call.
//!
//! Outbound (client → backend) drops hop-by-hop headers, `Host`, and the
//! content framing headers, then forces `Content-Type: application/json`
//! because the body is always re-serialized. Inbound (backend → client)
//! drops `Connection`, `Transfer-Encoding` and `Content-Length`, and sets a
//! fresh `Content-Length` from the buffered body.

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};

/// Headers meaningful only for a single transport leg.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Framing headers owned by the hosting layer rather than the client. The
/// outbound body is re-serialized, so the transport client recomputes them.
const FRAMING_HEADERS: &[HeaderName] = &[header::CONTENT_LENGTH, header::CONTENT_TYPE];

/// Backend response headers that must not reach the client as-is.
const RESPONSE_DENY_HEADERS: &[HeaderName] = &[
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::CONTENT_LENGTH,
];

/// Case-insensitive check against the hop-by-hop deny set.
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}

/// Build the header set for the backend request from the client's headers.
pub fn filter_outbound(incoming: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(incoming.len() + 1);

    for (name, value) in incoming {
        if is_hop_by_hop(name.as_str())
            || name == header::HOST
            || FRAMING_HEADERS.contains(name)
        {
            continue;
        }
        out.append(name.clone(), value.clone());
    }

    out.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    out
}

/// Build the header set relayed to the client from a backend response whose
/// body is `body_len` bytes long.
pub fn filter_inbound(backend: &HeaderMap, body_len: usize) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(backend.len() + 1);

    for (name, value) in backend {
        if RESPONSE_DENY_HEADERS.contains(name) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }

    out.insert(header::CONTENT_LENGTH, HeaderValue::from(body_len));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (k, v) in pairs {
            headers.append(*k, HeaderValue::from_static(v));
        }
        headers
    }

    #[test]
    fn test_hop_by_hop_case_insensitive() {
        assert!(is_hop_by_hop("Connection"));
        assert!(is_hop_by_hop("KEEP-ALIVE"));
        assert!(is_hop_by_hop("te"));
        assert!(is_hop_by_hop("Trailers"));
        assert!(!is_hop_by_hop("authorization"));
        assert!(!is_hop_by_hop("host"));
    }

    #[test]
    fn test_outbound_drops_hop_by_hop_and_host() {
        let incoming = map(&[
            ("host", "gateway.example"),
            ("connection", "keep-alive"),
            ("keep-alive", "timeout=5"),
            ("proxy-authorization", "Basic abc"),
            ("upgrade", "h2c"),
            ("te", "trailers"),
            ("authorization", "Bearer sk-1"),
            ("x-request-tag", "abc"),
        ]);
        let out = filter_outbound(&incoming);

        assert!(out.get("host").is_none());
        assert!(out.get("connection").is_none());
        assert!(out.get("keep-alive").is_none());
        assert!(out.get("proxy-authorization").is_none());
        assert!(out.get("upgrade").is_none());
        assert!(out.get("te").is_none());
        assert_eq!(out.get("authorization").unwrap(), "Bearer sk-1");
        assert_eq!(out.get("x-request-tag").unwrap(), "abc");
    }

    #[test]
    fn test_outbound_forces_json_content_type() {
        let incoming = map(&[("content-type", "text/plain"), ("content-length", "12")]);
        let out = filter_outbound(&incoming);

        assert_eq!(out.get_all("content-type").iter().count(), 1);
        assert_eq!(out.get("content-type").unwrap(), "application/json");
        assert!(out.get("content-length").is_none());
    }

    #[test]
    fn test_outbound_keeps_repeated_values() {
        let incoming = map(&[("x-tag", "a"), ("x-tag", "b")]);
        let out = filter_outbound(&incoming);
        let values: Vec<_> = out.get_all("x-tag").iter().collect();
        assert_eq!(values, vec!["a", "b"]);
    }

    #[test]
    fn test_inbound_recomputes_content_length() {
        let backend = map(&[
            ("content-type", "application/json"),
            ("content-length", "999"),
            ("transfer-encoding", "chunked"),
            ("connection", "close"),
            ("x-backend", "vllm"),
        ]);
        let out = filter_inbound(&backend, 42);

        assert_eq!(out.get("content-length").unwrap(), "42");
        assert!(out.get("transfer-encoding").is_none());
        assert!(out.get("connection").is_none());
        assert_eq!(out.get("content-type").unwrap(), "application/json");
        assert_eq!(out.get("x-backend").unwrap(), "vllm");
    }

    #[test]
    fn test_inbound_relays_other_hop_by_hop_headers() {
        // Only the three framing headers are dropped on the response leg.
        let backend = map(&[("keep-alive", "timeout=5")]);
        let out = filter_inbound(&backend, 0);
        assert_eq!(out.get("keep-alive").unwrap(), "timeout=5");
        assert_eq!(out.get("content-length").unwrap(), "0");
    }
}
