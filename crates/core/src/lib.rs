//! Request pipeline building blocks for the model gateway: body validation,
//! entitlement collaborator, embeddings normalization, backend addressing
//! and header filtering, plus configuration and process lifecycle.

pub mod backend_url;
pub mod config;
pub mod context;
pub mod entitlements;
pub mod error;
pub mod glob;
pub mod headers;
pub mod lifecycle;
pub mod metrics;
pub mod normalize;
pub mod proxy;
pub mod request;
