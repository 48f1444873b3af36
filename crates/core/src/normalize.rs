use crate::error::GatewayError;
use crate::request::ModelRequest;

/// Inbound path that receives the embeddings normalization and is forwarded
/// rather than redirected.
pub const EMBEDDINGS_PATH: &str = "/embeddings";

/// Keys accepted as the embeddings input, in precedence order.
const EMBEDDING_INPUT_KEYS: [&str; 2] = ["text", "input"];

pub fn is_embeddings_path(path: &str) -> bool {
    path == EMBEDDINGS_PATH
}

/// Unify `text`/`input` into a single `text` field. `text` wins when both
/// are present; `input` never survives normalization.
pub fn normalize_embeddings(req: &mut ModelRequest) -> Result<(), GatewayError> {
    let value = EMBEDDING_INPUT_KEYS
        .iter()
        .find_map(|key| req.body.get(*key).cloned())
        .ok_or(GatewayError::MissingEmbeddingField)?;

    req.body.insert("text".to_string(), value);
    req.body.remove("input");
    Ok(())
}
