use model_gateway_core::context::CallerContext;
use model_gateway_core::entitlements::{EntitlementService, User};
use model_gateway_core::error::GatewayError;

/// Gate a model request on the entitlement collaborator.
///
/// Any validation failure becomes `Unauthorized` with the reason in the
/// message. A validated caller whose entitlements grant the model neither as
/// a completion model nor as an embedding model is `Forbidden`.
pub async fn authorize(
    service: &dyn EntitlementService,
    caller: &CallerContext<'_>,
    model: &str,
) -> Result<User, GatewayError> {
    let (user, entitlements) = service
        .validate_entitlements(caller, model)
        .await
        .map_err(|e| {
            tracing::warn!(
                request_id = %caller.request.request_id,
                model = %model,
                reason = %e,
                "Entitlement validation failed"
            );
            GatewayError::Unauthorized(e.to_string())
        })?;

    let completion = service.is_allowed_completion_model(model, &entitlements);
    let embedding = service.is_allowed_embedding_model(model, &entitlements);

    if completion || embedding {
        Ok(user)
    } else {
        tracing::info!(
            request_id = %caller.request.request_id,
            user = %user.id,
            model = %model,
            "Model not allowed for caller"
        );
        Err(GatewayError::Forbidden(model.to_string()))
    }
}
