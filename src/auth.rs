//! Credential gate for `tools/call`
//!
//! One policy per deployment profile, chosen by configuration: when enabled,
//! every `tools/call` on either transport must carry a bearer token and a
//! deployment id, and fails with a transport-level 401 before any tool runs.

use crate::errors::AppError;
use crate::registry::RequestContext;

pub fn require_call_credentials(context: &RequestContext) -> Result<(), AppError> {
    if context.bearer_token().is_none() {
        return Err(AppError::unauthorized(
            "missing_token",
            "missing or malformed Authorization header",
        ));
    }

    if context.deployment_id().is_none() {
        return Err(AppError::unauthorized(
            "missing_deployment_id",
            "missing X-Deployment-Id header",
        ));
    }

    Ok(())
}
