//! Concrete tools registered at startup
//!
//! `hello_credentials` echoes the caller's credentials; `k8s_deployment`
//! forwards a deployment request to the backend through the `DeploymentApi`
//! seam. Both convert every failure into a `ToolError` at this boundary.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::backend::{DeploymentApi, DeploymentRequest};
use crate::registry::{
    RegistryError, RequestContext, Tool, ToolError, ToolOutcome, ToolRegistry,
};

/// Fallback credentials used when a caller sends none; sourced from the
/// process configuration at startup, never read ambiently at call time.
#[derive(Debug, Clone, Default)]
pub struct CredentialFallback {
    pub access_token: Option<String>,
    pub deployment_id: Option<String>,
}

pub struct HelloCredentialsTool {
    fallback: CredentialFallback,
}

impl HelloCredentialsTool {
    pub fn new(fallback: CredentialFallback) -> Self {
        Self { fallback }
    }
}

#[async_trait]
impl Tool for HelloCredentialsTool {
    fn name(&self) -> &str {
        "hello_credentials"
    }

    fn description(&self) -> &str {
        "Echo back the supplied credentials."
    }

    async fn invoke(
        &self,
        context: &RequestContext,
        _arguments: Value,
    ) -> Result<ToolOutcome, ToolError> {
        let token = context
            .bearer_token()
            .or(self.fallback.access_token.as_deref())
            .ok_or_else(|| {
                ToolError::execution(
                    "no access token available: send an Authorization header or configure a fallback",
                )
            })?;
        let deployment_id = context
            .deployment_id()
            .or(self.fallback.deployment_id.as_deref())
            .ok_or_else(|| {
                ToolError::execution(
                    "no deployment id available: send an X-Deployment-Id header or configure a fallback",
                )
            })?;

        Ok(ToolOutcome::Text(format!(
            "Hello! Your ACCESS_TOKEN is **{token}** and DEPLOYMENT_ID is **{deployment_id}**."
        )))
    }
}

pub struct K8sDeploymentTool {
    api: Arc<dyn DeploymentApi>,
}

impl K8sDeploymentTool {
    pub fn new(api: Arc<dyn DeploymentApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for K8sDeploymentTool {
    fn name(&self) -> &str {
        "k8s_deployment"
    }

    fn description(&self) -> &str {
        "Deploy a container image to a Kubernetes workspace."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "registry_user": { "type": "string" },
                "registry_access_token": { "type": "string" },
                "image_name": { "type": "string" },
                "workspace_name": { "type": "string" },
                "app_name": { "type": "string" }
            },
            "required": [
                "registry_user",
                "registry_access_token",
                "image_name",
                "workspace_name",
                "app_name"
            ]
        })
    }

    async fn invoke(
        &self,
        _context: &RequestContext,
        arguments: Value,
    ) -> Result<ToolOutcome, ToolError> {
        let request: DeploymentRequest = serde_json::from_value(arguments)
            .map_err(|err| ToolError::execution(format!("invalid deployment arguments: {err}")))?;

        let reply = self.api.create_deployment(&request).await?;
        Ok(ToolOutcome::Text(reply.to_string()))
    }
}

/// Builds the process-wide registry. Registration happens exactly once, at
/// startup; a duplicate name here is a programming error surfaced before the
/// server binds.
pub fn build_registry(
    fallback: CredentialFallback,
    api: Arc<dyn DeploymentApi>,
) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(HelloCredentialsTool::new(fallback)))?;
    registry.register(Arc::new(K8sDeploymentTool::new(api)))?;
    Ok(registry)
}
