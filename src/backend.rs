//! Outbound client for the deployment-management backend
//!
//! The gateway never talks to the backend directly; tools go through the
//! `DeploymentApi` seam so tests can substitute a stub. All transport
//! failures are converted to `ToolError` here and never escape uncaught.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::ToolError;

const ACCESS_TOKEN_HEADER: &str = "Access-Token";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentRequest {
    pub registry_user: String,
    pub registry_access_token: String,
    pub image_name: String,
    pub workspace_name: String,
    pub app_name: String,
}

#[async_trait]
pub trait DeploymentApi: Send + Sync {
    async fn create_deployment(&self, request: &DeploymentRequest) -> Result<Value, ToolError>;
}

pub struct HttpDeploymentClient {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl HttpDeploymentClient {
    pub fn new(base_url: String, access_token: Option<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
        })
    }
}

#[async_trait]
impl DeploymentApi for HttpDeploymentClient {
    async fn create_deployment(&self, request: &DeploymentRequest) -> Result<Value, ToolError> {
        let url = format!("{}/k8s-deployment", self.base_url);

        let mut outbound = self.http.post(&url).json(request);
        if let Some(token) = self.access_token.as_deref() {
            outbound = outbound.header(ACCESS_TOKEN_HEADER, token);
        }

        let response = outbound.send().await.map_err(|err| {
            if err.is_timeout() {
                ToolError::execution(format!("timeout while calling deployment backend: {err}"))
            } else if err.is_connect() {
                ToolError::execution(format!("failed to connect to deployment backend: {err}"))
            } else {
                ToolError::execution(format!("deployment backend request failed: {err}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::execution(format!(
                "deployment backend returned {status}: {body}"
            )));
        }

        response.json::<Value>().await.map_err(|err| {
            ToolError::execution(format!("deployment backend sent invalid JSON: {err}"))
        })
    }
}
