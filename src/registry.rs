//! Tool model and registry
//!
//! Holds the fixed set of invocable tools and the types crossing the tool
//! boundary: `ToolOutcome` on success, `ToolError` on failure, and the
//! per-request `RequestContext` threaded into every invocation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// What a tool invocation produces when it succeeds. Flattened into
/// `{type:"text", text}` content blocks by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Text(String),
    TextList(Vec<String>),
}

impl ToolOutcome {
    pub fn into_texts(self) -> Vec<String> {
        match self {
            Self::Text(text) => vec![text],
            Self::TextList(texts) => texts,
        }
    }
}

/// Typed failure crossing the tool boundary. Collaborator failures (network,
/// bad arguments, backend errors) must be converted into this before they
/// reach the dispatcher; nothing propagates uncaught.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    Execution(String),
}

impl ToolError {
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }
}

/// Request-scoped data available to a tool: the inbound HTTP headers,
/// lowercased. Credentials are read from here, never from ambient state.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    headers: HashMap<String, String>,
}

impl RequestContext {
    pub fn new(headers: HashMap<String, String>) -> Self {
        Self { headers }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// The token from an `Authorization: Bearer <token>` header, if present
    /// and non-empty.
    pub fn bearer_token(&self) -> Option<&str> {
        self.header("authorization")
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    pub fn deployment_id(&self) -> Option<&str> {
        self.header("x-deployment-id")
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn input_schema(&self) -> Value {
        empty_object_schema()
    }

    async fn invoke(
        &self,
        context: &RequestContext,
        arguments: Value,
    ) -> Result<ToolOutcome, ToolError>;
}

/// Wire form of a tool entry, as emitted by `tools/list` and the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate tool name: {0}")]
    DuplicateName(String),
}

/// Registry of invocable tools. Built once at startup and read-only after,
/// so concurrent lookups need no synchronization.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        if self.tools.iter().any(|entry| entry.name() == tool.name()) {
            return Err(RegistryError::DuplicateName(tool.name().to_string()));
        }

        self.tools.push(tool);
        Ok(())
    }

    /// Wire schemas in registration order.
    pub fn list(&self) -> Vec<ToolSchema> {
        self.tools
            .iter()
            .map(|tool| ToolSchema {
                name: tool.name().to_string(),
                description: normalize_description(tool.description()),
                input_schema: tool.input_schema(),
            })
            .collect()
    }

    /// Exact, case-sensitive lookup.
    pub fn resolve(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|tool| tool.name() == name)
    }
}

pub fn empty_object_schema() -> Value {
    json!({
        "type": "object",
        "properties": {},
        "required": []
    })
}

/// Collapses runs of whitespace (including newlines from indented doc text)
/// into single spaces for display.
pub fn normalize_description(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
