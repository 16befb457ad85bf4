//! JSON-RPC method dispatch
//!
//! Routes a decoded request to one of the protocol operations
//! (`initialize`, `tools/list`, `tools/call`) against an injected tool
//! registry, and normalizes every outcome into a response envelope.

use serde_json::{json, Value};
use tracing::info;

use crate::mcp::rpc::{ErrorCode, RpcRequest, RpcResponse};
use crate::registry::{RequestContext, ToolRegistry};

pub const SUPPORTED_PROTOCOL_VERSION: &str = "2024-11-05";

/// Handles one decoded request. Stateless across calls; the registry is the
/// only shared input and is read-only.
pub async fn dispatch(
    registry: &ToolRegistry,
    context: &RequestContext,
    request: RpcRequest,
) -> RpcResponse {
    let audit_params = redact_audit_value(&request.params);
    let method = request.method.clone();

    let response = match method.as_str() {
        "initialize" => RpcResponse::success(
            request.response_id(),
            json!({
                "protocolVersion": SUPPORTED_PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {
                        "listChanged": false
                    }
                },
                "serverInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        ),
        "tools/list" => RpcResponse::success(
            request.response_id(),
            json!({ "tools": registry.list() }),
        ),
        "tools/call" => handle_tools_call(registry, context, request).await,
        _ => RpcResponse::failure(
            request.response_id(),
            ErrorCode::MethodNotFound,
            format!("Method not found: {method}"),
        ),
    };

    info!(
        method = %method,
        params = %audit_params,
        outcome = if response.is_error() { "failure" } else { "success" },
        "rpc action audited"
    );

    response
}

async fn handle_tools_call(
    registry: &ToolRegistry,
    context: &RequestContext,
    request: RpcRequest,
) -> RpcResponse {
    let id = request.response_id();

    let Some(name) = request.param("name").and_then(Value::as_str) else {
        return RpcResponse::failure(
            id,
            ErrorCode::InvalidParams,
            "Invalid params: tool name is required",
        );
    };

    let Some(tool) = registry.resolve(name) else {
        return RpcResponse::failure_with_data(
            id,
            ErrorCode::MethodNotFound,
            "Method not found",
            Some(json!({
                "code": "tool_not_found",
                "message": "unknown tool name",
                "details": {
                    "name": name,
                },
            })),
        );
    };

    let arguments = request
        .param("arguments")
        .cloned()
        .unwrap_or_else(|| json!({}));

    match tool.invoke(context, arguments).await {
        Ok(outcome) => {
            let content: Vec<Value> = outcome
                .into_texts()
                .into_iter()
                .map(|text| json!({ "type": "text", "text": text }))
                .collect();

            RpcResponse::success(id, json!({ "content": content }))
        }
        // Policy: failed tool calls surface as -32603 with the tool's
        // message verbatim, never as a success envelope describing an error.
        Err(err) => RpcResponse::failure(id, ErrorCode::InternalError, err.to_string()),
    }
}

pub fn redact_audit_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| {
                    if is_sensitive_key(key) {
                        (key.clone(), Value::String("[REDACTED]".to_string()))
                    } else {
                        (key.clone(), redact_audit_value(item))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_audit_value).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_ascii_lowercase();
    normalized.contains("token")
        || normalized.contains("secret")
        || normalized.contains("password")
        || normalized.contains("credential")
        || normalized == "authorization"
        || normalized == "api_key"
        || normalized == "apikey"
}
