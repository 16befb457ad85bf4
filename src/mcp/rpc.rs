//! JSON-RPC 2.0 envelope codec
//!
//! Decodes raw request bytes into `RpcRequest` and encodes `RpcResponse`
//! values back to bytes, with the stable numeric error taxonomy shared by
//! both transports.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC failure categories with their protocol-constant codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
}

impl ErrorCode {
    pub fn code(self) -> i64 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
        }
    }
}

/// A decoded, well-formed request. `id` is kept exactly as received; the
/// codec never coerces or validates its type.
#[derive(Debug, Clone)]
pub struct RpcRequest {
    pub id: Option<Value>,
    pub method: String,
    pub params: Value,
}

impl RpcRequest {
    /// `params.<key>` if params is an object carrying it.
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.as_object().and_then(|object| object.get(key))
    }

    /// The `id` to echo in the response; absent ids default to `0`.
    pub fn response_id(&self) -> Value {
        self.id.clone().unwrap_or(Value::from(0))
    }
}

/// A decode failure, already shaped for the response envelope.
#[derive(Debug, Clone)]
pub struct RpcFailure {
    pub code: ErrorCode,
    pub message: String,
    pub id: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Response envelope. Exactly one of `result`/`error` is set; the
/// constructors below are the only way this crate builds one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::failure_with_data(id, code, message, None)
    }

    pub fn failure_with_data(
        id: Value,
        code: ErrorCode,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(RpcErrorObject {
                code: code.code(),
                message: message.into(),
                data,
            }),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl From<RpcFailure> for RpcResponse {
    fn from(failure: RpcFailure) -> Self {
        Self::failure(failure.id, failure.code, failure.message)
    }
}

/// Parses raw request bytes into a well-formed `RpcRequest`.
///
/// Bytes that are empty or not valid JSON fail with `ParseError`; a payload
/// that is not an object, does not carry `jsonrpc == "2.0"`, or has no
/// usable `method` fails with `InvalidRequest`. Whatever `id` can be
/// salvaged from the payload is carried into the failure so the caller can
/// echo it.
pub fn decode(raw: &[u8]) -> Result<RpcRequest, RpcFailure> {
    if raw.is_empty() {
        return Err(RpcFailure {
            code: ErrorCode::ParseError,
            message: "Parse error: empty request body".to_string(),
            id: Value::Null,
        });
    }

    let payload: Value = serde_json::from_slice(raw).map_err(|err| RpcFailure {
        code: ErrorCode::ParseError,
        message: format!("Parse error: {err}"),
        id: Value::Null,
    })?;

    let Some(object) = payload.as_object() else {
        return Err(RpcFailure {
            code: ErrorCode::InvalidRequest,
            message: "Invalid Request: payload must be an object".to_string(),
            id: Value::from(0),
        });
    };

    let id = object.get("id").cloned();
    let salvaged_id = id.clone().unwrap_or(Value::from(0));

    if object.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(RpcFailure {
            code: ErrorCode::InvalidRequest,
            message: "Invalid Request: jsonrpc must be \"2.0\"".to_string(),
            id: salvaged_id,
        });
    }

    let method = object
        .get("method")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|method| !method.is_empty());
    let Some(method) = method else {
        return Err(RpcFailure {
            code: ErrorCode::InvalidRequest,
            message: "Invalid Request: method is required".to_string(),
            id: salvaged_id,
        });
    };

    let params = match object.get("params") {
        Some(params) => params.clone(),
        None => Value::Object(Map::new()),
    };

    Ok(RpcRequest {
        id,
        method: method.to_string(),
        params,
    })
}

/// Serializes a response envelope. Deterministic for a given value.
pub fn encode(response: &RpcResponse) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(response)
}
