//! Axum handlers for both transports
//!
//! `POST /mcp` returns the envelope as the response body; `POST /sse`
//! returns the same envelope framed as a single server-sent event. Both
//! share one decode/gate/dispatch pipeline, so the transports can never
//! disagree on protocol behavior.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth;
use crate::errors::AppError;
use crate::mcp::rpc::{self, RpcResponse};
use crate::mcp::server;
use crate::registry::{RequestContext, ToolSchema};
use crate::AppState;

pub const MANIFEST_VERSION: &str = "2025-08-05";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub status: &'static str,
    pub name: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct EndpointProbeResponse {
    pub endpoint: &'static str,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ManifestResponse {
    pub version: &'static str,
    pub name: &'static str,
    pub transport: &'static str,
    pub endpoint: &'static str,
    pub tools: Vec<ToolSchema>,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        status: "ok",
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn manifest(State(state): State<AppState>) -> Json<ManifestResponse> {
    Json(ManifestResponse {
        version: MANIFEST_VERSION,
        name: env!("CARGO_PKG_NAME"),
        transport: "streamable-http",
        endpoint: "/mcp",
        tools: state.registry.list(),
    })
}

pub async fn mcp_probe() -> Json<EndpointProbeResponse> {
    Json(EndpointProbeResponse {
        endpoint: "/mcp",
        status: "available",
    })
}

pub async fn sse_probe() -> Json<EndpointProbeResponse> {
    Json(EndpointProbeResponse {
        endpoint: "/sse",
        status: "available",
    })
}

pub async fn mcp_preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn mcp_endpoint(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let envelope = handle_payload(&state, &headers, &body).await?;
    Ok((StatusCode::OK, Json(envelope)).into_response())
}

pub async fn sse_endpoint(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let envelope = handle_payload(&state, &headers, &body).await?;
    sse_frame(&envelope)
}

/// The shared pipeline: decode, gate `tools/call` when the profile demands
/// credentials, dispatch. Decode failures become well-formed error
/// envelopes, never transport errors; only the credential gate escapes as
/// an `AppError` (HTTP 401).
async fn handle_payload(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<RpcResponse, AppError> {
    let context = request_context(headers);

    let request = match rpc::decode(body) {
        Ok(request) => request,
        Err(failure) => return Ok(RpcResponse::from(failure)),
    };

    if state.require_call_credentials && request.method == "tools/call" {
        auth::require_call_credentials(&context)?;
    }

    Ok(server::dispatch(&state.registry, &context, request).await)
}

/// Wraps one envelope as a single `data: <json>\n\n` event and ends the
/// stream. This transport never emits a second event per request.
fn sse_frame(envelope: &RpcResponse) -> Result<Response, AppError> {
    let json = serde_json::to_string(envelope)
        .map_err(|err| AppError::internal(format!("response serialization failed: {err}")))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from(format!("data: {json}\n\n")))
        .map_err(|err| AppError::internal(format!("response framing failed: {err}")))
}

fn request_context(headers: &HeaderMap) -> RequestContext {
    RequestContext::new(
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn request_context_keeps_string_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Bearer tok"));
        headers.insert("X-Deployment-Id", HeaderValue::from_static("dep-1"));

        let context = request_context(&headers);
        assert_eq!(context.bearer_token(), Some("tok"));
        assert_eq!(context.deployment_id(), Some("dep-1"));
    }

    #[test]
    fn sse_frame_wraps_exactly_one_event() {
        let envelope = RpcResponse::success(serde_json::json!(1), serde_json::json!({}));
        let response = sse_frame(&envelope).expect("frame");

        assert_eq!(
            response.headers().get(header::CONTENT_TYPE),
            Some(&HeaderValue::from_static("text/event-stream"))
        );
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL),
            Some(&HeaderValue::from_static("no-cache"))
        );
    }
}
