use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

pub mod auth;
pub mod backend;
pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;
pub mod registry;

use registry::ToolRegistry;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ToolRegistry>,
    pub require_call_credentials: bool,
}

impl AppState {
    pub fn new(registry: ToolRegistry, require_call_credentials: bool) -> Self {
        Self {
            registry: Arc::new(registry),
            require_call_credentials,
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(http::handlers::root))
        .route("/health", get(http::handlers::health))
        .route("/mcp/manifest", get(http::handlers::manifest))
        .route("/manifest", get(http::handlers::manifest))
        .route(
            "/mcp",
            post(http::handlers::mcp_endpoint)
                .get(http::handlers::mcp_probe)
                .options(http::handlers::mcp_preflight),
        )
        .route(
            "/sse",
            post(http::handlers::sse_endpoint).get(http::handlers::sse_probe),
        )
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::{Body, Bytes},
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::backend::{DeploymentApi, DeploymentRequest};
    use crate::domain::tools::{build_registry, CredentialFallback};
    use crate::registry::ToolError;

    use super::*;

    struct MockBackend;

    #[async_trait]
    impl DeploymentApi for MockBackend {
        async fn create_deployment(
            &self,
            request: &DeploymentRequest,
        ) -> Result<Value, ToolError> {
            Ok(json!({
                "status": "deployed",
                "app_name": request.app_name,
            }))
        }
    }

    fn app_with_gate(require_call_credentials: bool) -> Router {
        let registry = build_registry(
            CredentialFallback {
                access_token: Some("fallback-token".to_string()),
                deployment_id: Some("fallback-dep".to_string()),
            },
            Arc::new(MockBackend),
        )
        .expect("registry build");
        build_app(AppState::new(registry, require_call_credentials))
    }

    fn app() -> Router {
        app_with_gate(false)
    }

    async fn send(
        app: Router,
        method: &str,
        uri: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> (StatusCode, Bytes) {
        let mut builder = Request::builder()
            .uri(uri)
            .method(method)
            .header(header::CONTENT_TYPE, "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let response = app
            .oneshot(builder.body(Body::from(body.to_string())).expect("request build"))
            .await
            .expect("request execution");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        (status, bytes)
    }

    async fn post_mcp(body: &str) -> (StatusCode, Value) {
        let (status, bytes) = send(app(), "POST", "/mcp", &[], body).await;
        let value = serde_json::from_slice(&bytes).expect("valid json response");
        (status, value)
    }

    fn unframe_sse(bytes: &Bytes) -> Value {
        let text = std::str::from_utf8(bytes).expect("utf8 body");
        let frame = text
            .strip_prefix("data: ")
            .and_then(|rest| rest.strip_suffix("\n\n"))
            .expect("single sse frame");
        serde_json::from_str(frame).expect("frame is json")
    }

    #[tokio::test]
    async fn health_is_public() {
        let (status, bytes) = send(app(), "GET", "/health", &[], "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bytes, "{\"status\":\"ok\"}");
    }

    #[tokio::test]
    async fn root_reports_liveness() {
        let (status, bytes) = send(app(), "GET", "/", &[], "").await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&bytes).expect("valid json");
        assert_eq!(body["status"], "ok");
        assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
    }

    #[tokio::test]
    async fn manifest_lists_registered_tools() {
        for uri in ["/mcp/manifest", "/manifest"] {
            let (status, bytes) = send(app(), "GET", uri, &[], "").await;
            assert_eq!(status, StatusCode::OK);
            let body: Value = serde_json::from_slice(&bytes).expect("valid json");
            assert_eq!(body["version"], "2025-08-05");
            assert_eq!(body["transport"], "streamable-http");
            assert_eq!(body["endpoint"], "/mcp");
            assert_eq!(body["tools"][0]["name"], "hello_credentials");
            assert_eq!(body["tools"][1]["name"], "k8s_deployment");
        }
    }

    #[tokio::test]
    async fn endpoint_probes_answer_get() {
        let (status, _) = send(app(), "GET", "/mcp", &[], "").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(app(), "GET", "/sse", &[], "").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn mcp_parse_error_for_invalid_json() {
        let (status, body) = post_mcp("{").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"]["code"], -32700);
        assert_eq!(body["jsonrpc"], "2.0");
    }

    #[tokio::test]
    async fn mcp_parse_error_for_empty_body() {
        let (status, body) = post_mcp("").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn sse_parse_error_is_framed_envelope() {
        let (status, bytes) = send(app(), "POST", "/sse", &[], "not json at all").await;
        assert_eq!(status, StatusCode::OK);
        let body = unframe_sse(&bytes);
        assert_eq!(body["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn mcp_rejects_wrong_jsonrpc_version() {
        let (status, body) = post_mcp(r#"{"jsonrpc":"1.0","id":5,"method":"tools/list"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"]["code"], -32600);
        assert_eq!(body["id"], 5);
    }

    #[tokio::test]
    async fn mcp_rejects_missing_method() {
        let (_, body) = post_mcp(r#"{"jsonrpc":"2.0","id":6}"#).await;
        assert_eq!(body["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn mcp_unknown_method_returns_method_not_found() {
        let (status, body) =
            post_mcp(r#"{"jsonrpc":"2.0","id":1,"method":"resources/list"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"]["code"], -32601);
        assert_eq!(body["id"], 1);
    }

    #[tokio::test]
    async fn mcp_initialize_returns_capability_descriptor() {
        let (status, body) = post_mcp(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","clientInfo":{"name":"test-client","version":"1.0.0"},"capabilities":{}}}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["jsonrpc"], "2.0");
        assert_eq!(body["id"], 1);
        assert_eq!(body["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(body["result"]["capabilities"]["tools"]["listChanged"], json!(false));
        assert_eq!(body["result"]["serverInfo"]["name"], env!("CARGO_PKG_NAME"));
        assert_eq!(
            body["result"]["serverInfo"]["version"],
            env!("CARGO_PKG_VERSION")
        );
    }

    #[tokio::test]
    async fn mcp_tools_list_returns_tools_in_registration_order() {
        let (status, body) =
            post_mcp(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list","params":{}}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 2);
        let tools = body["result"]["tools"].as_array().expect("tools array");
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0]["name"], "hello_credentials");
        assert_eq!(tools[1]["name"], "k8s_deployment");
        for tool in tools {
            assert_eq!(tool["inputSchema"]["type"], "object");
        }
    }

    #[tokio::test]
    async fn mcp_tools_call_without_name_is_invalid_params() {
        let (_, body) = post_mcp(
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"arguments":{}}}"#,
        )
        .await;
        assert_eq!(body["error"]["code"], -32602);
        assert_eq!(body["id"], 3);
    }

    #[tokio::test]
    async fn mcp_tools_call_unknown_tool_is_stable_error() {
        let (_, body) = post_mcp(
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"missing_tool"}}"#,
        )
        .await;
        assert_eq!(body["id"], 4);
        assert_eq!(body["error"]["code"], -32601);
        assert_eq!(body["error"]["data"]["code"], "tool_not_found");
    }

    #[tokio::test]
    async fn mcp_tools_call_returns_text_content_blocks() {
        let (status, bytes) = send(
            app(),
            "POST",
            "/mcp",
            &[
                ("authorization", "Bearer caller-token"),
                ("x-deployment-id", "dep-9"),
            ],
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"hello_credentials","arguments":{}}}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&bytes).expect("valid json");
        let content = body["result"]["content"].as_array().expect("content array");
        assert!(!content.is_empty());
        for block in content {
            assert_eq!(block["type"], "text");
            assert!(block["text"].is_string());
        }
        assert!(content[0]["text"]
            .as_str()
            .expect("text")
            .contains("caller-token"));
    }

    #[tokio::test]
    async fn mcp_tools_call_k8s_deployment_forwards_to_backend() {
        let (_, body) = post_mcp(
            r#"{"jsonrpc":"2.0","id":9,"method":"tools/call","params":{"name":"k8s_deployment","arguments":{"registry_user":"u","registry_access_token":"t","image_name":"app:latest","workspace_name":"ws","app_name":"demo"}}}"#,
        )
        .await;

        let text = body["result"]["content"][0]["text"]
            .as_str()
            .expect("text block");
        let reply: Value = serde_json::from_str(text).expect("backend reply json");
        assert_eq!(reply["status"], "deployed");
        assert_eq!(reply["app_name"], "demo");
    }

    #[tokio::test]
    async fn transports_agree_modulo_framing() {
        let request =
            r#"{"jsonrpc":"2.0","id":7,"method":"tools/list","params":{}}"#;

        let (_, buffered_bytes) = send(app(), "POST", "/mcp", &[], request).await;
        let buffered: Value = serde_json::from_slice(&buffered_bytes).expect("valid json");

        let (_, sse_bytes) = send(app(), "POST", "/sse", &[], request).await;
        let streamed = unframe_sse(&sse_bytes);

        assert_eq!(buffered, streamed);
    }

    #[tokio::test]
    async fn sse_response_carries_event_stream_headers() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/sse")
                    .method("POST")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#,
                    ))
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
            Some("text/event-stream")
        );
        assert_eq!(
            response
                .headers()
                .get(header::CACHE_CONTROL)
                .and_then(|value| value.to_str().ok()),
            Some("no-cache")
        );
    }

    #[tokio::test]
    async fn gated_profile_rejects_calls_without_credentials() {
        let (status, _) = send(
            app_with_gate(true),
            "POST",
            "/mcp",
            &[],
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"hello_credentials"}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn gated_profile_applies_to_both_transports() {
        let (status, _) = send(
            app_with_gate(true),
            "POST",
            "/sse",
            &[("authorization", "Bearer tok")],
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"hello_credentials"}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn gated_profile_accepts_complete_credentials() {
        let (status, bytes) = send(
            app_with_gate(true),
            "POST",
            "/mcp",
            &[
                ("authorization", "Bearer tok"),
                ("x-deployment-id", "dep-1"),
            ],
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"hello_credentials"}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&bytes).expect("valid json");
        assert!(body["result"]["content"].is_array());
    }

    #[tokio::test]
    async fn gated_profile_leaves_other_methods_open() {
        let (status, bytes) = send(
            app_with_gate(true),
            "POST",
            "/mcp",
            &[],
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&bytes).expect("valid json");
        assert!(body["result"]["tools"].is_array());
    }

    #[tokio::test]
    async fn notification_without_id_gets_zero_id_response() {
        let (_, body) = post_mcp(r#"{"jsonrpc":"2.0","method":"tools/list"}"#).await;
        assert_eq!(body["id"], 0);
        assert!(body["result"]["tools"].is_array());
    }
}
