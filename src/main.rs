use std::sync::Arc;

use deploy_mcp_gateway::{
    backend::HttpDeploymentClient,
    build_app,
    config::Config,
    domain::tools::{build_registry, CredentialFallback},
    logging, AppState,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    let bind_socket = config.bind_socket()?;

    let backend = Arc::new(HttpDeploymentClient::new(
        config.backend_url.clone(),
        config.backend_access_token.clone(),
    )?);
    let registry = build_registry(
        CredentialFallback {
            access_token: config.fallback_access_token.clone(),
            deployment_id: config.fallback_deployment_id.clone(),
        },
        backend,
    )?;

    let state = AppState::new(registry, config.require_call_credentials);
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        require_call_credentials = config.require_call_credentials,
        "server starting"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
