use std::{env, net::SocketAddr};

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub bind_port: u16,
    pub backend_url: String,
    pub backend_access_token: Option<String>,
    pub require_call_credentials: bool,
    pub fallback_access_token: Option<String>,
    pub fallback_deployment_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("MCP_REQUIRE_CALL_CREDENTIALS must be one of: true, false, 1, 0")]
    InvalidRequireFlag,
    #[error("invalid bind address or port")]
    InvalidSocket,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an injected variable lookup so tests
    /// never have to mutate the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let nonempty = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bind_addr = nonempty("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string());
        let bind_port = nonempty("BIND_PORT")
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(8080);

        let backend_url =
            nonempty("DEPLOY_BACKEND_URL").unwrap_or_else(|| "http://127.0.0.1:5009".to_string());
        let backend_access_token = nonempty("DEPLOY_BACKEND_TOKEN");

        let require_call_credentials = match nonempty("MCP_REQUIRE_CALL_CREDENTIALS")
            .map(|value| value.to_ascii_lowercase())
            .as_deref()
        {
            None | Some("false") | Some("0") => false,
            Some("true") | Some("1") => true,
            Some(_) => return Err(ConfigError::InvalidRequireFlag),
        };

        let config = Self {
            bind_addr,
            bind_port,
            backend_url,
            backend_access_token,
            require_call_credentials,
            fallback_access_token: nonempty("MCP_FALLBACK_ACCESS_TOKEN"),
            fallback_deployment_id: nonempty("MCP_FALLBACK_DEPLOYMENT_ID"),
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}
