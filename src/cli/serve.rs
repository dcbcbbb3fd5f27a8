//! `serve` command: run the HTTP API and embedded frontend.

use std::net::SocketAddr;

use clap::Args;
use tracing::info;

use crate::cli::common::{CliError, CliResult};
use crate::config::Config;
use crate::web;

/// Run the parcel search server
#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Host to bind to (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Only allow this frontend origin for CORS (overrides config)
    #[arg(long, value_name = "ORIGIN")]
    pub frontend_origin: Option<String>,
}

impl ServeArgs {
    /// Applies command-line overrides to the loaded configuration.
    #[must_use]
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(host) = &self.host {
            config.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(origin) = &self.frontend_origin {
            config.server.frontend_origin = Some(origin.clone());
        }
        config
    }

    /// Execute the serve command
    pub async fn execute(&self, config: Config) -> CliResult<()> {
        let config = self.apply(config);

        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| CliError::validation(format!("Invalid listen address: {e}")))?;

        match config.server.frontend_origin.as_deref() {
            Some(origin) => info!(origin, "CORS restricted to frontend origin"),
            None => info!("CORS allows any origin"),
        }

        web::run_server(config, addr)
            .await
            .map_err(|e| CliError::io(format!("Server error: {e:#}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply() {
        let args = ServeArgs {
            host: Some("0.0.0.0".to_string()),
            port: Some(9000),
            frontend_origin: None,
        };
        let config = args.apply(Config::new());
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert!(config.server.frontend_origin.is_none());
    }
}
