//! Serve command - run the HTTP server

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use kubedeck_assist::{AssistConfig, DraftClient};
use kubedeck_kube::{ClientProvider, SettleConfig};
use kubedeck_server::{AppState, Application, ServerConfig};

use crate::error::{CliError, Result};

/// Options for the serve command, as parsed from the command line
pub struct ServeOptions {
    pub host: String,
    pub port: u16,
    pub kubeconfig: Option<PathBuf>,
    pub settle_timeout_secs: u64,
    pub settle_interval_ms: u64,
    pub cors_origin: String,
    pub assistant_url: String,
    pub assistant_model: String,
}

impl ServeOptions {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            cors_origin: self.cors_origin.clone(),
            settle: SettleConfig {
                interval: Duration::from_millis(self.settle_interval_ms),
                timeout: Duration::from_secs(self.settle_timeout_secs),
            },
        }
    }

    fn assist_config(&self) -> AssistConfig {
        AssistConfig::from_env()
            .with_base_url(self.assistant_url.clone())
            .with_model(self.assistant_model.clone())
    }
}

/// Run the serve command
pub fn run(options: ServeOptions) -> Result<()> {
    let config = options.server_config();

    let assistant = match DraftClient::new(options.assist_config()) {
        Ok(client) => Some(client),
        Err(e) => {
            tracing::warn!("{}. Manifest drafting is disabled.", e);
            None
        }
    };

    // The cluster client is resolved lazily so the server starts without a kubeconfig
    let provider = Arc::new(ClientProvider::new(options.kubeconfig));

    actix_web::rt::System::new().block_on(async move {
        let state = AppState::for_cluster(provider, config.settle, assistant);
        let app = Application::build(&config, state)?;
        tracing::info!(
            address = %config.host,
            port = app.port(),
            settle_timeout = ?config.settle.timeout,
            cors_origin = %config.cors_origin,
            "kubedeck listening"
        );
        app.run_until_stopped().await?;
        Ok::<(), CliError>(())
    })
}
