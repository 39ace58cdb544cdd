//! mused - Muse AI chat server daemon
//!
//! A chat web service that relays browser conversations to the Gemini API,
//! streaming text and generated images back over SSE.

pub mod api;
pub mod chat;
pub mod gemini;
pub mod images;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use api::AppState;
use chat::ConversationStore;
use gemini::{GeminiClient, ModelClient};
use images::ArtifactStore;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// Directory holding stored images
    pub data_dir: PathBuf,
    /// Gemini API key; unset means chat requests fail with a credential error
    pub api_key: Option<String>,
    /// Model identifier sent to the API
    pub model: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".parse().unwrap(),
            data_dir: PathBuf::from("data"),
            api_key: None,
            model: gemini::DEFAULT_MODEL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration: defaults, then a TOML file, then `MUSED_*` env
    /// vars. `GEMINI_API_KEY` is honored as a fallback for the API key.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let toml_path = config_path.unwrap_or_else(|| Path::new("mused.toml"));
        let mut config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(toml_path))
            .merge(Env::prefixed("MUSED_"))
            .extract()?;
        if config.api_key.is_none() {
            config.api_key = std::env::var("GEMINI_API_KEY").ok();
        }
        Ok(config)
    }
}

/// The mused server instance
pub struct Server {
    config: Config,
    state: AppState,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Server {
    /// Create a server backed by the Gemini API
    pub async fn new(config: Config) -> Result<Self> {
        let model = GeminiClient::new(config.api_key.clone()).with_model(config.model.clone());
        Self::with_model(config, Arc::new(model)).await
    }

    /// Create a server with an injected model client
    pub async fn with_model(config: Config, model: Arc<dyn ModelClient>) -> Result<Self> {
        let artifacts = ArtifactStore::open(config.data_dir.join("images")).await?;
        let state = AppState {
            conversations: Arc::new(ConversationStore::new()),
            artifacts: Arc::new(artifacts),
            model,
        };
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            state,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Build the router
    fn router(&self) -> Router {
        api::router(self.state.clone())
    }

    /// Run the server until shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!("mused listening on {}", local_addr);

        let router = self.router();
        let mut shutdown_rx = self.shutdown_rx.clone();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_rx.changed().await.ok();
            })
            .await?;

        info!("mused shutdown complete");
        Ok(())
    }

    /// Signal the server to shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}
