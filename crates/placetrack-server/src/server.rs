//! Server assembly.

use std::net::SocketAddr;
use std::sync::Arc;

use placetrack_core::IdentityStore;

use crate::ServerError;
use crate::api;
use crate::auth::{SledIdentityStore, TokenCodec};
use crate::config::{ConfigError, ServerConfig};

/// Server state shared across handlers.
pub struct AppState {
    /// Server configuration.
    pub config: ServerConfig,
    /// Token codec.
    pub codec: TokenCodec,
    /// Credential store.
    pub store: Arc<dyn IdentityStore>,
}

impl AppState {
    /// Create server state.
    #[must_use]
    pub fn new(config: ServerConfig, codec: TokenCodec, store: Arc<dyn IdentityStore>) -> Self {
        Self {
            config,
            codec,
            store,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// The API server.
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl Server {
    /// Assemble a server from configuration.
    ///
    /// Fatal if the token secret is missing or the identity store cannot
    /// be opened.
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid or storage fails to
    /// open.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        std::fs::create_dir_all(&config.data_dir)
            .map_err(|e| ServerError::Server(format!("Failed to create data dir: {e}")))?;

        let codec = TokenCodec::from_config(&config.auth)?;
        let store = SledIdentityStore::open(&config.data_dir)
            .map_err(|e| ServerError::Server(format!("Identity store init failed: {e}")))?;

        let state = Arc::new(AppState::new(config.clone(), codec, Arc::new(store)));

        Ok(Self { config, state })
    }

    /// Shared state, for wiring the router in tests.
    #[must_use]
    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Run the server until shutdown.
    ///
    /// # Errors
    ///
    /// Returns error if the listener cannot bind or the server fails.
    pub async fn run(&self) -> Result<(), ServerError> {
        let app = api::router(self.state.clone());

        let addr: SocketAddr = format!("{}:{}", self.config.bind_address, self.config.port)
            .parse()
            .map_err(|e| {
                ServerError::Config(ConfigError::InvalidAddress(format!(
                    "{}:{} ({e})",
                    self.config.bind_address, self.config.port
                )))
            })?;

        tracing::info!("API listening on http://{addr}");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .map_err(|e| ServerError::Server(e.to_string()))?;

        Ok(())
    }
}
