//! # Placetrack Server
//!
//! Placement-tracking backend API: role-based authentication and
//! authorization over a credential store, with a single normalized
//! error-response contract.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// HTTP API surface.
pub mod api;
/// Authentication and authorization.
pub mod auth;
/// Server configuration.
pub mod config;
/// Centralized error-to-response mapping.
pub mod error;
mod server;

pub use auth::{
    AuthContext, Claims, RequireAdmin, RequireCoordination, RequireRole, RolePolicy,
    SledIdentityStore, TokenCodec, TokenError,
};
pub use config::{AuthConfig, ConfigError, RuntimeMode, ServerConfig};
pub use error::{ApiError, AuthFailure, ErrorBody, NormalizedError};
pub use server::{AppState, Server};

/// Start the server.
///
/// # Errors
///
/// Returns error if the server fails to assemble or run.
pub async fn start(config: ServerConfig) -> Result<(), ServerError> {
    let server = Server::new(config)?;
    server.run().await
}

/// Server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Server error.
    #[error("Server error: {0}")]
    Server(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
