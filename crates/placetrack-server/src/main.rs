//! Placetrack server binary.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use placetrack_server::{RuntimeMode, ServerConfig};

#[derive(Parser)]
#[command(name = "placetrack-server")]
#[command(about = "Placetrack - placement tracking backend API")]
#[command(version)]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "PLACETRACK_PORT", default_value_t = 5000)]
    port: u16,

    /// Bind address
    #[arg(long, env = "PLACETRACK_BIND", default_value = "127.0.0.1")]
    bind: String,

    /// Data directory (defaults to the platform data dir)
    #[arg(long, env = "PLACETRACK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Runtime mode: development or production
    #[arg(long, env = "PLACETRACK_MODE", default_value = "production")]
    mode: RuntimeMode,

    /// Token signing secret (hex-encoded, required)
    #[arg(long, env = "PLACETRACK_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let mut builder = ServerConfig::builder()
        .port(cli.port)
        .bind_address(cli.bind)
        .mode(cli.mode);

    if let Some(dir) = cli.data_dir {
        builder = builder.data_dir(dir);
    }
    if let Some(secret) = cli.jwt_secret {
        builder = builder.jwt_secret(secret);
    }

    let config = builder.build().with_env_overrides();

    placetrack_server::start(config).await?;

    Ok(())
}
