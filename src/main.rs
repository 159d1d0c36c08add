//! oprf-bridge CLI entry point.
//!
//! This is the main entry point for running the bridge HTTP server: it
//! loads the configuration, fetches and compiles the module image once,
//! and serves the invocation surface.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oprf_bridge_common::ConfigFile;
use oprf_bridge_core::ImageLocation;
use oprf_bridge_server::{BridgeServer, ServerConfig};

/// Host-side bridge for the OPRF pseudonymization WebAssembly module.
#[derive(Debug, Parser)]
#[command(name = "oprf-bridge", version, about)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, env = "BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Module image location, a URL or a path; overrides the config file.
    #[arg(long, env = "BRIDGE_MODULE")]
    module: Option<String>,

    /// Bind address; overrides the config file.
    #[arg(long, env = "BRIDGE_BIND")]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,oprf_bridge=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    info!("Starting oprf-bridge");

    // Load configuration
    let config_file = match &cli.config {
        Some(path) => ConfigFile::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ConfigFile::default(),
    };

    let bind_addr: SocketAddr = match cli.bind {
        Some(addr) => addr,
        None => config_file.server.bind_addr.parse().context(
            "Invalid bind_addr format. Expected format: 'host:port' (e.g., '0.0.0.0:8080')",
        )?,
    };

    let module = cli
        .module
        .unwrap_or_else(|| config_file.runtime.bridge.module.clone());
    let location: ImageLocation = module.parse().context("Invalid module location")?;

    let mut server_config = ServerConfig::default()
        .with_bind_addr(bind_addr)
        .with_timeout(config_file.server.request_timeout_secs);
    server_config.graceful_shutdown = config_file.server.graceful_shutdown;

    info!(bind_addr = %bind_addr, module = %location, "Configuration loaded");

    // Create the server
    let server = BridgeServer::new(&config_file.runtime, server_config)?;

    // A load failure is terminal: there is no retry and the bridge stays
    // not-ready. The server still runs so the failure is observable on
    // /ready and the invocation surface stays disabled.
    if let Err(e) = server.state().load_module(&location).await {
        error!(error = %e, "Module load failed; invocation disabled");
    }

    info!("Server initialized. Available endpoints:");
    info!("  GET  /health        - Health check");
    info!("  GET  /ready         - Readiness check");
    info!("  POST /pseudonymize  - Run one pseudonymization call");
    info!("  POST /reset         - Retry instance replacement");

    server.run().await?;

    Ok(())
}
