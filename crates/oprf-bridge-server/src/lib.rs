//! HTTP host surface for oprf-bridge.
//!
//! This crate is the host-form boundary of the bridge. It accepts the raw
//! form fields, runs them through the request adapter and the invocation
//! bridge, and renders the module's result as JSON. It handles:
//!
//! - HTTP request routing
//! - Raw field extraction and error mapping
//! - Readiness reporting (the enable flag for the host UI)
//!
//! # Quick Start
//!
//! ```ignore
//! use oprf_bridge_server::{BridgeServer, ServerConfig};
//! use oprf_bridge_common::RuntimeConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime_config = RuntimeConfig::default();
//!     let server_config = ServerConfig::default();
//!
//!     let server = BridgeServer::new(&runtime_config, server_config)?;
//!     server.state().load_module(&"./client.wasm".parse()?).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod handler;
pub mod response;
pub mod router;
pub mod server;
pub mod state;

pub use server::{BridgeServer, ServerConfig};
pub use state::AppState;
