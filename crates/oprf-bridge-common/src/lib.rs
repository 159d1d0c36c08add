//! Common types, errors, and utilities for oprf-bridge.
//!
//! This crate provides shared functionality used across the oprf-bridge workspace:
//! - Error types using `thiserror` for type-safe error handling
//! - Configuration structures for the engine, the execution limits, and the bridge
//! - TOML configuration file loading

pub mod config;
pub mod config_file;
pub mod error;

pub use config::{BridgeConfig, EngineConfig, ExecutionConfig, OverlapPolicy, RuntimeConfig};
pub use config_file::{ConfigFile, ConfigFileError, ServerConfigFile};
pub use error::BridgeError;
