//! Per-call execution context and store management.
//!
//! This module provides:
//! - [`CallContext`]: Per-call state accessible from host functions
//! - [`LogEntry`] and [`LogLevel`]: Structured logging from guest code
//! - [`ExecutionMetrics`]: Performance metrics for each call
//!
//! One store backs exactly one [`crate::ModuleInstance`], which in turn
//! serves exactly one call, so everything here is scoped to a single
//! invocation.

use std::time::{Duration, Instant};

use wasmtime::Store;
use wasmtime_wasi::WasiCtxBuilder;
use wasmtime_wasi::preview1::WasiP1Ctx;

use crate::WasmEngine;
use oprf_bridge_common::{BridgeError, ExecutionConfig};

/// Per-call execution context.
///
/// This struct holds all state specific to a single module invocation. It
/// is created together with the instance and destroyed when the instance is
/// discarded after the call.
///
/// Host functions can access this context through the [`wasmtime::Caller`] API.
pub struct CallContext {
    /// WASI context for the guest's system interface.
    wasi: WasiP1Ctx,

    /// Unique call identifier for tracing.
    pub call_id: String,

    /// Logs collected from guest code.
    pub logs: Vec<LogEntry>,

    /// Execution metrics.
    pub metrics: ExecutionMetrics,

    /// Context creation time.
    start_time: Instant,
}

/// A single log entry from guest code.
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Log level (debug, info, warn, error).
    pub level: LogLevel,

    /// Log message content.
    pub message: String,

    /// Timestamp when the log was recorded.
    pub timestamp: Instant,
}

/// Log level for guest logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug-level messages.
    Debug,
    /// Informational messages.
    Info,
    /// Warning messages.
    Warn,
    /// Error messages.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Execution performance metrics.
#[derive(Debug, Clone, Default)]
pub struct ExecutionMetrics {
    /// Fuel consumed during the call.
    pub fuel_consumed: u64,

    /// Total call duration.
    pub duration: Option<Duration>,
}

impl CallContext {
    /// Create a new call context with the given call ID.
    pub fn new(call_id: String) -> Self {
        // Minimal WASI surface: the module computes over its inputs and
        // writes diagnostics, nothing more.
        let wasi = WasiCtxBuilder::new()
            .inherit_stdout()
            .inherit_stderr()
            .build_p1();

        Self {
            wasi,
            call_id,
            logs: Vec::new(),
            metrics: ExecutionMetrics::default(),
            start_time: Instant::now(),
        }
    }

    /// Add a log entry.
    pub fn log(&mut self, level: LogLevel, message: String) {
        self.logs.push(LogEntry {
            level,
            message,
            timestamp: Instant::now(),
        });
    }

    /// Get elapsed time since the context was created.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Finalize metrics after the call.
    pub fn finalize_metrics(&mut self) {
        self.metrics.duration = Some(self.start_time.elapsed());
    }

    /// Get the WASI preview1 context for linker wiring.
    pub fn wasi(&mut self) -> &mut WasiP1Ctx {
        &mut self.wasi
    }
}

/// Create a new Wasmtime store for one call.
///
/// # Errors
///
/// Returns an error if fuel cannot be set on the store.
pub fn create_store(
    engine: &WasmEngine,
    config: &ExecutionConfig,
    call_id: String,
) -> Result<Store<CallContext>, BridgeError> {
    let context = CallContext::new(call_id);
    let mut store = Store::new(engine.inner(), context);

    // Set fuel limit if metering is enabled
    if config.fuel_metering {
        store
            .set_fuel(config.max_fuel)
            .map_err(|e| BridgeError::invalid_config(format!("Failed to set fuel: {e}")))?;
    }

    Ok(store)
}

/// Get remaining fuel from a store.
pub fn get_remaining_fuel(store: &Store<CallContext>) -> Option<u64> {
    store.get_fuel().ok()
}

/// Calculate fuel consumed.
pub fn calculate_fuel_consumed(initial_fuel: u64, store: &Store<CallContext>) -> u64 {
    let remaining = get_remaining_fuel(store).unwrap_or(0);
    initial_fuel.saturating_sub(remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oprf_bridge_common::EngineConfig;

    #[test]
    fn test_call_context_creation() {
        let ctx = CallContext::new("call-123".into());

        assert_eq!(ctx.call_id, "call-123");
        assert!(ctx.logs.is_empty());
        assert_eq!(ctx.metrics.fuel_consumed, 0);
    }

    #[test]
    fn test_call_context_logging() {
        let mut ctx = CallContext::new("call".into());

        ctx.log(LogLevel::Info, "Hello".into());
        ctx.log(LogLevel::Error, "World".into());

        assert_eq!(ctx.logs.len(), 2);
        assert_eq!(ctx.logs[0].level, LogLevel::Info);
        assert_eq!(ctx.logs[0].message, "Hello");
        assert_eq!(ctx.logs[1].level, LogLevel::Error);
    }

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Debug.to_string(), "DEBUG");
        assert_eq!(LogLevel::Info.to_string(), "INFO");
        assert_eq!(LogLevel::Warn.to_string(), "WARN");
        assert_eq!(LogLevel::Error.to_string(), "ERROR");
    }

    #[test]
    fn test_store_creation() {
        let engine_config = EngineConfig {
            pooling_allocator: false, // Disable for simpler test
            ..Default::default()
        };
        let engine = WasmEngine::new(&engine_config).unwrap();
        let exec_config = ExecutionConfig::default();

        let store = create_store(&engine, &exec_config, "call-123".into());
        assert!(store.is_ok());
    }

    #[test]
    fn test_store_fuel() {
        let engine_config = EngineConfig {
            pooling_allocator: false,
            ..Default::default()
        };
        let engine = WasmEngine::new(&engine_config).unwrap();
        let exec_config = ExecutionConfig {
            max_fuel: 1000,
            fuel_metering: true,
        };

        let store = create_store(&engine, &exec_config, "call".into()).unwrap();
        let remaining = get_remaining_fuel(&store);

        assert_eq!(remaining, Some(1000));
    }
}
