//! Configuration structures for the bridge.
//!
//! This module defines configuration options for various components:
//! - [`RuntimeConfig`]: Top-level configuration containing all settings
//! - [`EngineConfig`]: Wasmtime engine settings (pooling allocator sizing)
//! - [`ExecutionConfig`]: Per-instance execution limits (fuel)
//! - [`BridgeConfig`]: Module image location and the overlap policy

use serde::{Deserialize, Serialize};

/// Top-level runtime configuration.
///
/// This structure contains all configuration options for the bridge.
/// It can be loaded from a TOML file or built programmatically.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RuntimeConfig {
    /// Wasmtime engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Per-instance execution configuration.
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Bridge configuration (module location, overlap policy).
    #[serde(default)]
    pub bridge: BridgeConfig,
}

/// Wasmtime engine configuration.
///
/// These settings affect the global Wasmtime engine behavior. The bridge
/// keeps exactly one live instance at a time, so the pool only needs
/// headroom for the instance swap performed after each call.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Enable pooling allocator for fast instance creation.
    ///
    /// The instance is replaced after every call, so instantiation cost is
    /// paid on the hot path. With pooling enabled it drops from ~1ms to ~10µs.
    #[serde(default = "defaults::pooling_allocator")]
    pub pooling_allocator: bool,

    /// Maximum instances in the pool.
    ///
    /// One live instance plus headroom for the post-call swap.
    #[serde(default = "defaults::max_instances")]
    pub max_instances: u32,

    /// Memory per instance slot in megabytes.
    #[serde(default = "defaults::instance_memory_mb")]
    pub instance_memory_mb: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pooling_allocator: defaults::pooling_allocator(),
            max_instances: defaults::max_instances(),
            instance_memory_mb: defaults::instance_memory_mb(),
        }
    }
}

/// Per-instance execution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutionConfig {
    /// Maximum fuel (CPU instructions) per call.
    #[serde(default = "defaults::max_fuel")]
    pub max_fuel: u64,

    /// Enable fuel metering.
    ///
    /// When enabled, CPU usage is tracked and limited by the `max_fuel`
    /// setting. There is no time-based interruption: once dispatched, a
    /// module call runs to completion, fault, or fuel exhaustion.
    #[serde(default = "defaults::fuel_metering")]
    pub fuel_metering: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_fuel: defaults::max_fuel(),
            fuel_metering: defaults::fuel_metering(),
        }
    }
}

/// Bridge configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeConfig {
    /// Module image location.
    ///
    /// Either an `http(s)://` URL or a filesystem path. Fetched and
    /// compiled exactly once at startup.
    #[serde(default = "defaults::module")]
    pub module: String,

    /// Policy for an `invoke` issued while another one is in flight.
    #[serde(default)]
    pub overlap: OverlapPolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            module: defaults::module(),
            overlap: OverlapPolicy::default(),
        }
    }
}

/// Policy for overlapping invocations.
///
/// Invocations are never safely concurrent against a single instance, so the
/// bridge serializes them one way or the other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Fail the overlapping call with `Busy`. Keeps the contract simple and
    /// avoids unbounded queuing.
    #[default]
    Reject,

    /// Queue the overlapping call and run it once the prior call completes
    /// and the instance has been reset.
    Queue,
}

/// Default value functions for serde.
mod defaults {
    pub const fn pooling_allocator() -> bool {
        true
    }

    pub const fn max_instances() -> u32 {
        8
    }

    pub const fn instance_memory_mb() -> u32 {
        64
    }

    pub const fn max_fuel() -> u64 {
        10_000_000
    }

    pub const fn fuel_metering() -> bool {
        true
    }

    pub fn module() -> String {
        "./client.wasm".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();

        assert!(config.engine.pooling_allocator);
        assert_eq!(config.engine.max_instances, 8);
        assert_eq!(config.engine.instance_memory_mb, 64);

        assert_eq!(config.execution.max_fuel, 10_000_000);
        assert!(config.execution.fuel_metering);

        assert_eq!(config.bridge.module, "./client.wasm");
        assert_eq!(config.bridge.overlap, OverlapPolicy::Reject);
    }

    #[test]
    fn test_config_serialization() {
        let config = RuntimeConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: RuntimeConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(config.engine.max_instances, deserialized.engine.max_instances);
        assert_eq!(config.execution.max_fuel, deserialized.execution.max_fuel);
        assert_eq!(config.bridge.overlap, deserialized.bridge.overlap);
    }

    #[test]
    fn test_partial_deserialization() {
        let json = r#"{"bridge": {"overlap": "queue"}}"#;
        let config: RuntimeConfig = serde_json::from_str(json).unwrap();

        // Explicitly set value
        assert_eq!(config.bridge.overlap, OverlapPolicy::Queue);
        // Default values for unspecified fields
        assert_eq!(config.bridge.module, "./client.wasm");
        assert_eq!(config.execution.max_fuel, 10_000_000);
    }

    #[test]
    fn test_overlap_policy_snake_case() {
        let policy: OverlapPolicy = serde_json::from_str(r#""reject""#).unwrap();
        assert_eq!(policy, OverlapPolicy::Reject);

        let policy: OverlapPolicy = serde_json::from_str(r#""queue""#).unwrap();
        assert_eq!(policy, OverlapPolicy::Queue);

        assert!(serde_json::from_str::<OverlapPolicy>(r#""block""#).is_err());
    }
}
