//! Shared application state.
//!
//! This module provides [`AppState`], which holds the single
//! [`InvocationBridge`] shared across all HTTP request handlers.

use std::sync::Arc;

use oprf_bridge_common::{BridgeError, RuntimeConfig};
use oprf_bridge_core::{ImageLocation, InstanceLifecycleManager, InvocationBridge, WasmEngine};
use oprf_bridge_host::create_linker;

/// Shared state across all request handlers.
///
/// This struct is cloned for each request, so the bridge sits behind an
/// `Arc`. All module-load state lives inside the bridge's lifecycle
/// manager; there is no global mutation anywhere else.
#[derive(Clone)]
pub struct AppState {
    /// The invocation bridge (shared across all requests).
    bridge: Arc<InvocationBridge>,
}

impl AppState {
    /// Create new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if engine or linker creation fails.
    pub fn new(config: &RuntimeConfig) -> Result<Self, BridgeError> {
        let engine = WasmEngine::new(&config.engine)?;
        let linker = create_linker(&engine)?;
        let manager = InstanceLifecycleManager::new(engine, linker, config.execution.clone());
        let bridge = Arc::new(InvocationBridge::new(manager, config.bridge.overlap));

        Ok(Self { bridge })
    }

    /// Get the invocation bridge.
    pub fn bridge(&self) -> &InvocationBridge {
        &self.bridge
    }

    /// Load the module image from its configured location.
    ///
    /// # Errors
    ///
    /// Propagates the bridge's load surface.
    pub async fn load_module(&self, location: &ImageLocation) -> Result<(), BridgeError> {
        self.bridge.load(location).await
    }

    /// Load a WAT module image (testing).
    ///
    /// # Errors
    ///
    /// Propagates the bridge's load surface.
    pub async fn load_module_wat(&self, wat: &str) -> Result<(), BridgeError> {
        self.bridge.load_wat(wat).await
    }

    /// Whether the bridge is ready to accept invocations.
    pub fn is_ready(&self) -> bool {
        self.bridge.is_ready()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_creation() {
        let config = RuntimeConfig::default();
        let state = AppState::new(&config).unwrap();
        assert!(!state.is_ready());
    }

    #[tokio::test]
    async fn test_load_module_wat() {
        let config = RuntimeConfig::default();
        let state = AppState::new(&config).unwrap();

        let wat = r#"(module (memory (export "memory") 1))"#;
        state.load_module_wat(wat).await.unwrap();
        assert!(state.is_ready());
    }
}
