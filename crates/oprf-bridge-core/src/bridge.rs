//! The invocation bridge.
//!
//! [`InvocationBridge`] exposes the module's single operation as one safe,
//! repeatable async call. It serializes the request to the wire encoding,
//! drives the current instance, decodes the result, and replaces the
//! instance before returning, so the next call always runs against fresh
//! module state.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::fetch::ImageLocation;
use crate::lifecycle::InstanceLifecycleManager;
use crate::request::{InvocationRequest, InvocationResult};
use oprf_bridge_common::{BridgeError, OverlapPolicy};

/// The single async entry point into the module.
///
/// At most one invocation is in flight system-wide: the lifecycle manager
/// sits behind one async mutex, and the overlap policy decides whether a
/// second caller queues on it or is rejected with
/// [`BridgeError::Busy`].
pub struct InvocationBridge {
    manager: Mutex<InstanceLifecycleManager>,
    policy: OverlapPolicy,
    ready: AtomicBool,
}

impl InvocationBridge {
    /// Create a bridge around a lifecycle manager.
    pub fn new(manager: InstanceLifecycleManager, policy: OverlapPolicy) -> Self {
        Self {
            manager: Mutex::new(manager),
            policy,
            ready: AtomicBool::new(false),
        }
    }

    /// Load the module image and signal readiness.
    ///
    /// # Errors
    ///
    /// Propagates the manager's load surface; a failure leaves the bridge
    /// permanently not ready.
    pub async fn load(&self, location: &ImageLocation) -> Result<(), BridgeError> {
        let mut manager = self.manager.lock().await;
        manager.load(location).await?;
        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    /// Load a WAT module image (testing).
    ///
    /// # Errors
    ///
    /// Same surface as [`Self::load`].
    pub async fn load_wat(&self, wat: &str) -> Result<(), BridgeError> {
        let mut manager = self.manager.lock().await;
        manager.load_wat(wat).await?;
        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    /// The readiness flag gating invocation.
    ///
    /// `false` until `load` completes, and again after a failed instance
    /// reset until [`Self::reset`] succeeds.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// The configured overlap policy.
    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    /// Invoke the module's exported operation with a typed request.
    ///
    /// Encodes the request, runs it against the current instance, and
    /// decodes the module's result. On both success and module-level
    /// failure the instance is replaced before this method returns; the
    /// reset is not skippable.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::NotReady`] before `load`, or after a failed reset
    /// - [`BridgeError::Busy`] under the rejecting policy while another
    ///   invocation is in flight
    /// - [`BridgeError::ModuleFault`] / [`BridgeError::FuelExhausted`] when
    ///   the module call itself fails; the instance is still reset
    pub async fn invoke(
        &self,
        request: &InvocationRequest,
    ) -> Result<InvocationResult, BridgeError> {
        if !self.is_ready() {
            return Err(BridgeError::NotReady);
        }

        let mut manager = match self.policy {
            OverlapPolicy::Reject => self
                .manager
                .try_lock()
                .map_err(|_| BridgeError::Busy)?,
            OverlapPolicy::Queue => self.manager.lock().await,
        };

        // A queued caller may have waited through a failed reset.
        if !manager.is_ready() {
            return Err(BridgeError::NotReady);
        }

        let mut instance = manager.take_current()?;
        let call_id = instance.context().call_id.clone();

        let encoded = serde_json::to_string(request)
            .map_err(|e| BridgeError::codec(format!("request encoding failed: {e}")))?;

        debug!(call_id = %call_id, request_len = encoded.len(), "Invocation dispatched");

        let outcome = instance.call(&encoded).await;

        let fuel_consumed = instance.context().metrics.fuel_consumed;
        let duration = instance.context().metrics.duration;
        drop(instance);

        // Mandatory post-call reset, on success and fault alike. A reset
        // failure is reported on its own channel and flips the bridge to
        // not-ready; it never replaces or merges with the call outcome.
        if let Err(reset_err) = manager.reset_instance().await {
            error!(call_id = %call_id, error = %reset_err, "Post-call instance reset failed");
        }
        self.ready.store(manager.is_ready(), Ordering::Release);

        match outcome {
            Ok(raw) => {
                let value = serde_json::from_str(&raw).map_err(|e| {
                    BridgeError::module_fault(format!("result is not valid JSON: {e}"), None)
                })?;

                info!(
                    call_id = %call_id,
                    fuel_consumed = fuel_consumed,
                    duration_ms = duration.map_or(0, |d| d.as_millis()),
                    "Invocation completed"
                );

                Ok(InvocationResult::new(value))
            }
            Err(err) => {
                warn!(call_id = %call_id, error = %err, "Invocation failed");
                Err(err)
            }
        }
    }

    /// Retry instance replacement after a failed reset.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::NotReady`] if no image was ever loaded
    /// - [`BridgeError::InstantiationFailed`] if the retry fails too
    pub async fn reset(&self) -> Result<(), BridgeError> {
        let mut manager = self.manager.lock().await;
        let result = manager.reset_instance().await;
        self.ready.store(manager.is_ready(), Ordering::Release);
        result
    }
}

impl std::fmt::Debug for InvocationBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationBridge")
            .field("policy", &self.policy)
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WasmEngine;
    use oprf_bridge_common::{EngineConfig, ExecutionConfig};
    use wasmtime::Linker;

    fn test_bridge(policy: OverlapPolicy) -> InvocationBridge {
        let engine_config = EngineConfig {
            pooling_allocator: false,
            ..Default::default()
        };
        let engine = WasmEngine::new(&engine_config).unwrap();
        let linker = Linker::new(engine.inner());
        let manager =
            InstanceLifecycleManager::new(engine, linker, ExecutionConfig::default());
        InvocationBridge::new(manager, policy)
    }

    #[tokio::test]
    async fn test_invoke_before_load_is_not_ready() {
        let bridge = test_bridge(OverlapPolicy::Reject);
        let request = InvocationRequest {
            mode: 0,
            suite: "P256".into(),
            return_info: false,
            data: vec!["a".into()],
        };

        assert!(!bridge.is_ready());
        let result = bridge.invoke(&request).await;
        assert!(matches!(result, Err(BridgeError::NotReady)));
    }

    #[tokio::test]
    async fn test_reset_without_image_is_not_ready() {
        let bridge = test_bridge(OverlapPolicy::Reject);
        let result = bridge.reset().await;
        assert!(matches!(result, Err(BridgeError::NotReady)));
    }
}
