//! Instance lifecycle management.
//!
//! [`InstanceLifecycleManager`] owns the module image and the single
//! current instance. The image is compiled once and never recompiled;
//! instances are stamped out of it on demand, so per-call replacement only
//! pays instantiation cost.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use wasmtime::Linker;

use crate::fetch::{ImageLocation, fetch_image_bytes};
use crate::image::ModuleImage;
use crate::instance::ModuleInstance;
use crate::store::CallContext;
use crate::WasmEngine;
use oprf_bridge_common::{BridgeError, ExecutionConfig};

/// Owner of the module image and the current instance.
///
/// Exactly one instance is current at any moment. The manager is the sole
/// authority for replacing it; callers take the instance for one call and
/// the manager creates the successor.
pub struct InstanceLifecycleManager {
    engine: WasmEngine,
    linker: Linker<CallContext>,
    exec_config: ExecutionConfig,
    image: Option<Arc<ModuleImage>>,
    current: Option<ModuleInstance>,
}

impl InstanceLifecycleManager {
    /// Create a new manager.
    ///
    /// The linker must already carry every host import the module needs;
    /// it is reused unchanged for all instantiations.
    pub fn new(
        engine: WasmEngine,
        linker: Linker<CallContext>,
        exec_config: ExecutionConfig,
    ) -> Self {
        Self {
            engine,
            linker,
            exec_config,
            image: None,
            current: None,
        }
    }

    /// Fetch, compile, and install the module image, then create the
    /// initial instance.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::LoadFailed`] if the fetch or compilation fails;
    ///   terminal, the manager never retries
    /// - [`BridgeError::InstantiationFailed`] if the initial instance
    ///   cannot be created
    #[instrument(skip(self, location), fields(location = %location))]
    pub async fn load(&mut self, location: &ImageLocation) -> Result<(), BridgeError> {
        let bytes = fetch_image_bytes(location).await?;
        let image = ModuleImage::from_bytes(self.engine.inner(), &bytes)?;
        self.install(image).await
    }

    /// Compile and install an image from WAT text.
    ///
    /// This is primarily for testing purposes.
    ///
    /// # Errors
    ///
    /// Same surface as [`Self::load`], minus the fetch.
    pub async fn load_wat(&mut self, wat: &str) -> Result<(), BridgeError> {
        let image = ModuleImage::from_wat(self.engine.inner(), wat)?;
        self.install(image).await
    }

    async fn install(&mut self, image: ModuleImage) -> Result<(), BridgeError> {
        let image = Arc::new(image);
        let instance = self.instantiate(&image).await?;

        info!(
            content_hash = %image.content_hash(),
            "Module image installed, initial instance ready"
        );

        self.image = Some(image);
        self.current = Some(instance);
        Ok(())
    }

    async fn instantiate(&self, image: &ModuleImage) -> Result<ModuleInstance, BridgeError> {
        let call_id = Uuid::new_v4().to_string();
        ModuleInstance::instantiate(&self.engine, &self.linker, image, &self.exec_config, call_id)
            .await
    }

    /// Returns `true` once an image is installed and an instance is current.
    pub fn is_ready(&self) -> bool {
        self.image.is_some() && self.current.is_some()
    }

    /// Returns `true` if an image is installed, even with no current
    /// instance (e.g., after a failed reset).
    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    /// Take exclusive ownership of the current instance for one call.
    ///
    /// The taken instance is never handed out twice; the caller must ask
    /// for a reset once its call completes.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotReady`] if no instance is current.
    pub fn take_current(&mut self) -> Result<ModuleInstance, BridgeError> {
        self.current.take().ok_or(BridgeError::NotReady)
    }

    /// Discard the current instance and create a fresh one from the cached
    /// image. No re-fetch, no re-compilation.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::NotReady`] if no image is installed
    /// - [`BridgeError::InstantiationFailed`] if instance creation fails;
    ///   the manager then has no current instance until a retry succeeds
    pub async fn reset_instance(&mut self) -> Result<(), BridgeError> {
        let image = self.image.clone().ok_or(BridgeError::NotReady)?;

        // Drop the spent instance before creating its successor so the
        // pooling allocator can reuse its slot.
        self.current = None;

        match self.instantiate(&image).await {
            Ok(instance) => {
                debug!("Instance replaced");
                self.current = Some(instance);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Instance reset failed, no current instance");
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for InstanceLifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceLifecycleManager")
            .field("has_image", &self.image.is_some())
            .field("has_current", &self.current.is_some())
            .finish_non_exhaustive()
    }
}
