//! Module image compilation and caching.
//!
//! This module provides [`ModuleImage`], the compiled bytecode artifact the
//! bridge creates exactly once per process. Instances are stamped out of the
//! image after every call; the image itself is never recompiled.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Instant;

use tracing::{info, instrument};
use wasmtime::{Engine, Module};

use oprf_bridge_common::BridgeError;

/// A compiled module image.
///
/// Wraps a Wasmtime [`Module`] with metadata for logging. Immutable once
/// created; identity is the compiled artifact.
///
/// # Thread Safety
///
/// `ModuleImage` is thread-safe and can back any number of sequential
/// instantiations.
#[derive(Clone)]
pub struct ModuleImage {
    /// The compiled Wasmtime module.
    module: Module,

    /// Hash of the original Wasm bytes.
    content_hash: String,

    /// When this image was compiled.
    compiled_at: Instant,
}

impl ModuleImage {
    /// Compile an image from WebAssembly bytes.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::LoadFailed`] if the bytes are not a valid
    /// module; compilation failure is part of the (terminal) load failure
    /// surface.
    #[instrument(skip(engine, bytes), fields(bytes_len = bytes.len()))]
    pub fn from_bytes(engine: &Engine, bytes: &[u8]) -> Result<Self, BridgeError> {
        let start = Instant::now();

        Self::validate_wasm_header(bytes)?;

        let module = Module::new(engine, bytes)
            .map_err(|e| BridgeError::load_failed(format!("module compilation failed: {e}")))?;

        let content_hash = compute_hash(bytes);
        let duration = start.elapsed();

        info!(
            content_hash = %content_hash,
            duration_ms = duration.as_millis(),
            "Module image compiled"
        );

        Ok(Self {
            module,
            content_hash,
            compiled_at: Instant::now(),
        })
    }

    /// Compile an image from WAT (WebAssembly Text Format).
    ///
    /// This is primarily for testing purposes.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::LoadFailed`] if compilation fails.
    #[instrument(skip(engine, wat))]
    pub fn from_wat(engine: &Engine, wat: &str) -> Result<Self, BridgeError> {
        let start = Instant::now();

        let module = Module::new(engine, wat)
            .map_err(|e| BridgeError::load_failed(format!("WAT compilation failed: {e}")))?;

        let content_hash = compute_hash(wat.as_bytes());
        let duration = start.elapsed();

        info!(
            content_hash = %content_hash,
            duration_ms = duration.as_millis(),
            "WAT module image compiled"
        );

        Ok(Self {
            module,
            content_hash,
            compiled_at: Instant::now(),
        })
    }

    /// Get the content hash of the original bytes.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Get when this image was compiled.
    pub fn compiled_at(&self) -> Instant {
        self.compiled_at
    }

    /// Get the inner compiled module.
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Validate WebAssembly header (magic number).
    fn validate_wasm_header(bytes: &[u8]) -> Result<(), BridgeError> {
        if bytes.len() < 8 {
            return Err(BridgeError::load_failed("invalid Wasm: file too small"));
        }

        // Check magic number: \0asm
        if &bytes[0..4] != b"\0asm" {
            return Err(BridgeError::load_failed("invalid Wasm: bad magic number"));
        }

        Ok(())
    }
}

impl std::fmt::Debug for ModuleImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleImage")
            .field("content_hash", &self.content_hash)
            .finish_non_exhaustive()
    }
}

/// Compute a hash of the given bytes.
fn compute_hash(bytes: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
