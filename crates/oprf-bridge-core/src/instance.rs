//! Module instance and the single-call boundary.
//!
//! This module provides [`ModuleInstance`], one live execution context
//! created from a [`ModuleImage`](crate::ModuleImage). An instance is used
//! for at most one completed call before being discarded: the module may
//! accumulate internal state (allocations, globals) that must never leak
//! into a later, unrelated call.
//!
//! # Wire contract
//!
//! The module exposes exactly one operation over a linear-memory string
//! protocol:
//! - `memory`: the exported linear memory
//! - `alloc(len: i32) -> i32`: guest-side buffer allocation
//! - `pseudonymize(ptr: i32, len: i32) -> i64`: consumes the UTF-8 JSON
//!   request at `ptr..ptr+len` and returns the result location packed as
//!   `(ptr << 32) | len`
//!
//! A trap during the call is the module's distinguishable failure outcome.

use std::time::Instant;

use tracing::{debug, error, instrument, warn};
use wasmtime::{Linker, Store, Trap};

use crate::image::ModuleImage;
use crate::store::{CallContext, calculate_fuel_consumed, create_store, get_remaining_fuel};
use crate::WasmEngine;
use oprf_bridge_common::{BridgeError, ExecutionConfig};

/// Name of the exported linear memory.
pub const EXPORT_MEMORY: &str = "memory";

/// Name of the guest allocator export.
pub const EXPORT_ALLOC: &str = "alloc";

/// Name of the module's single callable operation.
pub const EXPORT_PSEUDONYMIZE: &str = "pseudonymize";

/// One live module instance, good for exactly one call.
///
/// Owns its [`Store`] and is exclusively owned by the
/// [`InstanceLifecycleManager`](crate::InstanceLifecycleManager) except for
/// the duration of the one call the bridge runs against it.
pub struct ModuleInstance {
    store: Store<CallContext>,
    instance: wasmtime::Instance,
}

impl ModuleInstance {
    /// Instantiate the image with the given linker.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InstantiationFailed`] if the import table
    /// cannot be satisfied or the instance cannot be allocated.
    pub(crate) async fn instantiate(
        engine: &WasmEngine,
        linker: &Linker<CallContext>,
        image: &ModuleImage,
        exec_config: &ExecutionConfig,
        call_id: String,
    ) -> Result<Self, BridgeError> {
        let mut store = create_store(engine, exec_config, call_id)?;

        let instance = linker
            .instantiate_async(&mut store, image.module())
            .await
            .map_err(|e| BridgeError::instantiation_failed(e.to_string()))?;

        debug!(call_id = %store.data().call_id, "Module instance created");

        Ok(Self { store, instance })
    }

    /// Drive the module's exported operation with an encoded request.
    ///
    /// Writes the request into guest memory, calls `pseudonymize`, suspends
    /// until the module completes, and reads the encoded result back out.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::ModuleFault`] if the module traps or violates the
    ///   wire contract
    /// - [`BridgeError::FuelExhausted`] if the call runs out of fuel
    #[instrument(skip(self, encoded), fields(call_id = %self.store.data().call_id))]
    pub async fn call(&mut self, encoded: &str) -> Result<String, BridgeError> {
        let start = Instant::now();
        let initial_fuel = get_remaining_fuel(&self.store).unwrap_or(0);

        let memory = self
            .instance
            .get_memory(&mut self.store, EXPORT_MEMORY)
            .ok_or_else(|| {
                BridgeError::module_fault(
                    format!("module does not export '{EXPORT_MEMORY}'"),
                    None,
                )
            })?;

        let alloc = self
            .instance
            .get_typed_func::<i32, i32>(&mut self.store, EXPORT_ALLOC)
            .map_err(|e| {
                BridgeError::module_fault(
                    format!("export '{EXPORT_ALLOC}' missing or mistyped: {e}"),
                    None,
                )
            })?;

        let run = self
            .instance
            .get_typed_func::<(i32, i32), i64>(&mut self.store, EXPORT_PSEUDONYMIZE)
            .map_err(|e| {
                BridgeError::module_fault(
                    format!("export '{EXPORT_PSEUDONYMIZE}' missing or mistyped: {e}"),
                    None,
                )
            })?;

        let bytes = encoded.as_bytes();
        let len = i32::try_from(bytes.len())
            .map_err(|_| BridgeError::codec("request exceeds the module's address space"))?;

        let ptr = alloc
            .call_async(&mut self.store, len)
            .await
            .map_err(|e| fault_from_error(&e))?;
        let ptr_offset = usize::try_from(ptr).map_err(|_| {
            BridgeError::module_fault("allocator returned a negative pointer", None)
        })?;

        memory
            .write(&mut self.store, ptr_offset, bytes)
            .map_err(|e| {
                BridgeError::module_fault(format!("request buffer out of bounds: {e}"), None)
            })?;

        debug!(request_len = bytes.len(), "Dispatching module call");

        let result = run.call_async(&mut self.store, (ptr, len)).await;

        let fuel_consumed = calculate_fuel_consumed(initial_fuel, &self.store);
        self.store.data_mut().metrics.fuel_consumed = fuel_consumed;
        self.store.data_mut().finalize_metrics();

        let duration = start.elapsed();

        let packed = match result {
            Ok(packed) => packed,
            Err(trap) => {
                let err = fault_from_error(&trap);
                error!(
                    duration_ms = duration.as_millis(),
                    fuel_consumed = fuel_consumed,
                    error = %err,
                    "Module call faulted"
                );
                return Err(err);
            }
        };

        let (result_ptr, result_len) = unpack_result(packed);
        let data = memory.data(&self.store);
        let end = result_ptr.checked_add(result_len).ok_or_else(|| {
            BridgeError::module_fault("result location overflows the address space", None)
        })?;
        if end > data.len() {
            return Err(BridgeError::module_fault(
                format!(
                    "result location {result_ptr}..{end} out of bounds (memory size {})",
                    data.len()
                ),
                None,
            ));
        }

        let text = std::str::from_utf8(&data[result_ptr..end])
            .map_err(|e| BridgeError::codec(format!("result is not valid UTF-8: {e}")))?
            .to_string();

        debug!(
            duration_ms = duration.as_millis(),
            fuel_consumed = fuel_consumed,
            result_len = result_len,
            "Module call completed"
        );

        Ok(text)
    }

    /// Get the call context (call id, guest logs, metrics).
    pub fn context(&self) -> &CallContext {
        self.store.data()
    }
}

impl std::fmt::Debug for ModuleInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleInstance")
            .field("call_id", &self.store.data().call_id)
            .finish_non_exhaustive()
    }
}

/// Unpack a `(ptr << 32) | len` result location.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn unpack_result(packed: i64) -> (usize, usize) {
    let packed = packed as u64;
    ((packed >> 32) as usize, (packed & 0xffff_ffff) as usize)
}

/// Map a Wasmtime error to the bridge failure surface.
fn fault_from_error(error: &wasmtime::Error) -> BridgeError {
    if is_out_of_fuel(error) {
        warn!("Module call terminated: fuel exhausted");
        return BridgeError::FuelExhausted;
    }

    let code = error.downcast_ref::<Trap>().map(|trap| format!("{trap:?}"));
    BridgeError::module_fault(error.to_string(), code)
}

/// Check if an error is due to fuel exhaustion.
fn is_out_of_fuel(error: &wasmtime::Error) -> bool {
    error
        .downcast_ref::<Trap>()
        .is_some_and(|trap| *trap == Trap::OutOfFuel)
}
