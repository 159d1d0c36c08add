//! Linker construction and host import registration.
//!
//! The lifecycle manager instantiates the module against a linker built
//! here; the linker is populated once and reused for every instance.

use tracing::warn;
use wasmtime::{Caller, Linker};

use oprf_bridge_common::BridgeError;
use oprf_bridge_core::store::CallContext;
use oprf_bridge_core::WasmEngine;

use crate::logging::{LoggingHost, level_from_i32};

/// Build the linker the module is instantiated against.
///
/// Registers WASI preview1 plus every `env` host import.
///
/// # Errors
///
/// Returns an error if import registration fails.
pub fn create_linker(engine: &WasmEngine) -> Result<Linker<CallContext>, BridgeError> {
    let mut linker = Linker::new(engine.inner());
    register_wasi(&mut linker)?;
    register_all(&mut linker)?;
    Ok(linker)
}

/// Register WASI preview1 on the linker.
///
/// # Errors
///
/// Returns an error if registration fails.
pub fn register_wasi(linker: &mut Linker<CallContext>) -> Result<(), BridgeError> {
    wasmtime_wasi::preview1::add_to_linker_async(linker, CallContext::wasi)
        .map_err(|e| BridgeError::invalid_config(format!("Failed to register WASI: {e}")))
}

/// Register all `env` host imports.
///
/// # Errors
///
/// Returns an error if function registration fails.
pub fn register_all(linker: &mut Linker<CallContext>) -> Result<(), BridgeError> {
    register_logging(linker)?;
    Ok(())
}

/// Register the logging host import.
///
/// Registers `env::log(level: i32, ptr: i32, len: i32)`. The guest passes a
/// level (0=debug, 1=info, 2=warn, 3=error) and a pointer/length pair for
/// a UTF-8 message in its own memory. Invalid pointers are dropped with a
/// host-side warning rather than trapping the call.
pub fn register_logging(linker: &mut Linker<CallContext>) -> Result<(), BridgeError> {
    linker
        .func_wrap(
            "env",
            "log",
            |mut caller: Caller<'_, CallContext>, level: i32, ptr: i32, len: i32| {
                if ptr < 0 || len < 0 {
                    warn!(ptr, len, "Guest log dropped: negative pointer or length");
                    return;
                }

                let Some(memory) = caller
                    .get_export("memory")
                    .and_then(wasmtime::Extern::into_memory)
                else {
                    warn!("Guest log dropped: memory export not found");
                    return;
                };

                // Copy the message out before touching caller.data_mut()
                #[allow(clippy::cast_sign_loss)]
                let message = {
                    let data = memory.data(&caller);
                    let start = ptr as usize;
                    let Some(end) = start.checked_add(len as usize) else {
                        warn!(ptr, len, "Guest log dropped: pointer + length overflow");
                        return;
                    };

                    if end > data.len() {
                        warn!(
                            start,
                            end,
                            memory_size = data.len(),
                            "Guest log dropped: out of bounds"
                        );
                        return;
                    }

                    std::str::from_utf8(&data[start..end])
                        .unwrap_or("<invalid utf8>")
                        .to_string()
                };

                LoggingHost::log(caller.data_mut(), level_from_i32(level), &message);
            },
        )
        .map_err(|e| {
            BridgeError::invalid_config(format!("Failed to register log function: {e}"))
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oprf_bridge_common::EngineConfig;

    #[test]
    fn test_register_logging() {
        let config = EngineConfig::default();
        let engine = WasmEngine::new(&config).unwrap();
        let mut linker = Linker::new(engine.inner());

        let result = register_logging(&mut linker);
        assert!(result.is_ok());
    }

    #[test]
    fn test_create_linker() {
        let config = EngineConfig::default();
        let engine = WasmEngine::new(&config).unwrap();

        let result = create_linker(&engine);
        assert!(result.is_ok());
    }
}
