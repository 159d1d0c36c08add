//! Logging host implementation.
//!
//! The original pseudonymization module writes its evaluation and output
//! lines to the console. Here those diagnostics go through `env::log`
//! instead: stored in the per-call [`CallContext`] and re-emitted via
//! `tracing` with a `guest_log` marker.

use oprf_bridge_core::store::{CallContext, LogLevel};
use tracing::{debug, error, info, warn};

/// Host implementation for the guest logging import.
pub struct LoggingHost;

impl LoggingHost {
    /// Log a message at the specified level.
    ///
    /// Stores the entry in the call context and emits it through `tracing`
    /// tagged with the call id.
    pub fn log(ctx: &mut CallContext, level: LogLevel, message: &str) {
        ctx.log(level, message.to_string());

        let call_id = &ctx.call_id;
        match level {
            LogLevel::Debug => debug!(call_id, guest_log = true, "{}", message),
            LogLevel::Info => info!(call_id, guest_log = true, "{}", message),
            LogLevel::Warn => warn!(call_id, guest_log = true, "{}", message),
            LogLevel::Error => error!(call_id, guest_log = true, "{}", message),
        }
    }
}

/// Convert a numeric log level to [`LogLevel`].
///
/// Used when receiving log levels from the guest as integers
/// (0=debug, 1=info, 2=warn, 3=error). Unknown values default to Info.
pub fn level_from_i32(level: i32) -> LogLevel {
    match level {
        0 => LogLevel::Debug,
        2 => LogLevel::Warn,
        3 => LogLevel::Error,
        _ => LogLevel::Info,
    }
}
