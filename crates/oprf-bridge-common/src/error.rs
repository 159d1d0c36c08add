//! Error types for the bridge.
//!
//! This module defines the failure taxonomy of the bridge using `thiserror`.
//! The split mirrors the lifecycle of a call: errors that happen before the
//! module boundary ([`BridgeError::MalformedField`], [`BridgeError::NotReady`],
//! [`BridgeError::Busy`]) are detected locally and never reach the module;
//! errors from inside the module ([`BridgeError::ModuleFault`],
//! [`BridgeError::FuelExhausted`]) carry the engine diagnostic verbatim.

use std::io;

use thiserror::Error;

/// Top-level bridge errors.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Fetching or compiling the module image failed.
    ///
    /// This is terminal for the process: the bridge never retries the load,
    /// and dependent surfaces stay disabled.
    #[error("Module load failed: {reason}")]
    LoadFailed {
        /// Description of the fetch or compilation failure.
        reason: String,
    },

    /// Creating a module instance from the cached image failed.
    ///
    /// After this error the manager holds no current instance; invocations
    /// fail fast with [`BridgeError::NotReady`] until a reset succeeds.
    #[error("Instance creation failed: {reason}")]
    InstantiationFailed {
        /// Description of the instantiation failure.
        reason: String,
    },

    /// No module instance is available for invocation.
    ///
    /// Raised before `load` completes, or after a failed instance reset.
    #[error("Not ready: no module instance is available")]
    NotReady,

    /// An invocation was attempted while another one is in flight.
    ///
    /// Only raised under the rejecting overlap policy; retryable immediately.
    #[error("Invocation already in flight")]
    Busy,

    /// A raw input field could not be converted into the typed request.
    ///
    /// Detected by the request adapter before any module call is attempted.
    #[error("Malformed field '{field}': {reason}")]
    MalformedField {
        /// Name of the offending raw field.
        field: String,
        /// Why the conversion failed.
        reason: String,
    },

    /// The module call itself faulted.
    ///
    /// The underlying engine diagnostic is preserved; the instance is still
    /// replaced afterwards, so the bridge stays usable.
    #[error("Module execution failed: {message}")]
    ModuleFault {
        /// Description of the fault.
        message: String,
        /// Trap code if the engine reported one.
        code: Option<String>,
    },

    /// The module call exhausted its fuel budget.
    #[error("Fuel exhausted: CPU limit exceeded")]
    FuelExhausted,

    /// Encoding or decoding the wire payload failed.
    #[error("Codec error: {reason}")]
    Codec {
        /// Description of the codec failure.
        reason: String,
    },

    /// Invalid configuration was provided.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl BridgeError {
    /// Create a new `LoadFailed` error.
    pub fn load_failed(reason: impl Into<String>) -> Self {
        Self::LoadFailed {
            reason: reason.into(),
        }
    }

    /// Create a new `InstantiationFailed` error.
    pub fn instantiation_failed(reason: impl Into<String>) -> Self {
        Self::InstantiationFailed {
            reason: reason.into(),
        }
    }

    /// Create a new `MalformedField` error.
    pub fn malformed_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a new `ModuleFault` error.
    pub fn module_fault(message: impl Into<String>, code: Option<String>) -> Self {
        Self::ModuleFault {
            message: message.into(),
            code,
        }
    }

    /// Create a new `Codec` error.
    pub fn codec(reason: impl Into<String>) -> Self {
        Self::Codec {
            reason: reason.into(),
        }
    }

    /// Create a new `InvalidConfig` error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Returns `true` if the error came from inside the module boundary.
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::ModuleFault { .. } | Self::FuelExhausted)
    }

    /// Returns `true` if the error is terminal for the process.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::LoadFailed { .. })
    }

    /// Returns `true` if the caller may retry immediately without any
    /// corrective action on the bridge side.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy | Self::MalformedField { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BridgeError::load_failed("bad magic number");
        assert_eq!(err.to_string(), "Module load failed: bad magic number");

        let err = BridgeError::NotReady;
        assert_eq!(err.to_string(), "Not ready: no module instance is available");

        let err = BridgeError::malformed_field("mode", "not a base-10 integer");
        assert_eq!(
            err.to_string(),
            "Malformed field 'mode': not a base-10 integer"
        );
    }

    #[test]
    fn test_is_fault() {
        assert!(BridgeError::module_fault("unreachable", None).is_fault());
        assert!(BridgeError::FuelExhausted.is_fault());
        assert!(!BridgeError::Busy.is_fault());
        assert!(!BridgeError::NotReady.is_fault());
    }

    #[test]
    fn test_is_terminal() {
        assert!(BridgeError::load_failed("fetch failed").is_terminal());
        assert!(!BridgeError::instantiation_failed("pool exhausted").is_terminal());
    }

    #[test]
    fn test_is_retryable() {
        assert!(BridgeError::Busy.is_retryable());
        assert!(BridgeError::malformed_field("mode", "empty").is_retryable());
        assert!(!BridgeError::NotReady.is_retryable());
        assert!(!BridgeError::FuelExhausted.is_retryable());
    }
}
