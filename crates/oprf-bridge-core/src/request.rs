//! Typed request/result structures and the request adapter.
//!
//! The wire encoding is externally fixed: a JSON document with the keys
//! `mode`, `suite`, `return-info`, and `data`. The adapter converts the raw
//! string fields of the host form into the typed request; nothing here
//! suspends or touches the module.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use oprf_bridge_common::BridgeError;

/// Raw field name for the operation mode.
pub const FIELD_MODE: &str = "mode";

/// Raw field name for the cipher suite identifier.
pub const FIELD_SUITE: &str = "suite";

/// Raw field name for the return-info flag.
pub const FIELD_RETURN_INFO: &str = "return-info";

/// Raw field name for the delimited data values.
pub const FIELD_DATA: &str = "data";

/// Delimiter between values in the raw `data` field.
pub const DATA_DELIMITER: char = ';';

/// The structured request routed into the module's exported call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// Operation mode. The module encodes this as a fixed-width numeric
    /// type, so it must be a valid integer before crossing the boundary.
    pub mode: u8,

    /// Cipher suite identifier, opaque to the bridge.
    pub suite: String,

    /// Whether the module should return its public information.
    #[serde(rename = "return-info")]
    pub return_info: bool,

    /// Ordered input values. Positions matter to the module; empty entries
    /// are preserved.
    pub data: Vec<String>,
}

/// The opaque structured value the module returns.
///
/// The bridge only carries it across the call boundary; it never interprets
/// the shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvocationResult(Value);

impl InvocationResult {
    /// Wrap a decoded result value.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Borrow the underlying value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Unwrap into the underlying value.
    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Converter from raw form fields to the typed request.
pub struct RequestAdapter;

impl RequestAdapter {
    /// Convert raw key/value form fields into an [`InvocationRequest`].
    ///
    /// - `mode`: base-10 integer parse
    /// - `suite`: passed through unchanged
    /// - `return-info`: `true` iff the raw value is exactly `"true"`; this
    ///   is an exact equality check, not a general boolean parse
    /// - `data`: split on `;`, empty segments preserved
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::MalformedField`] for a missing `mode`,
    /// `suite`, or `data` field, or an unparseable `mode`.
    pub fn adapt(fields: &HashMap<String, String>) -> Result<InvocationRequest, BridgeError> {
        let mode = fields
            .get(FIELD_MODE)
            .ok_or_else(|| BridgeError::malformed_field(FIELD_MODE, "missing"))?
            .parse::<u8>()
            .map_err(|e| {
                BridgeError::malformed_field(FIELD_MODE, format!("not a base-10 integer: {e}"))
            })?;

        let suite = fields
            .get(FIELD_SUITE)
            .ok_or_else(|| BridgeError::malformed_field(FIELD_SUITE, "missing"))?
            .clone();

        let return_info = fields
            .get(FIELD_RETURN_INFO)
            .is_some_and(|value| value == "true");

        let data = fields
            .get(FIELD_DATA)
            .ok_or_else(|| BridgeError::malformed_field(FIELD_DATA, "missing"))?
            .split(DATA_DELIMITER)
            .map(str::to_string)
            .collect();

        Ok(InvocationRequest {
            mode,
            suite,
            return_info,
            data,
        })
    }
}
