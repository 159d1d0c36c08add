//! Core runtime for oprf-bridge.
//!
//! This crate provides the module lifecycle manager and the invocation
//! bridge:
//! - [`WasmEngine`]: Configured Wasmtime engine with pooling allocator
//! - [`ModuleImage`]: Compiled module image, created once and cached
//! - [`CallContext`]: Per-call execution context
//! - [`ModuleInstance`]: One live instance, good for exactly one call
//! - [`InstanceLifecycleManager`]: Owns the image and the current instance
//! - [`InvocationBridge`]: The single async `invoke` operation
//! - [`RequestAdapter`]: Raw form fields to typed request conversion
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     WasmEngine                          │
//! │  (Shared, thread-safe)                                  │
//! │  - Pooling Allocator                                    │
//! │  - Compilation settings                                 │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                    ModuleImage                          │
//! │  (Compiled once, never recompiled)                      │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │          Store<CallContext> + ModuleInstance            │
//! │  (Discarded and recreated after every call)             │
//! │  - Fuel metering                                        │
//! │  - Linear memory                                        │
//! │  - Guest logs                                           │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The image/instance split is the point: compilation cost is paid once,
//! while a fresh instance per call guarantees that no call observes memory
//! or globals written by a previous one.

pub mod bridge;
pub mod engine;
pub mod fetch;
pub mod image;
pub mod instance;
pub mod lifecycle;
pub mod request;
pub mod store;

pub use bridge::InvocationBridge;
pub use engine::WasmEngine;
pub use fetch::ImageLocation;
pub use image::ModuleImage;
pub use instance::ModuleInstance;
pub use lifecycle::InstanceLifecycleManager;
pub use request::{InvocationRequest, InvocationResult, RequestAdapter};
pub use store::{CallContext, ExecutionMetrics, LogEntry, LogLevel};
