//! Host imports for the pseudonymization module.
//!
//! This crate provides the import table the module is instantiated
//! against:
//!
//! - [`logging`]: the `env::log` import, capturing guest diagnostics per
//!   call and re-emitting them through `tracing`
//! - WASI preview1, for the guest toolchain's system interface
//!
//! [`create_linker`] builds a fully populated linker; the lifecycle manager
//! reuses it unchanged for every instantiation.

pub mod linker;
pub mod logging;

pub use linker::{create_linker, register_all};
pub use logging::LoggingHost;
