//! Shared vocabulary for the fingerprint device abstraction layer.
//!
//! This crate holds the types that both drivers and callers speak: the set of
//! dispatchable actions, the error taxonomy, and the opaque payloads (prints
//! and images) that flow through a device without being interpreted by it.
//! The dispatch machinery itself lives in `fprint-device`.

pub mod action;
pub mod constants;
pub mod error;
pub mod types;

pub use action::ActionKind;
pub use error::{DeviceError, DriverErrorKind, Result, RetryKind};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
