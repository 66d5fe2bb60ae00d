//! Dispatch core for fingerprint sensor drivers.
//!
//! This crate sits between callers (enrollment tools, login services, ...) and
//! individual sensor drivers. A driver describes itself once as a
//! [`DriverClass`]: an identity plus one handler per supported action. Every
//! [`Device`] created from that class gets its own state slot, and the crate
//! enforces the rules every driver would otherwise have to get right by
//! itself:
//!
//! - **One action at a time**: a second dispatch while one is pending fails
//!   with `Busy` instead of being queued.
//! - **Lifecycle**: only `Probe` and `Open` are accepted on a closed device,
//!   and `Open` is rejected on an open one.
//! - **Completion contract**: every accepted dispatch produces exactly one
//!   result. Late, duplicate or mistyped completions from a driver are
//!   rejected as contract violations without disturbing the device.
//! - **Cooperative cancellation**: a caller's cancellation token is forwarded
//!   to the driver's cancel hook at most once; the driver decides the outcome.
//!
//! # Driver Side
//!
//! Handlers are synchronous closures receiving a [`DriverContext`]. They may
//! complete inline or hand the context to a timer or task and complete later:
//!
//! ```
//! use std::time::Duration;
//! use fprint_device::{ActionOutcome, DriverClass};
//!
//! let class = DriverClass::new(
//!     "slow_sensor",
//!     "Slow sensor",
//!     |ctx| {
//!         tokio::spawn(async move {
//!             tokio::time::sleep(Duration::from_millis(20)).await;
//!             let _ = ctx.complete(Ok(ActionOutcome::Opened));
//!         });
//!     },
//!     |ctx| { let _ = ctx.complete(Ok(ActionOutcome::Closed)); },
//! );
//! assert!(!class.has_storage());
//! ```
//!
//! # Caller Side
//!
//! ```
//! use fprint_device::{Device, DeviceConfig};
//! use fprint_device::mock::FakeDriver;
//!
//! # #[tokio::main]
//! # async fn main() -> fprint_core::Result<()> {
//! let (class, handle) = FakeDriver::new();
//! let device = Device::new(class, DeviceConfig::default());
//!
//! device.open(None).await?;
//! handle.ret_match(true);
//! let result = device.verify(device.new_print(), None).await?;
//! assert!(result.matched);
//! device.close(None).await?;
//! # Ok(())
//! # }
//! ```

pub mod action;
mod cancel;
pub mod class;
pub mod config;
pub mod context;
pub mod device;
mod dispatch;
pub mod lifecycle;
pub mod pending;
pub mod registry;

#[cfg(feature = "mock")]
pub mod mock;

// Re-export commonly used types for convenience
pub use action::{ActionInput, ActionOutcome, EnrollProgress, IdentifyResult, VerifyResult};
pub use class::{ActionHandler, DriverClass};
pub use config::DeviceConfig;
pub use context::DriverContext;
pub use device::Device;
pub use lifecycle::{DeviceState, StateTransition};
pub use pending::{OperationId, PendingAction};
pub use registry::{DriverRegistry, RegistryError};
