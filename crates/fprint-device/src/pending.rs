//! The single in-flight operation record and the caller's handle to it.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use fprint_core::{ActionKind, DeviceError, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::action::{ActionInput, ActionOutcome, EnrollProgress};

/// Identifier of one dispatch on one device.
///
/// Ids increase monotonically per device and are never reused, so a driver
/// context or cancellation watcher left over from an earlier operation can
/// always be told apart from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OperationId(u64);

impl OperationId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Record of the action currently running on a device.
///
/// Owned by the device state slot for its whole life and consumed exactly
/// once, when the completion is delivered.
pub(crate) struct PendingOperation {
    pub(crate) id: OperationId,
    pub(crate) input: Arc<ActionInput>,
    pub(crate) cancellation_requested: bool,
    /// Set once the action handler has returned; the cancel hook is held back
    /// until then.
    pub(crate) handler_started: bool,
    pub(crate) completion_sink: oneshot::Sender<Result<ActionOutcome>>,
    pub(crate) progress_sink: Option<mpsc::UnboundedSender<EnrollProgress>>,
    /// Fired on completion so the cancellation watcher stops.
    pub(crate) finished: CancellationToken,
}

impl PendingOperation {
    pub(crate) fn action(&self) -> ActionKind {
        self.input.action()
    }
}

impl fmt::Debug for PendingOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingOperation")
            .field("id", &self.id)
            .field("action", &self.action())
            .field("cancellation_requested", &self.cancellation_requested)
            .field("handler_started", &self.handler_started)
            .finish_non_exhaustive()
    }
}

/// Caller handle for a dispatched action.
///
/// Resolves once the driver completes the action. Dropping the handle does not
/// cancel anything: the device stays busy until the driver completes, and the
/// result is then discarded.
///
/// # Examples
///
/// ```
/// use fprint_device::{Device, DeviceConfig};
/// use fprint_device::mock::FakeDriver;
///
/// #[tokio::main]
/// async fn main() -> fprint_core::Result<()> {
///     let (class, _handle) = FakeDriver::new();
///     let device = Device::new(class, DeviceConfig::default());
///
///     let pending = device.begin_open(None)?;
///     assert_eq!(pending.action(), fprint_core::ActionKind::Open);
///     pending.await?;
///
///     assert!(device.is_open());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
#[must_use = "a pending action does nothing useful unless awaited"]
pub struct PendingAction {
    id: OperationId,
    action: ActionKind,
    receiver: oneshot::Receiver<Result<ActionOutcome>>,
}

impl PendingAction {
    pub(crate) fn new(
        id: OperationId,
        action: ActionKind,
        receiver: oneshot::Receiver<Result<ActionOutcome>>,
    ) -> Self {
        Self {
            id,
            action,
            receiver,
        }
    }

    pub fn id(&self) -> OperationId {
        self.id
    }

    pub fn action(&self) -> ActionKind {
        self.action
    }

    /// Wait for completion, giving up after `duration`.
    ///
    /// Giving up does not touch the device: the operation keeps running and
    /// the device stays busy until its driver completes it.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::Timeout` if the driver has not completed in time,
    /// otherwise whatever the action itself produced.
    pub async fn wait_timeout(self, duration: Duration) -> Result<ActionOutcome> {
        let duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        tokio::time::timeout(duration, self)
            .await
            .map_err(|_| DeviceError::timeout(duration_ms))?
    }
}

impl Future for PendingAction {
    type Output = Result<ActionOutcome>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver).poll(cx).map(|delivered| {
            delivered.unwrap_or_else(|_| {
                Err(DeviceError::contract(
                    "device dropped with an operation still pending",
                ))
            })
        })
    }
}
