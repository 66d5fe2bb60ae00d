//! Cancellation coordination.
//!
//! A caller asks for cancellation by cancelling the token it passed at
//! dispatch, or by calling [`Device::cancel`]. Either way the request is
//! advisory: the pending operation is flagged and the driver's cancel hook is
//! invoked once, never before the action handler has returned. The
//! operation only ends when the driver completes it, with
//! `Cancelled` or with whatever it would have produced anyway.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};

use crate::action::ActionInput;
use crate::context::DriverContext;
use crate::device::Device;
use crate::pending::OperationId;

impl Device {
    /// Ask the driver to abort whatever is currently pending.
    ///
    /// Returns `false` when the device is idle or cancellation was already
    /// requested for the pending operation.
    pub fn cancel(&self) -> bool {
        let current = self.shared.slot.lock().pending.as_ref().map(|p| p.id);
        current.is_some_and(|id| self.request_cancellation(id))
    }

    /// Flag operation `id` as cancelled and forward the request to the driver.
    ///
    /// A no-op for any id other than the pending one, so a request racing
    /// with completion never touches the next operation.
    pub(crate) fn request_cancellation(&self, id: OperationId) -> bool {
        let shared = &self.shared;

        let (action, input) = {
            let mut slot = shared.slot.lock();
            match slot.pending.as_mut() {
                Some(pending) if pending.id == id => {
                    if pending.cancellation_requested {
                        trace!(device = %shared.label(), op_id = %id, "cancellation already requested");
                        return false;
                    }
                    pending.cancellation_requested = true;
                    if !pending.handler_started {
                        trace!(device = %shared.label(), op_id = %id, "cancel hook deferred until the handler returns");
                        return true;
                    }
                    (pending.action(), Arc::clone(&pending.input))
                }
                _ => {
                    trace!(device = %shared.label(), op_id = %id, "cancellation for finished operation ignored");
                    return false;
                }
            }
        };

        info!(device = %shared.label(), %action, op_id = %id, "cancellation requested");
        self.call_cancel_hook(id, input);
        true
    }

    /// Mark the handler of operation `id` as started, running a cancel hook
    /// that was requested while the handler was still being entered.
    ///
    /// Does nothing when the handler already completed the operation.
    pub(crate) fn handler_returned(&self, id: OperationId) {
        let shared = &self.shared;

        let deferred = {
            let mut slot = shared.slot.lock();
            match slot.pending.as_mut() {
                Some(pending) if pending.id == id => {
                    pending.handler_started = true;
                    pending
                        .cancellation_requested
                        .then(|| (pending.action(), Arc::clone(&pending.input)))
                }
                _ => None,
            }
        };

        if let Some((action, input)) = deferred {
            info!(device = %shared.label(), %action, op_id = %id, "cancellation requested during dispatch");
            self.call_cancel_hook(id, input);
        }
    }

    fn call_cancel_hook(&self, id: OperationId, input: Arc<ActionInput>) {
        match self.shared.class.cancel.clone() {
            Some(cancel) => cancel(DriverContext::new(self.clone(), id, input)),
            None => trace!(device = %self.shared.label(), op_id = %id, "driver has no cancel hook"),
        }
    }

    /// Forward `token` to operation `id` until the operation finishes.
    ///
    /// Needs a Tokio runtime; without one the token is ignored.
    pub(crate) fn watch_cancellation(
        &self,
        id: OperationId,
        token: CancellationToken,
        finished: CancellationToken,
    ) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(
                device = %self.shared.label(),
                op_id = %id,
                "no async runtime, cancellation token will not be observed"
            );
            return;
        };

        let device = Arc::downgrade(&self.shared);
        runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = finished.cancelled() => {}
                _ = token.cancelled() => {
                    if let Some(shared) = device.upgrade() {
                        Device { shared }.request_cancellation(id);
                    }
                }
            }
        });
    }
}
