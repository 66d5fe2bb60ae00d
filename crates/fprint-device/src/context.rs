//! The handle a driver handler receives for one operation.

use std::fmt;
use std::sync::Arc;

use fprint_core::{ActionKind, DeviceError, Print, Result};

use crate::action::{ActionInput, ActionOutcome};
use crate::device::Device;
use crate::pending::OperationId;

/// Driver side of one dispatched operation.
///
/// Every handler call (the action handler as well as the cancel hook) receives
/// one. The context is bound to the operation it was created for: once that
/// operation has completed, further calls are rejected as contract violations,
/// which makes late timers and double completions harmless to whatever runs
/// next on the device.
#[derive(Clone)]
pub struct DriverContext {
    device: Device,
    id: OperationId,
    input: Arc<ActionInput>,
}

impl DriverContext {
    pub(crate) fn new(device: Device, id: OperationId, input: Arc<ActionInput>) -> Self {
        Self { device, id, input }
    }

    pub fn operation_id(&self) -> OperationId {
        self.id
    }

    pub fn action(&self) -> ActionKind {
        self.input.action()
    }

    /// The payload the caller dispatched.
    pub fn input(&self) -> &ActionInput {
        &self.input
    }

    /// The device running the operation.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Check whether this operation is still the one pending on the device.
    pub fn is_current(&self) -> bool {
        self.device
            .shared
            .slot
            .lock()
            .pending
            .as_ref()
            .is_some_and(|pending| pending.id == self.id)
    }

    /// Check whether the caller asked for this operation to be aborted.
    ///
    /// Purely advisory: the driver decides whether to honour it.
    pub fn is_cancellation_requested(&self) -> bool {
        self.device
            .shared
            .slot
            .lock()
            .pending
            .as_ref()
            .is_some_and(|pending| pending.id == self.id && pending.cancellation_requested)
    }

    /// Deliver the result of the operation.
    ///
    /// # Errors
    ///
    /// Returns `ContractViolation` when the operation already completed or the
    /// outcome does not belong to the pending action. A mismatched outcome
    /// still completes the operation; the caller receives the violation.
    pub fn complete(&self, result: Result<ActionOutcome>) -> Result<()> {
        self.device.complete_operation(self.id, result)
    }

    /// Shorthand for completing with an error.
    pub fn fail(&self, error: DeviceError) -> Result<()> {
        self.complete(Err(error))
    }

    /// Report enroll progress to the caller.
    ///
    /// # Errors
    ///
    /// Returns `ContractViolation` when the operation is not a pending enroll
    /// or `completed_stages` exceeds the stage count of the device.
    pub fn enroll_progress(
        &self,
        completed_stages: u8,
        print: Option<Print>,
        error: Option<DeviceError>,
    ) -> Result<()> {
        self.device
            .report_enroll_progress(self.id, completed_stages, print, error)
    }
}

impl fmt::Debug for DriverContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverContext")
            .field("driver", &self.device.driver())
            .field("id", &self.id)
            .field("action", &self.action())
            .finish()
    }
}
