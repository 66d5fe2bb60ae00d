//! Action dispatch and the completion contract.
//!
//! Dispatch checks preconditions and installs the pending operation under the
//! slot lock, then calls the driver handler with the lock released. The
//! completion path runs the other way round: the pending record is taken and
//! the state settled under the lock, and the caller is notified after it is
//! released. Handlers may therefore complete synchronously from inside the
//! dispatch call without deadlocking.

use std::sync::Arc;

use fprint_core::{ActionKind, DeviceError, Print, Result};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use crate::action::{ActionInput, ActionOutcome, EnrollProgress};
use crate::context::DriverContext;
use crate::device::{Device, Slot};
use crate::lifecycle::DeviceState;
use crate::pending::{OperationId, PendingAction, PendingOperation};

impl Device {
    /// Start an action.
    ///
    /// Checks run in a fixed order and the first failure wins:
    ///
    /// 1. the driver has no handler for the action: `NotSupported`
    /// 2. another action is pending: `Busy`
    /// 3. `Open` on an open device: `AlreadyOpen`; anything but `Probe` and
    ///    `Open` on a closed device: `NotOpen`
    /// 4. `cancellable` is already cancelled: `Cancelled`
    ///
    /// A rejected dispatch leaves the device untouched and no driver code
    /// runs. Otherwise the device is busy by the time this returns and the
    /// handler has been invoked exactly once.
    pub fn dispatch(
        &self,
        input: ActionInput,
        cancellable: Option<CancellationToken>,
    ) -> Result<PendingAction> {
        self.dispatch_with_progress(input, cancellable, None)
    }

    pub(crate) fn dispatch_with_progress(
        &self,
        input: ActionInput,
        cancellable: Option<CancellationToken>,
        progress: Option<mpsc::UnboundedSender<EnrollProgress>>,
    ) -> Result<PendingAction> {
        let shared = &self.shared;
        let action = input.action();

        let Some(handler) = shared.class.handler(action).cloned() else {
            debug!(device = %shared.label(), %action, "action not supported by driver");
            return Err(DeviceError::not_supported(action));
        };

        let input = Arc::new(input);
        let (completion_sink, receiver) = oneshot::channel();
        let finished = CancellationToken::new();
        let progress_sink = progress.filter(|_| action == ActionKind::Enroll);

        let id = {
            let mut slot = shared.slot.lock();
            check_preconditions(&slot, action, cancellable.as_ref()).inspect_err(|error| {
                debug!(device = %shared.label(), %action, %error, "dispatch rejected");
            })?;

            let id = shared.next_operation_id();
            let from = slot.state();
            slot.pending = Some(PendingOperation {
                id,
                input: Arc::clone(&input),
                cancellation_requested: false,
                handler_started: false,
                completion_sink,
                progress_sink,
                finished: finished.clone(),
            });
            slot.record(from, DeviceState::Busy(action), id);
            id
        };

        debug!(
            device = %shared.label(),
            driver = %shared.class.id,
            %action,
            op_id = %id,
            "dispatching action"
        );

        handler(DriverContext::new(self.clone(), id, input));
        self.handler_returned(id);

        if let Some(token) = cancellable {
            self.watch_cancellation(id, token, finished);
        }

        Ok(PendingAction::new(id, action, receiver))
    }

    /// Consume the pending operation `id` and hand its result to the caller.
    pub(crate) fn complete_operation(
        &self,
        id: OperationId,
        result: Result<ActionOutcome>,
    ) -> Result<()> {
        let shared = &self.shared;

        let (pending, delivered, violation) = {
            let mut slot = shared.slot.lock();
            let Some(pending) = slot.pending.take_if(|pending| pending.id == id) else {
                let reason = match &slot.pending {
                    Some(current) => format!(
                        "operation {id} completed while {} {} is pending",
                        current.action(),
                        current.id
                    ),
                    None => format!("operation {id} completed after it already finished"),
                };
                drop(slot);
                error!(device = %shared.label(), op_id = %id, %reason, "completion rejected");
                return Err(DeviceError::contract(reason));
            };

            let action = pending.action();
            let (delivered, violation) = match result {
                Ok(outcome) => match check_outcome(&pending.input, &outcome) {
                    Ok(()) => (Ok(outcome), None),
                    Err(violation) => (Err(violation.clone()), Some(violation)),
                },
                Err(error) => (Err(error), None),
            };

            settle(&mut slot, action, &delivered);
            let to = slot.idle_state();
            slot.record(DeviceState::Busy(action), to, id);
            (pending, delivered, violation)
        };

        pending.finished.cancel();
        let action = pending.action();

        match (&delivered, &violation) {
            (_, Some(violation)) => error!(
                device = %shared.label(),
                %action,
                op_id = %id,
                error = %violation,
                "driver broke the completion contract"
            ),
            (Ok(_), None) => debug!(device = %shared.label(), %action, op_id = %id, "action completed"),
            (Err(error), None) => debug!(
                device = %shared.label(),
                %action,
                op_id = %id,
                %error,
                "action failed"
            ),
        }

        if pending.completion_sink.send(delivered).is_err() {
            trace!(device = %shared.label(), op_id = %id, "caller stopped waiting, result discarded");
        }

        violation.map_or(Ok(()), Err)
    }

    /// Forward an enroll stage report from the driver to the caller.
    pub(crate) fn report_enroll_progress(
        &self,
        id: OperationId,
        completed_stages: u8,
        print: Option<Print>,
        error: Option<DeviceError>,
    ) -> Result<()> {
        let shared = &self.shared;

        let checked = {
            let slot = shared.slot.lock();
            match slot.pending.as_ref() {
                None => Err(format!("enroll progress from finished operation {id}")),
                Some(pending) if pending.id != id => {
                    Err(format!("enroll progress from stale operation {id}"))
                }
                Some(pending) if pending.action() != ActionKind::Enroll => Err(format!(
                    "enroll progress reported during {}",
                    pending.action()
                )),
                Some(_) if completed_stages > slot.info.nr_enroll_stages => Err(format!(
                    "enroll progress {completed_stages} exceeds {} stages",
                    slot.info.nr_enroll_stages
                )),
                Some(pending) => Ok(pending.progress_sink.clone()),
            }
        };

        let sink = checked.map_err(|reason| {
            error!(device = %shared.label(), op_id = %id, %reason, "enroll progress rejected");
            DeviceError::contract(reason)
        })?;

        trace!(device = %shared.label(), op_id = %id, completed_stages, "enroll progress");
        if let Some(sink) = sink {
            let _ = sink.send(EnrollProgress {
                completed_stages,
                print,
                error,
            });
        }
        Ok(())
    }
}

fn check_preconditions(
    slot: &Slot,
    action: ActionKind,
    cancellable: Option<&CancellationToken>,
) -> Result<()> {
    if let Some(pending) = &slot.pending {
        return Err(DeviceError::busy(pending.action()));
    }
    if action == ActionKind::Open && slot.is_open {
        return Err(DeviceError::AlreadyOpen);
    }
    if action.requires_open() && !slot.is_open {
        return Err(DeviceError::NotOpen);
    }
    if cancellable.is_some_and(CancellationToken::is_cancelled) {
        return Err(DeviceError::Cancelled);
    }
    Ok(())
}

/// Check an outcome against the input it answers.
fn check_outcome(input: &ActionInput, outcome: &ActionOutcome) -> Result<()> {
    if outcome.action() != input.action() {
        return Err(DeviceError::contract(format!(
            "{} outcome delivered for pending {}",
            outcome.action(),
            input.action()
        )));
    }

    if let (ActionInput::Identify(gallery), ActionOutcome::Identified(result)) = (input, outcome)
        && let Some(index) = result.matched_index
        && index >= gallery.len()
    {
        return Err(DeviceError::contract(format!(
            "identify matched index {index} of a {} print gallery",
            gallery.len()
        )));
    }

    Ok(())
}

/// Apply the effect of a finished action to the open flag and identity.
fn settle(slot: &mut Slot, action: ActionKind, delivered: &Result<ActionOutcome>) {
    match (action, delivered) {
        (ActionKind::Open, Ok(_)) => slot.is_open = true,
        (ActionKind::Open, Err(_)) => slot.is_open = false,
        (ActionKind::Close, _) => {
            if let Err(error) = delivered {
                warn!(driver = %slot.info.driver, %error, "close failed, device closed anyway");
            }
            slot.is_open = false;
        }
        (ActionKind::Probe, Ok(ActionOutcome::Probed { device_id, name })) => {
            if let Some(device_id) = device_id {
                slot.info.device_id = Some(device_id.clone());
            }
            if let Some(name) = name {
                slot.info.name = name.clone();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn gallery(len: usize) -> ActionInput {
        ActionInput::Identify((0..len).map(|_| Print::new("drv")).collect())
    }

    #[rstest]
    #[case(Some(0), true)]
    #[case(Some(2), true)]
    #[case(Some(3), false)]
    #[case(None, true)]
    fn test_identify_index_range(#[case] index: Option<usize>, #[case] valid: bool) {
        let outcome = ActionOutcome::identified(index, Print::new("drv"));
        assert_eq!(check_outcome(&gallery(3), &outcome).is_ok(), valid);
    }

    #[test]
    fn test_mismatched_outcome_is_rejected() {
        let error = check_outcome(&ActionInput::List, &ActionOutcome::Deleted).unwrap_err();
        assert!(error.is_contract_violation());
        assert!(error.to_string().contains("delete outcome delivered for pending list"));
    }

    #[test]
    fn test_empty_gallery_rejects_any_index() {
        let outcome = ActionOutcome::identified(Some(0), Print::new("drv"));
        assert!(check_outcome(&gallery(0), &outcome).is_err());
    }
}
