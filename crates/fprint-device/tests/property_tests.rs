//! Property-based tests for the dispatch state machine.
//!
//! Arbitrary sequences of dispatches, completions and cancellations are run
//! against a driver that parks every context, and the device is checked
//! against a simple model after each step.

mod common;

use fprint_core::{ActionKind, DeviceError, DriverErrorKind, Image, Print};
use fprint_device::{
    ActionInput, ActionOutcome, Device, DeviceConfig, DriverClass, DriverContext, PendingAction,
};
use proptest::prelude::*;

use common::Parked;

const HISTORY_SIZE: usize = 16;

#[derive(Debug, Clone)]
enum Step {
    Dispatch(ActionKind),
    Complete { fail: bool },
    Cancel,
}

/// Strategy for generating one caller or driver step.
fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => prop::sample::select(ActionKind::ALL.to_vec()).prop_map(Step::Dispatch),
        2 => any::<bool>().prop_map(|fail| Step::Complete { fail }),
        1 => Just(Step::Cancel),
    ]
}

fn parking_class(parked: &Parked) -> DriverClass {
    DriverClass::new("parking", "Parking driver", parked.handler(), parked.handler())
        .with_probe(parked.handler())
        .with_enroll(parked.handler())
        .with_verify(parked.handler())
        .with_identify(parked.handler())
        .with_capture(parked.handler())
        .with_list(parked.handler())
        .with_delete(parked.handler())
}

fn input_for(action: ActionKind) -> ActionInput {
    let print = Print::new("parking");
    match action {
        ActionKind::Probe => ActionInput::Probe,
        ActionKind::Open => ActionInput::Open,
        ActionKind::Close => ActionInput::Close,
        ActionKind::Enroll => ActionInput::Enroll(print),
        ActionKind::Verify => ActionInput::Verify(print),
        ActionKind::Identify => ActionInput::Identify(vec![print]),
        ActionKind::Capture => ActionInput::Capture {
            wait_for_finger: false,
        },
        ActionKind::List => ActionInput::List,
        ActionKind::Delete => ActionInput::Delete(print),
    }
}

fn success_for(ctx: &DriverContext) -> ActionOutcome {
    let print = ctx
        .input()
        .print()
        .cloned()
        .unwrap_or_else(|| Print::new("parking"));
    match ctx.action() {
        ActionKind::Probe => ActionOutcome::Probed {
            device_id: None,
            name: None,
        },
        ActionKind::Open => ActionOutcome::Opened,
        ActionKind::Close => ActionOutcome::Closed,
        ActionKind::Enroll => ActionOutcome::Enrolled(print),
        ActionKind::Verify => ActionOutcome::verified(true, print),
        ActionKind::Identify => ActionOutcome::identified(Some(0), print),
        ActionKind::Capture => ActionOutcome::Captured(Image::new(1, 1)),
        ActionKind::List => ActionOutcome::Listed(Vec::new()),
        ActionKind::Delete => ActionOutcome::Deleted,
    }
}

/// Error a dispatch on an idle device should fail with, if any.
fn idle_rejection(action: ActionKind, open: bool) -> Option<DeviceError> {
    match action {
        ActionKind::Open if open => Some(DeviceError::AlreadyOpen),
        _ if action.requires_open() && !open => Some(DeviceError::NotOpen),
        _ => None,
    }
}

struct InFlight {
    action: ActionKind,
    pending: PendingAction,
    cancel_requested: bool,
}

async fn run(steps: Vec<Step>) -> Result<(), TestCaseError> {
    let parked = Parked::default();
    let device = Device::new(
        parking_class(&parked),
        DeviceConfig::default().with_history_size(HISTORY_SIZE),
    );

    let mut open = false;
    let mut in_flight: Option<InFlight> = None;
    let mut finished: Option<DriverContext> = None;

    for step in steps {
        match step {
            Step::Dispatch(action) => {
                let busy = in_flight.as_ref().map(|op| op.action);
                let result = device.dispatch(input_for(action), None);
                match (busy, result) {
                    (Some(busy), result) => {
                        prop_assert_eq!(result.unwrap_err(), DeviceError::busy(busy));
                    }
                    (None, Ok(pending)) => {
                        prop_assert_eq!(idle_rejection(action, open), None);
                        prop_assert_eq!(pending.action(), action);
                        in_flight = Some(InFlight {
                            action,
                            pending,
                            cancel_requested: false,
                        });
                    }
                    (None, Err(error)) => {
                        prop_assert_eq!(Some(error), idle_rejection(action, open));
                    }
                }
            }
            Step::Complete { fail } => match in_flight.take() {
                Some(op) => {
                    let ctx = parked.take();
                    let result = if fail {
                        Err(DeviceError::driver(DriverErrorKind::General))
                    } else {
                        Ok(success_for(&ctx))
                    };

                    prop_assert!(ctx.complete(result.clone()).is_ok());
                    prop_assert_eq!(op.pending.await, result);

                    match op.action {
                        ActionKind::Open => open = !fail,
                        ActionKind::Close => open = false,
                        _ => {}
                    }
                    finished = Some(ctx);
                }
                None => {
                    if let Some(stale) = &finished {
                        let error = stale.complete(Ok(success_for(stale))).unwrap_err();
                        prop_assert!(error.is_contract_violation());
                    }
                }
            },
            Step::Cancel => {
                let expected = in_flight
                    .as_ref()
                    .is_some_and(|op| !op.cancel_requested);
                prop_assert_eq!(device.cancel(), expected);
                if let Some(op) = in_flight.as_mut() {
                    op.cancel_requested = true;
                }
            }
        }

        let current = in_flight.as_ref().map(|op| op.action);
        prop_assert_eq!(device.is_busy(), device.current_action().is_some());
        prop_assert_eq!(device.current_action(), current);
        prop_assert_eq!(device.is_open(), open);
        prop_assert_eq!(parked.len(), usize::from(current.is_some()));
    }

    let history = device.history();
    prop_assert!(history.len() <= HISTORY_SIZE);
    for transition in &history {
        prop_assert!(transition.from.can_transition_to(&transition.to));
    }

    Ok(())
}

proptest! {
    /// Property: the device agrees with the model after every step.
    ///
    /// Busy and current action always agree, overlapping dispatches are
    /// rejected with `Busy`, every accepted dispatch resolves exactly once
    /// with what the driver reported, and late completions are rejected.
    #[test]
    fn prop_dispatch_sequences_keep_invariants(steps in prop::collection::vec(step(), 1..60)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(run(steps))?;
    }

    /// Property: the fake identify always reports the first marked candidate.
    #[test]
    fn prop_fake_identify_matches_first_marked(
        len in 1usize..64,
        marks in prop::collection::vec(any::<prop::sample::Index>(), 1..4),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let (device, _handle) = common::open_fake_device().await;
            let mut prints = common::gallery(&device, len);
            let marked: Vec<usize> = marks.iter().map(|index| index.index(len)).collect();
            for &index in &marked {
                prints[index].set_description(fprint_device::mock::FAKE_VERIFIED_DESCRIPTION);
            }

            let result = device.identify(prints, None).await.unwrap();
            prop_assert_eq!(result.matched_index, marked.iter().min().copied());
            Ok(())
        })?;
    }
}
