//! Scriptable fake driver.
//!
//! Every handler records itself as the last call and stores the input it was
//! given, then completes inline from the values scripted on the handle.

use std::sync::Arc;

use fprint_core::{ActionKind, DeviceError, Image, Print};
use parking_lot::Mutex;

use crate::action::{ActionInput, ActionOutcome};
use crate::class::DriverClass;
use crate::context::DriverContext;
use crate::pending::OperationId;

/// Driver id of the fake driver.
pub const FAKE_DRIVER_ID: &str = "fake_test_dev";

/// Device id reported by the fake probe.
pub const FAKE_DEVICE_ID: &str = "0";

/// Description marking the gallery entry the fake identify matches.
pub const FAKE_VERIFIED_DESCRIPTION: &str = "fake-verified";

const FAKE_FULL_NAME: &str = "Virtual device for debugging";
const FAKE_IMAGE_SIZE: u32 = 500;

/// A driver entry point observed by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    /// An action handler ran.
    Action(ActionKind),

    /// The cancel hook ran.
    Cancel,

    /// Set by tests that wrap fake handlers with their own.
    Custom(String),
}

#[derive(Debug, Default)]
struct FakeState {
    last_called: Option<FakeCall>,
    action_data: Option<ActionInput>,
    ret_error: Option<DeviceError>,
    ret_match: bool,
    ret_print: Option<Print>,
    ret_image: Option<Image>,
    ret_list: Option<Vec<Print>>,
    cancelled: Option<OperationId>,
}

/// Fake driver factory.
///
/// # Examples
///
/// ```
/// use fprint_core::{ActionKind, DeviceError, DriverErrorKind};
/// use fprint_device::{Device, DeviceConfig};
/// use fprint_device::mock::{FakeCall, FakeDriver};
///
/// #[tokio::main]
/// async fn main() {
///     let (class, handle) = FakeDriver::new();
///     let device = Device::new(class, DeviceConfig::default());
///
///     handle.ret_error(DeviceError::driver(DriverErrorKind::General));
///     let error = device.open(None).await.unwrap_err();
///
///     assert_eq!(error, DeviceError::driver(DriverErrorKind::General));
///     assert_eq!(handle.last_called(), Some(FakeCall::Action(ActionKind::Open)));
///     assert!(!device.is_open());
/// }
/// ```
pub struct FakeDriver;

impl FakeDriver {
    /// Create a class supporting every action, plus the handle scripting it.
    ///
    /// The returned class can be adjusted (handler slots cleared or wrapped)
    /// before devices are created from it.
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (DriverClass, FakeDriverHandle) {
        let handle = FakeDriverHandle::default();

        let class = DriverClass::new(
            FAKE_DRIVER_ID,
            FAKE_FULL_NAME,
            handle.handler(|_, _| Ok(ActionOutcome::Opened)),
            handle.handler(|_, _| Ok(ActionOutcome::Closed)),
        )
        .with_probe(handle.handler(|_, _| {
            Ok(ActionOutcome::Probed {
                device_id: Some(FAKE_DEVICE_ID.to_string()),
                name: None,
            })
        }))
        .with_enroll(handle.handler(|state, ctx| {
            let template = ctx.input().print().cloned();
            state
                .ret_print
                .take()
                .or(template)
                .map(ActionOutcome::Enrolled)
                .ok_or_else(|| DeviceError::contract("enroll without a template"))
        }))
        .with_verify(handle.handler(|state, ctx| {
            let print = ctx
                .input()
                .print()
                .cloned()
                .ok_or_else(|| DeviceError::contract("verify without a print"))?;
            Ok(ActionOutcome::verified(state.ret_match, print))
        }))
        .with_identify(handle.handler(|state, ctx| {
            let matched_index = ctx.input().gallery().and_then(|gallery| {
                gallery
                    .iter()
                    .position(|print| print.description() == Some(FAKE_VERIFIED_DESCRIPTION))
            });
            let print = state
                .ret_print
                .take()
                .unwrap_or_else(|| ctx.device().new_print());
            Ok(ActionOutcome::identified(matched_index, print))
        }))
        .with_capture(handle.handler(|state, _| {
            let image = state
                .ret_image
                .take()
                .unwrap_or_else(|| Image::new(FAKE_IMAGE_SIZE, FAKE_IMAGE_SIZE));
            Ok(ActionOutcome::Captured(image))
        }))
        .with_list(handle.handler(|state, _| {
            Ok(ActionOutcome::Listed(state.ret_list.take().unwrap_or_default()))
        }))
        .with_delete(handle.handler(|_, _| Ok(ActionOutcome::Deleted)))
        .with_cancel({
            let handle = handle.clone();
            move |ctx: DriverContext| {
                let mut state = handle.state.lock();
                state.last_called = Some(FakeCall::Cancel);
                state.cancelled = Some(ctx.operation_id());
            }
        });

        (class, handle)
    }
}

/// Handle for scripting and observing a fake driver.
///
/// Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct FakeDriverHandle {
    state: Arc<Mutex<FakeState>>,
}

impl FakeDriverHandle {
    /// Fail the next action with `error`. Takes precedence over any scripted
    /// result.
    pub fn ret_error(&self, error: DeviceError) {
        self.state.lock().ret_error = Some(error);
    }

    /// Verdict of subsequent verify actions.
    pub fn ret_match(&self, matched: bool) {
        self.state.lock().ret_match = matched;
    }

    /// Print returned by the next enroll or identify.
    pub fn ret_print(&self, print: Print) {
        self.state.lock().ret_print = Some(print);
    }

    /// Image returned by the next capture.
    pub fn ret_image(&self, image: Image) {
        self.state.lock().ret_image = Some(image);
    }

    /// Prints returned by the next list.
    pub fn ret_list(&self, prints: Vec<Print>) {
        self.state.lock().ret_list = Some(prints);
    }

    pub fn last_called(&self) -> Option<FakeCall> {
        self.state.lock().last_called.clone()
    }

    pub fn set_last_called(&self, call: FakeCall) {
        self.state.lock().last_called = Some(call);
    }

    /// Input of the most recent action handler call.
    pub fn action_data(&self) -> Option<ActionInput> {
        self.state.lock().action_data.clone()
    }

    /// Wrap an outcome builder into a handler running the common prologue
    /// and completion.
    fn handler<F>(&self, build: F) -> impl Fn(DriverContext) + Send + Sync + 'static
    where
        F: Fn(&mut FakeState, &DriverContext) -> fprint_core::Result<ActionOutcome>
            + Send
            + Sync
            + 'static,
    {
        let state = Arc::clone(&self.state);
        move |ctx: DriverContext| {
            let result = {
                let mut state = state.lock();
                state.last_called = Some(FakeCall::Action(ctx.action()));
                state.action_data = Some(ctx.input().clone());

                if state
                    .cancelled
                    .take_if(|id| *id == ctx.operation_id())
                    .is_some()
                {
                    Err(DeviceError::Cancelled)
                } else if let Some(error) = state.ret_error.take() {
                    Err(error)
                } else {
                    build(&mut *state, &ctx)
                }
            };
            let _ = ctx.complete(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceConfig;
    use crate::device::Device;

    #[test]
    fn test_fake_class_supports_everything() {
        let (class, _handle) = FakeDriver::new();
        assert_eq!(class.id, FAKE_DRIVER_ID);
        assert_eq!(class.capabilities(), ActionKind::ALL.to_vec());
        assert!(class.supports_cancel());
    }

    #[tokio::test]
    async fn test_ret_error_is_used_once() {
        let (class, handle) = FakeDriver::new();
        let device = Device::new(class, DeviceConfig::default());

        handle.ret_error(DeviceError::NotOpen);
        assert_eq!(device.open(None).await, Err(DeviceError::NotOpen));
        assert!(device.open(None).await.is_ok());
        assert!(device.is_open());
    }

    #[tokio::test]
    async fn test_records_action_data() {
        let (class, handle) = FakeDriver::new();
        let device = Device::new(class, DeviceConfig::default());
        device.open(None).await.unwrap();

        device.capture(false, None).await.unwrap();
        assert_eq!(
            handle.action_data(),
            Some(ActionInput::Capture {
                wait_for_finger: false
            })
        );
        assert_eq!(
            handle.last_called(),
            Some(FakeCall::Action(ActionKind::Capture))
        );
    }
}
