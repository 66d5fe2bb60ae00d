//! Device instances and the caller-facing operation surface.
//!
//! A [`Device`] pairs a shared, immutable [`DriverClass`] with a state slot it
//! owns exclusively. Every public operation comes in two styles:
//!
//! - `begin_*` runs the precondition checks right away, installs the pending
//!   operation, starts the driver handler and returns a [`PendingAction`]. The
//!   busy state is visible as soon as it returns.
//! - the plain `async fn` (`open`, `verify`, ...) calls `begin_*` and awaits
//!   the typed result.
//!
//! # Examples
//!
//! ```
//! use fprint_device::{Device, DeviceConfig};
//! use fprint_device::mock::FakeDriver;
//!
//! #[tokio::main]
//! async fn main() -> fprint_core::Result<()> {
//!     let (class, _handle) = FakeDriver::new();
//!     let device = Device::new(class, DeviceConfig::default());
//!
//!     device.open(None).await?;
//!     let print = device.enroll(device.new_print(), None, None).await?;
//!     let result = device.verify(print, None).await?;
//!     println!("matched: {}", result.matched);
//!     device.close(None).await?;
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use fprint_core::{ActionKind, DeviceInfo, Image, Print, Result};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::action::{ActionInput, EnrollProgress, IdentifyResult, VerifyResult};
use crate::class::DriverClass;
use crate::config::DeviceConfig;
use crate::lifecycle::{DeviceState, StateTransition, TransitionHistory};
use crate::pending::{OperationId, PendingAction, PendingOperation};

/// One sensor instance.
///
/// Cheap to clone; clones share the same state slot. At most one action is
/// pending at any time: overlapping calls are rejected with `Busy`, never
/// queued.
#[derive(Clone)]
pub struct Device {
    pub(crate) shared: Arc<Shared>,
}

pub(crate) struct Shared {
    pub(crate) class: Arc<DriverClass>,
    pub(crate) config: DeviceConfig,
    pub(crate) slot: Mutex<Slot>,
    next_op: AtomicU64,
}

impl Shared {
    pub(crate) fn next_operation_id(&self) -> OperationId {
        OperationId::from_raw(self.next_op.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn label(&self) -> &str {
        self.config.name.as_deref().unwrap_or(&self.class.id)
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let label = self.config.name.as_deref().unwrap_or(&self.class.id);
        let slot = self.slot.get_mut();
        if let Some(pending) = &slot.pending {
            warn!(
                device = %label,
                action = %pending.action(),
                op_id = %pending.id,
                "device dropped with an operation pending"
            );
            pending.finished.cancel();
        } else if slot.is_open {
            debug!(device = %label, "device dropped while open");
        }
    }
}

/// Mutable per-instance state. `pending` doubles as the current-action
/// register: the action is read off the pending record, so the two are set
/// and cleared together by construction.
pub(crate) struct Slot {
    pub(crate) is_open: bool,
    pub(crate) pending: Option<PendingOperation>,
    pub(crate) info: DeviceInfo,
    pub(crate) history: TransitionHistory,
}

impl Slot {
    pub(crate) fn state(&self) -> DeviceState {
        match &self.pending {
            Some(pending) => DeviceState::Busy(pending.action()),
            None => self.idle_state(),
        }
    }

    pub(crate) fn idle_state(&self) -> DeviceState {
        if self.is_open {
            DeviceState::Open
        } else {
            DeviceState::Closed
        }
    }

    pub(crate) fn record(&mut self, from: DeviceState, to: DeviceState, id: OperationId) {
        self.history.record(StateTransition::new(from, to, id));
    }
}

impl Device {
    /// Create a closed, idle device of the given class.
    pub fn new(class: impl Into<Arc<DriverClass>>, config: DeviceConfig) -> Self {
        let class = class.into();
        let slot = Slot {
            is_open: false,
            pending: None,
            info: class.default_info(),
            history: TransitionHistory::new(config.history_size),
        };

        Self {
            shared: Arc::new(Shared {
                class,
                config,
                slot: Mutex::new(slot),
                next_op: AtomicU64::new(1),
            }),
        }
    }

    /// Create a device and resolve its identity.
    ///
    /// Runs `Probe` when the class has a probe handler; a class without one
    /// yields the device straight away. The device is returned closed.
    ///
    /// # Errors
    ///
    /// Returns whatever the probe handler reported; the device is dropped.
    pub async fn new_probed(
        class: impl Into<Arc<DriverClass>>,
        config: DeviceConfig,
        cancellable: Option<CancellationToken>,
    ) -> Result<Self> {
        let device = Self::new(class, config);
        if device.supports(ActionKind::Probe) {
            device.probe(cancellable).await?;
        }
        Ok(device)
    }

    /// The capability table this device was created with.
    pub fn class(&self) -> &Arc<DriverClass> {
        &self.shared.class
    }

    /// Driver identifier.
    pub fn driver(&self) -> &str {
        &self.shared.class.id
    }

    /// Configuration the device was created with.
    pub fn config(&self) -> &DeviceConfig {
        &self.shared.config
    }

    /// Current identity; refined by a successful probe.
    pub fn info(&self) -> DeviceInfo {
        self.shared.slot.lock().info.clone()
    }

    /// Whether the device session is open.
    pub fn is_open(&self) -> bool {
        self.shared.slot.lock().is_open
    }

    /// Whether an action is in flight.
    pub fn is_busy(&self) -> bool {
        self.shared.slot.lock().pending.is_some()
    }

    /// The action in flight, if any.
    pub fn current_action(&self) -> Option<ActionKind> {
        self.shared
            .slot
            .lock()
            .pending
            .as_ref()
            .map(PendingOperation::action)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DeviceState {
        self.shared.slot.lock().state()
    }

    /// Snapshot of the recorded state transitions, oldest first.
    pub fn history(&self) -> Vec<StateTransition> {
        self.shared.slot.lock().history.to_vec()
    }

    /// The last `count` state transitions, oldest first.
    pub fn last_transitions(&self, count: usize) -> Vec<StateTransition> {
        self.shared.slot.lock().history.last(count)
    }

    /// Check whether the driver can run an action.
    ///
    /// Always answered from the handler slots of the class, never from a
    /// cached flag.
    pub fn supports(&self, action: ActionKind) -> bool {
        self.shared.class.supports(action)
    }

    /// Check whether prints are kept on the device (the driver can list them).
    pub fn has_storage(&self) -> bool {
        self.supports(ActionKind::List)
    }

    /// Check whether the driver can identify against a gallery.
    pub fn supports_identify(&self) -> bool {
        self.supports(ActionKind::Identify)
    }

    /// Check whether the driver can capture raw images.
    pub fn supports_capture(&self) -> bool {
        self.supports(ActionKind::Capture)
    }

    /// Create an empty template bound to this device's driver and device id.
    pub fn new_print(&self) -> Print {
        let print = Print::new(self.driver());
        match self.info().device_id {
            Some(device_id) => print.with_device_id(device_id),
            None => print,
        }
    }

    // Probe

    /// Start a probe and return its pending handle.
    pub fn begin_probe(&self, cancellable: Option<CancellationToken>) -> Result<PendingAction> {
        self.dispatch(ActionInput::Probe, cancellable)
    }

    /// Resolve device identity. Works open or closed and never changes the
    /// open state.
    pub async fn probe(&self, cancellable: Option<CancellationToken>) -> Result<DeviceInfo> {
        self.begin_probe(cancellable)?
            .await?
            .expect_unit(ActionKind::Probe)?;
        Ok(self.info())
    }

    // Open / Close

    /// Start opening the device.
    pub fn begin_open(&self, cancellable: Option<CancellationToken>) -> Result<PendingAction> {
        self.dispatch(ActionInput::Open, cancellable)
    }

    /// Establish the device session. On failure the device stays closed.
    pub async fn open(&self, cancellable: Option<CancellationToken>) -> Result<()> {
        self.begin_open(cancellable)?
            .await?
            .expect_unit(ActionKind::Open)
    }

    /// Start closing the device.
    pub fn begin_close(&self, cancellable: Option<CancellationToken>) -> Result<PendingAction> {
        self.dispatch(ActionInput::Close, cancellable)
    }

    /// Tear down the device session. The device ends up closed even when the
    /// driver reports an error.
    pub async fn close(&self, cancellable: Option<CancellationToken>) -> Result<()> {
        self.begin_close(cancellable)?
            .await?
            .expect_unit(ActionKind::Close)
    }

    // Enroll

    /// Start an enroll; stage reports go to `progress`.
    pub fn begin_enroll(
        &self,
        template: Print,
        cancellable: Option<CancellationToken>,
        progress: Option<mpsc::UnboundedSender<EnrollProgress>>,
    ) -> Result<PendingAction> {
        self.dispatch_with_progress(ActionInput::Enroll(template), cancellable, progress)
    }

    /// Enroll a new print. Intermediate stage reports go to `progress`.
    pub async fn enroll(
        &self,
        template: Print,
        cancellable: Option<CancellationToken>,
        progress: Option<mpsc::UnboundedSender<EnrollProgress>>,
    ) -> Result<Print> {
        self.begin_enroll(template, cancellable, progress)?
            .await?
            .into_enrolled()
    }

    // Verify

    /// Start a verify against `enrolled`.
    pub fn begin_verify(
        &self,
        enrolled: Print,
        cancellable: Option<CancellationToken>,
    ) -> Result<PendingAction> {
        self.dispatch(ActionInput::Verify(enrolled), cancellable)
    }

    /// Match a scan against one stored print.
    pub async fn verify(
        &self,
        enrolled: Print,
        cancellable: Option<CancellationToken>,
    ) -> Result<VerifyResult> {
        self.begin_verify(enrolled, cancellable)?
            .await?
            .into_verified()
    }

    // Identify

    /// Start an identify against `gallery`.
    pub fn begin_identify(
        &self,
        gallery: Vec<Print>,
        cancellable: Option<CancellationToken>,
    ) -> Result<PendingAction> {
        self.dispatch(ActionInput::Identify(gallery), cancellable)
    }

    /// Match a scan against a gallery of prints.
    pub async fn identify(
        &self,
        gallery: Vec<Print>,
        cancellable: Option<CancellationToken>,
    ) -> Result<IdentifyResult> {
        self.begin_identify(gallery, cancellable)?
            .await?
            .into_identified()
    }

    // Capture

    /// Start an image capture.
    pub fn begin_capture(
        &self,
        wait_for_finger: bool,
        cancellable: Option<CancellationToken>,
    ) -> Result<PendingAction> {
        self.dispatch(ActionInput::Capture { wait_for_finger }, cancellable)
    }

    /// Capture a raw image.
    pub async fn capture(
        &self,
        wait_for_finger: bool,
        cancellable: Option<CancellationToken>,
    ) -> Result<Image> {
        self.begin_capture(wait_for_finger, cancellable)?
            .await?
            .into_captured()
    }

    // Storage

    /// Start listing stored prints.
    pub fn begin_list_prints(
        &self,
        cancellable: Option<CancellationToken>,
    ) -> Result<PendingAction> {
        self.dispatch(ActionInput::List, cancellable)
    }

    /// List prints held in device storage.
    pub async fn list_prints(&self, cancellable: Option<CancellationToken>) -> Result<Vec<Print>> {
        self.begin_list_prints(cancellable)?.await?.into_listed()
    }

    /// Start deleting `print` from storage.
    pub fn begin_delete_print(
        &self,
        print: Print,
        cancellable: Option<CancellationToken>,
    ) -> Result<PendingAction> {
        self.dispatch(ActionInput::Delete(print), cancellable)
    }

    /// Delete a print from device storage.
    pub async fn delete_print(
        &self,
        print: Print,
        cancellable: Option<CancellationToken>,
    ) -> Result<()> {
        self.begin_delete_print(print, cancellable)?
            .await?
            .expect_unit(ActionKind::Delete)
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("driver", &self.shared.class.id)
            .field("name", &self.shared.label())
            .field("state", &self.state())
            .finish()
    }
}
