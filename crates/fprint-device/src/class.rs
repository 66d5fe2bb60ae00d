//! Driver class descriptors: the per-kind capability table.
//!
//! A [`DriverClass`] is the immutable description of one kind of device: its
//! identity plus one handler slot per action. `open` and `close` are
//! mandatory; every other slot is optional, and an empty slot is the only
//! thing that makes an action unsupported. No capability flag is stored
//! anywhere else, so the predicates can never drift from the handlers.
//!
//! Handlers are plain synchronous closures. A handler starts the work (inline,
//! on a timer, on a spawned task, ...) and reports back later through the
//! [`DriverContext`] it was given.
//!
//! # Examples
//!
//! ```
//! use fprint_core::ActionKind;
//! use fprint_device::{ActionOutcome, DriverClass};
//!
//! let class = DriverClass::new(
//!     "demo",
//!     "Demo sensor",
//!     |ctx| { let _ = ctx.complete(Ok(ActionOutcome::Opened)); },
//!     |ctx| { let _ = ctx.complete(Ok(ActionOutcome::Closed)); },
//! )
//! .with_delete(|ctx| { let _ = ctx.complete(Ok(ActionOutcome::Deleted)); });
//!
//! assert!(class.supports(ActionKind::Delete));
//! assert!(!class.supports(ActionKind::Identify));
//! assert!(!class.has_storage());
//! ```

use std::fmt;
use std::sync::Arc;

use fprint_core::constants::DEFAULT_ENROLL_STAGES;
use fprint_core::{ActionKind, DeviceInfo, ScanType};

use crate::context::DriverContext;

/// Handler invoked to start one action.
pub type ActionHandler = Arc<dyn Fn(DriverContext) + Send + Sync>;

/// Capability table and identity of one driver kind.
///
/// Fields are public so that a class can be adjusted before devices are
/// created from it; devices keep the `Arc<DriverClass>` they were created
/// with, so adjusting a copy never affects existing instances.
#[derive(Clone)]
pub struct DriverClass {
    /// Short driver identifier (e.g. "fake_test_dev").
    pub id: String,

    /// Human readable driver name.
    pub full_name: String,

    /// How the finger is presented.
    pub scan_type: ScanType,

    /// Scans needed for one enrollment.
    pub nr_enroll_stages: u8,

    pub probe: Option<ActionHandler>,
    pub open: ActionHandler,
    pub close: ActionHandler,
    pub enroll: Option<ActionHandler>,
    pub verify: Option<ActionHandler>,
    pub identify: Option<ActionHandler>,
    pub capture: Option<ActionHandler>,
    pub list: Option<ActionHandler>,
    pub delete: Option<ActionHandler>,

    /// Abort hook. Forwarded a cancellation request at most once per action.
    pub cancel: Option<ActionHandler>,
}

impl DriverClass {
    /// Create a class with only the mandatory handlers.
    pub fn new<O, C>(id: impl Into<String>, full_name: impl Into<String>, open: O, close: C) -> Self
    where
        O: Fn(DriverContext) + Send + Sync + 'static,
        C: Fn(DriverContext) + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            full_name: full_name.into(),
            scan_type: ScanType::default(),
            nr_enroll_stages: DEFAULT_ENROLL_STAGES,
            probe: None,
            open: Arc::new(open),
            close: Arc::new(close),
            enroll: None,
            verify: None,
            identify: None,
            capture: None,
            list: None,
            delete: None,
            cancel: None,
        }
    }

    /// Set the scan type.
    pub fn with_scan_type(mut self, scan_type: ScanType) -> Self {
        self.scan_type = scan_type;
        self
    }

    /// Set the number of enroll stages.
    pub fn with_enroll_stages(mut self, stages: u8) -> Self {
        self.nr_enroll_stages = stages;
        self
    }

    /// Set the probe handler.
    pub fn with_probe(mut self, handler: impl Fn(DriverContext) + Send + Sync + 'static) -> Self {
        self.probe = Some(Arc::new(handler));
        self
    }

    /// Set the enroll handler.
    pub fn with_enroll(mut self, handler: impl Fn(DriverContext) + Send + Sync + 'static) -> Self {
        self.enroll = Some(Arc::new(handler));
        self
    }

    /// Set the verify handler.
    pub fn with_verify(mut self, handler: impl Fn(DriverContext) + Send + Sync + 'static) -> Self {
        self.verify = Some(Arc::new(handler));
        self
    }

    /// Set the identify handler.
    pub fn with_identify(
        mut self,
        handler: impl Fn(DriverContext) + Send + Sync + 'static,
    ) -> Self {
        self.identify = Some(Arc::new(handler));
        self
    }

    /// Set the capture handler.
    pub fn with_capture(
        mut self,
        handler: impl Fn(DriverContext) + Send + Sync + 'static,
    ) -> Self {
        self.capture = Some(Arc::new(handler));
        self
    }

    /// Set the handler listing stored prints.
    pub fn with_list(mut self, handler: impl Fn(DriverContext) + Send + Sync + 'static) -> Self {
        self.list = Some(Arc::new(handler));
        self
    }

    /// Set the handler deleting stored prints.
    pub fn with_delete(mut self, handler: impl Fn(DriverContext) + Send + Sync + 'static) -> Self {
        self.delete = Some(Arc::new(handler));
        self
    }

    /// Set the hook asked to abort the pending action.
    pub fn with_cancel(mut self, handler: impl Fn(DriverContext) + Send + Sync + 'static) -> Self {
        self.cancel = Some(Arc::new(handler));
        self
    }

    /// Look up the handler for an action.
    pub fn handler(&self, action: ActionKind) -> Option<&ActionHandler> {
        match action {
            ActionKind::Probe => self.probe.as_ref(),
            ActionKind::Open => Some(&self.open),
            ActionKind::Close => Some(&self.close),
            ActionKind::Enroll => self.enroll.as_ref(),
            ActionKind::Verify => self.verify.as_ref(),
            ActionKind::Identify => self.identify.as_ref(),
            ActionKind::Capture => self.capture.as_ref(),
            ActionKind::List => self.list.as_ref(),
            ActionKind::Delete => self.delete.as_ref(),
        }
    }

    /// Check whether the class can run an action.
    pub fn supports(&self, action: ActionKind) -> bool {
        self.handler(action).is_some()
    }

    /// Check whether prints are kept on the device.
    pub fn has_storage(&self) -> bool {
        self.supports(ActionKind::List)
    }

    /// Check whether running actions can be aborted by the driver.
    pub fn supports_cancel(&self) -> bool {
        self.cancel.is_some()
    }

    /// All actions this class can run, in lifecycle order.
    pub fn capabilities(&self) -> Vec<ActionKind> {
        ActionKind::ALL
            .into_iter()
            .filter(|action| self.supports(*action))
            .collect()
    }

    /// Identity a fresh device of this class starts with.
    pub fn default_info(&self) -> DeviceInfo {
        DeviceInfo::new(self.id.clone(), self.full_name.clone())
            .with_scan_type(self.scan_type)
            .with_enroll_stages(self.nr_enroll_stages)
    }
}

impl fmt::Debug for DriverClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverClass")
            .field("id", &self.id)
            .field("full_name", &self.full_name)
            .field("scan_type", &self.scan_type)
            .field("nr_enroll_stages", &self.nr_enroll_stages)
            .field("capabilities", &self.capabilities())
            .field("cancel", &self.supports_cancel())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn noop(_: DriverContext) {}

    fn minimal() -> DriverClass {
        DriverClass::new("minimal", "Minimal driver", noop, noop)
    }

    #[rstest]
    #[case(ActionKind::Open, true)]
    #[case(ActionKind::Close, true)]
    #[case(ActionKind::Probe, false)]
    #[case(ActionKind::Enroll, false)]
    #[case(ActionKind::Verify, false)]
    #[case(ActionKind::Identify, false)]
    #[case(ActionKind::Capture, false)]
    #[case(ActionKind::List, false)]
    #[case(ActionKind::Delete, false)]
    fn test_minimal_class_supports_only_mandatory(
        #[case] action: ActionKind,
        #[case] expected: bool,
    ) {
        assert_eq!(minimal().supports(action), expected);
    }

    #[test]
    fn test_supports_follows_handler_slots() {
        let mut class = minimal().with_identify(noop).with_list(noop);
        assert!(class.supports(ActionKind::Identify));
        assert!(class.has_storage());

        class.identify = None;
        class.list = None;
        assert!(!class.supports(ActionKind::Identify));
        assert!(!class.has_storage());
    }

    #[test]
    fn test_capabilities_in_lifecycle_order() {
        let class = minimal().with_delete(noop).with_probe(noop).with_cancel(noop);
        assert_eq!(
            class.capabilities(),
            vec![
                ActionKind::Probe,
                ActionKind::Open,
                ActionKind::Close,
                ActionKind::Delete
            ]
        );
        assert!(class.supports_cancel());
    }

    #[test]
    fn test_default_info_copies_identity() {
        let class = minimal()
            .with_scan_type(ScanType::Swipe)
            .with_enroll_stages(8);
        let info = class.default_info();

        assert_eq!(info.driver, "minimal");
        assert_eq!(info.name, "Minimal driver");
        assert_eq!(info.scan_type, ScanType::Swipe);
        assert_eq!(info.nr_enroll_stages, 8);
        assert_eq!(info.device_id, None);
    }

    #[test]
    fn test_debug_lists_capabilities() {
        let debug = format!("{:?}", minimal().with_verify(noop));
        assert!(debug.contains("Verify"));
        assert!(debug.contains("minimal"));
    }
}
