//! Dispatchable device actions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the nine operations a device can be asked to perform.
///
/// `Open` and `Close` are mandatory for every driver; the rest are optional
/// capabilities, present only when the driver class registers a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Resolve device identity and presence. Does not need an open session.
    Probe,

    /// Establish the device session.
    Open,

    /// Tear down the device session.
    Close,

    /// Enroll a new print from one or more scans.
    Enroll,

    /// Match a scan against a single stored print.
    Verify,

    /// Match a scan against a gallery of prints.
    Identify,

    /// Capture a raw image.
    Capture,

    /// List prints held in on-device storage.
    List,

    /// Delete a print from on-device storage.
    Delete,
}

impl ActionKind {
    /// All actions, in lifecycle order.
    pub const ALL: [ActionKind; 9] = [
        ActionKind::Probe,
        ActionKind::Open,
        ActionKind::Close,
        ActionKind::Enroll,
        ActionKind::Verify,
        ActionKind::Identify,
        ActionKind::Capture,
        ActionKind::List,
        ActionKind::Delete,
    ];

    /// Whether every driver must provide a handler for this action.
    ///
    /// # Examples
    ///
    /// ```
    /// use fprint_core::ActionKind;
    ///
    /// assert!(ActionKind::Open.is_mandatory());
    /// assert!(!ActionKind::Identify.is_mandatory());
    /// ```
    pub fn is_mandatory(&self) -> bool {
        matches!(self, Self::Open | Self::Close)
    }

    /// Whether the action may only be dispatched on an open device.
    ///
    /// `Probe` and `Open` run against a closed device; everything else,
    /// `Close` included, needs an established session.
    pub fn requires_open(&self) -> bool {
        !matches!(self, Self::Probe | Self::Open)
    }

    /// Lower-case name used in log fields and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Probe => "probe",
            Self::Open => "open",
            Self::Close => "close",
            Self::Enroll => "enroll",
            Self::Verify => "verify",
            Self::Identify => "identify",
            Self::Capture => "capture",
            Self::List => "list",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
