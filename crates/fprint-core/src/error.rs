//! Error types for device operations.
//!
//! Errors fall into three groups:
//!
//! - **Preconditions** (`NotSupported`, `AlreadyOpen`, `NotOpen`, `Busy`) are
//!   detected by the dispatcher before any driver code runs.
//! - **Driver outcomes** (`Cancelled`, `Driver`, `Retry`) are produced by a
//!   driver handler and passed through to the caller verbatim.
//! - **Contract violations** indicate a defective driver and are never the
//!   caller's fault.

use crate::action::ActionKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type alias for device operations.
pub type Result<T> = std::result::Result<T, DeviceError>;

/// Opaque failure classes a driver may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum DriverErrorKind {
    /// Unspecified failure.
    General,

    /// The driver recognised the request but the hardware cannot do it.
    NotSupported,

    /// Protocol error talking to the sensor.
    Proto,

    /// Data passed to or returned by the sensor was invalid.
    DataInvalid,

    /// The referenced print does not exist in device storage.
    DataNotFound,

    /// Device storage is full.
    DataFull,

    /// The device was unplugged during the operation.
    Removed,
}

impl fmt::Display for DriverErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::General => "general error",
            Self::NotSupported => "operation not supported by hardware",
            Self::Proto => "protocol error",
            Self::DataInvalid => "invalid data",
            Self::DataNotFound => "print not found",
            Self::DataFull => "storage full",
            Self::Removed => "device removed",
        };
        f.write_str(s)
    }
}

/// Scan problems the user can fix by trying again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryKind {
    /// The scan failed for an unspecified reason.
    General,

    /// The swipe was too short.
    TooShort,

    /// The finger was not centred on the sensor.
    CenterFinger,

    /// The finger must be lifted and placed again.
    RemoveFinger,
}

impl fmt::Display for RetryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::General => "scan did not succeed",
            Self::TooShort => "swipe was too short",
            Self::CenterFinger => "finger was not centred",
            Self::RemoveFinger => "remove finger and try again",
        };
        f.write_str(s)
    }
}

/// Errors that can occur while dispatching or running a device action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// The driver has no handler for this action.
    #[error("Unsupported operation: {action}")]
    NotSupported { action: ActionKind },

    /// `Open` was requested on a device that is already open.
    #[error("Device is already open")]
    AlreadyOpen,

    /// An action that needs a session was requested on a closed device.
    #[error("Device is not open")]
    NotOpen,

    /// Another action is still pending on this device.
    #[error("Device is busy running {action}")]
    Busy { action: ActionKind },

    /// The driver honoured a cancellation request.
    #[error("Operation was cancelled")]
    Cancelled,

    /// Failure reported by the driver, passed through unchanged.
    #[error("Driver error: {kind}{}", message_suffix(.message))]
    Driver {
        kind: DriverErrorKind,
        message: Option<String>,
    },

    /// The scan should be retried by the user.
    #[error("Retry: {0}")]
    Retry(RetryKind),

    /// The caller stopped waiting before the driver completed.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// A driver broke the completion contract.
    #[error("Driver contract violation: {reason}")]
    ContractViolation { reason: String },
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

impl DeviceError {
    /// Create a new unsupported operation error.
    pub fn not_supported(action: ActionKind) -> Self {
        Self::NotSupported { action }
    }

    /// Create a new busy error naming the pending action.
    pub fn busy(action: ActionKind) -> Self {
        Self::Busy { action }
    }

    /// Create a new driver error without a message.
    ///
    /// # Examples
    ///
    /// ```
    /// use fprint_core::{DeviceError, DriverErrorKind};
    ///
    /// let error = DeviceError::driver(DriverErrorKind::General);
    /// assert_eq!(error.driver_kind(), Some(DriverErrorKind::General));
    /// ```
    pub fn driver(kind: DriverErrorKind) -> Self {
        Self::Driver {
            kind,
            message: None,
        }
    }

    /// Create a new driver error with a message.
    pub fn driver_with_message(kind: DriverErrorKind, message: impl Into<String>) -> Self {
        Self::Driver {
            kind,
            message: Some(message.into()),
        }
    }

    /// Create a new retry error.
    pub fn retry(kind: RetryKind) -> Self {
        Self::Retry(kind)
    }

    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a new contract violation error.
    pub fn contract(reason: impl Into<String>) -> Self {
        Self::ContractViolation {
            reason: reason.into(),
        }
    }

    /// True for failures detected before any driver code ran.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NotSupported { .. } | Self::AlreadyOpen | Self::NotOpen | Self::Busy { .. }
        )
    }

    /// True if the driver honoured a cancellation request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// True if the user should simply try the scan again.
    pub fn is_retry(&self) -> bool {
        matches!(self, Self::Retry(_))
    }

    /// True if a driver broke the completion contract.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::ContractViolation { .. })
    }

    /// The driver-reported kind, if this is a driver error.
    pub fn driver_kind(&self) -> Option<DriverErrorKind> {
        match self {
            Self::Driver { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_not_supported_error() {
        let error = DeviceError::not_supported(ActionKind::Identify);
        assert!(error.is_precondition());
        assert_eq!(error.to_string(), "Unsupported operation: identify");
    }

    #[test]
    fn test_busy_error() {
        let error = DeviceError::busy(ActionKind::Delete);
        assert!(error.is_precondition());
        assert_eq!(error.to_string(), "Device is busy running delete");
    }

    #[test]
    fn test_driver_error_display() {
        let error = DeviceError::driver(DriverErrorKind::General);
        assert_eq!(error.to_string(), "Driver error: general error");

        let error = DeviceError::driver_with_message(DriverErrorKind::Proto, "bad checksum");
        assert_eq!(error.to_string(), "Driver error: protocol error: bad checksum");
    }

    #[test]
    fn test_contract_violation_error() {
        let error = DeviceError::contract("completed twice");
        assert!(error.is_contract_violation());
        assert!(!error.is_precondition());
        assert_eq!(
            error.to_string(),
            "Driver contract violation: completed twice"
        );
    }

    #[rstest]
    #[case(DeviceError::AlreadyOpen, true)]
    #[case(DeviceError::NotOpen, true)]
    #[case(DeviceError::Cancelled, false)]
    #[case(DeviceError::retry(RetryKind::TooShort), false)]
    #[case(DeviceError::timeout(100), false)]
    #[case(DeviceError::driver(DriverErrorKind::DataFull), false)]
    fn test_precondition_classification(#[case] error: DeviceError, #[case] expected: bool) {
        assert_eq!(error.is_precondition(), expected);
    }

    #[test]
    fn test_error_identity_survives_clone() {
        let reported = DeviceError::driver_with_message(DriverErrorKind::General, "call 1");
        let delivered = reported.clone();
        assert_eq!(reported, delivered);
        assert_ne!(
            delivered,
            DeviceError::driver_with_message(DriverErrorKind::General, "call 2")
        );
    }
}
