//! Action inputs and outcomes.
//!
//! Both are unions keyed by [`ActionKind`]. An input always names its action,
//! so a dispatch can never pair an action with the wrong payload; an outcome
//! names the action it completes, which is what the completion contract checks
//! against the pending operation.

use fprint_core::{ActionKind, DeviceError, Image, Print, Result};
use serde::{Deserialize, Serialize};

/// Input payload of a dispatched action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action", content = "input")]
pub enum ActionInput {
    Probe,
    Open,
    Close,
    /// Template print whose metadata the enrolled print should carry.
    Enroll(Print),
    /// Stored print to match against.
    Verify(Print),
    /// Gallery of candidate prints.
    Identify(Vec<Print>),
    Capture {
        wait_for_finger: bool,
    },
    List,
    /// Stored print to delete.
    Delete(Print),
}

impl ActionInput {
    /// The action this input belongs to.
    pub fn action(&self) -> ActionKind {
        match self {
            Self::Probe => ActionKind::Probe,
            Self::Open => ActionKind::Open,
            Self::Close => ActionKind::Close,
            Self::Enroll(_) => ActionKind::Enroll,
            Self::Verify(_) => ActionKind::Verify,
            Self::Identify(_) => ActionKind::Identify,
            Self::Capture { .. } => ActionKind::Capture,
            Self::List => ActionKind::List,
            Self::Delete(_) => ActionKind::Delete,
        }
    }

    /// The single print carried by enroll, verify and delete.
    pub fn print(&self) -> Option<&Print> {
        match self {
            Self::Enroll(print) | Self::Verify(print) | Self::Delete(print) => Some(print),
            _ => None,
        }
    }

    /// The gallery carried by identify.
    pub fn gallery(&self) -> Option<&[Print]> {
        match self {
            Self::Identify(prints) => Some(prints),
            _ => None,
        }
    }

    /// The wait-for-finger flag carried by capture.
    pub fn wait_for_finger(&self) -> Option<bool> {
        match self {
            Self::Capture { wait_for_finger } => Some(*wait_for_finger),
            _ => None,
        }
    }
}

/// Verdict of a verify action.
///
/// A non-match is a successful verify with `matched == false`; only a
/// driver-reported error makes the action fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResult {
    pub matched: bool,

    /// Print produced by the scan, or the stored print when the driver has
    /// nothing fresher.
    pub print: Print,
}

/// Verdict of an identify action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyResult {
    /// Index into the gallery of the matching candidate.
    pub matched_index: Option<usize>,

    /// Print captured during the scan, delivered with or without a match.
    pub print: Print,
}

impl IdentifyResult {
    /// Look the matched candidate up in the gallery that was dispatched.
    pub fn matched_in<'a>(&self, gallery: &'a [Print]) -> Option<&'a Print> {
        self.matched_index.and_then(|index| gallery.get(index))
    }

    pub fn is_match(&self) -> bool {
        self.matched_index.is_some()
    }
}

/// Outcome a driver reports when completing an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action", content = "outcome")]
pub enum ActionOutcome {
    Probed {
        device_id: Option<String>,
        name: Option<String>,
    },
    Opened,
    Closed,
    Enrolled(Print),
    Verified(VerifyResult),
    Identified(IdentifyResult),
    Captured(Image),
    Listed(Vec<Print>),
    Deleted,
}

impl ActionOutcome {
    /// The action this outcome completes.
    pub fn action(&self) -> ActionKind {
        match self {
            Self::Probed { .. } => ActionKind::Probe,
            Self::Opened => ActionKind::Open,
            Self::Closed => ActionKind::Close,
            Self::Enrolled(_) => ActionKind::Enroll,
            Self::Verified(_) => ActionKind::Verify,
            Self::Identified(_) => ActionKind::Identify,
            Self::Captured(_) => ActionKind::Capture,
            Self::Listed(_) => ActionKind::List,
            Self::Deleted => ActionKind::Delete,
        }
    }

    /// Shorthand for a verify outcome.
    pub fn verified(matched: bool, print: Print) -> Self {
        Self::Verified(VerifyResult { matched, print })
    }

    /// Shorthand for an identify outcome.
    pub fn identified(matched_index: Option<usize>, print: Print) -> Self {
        Self::Identified(IdentifyResult {
            matched_index,
            print,
        })
    }

    pub(crate) fn into_enrolled(self) -> Result<Print> {
        match self {
            Self::Enrolled(print) => Ok(print),
            other => Err(unexpected(ActionKind::Enroll, &other)),
        }
    }

    pub(crate) fn into_verified(self) -> Result<VerifyResult> {
        match self {
            Self::Verified(result) => Ok(result),
            other => Err(unexpected(ActionKind::Verify, &other)),
        }
    }

    pub(crate) fn into_identified(self) -> Result<IdentifyResult> {
        match self {
            Self::Identified(result) => Ok(result),
            other => Err(unexpected(ActionKind::Identify, &other)),
        }
    }

    pub(crate) fn into_captured(self) -> Result<Image> {
        match self {
            Self::Captured(image) => Ok(image),
            other => Err(unexpected(ActionKind::Capture, &other)),
        }
    }

    pub(crate) fn into_listed(self) -> Result<Vec<Print>> {
        match self {
            Self::Listed(prints) => Ok(prints),
            other => Err(unexpected(ActionKind::List, &other)),
        }
    }

    /// Check the outcome completes `expected`, discarding any payload.
    pub(crate) fn expect_unit(self, expected: ActionKind) -> Result<()> {
        if self.action() == expected {
            Ok(())
        } else {
            Err(unexpected(expected, &self))
        }
    }
}

fn unexpected(expected: ActionKind, got: &ActionOutcome) -> DeviceError {
    DeviceError::contract(format!(
        "expected {expected} outcome, got {}",
        got.action()
    ))
}

/// Intermediate enroll report forwarded to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollProgress {
    /// Number of stages finished so far.
    pub completed_stages: u8,

    /// Partial print, when the driver has one to show.
    pub print: Option<Print>,

    /// Retry condition for the scan that just happened, if any.
    pub error: Option<DeviceError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_names_its_action() {
        let print = Print::new("drv");
        assert_eq!(ActionInput::Probe.action(), ActionKind::Probe);
        assert_eq!(ActionInput::Delete(print.clone()).action(), ActionKind::Delete);
        assert_eq!(
            ActionInput::Capture {
                wait_for_finger: true
            }
            .action(),
            ActionKind::Capture
        );
        assert_eq!(ActionInput::Verify(print.clone()).print(), Some(&print));
        assert_eq!(ActionInput::List.print(), None);
    }

    #[test]
    fn test_outcome_names_its_action() {
        let print = Print::new("drv");
        assert_eq!(ActionOutcome::Opened.action(), ActionKind::Open);
        assert_eq!(
            ActionOutcome::verified(false, print.clone()).action(),
            ActionKind::Verify
        );
        assert_eq!(
            ActionOutcome::identified(None, print).action(),
            ActionKind::Identify
        );
    }

    #[test]
    fn test_typed_extraction_rejects_other_variants() {
        let error = ActionOutcome::Deleted.into_listed().unwrap_err();
        assert!(error.is_contract_violation());
        assert!(ActionOutcome::Closed.expect_unit(ActionKind::Close).is_ok());
        assert!(ActionOutcome::Closed.expect_unit(ActionKind::Open).is_err());
    }

    #[test]
    fn test_identify_result_lookup() {
        let gallery: Vec<_> = (0..3).map(|_| Print::new("drv")).collect();
        let result = IdentifyResult {
            matched_index: Some(2),
            print: Print::new("drv"),
        };
        assert_eq!(result.matched_in(&gallery), Some(&gallery[2]));

        let miss = IdentifyResult {
            matched_index: None,
            print: Print::new("drv"),
        };
        assert!(!miss.is_match());
        assert_eq!(miss.matched_in(&gallery), None);
    }

    #[test]
    fn test_outcome_serialization_is_tagged() {
        let json = serde_json::to_value(ActionOutcome::Deleted).unwrap();
        assert_eq!(json["action"], "deleted");
    }
}
