//! Device lifecycle states and transition history.
//!
//! # States
//!
//! - `Closed`: no session; only `Probe` and `Open` may be dispatched.
//! - `Open`: session established; every action except `Open` may be dispatched.
//! - `Busy(action)`: exactly one action is in flight.
//!
//! # Valid Transitions
//!
//! - Closed → Busy(Probe | Open)
//! - Open → Busy(any action except Open)
//! - Busy(Open) → Open (success) | Closed (failure)
//! - Busy(Close) → Closed (success and failure alike)
//! - Busy(Probe) → whatever state it started from
//! - Busy(other) → Open
//!
//! # Examples
//!
//! ```
//! use fprint_device::lifecycle::DeviceState;
//! use fprint_core::ActionKind;
//!
//! assert!(DeviceState::Closed.can_transition_to(&DeviceState::Busy(ActionKind::Open)));
//! assert!(!DeviceState::Closed.can_transition_to(&DeviceState::Busy(ActionKind::Verify)));
//! ```

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use fprint_core::ActionKind;
use serde::{Deserialize, Serialize};

use crate::pending::OperationId;

/// Observable state of a device instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceState {
    /// No session and no pending action.
    Closed,

    /// Session established, no pending action.
    Open,

    /// One action is in flight.
    Busy(ActionKind),
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceState::Closed => write!(f, "Closed"),
            DeviceState::Open => write!(f, "Open"),
            DeviceState::Busy(action) => write!(f, "Busy({action})"),
        }
    }
}

impl DeviceState {
    /// Check if transition to target state is valid from this state.
    ///
    /// A `Busy(Probe)` may settle in either idle state, since probe leaves the
    /// open flag untouched and the state itself does not remember it.
    pub fn can_transition_to(&self, target: &DeviceState) -> bool {
        use DeviceState::*;

        match (self, target) {
            // From Closed
            (Closed, Busy(ActionKind::Probe | ActionKind::Open)) => true,
            // From Open
            (Open, Busy(action)) => *action != ActionKind::Open,
            // Settling
            (Busy(ActionKind::Open), Open | Closed) => true,
            (Busy(ActionKind::Close), Closed) => true,
            (Busy(ActionKind::Probe), Open | Closed) => true,
            (Busy(ActionKind::Open | ActionKind::Close | ActionKind::Probe), _) => false,
            (Busy(_), Open) => true,
            _ => false,
        }
    }

    /// The pending action, if any.
    pub fn action(&self) -> Option<ActionKind> {
        match self {
            DeviceState::Busy(action) => Some(*action),
            _ => None,
        }
    }

    /// Check if an action is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, DeviceState::Busy(_))
    }
}

/// Represents a single state transition with timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    /// The state transitioned from.
    pub from: DeviceState,

    /// The state transitioned to.
    pub to: DeviceState,

    /// Operation that caused the transition.
    pub op_id: OperationId,

    /// When the transition occurred.
    pub at: DateTime<Utc>,
}

impl StateTransition {
    /// Create a new state transition record stamped with the current time.
    pub fn new(from: DeviceState, to: DeviceState, op_id: OperationId) -> Self {
        Self {
            from,
            to,
            op_id,
            at: Utc::now(),
        }
    }
}

/// Bounded record of recent state transitions.
#[derive(Debug, Clone)]
pub struct TransitionHistory {
    entries: VecDeque<StateTransition>,
    capacity: usize,
}

impl TransitionHistory {
    /// Create an empty history holding at most `capacity` transitions.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add a transition, evicting the oldest once full.
    pub fn record(&mut self, transition: StateTransition) {
        debug_assert!(
            transition.from.can_transition_to(&transition.to),
            "invalid device transition {} -> {}",
            transition.from,
            transition.to
        );

        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(transition);
    }

    /// Get the last N state transitions, oldest first.
    pub fn last(&self, count: usize) -> Vec<StateTransition> {
        let skip = self.entries.len().saturating_sub(count);
        self.entries.iter().skip(skip).cloned().collect()
    }

    /// Get all recorded transitions, oldest first.
    pub fn to_vec(&self) -> Vec<StateTransition> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
