//! Constants shared by drivers and the dispatch core.

/// Number of enroll stages a driver class declares when it does not say otherwise.
pub const DEFAULT_ENROLL_STAGES: u8 = 5;

/// Default bound on the per-device state transition history.
///
/// A full open/action/close cycle records four transitions, so 100 entries
/// keep the last ~25 cycles around for debugging.
pub const DEFAULT_HISTORY_SIZE: usize = 100;

/// Maximum length accepted for a driver identifier.
pub const MAX_DRIVER_ID_LENGTH: usize = 32;
