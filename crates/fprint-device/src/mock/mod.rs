//! Simulated drivers for testing and development.
//!
//! These drivers never touch hardware. Their behaviour is scripted through a
//! handle, which makes them suitable for exercising the dispatch core and the
//! code built on top of it.

pub mod fake;

// Re-export commonly used types
pub use fake::{
    FAKE_DEVICE_ID, FAKE_DRIVER_ID, FAKE_VERIFIED_DESCRIPTION, FakeCall, FakeDriver,
    FakeDriverHandle,
};
