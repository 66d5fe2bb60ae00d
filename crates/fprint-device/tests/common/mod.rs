//! Common test utilities for integration tests.
//!
//! Helpers build fake-driver devices in the states the tests start from and
//! park driver contexts so a test can decide when an action completes.

#![allow(dead_code)]

use std::sync::Arc;

use fprint_core::Print;
use fprint_device::mock::{FakeDriver, FakeDriverHandle};
use fprint_device::{Device, DeviceConfig, DriverClass, DriverContext};
use parking_lot::Mutex;

/// Install a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A closed device of the unmodified fake class.
pub fn fake_device() -> (Device, FakeDriverHandle) {
    init_tracing();
    let (class, handle) = FakeDriver::new();
    (Device::new(class, DeviceConfig::default()), handle)
}

/// An opened device of the given class.
pub async fn open_device(class: DriverClass) -> Device {
    init_tracing();
    let device = Device::new(class, DeviceConfig::default());
    device.open(None).await.unwrap();
    device
}

/// An opened device of the unmodified fake class.
pub async fn open_fake_device() -> (Device, FakeDriverHandle) {
    let (class, handle) = FakeDriver::new();
    (open_device(class).await, handle)
}

/// `len` fresh prints bound to the device.
pub fn gallery(device: &Device, len: usize) -> Vec<Print> {
    (0..len).map(|_| device.new_print()).collect()
}

/// Driver contexts held back by a handler instead of being completed.
#[derive(Clone, Default)]
pub struct Parked {
    contexts: Arc<Mutex<Vec<DriverContext>>>,
}

impl Parked {
    /// A handler that parks every context it receives.
    pub fn handler(&self) -> impl Fn(DriverContext) + Send + Sync + 'static {
        let contexts = Arc::clone(&self.contexts);
        move |ctx| contexts.lock().push(ctx)
    }

    /// Take the oldest parked context.
    pub fn take(&self) -> DriverContext {
        self.contexts.lock().remove(0)
    }

    pub fn len(&self) -> usize {
        self.contexts.lock().len()
    }
}
