//! Lookup table of known driver classes.

use std::collections::HashMap;
use std::sync::Arc;

use fprint_core::constants::MAX_DRIVER_ID_LENGTH;
use thiserror::Error;
use tracing::{debug, info};

use crate::class::DriverClass;
use crate::config::DeviceConfig;
use crate::device::Device;

/// Errors raised while managing the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Driver already registered: {0}")]
    Duplicate(String),

    #[error("Unknown driver: {0}")]
    UnknownDriver(String),

    #[error("Invalid driver id {id:?}: {reason}")]
    InvalidId { id: String, reason: &'static str },
}

/// Known driver classes, keyed by driver id.
///
/// # Examples
///
/// ```
/// use fprint_device::{DeviceConfig, DriverRegistry};
/// use fprint_device::mock::FakeDriver;
///
/// let (class, _handle) = FakeDriver::new();
/// let mut registry = DriverRegistry::new();
/// registry.register(class).unwrap();
///
/// let device = registry
///     .instantiate("fake_test_dev", DeviceConfig::default())
///     .unwrap();
/// assert!(!device.is_open());
/// ```
#[derive(Debug, Default)]
pub struct DriverRegistry {
    classes: HashMap<String, Arc<DriverClass>>,
}

impl DriverRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a class.
    ///
    /// # Errors
    ///
    /// Fails if the id is malformed or already taken.
    pub fn register(&mut self, class: impl Into<Arc<DriverClass>>) -> Result<(), RegistryError> {
        let class = class.into();
        validate_id(&class.id)?;
        if self.classes.contains_key(&class.id) {
            return Err(RegistryError::Duplicate(class.id.clone()));
        }

        info!(driver = %class.id, name = %class.full_name, "driver registered");
        self.classes.insert(class.id.clone(), class);
        Ok(())
    }

    /// Add or replace a class, returning the one it displaced.
    ///
    /// Devices created from the displaced class keep using it.
    pub fn replace(
        &mut self,
        class: impl Into<Arc<DriverClass>>,
    ) -> Result<Option<Arc<DriverClass>>, RegistryError> {
        let class = class.into();
        validate_id(&class.id)?;
        debug!(driver = %class.id, "driver replaced");
        Ok(self.classes.insert(class.id.clone(), class))
    }

    /// Look up a registered class.
    pub fn get(&self, id: &str) -> Option<Arc<DriverClass>> {
        self.classes.get(id).cloned()
    }

    /// Registered driver ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.classes.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of registered classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether no class is registered.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Create a closed device of a registered class.
    pub fn instantiate(&self, id: &str, config: DeviceConfig) -> Result<Device, RegistryError> {
        let class = self
            .get(id)
            .ok_or_else(|| RegistryError::UnknownDriver(id.to_string()))?;
        Ok(Device::new(class, config))
    }
}

fn validate_id(id: &str) -> Result<(), RegistryError> {
    let reason = if id.is_empty() {
        "empty"
    } else if id.len() > MAX_DRIVER_ID_LENGTH {
        "too long"
    } else if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        "only ASCII letters, digits, '_' and '-' are allowed"
    } else {
        return Ok(());
    };

    Err(RegistryError::InvalidId {
        id: id.to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DriverContext;
    use rstest::rstest;

    fn noop(_: DriverContext) {}

    fn class(id: &str) -> DriverClass {
        DriverClass::new(id, "Test driver", noop, noop)
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = DriverRegistry::new();
        registry.register(class("beta")).unwrap();
        registry.register(class("alpha")).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ids(), vec!["alpha", "beta"]);
        assert_eq!(registry.get("alpha").unwrap().id, "alpha");
        assert!(registry.get("gamma").is_none());
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = DriverRegistry::new();
        registry.register(class("drv")).unwrap();

        assert_eq!(
            registry.register(class("drv")),
            Err(RegistryError::Duplicate("drv".to_string()))
        );
    }

    #[test]
    fn test_replace_keeps_existing_devices_on_old_class() {
        let mut registry = DriverRegistry::new();
        registry.register(class("drv")).unwrap();
        let device = registry.instantiate("drv", DeviceConfig::default()).unwrap();

        let displaced = registry
            .replace(class("drv").with_list(noop))
            .unwrap()
            .unwrap();
        assert!(!displaced.has_storage());
        assert!(!device.has_storage());
        assert!(registry.get("drv").unwrap().has_storage());
    }

    #[test]
    fn test_instantiate_unknown_driver() {
        let registry = DriverRegistry::new();
        assert_eq!(
            registry
                .instantiate("missing", DeviceConfig::default())
                .unwrap_err(),
            RegistryError::UnknownDriver("missing".to_string())
        );
    }

    #[rstest]
    #[case("", false)]
    #[case("fake_test_dev", true)]
    #[case("upek-ts", true)]
    #[case("has space", false)]
    #[case("a_driver_id_that_is_much_too_long_to_accept", false)]
    fn test_driver_id_validation(#[case] id: &str, #[case] valid: bool) {
        assert_eq!(validate_id(id).is_ok(), valid);
    }
}
