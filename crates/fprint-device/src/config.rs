//! Per-instance device configuration.

use fprint_core::constants::DEFAULT_HISTORY_SIZE;
use serde::{Deserialize, Serialize};

/// Configuration for one device instance.
///
/// # Examples
///
/// ```
/// use fprint_device::DeviceConfig;
///
/// let config = DeviceConfig::default()
///     .with_name("front-door")
///     .with_history_size(16);
///
/// assert_eq!(config.name.as_deref(), Some("front-door"));
/// assert_eq!(config.history_size, 16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Label used in log records; defaults to the driver id.
    pub name: Option<String>,

    /// Maximum number of state transitions kept in the device history.
    pub history_size: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: None,
            history_size: DEFAULT_HISTORY_SIZE,
        }
    }
}

impl DeviceConfig {
    /// Set the log label.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the history bound.
    pub fn with_history_size(mut self, history_size: usize) -> Self {
        self.history_size = history_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DeviceConfig::default();
        assert_eq!(config.name, None);
        assert_eq!(config.history_size, DEFAULT_HISTORY_SIZE);
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: DeviceConfig = serde_json::from_str(r#"{"name":"lab"}"#).unwrap();
        assert_eq!(config.name.as_deref(), Some("lab"));
        assert_eq!(config.history_size, DEFAULT_HISTORY_SIZE);
    }
}
