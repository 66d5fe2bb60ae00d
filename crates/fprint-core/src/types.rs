//! Payload and identity types threaded through device actions.
//!
//! The dispatch core never looks inside a [`Print`] or an [`Image`]; it only
//! moves them between caller and driver. The metadata carried here is what a
//! host needs to manage stored templates.

use bytes::Bytes;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Finger a print was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Finger {
    #[default]
    Unknown,
    LeftThumb,
    LeftIndex,
    LeftMiddle,
    LeftRing,
    LeftLittle,
    RightThumb,
    RightIndex,
    RightMiddle,
    RightRing,
    RightLittle,
}

impl Finger {
    /// Check if the finger is on the left hand.
    pub fn is_left(&self) -> bool {
        matches!(
            self,
            Self::LeftThumb | Self::LeftIndex | Self::LeftMiddle | Self::LeftRing | Self::LeftLittle
        )
    }

    /// Check if the finger is on the right hand.
    pub fn is_right(&self) -> bool {
        !self.is_left() && *self != Self::Unknown
    }
}

/// How the user presents a finger to the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanType {
    /// The finger is swiped across a line sensor.
    Swipe,

    /// The finger rests on an area sensor.
    #[default]
    Press,
}

/// An enrolled biometric template.
///
/// The template data is opaque. Two prints are equal when they share the same
/// `id`, so a driver handing back the print it was given is observable as
/// equality on the caller side.
///
/// # Examples
///
/// ```
/// use fprint_core::{Finger, Print};
///
/// let print = Print::new("fake_test_dev")
///     .with_finger(Finger::RightIndex)
///     .with_description("work laptop");
///
/// assert_eq!(print.driver(), "fake_test_dev");
/// assert_eq!(print.finger(), Finger::RightIndex);
/// assert_eq!(print.clone(), print);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Print {
    id: Uuid,
    driver: String,
    device_id: Option<String>,
    finger: Finger,
    description: Option<String>,
    username: Option<String>,
    enroll_date: Option<NaiveDate>,
    data: Bytes,
}

impl Print {
    /// Create an empty print owned by the given driver.
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            driver: driver.into(),
            device_id: None,
            finger: Finger::Unknown,
            description: None,
            username: None,
            enroll_date: None,
            data: Bytes::new(),
        }
    }

    /// Set the device identifier.
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Set the finger.
    pub fn with_finger(mut self, finger: Finger) -> Self {
        self.finger = finger;
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the username.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the enroll date.
    pub fn with_enroll_date(mut self, date: NaiveDate) -> Self {
        self.enroll_date = Some(date);
        self
    }

    /// Set the opaque template data.
    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn driver(&self) -> &str {
        &self.driver
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub fn finger(&self) -> Finger {
        self.finger
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Replace the description in place.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn enroll_date(&self) -> Option<NaiveDate> {
        self.enroll_date
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Check whether this print was produced by the given driver and device.
    ///
    /// A print without a device id is compatible with every device of the
    /// driver.
    pub fn is_compatible(&self, driver: &str, device_id: Option<&str>) -> bool {
        self.driver == driver
            && match (self.device_id.as_deref(), device_id) {
                (Some(ours), Some(theirs)) => ours == theirs,
                _ => true,
            }
    }
}

impl PartialEq for Print {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Print {}

impl fmt::Display for Print {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.driver)
    }
}

/// A captured fingerprint image.
///
/// Pixel data is opaque to the dispatch core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub data: Bytes,
}

impl Image {
    /// Create a zero-filled 8-bit grayscale image.
    ///
    /// # Examples
    ///
    /// ```
    /// use fprint_core::Image;
    ///
    /// let image = Image::new(500, 500);
    /// assert_eq!(image.data.len(), 250_000);
    /// ```
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            data: Bytes::from(vec![0u8; len]),
        }
    }

    /// Create an image from existing pixel data.
    pub fn from_data(width: u32, height: u32, data: impl Into<Bytes>) -> Self {
        Self {
            width,
            height,
            data: data.into(),
        }
    }
}

/// Identity of one device instance.
///
/// Starts out with the driver's defaults and is refined by a successful probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Identifier of the driver handling this device (e.g. "fake_test_dev").
    pub driver: String,

    /// Per-device identifier, usually a serial or a bus path.
    pub device_id: Option<String>,

    /// Human readable device name.
    pub name: String,

    /// How the finger is presented.
    pub scan_type: ScanType,

    /// Number of scans needed to complete an enrollment.
    pub nr_enroll_stages: u8,
}

impl DeviceInfo {
    /// Create a new DeviceInfo with required fields.
    pub fn new(driver: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            device_id: None,
            name: name.into(),
            scan_type: ScanType::default(),
            nr_enroll_stages: crate::constants::DEFAULT_ENROLL_STAGES,
        }
    }

    /// Set the device identifier.
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
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
}
