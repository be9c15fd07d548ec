//! Profile-channel availability, re-derived on every device selection.

use std::fmt;

use crate::error::CamError;
use crate::protocol::WHITE_BALANCE_CONTROL;

/// Why the profile channel is (or is not) usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The last probe read a value.
    Ready,
    /// No video device is selected.
    NoDeviceSelected,
    /// libusb could not be initialised.
    LibraryUnavailable(String),
    /// No USB device with the configured IDs is attached.
    DeviceNotFound,
    /// The OS refused access to the USB device.
    PermissionDenied,
    /// The device was found but the read failed.
    ReadFailed(String),
    /// The PU control used for profiles is not exposed by the driver.
    ControlMissing(&'static str),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::NoDeviceSelected => write!(f, "no device selected"),
            Self::LibraryUnavailable(e) => {
                write!(f, "libusb unavailable ({e}); install libusb-1.0")
            }
            Self::DeviceNotFound => write!(f, "USB device not found; is the webcam connected?"),
            Self::PermissionDenied => {
                write!(f, "permission denied reading XU; try sudo or install a udev rule")
            }
            Self::ReadFailed(e) => write!(f, "XU read failed: {e}"),
            Self::ControlMissing(name) => write!(f, "{name} not available"),
        }
    }
}

/// Usability of the profile channel plus the value observed by the last probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    pub usable: bool,
    /// Profile index read during the probe (or written since).
    pub current: Option<u8>,
    pub diagnostic: Diagnostic,
}

impl Default for Availability {
    fn default() -> Self {
        Self::unavailable(Diagnostic::NoDeviceSelected)
    }
}

impl Availability {
    pub fn ready(current: u8) -> Self {
        Self {
            usable: true,
            current: Some(current),
            diagnostic: Diagnostic::Ready,
        }
    }

    pub fn unavailable(diagnostic: Diagnostic) -> Self {
        Self {
            usable: false,
            current: None,
            diagnostic,
        }
    }

    /// Classify the outcome of opening the vendor channel and reading GET_CUR.
    pub fn probe(result: Result<u8, CamError>) -> Self {
        match result {
            Ok(v) => Self::ready(v),
            Err(e) => Self::unavailable(classify(&e)),
        }
    }

    /// Classify a read of the white-balance PU control used as profile selector.
    pub fn probe_white_balance(value: Option<i32>) -> Self {
        match value.and_then(|v| u8::try_from(v).ok()) {
            Some(v) => Self::ready(v),
            None => Self::unavailable(Diagnostic::ControlMissing(WHITE_BALANCE_CONTROL)),
        }
    }

    /// Human-readable summary for the presentation layer.
    pub fn message(&self) -> String {
        match (self.usable, self.current) {
            (true, Some(v)) => format!("available (current: {v})"),
            (true, None) => "available".to_string(),
            (false, _) => self.diagnostic.to_string(),
        }
    }
}

fn classify(e: &CamError) -> Diagnostic {
    match e {
        CamError::UsbContext(inner) => Diagnostic::LibraryUnavailable(inner.to_string()),
        CamError::DeviceNotFound { .. } => Diagnostic::DeviceNotFound,
        _ => match e.usb_error() {
            Some(rusb::Error::Access) => Diagnostic::PermissionDenied,
            Some(rusb::Error::NoDevice) => Diagnostic::DeviceNotFound,
            _ => Diagnostic::ReadFailed(e.to_string()),
        },
    }
}
