//! Custom error types for the p4cam-ctl tool.
//!
//! Channel operations convert these into sentinel values (`None` / `false`)
//! at the transport boundary; the typed variants survive so that the
//! availability tracker and the CLI can tell causes apart.

use std::time::Duration;

use thiserror::Error;

/// Top-level error type for all p4cam operations.
#[derive(Debug, Error)]
pub enum CamError {
    /// No USB device with the configured IDs was found on the bus.
    #[error("Camera {vendor_id:04x}:{product_id:04x} not found on the USB bus. Make sure it's connected.")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    /// The libusb context could not be created.
    #[error("libusb is unavailable: {0}")]
    UsbContext(#[source] rusb::Error),

    /// A USB/libusb transport error outside of a control transfer.
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),

    /// A UVC control transfer failed.
    #[error("UVC {op} failed: {source}")]
    UvcTransfer {
        op: &'static str,
        #[source]
        source: rusb::Error,
    },

    /// A UVC control transfer moved fewer bytes than requested.
    #[error("UVC {op} transferred {got} of {expected} bytes")]
    ShortTransfer {
        op: &'static str,
        expected: usize,
        got: usize,
    },

    /// The external control program is not installed.
    #[error("{program} not found. Install v4l-utils:\n  \
             sudo pacman -S v4l-utils    # Arch/Manjaro\n  \
             sudo apt install v4l-utils  # Debian/Ubuntu")]
    MissingDependency { program: String },

    /// The external control program did not exit in time and was killed.
    #[error("{program} timed out after {timeout:?}")]
    ToolTimeout { program: String, timeout: Duration },

    /// Spawning or talking to the external program failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An operation needs a selected video device but none is selected.
    #[error("No camera selected. Is the webcam connected?")]
    NoDeviceSelected,

    /// The named standard control is not in the catalog.
    #[error("Unknown control '{0}'")]
    UnknownControl(String),

    /// A standard control value is outside its declared range.
    #[error("{value} is out of range for {control} ({min}..={max})")]
    ValueOutOfRange {
        control: &'static str,
        value: i32,
        min: i32,
        max: i32,
    },

    /// Invalid CLI argument value.
    #[error("Invalid value '{value}' for {arg}.\nValid values: {valid}")]
    InvalidArgument {
        arg: &'static str,
        value: String,
        valid: &'static str,
    },

    /// The profile channel is not usable on the selected device.
    #[error("Cannot set profile: {0}")]
    ProfileUnavailable(String),
}

impl CamError {
    /// The underlying libusb error, if this failure came from libusb.
    pub fn usb_error(&self) -> Option<rusb::Error> {
        match self {
            Self::UsbContext(e) | Self::Usb(e) => Some(*e),
            Self::UvcTransfer { source, .. } => Some(*source),
            _ => None,
        }
    }
}
