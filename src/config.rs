//! Runtime configuration for the broker.
//!
//! Defaults come from [`crate::protocol`]; the CLI overrides individual
//! fields from flags or `P4CAM_*` environment variables. Nothing is read from
//! or written to disk.

use std::fmt;
use std::path::PathBuf;

use crate::error::CamError;
use crate::protocol::*;
use crate::vendor::{UsbBackend, XuTarget};

/// Which transport carries the ISP profile index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfileRoute {
    /// XU GET_CUR/SET_CUR over libusb, detaching `uvcvideo` per transfer.
    #[default]
    Extension,
    /// The `white_balance_temperature` PU control via `v4l2-ctl`. Stream-safe.
    WhiteBalance,
}

impl ProfileRoute {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "xu" | "extension" => Some(Self::Extension),
            "pu" | "wb" | "white-balance" | "white_balance" => Some(Self::WhiteBalance),
            _ => None,
        }
    }
}

impl fmt::Display for ProfileRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extension => write!(f, "XU {XU_UNIT_ID} selector 0x{XU_SELECTOR_PROFILE:02x}"),
            Self::WhiteBalance => write!(f, "v4l2 {WHITE_BALANCE_CONTROL}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Substring of `v4l2-ctl --info` identifying the camera.
    pub device_marker: String,
    /// Directory scanned for `video<N>` nodes.
    pub device_dir: PathBuf,
    pub ctl_program: PathBuf,
    pub profile_route: ProfileRoute,
    pub xu: XuTarget,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vendor_id: VENDOR_ID,
            product_id: PRODUCT_ID,
            device_marker: DEVICE_MARKER.to_string(),
            device_dir: PathBuf::from(VIDEO_DEVICE_DIR),
            ctl_program: PathBuf::from(CTL_PROGRAM),
            profile_route: ProfileRoute::default(),
            xu: XuTarget::default(),
        }
    }
}

impl Config {
    /// The libusb backend matching this configuration.
    pub fn usb_backend(&self) -> UsbBackend {
        UsbBackend {
            vendor_id: self.vendor_id,
            product_id: self.product_id,
            target: self.xu,
        }
    }
}

/// Parse a USB ID given as hex, with or without a `0x` prefix (`303a`, `0x303A`).
pub fn parse_usb_id(s: &str) -> Result<u16, CamError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    let invalid = || CamError::InvalidArgument {
        arg: "USB ID",
        value: s.to_string(),
        valid: "four hex digits, e.g. 303a or 0x8000",
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    u16::from_str_radix(digits, 16).map_err(|_| invalid())
}
