//! Protocol constants for the ESP32-P4 UVC webcam.
//!
//! All magic numbers, request codes, and XU addressing are defined here so the
//! rest of the codebase references named constants instead of raw hex.

use std::time::Duration;

// ---------------------------------------------------------------------------
// USB device identifiers
// ---------------------------------------------------------------------------

/// Espressif vendor ID.
pub const VENDOR_ID: u16 = 0x303a;

/// Product ID the webcam firmware enumerates with by default.
pub const PRODUCT_ID: u16 = 0x8000;

/// Substring of the V4L2 `--info` output that marks a supported camera.
pub const DEVICE_MARKER: &str = "ESP";

// ---------------------------------------------------------------------------
// UVC class requests (VideoControl interface)
// ---------------------------------------------------------------------------

/// bmRequestType for UVC class request (host-to-device, interface recipient).
pub const UVC_REQUEST_TYPE_OUT: u8 = 0x21;
/// bmRequestType for UVC class request (device-to-host, interface recipient).
pub const UVC_REQUEST_TYPE_IN: u8 = 0xA1;
/// SET_CUR bRequest.
pub const UVC_SET_CUR: u8 = 0x01;
/// GET_CUR bRequest.
pub const UVC_GET_CUR: u8 = 0x81;

/// VideoControl interface number. The XU lives on this interface and
/// `uvcvideo` is bound to it while streaming.
pub const UVC_INTERFACE: u8 = 0;

// ---------------------------------------------------------------------------
// ISP profile Extension Unit
// ---------------------------------------------------------------------------

/// Extension Unit entity ID (must match `bUnitID` in the firmware descriptor).
pub const XU_UNIT_ID: u8 = 0x04;
/// Control selector for the ISP profile index (1 byte, 0..=5).
pub const XU_SELECTOR_PROFILE: u8 = 0x01;

/// Build the (wValue, wIndex) pair addressing an XU control.
///
/// wValue carries the selector in its high byte; wIndex carries the unit ID
/// in its high byte and the interface number in its low byte.
pub const fn xu_address(unit_id: u8, selector: u8, interface: u8) -> (u16, u16) {
    (
        (selector as u16) << 8,
        ((unit_id as u16) << 8) | interface as u16,
    )
}

// ---------------------------------------------------------------------------
// Processing Unit
// ---------------------------------------------------------------------------

/// PU control the firmware repurposes as an ISP profile selector (0..=5).
pub const WHITE_BALANCE_CONTROL: &str = "white_balance_temperature";

// ---------------------------------------------------------------------------
// External control program
// ---------------------------------------------------------------------------

/// Program used for standard (PU) controls and device discovery.
pub const CTL_PROGRAM: &str = "v4l2-ctl";

/// Directory holding the V4L2 device nodes.
pub const VIDEO_DEVICE_DIR: &str = "/dev";

/// File-name prefix of V4L2 capture nodes.
pub const VIDEO_NODE_PREFIX: &str = "video";

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// XU control transfer timeout.
pub const USB_TIMEOUT: Duration = Duration::from_secs(2);
/// Timeout for a single `--get-ctrl` / `--set-ctrl` invocation.
pub const CTL_TIMEOUT: Duration = Duration::from_secs(5);
/// Timeout for a single `--info` probe during discovery.
pub const INFO_TIMEOUT: Duration = Duration::from_secs(3);
/// Timeout for the startup `--version` check.
pub const VERSION_TIMEOUT: Duration = Duration::from_secs(3);
/// Pause after reattaching the kernel driver so `uvcvideo` can rebind.
pub const REBIND_DELAY: Duration = Duration::from_millis(300);
/// Poll interval while waiting for the external program to exit.
pub const POLL_INTERVAL: Duration = Duration::from_millis(20);
