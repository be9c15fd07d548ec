//! ISP color-profile Extension Unit channel.
//!
//! The profile index is a single byte behind XU #4, selector 0x01 on the
//! VideoControl interface. Each transfer is wrapped in a [`DetachGuard`] so
//! `uvcvideo` only loses the interface for the instant of the transfer.
//!
//! [`DetachGuard`]: crate::arbiter::DetachGuard

use std::time::Duration;

use rusb::{Context, DeviceHandle};

use crate::arbiter::with_interface;
use crate::error::CamError;
use crate::protocol::*;
use crate::usb::{self, ControlInterface};

/// XU addressing and timing for the profile control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XuTarget {
    pub interface: u8,
    pub unit_id: u8,
    pub selector: u8,
    pub timeout: Duration,
    pub rebind_delay: Duration,
}

impl Default for XuTarget {
    fn default() -> Self {
        Self {
            interface: UVC_INTERFACE,
            unit_id: XU_UNIT_ID,
            selector: XU_SELECTOR_PROFILE,
            timeout: USB_TIMEOUT,
            rebind_delay: REBIND_DELAY,
        }
    }
}

/// GET_CUR/SET_CUR access to the one-byte profile control.
pub struct VendorChannel<H> {
    handle: H,
    target: XuTarget,
}

impl<H: ControlInterface> VendorChannel<H> {
    pub fn new(handle: H, target: XuTarget) -> Self {
        Self { handle, target }
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn target(&self) -> XuTarget {
        self.target
    }

    /// GET_CUR, keeping the cause of a failure.
    pub fn try_get_current(&mut self) -> Result<u8, CamError> {
        let t = self.target;
        let (w_value, w_index) = xu_address(t.unit_id, t.selector, t.interface);

        with_interface(&mut self.handle, t.interface, t.rebind_delay, |h| {
            let mut buf = [0u8; 1];
            let len = h
                .control_in(UVC_REQUEST_TYPE_IN, UVC_GET_CUR, w_value, w_index, &mut buf, t.timeout)
                .map_err(|source| CamError::UvcTransfer { op: "GET_CUR", source })?;
            if len != buf.len() {
                return Err(CamError::ShortTransfer { op: "GET_CUR", expected: buf.len(), got: len });
            }
            Ok(buf[0])
        })
    }

    /// SET_CUR with a one-byte payload (`value & 0xff`), keeping the cause of a failure.
    pub fn try_set_current(&mut self, value: u32) -> Result<(), CamError> {
        let t = self.target;
        let (w_value, w_index) = xu_address(t.unit_id, t.selector, t.interface);
        let payload = [(value & 0xff) as u8];

        with_interface(&mut self.handle, t.interface, t.rebind_delay, |h| {
            let len = h
                .control_out(UVC_REQUEST_TYPE_OUT, UVC_SET_CUR, w_value, w_index, &payload, t.timeout)
                .map_err(|source| CamError::UvcTransfer { op: "SET_CUR", source })?;
            if len != payload.len() {
                return Err(CamError::ShortTransfer { op: "SET_CUR", expected: payload.len(), got: len });
            }
            Ok(())
        })
    }

    /// Current profile byte, or `None` on any failure.
    pub fn get_current(&mut self) -> Option<u8> {
        match self.try_get_current() {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("XU GET_CUR failed: {}", e);
                None
            }
        }
    }

    /// Write the profile byte. Returns `false` on any failure.
    pub fn set_current(&mut self, value: u32) -> bool {
        match self.try_set_current(value) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("XU SET_CUR failed: {}", e);
                false
            }
        }
    }
}

/// Opens the vendor channel for a selected video device.
pub trait VendorBackend {
    type Handle: ControlInterface;

    /// `port_path` is the USB port chain of the selected V4L2 device, if known.
    fn open(&self, port_path: Option<&str>) -> Result<VendorChannel<Self::Handle>, CamError>;
}

/// libusb-backed [`VendorBackend`].
#[derive(Debug, Clone)]
pub struct UsbBackend {
    pub vendor_id: u16,
    pub product_id: u16,
    pub target: XuTarget,
}

impl Default for UsbBackend {
    fn default() -> Self {
        Self {
            vendor_id: VENDOR_ID,
            product_id: PRODUCT_ID,
            target: XuTarget::default(),
        }
    }
}

impl VendorBackend for UsbBackend {
    type Handle = DeviceHandle<Context>;

    fn open(&self, port_path: Option<&str>) -> Result<VendorChannel<Self::Handle>, CamError> {
        let context = usb::new_context()?;
        let device = usb::find_device(&context, self.vendor_id, self.product_id, port_path)?;
        let handle = device.open()?;
        log::info!(
            "Opened {:04x}:{:04x} on bus {} address {}",
            self.vendor_id,
            self.product_id,
            device.bus_number(),
            device.address()
        );
        Ok(VendorChannel::new(handle, self.target))
    }
}
