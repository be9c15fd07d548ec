//! Raw USB access for the vendor (XU) channel.
//!
//! [`ControlInterface`] is the narrow slice of `rusb::DeviceHandle` the
//! arbiter and the vendor channel need; keeping it a trait lets tests run
//! the detach/reattach protocol against an in-memory device.

use std::time::Duration;

use rusb::{Context, Device, DeviceHandle, UsbContext};

use crate::error::CamError;

/// Kernel-driver and control-transfer operations on one opened USB device.
pub trait ControlInterface {
    /// Whether a kernel driver is currently bound to `iface`.
    fn driver_active(&self, iface: u8) -> rusb::Result<bool>;
    fn detach_driver(&mut self, iface: u8) -> rusb::Result<()>;
    fn attach_driver(&mut self, iface: u8) -> rusb::Result<()>;
    fn claim(&mut self, iface: u8) -> rusb::Result<()>;
    fn release(&mut self, iface: u8) -> rusb::Result<()>;

    fn control_in(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> rusb::Result<usize>;

    fn control_out(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &[u8],
        timeout: Duration,
    ) -> rusb::Result<usize>;
}

impl<T: UsbContext> ControlInterface for DeviceHandle<T> {
    fn driver_active(&self, iface: u8) -> rusb::Result<bool> {
        DeviceHandle::kernel_driver_active(self, iface)
    }

    fn detach_driver(&mut self, iface: u8) -> rusb::Result<()> {
        DeviceHandle::detach_kernel_driver(self, iface)
    }

    fn attach_driver(&mut self, iface: u8) -> rusb::Result<()> {
        DeviceHandle::attach_kernel_driver(self, iface)
    }

    fn claim(&mut self, iface: u8) -> rusb::Result<()> {
        DeviceHandle::claim_interface(self, iface)
    }

    fn release(&mut self, iface: u8) -> rusb::Result<()> {
        DeviceHandle::release_interface(self, iface)
    }

    fn control_in(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> rusb::Result<usize> {
        DeviceHandle::read_control(self, request_type, request, value, index, buf, timeout)
    }

    fn control_out(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &[u8],
        timeout: Duration,
    ) -> rusb::Result<usize> {
        DeviceHandle::write_control(self, request_type, request, value, index, buf, timeout)
    }
}

/// Dotted USB port chain, e.g. `[2, 1]` → `"2.1"`.
pub fn port_path_string(ports: &[u8]) -> String {
    ports
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// Create a libusb context, mapping failure to [`CamError::UsbContext`].
pub fn new_context() -> Result<Context, CamError> {
    Context::new().map_err(CamError::UsbContext)
}

/// Find the camera by vendor/product ID.
///
/// With several identical cameras attached, `port_path` (taken from the
/// V4L2 bus info of the selected video node) picks the one on the same USB
/// port. See [`pick`].
pub fn find_device(
    context: &Context,
    vendor_id: u16,
    product_id: u16,
    port_path: Option<&str>,
) -> Result<Device<Context>, CamError> {
    let mut candidates = Vec::new();

    for device in context.devices()?.iter() {
        let desc = match device.device_descriptor() {
            Ok(d) => d,
            Err(_) => continue,
        };
        if desc.vendor_id() != vendor_id || desc.product_id() != product_id {
            continue;
        }
        let ports = device.port_numbers().map(|p| port_path_string(&p)).unwrap_or_default();
        log::debug!(
            "Found {:04x}:{:04x} on bus {} port {}",
            vendor_id,
            product_id,
            device.bus_number(),
            ports
        );
        candidates.push((device, ports));
    }

    pick(candidates, port_path).ok_or(CamError::DeviceNotFound { vendor_id, product_id })
}

/// Choose among `(device, port chain)` candidates.
///
/// Prefers the first candidate on `wanted`, else the first one. Ambiguous
/// and mismatched choices are logged at warn level.
pub fn pick<T>(candidates: Vec<(T, String)>, wanted: Option<&str>) -> Option<T> {
    let total = candidates.len();
    let mut iter = candidates.into_iter();

    let Some(wanted) = wanted else {
        let (first, ports) = iter.next()?;
        if total > 1 {
            log::warn!("{total} identical cameras attached; using the one on port {ports}");
        }
        return Some(first);
    };

    let matching = iter.as_slice().iter().filter(|(_, p)| p == wanted).count();
    match matching {
        0 => {
            let (first, ports) = iter.next()?;
            log::warn!(
                "No camera on USB port {wanted}; using the one on port {ports}. \
                 Profile and image controls may target different cameras."
            );
            Some(first)
        }
        n => {
            if n > 1 {
                log::warn!(
                    "{n} cameras on USB port {wanted} (different host controllers); \
                     using the first. Profile and image controls may target different cameras."
                );
            }
            iter.find(|(_, p)| p == wanted).map(|(d, _)| d)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_path_joins_with_dots() {
        assert_eq!(port_path_string(&[2, 1]), "2.1");
        assert_eq!(port_path_string(&[4]), "4");
        assert_eq!(port_path_string(&[]), "");
    }

    fn cams(ports: &[&str]) -> Vec<(usize, String)> {
        ports.iter().enumerate().map(|(i, p)| (i, p.to_string())).collect()
    }

    #[test]
    fn pick_prefers_exact_port() {
        assert_eq!(pick(cams(&["1", "2.1", "3"]), Some("2.1")), Some(1));
    }

    #[test]
    fn pick_falls_back_to_first_without_match() {
        assert_eq!(pick(cams(&["1", "3"]), Some("2.1")), Some(0));
    }

    #[test]
    fn pick_without_port_takes_first() {
        assert_eq!(pick(cams(&["4", "1"]), None), Some(0));
    }

    #[test]
    fn pick_with_duplicate_ports_takes_first_match() {
        assert_eq!(pick(cams(&["5", "2.1", "2.1"]), Some("2.1")), Some(1));
    }

    #[test]
    fn pick_nothing_attached() {
        assert_eq!(pick(cams(&[]), Some("2.1")), None);
        assert_eq!(pick(cams(&[]), None), None);
    }
}
