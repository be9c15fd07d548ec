//! Scoped kernel-driver detach/reattach around a single XU transfer.
//!
//! `uvcvideo` owns the VideoControl interface whenever the camera streams.
//! A raw control transfer needs that interface, so [`DetachGuard`] detaches
//! the driver on construction and hands the interface back in [`Drop`],
//! which runs on every exit path including `?` returns and panics.
//!
//! Cleanup is best-effort: a failed release or reattach is logged and
//! swallowed so it can never mask the outcome of the transfer itself.

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use crate::error::CamError;
use crate::usb::ControlInterface;

/// Exclusive, temporary possession of a USB interface.
///
/// Holds `&mut H`, so at most one guard per handle can exist at a time.
pub struct DetachGuard<'a, H: ControlInterface> {
    handle: &'a mut H,
    interface: u8,
    detached: bool,
    claimed: bool,
    rebind_delay: Duration,
}

impl<'a, H: ControlInterface> DetachGuard<'a, H> {
    /// Detach the kernel driver from `interface` if one is bound, then claim it.
    ///
    /// On error the partially-built guard is dropped, which undoes whatever
    /// already happened.
    pub fn acquire(handle: &'a mut H, interface: u8, rebind_delay: Duration) -> Result<Self, CamError> {
        let bound = match handle.driver_active(interface) {
            Ok(active) => active,
            // No kernel-driver concept on this platform.
            Err(rusb::Error::NotSupported) => false,
            Err(e) => return Err(CamError::Usb(e)),
        };

        let mut guard = Self {
            handle,
            interface,
            detached: false,
            claimed: false,
            rebind_delay,
        };

        if bound {
            guard.handle.detach_driver(interface)?;
            guard.detached = true;
            log::debug!("Detached kernel driver from interface {}", interface);
        }

        guard.handle.claim(interface)?;
        guard.claimed = true;

        Ok(guard)
    }

    /// Whether the kernel driver had to be detached for this scope.
    pub fn detached(&self) -> bool {
        self.detached
    }
}

impl<H: ControlInterface> Deref for DetachGuard<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.handle
    }
}

impl<H: ControlInterface> DerefMut for DetachGuard<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.handle
    }
}

impl<H: ControlInterface> Drop for DetachGuard<'_, H> {
    fn drop(&mut self) {
        if self.claimed {
            if let Err(e) = self.handle.release(self.interface) {
                log::warn!("Failed to release interface {}: {}", self.interface, e);
            }
        }

        if self.detached {
            match self.handle.attach_driver(self.interface) {
                Ok(()) => log::debug!("Reattached kernel driver to interface {}", self.interface),
                Err(e) => log::warn!(
                    "Failed to reattach kernel driver to interface {}: {}. \
                     Video streaming may stay unavailable until the camera is replugged.",
                    self.interface,
                    e
                ),
            }
            std::thread::sleep(self.rebind_delay);
        }
    }
}

/// Run `op` with the interface detached and claimed, restoring it afterwards.
pub fn with_interface<H, T, F>(
    handle: &mut H,
    interface: u8,
    rebind_delay: Duration,
    op: F,
) -> Result<T, CamError>
where
    H: ControlInterface,
    F: FnOnce(&H) -> Result<T, CamError>,
{
    let guard = DetachGuard::acquire(handle, interface, rebind_delay)?;
    op(&*guard)
}
