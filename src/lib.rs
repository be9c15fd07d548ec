//! ESP32-P4 UVC webcam control library.
//!
//! Reads and writes the standard Processing Unit image controls through
//! `v4l2-ctl`, and switches the ISP color profile through the vendor
//! Extension Unit over libusb. The XU path briefly detaches `uvcvideo` from
//! the VideoControl interface for each transfer and always hands it back.
//!
//! # Quick Start
//!
//! ```no_run
//! use p4cam_ctl::{Config, ControlBroker, IspProfile};
//!
//! let mut broker = ControlBroker::from_config(&Config::default());
//! broker.refresh();
//! broker.set_control("brightness", 20)?;
//!
//! if broker.availability().usable {
//!     broker.set_profile(IspProfile::Cloudy)?;
//! } else {
//!     eprintln!("Profile unavailable: {}", broker.availability().message());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod arbiter;
mod availability;
mod broker;
mod config;
mod discovery;
mod error;
mod protocol;
mod settings;
mod usb;
mod v4l2;
mod vendor;

#[cfg(test)]
mod testutil;

pub use arbiter::{DetachGuard, with_interface};
pub use availability::{Availability, Diagnostic};
pub use broker::ControlBroker;
pub use config::{Config, ProfileRoute, parse_usb_id};
pub use discovery::{VideoDevice, candidate_paths, discover, usb_port_path};
pub use error::CamError;
pub use settings::{IspProfile, STANDARD_CONTROLS, StandardControl, standard_control};
pub use usb::ControlInterface;
pub use v4l2::{CtlOutput, CtlRunner, StandardChannel, V4l2Ctl, parse_ctrl_value};
pub use vendor::{UsbBackend, VendorBackend, VendorChannel, XuTarget};
