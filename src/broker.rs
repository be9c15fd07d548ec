//! The device control broker: one selected camera, two control paths.
//!
//! Standard controls go through `v4l2-ctl` against the selected video node.
//! The ISP profile goes through the route chosen in [`Config`]: the XU over
//! libusb (driver detached per transfer) or the repurposed white-balance PU
//! control. Profile availability is re-derived on every selection and
//! consulted before every profile write.
//!
//! The video node and the USB handle are discovered independently; the USB
//! side is paired with the node through the port chain in its V4L2 bus info.

use std::path::{Path, PathBuf};

use crate::availability::Availability;
use crate::config::{Config, ProfileRoute};
use crate::discovery::{self, VideoDevice};
use crate::error::CamError;
use crate::protocol::WHITE_BALANCE_CONTROL;
use crate::settings::{self, IspProfile, StandardControl, STANDARD_CONTROLS};
use crate::v4l2::{CtlRunner, StandardChannel, V4l2Ctl};
use crate::vendor::{UsbBackend, VendorBackend, VendorChannel};

pub struct ControlBroker<R, B: VendorBackend> {
    standard: StandardChannel<R>,
    backend: B,
    route: ProfileRoute,
    device_dir: PathBuf,
    marker: String,
    devices: Vec<VideoDevice>,
    selected: Option<usize>,
    vendor: Option<VendorChannel<B::Handle>>,
    availability: Availability,
}

impl ControlBroker<V4l2Ctl, UsbBackend> {
    /// Broker over the real `v4l2-ctl` and libusb.
    pub fn from_config(config: &Config) -> Self {
        Self::new(V4l2Ctl::new(&config.ctl_program), config.usb_backend(), config)
    }
}

impl<R: CtlRunner, B: VendorBackend> ControlBroker<R, B> {
    pub fn new(runner: R, backend: B, config: &Config) -> Self {
        Self {
            standard: StandardChannel::new(runner),
            backend,
            route: config.profile_route,
            device_dir: config.device_dir.clone(),
            marker: config.device_marker.clone(),
            devices: Vec::new(),
            selected: None,
            vendor: None,
            availability: Availability::default(),
        }
    }

    pub fn runner(&self) -> &R {
        self.standard.runner()
    }

    pub fn route(&self) -> ProfileRoute {
        self.route
    }

    pub fn devices(&self) -> &[VideoDevice] {
        &self.devices
    }

    pub fn selected(&self) -> Option<&VideoDevice> {
        self.selected.and_then(|i| self.devices.get(i))
    }

    pub fn availability(&self) -> &Availability {
        &self.availability
    }

    /// Rescan the device directory and select the first match.
    pub fn refresh(&mut self) -> &[VideoDevice] {
        let candidates = discovery::candidate_paths(&self.device_dir);
        self.refresh_from(&candidates)
    }

    /// Probe the given candidate nodes and select the first match.
    pub fn refresh_from(&mut self, candidates: &[PathBuf]) -> &[VideoDevice] {
        self.rescan_from(candidates);
        if !self.devices.is_empty() {
            self.select_index(0);
        }
        &self.devices
    }

    /// Rescan the device directory without selecting anything.
    pub fn rescan(&mut self) -> &[VideoDevice] {
        let candidates = discovery::candidate_paths(&self.device_dir);
        self.rescan_from(&candidates)
    }

    /// Probe the given candidate nodes, dropping any previous selection.
    pub fn rescan_from(&mut self, candidates: &[PathBuf]) -> &[VideoDevice] {
        self.devices = discovery::discover(self.standard.runner(), candidates, &self.marker);
        self.selected = None;
        self.vendor = None;
        self.availability = Availability::default();

        if self.devices.is_empty() {
            log::info!("No camera found");
        }
        &self.devices
    }

    /// Select a discovered device by position and re-derive profile availability.
    pub fn select(&mut self, index: usize) -> Result<&Availability, CamError> {
        if index >= self.devices.len() {
            return Err(CamError::InvalidArgument {
                arg: "device",
                value: index.to_string(),
                valid: "an entry listed by `devices`",
            });
        }
        self.select_index(index);
        Ok(&self.availability)
    }

    /// Select a discovered device by node path. Symlinks such as
    /// `/dev/v4l/by-id/...` resolve to the node they point at.
    pub fn select_path(&mut self, path: &Path) -> Result<&Availability, CamError> {
        let wanted = canonical(path);
        match self
            .devices
            .iter()
            .position(|d| d.path == path || canonical(&d.path) == wanted)
        {
            Some(index) => self.select(index),
            None => Err(CamError::InvalidArgument {
                arg: "--device",
                value: path.display().to_string(),
                valid: "a node listed by `devices`",
            }),
        }
    }

    fn select_index(&mut self, index: usize) {
        self.selected = Some(index);
        // Drop the previous handle before opening another one.
        self.vendor = None;
        let device = self.devices[index].clone();
        log::info!("Selected {}", device);

        self.availability = match self.route {
            ProfileRoute::Extension => {
                let probe = self.backend.open(device.port_path()).and_then(|mut channel| {
                    let value = channel.try_get_current()?;
                    self.vendor = Some(channel);
                    Ok(value)
                });
                Availability::probe(probe)
            }
            ProfileRoute::WhiteBalance => {
                Availability::probe_white_balance(self.standard.get(&device.path, WHITE_BALANCE_CONTROL))
            }
        };

        if !self.availability.usable {
            log::warn!("ISP profile unavailable: {}", self.availability.diagnostic);
        }
    }

    fn selected_path(&self) -> Result<PathBuf, CamError> {
        self.selected()
            .map(|d| d.path.clone())
            .ok_or(CamError::NoDeviceSelected)
    }

    fn lookup(name: &str) -> Result<&'static StandardControl, CamError> {
        settings::standard_control(name).ok_or_else(|| CamError::UnknownControl(name.to_string()))
    }

    /// Read one standard control. `Ok(None)` means the transport gave no value.
    pub fn get_control(&self, name: &str) -> Result<Option<i32>, CamError> {
        let control = Self::lookup(name)?;
        let path = self.selected_path()?;
        Ok(self.standard.get(&path, control.name))
    }

    /// Write one standard control after checking it against the catalog range.
    pub fn set_control(&self, name: &str, value: i32) -> Result<(), CamError> {
        let control = Self::lookup(name)?;
        if !control.contains(value) {
            return Err(CamError::ValueOutOfRange {
                control: control.name,
                value,
                min: control.min,
                max: control.max,
            });
        }
        let path = self.selected_path()?;
        self.standard.set(&path, control.name, value);
        Ok(())
    }

    /// Current value of every standard control.
    pub fn read_controls(&self) -> Result<Vec<(&'static StandardControl, Option<i32>)>, CamError> {
        let path = self.selected_path()?;
        Ok(STANDARD_CONTROLS
            .iter()
            .map(|c| (c, self.standard.get(&path, c.name)))
            .collect())
    }

    /// The preset observed by the last probe or write.
    pub fn profile(&self) -> Option<IspProfile> {
        self.availability.current.and_then(IspProfile::from_index)
    }

    /// Re-read the profile index from the device without re-deriving availability.
    pub fn read_profile(&mut self) -> Option<u8> {
        if !self.availability.usable {
            return None;
        }
        let value = match self.route {
            ProfileRoute::Extension => self.vendor.as_mut()?.get_current(),
            ProfileRoute::WhiteBalance => {
                let path = self.selected_path().ok()?;
                self.standard
                    .get(&path, WHITE_BALANCE_CONTROL)
                    .and_then(|v| u8::try_from(v).ok())
            }
        };
        if value.is_some() {
            self.availability.current = value;
        }
        value
    }

    /// Switch the ISP preset.
    ///
    /// Refused with [`CamError::ProfileUnavailable`] when the last probe
    /// failed. `Ok(false)` means the transfer itself failed.
    pub fn set_profile(&mut self, profile: IspProfile) -> Result<bool, CamError> {
        if !self.availability.usable {
            return Err(CamError::ProfileUnavailable(self.availability.message()));
        }
        let index = profile.index();

        let applied = match self.route {
            ProfileRoute::Extension => match self.vendor.as_mut() {
                Some(channel) => channel.set_current(index.into()),
                None => return Err(CamError::ProfileUnavailable("USB handle closed".into())),
            },
            ProfileRoute::WhiteBalance => {
                let path = self.selected_path()?;
                self.standard.set(&path, WHITE_BALANCE_CONTROL, index.into());
                true
            }
        };

        if applied {
            self.availability.current = Some(index);
            log::info!("ISP profile: {}", profile);
        }
        Ok(applied)
    }

    /// Put every standard control back to its default and the profile to
    /// Daylight. The profile is skipped when unavailable; the return value
    /// says whether it was applied.
    pub fn reset_defaults(&mut self) -> Result<bool, CamError> {
        let path = self.selected_path()?;
        for c in STANDARD_CONTROLS {
            self.standard.set(&path, c.name, c.default);
        }

        if self.availability.usable {
            self.set_profile(IspProfile::DEFAULT)
        } else {
            Ok(false)
        }
    }
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
