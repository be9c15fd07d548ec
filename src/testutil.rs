//! In-memory stand-ins for `v4l2-ctl` and a libusb device handle.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use crate::error::CamError;
use crate::settings::STANDARD_CONTROLS;
use crate::usb::ControlInterface;
use crate::v4l2::{CtlOutput, CtlRunner};
use crate::vendor::{VendorBackend, VendorChannel, XuTarget};

#[derive(Default)]
struct FakeNode {
    info: String,
    controls: HashMap<String, i32>,
}

/// Emulates the subset of `v4l2-ctl` the crate drives.
#[derive(Default)]
pub struct FakeCtl {
    nodes: RefCell<HashMap<String, FakeNode>>,
    calls: RefCell<Vec<String>>,
    timeout: RefCell<bool>,
}

impl FakeCtl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node whose standard controls start at their defaults.
    pub fn add_device(&self, path: &str, info: &str) {
        let controls = STANDARD_CONTROLS
            .iter()
            .map(|c| (c.name.to_string(), c.default))
            .collect();
        self.nodes
            .borrow_mut()
            .insert(path.to_string(), FakeNode { info: info.to_string(), controls });
    }

    pub fn set_control(&self, path: &str, name: &str, value: i32) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(path) {
            node.controls.insert(name.to_string(), value);
        }
    }

    pub fn control(&self, path: &str, name: &str) -> Option<i32> {
        self.nodes.borrow().get(path)?.controls.get(name).copied()
    }

    /// Make every subsequent run time out.
    pub fn fail_with_timeout(&self) {
        *self.timeout.borrow_mut() = true;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl CtlRunner for FakeCtl {
    fn run(&self, args: &[&str], timeout: Duration) -> Result<CtlOutput, CamError> {
        self.calls.borrow_mut().push(args.join(" "));
        if *self.timeout.borrow() {
            return Err(CamError::ToolTimeout { program: "v4l2-ctl".into(), timeout });
        }

        let failed = Ok(CtlOutput { success: false, stdout: String::new() });
        let ok = |stdout: String| Ok(CtlOutput { success: true, stdout });

        let (path, op, arg) = match args {
            ["--version"] => return ok("v4l2-ctl 1.26.1\n".into()),
            ["-d", path, op] => (*path, *op, None),
            ["-d", path, op, arg] => (*path, *op, Some(*arg)),
            _ => return failed,
        };

        let mut nodes = self.nodes.borrow_mut();
        let Some(node) = nodes.get_mut(path) else {
            return failed;
        };

        match (op, arg) {
            ("--info", None) => ok(node.info.clone()),
            ("--get-ctrl", Some(name)) => match node.controls.get(name) {
                Some(v) => ok(format!("{name}: {v}\n")),
                None => failed,
            },
            ("--set-ctrl", Some(assignment)) => {
                let Some((name, value)) = assignment.split_once('=') else {
                    return failed;
                };
                match value.parse() {
                    Ok(v) => {
                        node.controls.insert(name.to_string(), v);
                        ok(String::new())
                    }
                    Err(_) => failed,
                }
            }
            _ => failed,
        }
    }
}

/// Observable state of a [`FakeUsb`] device.
#[derive(Debug, Default)]
pub struct UsbState {
    pub bound: bool,
    pub claimed: bool,
    pub value: u8,
    pub short_read: bool,
    pub fail_query: Option<rusb::Error>,
    pub fail_detach: Option<rusb::Error>,
    pub fail_attach: Option<rusb::Error>,
    pub fail_claim: Option<rusb::Error>,
    pub fail_read: Option<rusb::Error>,
    pub fail_write: Option<rusb::Error>,
    pub events: Vec<&'static str>,
    /// (request_type, request, wValue, wIndex, length) per control transfer.
    pub transfers: Vec<(u8, u8, u16, u16, usize)>,
}

/// A USB handle whose single XU byte lives in memory. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct FakeUsb {
    state: Rc<RefCell<UsbState>>,
}

impl FakeUsb {
    pub fn new(bound: bool) -> Self {
        let dev = Self::default();
        dev.state_mut().bound = bound;
        dev
    }

    pub fn state(&self) -> Ref<'_, UsbState> {
        self.state.borrow()
    }

    pub fn state_mut(&self) -> RefMut<'_, UsbState> {
        self.state.borrow_mut()
    }

    fn check(&self, failure: Option<rusb::Error>) -> rusb::Result<()> {
        failure.map_or(Ok(()), Err)
    }
}

impl ControlInterface for FakeUsb {
    fn driver_active(&self, _iface: u8) -> rusb::Result<bool> {
        let s = self.state();
        self.check(s.fail_query)?;
        Ok(s.bound)
    }

    fn detach_driver(&mut self, _iface: u8) -> rusb::Result<()> {
        let mut s = self.state_mut();
        self.check(s.fail_detach)?;
        s.bound = false;
        s.events.push("detach");
        Ok(())
    }

    fn attach_driver(&mut self, _iface: u8) -> rusb::Result<()> {
        let mut s = self.state_mut();
        self.check(s.fail_attach)?;
        s.bound = true;
        s.events.push("attach");
        Ok(())
    }

    fn claim(&mut self, _iface: u8) -> rusb::Result<()> {
        let mut s = self.state_mut();
        self.check(s.fail_claim)?;
        if s.bound {
            return Err(rusb::Error::Busy);
        }
        s.claimed = true;
        s.events.push("claim");
        Ok(())
    }

    fn release(&mut self, _iface: u8) -> rusb::Result<()> {
        let mut s = self.state_mut();
        s.claimed = false;
        s.events.push("release");
        Ok(())
    }

    fn control_in(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> rusb::Result<usize> {
        let mut s = self.state_mut();
        s.transfers.push((request_type, request, value, index, buf.len()));
        self.check(s.fail_read)?;
        if !s.claimed {
            return Err(rusb::Error::Busy);
        }
        if s.short_read {
            return Ok(0);
        }
        buf[0] = s.value;
        Ok(1)
    }

    fn control_out(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &[u8],
        _timeout: Duration,
    ) -> rusb::Result<usize> {
        let mut s = self.state_mut();
        s.transfers.push((request_type, request, value, index, buf.len()));
        self.check(s.fail_write)?;
        if !s.claimed {
            return Err(rusb::Error::Busy);
        }
        s.value = buf[0];
        Ok(buf.len())
    }
}

/// What [`FakeBackend::open`] should produce.
pub enum FakeOpen {
    Device(FakeUsb),
    NotFound,
    NoLibusb,
    OpenFails(rusb::Error),
}

pub struct FakeBackend {
    pub outcome: FakeOpen,
    pub opened_with: RefCell<Vec<Option<String>>>,
}

impl FakeBackend {
    pub fn new(outcome: FakeOpen) -> Self {
        Self { outcome, opened_with: RefCell::new(Vec::new()) }
    }
}

impl VendorBackend for FakeBackend {
    type Handle = FakeUsb;

    fn open(&self, port_path: Option<&str>) -> Result<VendorChannel<FakeUsb>, CamError> {
        self.opened_with.borrow_mut().push(port_path.map(str::to_string));
        let target = XuTarget { rebind_delay: Duration::ZERO, ..XuTarget::default() };
        match &self.outcome {
            FakeOpen::Device(dev) => Ok(VendorChannel::new(dev.clone(), target)),
            FakeOpen::NotFound => Err(CamError::DeviceNotFound { vendor_id: 0x303a, product_id: 0x8000 }),
            FakeOpen::NoLibusb => Err(CamError::UsbContext(rusb::Error::Other)),
            FakeOpen::OpenFails(e) => Err(CamError::Usb(*e)),
        }
    }
}
