//! `v4l2-ctl` transport for the standard Processing Unit controls.
//!
//! Every invocation is bounded by a timeout: the child is polled with
//! `try_wait` and killed once the deadline passes. [`StandardChannel`]
//! turns every failure into `None` (get) or a logged no-op (set).

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::LazyLock;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use regex::Regex;

use crate::error::CamError;
use crate::protocol::*;

static CTRL_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":\s*(-?\d+)").expect("valid regex"));

/// Captured result of one external program run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CtlOutput {
    /// Whether the program exited with status 0.
    pub success: bool,
    pub stdout: String,
}

/// Runs the external control program.
///
/// Production code uses [`V4l2Ctl`]; tests substitute an in-memory fake.
pub trait CtlRunner {
    fn run(&self, args: &[&str], timeout: Duration) -> Result<CtlOutput, CamError>;
}

impl<R: CtlRunner + ?Sized> CtlRunner for &R {
    fn run(&self, args: &[&str], timeout: Duration) -> Result<CtlOutput, CamError> {
        (**self).run(args, timeout)
    }
}

/// The real `v4l2-ctl` executable.
#[derive(Debug, Clone)]
pub struct V4l2Ctl {
    program: PathBuf,
}

impl Default for V4l2Ctl {
    fn default() -> Self {
        Self::new(CTL_PROGRAM)
    }
}

impl V4l2Ctl {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Check once that the program can be executed at all.
    ///
    /// This is the one startup failure that aborts the tool: without it
    /// neither discovery nor the standard controls work.
    pub fn ensure_available(&self) -> Result<(), CamError> {
        match self.run(&["--version"], VERSION_TIMEOUT) {
            Ok(out) => {
                log::debug!("{} --version: {}", self.program.display(), out.stdout.trim());
                Ok(())
            }
            Err(e @ CamError::MissingDependency { .. }) => Err(e),
            Err(e) => {
                // It exists but misbehaved; the per-call sentinels handle that.
                log::warn!("{} --version failed: {}", self.program.display(), e);
                Ok(())
            }
        }
    }

    fn spawn(&self, args: &[&str]) -> Result<Child, CamError> {
        Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => CamError::MissingDependency {
                    program: self.program.display().to_string(),
                },
                _ => CamError::Io(e),
            })
    }
}

impl CtlRunner for V4l2Ctl {
    fn run(&self, args: &[&str], timeout: Duration) -> Result<CtlOutput, CamError> {
        let mut child = self.spawn(args)?;
        // Drain both pipes while waiting so a chatty child never blocks on a full pipe.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);
        let deadline = Instant::now() + timeout;

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(CamError::ToolTimeout {
                    program: self.program.display().to_string(),
                    timeout,
                });
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let stdout = collect(stdout);
        let stderr = collect(stderr);
        if !status.success() {
            log::debug!("{} {:?} exited with {}: {}", self.program.display(), args, status, stderr.trim());
        }

        Ok(CtlOutput { success: status.success(), stdout })
    }
}

fn drain<P: Read + Send + 'static>(mut pipe: P) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(e) = pipe.read_to_end(&mut buf) {
            log::debug!("Reading child output failed: {e}");
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn collect(reader: Option<JoinHandle<String>>) -> String {
    reader.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Extract the integer from `--get-ctrl` output such as `"brightness: 12"`.
pub fn parse_ctrl_value(text: &str) -> Option<i32> {
    CTRL_VALUE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Best-effort get/set of named V4L2 controls on a device node.
#[derive(Debug, Clone)]
pub struct StandardChannel<R> {
    runner: R,
}

impl<R: CtlRunner> StandardChannel<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Read a control. Timeouts, a missing program, a non-zero exit and
    /// unparsable output all yield `None`.
    pub fn get(&self, device: &Path, name: &str) -> Option<i32> {
        let path = device.to_string_lossy();
        match self.runner.run(&["-d", path.as_ref(), "--get-ctrl", name], CTL_TIMEOUT) {
            Ok(out) if out.success => {
                let value = parse_ctrl_value(&out.stdout);
                if value.is_none() {
                    log::debug!("{path}: could not parse {name} from {:?}", out.stdout);
                }
                value
            }
            Ok(_) => None,
            Err(e) => {
                log::debug!("{path}: get {name} failed: {e}");
                None
            }
        }
    }

    /// Write a control. Fire-and-forget: failures are logged, never returned.
    pub fn set(&self, device: &Path, name: &str, value: i32) {
        let path = device.to_string_lossy();
        let assignment = format!("{name}={value}");
        match self.runner.run(&["-d", path.as_ref(), "--set-ctrl", assignment.as_str()], CTL_TIMEOUT) {
            Ok(out) if out.success => log::debug!("{path}: set {assignment}"),
            Ok(_) => log::warn!("{path}: set {assignment} was rejected"),
            Err(e) => log::warn!("{path}: set {assignment} failed: {e}"),
        }
    }
}
