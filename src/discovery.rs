//! V4L2 device discovery.
//!
//! Candidate `/dev/video<N>` nodes are probed with `v4l2-ctl --info`; those
//! whose info text carries the device marker are kept. A node that times out
//! or fails is skipped, never failing the whole scan.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::protocol::*;
use crate::v4l2::CtlRunner;

static CARD_TYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Card\s+type\s*:\s*(.+)").expect("valid regex"));
static BUS_INFO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Bus\s+info\s*:\s*(.+)").expect("valid regex"));

/// A matching V4L2 node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDevice {
    pub path: PathBuf,
    /// Card name from the driver, or the path when none was reported.
    pub label: String,
    /// V4L2 bus info, e.g. `usb-0000:00:14.0-2.1`.
    pub bus_info: Option<String>,
}

impl VideoDevice {
    /// USB port chain of the device, used to pair it with the USB handle.
    pub fn port_path(&self) -> Option<&str> {
        self.bus_info.as_deref().and_then(usb_port_path)
    }
}

impl fmt::Display for VideoDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -- {}", self.path.display(), self.label)
    }
}

/// List `video<N>` nodes in `dir`, ordered by `N`.
pub fn candidate_paths(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            log::warn!("Cannot list {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut nodes: Vec<(u32, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name();
            let index = name.to_str()?.strip_prefix(VIDEO_NODE_PREFIX)?.parse().ok()?;
            Some((index, entry.path()))
        })
        .collect();
    nodes.sort();
    nodes.into_iter().map(|(_, p)| p).collect()
}

/// Probe each candidate and keep the ones whose info contains `marker`.
pub fn discover<R: CtlRunner>(runner: &R, candidates: &[PathBuf], marker: &str) -> Vec<VideoDevice> {
    let mut devices = Vec::new();

    for path in candidates {
        let path_str = path.to_string_lossy();
        let out = match runner.run(&["-d", path_str.as_ref(), "--info"], INFO_TIMEOUT) {
            Ok(out) if out.success => out,
            Ok(_) => {
                log::debug!("{path_str}: --info failed, skipping");
                continue;
            }
            Err(e) => {
                log::debug!("{path_str}: {e}, skipping");
                continue;
            }
        };

        if !out.stdout.contains(marker) {
            continue;
        }

        let label = capture(&CARD_TYPE_RE, &out.stdout).unwrap_or_else(|| path_str.to_string());
        let bus_info = capture(&BUS_INFO_RE, &out.stdout);
        log::info!("Found {} at {}", label, path_str);
        devices.push(VideoDevice { path: path.clone(), label, bus_info });
    }

    devices
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Port chain from V4L2 USB bus info: `usb-0000:00:14.0-2.1` → `2.1`.
pub fn usb_port_path(bus_info: &str) -> Option<&str> {
    let rest = bus_info.strip_prefix("usb-")?;
    let (_, ports) = rest.rsplit_once('-')?;
    let valid = !ports.is_empty() && ports.split('.').all(|p| p.parse::<u8>().is_ok());
    valid.then_some(ports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeCtl;

    const ESP_INFO: &str = "Driver Info:\n\
        \tDriver name      : uvcvideo\n\
        \tCard type        : ESP32-P4 UVC Camera\n\
        \tBus info         : usb-0000:00:14.0-2.1\n";
    const OTHER_INFO: &str = "Driver Info:\n\
        \tDriver name      : uvcvideo\n\
        \tCard type        : Integrated Webcam\n\
        \tBus info         : usb-0000:00:14.0-5\n";

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn keeps_only_marked_devices() {
        let ctl = FakeCtl::new();
        ctl.add_device("/dev/video0", OTHER_INFO);
        ctl.add_device("/dev/video2", ESP_INFO);
        ctl.add_device("/dev/video4", OTHER_INFO);

        let found = discover(&ctl, &paths(&["/dev/video0", "/dev/video2", "/dev/video4"]), DEVICE_MARKER);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, PathBuf::from("/dev/video2"));
        assert_eq!(found[0].label, "ESP32-P4 UVC Camera");
        assert_eq!(found[0].port_path(), Some("2.1"));
        assert!(found.iter().all(|d| d.label.contains(DEVICE_MARKER)));
    }

    #[test]
    fn label_falls_back_to_path() {
        let ctl = FakeCtl::new();
        ctl.add_device("/dev/video1", "ESP camera without card line");
        let found = discover(&ctl, &paths(&["/dev/video1"]), DEVICE_MARKER);
        assert_eq!(found[0].label, "/dev/video1");
        assert_eq!(found[0].bus_info, None);
    }

    #[test]
    fn failing_probe_skips_only_that_device() {
        let ctl = FakeCtl::new();
        ctl.add_device("/dev/video3", ESP_INFO);
        // /dev/video0 is unknown to the fake, so its --info exits non-zero.
        let found = discover(&ctl, &paths(&["/dev/video0", "/dev/video3"]), DEVICE_MARKER);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, PathBuf::from("/dev/video3"));
    }

    #[test]
    fn nothing_matching_is_empty_not_error() {
        let ctl = FakeCtl::new();
        ctl.add_device("/dev/video0", OTHER_INFO);
        assert!(discover(&ctl, &paths(&["/dev/video0"]), DEVICE_MARKER).is_empty());

        let broken = FakeCtl::new();
        broken.fail_with_timeout();
        assert!(discover(&broken, &paths(&["/dev/video0"]), DEVICE_MARKER).is_empty());
    }

    #[test]
    fn display_matches_selector_format() {
        let d = VideoDevice {
            path: PathBuf::from("/dev/video2"),
            label: "ESP32-P4".into(),
            bus_info: None,
        };
        assert_eq!(d.to_string(), "/dev/video2 -- ESP32-P4");
    }

    #[test]
    fn port_path_parsing() {
        assert_eq!(usb_port_path("usb-0000:00:14.0-2.1"), Some("2.1"));
        assert_eq!(usb_port_path("usb-xhci-hcd.0.auto-1"), Some("1"));
        assert_eq!(usb_port_path("platform:vivid-000"), None);
        assert_eq!(usb_port_path("usb-0000:00:14.0-"), None);
    }

    #[test]
    fn candidates_sorted_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["video10", "video2", "video0", "videoX", "media0"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let names: Vec<String> = candidate_paths(dir.path())
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, ["video0", "video2", "video10"]);
    }

    #[test]
    fn missing_directory_has_no_candidates() {
        assert!(candidate_paths(Path::new("/nonexistent/p4cam")).is_empty());
    }
}
