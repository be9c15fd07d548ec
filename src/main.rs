//! p4cam-ctl — ESP32-P4 UVC webcam control tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use p4cam_ctl::{
    CamError, Config, ControlBroker, IspProfile, ProfileRoute, STANDARD_CONTROLS, UsbBackend,
    V4l2Ctl, parse_usb_id, standard_control,
};

type Broker = ControlBroker<V4l2Ctl, UsbBackend>;

#[derive(Parser)]
#[command(
    name = "p4cam-ctl",
    version,
    about = "Image controls and ISP color profile for the ESP32-P4 UVC webcam",
    after_help = "The XU profile path detaches uvcvideo for each transfer and needs write \
                  access to the USB device (sudo or a udev rule). Use --via pu to switch \
                  profiles through the white_balance_temperature control instead."
)]
struct Args {
    /// Video node to control (default: first detected camera)
    #[arg(short, long, global = true, env = "P4CAM_DEVICE")]
    device: Option<PathBuf>,

    /// USB vendor ID in hex
    #[arg(long, global = true, env = "P4CAM_VID", value_parser = parse_usb_id)]
    vid: Option<u16>,

    /// USB product ID in hex
    #[arg(long, global = true, env = "P4CAM_PID", value_parser = parse_usb_id)]
    pid: Option<u16>,

    /// Profile transport: xu (extension unit) or pu (white_balance_temperature)
    #[arg(long, global = true, env = "P4CAM_VIA", value_parser = parse_route)]
    via: Option<ProfileRoute>,

    /// Path to the v4l2-ctl executable
    #[arg(long, global = true, env = "P4CAM_CTL_PROGRAM")]
    ctl_program: Option<PathBuf>,

    /// Substring of `v4l2-ctl --info` identifying the camera
    #[arg(long, global = true, env = "P4CAM_MARKER")]
    marker: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List detected cameras
    Devices,
    /// Show all control values and profile availability
    Status,
    /// Read one standard control
    Get {
        /// brightness, contrast, hue or saturation
        control: String,
    },
    /// Write one standard control
    #[command(allow_negative_numbers = true)]
    Set { control: String, value: i32 },
    /// Show the ISP profile, or switch to PRESET (index 0-5 or name)
    Profile { preset: Option<String> },
    /// List ISP profile presets
    Profiles,
    /// List standard controls with their ranges
    Controls,
    /// Reset all controls and the profile to defaults
    Reset,
}

fn parse_route(s: &str) -> Result<ProfileRoute, String> {
    ProfileRoute::from_str(s).ok_or_else(|| format!("unknown route '{s}' (expected xu or pu)"))
}

fn parse_profile(s: &str) -> Result<IspProfile, CamError> {
    IspProfile::from_str(s).ok_or_else(|| CamError::InvalidArgument {
        arg: "profile",
        value: s.to_string(),
        valid: "0-5, tungsten, indoor-warm, fluorescent, daylight, cloudy, shade",
    })
}

impl Args {
    fn config(&self) -> Config {
        let mut config = Config::default();
        if let Some(vid) = self.vid {
            config.vendor_id = vid;
        }
        if let Some(pid) = self.pid {
            config.product_id = pid;
        }
        if let Some(route) = self.via {
            config.profile_route = route;
        }
        if let Some(program) = &self.ctl_program {
            config.ctl_program = program.clone();
        }
        if let Some(marker) = &self.marker {
            config.device_marker = marker.clone();
        }
        config
    }
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();

    if let Err(e) = run(&args) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    // Catalog commands and argument validation need no hardware.
    match &args.command {
        Command::Profiles => {
            for p in IspProfile::ALL {
                let marker = if p == IspProfile::DEFAULT { "  (default)" } else { "" };
                println!("{}  {}{}", p.index(), p, marker);
            }
            return Ok(());
        }
        Command::Controls => {
            for c in STANDARD_CONTROLS {
                println!("{:<12} {:>5}..={:<5} default {}", c.name, c.min, c.max, c.default);
            }
            return Ok(());
        }
        Command::Get { control } => {
            standard_control(control).ok_or_else(|| CamError::UnknownControl(control.clone()))?;
        }
        Command::Set { control, value } => {
            let c = standard_control(control).ok_or_else(|| CamError::UnknownControl(control.clone()))?;
            if !c.contains(*value) {
                return Err(CamError::ValueOutOfRange {
                    control: c.name,
                    value: *value,
                    min: c.min,
                    max: c.max,
                }
                .into());
            }
        }
        Command::Profile { preset: Some(p) } => {
            parse_profile(p)?;
        }
        _ => {}
    }

    let config = args.config();
    V4l2Ctl::new(&config.ctl_program).ensure_available()?;

    let mut broker = ControlBroker::from_config(&config);

    if let Command::Devices = args.command {
        let devices = broker.rescan();
        if devices.is_empty() {
            println!("No ESP32-P4 device found. Is the webcam connected?");
        }
        for d in devices {
            match d.port_path() {
                Some(port) => println!("{d}  (USB port {port})"),
                None => println!("{d}"),
            }
        }
        return Ok(());
    }

    open_device(&mut broker, args)?;

    match &args.command {
        Command::Status => print_status(&broker)?,
        Command::Get { control } => {
            let c = standard_control(control).ok_or_else(|| CamError::UnknownControl(control.clone()))?;
            match broker.get_control(c.name)? {
                Some(v) => println!("{}: {}", c.name, v),
                None => println!("{}: unavailable", c.name),
            }
        }
        Command::Set { control, value } => {
            broker.set_control(control, *value)?;
            match broker.get_control(control)? {
                Some(v) if v == *value => println!("✓ {control} set to {v}"),
                Some(v) => println!("{control} is {v} after writing {value}"),
                None => println!("{control} written; read-back unavailable"),
            }
        }
        Command::Profile { preset: None } => match broker.read_profile() {
            Some(index) => match IspProfile::from_index(index) {
                Some(p) => println!("ISP profile: {} [{}]", p, index),
                None => println!("ISP profile: unknown index {}", index),
            },
            None => println!("ISP profile: {}", broker.availability().message()),
        },
        Command::Profile { preset: Some(p) } => {
            let profile = parse_profile(p)?;
            println!("Setting ISP profile to {}", profile);
            if !broker.set_profile(profile)? {
                return Err("ISP profile write failed (see log for details)".into());
            }
            println!("✓ ISP profile: {}", profile);
        }
        Command::Reset => {
            let profile_reset = broker.reset_defaults()?;
            println!("✓ Standard controls reset to defaults");
            if profile_reset {
                println!("✓ ISP profile reset to {}", IspProfile::DEFAULT);
            } else {
                println!("ISP profile not reset: {}", broker.availability().message());
            }
        }
        Command::Devices | Command::Profiles | Command::Controls => {}
    }

    Ok(())
}

/// Discover cameras and select `--device` or the first one found.
fn open_device(broker: &mut Broker, args: &Args) -> Result<(), CamError> {
    if broker.rescan().is_empty() {
        return Err(CamError::NoDeviceSelected);
    }
    match &args.device {
        Some(path) => broker.select_path(path)?,
        None => broker.select(0)?,
    };
    if let Some(d) = broker.selected() {
        eprintln!("Device: {}\n", d);
    }
    Ok(())
}

fn print_status(broker: &Broker) -> Result<(), CamError> {
    for (c, value) in broker.read_controls()? {
        match value {
            Some(v) => println!("{:<12} {:>5}   [{}..={}, default {}]", c.label, v, c.min, c.max, c.default),
            None => println!("{:<12} {:>5}", c.label, "n/a"),
        }
    }

    let via = broker.route();
    match broker.profile() {
        Some(p) => println!("ISP profile  {}  via {}", p, via),
        None => println!("ISP profile  {}  via {}", broker.availability().message(), via),
    }
    Ok(())
}
