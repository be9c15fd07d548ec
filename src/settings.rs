//! Control catalog: the standard Processing Unit controls and the ISP
//! color-profile presets.

use std::fmt;

/// A standard UVC Processing Unit control as exposed by V4L2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardControl {
    /// V4L2 control name passed to `--get-ctrl` / `--set-ctrl`.
    pub name: &'static str,
    /// Human-readable label.
    pub label: &'static str,
    pub min: i32,
    pub max: i32,
    pub default: i32,
}

impl StandardControl {
    pub fn contains(&self, value: i32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// The PU controls the firmware implements, with the ranges it enforces.
pub const STANDARD_CONTROLS: &[StandardControl] = &[
    StandardControl { name: "brightness", label: "Brightness", min: -127, max: 127, default: 0 },
    StandardControl { name: "contrast", label: "Contrast", min: 0, max: 256, default: 128 },
    StandardControl { name: "hue", label: "Hue", min: 0, max: 255, default: 0 },
    StandardControl { name: "saturation", label: "Saturation", min: 0, max: 256, default: 128 },
];

/// Look up a standard control by V4L2 name (case-insensitive).
pub fn standard_control(name: &str) -> Option<&'static StandardControl> {
    STANDARD_CONTROLS
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(name))
}

/// ISP color-temperature preset selected through the profile XU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IspProfile {
    Tungsten,
    IndoorWarm,
    Fluorescent,
    Daylight,
    Cloudy,
    Shade,
}

impl IspProfile {
    /// All presets in index order.
    pub const ALL: [IspProfile; 6] = [
        Self::Tungsten,
        Self::IndoorWarm,
        Self::Fluorescent,
        Self::Daylight,
        Self::Cloudy,
        Self::Shade,
    ];

    /// Preset applied by a reset to defaults.
    pub const DEFAULT: IspProfile = Self::Daylight;

    /// The byte written to the XU selector.
    pub fn index(self) -> u8 {
        match self {
            Self::Tungsten => 0,
            Self::IndoorWarm => 1,
            Self::Fluorescent => 2,
            Self::Daylight => 3,
            Self::Cloudy => 4,
            Self::Shade => 5,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Approximate correlated color temperature of the preset, in Kelvin.
    pub fn kelvin(self) -> u32 {
        match self {
            Self::Tungsten => 2873,
            Self::IndoorWarm => 3725,
            Self::Fluorescent => 5095,
            Self::Daylight => 6015,
            Self::Cloudy => 6865,
            Self::Shade => 7600,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Tungsten => "Tungsten",
            Self::IndoorWarm => "Indoor-Warm",
            Self::Fluorescent => "Fluorescent",
            Self::Daylight => "Daylight",
            Self::Cloudy => "Cloudy",
            Self::Shade => "Shade",
        }
    }

    /// Parse a preset from its index (`"3"`) or name (`"daylight"`, `"indoor-warm"`).
    pub fn from_str(s: &str) -> Option<Self> {
        if let Ok(index) = s.parse::<u8>() {
            return Self::from_index(index);
        }
        match s.to_lowercase().replace('_', "-").as_str() {
            "tungsten" => Some(Self::Tungsten),
            "indoor-warm" | "indoorwarm" | "warm" => Some(Self::IndoorWarm),
            "fluorescent" => Some(Self::Fluorescent),
            "daylight" => Some(Self::Daylight),
            "cloudy" => Some(Self::Cloudy),
            "shade" => Some(Self::Shade),
            _ => None,
        }
    }
}

impl fmt::Display for IspProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}K)", self.name(), self.kelvin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_defaults_are_in_range() {
        for c in STANDARD_CONTROLS {
            assert!(c.contains(c.default), "{} default out of range", c.name);
        }
    }

    #[test]
    fn standard_control_lookup_is_case_insensitive() {
        assert_eq!(standard_control("Contrast").map(|c| c.max), Some(256));
        assert!(standard_control("gamma").is_none());
    }

    #[test]
    fn brightness_range_is_signed() {
        let b = standard_control("brightness").unwrap();
        assert!(b.contains(-127));
        assert!(!b.contains(-128));
        assert!(!b.contains(128));
    }

    #[test]
    fn profile_indices_cover_zero_to_five() {
        for (i, p) in IspProfile::ALL.iter().enumerate() {
            assert_eq!(p.index() as usize, i);
            assert_eq!(IspProfile::from_index(i as u8), Some(*p));
        }
        assert_eq!(IspProfile::from_index(6), None);
    }

    #[test]
    fn profile_from_str_accepts_index_and_name() {
        assert_eq!(IspProfile::from_str("3"), Some(IspProfile::Daylight));
        assert_eq!(IspProfile::from_str("Indoor_Warm"), Some(IspProfile::IndoorWarm));
        assert_eq!(IspProfile::from_str("SHADE"), Some(IspProfile::Shade));
        assert_eq!(IspProfile::from_str("9"), None);
        assert_eq!(IspProfile::from_str("sunset"), None);
    }

    #[test]
    fn profile_display() {
        assert_eq!(IspProfile::Daylight.to_string(), "Daylight (6015K)");
        assert_eq!(IspProfile::IndoorWarm.to_string(), "Indoor-Warm (3725K)");
    }

    #[test]
    fn default_profile_is_daylight() {
        assert_eq!(IspProfile::DEFAULT.index(), 3);
    }
}
