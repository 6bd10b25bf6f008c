// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for sensor backends

use serde::{Deserialize, Serialize};
use std::fmt;

/// One colour frame as delivered by a backend
///
/// `data` is BGRA, `width * height * 4` bytes. A `pitch` of zero means the
/// driver had no image for this frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorFrame {
    pub width: u32,
    pub height: u32,
    /// Bytes per row as reported by the driver
    pub pitch: u32,
    pub data: Vec<u8>,
}

impl ColorFrame {
    /// Build a tightly packed BGRA frame
    pub fn packed(width: u32, height: u32, data: Vec<u8>) -> Self {
        let pitch = if data.is_empty() { 0 } else { width * 4 };
        Self {
            width,
            height,
            pitch,
            data,
        }
    }
}

/// One depth frame as delivered by a backend
///
/// Samples are millimetres, row-major, one per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthFrame {
    pub width: u32,
    pub height: u32,
    /// Bytes per row as reported by the driver
    pub pitch: u32,
    /// Sensor was operating in near mode for this frame
    pub near_mode: bool,
    pub samples: Vec<u16>,
}

impl DepthFrame {
    /// Build a tightly packed depth frame
    pub fn packed(width: u32, height: u32, near_mode: bool, samples: Vec<u16>) -> Self {
        let pitch = if samples.is_empty() { 0 } else { width * 2 };
        Self {
            width,
            height,
            pitch,
            near_mode,
            samples,
        }
    }
}

/// Sensor backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorBackendType {
    /// Try freedepth devices first, then kernel driver pairs
    #[default]
    Auto,
    /// Userspace USB streaming through freedepth
    Freedepth,
    /// Kernel `kinect` driver through V4L2
    V4l2,
    /// Generated test pattern, no hardware
    Synthetic,
}

impl SensorBackendType {
    pub const ALL: [SensorBackendType; 4] = [
        SensorBackendType::Auto,
        SensorBackendType::Freedepth,
        SensorBackendType::V4l2,
        SensorBackendType::Synthetic,
    ];
}

impl fmt::Display for SensorBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorBackendType::Auto => write!(f, "auto"),
            SensorBackendType::Freedepth => write!(f, "freedepth"),
            SensorBackendType::V4l2 => write!(f, "v4l2"),
            SensorBackendType::Synthetic => write!(f, "synthetic"),
        }
    }
}

impl std::str::FromStr for SensorBackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(SensorBackendType::Auto),
            "freedepth" => Ok(SensorBackendType::Freedepth),
            "v4l2" => Ok(SensorBackendType::V4l2),
            "synthetic" => Ok(SensorBackendType::Synthetic),
            other => Err(format!(
                "unknown backend '{}' (expected auto, freedepth, v4l2 or synthetic)",
                other
            )),
        }
    }
}

/// A sensor found during enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorDevice {
    /// Human readable name
    pub name: String,
    /// Backend able to open it
    pub backend: SensorBackendType,
    /// Backend-specific locator (freedepth index, `/dev/video*` pair, ...)
    pub path: String,
    /// Serial number or bus info when known
    pub serial: Option<String>,
}

impl fmt::Display for SensorDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.name, self.backend, self.path)?;
        if let Some(serial) = &self.serial {
            write!(f, " ({})", serial)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_round_trips_through_display() {
        for backend in SensorBackendType::ALL {
            let parsed: SensorBackendType = backend.to_string().parse().unwrap();
            assert_eq!(parsed, backend);
        }
        assert!("kinect".parse::<SensorBackendType>().is_err());
    }

    #[test]
    fn test_packed_frames_report_pitch() {
        assert_eq!(ColorFrame::packed(640, 480, vec![0; 4]).pitch, 2560);
        assert_eq!(ColorFrame::packed(640, 480, Vec::new()).pitch, 0);
        assert_eq!(DepthFrame::packed(640, 480, false, vec![0; 4]).pitch, 1280);
        assert_eq!(DepthFrame::packed(640, 480, true, Vec::new()).pitch, 0);
    }
}
