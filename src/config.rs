// SPDX-License-Identifier: GPL-3.0-only

//! Runtime configuration
//!
//! Every field has a default equal to the built-in constants, so an empty
//! file (or no file at all) gives the stock projector setup. Calibration is
//! read from here but never written back.

use crate::app::{AppState, CalibrationRect, StepSizes, ViewMode};
use crate::backends::{SensorBackendType, SensorOptions};
use crate::constants::window;
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Projector window placement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Position of the top-left corner on the virtual desktop
    pub x: i32,
    pub y: i32,
    /// Hide decorations so the image covers the whole projector output
    pub borderless: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: window::TITLE.to_string(),
            width: window::WIDTH,
            height: window::HEIGHT,
            x: window::X_OFFSET,
            y: window::Y_OFFSET,
            borderless: true,
        }
    }
}

impl WindowSettings {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Sensor selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorSettings {
    pub backend: SensorBackendType,
    /// Open only this entry of the enumerated device list
    pub device_index: Option<usize>,
    /// Report near-mode depth from the synthetic source
    pub synthetic_near_mode: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub window: WindowSettings,
    pub calibration: CalibrationRect,
    pub steps: StepSizes,
    pub view_mode: ViewMode,
    pub sensor: SensorSettings,
}

impl Config {
    /// Parse a JSON configuration
    pub fn from_json(json: &str) -> AppResult<Self> {
        serde_json::from_str(json).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Load a JSON configuration file
    pub fn load(path: &Path) -> AppResult<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_json(&json)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load `path` if given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> AppResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn to_json(&self) -> AppResult<String> {
        serde_json::to_string_pretty(self).map_err(AppError::from)
    }

    /// Application state at startup
    pub fn initial_state(&self) -> AppState {
        AppState::new(self.calibration, self.view_mode, self.steps)
    }

    pub fn sensor_options(&self) -> SensorOptions {
        SensorOptions {
            backend: self.sensor.backend,
            device_index: self.sensor.device_index,
            synthetic_near_mode: self.sensor.synthetic_near_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_gives_defaults() {
        assert_eq!(Config::from_json("{}").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_override() {
        let config = Config::from_json(
            r#"{
                "calibration": { "left": 0.1 },
                "view_mode": "color",
                "sensor": { "backend": "synthetic", "device_index": 2 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.calibration.left, 0.1);
        assert_eq!(config.calibration.right, CalibrationRect::default().right);
        assert_eq!(config.view_mode, ViewMode::Color);
        assert_eq!(config.sensor.backend, SensorBackendType::Synthetic);
        assert_eq!(config.sensor_options().device_index, Some(2));
        assert_eq!(config.window, WindowSettings::default());
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        assert!(matches!(
            Config::from_json("{ not json"),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            Config::from_json(r#"{ "view_mode": "infrared" }"#),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = Config::load(Path::new("/nonexistent/kinect-sandbox.json"));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = Config::default();
        config.window.borderless = false;
        config.steps.fine = 0.002;
        let parsed = Config::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_initial_state() {
        let state = Config::default().initial_state();
        assert_eq!(state.view_mode, ViewMode::Depth);
        assert_eq!(state.calibration, CalibrationRect::default());
        assert!(!state.exit_requested);
    }
}
