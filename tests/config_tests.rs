// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use kinect_sandbox::constants::{calibration, window};
use kinect_sandbox::{Config, SensorBackendType, ViewMode};

#[test]
fn test_config_default_matches_projector_setup() {
    let config = Config::default();

    assert_eq!(config.window.width, window::WIDTH);
    assert_eq!(config.window.height, window::HEIGHT);
    assert_eq!(config.window.x, window::X_OFFSET);
    assert!(config.window.borderless, "Projector window should be borderless");
    assert_eq!(config.view_mode, ViewMode::Depth);
    assert_eq!(config.sensor.backend, SensorBackendType::Auto);
    assert_eq!(config.sensor.device_index, None);
}

#[test]
fn test_config_default_calibration() {
    let config = Config::default();
    assert_eq!(config.calibration.left, calibration::LEFT);
    assert_eq!(config.calibration.right, calibration::RIGHT);
    assert_eq!(config.calibration.top, calibration::TOP);
    assert_eq!(config.calibration.bottom, calibration::BOTTOM);
    assert_eq!(config.steps.coarse, calibration::STEP_COARSE);
    assert_eq!(config.steps.fine, calibration::STEP_FINE);
}

#[test]
fn test_config_file_overrides() {
    let path = std::env::temp_dir().join(format!(
        "kinect-sandbox-config-{}.json",
        std::process::id()
    ));
    std::fs::write(
        &path,
        r#"{
            "window": { "x": 0, "borderless": false },
            "calibration": { "left": 0.0, "right": 1.0, "top": 1.0, "bottom": 0.0 },
            "steps": { "coarse": 0.1 },
            "sensor": { "backend": "v4l2", "synthetic_near_mode": true }
        }"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(config.window.x, 0);
    assert_eq!(config.window.width, window::WIDTH);
    assert!(!config.window.borderless);
    assert_eq!(config.calibration.apply(0.5, 0.5), [0.5, 0.5]);
    assert_eq!(config.steps.coarse, 0.1);
    assert_eq!(config.steps.fine, calibration::STEP_FINE);
    assert_eq!(config.sensor.backend, SensorBackendType::V4l2);
    assert!(config.sensor_options().synthetic_near_mode);
}
