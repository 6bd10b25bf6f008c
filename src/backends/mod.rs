// SPDX-License-Identifier: GPL-3.0-only

//! Sensor backend abstraction
//!
//! ```text
//! ┌─────────────────────┐
//! │     Render loop     │
//! └──────────┬──────────┘
//!            │ next_color_frame / next_depth_frame
//!            ▼
//! ┌─────────────────────┐
//! │  FrameSource trait  │  ← non-blocking poll, Ok(None) = not ready
//! └──────────┬──────────┘
//!            │
//!     ┌──────┼──────────┐
//!     ▼      ▼          ▼
//! freedepth  V4L2   synthetic
//! ```
//!
//! Device discovery and stream setup happen once in [`open_sensor`]; the
//! render loop only ever polls.

pub mod frame_loop;
#[cfg(all(target_arch = "x86_64", feature = "freedepth"))]
pub mod native;
pub mod synthetic;
pub mod types;
pub mod v4l2;

pub use types::*;

use crate::errors::{SensorError, SensorResult};
use tracing::{info, warn};

/// Polling interface over one opened sensor
///
/// Both `next_*` calls must return immediately. `Ok(None)` means the sensor
/// had nothing new this tick, which is expected and not an error. `Err` is
/// fatal for the session.
pub trait FrameSource {
    /// Next colour frame (BGRA), if one is ready
    fn next_color_frame(&mut self) -> SensorResult<Option<ColorFrame>>;

    /// Next depth frame (millimetres), if one is ready
    fn next_depth_frame(&mut self) -> SensorResult<Option<DepthFrame>>;

    /// Stop streaming and release the device
    ///
    /// Called once from the cleanup pass; implementations must tolerate a
    /// second call.
    fn shutdown(&mut self);

    /// Short description for logs
    fn description(&self) -> String;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn next_color_frame(&mut self) -> SensorResult<Option<ColorFrame>> {
        (**self).next_color_frame()
    }

    fn next_depth_frame(&mut self) -> SensorResult<Option<DepthFrame>> {
        (**self).next_depth_frame()
    }

    fn shutdown(&mut self) {
        (**self).shutdown()
    }

    fn description(&self) -> String {
        (**self).description()
    }
}

/// Options used when opening a sensor
#[derive(Debug, Clone, Default)]
pub struct SensorOptions {
    pub backend: SensorBackendType,
    /// Index into the enumerated device list; `None` tries every device
    pub device_index: Option<usize>,
    /// Near-mode flag reported by the synthetic source
    pub synthetic_near_mode: bool,
}

/// Enumerate sensors reachable through `backend`
pub fn enumerate_sensors(backend: SensorBackendType) -> Vec<SensorDevice> {
    match backend {
        SensorBackendType::Auto => {
            let mut devices = enumerate_freedepth();
            devices.extend(v4l2::enumerate_devices());
            devices
        }
        SensorBackendType::Freedepth => enumerate_freedepth(),
        SensorBackendType::V4l2 => v4l2::enumerate_devices(),
        SensorBackendType::Synthetic => vec![synthetic::device()],
    }
}

/// Discover and open a sensor
///
/// Zero devices is `NoSensorFound`. Otherwise devices are tried in order and
/// the first one whose streams open wins; if none does the result is
/// `NoReadySensor`.
pub fn open_sensor(options: &SensorOptions) -> SensorResult<Box<dyn FrameSource>> {
    let mut devices = enumerate_sensors(options.backend);
    info!(
        backend = %options.backend,
        count = devices.len(),
        "Enumerated sensors"
    );

    if let Some(index) = options.device_index {
        if index >= devices.len() {
            warn!(index, count = devices.len(), "Requested sensor index out of range");
            return Err(SensorError::NoSensorFound);
        }
        devices = vec![devices.swap_remove(index)];
    }

    open_first_ready(&devices, |device| open_device(device, options))
}

/// Try `open` on each device in turn
pub fn open_first_ready<F>(
    devices: &[SensorDevice],
    mut open: F,
) -> SensorResult<Box<dyn FrameSource>>
where
    F: FnMut(&SensorDevice) -> SensorResult<Box<dyn FrameSource>>,
{
    if devices.is_empty() {
        return Err(SensorError::NoSensorFound);
    }

    for device in devices {
        match open(device) {
            Ok(source) => {
                info!(device = %device, "Sensor ready");
                return Ok(source);
            }
            Err(e) => {
                warn!(device = %device, error = %e, "Sensor not ready, trying next");
            }
        }
    }

    Err(SensorError::NoReadySensor)
}

fn open_device(
    device: &SensorDevice,
    options: &SensorOptions,
) -> SensorResult<Box<dyn FrameSource>> {
    match device.backend {
        SensorBackendType::Synthetic => Ok(Box::new(synthetic::SyntheticSource::new(
            options.synthetic_near_mode,
        ))),
        SensorBackendType::V4l2 => Ok(Box::new(v4l2::KernelKinectSource::open(device)?)),
        SensorBackendType::Freedepth => open_freedepth(device),
        SensorBackendType::Auto => Err(SensorError::Backend(format!(
            "device {} has no concrete backend",
            device.name
        ))),
    }
}

#[cfg(all(target_arch = "x86_64", feature = "freedepth"))]
fn enumerate_freedepth() -> Vec<SensorDevice> {
    native::enumerate_devices()
}

#[cfg(not(all(target_arch = "x86_64", feature = "freedepth")))]
fn enumerate_freedepth() -> Vec<SensorDevice> {
    Vec::new()
}

#[cfg(all(target_arch = "x86_64", feature = "freedepth"))]
fn open_freedepth(device: &SensorDevice) -> SensorResult<Box<dyn FrameSource>> {
    Ok(Box::new(native::FreedepthSource::open(device)?))
}

#[cfg(not(all(target_arch = "x86_64", feature = "freedepth")))]
fn open_freedepth(_device: &SensorDevice) -> SensorResult<Box<dyn FrameSource>> {
    Err(SensorError::BackendUnavailable(
        "freedepth feature not enabled".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_device(name: &str) -> SensorDevice {
        SensorDevice {
            name: name.to_string(),
            backend: SensorBackendType::Synthetic,
            path: format!("test:{}", name),
            serial: None,
        }
    }

    #[test]
    fn test_no_devices_is_no_sensor_found() {
        let result = open_first_ready(&[], |_| unreachable!());
        assert!(matches!(result, Err(SensorError::NoSensorFound)));
    }

    #[test]
    fn test_no_ready_device() {
        let devices = [fake_device("a"), fake_device("b")];
        let mut attempts = 0;
        let result = open_first_ready(&devices, |_| {
            attempts += 1;
            Err(SensorError::StreamOpenFailed("busy".into()))
        });
        assert!(matches!(result, Err(SensorError::NoReadySensor)));
        assert_eq!(attempts, 2);
    }

    #[test]
    fn test_first_ready_device_wins() {
        let devices = [fake_device("a"), fake_device("b"), fake_device("c")];
        let mut tried = Vec::new();
        let source = open_first_ready(&devices, |device| {
            tried.push(device.name.clone());
            if device.name == "b" {
                Ok(Box::new(synthetic::SyntheticSource::new(false)) as Box<dyn FrameSource>)
            } else {
                Err(SensorError::StreamOpenFailed("busy".into()))
            }
        })
        .unwrap();
        assert_eq!(tried, vec!["a", "b"]);
        assert!(source.description().contains("synthetic"));
    }

    #[test]
    fn test_synthetic_backend_opens() {
        let options = SensorOptions {
            backend: SensorBackendType::Synthetic,
            ..Default::default()
        };
        let mut source = open_sensor(&options).unwrap();
        source.shutdown();
    }

    #[test]
    fn test_device_index_out_of_range() {
        let options = SensorOptions {
            backend: SensorBackendType::Synthetic,
            device_index: Some(3),
            ..Default::default()
        };
        assert!(matches!(
            open_sensor(&options),
            Err(SensorError::NoSensorFound)
        ));
    }
}
