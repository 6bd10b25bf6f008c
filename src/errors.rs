// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the sandbox
//!
//! "No frame ready" is deliberately absent: sensors report it as
//! `Ok(None)`. Every variant here is fatal once it reaches the event loop.

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for sensor backends
pub type SensorResult<T> = Result<T, SensorError>;

/// Result type alias for the rendering layer
pub type RenderResult<T> = Result<T, RenderError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Sensor discovery, streaming or polling failed
    Sensor(SensorError),
    /// Window, surface or GPU failure
    Render(RenderError),
    /// Configuration file could not be read or parsed
    Config(String),
    /// Filesystem errors
    Io(String),
    /// Generic error with message
    Other(String),
}

/// Sensor-specific errors
#[derive(Debug, Clone)]
pub enum SensorError {
    /// Enumeration found zero devices
    NoSensorFound,
    /// Devices were found but none reached a ready status
    NoReadySensor,
    /// Opening the colour/depth streams failed
    StreamOpenFailed(String),
    /// A stream went away while running
    Disconnected(String),
    /// The requested backend is not compiled in or not usable here
    BackendUnavailable(String),
    /// Any other driver-layer failure
    Backend(String),
}

/// Rendering-layer errors
#[derive(Debug, Clone)]
pub enum RenderError {
    /// The projector window could not be created
    WindowCreation(String),
    /// The wgpu surface could not be created for the window
    SurfaceCreation(String),
    /// No GPU adapter can present to the surface
    AdapterNotFound(String),
    /// Device/queue request failed
    DeviceRequest(String),
    /// Unrecoverable surface error while acquiring a frame
    Surface(String),
    /// A frame buffer does not fit its texture
    Upload(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Sensor(e) => write!(f, "Sensor error: {}", e),
            AppError::Render(e) => write!(f, "Render error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Io(msg) => write!(f, "I/O error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::NoSensorFound => write!(f, "No connected Kinects!"),
            SensorError::NoReadySensor => write!(f, "Could not connect to Kinect!"),
            SensorError::StreamOpenFailed(msg) => {
                write!(f, "Failed to open Kinect streams: {}", msg)
            }
            SensorError::Disconnected(msg) => write!(f, "Sensor disconnected: {}", msg),
            SensorError::BackendUnavailable(msg) => write!(f, "Backend not available: {}", msg),
            SensorError::Backend(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::WindowCreation(msg) => write!(f, "Failed to create window: {}", msg),
            RenderError::SurfaceCreation(msg) => write!(f, "Failed to create surface: {}", msg),
            RenderError::AdapterNotFound(msg) => write!(f, "No suitable GPU adapter: {}", msg),
            RenderError::DeviceRequest(msg) => write!(f, "Failed to create GPU device: {}", msg),
            RenderError::Surface(msg) => write!(f, "Surface error: {}", msg),
            RenderError::Upload(msg) => write!(f, "Texture upload failed: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for SensorError {}
impl std::error::Error for RenderError {}

impl From<SensorError> for AppError {
    fn from(err: SensorError) -> Self {
        AppError::Sensor(err)
    }
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        AppError::Render(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<std::io::Error> for SensorError {
    fn from(err: std::io::Error) -> Self {
        SensorError::Backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_messages_match_startup_diagnostics() {
        assert_eq!(SensorError::NoSensorFound.to_string(), "No connected Kinects!");
        assert_eq!(
            SensorError::NoReadySensor.to_string(),
            "Could not connect to Kinect!"
        );
    }

    #[test]
    fn test_conversions_wrap_inner_error() {
        let err: AppError = SensorError::Disconnected("depth".into()).into();
        assert!(matches!(err, AppError::Sensor(SensorError::Disconnected(_))));
        assert_eq!(err.to_string(), "Sensor error: Sensor disconnected: depth");

        let err: AppError = RenderError::Surface("out of memory".into()).into();
        assert!(err.to_string().contains("out of memory"));
    }
}
