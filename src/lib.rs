// SPDX-License-Identifier: GPL-3.0-only

//! Kinect sandbox - projector-calibrated depth visualisation
//!
//! Streams colour or depth frames from a Kinect and projects them onto a
//! physical surface through a full-screen quad whose texture coordinates are
//! tuned live from the keyboard until the image lines up with the surface.
//!
//! # Architecture
//!
//! - [`backends`]: sensor discovery and non-blocking frame polling
//! - [`media`]: frame normalization into texture-ready buffers
//! - [`app`]: application state, input, render loop and window shell
//! - [`shaders`]: quad shader and the wgpu renderer
//! - [`gpu`]: adapter and device creation
//! - [`config`]: JSON configuration

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod gpu;
pub mod media;
pub mod shaders;

// Re-export commonly used types
pub use app::{AppState, CalibrationRect, FrameDriver, Sandbox, ViewMode};
pub use backends::{FrameSource, SensorBackendType};
pub use config::Config;
pub use errors::{AppError, AppResult};
