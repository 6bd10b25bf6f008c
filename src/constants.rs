// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants
//!
//! Everything the sandbox hardcodes lives here. The configuration file can
//! override the window and calibration values, but the defaults below are
//! what a bare `kinect-sandbox` invocation runs with.

/// Sensor frame geometry
///
/// Both the colour and the depth stream run at the Kinect's medium
/// resolution. Frame buffers and GPU textures are sized from these once at
/// startup and never reallocated.
pub mod sensor {
    /// Frame width in pixels
    pub const FRAME_WIDTH: u32 = 640;
    /// Frame height in pixels
    pub const FRAME_HEIGHT: u32 = 480;
    /// Bytes per colour pixel (BGRA)
    pub const COLOR_CHANNELS: u32 = 4;
    /// Bytes per normalized depth pixel
    pub const DEPTH_CHANNELS: u32 = 1;

    /// Number of pixels in one frame
    pub const fn pixel_count() -> usize {
        (FRAME_WIDTH * FRAME_HEIGHT) as usize
    }
}

/// Reliable depth ranges reported by the sensor, in millimetres
///
/// The Kinect v1 SDK publishes these as player-index-shifted values; the
/// numbers below are already unshifted.
pub mod depth {
    /// Minimum reliable depth in standard mode
    pub const STANDARD_MIN_MM: u16 = 800;
    /// Maximum reliable depth in standard mode
    pub const STANDARD_MAX_MM: u16 = 4000;
    /// Minimum reliable depth in near mode
    pub const NEAR_MIN_MM: u16 = 400;
    /// Maximum reliable depth in near mode
    pub const NEAR_MAX_MM: u16 = 3000;

    /// Offset subtracted before wrapping a depth sample into one byte.
    ///
    /// `(depth - 32) mod 256` turns the reliable range into a repeating
    /// intensity ramp (contour bands). Not a linear grey scale.
    pub const BAND_OFFSET: u16 = 32;

    /// Byte written for samples outside the reliable range
    pub const INVALID_SAMPLE: u8 = 0;
}

/// Projector window
pub mod window {
    /// Window title
    pub const TITLE: &str = "Kinect demo: press space to switch view modes";
    /// Window width in physical pixels (resizing is refused)
    pub const WIDTH: u32 = 1920;
    /// Window height in physical pixels
    pub const HEIGHT: u32 = 1080;
    /// Horizontal offset placing the window on the projector (second display)
    pub const X_OFFSET: i32 = 1920;
    /// Vertical offset
    pub const Y_OFFSET: i32 = 0;
}

/// Calibration defaults
///
/// Texture coordinates of the projected rectangle boundaries, derived by hand
/// for one sandbox rig.
pub mod calibration {
    pub const LEFT: f32 = -0.008_000_92;
    pub const RIGHT: f32 = 0.932_997;
    pub const TOP: f32 = 0.968_996;
    pub const BOTTOM: f32 = 0.095_000_1;

    /// Step applied per key press in coarse mode
    pub const STEP_COARSE: f32 = 0.05;
    /// Step applied per key press in fine mode
    pub const STEP_FINE: f32 = 0.001;
}

/// Number of vertices in the full-screen quad (two triangles)
pub const QUAD_VERTEX_COUNT: u32 = 6;

/// Exit status used for fatal errors
pub const FATAL_EXIT_CODE: i32 = -1;

/// Application version, stamped by the build script
pub fn app_version() -> &'static str {
    env!("GIT_VERSION")
}
