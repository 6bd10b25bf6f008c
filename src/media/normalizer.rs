// SPDX-License-Identifier: GPL-3.0-only

//! Image normalizer
//!
//! Turns raw sensor frames into 8-bit buffers ready for texture upload.
//!
//! - Colour: a straight byte copy. The sensor layout (BGRA) is declared to
//!   the GPU as-is, nothing is reordered on the host.
//! - Depth: samples inside the reliable range become `(depth - 32) mod 256`,
//!   everything else becomes 0. The wraparound is intentional; it paints the
//!   surface with repeating contour bands. Lossy and non-linear on purpose.
//!
//! A frame reporting zero pitch, or carrying fewer samples than the buffer
//! holds, is skipped: no byte of the buffer is written and the previous
//! image stays on screen.

use crate::backends::types::{ColorFrame, DepthFrame};
use crate::constants::{depth, sensor};
use tracing::debug;

/// Outcome of feeding one raw frame to the normalizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeOutcome {
    /// The buffer now holds the new frame
    Updated,
    /// Nothing was written; the previous contents remain
    Skipped,
}

/// Sensor-reported reliable depth bounds, inclusive, in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthRange {
    pub min: u16,
    pub max: u16,
}

impl DepthRange {
    pub fn new(min: u16, max: u16) -> Self {
        Self { min, max }
    }

    /// Range for the sensor's current operating mode
    pub fn for_mode(near_mode: bool) -> Self {
        if near_mode {
            Self::new(depth::NEAR_MIN_MM, depth::NEAR_MAX_MM)
        } else {
            Self::new(depth::STANDARD_MIN_MM, depth::STANDARD_MAX_MM)
        }
    }

    #[inline]
    pub fn contains(&self, sample: u16) -> bool {
        sample >= self.min && sample <= self.max
    }

    /// Quantize one sample into a byte
    #[inline]
    pub fn band(&self, sample: u16) -> u8 {
        if self.contains(sample) {
            // Keeping only the low byte of the u16 difference is exactly
            // the euclidean `mod 256`, also for samples below the offset.
            sample.wrapping_sub(depth::BAND_OFFSET) as u8
        } else {
            depth::INVALID_SAMPLE
        }
    }
}

/// Fixed-size image buffer, one per view mode
///
/// Allocated once at startup and overwritten in place; it never grows or
/// shrinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    channels: u32,
    data: Vec<u8>,
}

impl FrameBuffer {
    /// Buffer filled with `fill`
    pub fn new(width: u32, height: u32, channels: u32, fill: u8) -> Self {
        Self {
            width,
            height,
            channels,
            data: vec![fill; (width * height * channels) as usize],
        }
    }

    /// BGRA buffer at sensor resolution, initially white
    pub fn color() -> Self {
        Self::new(
            sensor::FRAME_WIDTH,
            sensor::FRAME_HEIGHT,
            sensor::COLOR_CHANNELS,
            255,
        )
    }

    /// Single-channel buffer at sensor resolution, initially white
    pub fn depth() -> Self {
        Self::new(
            sensor::FRAME_WIDTH,
            sensor::FRAME_HEIGHT,
            sensor::DEPTH_CHANNELS,
            255,
        )
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Bytes per row
    pub fn row_bytes(&self) -> u32 {
        self.width * self.channels
    }

    pub fn pixel_count(&self) -> usize {
        (self.width * self.height) as usize
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Copy a colour frame into the colour buffer
pub fn normalize_color(frame: &ColorFrame, buffer: &mut FrameBuffer) -> NormalizeOutcome {
    let needed = buffer.data.len();
    if frame.pitch == 0 || frame.data.len() < needed {
        debug!(
            pitch = frame.pitch,
            bytes = frame.data.len(),
            needed,
            "Skipping colour frame without usable data"
        );
        return NormalizeOutcome::Skipped;
    }

    buffer.data.copy_from_slice(&frame.data[..needed]);
    NormalizeOutcome::Updated
}

/// Quantize a depth frame into the depth buffer
///
/// The reliable range is recomputed from the frame's near-mode flag.
pub fn normalize_depth(frame: &DepthFrame, buffer: &mut FrameBuffer) -> NormalizeOutcome {
    let needed = buffer.pixel_count();
    if frame.pitch == 0 || frame.samples.len() < needed {
        debug!(
            pitch = frame.pitch,
            samples = frame.samples.len(),
            needed,
            "Skipping depth frame without usable data"
        );
        return NormalizeOutcome::Skipped;
    }

    let range = DepthRange::for_mode(frame.near_mode);
    for (out, &sample) in buffer.data.iter_mut().zip(&frame.samples[..needed]) {
        *out = range.band(sample);
    }
    NormalizeOutcome::Updated
}
