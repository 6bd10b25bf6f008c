// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic sensor
//!
//! Generates a deterministic moving test pattern at sensor resolution, so the
//! projector can be calibrated and the pipeline exercised without hardware.
//! The depth pattern is a tilted plane sweeping through the whole reliable
//! range, which renders as diagonal contour bands. A border of zero samples
//! stands in for the pixels a real sensor cannot resolve.

use super::types::{ColorFrame, DepthFrame, SensorBackendType, SensorDevice};
use super::FrameSource;
use crate::constants::{depth, sensor};
use crate::errors::SensorResult;
use tracing::debug;

/// Rows and columns at the frame edge reported as invalid depth
const INVALID_BORDER: u32 = 8;

/// Enumeration entry for the synthetic backend
pub fn device() -> SensorDevice {
    SensorDevice {
        name: "Synthetic test pattern".to_string(),
        backend: SensorBackendType::Synthetic,
        path: "synthetic:0".to_string(),
        serial: None,
    }
}

pub struct SyntheticSource {
    width: u32,
    height: u32,
    near_mode: bool,
    /// Deliver a frame on every n-th poll of a stream
    ready_every: u32,
    color_polls: u64,
    depth_polls: u64,
    stopped: bool,
}

impl SyntheticSource {
    pub fn new(near_mode: bool) -> Self {
        Self {
            width: sensor::FRAME_WIDTH,
            height: sensor::FRAME_HEIGHT,
            near_mode,
            ready_every: 1,
            color_polls: 0,
            depth_polls: 0,
            stopped: false,
        }
    }

    /// Only deliver a frame on every `n`-th poll, like a sensor running slower
    /// than the display
    pub fn with_ready_interval(mut self, n: u32) -> Self {
        self.ready_every = n.max(1);
        self
    }

    /// Override the frame size
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    fn is_ready(&self, polls: u64) -> bool {
        polls % self.ready_every as u64 == 0
    }

    fn color_pattern(&self, phase: u32) -> Vec<u8> {
        let mut data = Vec::with_capacity((self.width * self.height * 4) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                let b = (x * 255 / self.width.max(1)) as u8;
                let g = (y * 255 / self.height.max(1)) as u8;
                let r = ((x + y + phase) % 256) as u8;
                data.extend_from_slice(&[b, g, r, 255]);
            }
        }
        data
    }

    fn depth_pattern(&self, phase: u32) -> Vec<u16> {
        let (min, max) = if self.near_mode {
            (depth::NEAR_MIN_MM, depth::NEAR_MAX_MM)
        } else {
            (depth::STANDARD_MIN_MM, depth::STANDARD_MAX_MM)
        };
        let span = (max - min) as u32 + 1;

        let mut samples = Vec::with_capacity((self.width * self.height) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                let border = x < INVALID_BORDER
                    || y < INVALID_BORDER
                    || x + INVALID_BORDER >= self.width
                    || y + INVALID_BORDER >= self.height;
                if border {
                    samples.push(0);
                } else {
                    let offset = (x * 2 + y * 3 + phase * 4) % span;
                    samples.push(min + offset as u16);
                }
            }
        }
        samples
    }
}

impl FrameSource for SyntheticSource {
    fn next_color_frame(&mut self) -> SensorResult<Option<ColorFrame>> {
        if self.stopped {
            return Ok(None);
        }
        let polls = self.color_polls;
        self.color_polls += 1;
        if !self.is_ready(polls) {
            return Ok(None);
        }
        let data = self.color_pattern(polls as u32);
        Ok(Some(ColorFrame::packed(self.width, self.height, data)))
    }

    fn next_depth_frame(&mut self) -> SensorResult<Option<DepthFrame>> {
        if self.stopped {
            return Ok(None);
        }
        let polls = self.depth_polls;
        self.depth_polls += 1;
        if !self.is_ready(polls) {
            return Ok(None);
        }
        let samples = self.depth_pattern(polls as u32);
        Ok(Some(DepthFrame::packed(
            self.width,
            self.height,
            self.near_mode,
            samples,
        )))
    }

    fn shutdown(&mut self) {
        if !self.stopped {
            debug!(
                color_polls = self.color_polls,
                depth_polls = self.depth_polls,
                "Synthetic sensor stopped"
            );
            self.stopped = true;
        }
    }

    fn description(&self) -> String {
        format!(
            "synthetic {}x{}{}",
            self.width,
            self.height,
            if self.near_mode { " (near mode)" } else { "" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::normalizer::DepthRange;

    #[test]
    fn test_frames_at_sensor_resolution() {
        let mut source = SyntheticSource::new(false);
        let color = source.next_color_frame().unwrap().unwrap();
        assert_eq!(color.data.len(), 640 * 480 * 4);
        assert_eq!(color.pitch, 640 * 4);

        let depth = source.next_depth_frame().unwrap().unwrap();
        assert_eq!(depth.samples.len(), 640 * 480);
        assert!(!depth.near_mode);
    }

    #[test]
    fn test_depth_samples_stay_in_reliable_range() {
        for near_mode in [false, true] {
            let mut source = SyntheticSource::new(near_mode).with_size(64, 48);
            let range = DepthRange::for_mode(near_mode);
            let frame = source.next_depth_frame().unwrap().unwrap();
            for (i, &sample) in frame.samples.iter().enumerate() {
                let (x, y) = (i as u32 % 64, i as u32 / 64);
                let inner = (8..56).contains(&x) && (8..40).contains(&y);
                if inner {
                    assert!(range.contains(sample), "sample {} at {},{}", sample, x, y);
                } else {
                    assert_eq!(sample, 0);
                }
            }
        }
    }

    #[test]
    fn test_pattern_is_deterministic() {
        let mut a = SyntheticSource::new(false).with_size(32, 24);
        let mut b = SyntheticSource::new(false).with_size(32, 24);
        assert_eq!(a.next_depth_frame().unwrap(), b.next_depth_frame().unwrap());
        assert_eq!(a.next_color_frame().unwrap(), b.next_color_frame().unwrap());
    }

    #[test]
    fn test_ready_interval() {
        let mut source = SyntheticSource::new(false)
            .with_size(16, 16)
            .with_ready_interval(3);
        let ready: Vec<bool> = (0..6)
            .map(|_| source.next_depth_frame().unwrap().is_some())
            .collect();
        assert_eq!(ready, vec![true, false, false, true, false, false]);
    }

    #[test]
    fn test_no_frames_after_shutdown() {
        let mut source = SyntheticSource::new(true).with_size(16, 16);
        source.shutdown();
        source.shutdown();
        assert_eq!(source.next_color_frame().unwrap(), None);
        assert_eq!(source.next_depth_frame().unwrap(), None);
    }
}
