// SPDX-License-Identifier: GPL-3.0-only

//! Userspace USB backend through freedepth
//!
//! freedepth unbinds the kernel driver, streams Bayer colour and 11-bit
//! depth over USB and hands frames out on two channels. A single capture
//! thread drains both channels, converts colour to BGRA and raw depth to
//! millimetres with the device's own calibration table, and publishes the
//! result for the render loop.

use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use freedepth::{DepthFormat, DepthRegistration, KinectStreamer, Resolution, VideoFormat};
use tracing::{debug, info, warn};

use super::frame_loop::{CaptureLoopController, FrameSlot, LoopAction};
use super::types::{ColorFrame, DepthFrame, SensorBackendType, SensorDevice};
use super::FrameSource;
use crate::errors::{SensorError, SensorResult};
use crate::media::conversions::rgb_to_bgra;

/// Locator prefix in [`SensorDevice::path`]
pub const PATH_PREFIX: &str = "freedepth:";

/// Idle wait when neither channel had a frame
const IDLE_SLEEP: Duration = Duration::from_millis(1);

/// Enumerate sensors visible to freedepth
pub fn enumerate_devices() -> Vec<SensorDevice> {
    let devices = match freedepth::enumerate_devices() {
        Ok(d) => d,
        Err(e) => {
            debug!("freedepth enumeration failed: {}", e);
            return Vec::new();
        }
    };

    devices
        .iter()
        .map(|dev| SensorDevice {
            name: dev.name.clone(),
            backend: SensorBackendType::Freedepth,
            path: format!("{}{}", PATH_PREFIX, dev.index),
            serial: dev.id.serial.clone(),
        })
        .collect()
}

/// Device index encoded in a freedepth locator
pub fn device_index(path: &str) -> Option<usize> {
    path.strip_prefix(PATH_PREFIX)?.parse().ok()
}

pub struct FreedepthSource {
    index: usize,
    streamer: Option<KinectStreamer>,
    capture: Option<CaptureLoopController>,
    color_slot: FrameSlot<ColorFrame>,
    depth_slot: FrameSlot<DepthFrame>,
}

impl FreedepthSource {
    /// Claim the device and start both streams
    pub fn open(device: &SensorDevice) -> SensorResult<Self> {
        let index = device_index(&device.path)
            .ok_or_else(|| SensorError::Backend(format!("bad freedepth path '{}'", device.path)))?;

        let mut streamer = KinectStreamer::new(index)
            .map_err(|e| SensorError::StreamOpenFailed(format!("device {}: {}", index, e)))?;

        let (video_rx, depth_rx) = match streamer.start(
            VideoFormat::Bayer,
            Resolution::Medium,
            DepthFormat::Depth11Bit,
        ) {
            Ok(channels) => channels,
            Err(e) => {
                // Hand the device back to the kernel before trying the next one
                if let Err(rebind) = streamer.rebind_driver() {
                    warn!("Failed to rebind kernel driver: {}", rebind);
                }
                return Err(SensorError::StreamOpenFailed(format!(
                    "device {}: {}",
                    index, e
                )));
            }
        };

        let registration = streamer.create_depth_registration();
        let converter = Arc::new(registration.depth_to_mm().clone());
        info!(
            index,
            target_offset = registration.target_offset(),
            "freedepth streams started"
        );

        let color_slot = FrameSlot::new();
        let depth_slot = FrameSlot::new();
        let capture = spawn_capture(
            video_rx,
            depth_rx,
            converter,
            color_slot.clone(),
            depth_slot.clone(),
        );

        Ok(Self {
            index,
            streamer: Some(streamer),
            capture: Some(capture),
            color_slot,
            depth_slot,
        })
    }
}

fn spawn_capture(
    video_rx: Receiver<freedepth::VideoFrame>,
    depth_rx: Receiver<freedepth::DepthFrame>,
    converter: Arc<freedepth::DepthToMm>,
    color_slot: FrameSlot<ColorFrame>,
    depth_slot: FrameSlot<DepthFrame>,
) -> CaptureLoopController {
    CaptureLoopController::start("freedepth-frames", move || {
        let mut idle = true;

        match video_rx.try_recv() {
            Ok(frame) => {
                idle = false;
                color_slot.publish(convert_video(&frame));
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                color_slot.fail("colour channel disconnected");
                depth_slot.fail("colour channel disconnected");
                return LoopAction::Stop;
            }
        }

        match depth_rx.try_recv() {
            Ok(frame) => {
                idle = false;
                depth_slot.publish(convert_depth(&frame, &converter));
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                color_slot.fail("depth channel disconnected");
                depth_slot.fail("depth channel disconnected");
                return LoopAction::Stop;
            }
        }

        if idle {
            thread::sleep(IDLE_SLEEP);
        }
        LoopAction::Continue
    })
}

fn convert_video(frame: &freedepth::VideoFrame) -> ColorFrame {
    let pixels = (frame.width * frame.height) as usize;
    if frame.data.len() < pixels {
        return ColorFrame::packed(frame.width, frame.height, Vec::new());
    }
    let mut rgb = vec![0u8; pixels * 3];
    freedepth::convert_bayer_to_rgb(&frame.data, &mut rgb, frame.width, frame.height);
    ColorFrame::packed(frame.width, frame.height, rgb_to_bgra(&rgb))
}

fn convert_depth(frame: &freedepth::DepthFrame, converter: &freedepth::DepthToMm) -> DepthFrame {
    let Some(raw) = frame.as_u16() else {
        return DepthFrame::packed(frame.width, frame.height, false, Vec::new());
    };
    let mut millimetres = vec![0u16; raw.len()];
    converter.convert_frame(raw, &mut millimetres);
    // Near mode belongs to the Windows-only sensor variant; USB streaming is
    // always in the standard range
    DepthFrame::packed(frame.width, frame.height, false, millimetres)
}

impl FrameSource for FreedepthSource {
    fn next_color_frame(&mut self) -> SensorResult<Option<ColorFrame>> {
        self.color_slot.take().map_err(SensorError::Disconnected)
    }

    fn next_depth_frame(&mut self) -> SensorResult<Option<DepthFrame>> {
        self.depth_slot.take().map_err(SensorError::Disconnected)
    }

    fn shutdown(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            capture.stop();
        }
        if let Some(mut streamer) = self.streamer.take() {
            streamer.stop();
            if let Err(e) = streamer.rebind_driver() {
                warn!("Failed to rebind kernel driver: {}", e);
            }
            info!(index = self.index, "freedepth streams stopped");
        }
    }

    fn description(&self) -> String {
        format!("freedepth device {}", self.index)
    }
}

impl Drop for FreedepthSource {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_index_parsing() {
        assert_eq!(device_index("freedepth:0"), Some(0));
        assert_eq!(device_index("freedepth:12"), Some(12));
        assert_eq!(device_index("freedepth:x"), None);
        assert_eq!(device_index("/dev/video0"), None);
    }
}
