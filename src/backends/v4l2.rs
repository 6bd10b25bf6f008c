// SPDX-License-Identifier: GPL-3.0-only

//! Kernel `kinect` driver backend
//!
//! The in-kernel driver exposes one Kinect as two V4L2 capture nodes, a
//! colour node (UYVY or Bayer GRBG) and a depth node (Y16). Both report the
//! same `bus_info`, which is how they are paired. Each node is read on its
//! own capture thread; the render loop picks up the newest frame of each.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::{Format, FourCC};

use super::frame_loop::{CaptureLoopController, FrameSlot, LoopAction};
use super::types::{ColorFrame, DepthFrame, SensorBackendType, SensorDevice};
use super::FrameSource;
use crate::constants::sensor;
use crate::errors::{SensorError, SensorResult};
use crate::media::conversions::{grbg_to_bgra, uyvy_to_bgra, y16_to_samples};

/// Driver name reported by QUERYCAP
const KINECT_DRIVER: &str = "kinect";

/// Buffers queued per stream
const STREAM_BUFFERS: u32 = 4;

/// Consecutive dequeue failures tolerated before the stream is declared dead
const MAX_CONSECUTIVE_ERRORS: u32 = 30;

/// errno for a device that went away
const ENODEV: i32 = 19;

const FOURCC_UYVY: &[u8; 4] = b"UYVY";
const FOURCC_GRBG: &[u8; 4] = b"GRBG";
const FOURCC_Y16: &[u8; 4] = b"Y16 ";

/// Colour and depth nodes of one physical sensor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KinectNodePair {
    pub color_path: String,
    pub depth_path: String,
    pub bus_info: String,
    pub card: String,
}

impl KinectNodePair {
    /// `color:depth` locator stored in [`SensorDevice::path`]
    pub fn locator(&self) -> String {
        format!("{}:{}", self.color_path, self.depth_path)
    }

    pub fn from_locator(locator: &str) -> Option<(String, String)> {
        let (color, depth) = locator.split_once(':')?;
        if color.is_empty() || depth.is_empty() {
            return None;
        }
        Some((color.to_string(), depth.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Color,
    Depth,
}

#[derive(Debug)]
struct NodeCandidate {
    path: String,
    kind: NodeKind,
    bus_info: String,
    card: String,
}

fn classify_formats(fourccs: &[FourCC]) -> Option<NodeKind> {
    if fourccs.iter().any(|f| *f == FourCC::new(FOURCC_Y16)) {
        Some(NodeKind::Depth)
    } else if fourccs
        .iter()
        .any(|f| *f == FourCC::new(FOURCC_UYVY) || *f == FourCC::new(FOURCC_GRBG))
    {
        Some(NodeKind::Color)
    } else {
        None
    }
}

fn pair_candidates(candidates: Vec<NodeCandidate>) -> Vec<KinectNodePair> {
    let mut by_bus: BTreeMap<String, (Option<NodeCandidate>, Option<NodeCandidate>)> =
        BTreeMap::new();
    for candidate in candidates {
        let entry = by_bus.entry(candidate.bus_info.clone()).or_default();
        match candidate.kind {
            NodeKind::Color if entry.0.is_none() => entry.0 = Some(candidate),
            NodeKind::Depth if entry.1.is_none() => entry.1 = Some(candidate),
            _ => debug!(path = %candidate.path, "Ignoring extra node on bus"),
        }
    }

    by_bus
        .into_iter()
        .filter_map(|(bus_info, nodes)| match nodes {
            (Some(color), Some(depth)) => Some(KinectNodePair {
                color_path: color.path,
                depth_path: depth.path,
                bus_info,
                card: color.card,
            }),
            _ => {
                debug!(bus_info = %bus_info, "Incomplete node pair");
                None
            }
        })
        .collect()
}

/// Scan `/dev/video*` for kernel driver node pairs
pub fn find_node_pairs() -> Vec<KinectNodePair> {
    let mut paths: Vec<String> = std::fs::read_dir("/dev")
        .into_iter()
        .flatten()
        .flatten()
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            name.starts_with("video")
                .then(|| e.path().to_string_lossy().to_string())
        })
        .collect();
    paths.sort();

    let mut candidates = Vec::new();
    for path in paths {
        let Ok(dev) = Device::with_path(&path) else {
            continue;
        };
        let Ok(caps) = dev.query_caps() else {
            continue;
        };
        if caps.driver != KINECT_DRIVER {
            continue;
        }

        let fourccs: Vec<FourCC> = dev
            .enum_formats()
            .into_iter()
            .flatten()
            .map(|f| f.fourcc)
            .collect();
        let Some(kind) = classify_formats(&fourccs) else {
            debug!(path = %path, "Kinect node without a usable format");
            continue;
        };

        debug!(path = %path, kind = ?kind, bus_info = %caps.bus, "Found kinect node");
        candidates.push(NodeCandidate {
            path,
            kind,
            bus_info: caps.bus,
            card: caps.card,
        });
    }

    pair_candidates(candidates)
}

/// Enumerate kernel driver sensors
pub fn enumerate_devices() -> Vec<SensorDevice> {
    find_node_pairs()
        .into_iter()
        .map(|pair| SensorDevice {
            name: pair.card.clone(),
            backend: SensorBackendType::V4l2,
            path: pair.locator(),
            serial: Some(pair.bus_info.clone()),
        })
        .collect()
}

fn dequeue_failed(name: &str, error: &std::io::Error, consecutive: &mut u32) -> Option<String> {
    *consecutive += 1;
    if error.raw_os_error() == Some(ENODEV) || *consecutive >= MAX_CONSECUTIVE_ERRORS {
        Some(format!("{} stream lost: {}", name, error))
    } else {
        warn!(stream = name, error = %error, "Failed to dequeue frame");
        None
    }
}

/// Sensor opened through the kernel driver
pub struct KernelKinectSource {
    pair_locator: String,
    color_slot: FrameSlot<ColorFrame>,
    depth_slot: FrameSlot<DepthFrame>,
    color_loop: Option<CaptureLoopController>,
    depth_loop: Option<CaptureLoopController>,
}

impl KernelKinectSource {
    /// Configure both nodes and start capturing
    pub fn open(device: &SensorDevice) -> SensorResult<Self> {
        let (color_path, depth_path) = KinectNodePair::from_locator(&device.path)
            .ok_or_else(|| SensorError::Backend(format!("bad node pair '{}'", device.path)))?;

        let color_dev = Device::with_path(&color_path)
            .map_err(|e| SensorError::StreamOpenFailed(format!("{}: {}", color_path, e)))?;
        let depth_dev = Device::with_path(&depth_path)
            .map_err(|e| SensorError::StreamOpenFailed(format!("{}: {}", depth_path, e)))?;

        let color_format = set_first_format(&color_dev, &[FOURCC_UYVY, FOURCC_GRBG])
            .map_err(|e| SensorError::StreamOpenFailed(format!("{}: {}", color_path, e)))?;
        let depth_format = set_first_format(&depth_dev, &[FOURCC_Y16])
            .map_err(|e| SensorError::StreamOpenFailed(format!("{}: {}", depth_path, e)))?;

        info!(
            color = %color_path,
            color_fourcc = %color_format.fourcc,
            depth = %depth_path,
            depth_stride = depth_format.stride,
            "Kernel kinect nodes configured"
        );

        let color_slot = FrameSlot::new();
        let depth_slot = FrameSlot::new();
        let color_loop = spawn_color_loop(color_dev, color_format, color_slot.clone());
        let depth_loop = spawn_depth_loop(depth_dev, depth_format, depth_slot.clone());

        Ok(Self {
            pair_locator: device.path.clone(),
            color_slot,
            depth_slot,
            color_loop: Some(color_loop),
            depth_loop: Some(depth_loop),
        })
    }
}

fn set_first_format(dev: &Device, fourccs: &[&[u8; 4]]) -> std::io::Result<Format> {
    let mut last_error = None;
    for fourcc in fourccs {
        let wanted = Format::new(sensor::FRAME_WIDTH, sensor::FRAME_HEIGHT, FourCC::new(fourcc));
        match dev.set_format(&wanted) {
            Ok(actual) if actual.fourcc == wanted.fourcc => return Ok(actual),
            Ok(actual) => {
                debug!(wanted = %wanted.fourcc, got = %actual.fourcc, "Driver substituted format");
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(last_error.unwrap_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::Unsupported, "no supported pixel format")
    }))
}

fn spawn_color_loop(
    dev: Device,
    format: Format,
    slot: FrameSlot<ColorFrame>,
) -> CaptureLoopController {
    let init_slot = slot.clone();
    let mut consecutive_errors = 0u32;

    CaptureLoopController::start_with_init(
        "kinect-color",
        move || {
            Stream::with_buffers(&dev, Type::VideoCapture, STREAM_BUFFERS).map_err(|e| {
                let reason = format!("color stream: {}", e);
                init_slot.fail(reason.clone());
                reason
            })
        },
        move |stream| match stream.next() {
            Ok((buf, _meta)) => {
                consecutive_errors = 0;
                let data = if format.fourcc == FourCC::new(FOURCC_UYVY) {
                    uyvy_to_bgra(buf, format.width, format.height)
                } else {
                    grbg_to_bgra(buf, format.width, format.height)
                };
                slot.publish(ColorFrame::packed(format.width, format.height, data));
                LoopAction::Continue
            }
            Err(e) => match dequeue_failed("color", &e, &mut consecutive_errors) {
                Some(reason) => {
                    slot.fail(reason);
                    LoopAction::Stop
                }
                None => LoopAction::Continue,
            },
        },
    )
}

fn spawn_depth_loop(
    dev: Device,
    format: Format,
    slot: FrameSlot<DepthFrame>,
) -> CaptureLoopController {
    let init_slot = slot.clone();
    let mut consecutive_errors = 0u32;

    CaptureLoopController::start_with_init(
        "kinect-depth",
        move || {
            Stream::with_buffers(&dev, Type::VideoCapture, STREAM_BUFFERS).map_err(|e| {
                let reason = format!("depth stream: {}", e);
                init_slot.fail(reason.clone());
                reason
            })
        },
        move |stream| match stream.next() {
            Ok((buf, _meta)) => {
                consecutive_errors = 0;
                // Empty buffers keep pitch 0 and are skipped downstream
                let pitch = if buf.is_empty() { 0 } else { format.stride };
                slot.publish(DepthFrame {
                    width: format.width,
                    height: format.height,
                    pitch,
                    near_mode: false,
                    samples: y16_to_samples(buf),
                });
                LoopAction::Continue
            }
            Err(e) => match dequeue_failed("depth", &e, &mut consecutive_errors) {
                Some(reason) => {
                    slot.fail(reason);
                    LoopAction::Stop
                }
                None => LoopAction::Continue,
            },
        },
    )
}

impl FrameSource for KernelKinectSource {
    fn next_color_frame(&mut self) -> SensorResult<Option<ColorFrame>> {
        self.color_slot.take().map_err(SensorError::Disconnected)
    }

    fn next_depth_frame(&mut self) -> SensorResult<Option<DepthFrame>> {
        self.depth_slot.take().map_err(SensorError::Disconnected)
    }

    fn shutdown(&mut self) {
        for (name, controller) in [("color", &mut self.color_loop), ("depth", &mut self.depth_loop)]
        {
            if let Some(mut controller) = controller.take() {
                controller.stop();
                debug!(stream = name, "Capture stopped");
            }
        }
    }

    fn description(&self) -> String {
        format!("v4l2 {}", self.pair_locator)
    }
}

impl Drop for KernelKinectSource {
    fn drop(&mut self) {
        self.shutdown();
    }
}
