// SPDX-License-Identifier: GPL-3.0-only

//! Per-tick render pipeline
//!
//! ```text
//! Idle ─▶ Acquiring ─▶ Normalizing ─▶ Uploading ─▶ Drawing ─▶ Presenting ─▶ Idle
//!             │              │                        ▲
//!             └─ not ready ──┴──── skipped ───────────┘
//! ```
//!
//! Only the channel selected by the view mode is polled. When the sensor has
//! nothing new, or the frame is unusable, the texture keeps its previous
//! contents and the tick still draws and presents. Any error aborts the tick
//! and leaves [`RenderLoop::stage`] at the stage that failed.

use super::state::{AppState, ViewMode};
use crate::backends::{ColorFrame, DepthFrame, FrameSource};
use crate::constants::QUAD_VERTEX_COUNT;
use crate::errors::{AppResult, RenderResult};
use crate::media::{FrameBuffer, NormalizeOutcome, normalize_color, normalize_depth};
use std::fmt;
use tracing::{debug, trace};

/// Stage of the per-tick state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    Idle,
    Acquiring,
    Normalizing,
    Uploading,
    Drawing,
    Presenting,
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenderStage::Idle => "idle",
            RenderStage::Acquiring => "acquiring",
            RenderStage::Normalizing => "normalizing",
            RenderStage::Uploading => "uploading",
            RenderStage::Drawing => "drawing",
            RenderStage::Presenting => "presenting",
        };
        f.write_str(name)
    }
}

/// Inputs of one draw call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawParams {
    /// Calibration transform, column-major
    pub transform: [[f32; 4]; 4],
    pub view_mode: ViewMode,
    pub vertex_count: u32,
}

impl DrawParams {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            transform: state.calibration.transform_columns(),
            view_mode: state.view_mode,
            vertex_count: QUAD_VERTEX_COUNT,
        }
    }
}

/// Graphics boundary used by the render loop
///
/// Implemented by the wgpu quad renderer, and by recording mocks in tests.
pub trait Renderer {
    /// Replace the texture backing `mode` with `buffer`
    fn upload(&mut self, mode: ViewMode, buffer: &FrameBuffer) -> RenderResult<()>;

    /// Draw the calibrated quad with the texture for `params.view_mode`
    fn draw(&mut self, params: &DrawParams) -> RenderResult<()>;

    /// Show the frame drawn since the last present
    fn present(&mut self) -> RenderResult<()>;

    /// Surface size changed
    fn resize(&mut self, width: u32, height: u32);

    /// Release GPU resources
    fn release(&mut self) {}
}

/// What happened to the sensor frame during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Sensor had nothing new
    NotReady,
    /// A frame arrived but was unusable
    Skipped,
    /// The texture was refreshed
    Uploaded,
}

/// Summary of one completed tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub view_mode: ViewMode,
    pub frame: FrameOutcome,
}

/// Running totals, logged at shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub uploads: u64,
    pub not_ready: u64,
    pub skipped: u64,
}

enum RawFrame {
    Color(ColorFrame),
    Depth(DepthFrame),
}

/// Owner of the two frame buffers and the tick state machine
pub struct RenderLoop {
    stage: RenderStage,
    color: FrameBuffer,
    depth: FrameBuffer,
    stats: LoopStats,
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new(FrameBuffer::color(), FrameBuffer::depth())
    }
}

impl RenderLoop {
    pub fn new(color: FrameBuffer, depth: FrameBuffer) -> Self {
        Self {
            stage: RenderStage::Idle,
            color,
            depth,
            stats: LoopStats::default(),
        }
    }

    pub fn stage(&self) -> RenderStage {
        self.stage
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Buffer displayed in `mode`
    pub fn buffer(&self, mode: ViewMode) -> &FrameBuffer {
        match mode {
            ViewMode::Color => &self.color,
            ViewMode::Depth => &self.depth,
        }
    }

    /// Upload both initial buffers so either view has a defined texture
    /// before the first frame arrives
    pub fn prime<R: Renderer + ?Sized>(&mut self, renderer: &mut R) -> RenderResult<()> {
        renderer.upload(ViewMode::Color, &self.color)?;
        renderer.upload(ViewMode::Depth, &self.depth)?;
        Ok(())
    }

    /// Run one tick from `Idle` back to `Idle`
    pub fn tick<S, R>(
        &mut self,
        state: &AppState,
        source: &mut S,
        renderer: &mut R,
    ) -> AppResult<TickReport>
    where
        S: FrameSource + ?Sized,
        R: Renderer + ?Sized,
    {
        let mode = state.view_mode;
        let mut raw: Option<RawFrame> = None;
        let mut frame = FrameOutcome::NotReady;

        self.stats.ticks += 1;
        self.stage = RenderStage::Acquiring;

        while self.stage != RenderStage::Idle {
            trace!(stage = %self.stage, "Render stage");
            self.stage = match self.stage {
                RenderStage::Acquiring => {
                    raw = match mode {
                        ViewMode::Color => source.next_color_frame()?.map(RawFrame::Color),
                        ViewMode::Depth => source.next_depth_frame()?.map(RawFrame::Depth),
                    };
                    if raw.is_some() {
                        RenderStage::Normalizing
                    } else {
                        self.stats.not_ready += 1;
                        RenderStage::Drawing
                    }
                }
                RenderStage::Normalizing => {
                    let outcome = match raw.take() {
                        Some(RawFrame::Color(f)) => normalize_color(&f, &mut self.color),
                        Some(RawFrame::Depth(f)) => normalize_depth(&f, &mut self.depth),
                        None => NormalizeOutcome::Skipped,
                    };
                    if outcome == NormalizeOutcome::Updated {
                        RenderStage::Uploading
                    } else {
                        self.stats.skipped += 1;
                        frame = FrameOutcome::Skipped;
                        RenderStage::Drawing
                    }
                }
                RenderStage::Uploading => {
                    renderer.upload(mode, self.buffer(mode))?;
                    self.stats.uploads += 1;
                    frame = FrameOutcome::Uploaded;
                    RenderStage::Drawing
                }
                RenderStage::Drawing => {
                    renderer.draw(&DrawParams::from_state(state))?;
                    RenderStage::Presenting
                }
                RenderStage::Presenting => {
                    renderer.present()?;
                    RenderStage::Idle
                }
                RenderStage::Idle => RenderStage::Idle,
            };
        }

        debug!(view = %mode, ?frame, "Tick complete");
        Ok(TickReport {
            view_mode: mode,
            frame,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::errors::{RenderError, SensorError, SensorResult};

    /// Renderer that records every call
    #[derive(Default)]
    pub(crate) struct RecordingRenderer {
        pub uploads: Vec<(ViewMode, Vec<u8>)>,
        pub draws: Vec<DrawParams>,
        pub presents: usize,
        pub sizes: Vec<(u32, u32)>,
        pub releases: usize,
        pub fail_present: bool,
    }

    impl Renderer for RecordingRenderer {
        fn upload(&mut self, mode: ViewMode, buffer: &FrameBuffer) -> RenderResult<()> {
            self.uploads.push((mode, buffer.as_bytes().to_vec()));
            Ok(())
        }

        fn draw(&mut self, params: &DrawParams) -> RenderResult<()> {
            self.draws.push(*params);
            Ok(())
        }

        fn present(&mut self) -> RenderResult<()> {
            if self.fail_present {
                return Err(RenderError::Surface("device lost".into()));
            }
            self.presents += 1;
            Ok(())
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.sizes.push((width, height));
        }

        fn release(&mut self) {
            self.releases += 1;
        }
    }

    /// Frame source replaying a script of depth/colour results
    #[derive(Default)]
    pub(crate) struct ScriptedSource {
        pub depth: Vec<SensorResult<Option<DepthFrame>>>,
        pub color: Vec<SensorResult<Option<ColorFrame>>>,
        pub depth_polls: usize,
        pub color_polls: usize,
        pub shutdowns: usize,
    }

    impl FrameSource for ScriptedSource {
        fn next_color_frame(&mut self) -> SensorResult<Option<ColorFrame>> {
            self.color_polls += 1;
            if self.color.is_empty() {
                Ok(None)
            } else {
                self.color.remove(0)
            }
        }

        fn next_depth_frame(&mut self) -> SensorResult<Option<DepthFrame>> {
            self.depth_polls += 1;
            if self.depth.is_empty() {
                Ok(None)
            } else {
                self.depth.remove(0)
            }
        }

        fn shutdown(&mut self) {
            self.shutdowns += 1;
        }

        fn description(&self) -> String {
            "scripted".to_string()
        }
    }

    fn small_loop() -> RenderLoop {
        RenderLoop::new(FrameBuffer::new(2, 2, 4, 255), FrameBuffer::new(2, 2, 1, 255))
    }

    fn depth(samples: [u16; 4]) -> DepthFrame {
        DepthFrame::packed(2, 2, false, samples.to_vec())
    }

    #[test]
    fn test_new_frame_is_uploaded_then_drawn() {
        let mut render_loop = small_loop();
        let mut source = ScriptedSource {
            depth: vec![Ok(Some(depth([1000, 100, 800, 4000])))],
            ..Default::default()
        };
        let mut renderer = RecordingRenderer::default();
        let state = AppState::default();

        let report = render_loop.tick(&state, &mut source, &mut renderer).unwrap();

        assert_eq!(report.frame, FrameOutcome::Uploaded);
        assert_eq!(render_loop.stage(), RenderStage::Idle);
        assert_eq!(renderer.uploads.len(), 1);
        assert_eq!(renderer.uploads[0].0, ViewMode::Depth);
        assert_eq!(renderer.uploads[0].1, vec![200, 0, 0, 128]);
        assert_eq!(renderer.draws.len(), 1);
        assert_eq!(renderer.draws[0].vertex_count, 6);
        assert_eq!(renderer.presents, 1);
    }

    #[test]
    fn test_only_active_channel_is_polled() {
        let mut render_loop = small_loop();
        let mut source = ScriptedSource::default();
        let mut renderer = RecordingRenderer::default();
        let mut state = AppState::default();

        render_loop.tick(&state, &mut source, &mut renderer).unwrap();
        state.toggle_view_mode();
        render_loop.tick(&state, &mut source, &mut renderer).unwrap();

        assert_eq!(source.depth_polls, 1);
        assert_eq!(source.color_polls, 1);
    }

    #[test]
    fn test_not_ready_skips_upload_but_presents() {
        let mut render_loop = small_loop();
        let mut source = ScriptedSource::default();
        let mut renderer = RecordingRenderer::default();

        let report = render_loop
            .tick(&AppState::default(), &mut source, &mut renderer)
            .unwrap();

        assert_eq!(report.frame, FrameOutcome::NotReady);
        assert!(renderer.uploads.is_empty());
        assert_eq!(renderer.draws.len(), 1);
        assert_eq!(renderer.presents, 1);
        assert_eq!(render_loop.stats().not_ready, 1);
    }

    #[test]
    fn test_zero_pitch_frame_is_skipped() {
        let mut render_loop = small_loop();
        let mut frame = depth([1000; 4]);
        frame.pitch = 0;
        let mut source = ScriptedSource {
            depth: vec![Ok(Some(frame))],
            ..Default::default()
        };
        let mut renderer = RecordingRenderer::default();

        let report = render_loop
            .tick(&AppState::default(), &mut source, &mut renderer)
            .unwrap();

        assert_eq!(report.frame, FrameOutcome::Skipped);
        assert!(renderer.uploads.is_empty());
        assert_eq!(render_loop.buffer(ViewMode::Depth).as_bytes(), &[255; 4]);
    }

    #[test]
    fn test_sensor_error_aborts_at_acquiring() {
        let mut render_loop = small_loop();
        let mut source = ScriptedSource {
            depth: vec![Err(SensorError::Disconnected("unplugged".into()))],
            ..Default::default()
        };
        let mut renderer = RecordingRenderer::default();

        let result = render_loop.tick(&AppState::default(), &mut source, &mut renderer);

        assert!(result.is_err());
        assert_eq!(render_loop.stage(), RenderStage::Acquiring);
        assert!(renderer.draws.is_empty());
    }

    #[test]
    fn test_present_error_aborts_at_presenting() {
        let mut render_loop = small_loop();
        let mut source = ScriptedSource::default();
        let mut renderer = RecordingRenderer {
            fail_present: true,
            ..Default::default()
        };

        let result = render_loop.tick(&AppState::default(), &mut source, &mut renderer);

        assert!(result.is_err());
        assert_eq!(render_loop.stage(), RenderStage::Presenting);
    }

    #[test]
    fn test_prime_uploads_both_buffers() {
        let mut render_loop = small_loop();
        let mut renderer = RecordingRenderer::default();
        render_loop.prime(&mut renderer).unwrap();

        let modes: Vec<ViewMode> = renderer.uploads.iter().map(|(m, _)| *m).collect();
        assert_eq!(modes, vec![ViewMode::Color, ViewMode::Depth]);
        assert!(renderer.uploads.iter().all(|(_, b)| b.iter().all(|&x| x == 255)));
    }

    #[test]
    fn test_draw_params_follow_state() {
        let mut state = AppState::default();
        state.toggle_view_mode();
        let params = DrawParams::from_state(&state);
        assert_eq!(params.view_mode, ViewMode::Color);
        assert_eq!(params.transform, state.calibration.transform_columns());
    }
}
