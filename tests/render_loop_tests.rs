// SPDX-License-Identifier: MPL-2.0

//! End-to-end render loop tests with the synthetic sensor and a recording
//! renderer

use kinect_sandbox::app::{
    AppState, DrawParams, FrameDriver, FrameOutcome, KeyInput, LoopControl, RenderLoop, Renderer,
    Sandbox, ViewMode,
};
use kinect_sandbox::backends::FrameSource;
use kinect_sandbox::backends::synthetic::SyntheticSource;
use kinect_sandbox::errors::RenderResult;
use kinect_sandbox::media::FrameBuffer;

#[derive(Default)]
struct Recorder {
    uploads: Vec<(ViewMode, Vec<u8>)>,
    draws: Vec<DrawParams>,
    presents: usize,
}

impl Renderer for Recorder {
    fn upload(&mut self, mode: ViewMode, buffer: &FrameBuffer) -> RenderResult<()> {
        self.uploads.push((mode, buffer.as_bytes().to_vec()));
        Ok(())
    }

    fn draw(&mut self, params: &DrawParams) -> RenderResult<()> {
        self.draws.push(*params);
        Ok(())
    }

    fn present(&mut self) -> RenderResult<()> {
        self.presents += 1;
        Ok(())
    }

    fn resize(&mut self, _width: u32, _height: u32) {}
}

#[test]
fn test_synthetic_depth_is_banded() {
    let mut render_loop = RenderLoop::default();
    let mut source = SyntheticSource::new(false);
    let mut renderer = Recorder::default();

    let report = render_loop
        .tick(&AppState::default(), &mut source, &mut renderer)
        .unwrap();
    assert_eq!(report.frame, FrameOutcome::Uploaded);

    let depth = render_loop.buffer(ViewMode::Depth).as_bytes();
    // Border pixels are outside the reliable range
    assert_eq!(depth[0], 0);
    // Inner pixels follow (d - 32) mod 256 with d = 800 + (2x + 3y) at phase 0
    let (x, y) = (100usize, 50usize);
    let d = 800 + 2 * x + 3 * y;
    assert_eq!(depth[y * 640 + x], ((d - 32) % 256) as u8);
}

#[test]
fn test_slow_sensor_keeps_last_frame() {
    let mut render_loop = RenderLoop::default();
    let mut source = SyntheticSource::new(false).with_ready_interval(2);
    let mut renderer = Recorder::default();
    let state = AppState::default();

    let first = render_loop.tick(&state, &mut source, &mut renderer).unwrap();
    let snapshot = render_loop.buffer(ViewMode::Depth).clone();
    let second = render_loop.tick(&state, &mut source, &mut renderer).unwrap();

    assert_eq!(first.frame, FrameOutcome::Uploaded);
    assert_eq!(second.frame, FrameOutcome::NotReady);
    assert_eq!(render_loop.buffer(ViewMode::Depth), &snapshot);
    assert_eq!(renderer.uploads.len(), 1);
    assert_eq!(renderer.presents, 2);
    assert_eq!(render_loop.stats().not_ready, 1);
}

#[test]
fn test_sandbox_session_with_synthetic_sensor() {
    let source: Box<dyn FrameSource> = Box::new(SyntheticSource::new(true));
    let mut sandbox = Sandbox::new(
        AppState::default(),
        source,
        Recorder::default(),
        (1920, 1080),
    )
    .unwrap();

    assert_eq!(sandbox.on_tick().unwrap(), LoopControl::Continue);
    sandbox.on_key_up(KeyInput::Space);
    assert_eq!(sandbox.on_tick().unwrap(), LoopControl::Continue);

    // Two primed textures, then one depth and one colour frame
    let modes: Vec<ViewMode> = sandbox.renderer().uploads.iter().map(|(m, _)| *m).collect();
    assert_eq!(
        modes,
        vec![ViewMode::Color, ViewMode::Depth, ViewMode::Depth, ViewMode::Color]
    );

    assert_eq!(sandbox.on_key_up(KeyInput::Escape), LoopControl::Exit);
    assert_eq!(sandbox.on_tick().unwrap(), LoopControl::Exit);
    sandbox.shutdown();
    assert_eq!(sandbox.renderer().presents, 2);
}
