// SPDX-License-Identifier: GPL-3.0-only

//! Projector calibration sandbox
//!
//! # Architecture
//!
//! - `calibration`: calibration rectangle and its texture-space transform
//! - `state`: explicit application state (calibration, view mode, step size)
//! - `input`: key-down / key-up handling
//! - `render_loop`: per-tick acquire → normalize → upload → draw → present
//! - `window`: winit event loop driving a [`FrameDriver`]
//!
//! [`Sandbox`] ties a frame source and a renderer to the application state
//! and exposes it to the windowing layer through [`FrameDriver`]. Nothing in
//! here touches a window directly, so the whole flow runs in tests with mock
//! sources and renderers.

pub mod calibration;
pub mod input;
pub mod render_loop;
pub mod state;
pub mod window;

pub use calibration::{Bound, CalibrationRect};
pub use input::{InputEffect, KeyInput, LoopControl};
pub use render_loop::{
    DrawParams, FrameOutcome, LoopStats, RenderLoop, RenderStage, Renderer, TickReport,
};
pub use state::{AppState, StepPrecision, StepSizes, ViewMode};

use crate::backends::FrameSource;
use crate::errors::{AppResult, RenderResult};
use tracing::{debug, error, info};

/// Callbacks a windowing layer drives
pub trait FrameDriver {
    /// Render one frame
    ///
    /// `Err` is fatal: the caller stops the loop and runs [`shutdown`](Self::shutdown).
    fn on_tick(&mut self) -> AppResult<LoopControl>;

    /// The window was resized to `width` x `height`
    ///
    /// Returns the size the window must be forced back to.
    fn on_resize(&mut self, width: u32, height: u32) -> (u32, u32);

    fn on_key_down(&mut self, key: KeyInput) -> LoopControl;

    fn on_key_up(&mut self, key: KeyInput) -> LoopControl;

    /// Ask the loop to finish after the current event (Ctrl+C)
    fn request_exit(&mut self);

    /// Release sensor and GPU resources; only the first call has an effect
    fn shutdown(&mut self);
}

/// The sandbox application
pub struct Sandbox<S: FrameSource, R: Renderer> {
    state: AppState,
    source: S,
    renderer: R,
    render_loop: RenderLoop,
    window_size: (u32, u32),
    shut_down: bool,
}

impl<S: FrameSource, R: Renderer> Sandbox<S, R> {
    /// Wire up the sandbox and upload the initial (white) buffers
    pub fn new(
        state: AppState,
        source: S,
        mut renderer: R,
        window_size: (u32, u32),
    ) -> RenderResult<Self> {
        let mut render_loop = RenderLoop::default();
        render_loop.prime(&mut renderer)?;

        info!(
            source = %source.description(),
            view = %state.view_mode,
            calibration = %state.calibration,
            "Sandbox ready"
        );

        Ok(Self {
            state,
            source,
            renderer,
            render_loop,
            window_size,
            shut_down: false,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn render_loop(&self) -> &RenderLoop {
        &self.render_loop
    }

    fn control(&self) -> LoopControl {
        if self.state.exit_requested {
            LoopControl::Exit
        } else {
            LoopControl::Continue
        }
    }
}

impl<S: FrameSource, R: Renderer> FrameDriver for Sandbox<S, R> {
    fn on_tick(&mut self) -> AppResult<LoopControl> {
        if self.state.exit_requested {
            return Ok(LoopControl::Exit);
        }

        if let Err(e) =
            self.render_loop
                .tick(&self.state, &mut self.source, &mut self.renderer)
        {
            error!(stage = %self.render_loop.stage(), error = %e, "Render tick failed");
            return Err(e);
        }
        Ok(self.control())
    }

    fn on_resize(&mut self, width: u32, height: u32) -> (u32, u32) {
        if (width, height) != self.window_size {
            debug!(
                width,
                height,
                fixed_width = self.window_size.0,
                fixed_height = self.window_size.1,
                "Resize refused"
            );
        }
        if width > 0 && height > 0 {
            self.renderer.resize(width, height);
        }
        self.window_size
    }

    fn on_key_down(&mut self, key: KeyInput) -> LoopControl {
        let effect = input::handle_key_down(&mut self.state, key);
        if let Some(line) = effect.echo_line() {
            println!("{}", line);
        }
        self.control()
    }

    fn on_key_up(&mut self, key: KeyInput) -> LoopControl {
        let effect = input::handle_key_up(&mut self.state, key);
        if effect == InputEffect::ExitRequested {
            info!("Exit requested");
        }
        self.control()
    }

    fn request_exit(&mut self) {
        self.state.exit_requested = true;
    }

    fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        self.source.shutdown();
        self.renderer.release();

        let stats = self.render_loop.stats();
        info!(
            ticks = stats.ticks,
            uploads = stats.uploads,
            not_ready = stats.not_ready,
            skipped = stats.skipped,
            "Render loop finished"
        );
        let c = &self.state.calibration;
        info!(
            left = c.left,
            right = c.right,
            top = c.top,
            bottom = c.bottom,
            "Final calibration"
        );
    }
}

impl<S: FrameSource, R: Renderer> Drop for Sandbox<S, R> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
