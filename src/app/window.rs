// SPDX-License-Identifier: GPL-3.0-only

//! winit shell around a [`FrameDriver`]
//!
//! Creates the projector window once the event loop resumes, renders on
//! every pass through the loop (`ControlFlow::Poll` plus a redraw request in
//! `about_to_wait`) and translates winit input into [`KeyInput`]. A fatal
//! error stops the loop; cleanup runs once after the loop has returned.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

use super::{AppState, FrameDriver, KeyInput, LoopControl, Sandbox};
use crate::backends::FrameSource;
use crate::config::WindowSettings;
use crate::errors::{AppError, AppResult, RenderError};
use crate::shaders::QuadRenderer;

/// Map a winit logical key onto the sandbox's key set
pub fn translate_key(key: &Key) -> KeyInput {
    match key {
        Key::Named(NamedKey::Space) => KeyInput::Space,
        Key::Named(NamedKey::Escape) => KeyInput::Escape,
        Key::Character(text) => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(' '), None) => KeyInput::Space,
                (Some(c), None) => KeyInput::Char(c),
                _ => KeyInput::Other,
            }
        }
        _ => KeyInput::Other,
    }
}

/// Window attributes for the projector output
pub fn window_attributes(settings: &WindowSettings) -> winit::window::WindowAttributes {
    Window::default_attributes()
        .with_title(settings.title.clone())
        .with_inner_size(PhysicalSize::new(settings.width, settings.height))
        .with_position(PhysicalPosition::new(settings.x, settings.y))
        .with_decorations(!settings.borderless)
        .with_resizable(false)
}

struct SandboxWindow<S: FrameSource> {
    settings: WindowSettings,
    /// State and source waiting for the window to exist
    pending: Option<(AppState, S)>,
    sandbox: Option<Sandbox<S, QuadRenderer>>,
    window: Option<Arc<Window>>,
    interrupt: Arc<AtomicBool>,
    failure: Option<AppError>,
}

impl<S: FrameSource> SandboxWindow<S> {
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: AppError) {
        error!(error = %err, "Fatal error, leaving event loop");
        if self.failure.is_none() {
            self.failure = Some(err);
        }
        event_loop.exit();
    }

    fn apply(&self, event_loop: &ActiveEventLoop, control: LoopControl) {
        if control == LoopControl::Exit {
            event_loop.exit();
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> AppResult<()> {
        let window = event_loop
            .create_window(window_attributes(&self.settings))
            .map_err(|e| RenderError::WindowCreation(e.to_string()))?;
        let window = Arc::new(window);

        let renderer = pollster::block_on(QuadRenderer::new(Arc::clone(&window)))?;

        let (state, source) = self
            .pending
            .take()
            .ok_or_else(|| AppError::Other("sandbox already started".to_string()))?;
        let sandbox = Sandbox::new(state, source, renderer, self.settings.size())?;

        info!(
            width = self.settings.width,
            height = self.settings.height,
            x = self.settings.x,
            y = self.settings.y,
            "Projector window open"
        );
        window.request_redraw();
        self.window = Some(window);
        self.sandbox = Some(sandbox);
        Ok(())
    }

    /// Release everything, whether or not the window ever opened
    fn finish(mut self) -> AppResult<()> {
        if let Some(mut sandbox) = self.sandbox.take() {
            sandbox.shutdown();
        }
        if let Some((_, mut source)) = self.pending.take() {
            source.shutdown();
        }
        self.window = None;
        match self.failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<S: FrameSource> ApplicationHandler for SandboxWindow<S> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.sandbox.is_some() {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(sandbox) = self.sandbox.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                info!("Window close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                let (width, height) = sandbox.on_resize(size.width, size.height);
                if (size.width, size.height) != (width, height) {
                    if let Some(window) = &self.window {
                        let _ = window.request_inner_size(PhysicalSize::new(width, height));
                    }
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key, state, ..
                    },
                ..
            } => {
                let key = translate_key(&logical_key);
                let control = match state {
                    ElementState::Pressed => sandbox.on_key_down(key),
                    ElementState::Released => sandbox.on_key_up(key),
                };
                self.apply(event_loop, control);
            }
            WindowEvent::RedrawRequested => {
                if self.interrupt.load(Ordering::SeqCst) {
                    sandbox.request_exit();
                }
                match sandbox.on_tick() {
                    Ok(control) => self.apply(event_loop, control),
                    Err(e) => self.fail(event_loop, e),
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.interrupt.load(Ordering::SeqCst) {
            info!("Interrupted");
            event_loop.exit();
            return;
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Open the projector window and run until Escape, close, Ctrl+C or a
/// fatal error
///
/// The sensor is shut down exactly once on every path.
pub fn run<S: FrameSource>(
    settings: WindowSettings,
    state: AppState,
    mut source: S,
    interrupt: Arc<AtomicBool>,
) -> AppResult<()> {
    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            source.shutdown();
            return Err(RenderError::WindowCreation(e.to_string()).into());
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = SandboxWindow {
        settings,
        pending: Some((state, source)),
        sandbox: None,
        window: None,
        interrupt,
        failure: None,
    };

    if let Err(e) = event_loop.run_app(&mut app) {
        app.failure
            .get_or_insert(RenderError::WindowCreation(e.to_string()).into());
    }
    app.finish()
}
