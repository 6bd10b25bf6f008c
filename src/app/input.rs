// SPDX-License-Identifier: GPL-3.0-only

//! Keyboard handling
//!
//! | key     | event    | effect                                 |
//! |---------|----------|----------------------------------------|
//! | `q` `Q` | down     | toggle coarse / fine step              |
//! | `a` `A` | down     | left bound + / -                       |
//! | `d` `D` | down     | right bound + / -                      |
//! | `w` `W` | down     | top bound + / -                        |
//! | `s` `S` | down     | bottom bound + / -                     |
//! | Space   | up       | toggle colour / depth view             |
//! | Escape  | up       | leave the render loop                  |
//!
//! Lowercase increases, uppercase decreases. Every event is applied as it
//! arrives, key repeats included.

use super::calibration::Bound;
use super::state::{AppState, StepPrecision, ViewMode};
use tracing::debug;

/// Windowing-library-neutral key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// Printable character, case preserved
    Char(char),
    Space,
    Escape,
    /// Anything the sandbox does not react to
    Other,
}

/// Whether the event loop keeps running after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Exit,
}

/// State change caused by one key event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEffect {
    None,
    PrecisionToggled(StepPrecision),
    Adjusted { bound: Bound, value: f32 },
    ViewToggled(ViewMode),
    ExitRequested,
}

impl InputEffect {
    /// Console line echoed for the operator, if any
    pub fn echo_line(&self) -> Option<String> {
        match self {
            InputEffect::Adjusted { bound, value } => Some(format!("{}: {}", bound, value)),
            _ => None,
        }
    }

    pub fn loop_control(&self) -> LoopControl {
        match self {
            InputEffect::ExitRequested => LoopControl::Exit,
            _ => LoopControl::Continue,
        }
    }
}

/// Bound and direction bound to a character key
pub fn adjustment_for(c: char) -> Option<(Bound, bool)> {
    let bound = match c.to_ascii_lowercase() {
        'a' => Bound::Left,
        'd' => Bound::Right,
        'w' => Bound::Top,
        's' => Bound::Bottom,
        _ => return None,
    };
    Some((bound, c.is_ascii_lowercase()))
}

/// Apply a key-down event
pub fn handle_key_down(state: &mut AppState, key: KeyInput) -> InputEffect {
    let KeyInput::Char(c) = key else {
        return InputEffect::None;
    };

    if c.eq_ignore_ascii_case(&'q') {
        let precision = state.toggle_precision();
        debug!(?precision, step = state.step(), "Step precision toggled");
        return InputEffect::PrecisionToggled(precision);
    }

    match adjustment_for(c) {
        Some((bound, increase)) => {
            let value = state.nudge(bound, increase);
            InputEffect::Adjusted { bound, value }
        }
        None => InputEffect::None,
    }
}

/// Apply a key-up event
pub fn handle_key_up(state: &mut AppState, key: KeyInput) -> InputEffect {
    match key {
        KeyInput::Space => {
            let mode = state.toggle_view_mode();
            debug!(%mode, "View mode toggled");
            InputEffect::ViewToggled(mode)
        }
        KeyInput::Escape => {
            state.exit_requested = true;
            InputEffect::ExitRequested
        }
        KeyInput::Char(_) | KeyInput::Other => InputEffect::None,
    }
}
