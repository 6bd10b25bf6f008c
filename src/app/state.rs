// SPDX-License-Identifier: GPL-3.0-only

//! Application state mutated by the input handler and read by the render loop

use super::calibration::{Bound, CalibrationRect};
use crate::constants::calibration::{STEP_COARSE, STEP_FINE};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which sensor channel is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Color,
    #[default]
    Depth,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Color => ViewMode::Depth,
            ViewMode::Depth => ViewMode::Color,
        }
    }

    /// Integer flag handed to the shader (0 = colour, 1 = depth)
    pub fn shader_flag(self) -> u32 {
        match self {
            ViewMode::Color => 0,
            ViewMode::Depth => 1,
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewMode::Color => write!(f, "color"),
            ViewMode::Depth => write!(f, "depth"),
        }
    }
}

/// Coarse and fine calibration step sizes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepSizes {
    pub coarse: f32,
    pub fine: f32,
}

impl Default for StepSizes {
    fn default() -> Self {
        Self {
            coarse: STEP_COARSE,
            fine: STEP_FINE,
        }
    }
}

/// Active step precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepPrecision {
    #[default]
    Coarse,
    Fine,
}

impl StepPrecision {
    pub fn toggled(self) -> Self {
        match self {
            StepPrecision::Coarse => StepPrecision::Fine,
            StepPrecision::Fine => StepPrecision::Coarse,
        }
    }
}

/// Explicit application state
///
/// Replaces the free-standing globals of a callback-driven program: the
/// input handler gets `&mut AppState`, the render loop reads it once per tick.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub calibration: CalibrationRect,
    pub view_mode: ViewMode,
    pub precision: StepPrecision,
    pub steps: StepSizes,
    /// Set by Escape / Ctrl+C; the event loop exits after the current tick
    pub exit_requested: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(CalibrationRect::default(), ViewMode::default(), StepSizes::default())
    }
}

impl AppState {
    pub fn new(calibration: CalibrationRect, view_mode: ViewMode, steps: StepSizes) -> Self {
        Self {
            calibration,
            view_mode,
            precision: StepPrecision::Coarse,
            steps,
            exit_requested: false,
        }
    }

    /// Step size for the current precision
    pub fn step(&self) -> f32 {
        match self.precision {
            StepPrecision::Coarse => self.steps.coarse,
            StepPrecision::Fine => self.steps.fine,
        }
    }

    pub fn toggle_view_mode(&mut self) -> ViewMode {
        self.view_mode = self.view_mode.toggled();
        self.view_mode
    }

    pub fn toggle_precision(&mut self) -> StepPrecision {
        self.precision = self.precision.toggled();
        self.precision
    }

    /// Move one bound by one step; `increase` picks the sign
    pub fn nudge(&mut self, bound: Bound, increase: bool) -> f32 {
        let step = self.step();
        let delta = if increase { step } else { -step };
        self.calibration.adjust(bound, delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_in_depth_view_with_coarse_steps() {
        let state = AppState::default();
        assert_eq!(state.view_mode, ViewMode::Depth);
        assert_eq!(state.precision, StepPrecision::Coarse);
        assert_eq!(state.step(), 0.05);
        assert!(!state.exit_requested);
    }

    #[test]
    fn test_double_toggle_restores_view_mode() {
        let mut state = AppState::default();
        let original = state.view_mode;
        assert_eq!(state.toggle_view_mode(), ViewMode::Color);
        assert_eq!(state.toggle_view_mode(), original);
        assert_eq!(original.shader_flag(), 1);
    }

    #[test]
    fn test_precision_selects_step() {
        let mut state = AppState::default();
        state.toggle_precision();
        assert_eq!(state.step(), 0.001);

        let before = state.calibration.top;
        let after = state.nudge(Bound::Top, false);
        assert!((before - after - 0.001).abs() < 1e-6);
    }

    #[test]
    fn test_view_mode_serde_names() {
        let json = serde_json::to_string(&ViewMode::Color).unwrap();
        assert_eq!(json, "\"color\"");
        let mode: ViewMode = serde_json::from_str("\"depth\"").unwrap();
        assert_eq!(mode, ViewMode::Depth);
    }
}
