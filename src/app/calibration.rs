// SPDX-License-Identifier: GPL-3.0-only

//! Projector calibration
//!
//! The calibration rectangle holds the texture coordinates at which the
//! projected image boundaries land. Every frame it is turned into an affine
//! texture-space transform: (0, 0) maps to (left, bottom) and (1, 1) maps to
//! (right, top). Bounds are never clamped or reordered; a rectangle with
//! left > right simply mirrors the image.

use crate::constants::calibration as defaults;
use nalgebra::{Matrix4, Vector4};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four calibration bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bound {
    Left,
    Right,
    Top,
    Bottom,
}

impl Bound {
    pub const ALL: [Bound; 4] = [Bound::Left, Bound::Right, Bound::Top, Bound::Bottom];

    /// Name used in the console echo
    pub fn label(&self) -> &'static str {
        match self {
            Bound::Left => "left",
            Bound::Right => "right",
            Bound::Top => "top",
            Bound::Bottom => "bottom",
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Calibration bounds in normalized texture space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationRect {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Default for CalibrationRect {
    fn default() -> Self {
        Self {
            left: defaults::LEFT,
            right: defaults::RIGHT,
            top: defaults::TOP,
            bottom: defaults::BOTTOM,
        }
    }
}

impl CalibrationRect {
    pub fn new(left: f32, right: f32, top: f32, bottom: f32) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    /// Rectangle mapping the unit square onto itself
    pub fn identity() -> Self {
        Self::new(0.0, 1.0, 1.0, 0.0)
    }

    pub fn get(&self, bound: Bound) -> f32 {
        match bound {
            Bound::Left => self.left,
            Bound::Right => self.right,
            Bound::Top => self.top,
            Bound::Bottom => self.bottom,
        }
    }

    fn get_mut(&mut self, bound: Bound) -> &mut f32 {
        match bound {
            Bound::Left => &mut self.left,
            Bound::Right => &mut self.right,
            Bound::Top => &mut self.top,
            Bound::Bottom => &mut self.bottom,
        }
    }

    /// Add `delta` to one bound and return the new value
    pub fn adjust(&mut self, bound: Bound, delta: f32) -> f32 {
        let value = self.get_mut(bound);
        *value += delta;
        *value
    }

    /// Build the texture-space transform
    ///
    /// Only the 2x2 scale block and the translation column are populated;
    /// everything else is identity. Column-major like the shader's `mat4x4`.
    pub fn transform(&self) -> Matrix4<f32> {
        let mut xform = Matrix4::identity();
        xform[(0, 0)] = self.right - self.left;
        xform[(0, 3)] = self.left;
        xform[(1, 1)] = self.top - self.bottom;
        xform[(1, 3)] = self.bottom;
        xform
    }

    /// Map a texture coordinate through the transform
    pub fn apply(&self, u: f32, v: f32) -> [f32; 2] {
        let mapped = self.transform() * Vector4::new(u, v, 0.0, 1.0);
        [mapped.x, mapped.y]
    }

    /// Column-major array layout for uniform upload
    pub fn transform_columns(&self) -> [[f32; 4]; 4] {
        self.transform().into()
    }
}

impl fmt::Display for CalibrationRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "left={} right={} top={} bottom={}",
            self.left, self.right, self.top, self.bottom
        )
    }
}
