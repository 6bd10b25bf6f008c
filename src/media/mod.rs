// SPDX-License-Identifier: GPL-3.0-only

//! Frame conversion and normalization

pub mod conversions;
pub mod normalizer;

pub use normalizer::{
    DepthRange, FrameBuffer, NormalizeOutcome, normalize_color, normalize_depth,
};
