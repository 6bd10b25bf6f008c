// SPDX-License-Identifier: MPL-2.0

//! Integration tests for frame normalization

use kinect_sandbox::backends::types::{ColorFrame, DepthFrame};
use kinect_sandbox::media::{DepthRange, FrameBuffer, NormalizeOutcome, normalize_color, normalize_depth};

#[test]
fn test_depth_quantization_standard_range() {
    let mut buffer = FrameBuffer::new(5, 1, 1, 255);
    let frame = DepthFrame::packed(5, 1, false, vec![500, 800, 1000, 4000, 4001]);

    assert_eq!(normalize_depth(&frame, &mut buffer), NormalizeOutcome::Updated);
    assert_eq!(buffer.as_bytes(), &[0, 0, 200, 128, 0]);
}

#[test]
fn test_depth_quantization_near_range() {
    let mut buffer = FrameBuffer::new(4, 1, 1, 255);
    let frame = DepthFrame::packed(4, 1, true, vec![399, 400, 3000, 3001]);

    assert_eq!(normalize_depth(&frame, &mut buffer), NormalizeOutcome::Updated);
    assert_eq!(buffer.as_bytes(), &[0, 112, 152, 0]);
}

#[test]
fn test_every_in_range_sample_is_offset_mod_256() {
    let range = DepthRange::for_mode(false);
    for sample in (range.min..=range.max).step_by(37) {
        assert_eq!(range.band(sample) as u16, (sample - 32) % 256, "sample {}", sample);
    }
}

#[test]
fn test_zero_pitch_leaves_buffers_untouched() {
    let mut color = FrameBuffer::new(2, 2, 4, 7);
    let mut depth = FrameBuffer::new(2, 2, 1, 9);
    let before_color = color.clone();
    let before_depth = depth.clone();

    let empty_color = ColorFrame::packed(2, 2, Vec::new());
    let empty_depth = DepthFrame::packed(2, 2, false, Vec::new());
    assert_eq!(empty_color.pitch, 0);
    assert_eq!(empty_depth.pitch, 0);

    assert_eq!(normalize_color(&empty_color, &mut color), NormalizeOutcome::Skipped);
    assert_eq!(normalize_depth(&empty_depth, &mut depth), NormalizeOutcome::Skipped);
    assert_eq!(color, before_color);
    assert_eq!(depth, before_depth);
}

#[test]
fn test_color_copy_is_byte_exact() {
    let mut buffer = FrameBuffer::new(2, 1, 4, 255);
    let data = vec![1, 2, 3, 4, 5, 6, 7, 8];
    let frame = ColorFrame::packed(2, 1, data.clone());

    assert_eq!(normalize_color(&frame, &mut buffer), NormalizeOutcome::Updated);
    assert_eq!(buffer.as_bytes(), data.as_slice());
}
