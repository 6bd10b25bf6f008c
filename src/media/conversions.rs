// SPDX-License-Identifier: GPL-3.0-only

//! Host-side pixel conversions for sensor backends
//!
//! The normalizer expects colour frames in BGRA and depth frames as 16-bit
//! samples. Backends whose driver hands out something else convert here
//! before the frame crosses the `FrameSource` boundary.

/// Convert UYVY (YUV 4:2:2) to BGRA
///
/// UYVY format: U0 Y0 V0 Y1 - each 4-byte group encodes 2 pixels.
/// Uses BT.601 coefficients.
pub fn uyvy_to_bgra(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let pixel_count = (width * height) as usize;
    let mut bgra = Vec::with_capacity(pixel_count * 4);

    'outer: for chunk in data.chunks_exact(4) {
        let u = chunk[0] as f32 - 128.0;
        let v = chunk[2] as f32 - 128.0;

        for y in [chunk[1] as f32, chunk[3] as f32] {
            if bgra.len() >= pixel_count * 4 {
                break 'outer;
            }
            let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
            let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
            let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
            bgra.extend_from_slice(&[b, g, r, 255]);
        }
    }

    bgra
}

/// Convert Bayer GRBG to BGRA using nearest-neighbour demosaic
///
/// ```text
/// G R
/// B G
/// ```
/// Each 2x2 block produces 4 pixels with the same colour.
pub fn grbg_to_bgra(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let mut bgra = vec![0u8; w * h * 4];
    if data.len() < w * h {
        return bgra;
    }

    for y in (0..h.saturating_sub(1)).step_by(2) {
        for x in (0..w.saturating_sub(1)).step_by(2) {
            let g0 = data[y * w + x] as u16;
            let r = data[y * w + x + 1];
            let b = data[(y + 1) * w + x];
            let g1 = data[(y + 1) * w + x + 1] as u16;
            let g = ((g0 + g1) / 2) as u8;

            for dy in 0..2 {
                for dx in 0..2 {
                    let idx = ((y + dy) * w + (x + dx)) * 4;
                    bgra[idx..idx + 4].copy_from_slice(&[b, g, r, 255]);
                }
            }
        }
    }

    bgra
}

/// Convert packed RGB24 to BGRA
pub fn rgb_to_bgra(rgb: &[u8]) -> Vec<u8> {
    let mut bgra = Vec::with_capacity(rgb.len() / 3 * 4);
    for px in rgb.chunks_exact(3) {
        bgra.extend_from_slice(&[px[2], px[1], px[0], 255]);
    }
    bgra
}

/// Decode little-endian 16-bit samples (V4L2 `Y16 `)
pub fn y16_to_samples(data: &[u8]) -> Vec<u16> {
    data.chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect()
}
