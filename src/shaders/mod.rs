// SPDX-License-Identifier: GPL-3.0-only

//! Shader and GPU data layout for the calibrated quad
//!
//! The same shader serves both view modes; a flag in the uniform selects
//! whether the bound texture is shown as colour or as a grey depth image.

mod quad_renderer;

pub use quad_renderer::QuadRenderer;

use crate::app::DrawParams;

/// WGSL source of the quad shader
pub const QUAD_SHADER: &str = include_str!("quad.wgsl");

/// Calibration uniform (must match `Calibration` in `quad.wgsl`)
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CalibrationUniform {
    /// Column-major texture-space transform
    pub xform: [[f32; 4]; 4],
    pub view_mode: u32,
    pub _padding: [u32; 3],
}

impl CalibrationUniform {
    pub fn from_params(params: &DrawParams) -> Self {
        Self {
            xform: params.transform,
            view_mode: params.view_mode.shader_flag(),
            _padding: [0; 3],
        }
    }
}

/// Quad vertex: clip-space position and texture coordinate
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

/// Two triangles covering clip space
pub const QUAD_VERTICES: [QuadVertex; 6] = [
    QuadVertex { position: [-1.0, -1.0], uv: [0.0, 0.0] },
    QuadVertex { position: [1.0, -1.0], uv: [1.0, 0.0] },
    QuadVertex { position: [1.0, 1.0], uv: [1.0, 1.0] },
    QuadVertex { position: [1.0, 1.0], uv: [1.0, 1.0] },
    QuadVertex { position: [-1.0, 1.0], uv: [0.0, 1.0] },
    QuadVertex { position: [-1.0, -1.0], uv: [0.0, 0.0] },
];

impl QuadVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}
