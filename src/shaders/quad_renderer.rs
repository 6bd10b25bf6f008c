// SPDX-License-Identifier: GPL-3.0-only

//! wgpu renderer for the calibrated quad
//!
//! Owns the window surface, one texture per view mode and the quad pipeline.
//! A draw acquires the surface texture and records the pass; `present` hands
//! it to the compositor. A lost or outdated surface is reconfigured and the
//! frame is dropped; every other surface error is fatal.

use std::sync::Arc;

use tracing::{debug, info, warn};
use wgpu::util::DeviceExt;
use winit::window::Window;

use super::{CalibrationUniform, QUAD_SHADER, QUAD_VERTICES, QuadVertex};
use crate::app::{DrawParams, Renderer, ViewMode};
use crate::constants::sensor;
use crate::errors::{RenderError, RenderResult};
use crate::gpu::{self, GpuDeviceInfo};
use crate::media::FrameBuffer;

/// Sensor-sized texture and the bind group sampling it
struct FrameTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
    bytes_per_pixel: u32,
}

impl FrameTexture {
    fn new(
        device: &wgpu::Device,
        label: &str,
        format: wgpu::TextureFormat,
        bytes_per_pixel: u32,
        layout: &wgpu::BindGroupLayout,
        uniform_buffer: &wgpu::Buffer,
        sampler: &wgpu::Sampler,
    ) -> Self {
        let width = sensor::FRAME_WIDTH;
        let height = sensor::FRAME_HEIGHT;

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        Self {
            texture,
            bind_group,
            width,
            height,
            bytes_per_pixel,
        }
    }

    fn write(&self, queue: &wgpu::Queue, buffer: &FrameBuffer) -> RenderResult<()> {
        if buffer.width() != self.width
            || buffer.height() != self.height
            || buffer.channels() != self.bytes_per_pixel
        {
            return Err(RenderError::Upload(format!(
                "{}x{}x{} buffer for {}x{}x{} texture",
                buffer.width(),
                buffer.height(),
                buffer.channels(),
                self.width,
                self.height,
                self.bytes_per_pixel
            )));
        }

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            buffer.as_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(buffer.row_bytes()),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }
}

/// Renderer drawing into the projector window
pub struct QuadRenderer {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    color: FrameTexture,
    depth: FrameTexture,
    /// Drawn but not yet presented
    pending: Option<wgpu::SurfaceTexture>,
    window: Arc<Window>,
    info: GpuDeviceInfo,
}

/// Prefer a non-sRGB format so sensor bytes reach the projector unchanged
fn pick_surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|f| !f.is_srgb())
        .or_else(|| formats.first().copied())
}

impl QuadRenderer {
    /// Create the surface, device and pipeline for `window`
    pub async fn new(window: Arc<Window>) -> RenderResult<Self> {
        let instance = gpu::create_instance();
        let surface = instance
            .create_surface(Arc::clone(&window))
            .map_err(|e| RenderError::SurfaceCreation(e.to_string()))?;

        let gpu::GpuContext {
            adapter,
            device,
            queue,
            info,
        } = gpu::create_device(&instance, Some(&surface), "kinect_sandbox_device")
            .await
            .map_err(RenderError::AdapterNotFound)?;

        let caps = surface.get_capabilities(&adapter);
        let format = pick_surface_format(&caps.formats).ok_or_else(|| {
            RenderError::SurfaceCreation("surface not supported by adapter".to_string())
        })?;
        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: 2,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        info!(
            adapter = %info.adapter_name,
            backend = ?info.backend,
            format = ?format,
            width = config.width,
            height = config.height,
            "Surface configured"
        );

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("quad_shader"),
            source: wgpu::ShaderSource::Wgsl(QUAD_SHADER.into()),
        });

        // Bindings: calibration uniform, frame texture, sampler
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("quad_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("quad_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("quad_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[QuadVertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad_vertices"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("calibration_uniform"),
            size: std::mem::size_of::<CalibrationUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Nearest filtering, wrap outside [0,1]
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("frame_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let color = FrameTexture::new(
            &device,
            "color_texture",
            wgpu::TextureFormat::Bgra8Unorm,
            sensor::COLOR_CHANNELS,
            &bind_group_layout,
            &uniform_buffer,
            &sampler,
        );
        let depth = FrameTexture::new(
            &device,
            "depth_texture",
            wgpu::TextureFormat::R8Unorm,
            sensor::DEPTH_CHANNELS,
            &bind_group_layout,
            &uniform_buffer,
            &sampler,
        );

        Ok(Self {
            surface,
            config,
            device,
            queue,
            pipeline,
            vertex_buffer,
            uniform_buffer,
            color,
            depth,
            pending: None,
            window,
            info,
        })
    }

    pub fn info(&self) -> &GpuDeviceInfo {
        &self.info
    }

    fn texture(&self, mode: ViewMode) -> &FrameTexture {
        match mode {
            ViewMode::Color => &self.color,
            ViewMode::Depth => &self.depth,
        }
    }

    /// Acquire the next surface texture, `None` when this frame must be dropped
    fn acquire(&mut self) -> RenderResult<Option<wgpu::SurfaceTexture>> {
        match self.surface.get_current_texture() {
            Ok(frame) => Ok(Some(frame)),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                Ok(None)
            }
            Err(wgpu::SurfaceError::Timeout) => {
                debug!("Surface acquire timed out, dropping frame");
                Ok(None)
            }
            Err(e) => Err(RenderError::Surface(e.to_string())),
        }
    }
}

impl Renderer for QuadRenderer {
    fn upload(&mut self, mode: ViewMode, buffer: &FrameBuffer) -> RenderResult<()> {
        self.texture(mode).write(&self.queue, buffer)
    }

    fn draw(&mut self, params: &DrawParams) -> RenderResult<()> {
        let uniform = CalibrationUniform::from_params(params);
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));

        let Some(frame) = self.acquire()? else {
            return Ok(());
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("quad_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("quad_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.texture(params.view_mode).bind_group, &[]);
            pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            pass.draw(0..params.vertex_count, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        self.pending = Some(frame);
        Ok(())
    }

    fn present(&mut self) -> RenderResult<()> {
        if let Some(frame) = self.pending.take() {
            self.window.pre_present_notify();
            frame.present();
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        debug!(width, height, "Surface resized");
    }

    fn release(&mut self) {
        self.pending = None;
        debug!(adapter = %self.info.adapter_name, "GPU resources released");
    }
}
