//! Shared building blocks for fullscreen-triangle passes.

use std::collections::HashMap;
use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};

use crate::compile::wgsl::{FRAGMENT_ENTRY, FRAME_UNIFORM_SIZE, VERTEX_ENTRY};
use crate::error::{RenderError, RenderResult};
use crate::texture::TextureFormat;

// ── frame uniform ─────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(super) struct FrameUniform {
    pub resolution: [f32; 2],
    pub _pad: [f32; 2], // 16-byte alignment
}

impl FrameUniform {
    pub(super) fn new(width: u32, height: u32) -> Self {
        Self { resolution: [width.max(1) as f32, height.max(1) as f32], _pad: [0.0; 2] }
    }
}

pub(super) fn frame_ubo(device: &wgpu::Device, label: &str) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: FRAME_UNIFORM_SIZE,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

// ── layouts ───────────────────────────────────────────────────────────────

/// Binding 0 is the frame uniform, bindings `1..=inputs` are input textures.
pub(super) fn bind_group_layout(
    device: &wgpu::Device,
    inputs: usize,
    label: &str,
) -> wgpu::BindGroupLayout {
    let mut entries = vec![wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(FRAME_UNIFORM_SIZE),
        },
        count: None,
    }];
    entries.extend((0..inputs).map(|i| wgpu::BindGroupLayoutEntry {
        binding: i as u32 + 1,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }));

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &entries,
    })
}

pub(super) fn bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    ubo: &wgpu::Buffer,
    inputs: &[&wgpu::TextureView],
    label: &str,
) -> wgpu::BindGroup {
    let mut entries = vec![wgpu::BindGroupEntry { binding: 0, resource: ubo.as_entire_binding() }];
    entries.extend(inputs.iter().enumerate().map(|(i, view)| wgpu::BindGroupEntry {
        binding: i as u32 + 1,
        resource: wgpu::BindingResource::TextureView(view),
    }));

    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &entries,
    })
}

pub(super) fn fullscreen_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some(VERTEX_ENTRY),
            compilation_options: Default::default(),
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some(FRAGMENT_ENTRY),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

/// Fails with [`RenderError::Compile`] if the shader module reported errors.
pub(super) fn check_compilation(module: &wgpu::ShaderModule, pass: &str) -> RenderResult<()> {
    let info = pollster::block_on(module.get_compilation_info());
    let errors: Vec<String> = info
        .messages
        .iter()
        .filter(|m| m.message_type == wgpu::CompilationMessageType::Error)
        .map(|m| m.message.clone())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(RenderError::Compile { pass: pass.to_string(), reason: errors.join("; ") })
    }
}

/// Runs `f` inside out-of-memory and validation error scopes and returns the
/// first error the device reported for it.
pub(super) fn capture_device_error<R>(
    device: &wgpu::Device,
    f: impl FnOnce() -> R,
) -> Result<R, wgpu::Error> {
    let oom_scope = device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    let validation_scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = f();
    let validation = pollster::block_on(validation_scope.pop());
    let oom = pollster::block_on(oom_scope.pop());

    match oom.or(validation) {
        Some(err) => Err(err),
        None => Ok(value),
    }
}

// ── compiled pass ─────────────────────────────────────────────────────────

/// A pass program compiled for the [`WgpuBackend`](super::WgpuBackend).
///
/// Holds one pipeline per [`TextureFormat`] so any cache entry can be a target.
#[derive(Debug)]
pub struct WgpuInstance {
    pub(super) label: &'static str,
    pub(super) input_count: usize,
    pub(super) bind_group_layout: wgpu::BindGroupLayout,
    pub(super) pipelines: HashMap<TextureFormat, wgpu::RenderPipeline>,
}

impl WgpuInstance {
    #[inline]
    pub fn label(&self) -> &'static str {
        self.label
    }

    #[inline]
    pub fn input_count(&self) -> usize {
        self.input_count
    }
}
