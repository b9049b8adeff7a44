use crate::compile::wgsl::PRESENT_SHADER;

use super::pass::{self, FrameUniform};
use super::WgpuTexture;

/// Draws a texture over a whole surface view, scaled to fit.
pub struct PresentPass {
    format: wgpu::TextureFormat,
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
    ubo: wgpu::Buffer,
}

impl PresentPass {
    pub fn new(device: &wgpu::Device, target_format: wgpu::TextureFormat) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("renderz present shader"),
            source: wgpu::ShaderSource::Wgsl(PRESENT_SHADER.into()),
        });
        let layout = pass::bind_group_layout(device, 1, "renderz present bgl");
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("renderz present pipeline layout"),
            bind_group_layouts: &[&layout],
            immediate_size: 0,
        });
        let pipeline = pass::fullscreen_pipeline(
            device,
            &pipeline_layout,
            &module,
            target_format,
            "renderz present pipeline",
        );
        let ubo = pass::frame_ubo(device, "renderz present ubo");

        Self { format: target_format, layout, pipeline, ubo }
    }

    #[inline]
    pub fn target_format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Records the blit of `source` into `target_view` (`target_size` in physical pixels).
    pub fn draw(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target_view: &wgpu::TextureView,
        target_size: (u32, u32),
        source: &WgpuTexture,
    ) {
        queue.write_buffer(
            &self.ubo,
            0,
            bytemuck::bytes_of(&FrameUniform::new(target_size.0, target_size.1)),
        );
        let bind_group =
            pass::bind_group(device, &self.layout, &self.ubo, &[source.view()], "renderz present bind group");

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("renderz present pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &bind_group, &[]);
        rpass.draw(0..3, 0..1);
    }
}
