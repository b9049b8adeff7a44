//! GPU backend on wgpu.
//!
//! Every pass is a fullscreen triangle whose fragment shader is generated by
//! `compile::wgsl`. Passes are submitted immediately, one command buffer each,
//! so a failed frame never leaves half-recorded work behind.

mod pass;
mod present;
mod texture;

use std::collections::HashMap;

use crate::compile::{wgsl, PassProgram};
use crate::error::{RenderError, RenderResult};
use crate::texture::{GpuTexture, TextureAllocator, TextureDesc, TextureFormat};

use super::Backend;

use pass::FrameUniform;

pub use pass::WgpuInstance;
pub use present::PresentPass;
pub use texture::WgpuTexture;

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    frame_ubo: wgpu::Buffer,
    next_id: u64,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let frame_ubo = pass::frame_ubo(&device, "renderz pass ubo");
        Self { device, queue, frame_ubo, next_id: 0 }
    }

    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    fn submit_pass(
        &self,
        label: &str,
        target: &WgpuTexture,
        load: wgpu::LoadOp<wgpu::Color>,
        draw: Option<(&wgpu::RenderPipeline, &wgpu::BindGroup)>,
    ) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.view(),
                    resolve_target: None,
                    ops: wgpu::Operations { load, store: wgpu::StoreOp::Store },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            if let Some((pipeline, bind_group)) = draw {
                rpass.set_pipeline(pipeline);
                rpass.set_bind_group(0, bind_group, &[]);
                rpass.draw(0..3, 0..1);
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

impl std::fmt::Debug for WgpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuBackend").field("next_id", &self.next_id).finish_non_exhaustive()
    }
}

impl TextureAllocator for WgpuBackend {
    type Texture = WgpuTexture;

    fn allocate_texture(&mut self, desc: TextureDesc) -> RenderResult<WgpuTexture> {
        let max = self.device.limits().max_texture_dimension_2d;
        if desc.width == 0 || desc.height == 0 {
            return Err(RenderError::AllocationFailed { desc, reason: "zero-sized texture".to_string() });
        }
        if desc.width > max || desc.height > max {
            return Err(RenderError::AllocationFailed {
                desc,
                reason: format!("exceeds device limit {max}"),
            });
        }

        let id = self.next_id;
        self.next_id += 1;
        log::debug!("wgpu: allocating texture #{id} {}x{} {:?}", desc.width, desc.height, desc.format);

        // Device errors raised here would otherwise reach the uncaptured handler.
        pass::capture_device_error(&self.device, || WgpuTexture::new(&self.device, id, desc)).map_err(|err| {
            log::warn!("wgpu: texture #{id} allocation failed: {err}");
            RenderError::AllocationFailed { desc, reason: err.to_string() }
        })
    }

    fn release_texture(&mut self, texture: WgpuTexture) {
        // Dropping the handle is enough; wgpu frees the memory once in-flight
        // work and other clones are gone.
        log::trace!("wgpu: released texture #{}", texture.id());
    }
}

impl Backend for WgpuBackend {
    type Instance = WgpuInstance;

    fn build(&mut self, program: &PassProgram) -> RenderResult<WgpuInstance> {
        program.validate()?;
        let label = program.label();
        let source = wgsl::generate(program);

        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("renderz {label} shader")),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        pass::check_compilation(&module, label)?;

        let input_count = program.input_count();
        let bind_group_layout =
            pass::bind_group_layout(&self.device, input_count, &format!("renderz {label} bgl"));
        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("renderz {label} pipeline layout")),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipelines: HashMap<_, _> = TextureFormat::ALL
            .into_iter()
            .map(|format| {
                let pipeline = pass::fullscreen_pipeline(
                    &self.device,
                    &pipeline_layout,
                    &module,
                    format.to_wgpu(),
                    &format!("renderz {label} pipeline ({format:?})"),
                );
                (format, pipeline)
            })
            .collect();

        log::debug!("wgpu: built `{label}` pass ({input_count} inputs)");
        Ok(WgpuInstance { label, input_count, bind_group_layout, pipelines })
    }

    fn render(
        &mut self,
        instance: &WgpuInstance,
        target: &WgpuTexture,
        inputs: &[&WgpuTexture],
    ) -> RenderResult<()> {
        let invalid = |reason: String| RenderError::InvalidPass {
            pass: instance.label.to_string(),
            reason,
        };
        if inputs.len() != instance.input_count {
            return Err(invalid(format!(
                "expected {} inputs, got {}",
                instance.input_count,
                inputs.len()
            )));
        }
        if inputs.iter().any(|t| t.same_texture(target)) {
            return Err(invalid("render target is also an input".to_string()));
        }
        let pipeline = instance
            .pipelines
            .get(&target.format())
            .ok_or_else(|| invalid(format!("no pipeline for {:?}", target.format())))?;

        self.queue.write_buffer(
            &self.frame_ubo,
            0,
            bytemuck::bytes_of(&FrameUniform::new(target.width(), target.height())),
        );
        let views: Vec<&wgpu::TextureView> = inputs.iter().map(|t| t.view()).collect();
        let bind_group = pass::bind_group(
            &self.device,
            &instance.bind_group_layout,
            &self.frame_ubo,
            &views,
            "renderz pass bind group",
        );

        self.submit_pass(
            instance.label,
            target,
            wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
            Some((pipeline, &bind_group)),
        );
        Ok(())
    }

    fn render_clear(&mut self, target: &WgpuTexture, value: [f32; 4]) -> RenderResult<()> {
        let color = wgpu::Color {
            r: value[0] as f64,
            g: value[1] as f64,
            b: value[2] as f64,
            a: value[3] as f64,
        };
        self.submit_pass("renderz clear", target, wgpu::LoadOp::Clear(color), None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Vec2;
    use crate::device::{HeadlessGpu, HeadlessInit};
    use crate::paint::Color;
    use crate::pipeline::{OutputType, Pipeline, Pipeline2D, RenderSettings};
    use crate::scene::{
        Border, Camera2D, CodeComponent, Composite, Material, Pattern, Scene, Shape2D, StageItem,
        StageKind,
    };

    /// `None` when the machine has no usable adapter; GPU tests then pass vacuously.
    fn backend() -> Option<WgpuBackend> {
        match pollster::block_on(HeadlessGpu::new(HeadlessInit::default())) {
            Ok(gpu) => {
                eprintln!("wgpu tests on {}", gpu.adapter_info().name);
                Some(WgpuBackend::new(gpu.device().clone(), gpu.queue().clone()))
            }
            Err(err) => {
                eprintln!("skipping wgpu test: {err:#}");
                None
            }
        }
    }

    fn scene() -> Scene {
        let shapes = StageItem::new("box")
            .with_material(Material::new(Color::rgb(0.2, 0.6, 1.0)))
            .with_shapes(vec![CodeComponent::shape(
                "Box",
                Shape2D::Box { half_size: Vec2::new(8.0, 4.0), rounding: 1.0 },
            )]);
        Scene::new()
            .with_item(
                StageKind::Pre,
                StageItem::new("camera").with_default_component(CodeComponent::camera("Camera", Camera2D::default())),
            )
            .with_item(
                StageKind::Pre,
                StageItem::new("bg").with_default_component(CodeComponent::pattern(
                    "Checker",
                    Pattern::Checker { a: Color::white(), b: Color::black(), cell: 4.0 },
                )),
            )
            .with_item(StageKind::Shape, shapes)
            .with_item(
                StageKind::Render,
                StageItem::new("render").with_default_component(CodeComponent::render(
                    "Composite",
                    Composite { antialias: 1.0, border: Some(Border { width: 1.0, color: Color::black() }) },
                )),
            )
    }

    #[test]
    fn rejects_invalid_sizes() {
        let Some(mut backend) = backend() else { return };
        let zero = backend.allocate_texture(TextureDesc::new(0, 4, TextureFormat::Bgra8Unorm));
        assert!(matches!(zero, Err(RenderError::AllocationFailed { .. })));

        let max = backend.device().limits().max_texture_dimension_2d;
        let huge = backend.allocate_texture(TextureDesc::new(max + 1, 4, TextureFormat::Bgra8Unorm));
        assert!(matches!(huge, Err(RenderError::AllocationFailed { .. })));
    }

    #[test]
    fn device_errors_are_captured() {
        let Some(backend) = backend() else { return };
        let device = backend.device();

        let ok = pass::capture_device_error(device, || 7);
        assert_eq!(ok.ok(), Some(7));

        let invalid = pass::capture_device_error(device, || {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some("renderz invalid texture"),
                size: wgpu::Extent3d { width: 0, height: 4, depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
        });
        assert!(invalid.is_err());
    }

    #[test]
    fn pass_arity_is_checked() {
        let Some(mut backend) = backend() else { return };
        let program = PassProgram::Pattern {
            camera: Camera2D::default(),
            pattern: Pattern::Solid { color: Color::white() },
        };
        let instance = backend.build(&program).unwrap();
        let a = backend.allocate_texture(TextureDesc::new(4, 4, TextureFormat::Bgra8Unorm)).unwrap();
        let b = backend.allocate_texture(TextureDesc::new(4, 4, TextureFormat::Bgra8Unorm)).unwrap();

        assert!(backend.render(&instance, &a, &[]).is_ok());
        assert!(matches!(backend.render(&instance, &a, &[&b]), Err(RenderError::InvalidPass { .. })));
    }

    #[test]
    fn pipeline_renders_on_device() {
        let Some(backend) = backend() else { return };
        let mut pipeline = Pipeline2D::new(backend);
        pipeline.build(&scene()).unwrap();

        pipeline.render(32.0, 16.0, None).unwrap();
        let fin = pipeline.final_texture().unwrap();
        assert_eq!((fin.width(), fin.height()), (32, 16));
        assert_eq!(fin.format(), TextureFormat::Bgra8Unorm);

        pipeline.set_output_type(OutputType::DepthMap);
        pipeline.render(32.0, 16.0, Some(RenderSettings::transparent())).unwrap();
        assert_eq!(pipeline.final_texture().unwrap().format(), TextureFormat::Rgba16Float);
        assert!(!pipeline.resolution_changed(32.0, 16.0));
    }
}
