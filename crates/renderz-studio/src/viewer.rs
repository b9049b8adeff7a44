use anyhow::Result;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use renderz_engine::backend::{PresentPass, WgpuBackend};
use renderz_engine::core::{App, AppControl, FrameCtx};
use renderz_engine::device::Gpu;
use renderz_engine::pipeline::{OutputType, Pipeline, Pipeline2D, RenderSettings};
use renderz_engine::scene::Scene;

/// Viewer startup options.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub transparent: bool,
    pub output: OutputType,
    pub minimal_preview: bool,
    /// Frames between window title refreshes; 0 keeps the title static.
    pub title_interval: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            transparent: false,
            output: OutputType::FinalImage,
            minimal_preview: false,
            title_interval: 30,
        }
    }
}

/// GPU state created lazily on the first frame, once a device exists.
struct ViewerGfx {
    pipeline: Pipeline2D<WgpuBackend>,
    present: PresentPass,
    adapter: String,
}

impl ViewerGfx {
    fn new(gpu: &Gpu<'_>) -> Self {
        let backend = WgpuBackend::new(gpu.device().clone(), gpu.queue().clone());
        Self {
            pipeline: Pipeline2D::new(backend),
            present: PresentPass::new(gpu.device(), gpu.surface_format()),
            adapter: gpu.adapter_info().name,
        }
    }
}

pub struct Viewer {
    config: ViewerConfig,
    make_scene: fn() -> Scene,
    gfx: Option<ViewerGfx>,
    needs_build: bool,
    needs_render: bool,
}

impl Viewer {
    pub fn new(config: ViewerConfig, make_scene: fn() -> Scene) -> Self {
        Self {
            config,
            make_scene,
            gfx: None,
            needs_build: true,
            needs_render: true,
        }
    }

    fn on_key(&mut self, code: KeyCode) -> AppControl {
        match code {
            KeyCode::Escape => return AppControl::Exit,
            KeyCode::KeyT => {
                self.config.transparent = !self.config.transparent;
                log::info!("transparent background: {}", self.config.transparent);
            }
            KeyCode::KeyD => {
                self.config.output = match self.config.output {
                    OutputType::FinalImage => OutputType::DepthMap,
                    OutputType::DepthMap => OutputType::FinalImage,
                };
                log::info!("output: {:?}", self.config.output);
            }
            KeyCode::KeyM => {
                self.config.minimal_preview = !self.config.minimal_preview;
                log::info!("minimal preview: {}", self.config.minimal_preview);
            }
            KeyCode::KeyR => {
                log::info!("rebuilding scene");
                self.needs_build = true;
            }
            _ => return AppControl::Continue,
        }

        if let Some(gfx) = self.gfx.as_mut() {
            gfx.pipeline.cancel();
        }
        self.needs_render = true;
        AppControl::Continue
    }

    fn sync_pipeline(&mut self) -> Result<()> {
        let Some(gfx) = self.gfx.as_mut() else { return Ok(()) };
        let pipeline = &mut gfx.pipeline;

        pipeline.set_output_type(self.config.output);
        pipeline.set_minimal_preview(self.config.minimal_preview);

        if self.needs_build {
            self.needs_build = false;
            self.needs_render = true;
            let scene = (self.make_scene)();
            pipeline.build(&scene)?;
            log::info!("scene built: {} pickable shapes", pipeline.ids().len());
        }
        Ok(())
    }

    fn render(&mut self, width: u32, height: u32) {
        let Some(gfx) = self.gfx.as_mut() else { return };
        if !gfx.pipeline.is_built() {
            // Nothing to render until a build succeeds (R retries).
            return;
        }
        let (w, h) = (width as f32, height as f32);

        if !self.needs_render && !gfx.pipeline.resolution_changed(w, h) {
            return;
        }

        let settings = RenderSettings {
            transparent: self.config.transparent,
            ..RenderSettings::default()
        }
        .with_progress(|done, total| log::trace!("render pass {done}/{total}"))
        .with_finished(|desc| log::debug!("rendered {}x{} {:?}", desc.width, desc.height, desc.format));

        match gfx.pipeline.render(w, h, Some(settings)) {
            Ok(()) => self.needs_render = false,
            Err(err) => log::warn!("render failed: {err}"),
        }
    }
}

impl App for Viewer {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => self.on_key(*code),
            _ => AppControl::Continue,
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if self.gfx.is_none() {
            self.gfx = Some(ViewerGfx::new(ctx.gpu));
        }

        if let Err(err) = self.sync_pipeline() {
            log::error!("scene build failed: {err:#}");
        }

        let (width, height) = ctx.window.physical_size();
        if width == 0 || height == 0 {
            // Minimized.
            return AppControl::Continue;
        }
        self.render(width, height);

        let Some(gfx) = self.gfx.as_ref() else { return AppControl::Continue };

        if self.config.title_interval > 0 && ctx.time.frame_index % self.config.title_interval == 0 {
            ctx.window.set_title(&format!(
                "Render-Z | {} | {width}x{height} | {:.0} fps | {:?}",
                gfx.adapter, ctx.time.fps, self.config.output
            ));
        }

        ctx.present(&gfx.present, gfx.pipeline.final_texture())
    }

    fn on_exit(&mut self) {
        if let Some(mut gfx) = self.gfx.take() {
            gfx.pipeline.clear_textures();
            log::debug!("viewer textures released");
        }
    }
}
