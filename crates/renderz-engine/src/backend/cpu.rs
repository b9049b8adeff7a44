use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use half::f16;

use crate::compile::eval::{eval_composite, eval_pattern, eval_shapes};
use crate::compile::PassProgram;
use crate::coords::Vec2;
use crate::error::{RenderError, RenderResult};
use crate::texture::{GpuTexture, TextureAllocator, TextureDesc, TextureFormat};

use super::Backend;

/// Limits of the software backend. Exceeding them fails allocation the same
/// way a GPU out-of-memory or limit violation would.
#[derive(Debug, Clone, Copy)]
pub struct CpuBackendConfig {
    pub max_dimension: u32,
    /// Upper bound on bytes held by live (unreleased) textures.
    pub memory_budget: Option<usize>,
}

impl Default for CpuBackendConfig {
    fn default() -> Self {
        Self { max_dimension: 8192, memory_budget: None }
    }
}

/// Work counters. `passes + clears` is the amount of "GPU work" performed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStats {
    pub allocations: u64,
    pub releases: u64,
    pub builds: u64,
    pub passes: u64,
    pub clears: u64,
}

impl BackendStats {
    #[inline]
    pub fn gpu_work(&self) -> u64 {
        self.passes + self.clears
    }
}

struct CpuTextureInner {
    id: u64,
    desc: TextureDesc,
    pixels: RefCell<Vec<[f32; 4]>>,
}

/// Texture of the [`CpuBackend`]: a shared, row-major RGBA pixel buffer.
///
/// Values are stored already quantized to the texture's format, so reading
/// back a `Bgra8Unorm` texture yields multiples of 1/255.
#[derive(Clone)]
pub struct CpuTexture(Rc<CpuTextureInner>);

impl CpuTexture {
    fn new(id: u64, desc: TextureDesc) -> Self {
        Self(Rc::new(CpuTextureInner {
            id,
            desc,
            pixels: RefCell::new(vec![[0.0; 4]; desc.pixel_count()]),
        }))
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// Channels in RGBA order regardless of the memory layout of the format.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        let d = self.0.desc;
        if x >= d.width || y >= d.height {
            return None;
        }
        self.0.pixels.borrow().get((y * d.width + x) as usize).copied()
    }

    /// Snapshot of all pixels, row-major.
    pub fn pixels(&self) -> Vec<[f32; 4]> {
        self.0.pixels.borrow().clone()
    }

    /// `true` when every pixel equals `value` after quantization to this format.
    pub fn is_filled_with(&self, value: [f32; 4]) -> bool {
        let q = quantize(self.0.desc.format, value);
        self.0.pixels.borrow().iter().all(|p| *p == q)
    }
}

impl fmt::Debug for CpuTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpuTexture")
            .field("id", &self.0.id)
            .field("desc", &self.0.desc)
            .finish_non_exhaustive()
    }
}

impl GpuTexture for CpuTexture {
    #[inline]
    fn desc(&self) -> TextureDesc {
        self.0.desc
    }

    #[inline]
    fn same_texture(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

fn quantize(format: TextureFormat, v: [f32; 4]) -> [f32; 4] {
    match format {
        TextureFormat::Bgra8Unorm => v.map(|c| {
            let c = if c.is_nan() { 0.0 } else { c.clamp(0.0, 1.0) };
            (c * 255.0).round() / 255.0
        }),
        TextureFormat::Rgba16Float => v.map(|c| f16::from_f32(c).to_f32()),
        TextureFormat::Rgba32Float => v,
    }
}

/// A pass program accepted by [`CpuBackend::build`].
#[derive(Debug, Clone)]
pub struct CpuInstance {
    program: PassProgram,
}

impl CpuInstance {
    #[inline]
    pub fn program(&self) -> &PassProgram {
        &self.program
    }
}

/// Software reference backend.
///
/// Evaluates pass programs per pixel with `compile::eval`. Used by tests and
/// as a fallback when no GPU adapter is available.
#[derive(Debug, Default)]
pub struct CpuBackend {
    config: CpuBackendConfig,
    next_id: u64,
    live: HashMap<u64, usize>,
    live_bytes: usize,
    stats: BackendStats,
}

impl CpuBackend {
    pub fn new(config: CpuBackendConfig) -> Self {
        Self { config, ..Default::default() }
    }

    #[inline]
    pub fn stats(&self) -> BackendStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = BackendStats::default();
    }

    /// Textures allocated and not yet released.
    #[inline]
    pub fn live_textures(&self) -> usize {
        self.live.len()
    }

    #[inline]
    pub fn live_bytes(&self) -> usize {
        self.live_bytes
    }

    /// Changes the budget for future allocations. Live textures are kept.
    pub fn set_memory_budget(&mut self, budget: Option<usize>) {
        self.config.memory_budget = budget;
    }
}

fn invalid_pass(program: &PassProgram, reason: impl Into<String>) -> RenderError {
    RenderError::InvalidPass { pass: program.label().to_string(), reason: reason.into() }
}

impl TextureAllocator for CpuBackend {
    type Texture = CpuTexture;

    fn allocate_texture(&mut self, desc: TextureDesc) -> RenderResult<CpuTexture> {
        let fail = |reason: String| RenderError::AllocationFailed { desc, reason };

        if desc.width == 0 || desc.height == 0 {
            return Err(fail("zero-sized texture".to_string()));
        }
        let max = self.config.max_dimension;
        if desc.width > max || desc.height > max {
            return Err(fail(format!("exceeds max dimension {max}")));
        }
        let bytes = desc.byte_size();
        if let Some(budget) = self.config.memory_budget
            && self.live_bytes + bytes > budget
        {
            return Err(fail(format!(
                "budget exhausted ({} of {budget} bytes in use)",
                self.live_bytes
            )));
        }

        let id = self.next_id;
        self.next_id += 1;
        self.live.insert(id, bytes);
        self.live_bytes += bytes;
        self.stats.allocations += 1;
        log::trace!("cpu: allocated texture #{id} {}x{} {:?}", desc.width, desc.height, desc.format);
        Ok(CpuTexture::new(id, desc))
    }

    fn release_texture(&mut self, texture: CpuTexture) {
        if let Some(bytes) = self.live.remove(&texture.id()) {
            self.live_bytes -= bytes;
            self.stats.releases += 1;
        } else {
            log::warn!("cpu: release of unknown texture #{}", texture.id());
        }
    }
}

impl Backend for CpuBackend {
    type Instance = CpuInstance;

    fn build(&mut self, program: &PassProgram) -> RenderResult<CpuInstance> {
        program.validate()?;
        self.stats.builds += 1;
        Ok(CpuInstance { program: program.clone() })
    }

    fn render(
        &mut self,
        instance: &CpuInstance,
        target: &CpuTexture,
        inputs: &[&CpuTexture],
    ) -> RenderResult<()> {
        let program = &instance.program;
        if inputs.len() != program.input_count() {
            return Err(invalid_pass(
                program,
                format!("expected {} inputs, got {}", program.input_count(), inputs.len()),
            ));
        }
        if inputs.iter().any(|t| t.same_texture(target)) {
            return Err(invalid_pass(program, "render target is also an input"));
        }
        let desc = target.desc();
        if inputs.iter().any(|t| t.width() != desc.width || t.height() != desc.height) {
            return Err(invalid_pass(program, "input size differs from target size"));
        }

        let resolution = Vec2::new(desc.width as f32, desc.height as f32);
        let sources: Vec<_> = inputs.iter().map(|t| t.0.pixels.borrow()).collect();
        let mut out = target.0.pixels.borrow_mut();

        for y in 0..desc.height {
            for x in 0..desc.width {
                let i = (y * desc.width + x) as usize;
                let pixel = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let value = match program {
                    PassProgram::Pattern { camera, pattern } => {
                        eval_pattern(pattern, *camera, pixel, resolution)
                    }
                    PassProgram::Shapes { camera, program } => {
                        eval_shapes(program, *camera, pixel, resolution)
                    }
                    PassProgram::Composite { composite, materials } => {
                        eval_composite(composite, materials, sources[0][i], sources[1][i])
                    }
                };
                out[i] = quantize(desc.format, value);
            }
        }

        self.stats.passes += 1;
        Ok(())
    }

    fn render_clear(&mut self, target: &CpuTexture, value: [f32; 4]) -> RenderResult<()> {
        let q = quantize(target.format(), value);
        target.0.pixels.borrow_mut().fill(q);
        self.stats.clears += 1;
        Ok(())
    }
}
