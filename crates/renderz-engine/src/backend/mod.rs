//! Rendering backends.
//!
//! A backend allocates textures and runs compiled pass programs. Pipelines are
//! generic over [`Backend`] so the same pipeline drives the GPU in the viewer
//! and the CPU reference implementation in tests.

mod cpu;
pub mod wgpu;

use crate::compile::PassProgram;
use crate::error::RenderResult;
use crate::texture::TextureAllocator;

pub use cpu::{BackendStats, CpuBackend, CpuBackendConfig, CpuInstance, CpuTexture};
pub use self::wgpu::{PresentPass, WgpuBackend, WgpuInstance, WgpuTexture};

pub trait Backend: TextureAllocator {
    /// A pass program compiled for this backend.
    type Instance;

    fn build(&mut self, program: &PassProgram) -> RenderResult<Self::Instance>;

    /// Runs `instance` into `target`. `inputs` must match the program's
    /// [`PassProgram::input_count`] and must not contain `target`.
    fn render(
        &mut self,
        instance: &Self::Instance,
        target: &Self::Texture,
        inputs: &[&Self::Texture],
    ) -> RenderResult<()>;

    /// Fills every pixel of `target` with `value`.
    fn render_clear(&mut self, target: &Self::Texture, value: [f32; 4]) -> RenderResult<()>;
}
