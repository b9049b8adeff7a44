//! Render pipelines.
//!
//! A pipeline compiles a [`Scene`] into backend pass instances (`build`) and
//! executes them in a fixed order into cache textures (`render`). The last
//! texture produced is the pipeline's final texture.

mod pipeline2d;
mod settings;

use crate::error::RenderResult;
use crate::scene::Scene;
use crate::texture::{round_extent, GpuTexture};

pub use pipeline2d::Pipeline2D;
pub use settings::{FinishedFn, OutputType, ProgressFn, RenderSettings};

/// Build/render contract shared by all pipelines.
///
/// States: unbuilt, built. `render` is only valid once built; calling it
/// earlier returns [`RenderError::NotBuilt`](crate::error::RenderError::NotBuilt)
/// without doing any GPU work. `cancel` and `reset_ids` are valid in any state.
pub trait Pipeline {
    type Texture: GpuTexture;

    /// Compiles `scene`, replacing every previously built instance.
    ///
    /// All-or-nothing: on error the previous build (instances and ids) stays in effect.
    fn build(&mut self, scene: &Scene) -> RenderResult<()>;

    /// Runs all passes at `width` x `height` (rounded, minimum 1).
    ///
    /// `None` renders with default settings. On error the previous final
    /// texture is kept.
    fn render(&mut self, width: f32, height: f32, settings: Option<RenderSettings>) -> RenderResult<()>;

    fn final_texture(&self) -> Option<&Self::Texture>;

    fn get_texture_of_id(&self, id: &str) -> RenderResult<&Self::Texture>;

    /// Interrupts sample accumulation. The next render starts from zero samples.
    fn cancel(&mut self);

    /// Forgets all hit-test ids.
    fn reset_ids(&mut self);

    /// Limits rendering to the cheapest passes while `minimal` is set.
    fn set_minimal_preview(&mut self, minimal: bool);

    /// `true` when nothing was rendered yet or the final texture's size differs
    /// from the rounded request.
    fn resolution_changed(&self, width: f32, height: f32) -> bool {
        let (w, h) = (round_extent(width), round_extent(height));
        self.final_texture().is_none_or(|t| t.width() != w || t.height() != h)
    }

    /// Renders with default settings only if [`Pipeline::resolution_changed`].
    /// Returns whether a render happened.
    fn render_if_resolution_changed(&mut self, width: f32, height: f32) -> RenderResult<bool> {
        if !self.resolution_changed(width, height) {
            return Ok(false);
        }
        self.render(width, height, None)?;
        Ok(true)
    }
}
