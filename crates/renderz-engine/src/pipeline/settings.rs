use std::fmt;

use crate::texture::TextureDesc;

pub type ProgressFn = Box<dyn FnMut(u32, u32)>;
pub type FinishedFn = Box<dyn FnOnce(TextureDesc)>;

/// Which cache texture becomes the pipeline's final texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum OutputType {
    #[default]
    FinalImage,
    /// The raw shape-pass output (distance, -1, material, id).
    DepthMap,
}

/// Options for a single `render` call. Consumed by the call; nothing persists.
#[derive(Default)]
pub struct RenderSettings {
    /// Bounce count for pipelines that trace reflections. Unused in 2D.
    pub reflections: u32,
    /// Samples to accumulate for pipelines that accumulate. Unused in 2D.
    pub samples: u32,
    /// Clear the background to transparent black instead of running the pre pass.
    pub transparent: bool,
    /// Called after each pass with `(passes_done, passes_total)`.
    pub on_progress: Option<ProgressFn>,
    /// Called once with the final texture's descriptor after a successful render.
    pub on_finished: Option<FinishedFn>,
}

impl RenderSettings {
    pub fn transparent() -> Self {
        Self { transparent: true, ..Default::default() }
    }

    pub fn with_progress(mut self, f: impl FnMut(u32, u32) + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    pub fn with_finished(mut self, f: impl FnOnce(TextureDesc) + 'static) -> Self {
        self.on_finished = Some(Box::new(f));
        self
    }

    pub(crate) fn report_progress(&mut self, done: u32, total: u32) {
        if let Some(f) = self.on_progress.as_mut() {
            f(done, total);
        }
    }

    pub(crate) fn finish(self, desc: TextureDesc) {
        if let Some(f) = self.on_finished {
            f(desc);
        }
    }
}

impl fmt::Debug for RenderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderSettings")
            .field("reflections", &self.reflections)
            .field("samples", &self.samples)
            .field("transparent", &self.transparent)
            .field("on_progress", &self.on_progress.is_some())
            .field("on_finished", &self.on_finished.is_some())
            .finish()
    }
}
