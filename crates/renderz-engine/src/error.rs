use crate::texture::TextureDesc;

/// Errors surfaced by texture caches, backends and pipelines.
///
/// None of these are retried automatically. A render loop that hits one simply
/// tries again on the next frame.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    /// The backend could not provide a texture. The current frame is aborted and
    /// the previous final texture stays presentable.
    #[error("failed to allocate {}x{} {:?} texture: {reason}", .desc.width, .desc.height, .desc.format)]
    AllocationFailed { desc: TextureDesc, reason: String },

    /// A cache entry or ping-pong pair was accessed before allocation or after it was freed.
    #[error("no texture registered under `{0}`")]
    UnknownKey(String),

    /// `render` was requested before any `build`.
    #[error("pipeline has not been built")]
    NotBuilt,

    /// The backend rejected a pass program.
    #[error("failed to compile `{pass}` pass: {reason}")]
    Compile { pass: String, reason: String },

    /// A pass was invoked with inputs it cannot use (wrong count, or the target
    /// doubles as an input).
    #[error("invalid `{pass}` pass: {reason}")]
    InvalidPass { pass: String, reason: String },
}

pub type RenderResult<T> = Result<T, RenderError>;
