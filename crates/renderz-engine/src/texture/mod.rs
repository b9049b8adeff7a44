//! Texture handles and the keyed texture cache.
//!
//! The cache owns every intermediate texture a pipeline renders into. Entries
//! are allocated lazily and reallocated only when the requested size or format
//! changes, so a stable viewport costs no allocations per frame.

mod cache;
mod format;

use std::fmt;

use crate::error::RenderResult;

pub use cache::{check_texture_size, PairMember, PingPongSlot, TextureCache, DEFAULT_ENTRY_FORMAT};
pub use format::{round_extent, TextureDesc, TextureFormat};

/// A backend texture handle.
///
/// Handles are cheap to clone; clones refer to the same GPU resource. Identity
/// is compared with [`GpuTexture::same_texture`], never by content.
pub trait GpuTexture: Clone + fmt::Debug {
    fn desc(&self) -> TextureDesc;

    /// Returns `true` when both handles refer to the same allocation.
    fn same_texture(&self, other: &Self) -> bool;

    #[inline]
    fn width(&self) -> u32 {
        self.desc().width
    }

    #[inline]
    fn height(&self) -> u32 {
        self.desc().height
    }

    #[inline]
    fn format(&self) -> TextureFormat {
        self.desc().format
    }
}

/// Source of textures for a [`TextureCache`].
pub trait TextureAllocator {
    type Texture: GpuTexture;

    /// Allocates a texture usable both as a render target and as a pass input.
    fn allocate_texture(&mut self, desc: TextureDesc) -> RenderResult<Self::Texture>;

    /// Gives up the caller's ownership of `texture`.
    ///
    /// Memory is reclaimed once no other handle (for example a retained final
    /// texture or in-flight GPU work) still refers to it.
    fn release_texture(&mut self, texture: Self::Texture);
}
