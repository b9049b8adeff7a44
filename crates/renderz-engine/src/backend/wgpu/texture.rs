use crate::texture::{GpuTexture, TextureDesc};

/// Texture of the [`WgpuBackend`](super::WgpuBackend).
///
/// Cloning shares the underlying GPU texture. wgpu keeps the allocation alive
/// while any handle or submitted command buffer still uses it.
#[derive(Debug, Clone)]
pub struct WgpuTexture {
    id: u64,
    desc: TextureDesc,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl WgpuTexture {
    pub(super) fn new(device: &wgpu::Device, id: u64, desc: TextureDesc) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("renderz cache texture"),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format.to_wgpu(),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { id, desc, texture, view }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    #[inline]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}

impl GpuTexture for WgpuTexture {
    #[inline]
    fn desc(&self) -> TextureDesc {
        self.desc
    }

    #[inline]
    fn same_texture(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
