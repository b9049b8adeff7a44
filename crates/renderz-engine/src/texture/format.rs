/// Pixel formats the cache and backends agree on.
///
/// The set is deliberately small: an 8-bit display format for color passes and
/// two float formats for distance/material data and accumulation buffers.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum TextureFormat {
    /// 8-bit unorm, BGRA order in memory. Default for color targets.
    #[default]
    Bgra8Unorm,
    /// 16-bit float per channel. Default for cache entries and ping-pong pairs.
    Rgba16Float,
    /// 32-bit float per channel.
    Rgba32Float,
}

impl TextureFormat {
    pub const ALL: [TextureFormat; 3] =
        [TextureFormat::Bgra8Unorm, TextureFormat::Rgba16Float, TextureFormat::Rgba32Float];

    #[inline]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::Bgra8Unorm => 4,
            TextureFormat::Rgba16Float => 8,
            TextureFormat::Rgba32Float => 16,
        }
    }

    #[inline]
    pub const fn is_float(self) -> bool {
        !matches!(self, TextureFormat::Bgra8Unorm)
    }

    /// Maps to the matching wgpu format.
    #[inline]
    pub const fn to_wgpu(self) -> wgpu::TextureFormat {
        match self {
            TextureFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
            TextureFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
            TextureFormat::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
        }
    }
}

/// Size and format of a 2D texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

impl TextureDesc {
    #[inline]
    pub const fn new(width: u32, height: u32, format: TextureFormat) -> Self {
        Self { width, height, format }
    }

    /// Converts a fractional viewport size to a texture extent.
    ///
    /// Dimensions are rounded to the nearest pixel and never drop below 1; GPU
    /// APIs reject zero-sized textures.
    pub fn from_extent(width: f32, height: f32, format: TextureFormat) -> Self {
        Self::new(round_extent(width), round_extent(height), format)
    }

    #[inline]
    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    #[inline]
    pub fn byte_size(self) -> usize {
        self.pixel_count() * self.format.bytes_per_pixel()
    }
}

/// Rounds one viewport dimension to a texture dimension (minimum 1).
#[inline]
pub fn round_extent(v: f32) -> u32 {
    if v.is_finite() && v > 1.0 { v.round() as u32 } else { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_rounds_to_nearest() {
        let d = TextureDesc::from_extent(99.6, 150.4, TextureFormat::Bgra8Unorm);
        assert_eq!((d.width, d.height), (100, 150));
    }

    #[test]
    fn extent_never_zero() {
        assert_eq!(round_extent(0.0), 1);
        assert_eq!(round_extent(-5.0), 1);
        assert_eq!(round_extent(f32::NAN), 1);
    }

    #[test]
    fn byte_size_follows_format() {
        assert_eq!(TextureDesc::new(2, 2, TextureFormat::Bgra8Unorm).byte_size(), 16);
        assert_eq!(TextureDesc::new(2, 2, TextureFormat::Rgba16Float).byte_size(), 32);
        assert_eq!(TextureDesc::new(2, 2, TextureFormat::Rgba32Float).byte_size(), 64);
    }
}
