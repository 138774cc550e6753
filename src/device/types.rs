//! Common types shared between the scene core and device implementations.

/// Texture format enumeration.
///
/// UI textures are 32-bit per pixel; other packings are rejected by the
/// upload pipeline before any GPU allocation happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
}

impl TextureFormat {
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm
            | TextureFormat::Rgba8UnormSrgb
            | TextureFormat::Bgra8Unorm
            | TextureFormat::Bgra8UnormSrgb => 4,
        }
    }
}

/// Usage state of a GPU resource, used for transition barriers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    CopyDest,
    ShaderResource,
    RenderTarget,
    Present,
}

/// Kind of descriptor heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorHeapKind {
    /// Shader-visible table for texture bindings.
    ShaderVisible,
    /// CPU-only heap for render-target views.
    RenderTarget,
}

/// Texture descriptor.
#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    pub label: Option<String>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8Unorm,
        }
    }
}

/// Source footprint for a buffer-to-texture copy.
///
/// `row_pitch` is the padded stride of each row inside `buffer`, which in
/// general exceeds `width * bytes_per_pixel`.
#[derive(Debug, Clone, Copy)]
pub struct BufferImageCopy {
    pub buffer: super::ResourceId,
    pub row_pitch: u32,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}
