use bitflags::bitflags;

use super::handle::{BufferHandle, TextureHandle};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsages: u32 {
        const VERTEX = 1 << 0;
        const INDEX = 1 << 1;
        const UNIFORM = 1 << 2;
        const STORAGE = 1 << 3;
        /// Buffer may be the destination of CPU writes.
        const READ_WRITE_DST = 1 << 4;
        /// Buffer may be read back to the CPU.
        const READ_WRITE_SRC = 1 << 5;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsages: u32 {
        const SAMPLED = 1 << 0;
        const RENDER_TARGET = 1 << 1;
        const DEPTH_BUFFER = 1 << 2;
        const TRANSFER_SRC = 1 << 3;
        const TRANSFER_DST = 1 << 4;
    }
}

/// Pixel and vertex attribute formats understood by the device layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    R32G32Sfloat,
    R32G32B32Sfloat,
    R32G32B32A32Sfloat,
    R16G16B16A16Sfloat,
    R8G8B8A8Unorm,
    R8G8B8A8Srgb,
    D32Sfloat,
}

impl Format {
    /// Size in bytes of one texel or one vertex attribute of this format.
    pub const fn size(self) -> u32 {
        match self {
            Self::R32G32Sfloat => 8,
            Self::R32G32B32Sfloat => 12,
            Self::R32G32B32A32Sfloat => 16,
            Self::R16G16B16A16Sfloat => 8,
            Self::R8G8B8A8Unorm | Self::R8G8B8A8Srgb => 4,
            Self::D32Sfloat => 4,
        }
    }

    pub const fn is_depth(self) -> bool {
        matches!(self, Self::D32Sfloat)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureAspect {
    Color,
    Depth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EdgeMode {
    #[default]
    Repeat,
    MirroredRepeat,
    ClampToEdge,
}

/// Layout a texture is transitioned to after an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    ShaderReadOnly,
    RenderTarget,
    DepthBuffer,
    TransferSrc,
}

#[derive(Debug, Clone, Copy)]
pub struct BufferDescriptor<'a> {
    pub label: Option<&'a str>,
    pub size: u64,
    pub usage: BufferUsages,
}

#[derive(Debug, Clone, Copy)]
pub struct TextureDescriptor<'a> {
    pub label: Option<&'a str>,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub format: Format,
    pub aspect: TextureAspect,
    pub usage: TextureUsages,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub edge_mode: EdgeMode,
    pub bilinear_filter: bool,
}

impl TextureDescriptor<'_> {
    /// Bytes needed to fill mip 0 of every layer.
    pub fn byte_size(&self) -> u64 {
        u64::from(self.width)
            * u64::from(self.height)
            * u64::from(self.depth.max(1))
            * u64::from(self.array_layers.max(1))
            * u64::from(self.format.size())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub format: Format,
    pub offset: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct VertexBinding<'a> {
    pub stride: u32,
    pub attributes: &'a [VertexAttribute],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    UniformBuffer,
    StorageBuffer,
    SampledTexture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorSetBinding {
    pub ty: DescriptorType,
    pub count: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct DescriptorSetLayout<'a> {
    pub bindings: &'a [DescriptorSetBinding],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    TriangleList,
    TriangleStrip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Front,
    Back,
}

/// Everything needed to build one graphics pipeline.
#[derive(Debug, Clone, Copy)]
pub struct ShaderDescriptor<'a> {
    pub label: Option<&'a str>,
    /// WGSL module providing `vs_main`.
    pub vertex_source: &'a str,
    /// WGSL module providing `fs_main`.
    pub fragment_source: &'a str,
    pub color_format: Format,
    pub depth_format: Option<Format>,
    pub vertex_bindings: &'a [VertexBinding<'a>],
    pub descriptor_sets: &'a [DescriptorSetLayout<'a>],
    pub push_constant_size: u32,
    pub topology: PrimitiveTopology,
    pub cull_mode: CullMode,
    pub enable_depth_buffer: bool,
    pub enable_color_blend: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPassDescriptor {
    pub target: TextureHandle,
    pub depth: Option<TextureHandle>,
    /// `None` loads the existing contents.
    pub clear_color: Option<[f32; 4]>,
    /// `None` loads the existing contents.
    pub clear_depth: Option<f32>,
}

/// One binding's worth of resources in a bound descriptor set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Descriptor<'a> {
    UniformBuffer(&'a [BufferHandle]),
    StorageBuffer(&'a [BufferHandle]),
    SampledTexture(&'a [TextureHandle]),
}

impl Descriptor<'_> {
    pub fn ty(&self) -> DescriptorType {
        match self {
            Self::UniformBuffer(_) => DescriptorType::UniformBuffer,
            Self::StorageBuffer(_) => DescriptorType::StorageBuffer,
            Self::SampledTexture(_) => DescriptorType::SampledTexture,
        }
    }

    pub fn count(&self) -> usize {
        match self {
            Self::UniformBuffer(buffers) | Self::StorageBuffer(buffers) => buffers.len(),
            Self::SampledTexture(textures) => textures.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_byte_size_counts_every_texel() {
        let desc = TextureDescriptor {
            label: None,
            width: 2,
            height: 2,
            depth: 1,
            format: Format::R16G16B16A16Sfloat,
            aspect: TextureAspect::Color,
            usage: TextureUsages::SAMPLED,
            mip_levels: 1,
            array_layers: 1,
            edge_mode: EdgeMode::Repeat,
            bilinear_filter: false,
        };
        assert_eq!(desc.byte_size(), 32);
    }

    #[test]
    fn descriptor_reports_type_and_count() {
        let textures = [TextureHandle::new(1), TextureHandle::new(2)];
        let desc = Descriptor::SampledTexture(&textures);
        assert_eq!(desc.ty(), DescriptorType::SampledTexture);
        assert_eq!(desc.count(), 2);
    }
}
