//! Mapping from the device layer's types onto wgpu's.

use crate::device::{
    BufferUsages, CullMode, DescriptorSetBinding, DescriptorType, DeviceError, DeviceResult,
    EdgeMode, Format, PrimitiveTopology, TextureUsages,
};

pub(super) fn texture_format(format: Format) -> DeviceResult<wgpu::TextureFormat> {
    match format {
        Format::R8G8B8A8Unorm => Ok(wgpu::TextureFormat::Rgba8Unorm),
        Format::R8G8B8A8Srgb => Ok(wgpu::TextureFormat::Rgba8UnormSrgb),
        Format::R16G16B16A16Sfloat => Ok(wgpu::TextureFormat::Rgba16Float),
        Format::R32G32B32A32Sfloat => Ok(wgpu::TextureFormat::Rgba32Float),
        Format::D32Sfloat => Ok(wgpu::TextureFormat::Depth32Float),
        Format::R32G32Sfloat | Format::R32G32B32Sfloat => Err(DeviceError::UnsupportedFormat(format)),
    }
}

/// Rejects sampled textures the filtering sampler cannot read on this device.
pub(super) fn sampled_texture_format(
    format: Format,
    usage: TextureUsages,
    features: wgpu::Features,
) -> DeviceResult<wgpu::TextureFormat> {
    let texture_format = texture_format(format)?;
    let sampled = texture_usages(usage).contains(wgpu::TextureUsages::TEXTURE_BINDING);
    if sampled
        && format == Format::R32G32B32A32Sfloat
        && !features.contains(wgpu::Features::FLOAT32_FILTERABLE)
    {
        return Err(DeviceError::UnsupportedFormat(format));
    }
    Ok(texture_format)
}

pub(super) fn vertex_format(format: Format) -> DeviceResult<wgpu::VertexFormat> {
    match format {
        Format::R32G32Sfloat => Ok(wgpu::VertexFormat::Float32x2),
        Format::R32G32B32Sfloat => Ok(wgpu::VertexFormat::Float32x3),
        Format::R32G32B32A32Sfloat => Ok(wgpu::VertexFormat::Float32x4),
        Format::R16G16B16A16Sfloat => Ok(wgpu::VertexFormat::Float16x4),
        Format::R8G8B8A8Unorm => Ok(wgpu::VertexFormat::Unorm8x4),
        Format::R8G8B8A8Srgb | Format::D32Sfloat => Err(DeviceError::UnsupportedFormat(format)),
    }
}

pub(super) fn buffer_usages(usage: BufferUsages) -> wgpu::BufferUsages {
    let mut out = wgpu::BufferUsages::empty();
    if usage.contains(BufferUsages::VERTEX) {
        out |= wgpu::BufferUsages::VERTEX;
    }
    if usage.contains(BufferUsages::INDEX) {
        out |= wgpu::BufferUsages::INDEX;
    }
    if usage.contains(BufferUsages::UNIFORM) {
        out |= wgpu::BufferUsages::UNIFORM;
    }
    if usage.contains(BufferUsages::STORAGE) {
        out |= wgpu::BufferUsages::STORAGE;
    }
    if usage.contains(BufferUsages::READ_WRITE_DST) {
        out |= wgpu::BufferUsages::COPY_DST;
    }
    if usage.contains(BufferUsages::READ_WRITE_SRC) {
        out |= wgpu::BufferUsages::COPY_SRC;
    }
    out
}

pub(super) fn texture_usages(usage: TextureUsages) -> wgpu::TextureUsages {
    let mut out = wgpu::TextureUsages::empty();
    if usage.contains(TextureUsages::SAMPLED) {
        out |= wgpu::TextureUsages::TEXTURE_BINDING;
    }
    if usage.intersects(TextureUsages::RENDER_TARGET | TextureUsages::DEPTH_BUFFER) {
        out |= wgpu::TextureUsages::RENDER_ATTACHMENT;
    }
    if usage.contains(TextureUsages::TRANSFER_SRC) {
        // Presentation reads transfer sources through a sampled blit.
        out |= wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::TEXTURE_BINDING;
    }
    if usage.contains(TextureUsages::TRANSFER_DST) {
        out |= wgpu::TextureUsages::COPY_DST;
    }
    out
}

pub(super) fn address_mode(mode: EdgeMode) -> wgpu::AddressMode {
    match mode {
        EdgeMode::Repeat => wgpu::AddressMode::Repeat,
        EdgeMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
        EdgeMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
    }
}

pub(super) fn cull_face(mode: CullMode) -> Option<wgpu::Face> {
    match mode {
        CullMode::None => None,
        CullMode::Front => Some(wgpu::Face::Front),
        CullMode::Back => Some(wgpu::Face::Back),
    }
}

pub(super) fn topology(topology: PrimitiveTopology) -> wgpu::PrimitiveTopology {
    match topology {
        PrimitiveTopology::PointList => wgpu::PrimitiveTopology::PointList,
        PrimitiveTopology::LineList => wgpu::PrimitiveTopology::LineList,
        PrimitiveTopology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
        PrimitiveTopology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
    }
}

/// Expands a descriptor-set layout into bind group layout entries.
///
/// Bindings are numbered consecutively in declaration order. Every element of
/// a sampled-texture binding takes two slots: the view, then its sampler.
pub(super) fn layout_entries(bindings: &[DescriptorSetBinding]) -> Vec<wgpu::BindGroupLayoutEntry> {
    let visibility = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
    let mut entries = Vec::new();
    let mut slot = 0u32;

    for binding in bindings {
        for _ in 0..binding.count {
            match binding.ty {
                DescriptorType::UniformBuffer | DescriptorType::StorageBuffer => {
                    let ty = if binding.ty == DescriptorType::UniformBuffer {
                        wgpu::BufferBindingType::Uniform
                    } else {
                        wgpu::BufferBindingType::Storage { read_only: true }
                    };
                    entries.push(wgpu::BindGroupLayoutEntry {
                        binding: slot,
                        visibility,
                        ty: wgpu::BindingType::Buffer {
                            ty,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    });
                    slot += 1;
                }
                DescriptorType::SampledTexture => {
                    entries.push(wgpu::BindGroupLayoutEntry {
                        binding: slot,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    });
                    entries.push(wgpu::BindGroupLayoutEntry {
                        binding: slot + 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    });
                    slot += 2;
                }
            }
        }
    }

    entries
}
