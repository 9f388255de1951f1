//! Creation helpers for the GPU objects models are built from.
//!
//! Each helper uploads its data before returning, so the handle can be drawn
//! with immediately. Empty or zero-sized inputs are caller bugs and panic.

use half::f16;

use super::vertex::Vertex3D;
use crate::device::{
    BufferDescriptor, BufferHandle, BufferUsages, DeviceResult, EdgeMode, Format,
    GraphicsDevice, ImageLayout, TextureAspect, TextureDescriptor, TextureHandle, TextureUsages,
};

pub const TARGET_COLOR_FORMAT: Format = Format::R8G8B8A8Unorm;
pub const TARGET_DEPTH_FORMAT: Format = Format::D32Sfloat;

pub fn create_vertex_buffer<D: GraphicsDevice>(
    device: &mut D,
    vertices: &[Vertex3D],
) -> DeviceResult<BufferHandle> {
    assert!(!vertices.is_empty(), "vertex buffer needs at least one vertex");
    upload_buffer(
        device,
        "VertexBuffer",
        BufferUsages::VERTEX,
        bytemuck::cast_slice(vertices),
    )
}

pub fn create_index_buffer<D: GraphicsDevice>(
    device: &mut D,
    indices: &[u32],
) -> DeviceResult<BufferHandle> {
    assert!(!indices.is_empty(), "index buffer needs at least one index");
    upload_buffer(
        device,
        "IndexBuffer",
        BufferUsages::INDEX,
        bytemuck::cast_slice(indices),
    )
}

fn upload_buffer<D: GraphicsDevice>(
    device: &mut D,
    label: &str,
    usage: BufferUsages,
    contents: &[u8],
) -> DeviceResult<BufferHandle> {
    let buffer = device.create_buffer(&BufferDescriptor {
        label: Some(label),
        size: contents.len() as u64,
        usage: usage | BufferUsages::READ_WRITE_DST,
    })?;
    device.write_buffer(buffer, 0, contents)?;
    Ok(buffer)
}

/// Creates a sampled 2D map from tightly packed `width * height` pixels.
///
/// `bilinear_filter` selects linear over nearest sampling.
pub fn create_texture_map<D: GraphicsDevice>(
    device: &mut D,
    data: &[u8],
    width: u32,
    height: u32,
    format: Format,
    bilinear_filter: bool,
) -> DeviceResult<TextureHandle> {
    assert!(width > 0, "texture map width must be non-zero");
    assert!(height > 0, "texture map height must be non-zero");
    assert!(!format.is_depth(), "texture maps cannot use a depth format");

    let desc = TextureDescriptor {
        label: Some("TextureMap"),
        width,
        height,
        depth: 1,
        format,
        aspect: TextureAspect::Color,
        usage: TextureUsages::SAMPLED | TextureUsages::TRANSFER_DST,
        mip_levels: 1,
        array_layers: 1,
        edge_mode: EdgeMode::Repeat,
        bilinear_filter,
    };
    let expected = desc.byte_size() as usize;
    assert!(
        data.len() >= expected,
        "texture map data holds {} bytes, {}x{} {:?} needs {}",
        data.len(),
        width,
        height,
        format,
        expected
    );

    let texture = device.create_texture(&desc)?;
    device.write_texture(texture, &data[..expected], ImageLayout::ShaderReadOnly)?;
    Ok(texture)
}

/// Color target and depth buffer pair sized to the output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderTarget {
    pub color: TextureHandle,
    pub depth: TextureHandle,
    pub width: u32,
    pub height: u32,
}

impl RenderTarget {
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn destroy<D: GraphicsDevice>(self, device: &mut D) {
        device.destroy_texture(self.depth);
        device.destroy_texture(self.color);
    }
}

pub fn create_render_target<D: GraphicsDevice>(
    device: &mut D,
    width: u32,
    height: u32,
) -> DeviceResult<RenderTarget> {
    assert!(width > 0 && height > 0, "render target must be non-empty");

    let color = device.create_texture(&TextureDescriptor {
        label: Some("RenderTarget"),
        width,
        height,
        depth: 1,
        format: TARGET_COLOR_FORMAT,
        aspect: TextureAspect::Color,
        usage: TextureUsages::RENDER_TARGET | TextureUsages::TRANSFER_SRC,
        mip_levels: 1,
        array_layers: 1,
        edge_mode: EdgeMode::ClampToEdge,
        bilinear_filter: false,
    })?;
    let depth = device.create_texture(&TextureDescriptor {
        label: Some("DepthBuffer"),
        width,
        height,
        depth: 1,
        format: TARGET_DEPTH_FORMAT,
        aspect: TextureAspect::Depth,
        usage: TextureUsages::DEPTH_BUFFER | TextureUsages::TRANSFER_SRC,
        mip_levels: 1,
        array_layers: 1,
        edge_mode: EdgeMode::ClampToEdge,
        bilinear_filter: false,
    })?;

    log::info!("Created {}x{} render target", width, height);
    Ok(RenderTarget {
        color,
        depth,
        width,
        height,
    })
}

const MAGENTA: [u8; 4] = [0xff, 0x00, 0xff, 0xff];
const BLACK: [u8; 4] = [0x00, 0x00, 0x00, 0xff];

pub(crate) fn create_default_color_map<D: GraphicsDevice>(
    device: &mut D,
) -> DeviceResult<TextureHandle> {
    let texels = [MAGENTA, BLACK, BLACK, MAGENTA];
    create_texture_map(
        device,
        bytemuck::cast_slice(&texels[..]),
        2,
        2,
        Format::R8G8B8A8Unorm,
        false,
    )
}

/// Flat normal map. Tangent-space normals face along -z.
pub(crate) fn create_default_normal_map<D: GraphicsDevice>(
    device: &mut D,
) -> DeviceResult<TextureHandle> {
    let flat = [0.0, 0.0, -1.0, 1.0].map(f16::from_f32);
    let texels = [flat; 4];
    create_texture_map(
        device,
        bytemuck::cast_slice(&texels[..]),
        2,
        2,
        Format::R16G16B16A16Sfloat,
        false,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::RecordingDevice;

    #[test]
    fn vertex_buffer_holds_uploaded_vertices() {
        let mut device = RecordingDevice::new();
        let vertices = [Vertex3D {
            position: [1.0, 2.0, 3.0],
            normal: [0.0, 0.0, -1.0],
            tangent: [1.0, 0.0, 0.0, 1.0],
            uv: [0.5, 0.5],
        }];
        let buffer = create_vertex_buffer(&mut device, &vertices).unwrap();

        assert_eq!(
            device.buffer_contents(buffer),
            Some(bytemuck::cast_slice::<Vertex3D, u8>(&vertices[..]))
        );
        assert!(device
            .buffer_usage(buffer)
            .is_some_and(|usage| usage.contains(BufferUsages::VERTEX)));
    }

    #[test]
    #[should_panic(expected = "at least one index")]
    fn empty_index_buffer_panics() {
        let mut device = RecordingDevice::new();
        let _ = create_index_buffer(&mut device, &[]);
    }

    #[test]
    #[should_panic(expected = "width must be non-zero")]
    fn zero_width_texture_panics() {
        let mut device = RecordingDevice::new();
        let _ = create_texture_map(&mut device, &[0; 16], 0, 2, Format::R8G8B8A8Unorm, false);
    }

    #[test]
    fn texture_map_uploads_for_shader_reads() {
        let mut device = RecordingDevice::new();
        let pixels = [7u8; 16];
        let texture =
            create_texture_map(&mut device, &pixels, 2, 2, Format::R8G8B8A8Unorm, true).unwrap();

        assert_eq!(device.texture_contents(texture), Some(&pixels[..]));
        assert_eq!(device.texture_layout(texture), Some(ImageLayout::ShaderReadOnly));
    }

    #[test]
    fn render_target_pairs_color_and_depth() {
        let mut device = RecordingDevice::new();
        let target = create_render_target(&mut device, 640, 480).unwrap();

        assert_eq!(device.texture_format(target.color), Some(TARGET_COLOR_FORMAT));
        assert_eq!(device.texture_format(target.depth), Some(TARGET_DEPTH_FORMAT));
        assert_eq!(device.texture_size(target.depth), Some((640, 480)));

        target.destroy(&mut device);
        assert_eq!(device.live_texture_count(), 0);
    }

    #[test]
    fn default_maps_are_two_by_two() {
        let mut device = RecordingDevice::new();
        let color = create_default_color_map(&mut device).unwrap();
        let normal = create_default_normal_map(&mut device).unwrap();

        let color_data = device.texture_contents(color).unwrap();
        assert_eq!(&color_data[..4], &MAGENTA);
        assert_eq!(&color_data[4..8], &BLACK);

        let normal_data: Vec<f16> =
            bytemuck::pod_collect_to_vec(device.texture_contents(normal).unwrap());
        assert_eq!(normal_data.len(), 16);
        assert_eq!(normal_data[2].to_f32(), -1.0);
    }
}
