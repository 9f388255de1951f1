//! Headless device that keeps every resource in host memory and logs every call.

use std::collections::HashMap;

use super::handle::{BufferHandle, HandleAllocator, ShaderHandle, TextureHandle};
use super::types::*;
use super::{DeviceError, DeviceResult, GraphicsDevice};

/// Owned copy of a [`Descriptor`] as it was bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedDescriptor {
    UniformBuffer(Vec<BufferHandle>),
    StorageBuffer(Vec<BufferHandle>),
    SampledTexture(Vec<TextureHandle>),
}

impl From<&Descriptor<'_>> for RecordedDescriptor {
    fn from(desc: &Descriptor<'_>) -> Self {
        match desc {
            Descriptor::UniformBuffer(buffers) => Self::UniformBuffer(buffers.to_vec()),
            Descriptor::StorageBuffer(buffers) => Self::StorageBuffer(buffers.to_vec()),
            Descriptor::SampledTexture(textures) => Self::SampledTexture(textures.to_vec()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateBuffer {
        buffer: BufferHandle,
        size: u64,
        usage: BufferUsages,
    },
    WriteBuffer {
        buffer: BufferHandle,
        offset: u64,
        len: u64,
    },
    DestroyBuffer(BufferHandle),
    CreateTexture {
        texture: TextureHandle,
        width: u32,
        height: u32,
        format: Format,
    },
    WriteTexture {
        texture: TextureHandle,
        len: u64,
        layout: ImageLayout,
    },
    DestroyTexture(TextureHandle),
    CreateShader(ShaderHandle),
    DestroyShader(ShaderHandle),
    BeginRenderPass(RenderPassDescriptor),
    BindShader(ShaderHandle),
    BindDescriptorSet {
        set: u32,
        descriptors: Vec<RecordedDescriptor>,
    },
    PushConstant(Vec<u8>),
    Draw {
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        first_index: u32,
    },
    EndRenderPass,
    WaitIdle,
}

#[derive(Debug)]
struct BufferState {
    usage: BufferUsages,
    data: Vec<u8>,
}

#[derive(Debug)]
struct TextureState {
    width: u32,
    height: u32,
    format: Format,
    expected_len: u64,
    data: Vec<u8>,
    layout: Option<ImageLayout>,
}

#[derive(Debug)]
struct ShaderState {
    sets: Vec<Vec<DescriptorSetBinding>>,
    push_constant_size: u32,
}

/// A [`GraphicsDevice`] with no GPU behind it.
///
/// Resources live in host memory, every handle and byte range is checked, and
/// each call is appended to [`commands`](Self::commands) so frame submission
/// can be inspected after the fact.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    handles: HandleAllocator,
    buffers: HashMap<BufferHandle, BufferState>,
    textures: HashMap<TextureHandle, TextureState>,
    shaders: HashMap<ShaderHandle, ShaderState>,
    in_pass: bool,
    bound_shader: Option<ShaderHandle>,
    commands: Vec<Command>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Drops the command log; resources are untouched.
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|state| state.data.as_slice())
    }

    pub fn buffer_usage(&self, buffer: BufferHandle) -> Option<BufferUsages> {
        self.buffers.get(&buffer).map(|state| state.usage)
    }

    pub fn texture_contents(&self, texture: TextureHandle) -> Option<&[u8]> {
        self.textures.get(&texture).map(|state| state.data.as_slice())
    }

    pub fn texture_size(&self, texture: TextureHandle) -> Option<(u32, u32)> {
        self.textures
            .get(&texture)
            .map(|state| (state.width, state.height))
    }

    pub fn texture_format(&self, texture: TextureHandle) -> Option<Format> {
        self.textures.get(&texture).map(|state| state.format)
    }

    pub fn texture_layout(&self, texture: TextureHandle) -> Option<ImageLayout> {
        self.textures.get(&texture).and_then(|state| state.layout)
    }

    pub fn is_live_buffer(&self, buffer: BufferHandle) -> bool {
        self.buffers.contains_key(&buffer)
    }

    pub fn is_live_texture(&self, texture: TextureHandle) -> bool {
        self.textures.contains_key(&texture)
    }

    pub fn is_live_shader(&self, shader: ShaderHandle) -> bool {
        self.shaders.contains_key(&shader)
    }

    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn live_shader_count(&self) -> usize {
        self.shaders.len()
    }

    pub fn in_renderpass(&self) -> bool {
        self.in_pass
    }

    fn buffer(&self, buffer: BufferHandle) -> DeviceResult<&BufferState> {
        self.buffers.get(&buffer).ok_or(DeviceError::InvalidHandle {
            kind: "buffer",
            index: buffer.index(),
        })
    }

    fn check_texture(&self, texture: TextureHandle) -> DeviceResult<()> {
        if self.textures.contains_key(&texture) {
            Ok(())
        } else {
            Err(DeviceError::InvalidHandle {
                kind: "texture",
                index: texture.index(),
            })
        }
    }

    fn require_pass(&self) -> DeviceResult<()> {
        if self.in_pass {
            Ok(())
        } else {
            Err(DeviceError::NoActivePass)
        }
    }

    fn bound_shader(&self) -> DeviceResult<&ShaderState> {
        self.bound_shader
            .and_then(|shader| self.shaders.get(&shader))
            .ok_or(DeviceError::NoShaderBound)
    }
}

fn check_range(offset: u64, len: u64, size: u64) -> DeviceResult<()> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(DeviceError::OutOfRange { offset, len, size }),
    }
}

impl GraphicsDevice for RecordingDevice {
    fn create_buffer(&mut self, desc: &BufferDescriptor<'_>) -> DeviceResult<BufferHandle> {
        let buffer = self.handles.allocate();
        self.buffers.insert(
            buffer,
            BufferState {
                usage: desc.usage,
                data: vec![0; desc.size as usize],
            },
        );
        self.commands.push(Command::CreateBuffer {
            buffer,
            size: desc.size,
            usage: desc.usage,
        });
        Ok(buffer)
    }

    fn write_buffer(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> DeviceResult<()> {
        let size = self.buffer(buffer)?.data.len() as u64;
        let len = data.len() as u64;
        check_range(offset, len, size)?;

        if let Some(state) = self.buffers.get_mut(&buffer) {
            let start = offset as usize;
            state.data[start..start + data.len()].copy_from_slice(data);
        }
        self.commands.push(Command::WriteBuffer {
            buffer,
            offset,
            len,
        });
        Ok(())
    }

    fn read_buffer(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        dst: &mut [u8],
    ) -> DeviceResult<()> {
        let state = self.buffer(buffer)?;
        check_range(offset, dst.len() as u64, state.data.len() as u64)?;
        let start = offset as usize;
        dst.copy_from_slice(&state.data[start..start + dst.len()]);
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(&buffer).is_some() {
            self.commands.push(Command::DestroyBuffer(buffer));
        } else {
            log::warn!("Destroying unknown buffer {buffer:?}");
        }
    }

    fn create_texture(&mut self, desc: &TextureDescriptor<'_>) -> DeviceResult<TextureHandle> {
        let texture = self.handles.allocate();
        self.textures.insert(
            texture,
            TextureState {
                width: desc.width,
                height: desc.height,
                format: desc.format,
                expected_len: desc.byte_size(),
                data: Vec::new(),
                layout: None,
            },
        );
        self.commands.push(Command::CreateTexture {
            texture,
            width: desc.width,
            height: desc.height,
            format: desc.format,
        });
        Ok(texture)
    }

    fn write_texture(
        &mut self,
        texture: TextureHandle,
        data: &[u8],
        layout: ImageLayout,
    ) -> DeviceResult<()> {
        let state = self
            .textures
            .get_mut(&texture)
            .ok_or(DeviceError::InvalidHandle {
                kind: "texture",
                index: texture.index(),
            })?;
        let len = data.len() as u64;
        if len != state.expected_len {
            return Err(DeviceError::TextureSizeMismatch {
                len,
                expected: state.expected_len,
            });
        }
        state.data = data.to_vec();
        state.layout = Some(layout);
        self.commands.push(Command::WriteTexture {
            texture,
            len,
            layout,
        });
        Ok(())
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture).is_some() {
            self.commands.push(Command::DestroyTexture(texture));
        } else {
            log::warn!("Destroying unknown texture {texture:?}");
        }
    }

    fn create_shader(&mut self, desc: &ShaderDescriptor<'_>) -> DeviceResult<ShaderHandle> {
        let shader = self.handles.allocate();
        self.shaders.insert(
            shader,
            ShaderState {
                sets: desc
                    .descriptor_sets
                    .iter()
                    .map(|set| set.bindings.to_vec())
                    .collect(),
                push_constant_size: desc.push_constant_size,
            },
        );
        self.commands.push(Command::CreateShader(shader));
        Ok(shader)
    }

    fn destroy_shader(&mut self, shader: ShaderHandle) {
        if self.shaders.remove(&shader).is_some() {
            if self.bound_shader == Some(shader) {
                self.bound_shader = None;
            }
            self.commands.push(Command::DestroyShader(shader));
        }
    }

    fn begin_renderpass(&mut self, desc: &RenderPassDescriptor) -> DeviceResult<()> {
        if self.in_pass {
            return Err(DeviceError::PassAlreadyActive);
        }
        self.check_texture(desc.target)?;
        if let Some(depth) = desc.depth {
            self.check_texture(depth)?;
        }
        self.in_pass = true;
        self.bound_shader = None;
        self.commands.push(Command::BeginRenderPass(*desc));
        Ok(())
    }

    fn end_renderpass(&mut self) -> DeviceResult<()> {
        self.require_pass()?;
        self.in_pass = false;
        self.commands.push(Command::EndRenderPass);
        Ok(())
    }

    fn bind_shader(&mut self, shader: ShaderHandle) -> DeviceResult<()> {
        self.require_pass()?;
        if !self.shaders.contains_key(&shader) {
            return Err(DeviceError::InvalidHandle {
                kind: "shader",
                index: shader.index(),
            });
        }
        self.bound_shader = Some(shader);
        self.commands.push(Command::BindShader(shader));
        Ok(())
    }

    fn bind_descriptor_set(
        &mut self,
        set: u32,
        descriptors: &[Descriptor<'_>],
    ) -> DeviceResult<()> {
        self.require_pass()?;
        let layout = self
            .bound_shader()?
            .sets
            .get(set as usize)
            .ok_or(DeviceError::UnknownDescriptorSet { set })?;

        let matches_layout = layout.len() == descriptors.len()
            && layout
                .iter()
                .zip(descriptors)
                .all(|(binding, desc)| binding.ty == desc.ty() && binding.count as usize == desc.count());
        if !matches_layout {
            return Err(DeviceError::DescriptorMismatch { set });
        }

        for desc in descriptors {
            match desc {
                Descriptor::UniformBuffer(buffers) | Descriptor::StorageBuffer(buffers) => {
                    for &buffer in *buffers {
                        self.buffer(buffer)?;
                    }
                }
                Descriptor::SampledTexture(textures) => {
                    for &texture in *textures {
                        self.check_texture(texture)?;
                    }
                }
            }
        }

        self.commands.push(Command::BindDescriptorSet {
            set,
            descriptors: descriptors.iter().map(RecordedDescriptor::from).collect(),
        });
        Ok(())
    }

    fn bind_push_constant(&mut self, data: &[u8]) -> DeviceResult<()> {
        self.require_pass()?;
        let size = self.bound_shader()?.push_constant_size;
        if data.len() > size as usize {
            return Err(DeviceError::PushConstantTooLarge {
                len: data.len(),
                size,
            });
        }
        self.commands.push(Command::PushConstant(data.to_vec()));
        Ok(())
    }

    fn draw(
        &mut self,
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        first_index: u32,
    ) -> DeviceResult<()> {
        self.require_pass()?;
        self.bound_shader()?;
        self.buffer(vertex_buffer)?;
        let index_bytes = self.buffer(index_buffer)?.data.len() as u64;
        check_range(u64::from(first_index) * 4, 0, index_bytes)?;

        self.commands.push(Command::Draw {
            vertex_buffer,
            index_buffer,
            first_index,
        });
        Ok(())
    }

    fn wait_idle(&mut self) {
        self.commands.push(Command::WaitIdle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(device: &mut RecordingDevice, size: u64) -> BufferHandle {
        device
            .create_buffer(&BufferDescriptor {
                label: None,
                size,
                usage: BufferUsages::STORAGE | BufferUsages::READ_WRITE_DST,
            })
            .unwrap()
    }

    #[test]
    fn writes_land_at_offset_and_read_back() {
        let mut device = RecordingDevice::new();
        let buffer = storage(&mut device, 8);
        device.write_buffer(buffer, 4, &[1, 2, 3, 4]).unwrap();

        let mut out = [0u8; 8];
        device.read_buffer(buffer, 0, &mut out).unwrap();
        assert_eq!(out, [0, 0, 0, 0, 1, 2, 3, 4]);
    }

    #[test]
    fn out_of_range_write_is_rejected() {
        let mut device = RecordingDevice::new();
        let buffer = storage(&mut device, 4);
        let err = device.write_buffer(buffer, 2, &[0; 4]).unwrap_err();
        assert!(matches!(err, DeviceError::OutOfRange { offset: 2, len: 4, size: 4 }));
    }

    #[test]
    fn destroyed_buffer_handle_stays_invalid() {
        let mut device = RecordingDevice::new();
        let old = storage(&mut device, 4);
        device.destroy_buffer(old);
        let new = storage(&mut device, 4);

        assert_ne!(old, new);
        assert!(device.write_buffer(old, 0, &[0]).is_err());
        assert!(device.write_buffer(new, 0, &[0]).is_ok());
    }

    #[test]
    fn commands_outside_a_pass_are_rejected() {
        let mut device = RecordingDevice::new();
        let buffer = storage(&mut device, 4);
        assert!(matches!(
            device.draw(buffer, buffer, 0),
            Err(DeviceError::NoActivePass)
        ));
        assert!(matches!(device.end_renderpass(), Err(DeviceError::NoActivePass)));
    }

    #[test]
    fn texture_upload_must_fill_the_texture() {
        let mut device = RecordingDevice::new();
        let texture = device
            .create_texture(&TextureDescriptor {
                label: None,
                width: 2,
                height: 2,
                depth: 1,
                format: Format::R8G8B8A8Unorm,
                aspect: TextureAspect::Color,
                usage: TextureUsages::SAMPLED | TextureUsages::TRANSFER_DST,
                mip_levels: 1,
                array_layers: 1,
                edge_mode: EdgeMode::Repeat,
                bilinear_filter: false,
            })
            .unwrap();

        assert!(device
            .write_texture(texture, &[0; 8], ImageLayout::ShaderReadOnly)
            .is_err());
        device
            .write_texture(texture, &[7; 16], ImageLayout::ShaderReadOnly)
            .unwrap();
        assert_eq!(device.texture_contents(texture), Some(&[7u8; 16][..]));
        assert_eq!(
            device.texture_layout(texture),
            Some(ImageLayout::ShaderReadOnly)
        );
    }
}
