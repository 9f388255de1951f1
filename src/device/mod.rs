//! Low-level graphics device layer: typed handles, resource descriptors and
//! the command-recording interface the renderer is written against.

pub mod error;
pub mod handle;
pub mod recording;
pub mod types;
pub mod wgpu_backend;

pub use error::{DeviceError, DeviceResult};
pub use handle::{BufferHandle, Handle, ShaderHandle, TextureHandle};
pub use recording::{Command, RecordedDescriptor, RecordingDevice};
pub use types::*;
pub use wgpu_backend::{FrameStatus, WgpuDevice};

/// Resource creation and command recording, single-threaded.
///
/// Creation and writes are synchronous: a handle returned from a `create_*`
/// call (and any data written to it) is usable by the next recorded command.
pub trait GraphicsDevice {
    fn create_buffer(&mut self, desc: &BufferDescriptor<'_>) -> DeviceResult<BufferHandle>;
    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8])
        -> DeviceResult<()>;
    fn read_buffer(&mut self, buffer: BufferHandle, offset: u64, dst: &mut [u8])
        -> DeviceResult<()>;
    fn destroy_buffer(&mut self, buffer: BufferHandle);

    fn create_texture(&mut self, desc: &TextureDescriptor<'_>) -> DeviceResult<TextureHandle>;
    /// Uploads mip 0 in full and transitions the texture to `layout`.
    fn write_texture(
        &mut self,
        texture: TextureHandle,
        data: &[u8],
        layout: ImageLayout,
    ) -> DeviceResult<()>;
    fn destroy_texture(&mut self, texture: TextureHandle);

    fn create_shader(&mut self, desc: &ShaderDescriptor<'_>) -> DeviceResult<ShaderHandle>;
    fn destroy_shader(&mut self, shader: ShaderHandle);

    fn begin_renderpass(&mut self, desc: &RenderPassDescriptor) -> DeviceResult<()>;
    fn end_renderpass(&mut self) -> DeviceResult<()>;
    fn bind_shader(&mut self, shader: ShaderHandle) -> DeviceResult<()>;
    fn bind_descriptor_set(&mut self, set: u32, descriptors: &[Descriptor<'_>])
        -> DeviceResult<()>;
    fn bind_push_constant(&mut self, data: &[u8]) -> DeviceResult<()>;
    /// Indexed draw of every index in `index_buffer` from `first_index` on.
    fn draw(
        &mut self,
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        first_index: u32,
    ) -> DeviceResult<()>;

    /// Blocks until all submitted work has finished. Only needed at shutdown.
    fn wait_idle(&mut self);
}
