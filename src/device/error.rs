use thiserror::Error;

/// Failures reported by a [`GraphicsDevice`](super::GraphicsDevice).
///
/// None of these are retried by the renderer; callers are expected to treat
/// them as fatal for the current device.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("{kind} handle #{index} does not refer to a live resource")]
    InvalidHandle { kind: &'static str, index: usize },

    #[error("access of {len} bytes at offset {offset} exceeds buffer size {size}")]
    OutOfRange { offset: u64, len: u64, size: u64 },

    #[error("texture upload of {len} bytes does not match expected {expected} bytes")]
    TextureSizeMismatch { len: u64, expected: u64 },

    #[error("no render pass is active")]
    NoActivePass,

    #[error("a render pass is already active")]
    PassAlreadyActive,

    #[error("no shader is bound")]
    NoShaderBound,

    #[error("descriptor set {set} is not declared by the bound shader")]
    UnknownDescriptorSet { set: u32 },

    #[error("descriptors bound to set {set} do not match its layout")]
    DescriptorMismatch { set: u32 },

    #[error("push constant of {len} bytes exceeds declared size {size}")]
    PushConstantTooLarge { len: usize, size: u32 },

    #[error("format {0:?} is not supported here")]
    UnsupportedFormat(crate::device::Format),

    #[error("failed to find a suitable adapter: {0}")]
    Adapter(String),

    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

pub type DeviceResult<T> = Result<T, DeviceError>;
