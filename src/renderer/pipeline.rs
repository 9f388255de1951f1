use std::mem;

use super::factory::{TARGET_COLOR_FORMAT, TARGET_DEPTH_FORMAT};
use super::queue::ModelPush;
use super::vertex::Vertex3D;
use crate::device::{
    CullMode, DescriptorSetBinding, DescriptorSetLayout, DescriptorType, DeviceResult,
    GraphicsDevice, PrimitiveTopology, ShaderDescriptor, ShaderHandle,
};

const MODEL_SHADER: &str = include_str!("shaders/model.wgsl");

pub const WORLD_SET: u32 = 0;
pub const OBJECT_SET: u32 = 1;

/// Camera uniform, then directional and point light storage.
pub const WORLD_SET_BINDINGS: [DescriptorSetBinding; 3] = [
    DescriptorSetBinding {
        ty: DescriptorType::UniformBuffer,
        count: 1,
    },
    DescriptorSetBinding {
        ty: DescriptorType::StorageBuffer,
        count: 1,
    },
    DescriptorSetBinding {
        ty: DescriptorType::StorageBuffer,
        count: 1,
    },
];

/// Color map, then normal map.
pub const OBJECT_SET_BINDINGS: [DescriptorSetBinding; 1] = [DescriptorSetBinding {
    ty: DescriptorType::SampledTexture,
    count: 2,
}];

pub(crate) fn create_model_shader<D: GraphicsDevice>(device: &mut D) -> DeviceResult<ShaderHandle> {
    let vertex_bindings = [Vertex3D::binding()];
    let descriptor_sets = [
        DescriptorSetLayout {
            bindings: &WORLD_SET_BINDINGS,
        },
        DescriptorSetLayout {
            bindings: &OBJECT_SET_BINDINGS,
        },
    ];

    device.create_shader(&ShaderDescriptor {
        label: Some("ModelShader"),
        vertex_source: MODEL_SHADER,
        fragment_source: MODEL_SHADER,
        color_format: TARGET_COLOR_FORMAT,
        depth_format: Some(TARGET_DEPTH_FORMAT),
        vertex_bindings: &vertex_bindings,
        descriptor_sets: &descriptor_sets,
        push_constant_size: mem::size_of::<ModelPush>() as u32,
        topology: PrimitiveTopology::TriangleList,
        cull_mode: CullMode::Back,
        enable_depth_buffer: true,
        enable_color_blend: false,
    })
}
