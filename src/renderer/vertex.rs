use bytemuck::{Pod, Zeroable};
use std::mem;

use crate::device::{Format, VertexAttribute, VertexBinding};

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct Vertex3D {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    /// `w` carries the bitangent handedness.
    pub tangent: [f32; 4],
    pub uv: [f32; 2],
}

impl Vertex3D {
    pub const ATTRIBUTES: [VertexAttribute; 4] = [
        VertexAttribute {
            format: Format::R32G32B32Sfloat,
            offset: mem::offset_of!(Vertex3D, position) as u32,
        },
        VertexAttribute {
            format: Format::R32G32B32Sfloat,
            offset: mem::offset_of!(Vertex3D, normal) as u32,
        },
        VertexAttribute {
            format: Format::R32G32B32A32Sfloat,
            offset: mem::offset_of!(Vertex3D, tangent) as u32,
        },
        VertexAttribute {
            format: Format::R32G32Sfloat,
            offset: mem::offset_of!(Vertex3D, uv) as u32,
        },
    ];

    pub fn binding() -> VertexBinding<'static> {
        VertexBinding {
            stride: mem::size_of::<Vertex3D>() as u32,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_stride_matches_struct_size() {
        assert_eq!(Vertex3D::binding().stride, 48);
        assert_eq!(
            Vertex3D::binding().stride as usize,
            std::mem::size_of::<Vertex3D>()
        );
    }

    #[test]
    fn attribute_offsets_follow_field_order() {
        let offsets: Vec<u32> = Vertex3D::ATTRIBUTES.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24, 40]);
    }
}
