pub mod camera;
pub mod factory;
pub mod lights;
pub mod pipeline;
pub mod queue;
#[allow(clippy::module_inception)]
pub mod renderer;
pub mod transform;
pub mod vertex;

pub use camera::{move_first_person, projection_matrix, view_matrix, WorldUniform};
pub use factory::{
    create_index_buffer, create_render_target, create_texture_map, create_vertex_buffer,
    RenderTarget,
};
pub use lights::{DirectionalLight, LightBatch, PointLight};
pub use queue::{Model3D, ModelPush, ModelQueue, ModelTicket};
pub use renderer::Renderer3D;
pub use transform::Transform3D;
pub use vertex::Vertex3D;
