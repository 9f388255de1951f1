use bytemuck::{Pod, Zeroable};

use super::transform::Transform3D;
use crate::device::{BufferHandle, TextureHandle};

/// GPU resources that make up one drawable model. The caller owns them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Model3D {
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    /// `None` draws with the renderer's default checkerboard.
    pub color_map: Option<TextureHandle>,
    /// `None` draws with the renderer's default flat normal map.
    pub normal_map: Option<TextureHandle>,
}

impl Model3D {
    pub fn new(vertex_buffer: BufferHandle, index_buffer: BufferHandle) -> Self {
        Self {
            vertex_buffer,
            index_buffer,
            color_map: None,
            normal_map: None,
        }
    }

    pub fn with_color_map(mut self, color_map: TextureHandle) -> Self {
        self.color_map = Some(color_map);
        self
    }

    pub fn with_normal_map(mut self, normal_map: TextureHandle) -> Self {
        self.normal_map = Some(normal_map);
        self
    }
}

/// Per-draw data pushed to the model shader.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct ModelPush {
    pub model: [[f32; 4]; 4],
}

/// A queued draw: the model's handles plus its model matrix at queue time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelTicket {
    pub model: Model3D,
    pub push: ModelPush,
}

impl ModelTicket {
    pub fn new(model: &Model3D, transform: &Transform3D) -> Self {
        Self {
            model: *model,
            push: ModelPush {
                model: transform.matrix().to_cols_array_2d(),
            },
        }
    }
}

/// Growable FIFO of draw tickets, doubling when full.
pub struct ModelQueue {
    tickets: Vec<ModelTicket>,
    capacity: u32,
}

impl ModelQueue {
    pub fn new(capacity: u32) -> Self {
        let capacity = capacity.max(1);
        Self {
            tickets: Vec::with_capacity(capacity as usize),
            capacity,
        }
    }

    pub fn push(&mut self, ticket: ModelTicket) {
        if self.tickets.len() == self.capacity as usize {
            let new_capacity = self.capacity * 2;
            log::debug!(
                "Growing model queue: {} -> {}",
                self.capacity,
                new_capacity
            );
            self.tickets
                .reserve_exact(new_capacity as usize - self.tickets.len());
            self.capacity = new_capacity;
        }
        self.tickets.push(ticket);
    }

    pub fn clear(&mut self) {
        self.tickets.clear();
    }

    pub fn tickets(&self) -> &[ModelTicket] {
        &self.tickets
    }

    pub fn len(&self) -> u32 {
        self.tickets.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Handle;
    use glam::{Mat4, Vec3};

    fn model() -> Model3D {
        Model3D::new(Handle::new(0), Handle::new(1))
    }

    #[test]
    fn model_push_is_one_matrix() {
        assert_eq!(std::mem::size_of::<ModelPush>(), 64);
    }

    #[test]
    fn ticket_bakes_matrix_at_queue_time() {
        let mut transform = Transform3D::from_position(Vec3::new(1.0, 0.0, 0.0));
        let ticket = ModelTicket::new(&model(), &transform);

        transform.position = Vec3::new(9.0, 9.0, 9.0);

        let baked = Mat4::from_cols_array_2d(&ticket.push.model);
        assert!(baked.abs_diff_eq(Mat4::from_translation(Vec3::X), 1e-6));
    }

    #[test]
    fn queue_doubles_and_keeps_order() {
        let mut queue = ModelQueue::new(2);
        for i in 0..5 {
            let transform = Transform3D::from_position(Vec3::splat(i as f32));
            queue.push(ModelTicket::new(&model(), &transform));
        }

        assert_eq!(queue.capacity(), 8);
        assert_eq!(queue.len(), 5);
        for (i, ticket) in queue.tickets().iter().enumerate() {
            assert_eq!(ticket.push.model[3][0], i as f32);
        }
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut queue = ModelQueue::new(1);
        queue.push(ModelTicket::new(&model(), &Transform3D::default()));
        queue.push(ModelTicket::new(&model(), &Transform3D::default()));
        queue.clear();

        assert!(queue.is_empty());
        assert_eq!(queue.capacity(), 2);
    }
}
