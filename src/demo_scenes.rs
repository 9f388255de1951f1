use std::f32::consts::TAU;

use glam::Vec3;

use crate::device::{BufferHandle, DeviceResult, Format, GraphicsDevice, TextureHandle};
use crate::renderer::{
    create_index_buffer, create_texture_map, create_vertex_buffer, Model3D, Renderer3D,
    Transform3D, Vertex3D,
};

const QUAD_NORMAL: [f32; 3] = [0.0, 0.0, -1.0];
const QUAD_TANGENT: [f32; 4] = [1.0, 0.0, 0.0, 1.0];

const QUAD_VERTICES: [Vertex3D; 4] = [
    Vertex3D {
        position: [-0.5, -0.5, 0.0],
        normal: QUAD_NORMAL,
        tangent: QUAD_TANGENT,
        uv: [0.0, 0.0],
    },
    Vertex3D {
        position: [-0.5, 0.5, 0.0],
        normal: QUAD_NORMAL,
        tangent: QUAD_TANGENT,
        uv: [0.0, 1.0],
    },
    Vertex3D {
        position: [0.5, 0.5, 0.0],
        normal: QUAD_NORMAL,
        tangent: QUAD_TANGENT,
        uv: [1.0, 1.0],
    },
    Vertex3D {
        position: [0.5, -0.5, 0.0],
        normal: QUAD_NORMAL,
        tangent: QUAD_TANGENT,
        uv: [1.0, 0.0],
    },
];

// Counter-clockwise when seen from -z.
const QUAD_INDICES: [u32; 6] = [0, 2, 1, 2, 0, 3];

// Blue, green, red, yellow.
const QUAD_TEXELS: [u8; 16] = [
    0x00, 0x00, 0xff, 0xff, //
    0x00, 0xff, 0x00, 0xff, //
    0xff, 0x00, 0x00, 0xff, //
    0xff, 0xff, 0x00, 0xff, //
];

const ORBIT_SPEED: f32 = 2.0;

/// Two textured quads lit by a fixed directional light and an orbiting point light.
pub struct QuadScene {
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
    color_map: TextureHandle,
    time: f32,
}

impl QuadScene {
    pub fn new<D: GraphicsDevice>(device: &mut D) -> DeviceResult<Self> {
        let vertex_buffer = create_vertex_buffer(device, &QUAD_VERTICES)?;
        let index_buffer = create_index_buffer(device, &QUAD_INDICES)?;
        let color_map = create_texture_map(device, &QUAD_TEXELS, 2, 2, Format::R8G8B8A8Unorm, false)?;

        Ok(Self {
            vertex_buffer,
            index_buffer,
            color_map,
            time: 0.0,
        })
    }

    pub fn advance(&mut self, dt: f32) {
        self.time += dt * ORBIT_SPEED;
        if self.time > TAU {
            self.time -= TAU;
        }
    }

    pub fn model(&self) -> Model3D {
        Model3D::new(self.vertex_buffer, self.index_buffer).with_color_map(self.color_map)
    }

    pub fn queue<D: GraphicsDevice>(&self, renderer: &mut Renderer3D<D>) -> DeviceResult<()> {
        renderer.queue_directional_light(Vec3::ONE, Vec3::new(1.0, 0.3, 0.1), 0.5)?;
        renderer.queue_point_light(
            Vec3::new(self.time.cos() * 3.0, 1.0, -self.time.sin()),
            Vec3::ONE,
            5.0,
        )?;

        let model = self.model();
        renderer.queue_model(&model, &Transform3D::from_position(Vec3::new(-0.2, 0.0, -0.2)));
        renderer.queue_model(&model, &Transform3D::from_position(Vec3::new(0.2, 0.0, 0.2)));
        Ok(())
    }

    pub fn destroy<D: GraphicsDevice>(self, device: &mut D) {
        device.destroy_texture(self.color_map);
        device.destroy_buffer(self.index_buffer);
        device.destroy_buffer(self.vertex_buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Command, RecordingDevice};
    use crate::settings::RenderSettings;

    #[test]
    fn quad_winds_counter_clockwise_from_camera_side() {
        for tri in QUAD_INDICES.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| {
                let p = QUAD_VERTICES[i as usize].position;
                glam::Vec2::new(p[0], p[1])
            });
            assert!((b - a).perp_dot(c - a) > 0.0);
        }
    }

    #[test]
    fn queues_one_frame_of_lights_and_models() {
        let mut renderer =
            Renderer3D::new(RecordingDevice::new(), &RenderSettings::default()).unwrap();
        let scene = QuadScene::new(renderer.device_mut()).unwrap();

        scene.queue(&mut renderer).unwrap();

        assert_eq!(renderer.directional_lights().len(), 1);
        assert_eq!(renderer.point_lights().len(), 1);
        assert_eq!(renderer.models().len(), 2);

        scene.destroy(renderer.device_mut());
        assert!(renderer
            .device()
            .commands()
            .iter()
            .any(|command| matches!(command, Command::DestroyTexture(_))));
    }

    #[test]
    fn orbit_wraps_after_full_turn() {
        let mut device = RecordingDevice::new();
        let mut scene = QuadScene::new(&mut device).unwrap();
        scene.advance(TAU / ORBIT_SPEED + 0.5);
        assert!(scene.time >= 0.0 && scene.time <= TAU);
    }
}
