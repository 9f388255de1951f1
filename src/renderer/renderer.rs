use bytemuck::Zeroable;
use glam::{Quat, Vec3};

use super::camera::{projection_matrix, view_matrix, WorldUniform};
use super::factory::{create_default_color_map, create_default_normal_map};
use super::lights::{DirectionalLight, LightBatch, PointLight};
use super::pipeline::{create_model_shader, OBJECT_SET, WORLD_SET};
use super::queue::{Model3D, ModelQueue, ModelTicket};
use super::transform::Transform3D;
use crate::device::{
    BufferDescriptor, BufferHandle, BufferUsages, Descriptor, DeviceResult, GraphicsDevice,
    RenderPassDescriptor, ShaderHandle, TextureHandle,
};
use crate::settings::RenderSettings;

/// Forward renderer that batches one frame of lights and models and draws
/// them in a single renderpass.
///
/// Lights and models are queued between calls to [`draw`](Self::draw); each
/// `draw` submits everything queued since the previous one, in queue order,
/// and then empties the queues. Queue capacities only ever grow.
pub struct Renderer3D<D: GraphicsDevice> {
    device: D,
    shader: ShaderHandle,
    world_buffer: BufferHandle,
    dir_lights: LightBatch<DirectionalLight>,
    point_lights: LightBatch<PointLight>,
    models: ModelQueue,
    default_color_map: TextureHandle,
    default_normal_map: TextureHandle,
    clear_color: [f32; 4],
}

impl<D: GraphicsDevice> Renderer3D<D> {
    pub fn new(mut device: D, settings: &RenderSettings) -> DeviceResult<Self> {
        let shader = create_model_shader(&mut device)?;

        let world_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("WorldBuffer"),
            size: WorldUniform::SIZE,
            usage: BufferUsages::UNIFORM | BufferUsages::READ_WRITE_DST,
        })?;
        device.write_buffer(world_buffer, 0, bytemuck::bytes_of(&WorldUniform::new()))?;

        let dir_lights = LightBatch::new(
            &mut device,
            "DirLightBuffer",
            settings.directional_light_capacity,
        )?;
        let point_lights = LightBatch::new(
            &mut device,
            "PointLightBuffer",
            settings.point_light_capacity,
        )?;
        let models = ModelQueue::new(settings.model_capacity);

        let default_color_map = create_default_color_map(&mut device)?;
        let default_normal_map = create_default_normal_map(&mut device)?;

        log::info!(
            "3D renderer initialized (lights: {} directional, {} point; models: {})",
            dir_lights.capacity(),
            point_lights.capacity(),
            models.capacity()
        );

        Ok(Self {
            device,
            shader,
            world_buffer,
            dir_lights,
            point_lights,
            models,
            default_color_map,
            default_normal_map,
            clear_color: settings.clear_color,
        })
    }

    /// Waits for the device to go idle, releases every renderer-owned
    /// resource and hands the device back.
    pub fn shutdown(self) -> D {
        let Self {
            mut device,
            shader,
            world_buffer,
            dir_lights,
            point_lights,
            default_color_map,
            default_normal_map,
            ..
        } = self;

        device.wait_idle();
        device.destroy_texture(default_normal_map);
        device.destroy_texture(default_color_map);
        point_lights.destroy(&mut device);
        dir_lights.destroy(&mut device);
        device.destroy_buffer(world_buffer);
        device.destroy_shader(shader);

        log::info!("3D renderer shut down");
        device
    }

    /// Rewrites the projection matrix. `fov` is the vertical angle in radians.
    pub fn update_projection(
        &mut self,
        fov: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> DeviceResult<()> {
        let proj = projection_matrix(fov, aspect, near, far).to_cols_array_2d();
        self.device.write_buffer(
            self.world_buffer,
            WorldUniform::PROJ_OFFSET,
            bytemuck::bytes_of(&proj),
        )
    }

    pub fn update_view(&mut self, position: Vec3, zoom: f32, rotation: Quat) -> DeviceResult<()> {
        let view = view_matrix(position, zoom, rotation).to_cols_array_2d();
        self.device.write_buffer(
            self.world_buffer,
            WorldUniform::VIEW_OFFSET,
            bytemuck::bytes_of(&view),
        )
    }

    pub fn queue_directional_light(
        &mut self,
        direction: Vec3,
        color: Vec3,
        intensity: f32,
    ) -> DeviceResult<()> {
        self.dir_lights.push(
            &mut self.device,
            DirectionalLight::new(direction, color, intensity),
        )
    }

    pub fn queue_point_light(
        &mut self,
        position: Vec3,
        color: Vec3,
        intensity: f32,
    ) -> DeviceResult<()> {
        self.point_lights
            .push(&mut self.device, PointLight::new(position, color, intensity))
    }

    /// Queues `model` for the next draw. The transform is read now; later
    /// changes to it do not affect this frame.
    pub fn queue_model(&mut self, model: &Model3D, transform: &Transform3D) {
        self.models.push(ModelTicket::new(model, transform));
    }

    /// Submits everything queued since the last draw into `target`, tested
    /// against `depth`, then empties the queues.
    pub fn draw(&mut self, target: TextureHandle, depth: TextureHandle) -> DeviceResult<()> {
        let counts = [self.dir_lights.len(), self.point_lights.len()];
        self.device.write_buffer(
            self.world_buffer,
            WorldUniform::DIR_COUNT_OFFSET,
            bytemuck::cast_slice(&counts),
        )?;

        // The shader never reads past the counts, so stale trailing records are harmless.
        self.dir_lights.flush(&mut self.device)?;
        self.point_lights.flush(&mut self.device)?;

        self.device.begin_renderpass(&RenderPassDescriptor {
            target,
            depth: Some(depth),
            clear_color: Some(self.clear_color),
            clear_depth: Some(1.0),
        })?;
        // Once the pass is open it is always closed and the queues emptied,
        // so a failed frame drops its work instead of blocking the next one.
        let recorded = self.record_models();
        let ended = self.device.end_renderpass();
        let model_count = self.models.len();

        self.dir_lights.clear();
        self.point_lights.clear();
        self.models.clear();
        recorded?;
        ended?;

        log::trace!(
            "Drew {} models with {} directional and {} point lights",
            model_count,
            counts[0],
            counts[1]
        );
        Ok(())
    }

    fn record_models(&mut self) -> DeviceResult<()> {
        self.device.bind_shader(self.shader)?;
        self.device.bind_descriptor_set(
            WORLD_SET,
            &[
                Descriptor::UniformBuffer(&[self.world_buffer]),
                Descriptor::StorageBuffer(&[self.dir_lights.buffer()]),
                Descriptor::StorageBuffer(&[self.point_lights.buffer()]),
            ],
        )?;

        for ticket in self.models.tickets() {
            let color_map = ticket.model.color_map.unwrap_or(self.default_color_map);
            let normal_map = ticket.model.normal_map.unwrap_or(self.default_normal_map);

            self.device.bind_descriptor_set(
                OBJECT_SET,
                &[Descriptor::SampledTexture(&[color_map, normal_map])],
            )?;
            self.device
                .bind_push_constant(bytemuck::bytes_of(&ticket.push))?;
            self.device
                .draw(ticket.model.vertex_buffer, ticket.model.index_buffer, 0)?;
        }
        Ok(())
    }

    /// Reads the world uniform back from the device.
    pub fn read_world_uniform(&mut self) -> DeviceResult<WorldUniform> {
        let mut world = WorldUniform::zeroed();
        self.device
            .read_buffer(self.world_buffer, 0, bytemuck::bytes_of_mut(&mut world))?;
        Ok(world)
    }

    pub fn directional_lights(&self) -> &LightBatch<DirectionalLight> {
        &self.dir_lights
    }

    pub fn point_lights(&self) -> &LightBatch<PointLight> {
        &self.point_lights
    }

    pub fn models(&self) -> &ModelQueue {
        &self.models
    }

    pub fn world_buffer(&self) -> BufferHandle {
        self.world_buffer
    }

    pub fn shader(&self) -> ShaderHandle {
        self.shader
    }

    pub fn default_color_map(&self) -> TextureHandle {
        self.default_color_map
    }

    pub fn default_normal_map(&self) -> TextureHandle {
        self.default_normal_map
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Command, RecordingDevice};
    use glam::Mat4;

    fn renderer() -> Renderer3D<RecordingDevice> {
        Renderer3D::new(RecordingDevice::new(), &RenderSettings::default()).unwrap()
    }

    #[test]
    fn new_uses_configured_capacities() {
        let settings = RenderSettings {
            directional_light_capacity: 4,
            point_light_capacity: 8,
            model_capacity: 16,
            ..Default::default()
        };
        let renderer = Renderer3D::new(RecordingDevice::new(), &settings).unwrap();

        assert_eq!(renderer.directional_lights().capacity(), 4);
        assert_eq!(renderer.point_lights().capacity(), 8);
        assert_eq!(renderer.models().capacity(), 16);
    }

    #[test]
    fn projection_update_leaves_view_untouched() {
        let mut renderer = renderer();
        renderer
            .update_view(Vec3::new(0.0, 0.0, -1.0), 1.0, Quat::IDENTITY)
            .unwrap();
        renderer.device_mut().clear_commands();

        renderer.update_projection(1.0, 1.5, 0.1, 100.0).unwrap();

        assert_eq!(
            renderer.device().commands(),
            &[Command::WriteBuffer {
                buffer: renderer.world_buffer(),
                offset: WorldUniform::PROJ_OFFSET,
                len: 64,
            }]
        );
        let world = renderer.read_world_uniform().unwrap();
        let view = Mat4::from_cols_array_2d(&world.view);
        assert!(view.abs_diff_eq(Mat4::from_translation(Vec3::Z), 1e-6));
        let proj = Mat4::from_cols_array_2d(&world.proj);
        assert!(proj.abs_diff_eq(projection_matrix(1.0, 1.5, 0.1, 100.0), 1e-6));
    }

    #[test]
    fn view_update_writes_only_view_range() {
        let mut renderer = renderer();
        renderer.device_mut().clear_commands();

        renderer
            .update_view(Vec3::ONE, 2.0, Quat::from_rotation_y(0.25))
            .unwrap();

        assert_eq!(
            renderer.device().commands(),
            &[Command::WriteBuffer {
                buffer: renderer.world_buffer(),
                offset: WorldUniform::VIEW_OFFSET,
                len: 64,
            }]
        );
    }

    #[test]
    fn shutdown_releases_everything_it_created() {
        let device = renderer().shutdown();

        assert_eq!(device.live_buffer_count(), 0);
        assert_eq!(device.live_texture_count(), 0);
        assert_eq!(device.live_shader_count(), 0);
        assert!(device.commands().contains(&Command::WaitIdle));
    }
}
