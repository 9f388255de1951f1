use std::sync::Arc;

use bitflags::bitflags;
use glam::{Quat, Vec3};
use thiserror::Error;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::*,
    event_loop::ActiveEventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::demo_scenes::QuadScene;
use crate::device::{DeviceError, DeviceResult, FrameStatus, WgpuDevice};
use crate::renderer::{create_render_target, move_first_person, RenderTarget, Renderer3D};
use crate::settings::RenderSettings;
use crate::time::{FrameClock, FrameStats};

const MOUSE_SPEED: f32 = 0.003;
const MOVE_SPEED: f32 = 1.5;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error(transparent)]
    Device(#[from] DeviceError),
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    struct InputState: u32 {
        const UP = 1 << 0;
        const DOWN = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
        const FORWARD = 1 << 4;
        const BACKWARD = 1 << 5;
        const LOOK = 1 << 6;
    }
}

impl InputState {
    fn from_key(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::Space => Some(Self::UP),
            KeyCode::ShiftLeft => Some(Self::DOWN),
            KeyCode::KeyA => Some(Self::LEFT),
            KeyCode::KeyD => Some(Self::RIGHT),
            KeyCode::KeyW => Some(Self::FORWARD),
            KeyCode::KeyS => Some(Self::BACKWARD),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FlyCamera {
    position: Vec3,
    zoom: f32,
    rotation: Quat,
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, -1.0),
            zoom: 1.0,
            rotation: Quat::IDENTITY,
        }
    }
}

impl FlyCamera {
    /// Yaw turns around world up, pitch around the camera's own right axis.
    fn look(&mut self, dx: f32, dy: f32) {
        self.rotation = Quat::from_rotation_y(dx * MOUSE_SPEED) * self.rotation;
        self.rotation = (self.rotation * Quat::from_rotation_x(dy * MOUSE_SPEED)).normalize();
    }

    fn fly(&mut self, input: InputState, dt: f32) {
        const MOVES: [(InputState, Vec3); 6] = [
            (InputState::UP, Vec3::Y),
            (InputState::DOWN, Vec3::NEG_Y),
            (InputState::FORWARD, Vec3::Z),
            (InputState::BACKWARD, Vec3::NEG_Z),
            (InputState::LEFT, Vec3::NEG_X),
            (InputState::RIGHT, Vec3::X),
        ];

        for (flag, direction) in MOVES {
            if input.contains(flag) {
                self.position =
                    move_first_person(self.position, self.rotation, direction, dt * MOVE_SPEED);
            }
        }
    }
}

struct Demo {
    window: Arc<Window>,
    renderer: Renderer3D<WgpuDevice>,
    target: RenderTarget,
    scene: QuadScene,
    camera: FlyCamera,
    clock: FrameClock,
    stats: FrameStats,
}

impl Demo {
    fn new(event_loop: &ActiveEventLoop, settings: &RenderSettings) -> Result<Self, AppError> {
        let attributes = Window::default_attributes()
            .with_title("hg renderer")
            .with_inner_size(PhysicalSize::new(
                settings.resolution.width,
                settings.resolution.height,
            ));
        let window = Arc::new(event_loop.create_window(attributes)?);

        let device = pollster::block_on(WgpuDevice::new(window.clone(), settings))?;
        let mut renderer = Renderer3D::new(device, settings)?;

        let (width, height) = renderer.device().surface_size();
        let target = create_render_target(renderer.device_mut(), width, height)?;
        renderer.update_projection(
            settings.camera.fov_radians(),
            target.aspect_ratio(),
            settings.camera.near,
            settings.camera.far,
        )?;

        let camera = FlyCamera::default();
        renderer.update_view(camera.position, camera.zoom, camera.rotation)?;

        let scene = QuadScene::new(renderer.device_mut())?;

        Ok(Self {
            window,
            renderer,
            target,
            scene,
            camera,
            clock: FrameClock::new(),
            stats: FrameStats::default(),
        })
    }

    fn frame(&mut self, input: InputState) -> DeviceResult<()> {
        let dt = self.clock.tick();
        if let Some(report) = self.stats.record(dt) {
            log::info!(
                "avg: {:.3}ms, fps: {}",
                report.avg_frame_ms,
                report.fps
            );
        }

        self.camera.fly(input, dt as f32);
        self.renderer
            .update_view(self.camera.position, self.camera.zoom, self.camera.rotation)?;

        if self.renderer.device_mut().begin_frame()? == FrameStatus::Skipped {
            log::debug!("Surface not ready, skipping frame");
            return Ok(());
        }

        self.scene.advance(dt as f32);
        self.scene.queue(&mut self.renderer)?;
        self.renderer.draw(self.target.color, self.target.depth)?;

        if self.renderer.device_mut().end_frame(self.target.color)? == FrameStatus::Skipped {
            log::debug!("Frame was not presented");
        }
        Ok(())
    }

    fn resize(&mut self, size: PhysicalSize<u32>, settings: &RenderSettings) -> DeviceResult<()> {
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }

        let device = self.renderer.device_mut();
        device.resize(size.width, size.height);
        self.target.destroy(device);
        self.target = create_render_target(device, size.width, size.height)?;

        self.renderer.update_projection(
            settings.camera.fov_radians(),
            self.target.aspect_ratio(),
            settings.camera.near,
            settings.camera.far,
        )
    }

    fn shutdown(self) {
        let Self {
            renderer,
            target,
            scene,
            ..
        } = self;

        let mut device = renderer.shutdown();
        scene.destroy(&mut device);
        target.destroy(&mut device);
    }
}

/// Windowed demo: a fly camera over two lit quads.
pub struct App {
    settings: RenderSettings,
    demo: Option<Demo>,
    input: InputState,
    error: Option<AppError>,
}

impl App {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            demo: None,
            input: InputState::empty(),
            error: None,
        }
    }

    /// The error that stopped the event loop, if any.
    pub fn take_error(&mut self) -> Option<AppError> {
        self.error.take()
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: AppError) {
        log::error!("{err}");
        self.error = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.demo.is_some() {
            return;
        }

        match Demo::new(event_loop, &self.settings) {
            Ok(demo) => {
                demo.window.request_redraw();
                self.demo = Some(demo);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        let Some(demo) = self.demo.as_mut() else {
            return;
        };
        if demo.window.id() != id {
            return;
        }

        let result = match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                event_loop.exit();
                Ok(())
            }
            WindowEvent::Resized(size) => demo.resize(size, &self.settings),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if code == KeyCode::Escape && state == ElementState::Pressed {
                    event_loop.exit();
                } else if let Some(flag) = InputState::from_key(code) {
                    self.input.set(flag, state == ElementState::Pressed);
                }
                Ok(())
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.input
                    .set(InputState::LOOK, state == ElementState::Pressed);
                Ok(())
            }
            WindowEvent::RedrawRequested => {
                let result = demo.frame(self.input);
                demo.window.request_redraw();
                result
            }
            _ => Ok(()),
        };

        if let Err(err) = result {
            self.fail(event_loop, err.into());
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let (Some(demo), DeviceEvent::MouseMotion { delta: (dx, dy) }) =
            (self.demo.as_mut(), event)
        {
            if self.input.contains(InputState::LOOK) {
                demo.camera.look(dx as f32, dy as f32);
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(demo) = self.demo.take() {
            demo.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_keys_map_to_flags() {
        assert_eq!(InputState::from_key(KeyCode::KeyW), Some(InputState::FORWARD));
        assert_eq!(InputState::from_key(KeyCode::ShiftLeft), Some(InputState::DOWN));
        assert_eq!(InputState::from_key(KeyCode::KeyQ), None);
    }

    #[test]
    fn flying_up_ignores_pitch() {
        let mut camera = FlyCamera::default();
        camera.look(0.0, 300.0);
        camera.fly(InputState::UP, 1.0);
        assert!(camera
            .position
            .abs_diff_eq(Vec3::new(0.0, MOVE_SPEED, -1.0), 1e-5));
    }

    #[test]
    fn opposite_keys_cancel_out() {
        let mut camera = FlyCamera::default();
        camera.fly(InputState::FORWARD | InputState::BACKWARD, 0.5);
        assert!(camera.position.abs_diff_eq(FlyCamera::default().position, 1e-6));
    }
}
