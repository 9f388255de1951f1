use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};
use std::mem;

/// Per-frame camera and light-count block, bound as the world uniform.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug)]
pub struct WorldUniform {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub dir_light_count: u32,
    pub point_light_count: u32,
    pub _padding: [u32; 2],
}

impl WorldUniform {
    pub const VIEW_OFFSET: u64 = mem::offset_of!(WorldUniform, view) as u64;
    pub const PROJ_OFFSET: u64 = mem::offset_of!(WorldUniform, proj) as u64;
    pub const DIR_COUNT_OFFSET: u64 = mem::offset_of!(WorldUniform, dir_light_count) as u64;
    pub const POINT_COUNT_OFFSET: u64 = mem::offset_of!(WorldUniform, point_light_count) as u64;
    pub const SIZE: u64 = mem::size_of::<WorldUniform>() as u64;

    pub fn new() -> Self {
        Self {
            view: Mat4::IDENTITY.to_cols_array_2d(),
            proj: Mat4::IDENTITY.to_cols_array_2d(),
            dir_light_count: 0,
            point_light_count: 0,
            _padding: [0; 2],
        }
    }
}

impl Default for WorldUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Left-handed perspective with depth in `0..1`. `fov` is vertical, in radians.
pub fn projection_matrix(fov: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    Mat4::perspective_lh(fov, aspect, near, far)
}

/// View matrix for an eye at `position` with orientation `rotation`, scaled by `zoom`.
pub fn view_matrix(position: Vec3, zoom: f32, rotation: Quat) -> Mat4 {
    Mat4::from_scale(Vec3::splat(zoom))
        * Mat4::from_quat(rotation.inverse())
        * Mat4::from_translation(-position)
}

/// Moves `position` by `distance` along `direction` as seen by a walking camera.
///
/// Horizontal components follow the camera's heading but stay on the ground
/// plane; the vertical component is always world up/down.
pub fn move_first_person(position: Vec3, rotation: Quat, direction: Vec3, distance: f32) -> Vec3 {
    let horizontal = Vec3::new(direction.x, 0.0, direction.z);
    let mut delta = Vec3::new(0.0, direction.y, 0.0);

    if horizontal != Vec3::ZERO {
        let rotated = rotation * horizontal;
        let flat = Vec3::new(rotated.x, 0.0, rotated.z).normalize_or_zero();
        delta += flat * horizontal.length();
    }

    position + delta * distance
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn world_uniform_is_144_bytes() {
        // 2 * mat4x4<f32> = 128 bytes, 2 * u32 = 8 bytes, padding = 8 bytes
        assert_eq!(WorldUniform::SIZE, 144);
        assert_eq!(WorldUniform::VIEW_OFFSET, 0);
        assert_eq!(WorldUniform::PROJ_OFFSET, 64);
        assert_eq!(WorldUniform::DIR_COUNT_OFFSET, 128);
        assert_eq!(WorldUniform::POINT_COUNT_OFFSET, 132);
    }

    #[test]
    fn view_moves_eye_to_origin() {
        let eye = Vec3::new(1.0, 2.0, -3.0);
        let view = view_matrix(eye, 1.0, Quat::IDENTITY);
        assert!(view.transform_point3(eye).abs_diff_eq(Vec3::ZERO, 1e-6));
    }

    #[test]
    fn view_undoes_camera_rotation() {
        let rotation = Quat::from_rotation_y(FRAC_PI_2);
        let view = view_matrix(Vec3::ZERO, 1.0, rotation);
        // The camera's forward axis ends up on +z in view space.
        let forward = rotation * Vec3::Z;
        assert!(view.transform_vector3(forward).abs_diff_eq(Vec3::Z, 1e-6));
    }

    #[test]
    fn zoom_scales_view_space() {
        let view = view_matrix(Vec3::ZERO, 2.0, Quat::IDENTITY);
        let p = view.transform_point3(Vec3::new(1.0, 1.0, 1.0));
        assert!(p.abs_diff_eq(Vec3::splat(2.0), 1e-6));
    }

    #[test]
    fn projection_maps_near_and_far_to_unit_depth() {
        let proj = projection_matrix(FRAC_PI_2, 1.0, 0.1, 100.0);
        let near = proj.project_point3(Vec3::new(0.0, 0.0, 0.1));
        let far = proj.project_point3(Vec3::new(0.0, 0.0, 100.0));
        assert!((near.z - 0.0).abs() < 1e-5);
        assert!((far.z - 1.0).abs() < 1e-5);
    }

    #[test]
    fn forward_movement_stays_on_ground_plane() {
        let pitched_down = Quat::from_rotation_x(0.5);
        let moved = move_first_person(Vec3::ZERO, pitched_down, Vec3::Z, 2.0);
        assert!(moved.abs_diff_eq(Vec3::new(0.0, 0.0, 2.0), 1e-5));
    }

    #[test]
    fn strafe_follows_heading() {
        let turned = Quat::from_rotation_y(FRAC_PI_2);
        let moved = move_first_person(Vec3::ZERO, turned, Vec3::X, 1.0);
        assert!(moved.abs_diff_eq(Vec3::new(0.0, 0.0, -1.0), 1e-5));
    }

    #[test]
    fn vertical_movement_ignores_rotation() {
        let turned = Quat::from_rotation_x(1.0) * Quat::from_rotation_y(0.3);
        let moved = move_first_person(Vec3::ONE, turned, Vec3::Y, 0.5);
        assert!(moved.abs_diff_eq(Vec3::new(1.0, 1.5, 1.0), 1e-6));
    }
}
