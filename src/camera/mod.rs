/// Camera system with FPS-style controls
/// Mouse look and WASD movement
use glam::{Mat4, Quat, Vec3};

pub struct Camera {
    pub position: Vec3,
    pub yaw: f32,   // Rotation around Y axis (radians)
    pub pitch: f32, // Rotation around X axis (radians)
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub aspect_ratio: f32,

    // Movement state
    pub move_speed: f32,
    pub mouse_sensitivity: f32,
}

impl Camera {
    /// Looking down -z with a 45° vertical field of view and a 1..10 depth
    /// range, the framing `MeshData::transform_to_center` assumes.
    pub fn new(position: Vec3, aspect_ratio: f32) -> Self {
        Self {
            position,
            yaw: 0.0,
            pitch: 0.0,
            fov: 45.0f32.to_radians(),
            near: 1.0,
            far: 10.0,
            aspect_ratio,
            move_speed: 2.0,
            mouse_sensitivity: 0.002,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        let rotation = self.rotation_quat();
        Mat4::look_at_rh(
            self.position,
            self.position + rotation * Vec3::NEG_Z,
            rotation * Vec3::Y,
        )
    }

    /// OpenGL-style projection: visible depth lands in z ∈ [-1, 1], which is
    /// the volume the pipeline clips against.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov, self.aspect_ratio, self.near, self.far)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// NDC back to world space, for casting primary rays.
    pub fn inverse_view_projection(&self) -> Mat4 {
        self.view_projection_matrix().inverse()
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation_quat() * Vec3::NEG_Z
    }

    pub fn right(&self) -> Vec3 {
        self.rotation_quat() * Vec3::X
    }

    fn rotation_quat(&self) -> Quat {
        Quat::from_rotation_y(self.yaw) * Quat::from_rotation_x(self.pitch)
    }

    /// Update camera orientation from mouse delta
    pub fn rotate(&mut self, mouse_delta_x: f32, mouse_delta_y: f32) {
        self.yaw -= mouse_delta_x * self.mouse_sensitivity;
        self.pitch -= mouse_delta_y * self.mouse_sensitivity;

        // Straight up or down degenerates the look-at basis.
        const MAX_PITCH: f32 = std::f32::consts::FRAC_PI_2 - 0.01;
        self.pitch = self.pitch.clamp(-MAX_PITCH, MAX_PITCH);
    }

    /// Move camera in local space
    pub fn move_local(&mut self, forward: f32, right: f32, up: f32, dt: f32) {
        let move_vec = self.forward() * forward + self.right() * right + Vec3::Y * up;
        self.position += move_vec * self.move_speed * dt;
    }

    /// Update aspect ratio (call when window resizes)
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }
}

/// Camera controller - handles input state
#[derive(Debug, Default, Clone)]
pub struct CameraController {
    pub forward_pressed: bool,
    pub backward_pressed: bool,
    pub left_pressed: bool,
    pub right_pressed: bool,
    pub up_pressed: bool,
    pub down_pressed: bool,
}

impl CameraController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update camera based on controller state
    pub fn update_camera(&self, camera: &mut Camera, dt: f32) {
        let axis = |pos: bool, neg: bool| pos as i32 as f32 - neg as i32 as f32;
        camera.move_local(
            axis(self.forward_pressed, self.backward_pressed),
            axis(self.right_pressed, self.left_pressed),
            axis(self.up_pressed, self.down_pressed),
            dt,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn projection_maps_depth_range_to_clip_volume() {
        let camera = Camera::new(Vec3::ZERO, 1.0);
        let vp = camera.view_projection_matrix();

        let near = vp * Vec4::new(0.0, 0.0, -1.0, 1.0);
        let far = vp * Vec4::new(0.0, 0.0, -10.0, 1.0);
        assert!((near.z / near.w + 1.0).abs() < 1e-5);
        assert!((far.z / far.w - 1.0).abs() < 1e-5);

        let behind = vp * Vec4::new(0.0, 0.0, 1.0, 1.0);
        assert!(behind.w < 0.0);
    }

    #[test]
    fn inverse_unprojects_screen_center_along_forward() {
        let camera = Camera::new(Vec3::new(1.0, 2.0, 3.0), 1.5);
        let p = camera
            .inverse_view_projection()
            .project_point3(Vec3::new(0.0, 0.0, 1.0));
        let dir = (p - camera.position).normalize();
        assert!((dir - camera.forward()).length() < 1e-4);
    }

    #[test]
    fn controller_moves_forward() {
        let mut camera = Camera::new(Vec3::ZERO, 1.0);
        let controller = CameraController {
            forward_pressed: true,
            ..Default::default()
        };
        controller.update_camera(&mut camera, 0.5);
        assert!((camera.position - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-6);

        // Opposite keys cancel.
        let idle = CameraController {
            left_pressed: true,
            right_pressed: true,
            ..Default::default()
        };
        idle.update_camera(&mut camera, 1.0);
        assert!((camera.position - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-6);
    }

    #[test]
    fn pitch_stops_short_of_vertical() {
        let mut camera = Camera::new(Vec3::ZERO, 1.0);
        camera.rotate(0.0, -1.0e6);
        assert!(camera.pitch < std::f32::consts::FRAC_PI_2);
        assert!(camera.forward().y > 0.99);
        assert!(camera.view_matrix().is_finite());
    }
}
