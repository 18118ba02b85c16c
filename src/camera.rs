//! Viewer camera with fly and orbit controls.
//!
//! Fly mode moves along the camera axes and turns with the mouse. Orbit
//! mode rotates the camera around a pivot while keeping its distance.
//! Angles are in degrees; pitch is clamped to +-89.

use glam::{Mat4, Quat, Vec2, Vec3};

use crate::input::Input;

/// Matrices and clip planes of the current view, consumed by the renderer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraMatrices {
    pub view: Mat4,
    pub projection: Mat4,
    pub position: Vec3,
    pub near: f32,
    pub far: f32,
}

impl CameraMatrices {
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

/// Movement requested for one frame, decoupled from the input backend.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraControls {
    /// Right, up and forward movement, each in `-1..=1`.
    pub movement: Vec3,
    /// Pointer movement in pixels.
    pub look: Vec2,
    pub fly: bool,
    pub orbit: bool,
}

impl CameraControls {
    /// Left mouse + WASDQE flies; right mouse orbits.
    pub fn from_input(input: &Input) -> Self {
        use winit::event::MouseButton;
        use winit::keyboard::KeyCode;

        let axis = |pos: KeyCode, neg: KeyCode| {
            (input.key_down(pos) as i32 - input.key_down(neg) as i32) as f32
        };
        Self {
            movement: Vec3::new(
                axis(KeyCode::KeyD, KeyCode::KeyA),
                axis(KeyCode::KeyE, KeyCode::KeyQ),
                axis(KeyCode::KeyW, KeyCode::KeyS),
            ),
            look: input.mouse_delta(),
            fly: input.mouse_down(MouseButton::Left),
            orbit: input.mouse_down(MouseButton::Right),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub pivot: Vec3,
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub speed: f32,
    pub sensitivity: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 3.0, 12.0),
            yaw: -90.0,
            pitch: -10.0,
            pivot: Vec3::ZERO,
            fov_y: 60.0,
            near: 0.1,
            far: 1000.0,
            speed: 25.0,
            sensitivity: 12.0,
        }
    }
}

impl Camera {
    pub fn new(position: Vec3, yaw: f32, pitch: f32) -> Self {
        Self {
            position,
            yaw,
            pitch: pitch.clamp(-89.0, 89.0),
            ..Default::default()
        }
    }

    pub fn forward(&self) -> Vec3 {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize()
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize()
    }

    pub fn up(&self) -> Vec3 {
        self.right().cross(self.forward())
    }

    /// Applies one frame of controls. Fly takes precedence over orbit.
    pub fn update(&mut self, controls: &CameraControls, dt: f32) {
        if controls.fly {
            let step = self.speed * dt;
            self.position += self.right() * controls.movement.x * step
                + self.up() * controls.movement.y * step
                + self.forward() * controls.movement.z * step;
            self.turn(controls.look * dt * self.sensitivity);
        } else if controls.orbit {
            self.orbit(controls.look * dt * self.sensitivity);
        }
    }

    /// Turns in place by `delta` degrees (x: yaw, y: pitch, screen-down positive).
    pub fn turn(&mut self, delta: Vec2) {
        self.yaw += delta.x;
        self.pitch = (self.pitch - delta.y).clamp(-89.0, 89.0);
    }

    /// Rotates around the pivot by `delta` degrees, keeping the distance.
    pub fn orbit(&mut self, delta: Vec2) {
        let offset = self.position - self.pivot;
        let distance = offset.length();
        if distance < 1e-4 {
            return;
        }

        let yawed = Quat::from_rotation_y(-delta.x.to_radians()) * offset;
        let horizontal = Vec2::new(yawed.x, yawed.z).length();
        let elevation = yawed.y.atan2(horizontal).to_degrees();
        let target = (elevation + delta.y).clamp(-89.0, 89.0).to_radians();
        let heading = Vec2::new(yawed.x, yawed.z).normalize_or(Vec2::X);
        let (sin_e, cos_e) = target.sin_cos();
        let direction = Vec3::new(heading.x * cos_e, sin_e, heading.y * cos_e);

        self.position = self.pivot + direction * distance;
        self.look_at(self.pivot);
    }

    /// Points the camera at `target`.
    pub fn look_at(&mut self, target: Vec3) {
        let dir = (target - self.position).normalize_or(self.forward());
        self.pitch = dir.y.asin().to_degrees().clamp(-89.0, 89.0);
        self.yaw = dir.z.atan2(dir.x).to_degrees();
    }

    pub fn matrices(&self, aspect: f32) -> CameraMatrices {
        CameraMatrices {
            view: Mat4::look_to_rh(self.position, self.forward(), Vec3::Y),
            projection: Mat4::perspective_rh(self.fov_y.to_radians(), aspect, self.near, self.far),
            position: self.position,
            near: self.near,
            far: self.far,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera_looks_down_negative_z() {
        let camera = Camera::new(Vec3::ZERO, -90.0, 0.0);
        assert!((camera.forward() - Vec3::NEG_Z).length() < 1e-5);
        assert!((camera.right() - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut camera = Camera::default();
        camera.turn(Vec2::new(0.0, -500.0));
        assert_eq!(camera.pitch, 89.0);
        camera.turn(Vec2::new(0.0, 1000.0));
        assert_eq!(camera.pitch, -89.0);
    }

    #[test]
    fn flying_forward_moves_speed_times_dt() {
        let mut camera = Camera::new(Vec3::ZERO, -90.0, 0.0);
        let controls = CameraControls {
            movement: Vec3::Z,
            fly: true,
            ..Default::default()
        };
        camera.update(&controls, 0.1);
        assert!((camera.position - Vec3::new(0.0, 0.0, -2.5)).length() < 1e-4);
    }

    #[test]
    fn no_button_means_no_motion() {
        let mut camera = Camera::default();
        let before = camera.position;
        camera.update(
            &CameraControls {
                movement: Vec3::ONE,
                look: Vec2::splat(40.0),
                ..Default::default()
            },
            0.5,
        );
        assert_eq!(camera.position, before);
    }

    #[test]
    fn orbit_keeps_distance_and_faces_pivot() {
        let mut camera = Camera::new(Vec3::new(0.0, 0.0, 10.0), -90.0, 0.0);
        camera.orbit(Vec2::new(90.0, 20.0));

        assert!(((camera.position - camera.pivot).length() - 10.0).abs() < 1e-3);
        let to_pivot = (camera.pivot - camera.position).normalize();
        assert!((camera.forward() - to_pivot).length() < 1e-3);
        assert!(camera.position.y > 0.0);
    }

    #[test]
    fn projection_uses_clip_planes() {
        let m = Camera::default().matrices(16.0 / 9.0);
        assert_eq!((m.near, m.far), (0.1, 1000.0));
        let near_point = m.projection.project_point3(Vec3::new(0.0, 0.0, -0.1));
        assert!(near_point.z.abs() < 1e-4);
    }
}
