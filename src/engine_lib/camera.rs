// src/engine_lib/camera.rs

use glam::{Mat3, Mat4, Vec3};
use winit::keyboard::KeyCode;

use crate::engine_lib::controller::InputState;

pub const FLY_SPEED: f32 = 2.5;
pub const MOUSE_SENSITIVITY: f32 = 0.1;
const PITCH_LIMIT: f32 = 89.0;

/// Key toggle that fires once per press; a release re-arms it.
#[derive(Clone, Copy, Debug, Default)]
struct Latch {
    held: bool,
}

impl Latch {
    fn fire(&mut self, down: bool) -> bool {
        let fired = down && !self.held;
        self.held = down;
        fired
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Pose {
    position: Vec3,
    front: Vec3,
    yaw: f32,
    pitch: f32,
}

#[derive(Debug)]
pub struct Camera {
    pub position: Vec3,
    pub front: Vec3,
    pub up: Vec3,
    /// Degrees.
    pub yaw: f32,
    /// Degrees, kept within [-89, 89].
    pub pitch: f32,
    pub free_fly: bool,
    pub show_colliders: bool,
    last_x: f64,
    last_y: f64,
    first_mouse: bool,
    saved: Pose,
    free_fly_toggle: Latch,
    collider_toggle: Latch,
}

impl Camera {
    pub fn new(position: Vec3, front: Vec3) -> Self {
        let front = front.try_normalize().unwrap_or(Vec3::NEG_Z);
        let yaw = front.z.atan2(front.x).to_degrees();
        let pitch = front.y.clamp(-1.0, 1.0).asin().to_degrees().clamp(-PITCH_LIMIT, PITCH_LIMIT);
        let pose = Pose { position, front, yaw, pitch };
        Self {
            position,
            front,
            up: Vec3::Y,
            yaw,
            pitch,
            free_fly: false,
            show_colliders: false,
            last_x: 400.0,
            last_y: 300.0,
            first_mouse: true,
            saved: pose,
            free_fly_toggle: Latch::default(),
            collider_toggle: Latch::default(),
        }
    }

    fn pose(&self) -> Pose {
        Pose { position: self.position, front: self.front, yaw: self.yaw, pitch: self.pitch }
    }

    fn restore(&mut self, pose: Pose) {
        self.position = pose.position;
        self.front = pose.front;
        self.yaw = pose.yaw;
        self.pitch = pose.pitch;
    }

    pub fn set_free_fly(&mut self, enabled: bool) {
        if enabled == self.free_fly {
            return;
        }
        if enabled {
            self.saved = self.pose();
            self.first_mouse = true;
        } else {
            self.restore(self.saved);
        }
        self.free_fly = enabled;
        log::info!("Camera mode: {}", if enabled { "free-fly" } else { "fixed" });
    }

    pub fn process_input(&mut self, input: &InputState, dt: f32) {
        if self.free_fly_toggle.fire(input.is_pressed(KeyCode::KeyO)) {
            self.set_free_fly(!self.free_fly);
        }
        if self.collider_toggle.fire(input.is_pressed(KeyCode::KeyC)) {
            self.show_colliders = !self.show_colliders;
        }

        if !self.free_fly {
            return;
        }
        let step = FLY_SPEED * dt;
        let right = self.front.cross(self.up).normalize_or_zero();
        if input.is_pressed(KeyCode::KeyW) {
            self.position += step * self.front;
        }
        if input.is_pressed(KeyCode::KeyS) {
            self.position -= step * self.front;
        }
        if input.is_pressed(KeyCode::KeyA) {
            self.position -= step * right;
        }
        if input.is_pressed(KeyCode::KeyD) {
            self.position += step * right;
        }
    }

    /// Mouse look from an absolute cursor position. Ignored outside free-fly.
    pub fn mouse_callback(&mut self, x: f64, y: f64) {
        if !self.free_fly {
            return;
        }
        if self.first_mouse {
            self.last_x = x;
            self.last_y = y;
            self.first_mouse = false;
        }
        let x_offset = (x - self.last_x) as f32 * MOUSE_SENSITIVITY;
        let y_offset = (self.last_y - y) as f32 * MOUSE_SENSITIVITY;
        self.last_x = x;
        self.last_y = y;

        self.yaw += x_offset;
        self.pitch = (self.pitch + y_offset).clamp(-PITCH_LIMIT, PITCH_LIMIT);

        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize();
    }

    /// Fixed mode follows a target; free-fly ignores it.
    pub fn track(&mut self, target: Vec3, offset: Vec3) {
        if !self.free_fly {
            self.position = target + offset;
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// View matrix with translation removed, for drawing the skybox around the eye.
    pub fn skybox_view(&self) -> Mat4 {
        Mat4::from_mat3(Mat3::from_mat4(self.view_matrix()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::new(Vec3::new(0.0, 0.0, 3.0), Vec3::NEG_Z)
    }

    #[test]
    fn default_front_means_yaw_minus_ninety() {
        let cam = camera();
        assert!((cam.yaw + 90.0).abs() < 1e-4);
        assert_eq!(cam.pitch, 0.0);
    }

    #[test]
    fn toggle_fires_once_per_press() {
        let mut cam = camera();
        let mut input = InputState::new();
        input.press(KeyCode::KeyO);
        cam.process_input(&input, 0.016);
        assert!(cam.free_fly);
        cam.process_input(&input, 0.016);
        cam.process_input(&input, 0.016);
        assert!(cam.free_fly);

        input.release(KeyCode::KeyO);
        cam.process_input(&input, 0.016);
        input.press(KeyCode::KeyO);
        cam.process_input(&input, 0.016);
        assert!(!cam.free_fly);
    }

    #[test]
    fn collider_key_flips_flag() {
        let mut cam = camera();
        let mut input = InputState::new();
        input.press(KeyCode::KeyC);
        cam.process_input(&input, 0.016);
        cam.process_input(&input, 0.016);
        assert!(cam.show_colliders);
    }

    #[test]
    fn leaving_free_fly_restores_pose() {
        let mut cam = camera();
        let before = cam.pose();
        cam.set_free_fly(true);
        let mut input = InputState::new();
        input.press(KeyCode::KeyW);
        cam.process_input(&input, 1.0);
        cam.mouse_callback(100.0, 100.0);
        cam.mouse_callback(300.0, 50.0);
        assert_ne!(cam.pose(), before);

        cam.set_free_fly(false);
        assert_eq!(cam.pose(), before);
    }

    #[test]
    fn wasd_moves_only_in_free_fly() {
        let mut cam = camera();
        let mut input = InputState::new();
        input.press(KeyCode::KeyW);
        cam.process_input(&input, 1.0);
        assert_eq!(cam.position, Vec3::new(0.0, 0.0, 3.0));

        cam.set_free_fly(true);
        cam.process_input(&input, 1.0);
        assert!(cam.position.abs_diff_eq(Vec3::new(0.0, 0.0, 0.5), 1e-5));

        input.release(KeyCode::KeyW);
        input.press(KeyCode::KeyD);
        cam.process_input(&input, 1.0);
        assert!(cam.position.abs_diff_eq(Vec3::new(2.5, 0.0, 0.5), 1e-5));
    }

    #[test]
    fn first_mouse_event_does_not_jump() {
        let mut cam = camera();
        cam.set_free_fly(true);
        let front = cam.front;
        cam.mouse_callback(1000.0, -500.0);
        assert!(cam.front.abs_diff_eq(front, 1e-5));
    }

    #[test]
    fn pitch_is_clamped_and_front_normalised() {
        let mut cam = camera();
        cam.set_free_fly(true);
        cam.mouse_callback(0.0, 0.0);
        cam.mouse_callback(0.0, -10_000.0);
        assert_eq!(cam.pitch, 89.0);
        assert!((cam.front.length() - 1.0).abs() < 1e-5);
        cam.mouse_callback(0.0, 10_000.0);
        assert_eq!(cam.pitch, -89.0);
    }

    #[test]
    fn mouse_is_ignored_in_fixed_mode() {
        let mut cam = camera();
        cam.mouse_callback(0.0, 0.0);
        cam.mouse_callback(500.0, 500.0);
        assert_eq!(cam.front, Vec3::NEG_Z);
    }

    #[test]
    fn track_only_moves_fixed_camera() {
        let mut cam = camera();
        cam.track(Vec3::new(1.0, 0.0, 1.0), Vec3::new(0.0, 1.1, 0.0));
        assert_eq!(cam.position, Vec3::new(1.0, 1.1, 1.0));

        cam.set_free_fly(true);
        cam.track(Vec3::ZERO, Vec3::ZERO);
        assert_eq!(cam.position, Vec3::new(1.0, 1.1, 1.0));
    }

    #[test]
    fn view_looks_along_front() {
        let cam = camera();
        let ahead = cam.view_matrix().transform_point3(cam.position + cam.front);
        assert!(ahead.abs_diff_eq(Vec3::new(0.0, 0.0, -1.0), 1e-5));
        assert!(cam.skybox_view().transform_point3(Vec3::ZERO).abs_diff_eq(Vec3::ZERO, 1e-6));
    }
}
