// src/engine_lib/player.rs

use glam::{Vec2, Vec3};
use winit::keyboard::KeyCode;

use crate::config::PlayerConfig;
use crate::engine_lib::camera::Camera;
use crate::engine_lib::controller::InputState;
use crate::engine_lib::model::Model;
use crate::engine_lib::scene::Scene;

/// Result of a physics step. The host decides what death means.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerOutcome {
    Alive,
    Dead,
}

pub struct Player {
    pub model: Model,
    pub velocity: Vec3,
    pub grounded: bool,
    pub health: f32,
    pub fall_start_height: f32,
    pub tuning: PlayerConfig,
}

fn horizontal(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z).normalize_or_zero()
}

impl Player {
    pub fn new(mut model: Model, tuning: PlayerConfig) -> Self {
        model.transform.scale = tuning.scale();
        model.transform.position = tuning.spawn_position();
        model.finalize();
        Self {
            model,
            velocity: Vec3::ZERO,
            grounded: true,
            health: tuning.max_health,
            fall_start_height: tuning.spawn[1],
            tuning,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.model.transform.position
    }

    /// Offset from the player's origin to the fixed camera's eye.
    pub fn eye_offset(&self, eye_height: f32) -> Vec3 {
        Vec3::new(0.0, self.model.transform.scale.y + eye_height, 0.0)
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    fn outcome(&self) -> PlayerOutcome {
        if self.is_alive() {
            PlayerOutcome::Alive
        } else {
            PlayerOutcome::Dead
        }
    }

    pub fn process_input(&mut self, input: &InputState, camera: &Camera) {
        if camera.free_fly {
            return;
        }

        let forward = horizontal(camera.front);
        let right = horizontal(camera.front.cross(camera.up));

        let mut wish = Vec3::ZERO;
        if input.is_pressed(KeyCode::KeyW) {
            wish += forward;
        }
        if input.is_pressed(KeyCode::KeyS) {
            wish -= forward;
        }
        if input.is_pressed(KeyCode::KeyA) {
            wish -= right;
        }
        if input.is_pressed(KeyCode::KeyD) {
            wish += right;
        }

        if Vec2::new(camera.front.x, camera.front.z).length() > 0.0 {
            self.model.transform.rotation.y = camera.front.x.atan2(camera.front.z).to_degrees();
        }

        // Set, not accumulated. Diagonals are not normalised.
        self.velocity.x = wish.x * self.tuning.speed;
        self.velocity.z = wish.z * self.tuning.speed;

        if input.is_pressed(KeyCode::Space) && self.grounded {
            self.velocity.y = self.tuning.jump_strength;
            self.grounded = false;
            self.fall_start_height = self.position().y;
        }
    }

    pub fn apply_physics(&mut self, dt: f32, scene: &Scene, camera: &Camera) -> PlayerOutcome {
        if camera.free_fly {
            return self.outcome();
        }

        if !self.grounded {
            self.velocity.y += self.tuning.gravity * dt;
        }
        let step = self.velocity * dt;
        self.model.transform.position += step;

        let hit = scene.check_player_collision(&self.model);
        if hit.collided {
            if hit.normal.y > 0.0 {
                if !self.grounded {
                    self.apply_fall_damage(self.position().y);
                }
                self.grounded = true;
                self.velocity.y = 0.0;
            } else {
                // Blocked sideways: back out horizontally only, so the fall continues along the wall.
                self.model.transform.position.x -= step.x;
                self.model.transform.position.z -= step.z;
                self.velocity.x = 0.0;
                self.velocity.z = 0.0;
            }
        }

        let ground_y = self.tuning.ground_y;
        if self.position().y <= ground_y {
            self.model.transform.position.y = ground_y;
            self.velocity.y = 0.0;
            if !self.grounded {
                self.apply_fall_damage(ground_y);
            }
            self.grounded = true;
        } else if !hit.collided && self.grounded {
            self.grounded = false;
            self.fall_start_height = self.position().y;
        }

        self.outcome()
    }

    pub fn fall_damage(&self, current_y: f32) -> f32 {
        let fall_distance = self.fall_start_height - current_y;
        (fall_distance - self.tuning.fall_damage_height).max(0.0) * 10.0
    }

    pub fn apply_fall_damage(&mut self, current_y: f32) {
        let damage = self.fall_damage(current_y);
        if damage > 0.0 {
            self.health -= damage;
            log::info!("Fall damage {:.1}, health {:.1}", damage, self.health);
            if !self.is_alive() {
                log::warn!("Player died");
            }
        }
    }

    pub fn respawn(&mut self) {
        self.model.transform.position = self.tuning.spawn_position();
        self.velocity = Vec3::ZERO;
        self.grounded = true;
        self.health = self.tuning.max_health;
        self.fall_start_height = self.tuning.spawn[1];
        log::info!("Player respawned");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_lib::model::Transform;
    use crate::engine_lib::scene::Projection;

    const BOX: &str = "v -0.5 -0.5 -0.5\nv 0.5 0.5 0.5\nf 1 2 1\n";

    fn scene_with(boxes: &[(Vec3, Vec3)]) -> Scene {
        let mut scene = Scene::new(Projection { fov_y_deg: 45.0, aspect: 1.0, near: 0.1, far: 100.0 });
        for (position, scale) in boxes {
            let mut m = Model::from_obj_str("box", BOX);
            m.transform = Transform { position: *position, scale: *scale, ..Default::default() };
            scene.models.push(m);
        }
        scene
    }

    fn player() -> Player {
        let tuning = PlayerConfig { scale: [1.0, 1.0, 1.0], ..PlayerConfig::default() };
        Player::new(Model::from_obj_str("player", BOX), tuning)
    }

    fn fixed_camera() -> Camera {
        Camera::new(Vec3::new(0.0, 1.0, 3.0), Vec3::NEG_Z)
    }

    #[test]
    fn standing_on_floor_stays_put() {
        let scene = scene_with(&[]);
        let mut p = player();
        let outcome = p.apply_physics(0.1, &scene, &fixed_camera());
        assert_eq!(outcome, PlayerOutcome::Alive);
        assert!(p.grounded);
        assert_eq!(p.velocity.y, 0.0);
        assert_eq!(p.position().y, 0.0);
    }

    #[test]
    fn fall_damage_formula() {
        let mut p = player();
        p.fall_start_height = 5.0;
        assert_eq!(p.fall_damage(0.0), 40.0);
        p.fall_start_height = 1.0;
        assert_eq!(p.fall_damage(0.0), 0.0);
        p.fall_start_height = 0.5;
        assert_eq!(p.fall_damage(0.0), 0.0);
    }

    #[test]
    fn horizontal_velocity_is_set_from_camera() {
        let mut p = player();
        let mut input = InputState::new();
        input.press(KeyCode::KeyW);
        input.press(KeyCode::KeyD);
        p.process_input(&input, &fixed_camera());
        assert!((p.velocity.z + 2.5).abs() < 1e-5);
        assert!((p.velocity.x - 2.5).abs() < 1e-5);
        assert!((p.model.transform.rotation.y.abs() - 180.0).abs() < 1e-3);

        input.release(KeyCode::KeyW);
        input.release(KeyCode::KeyD);
        p.process_input(&input, &fixed_camera());
        assert_eq!(p.velocity, Vec3::ZERO);
    }

    #[test]
    fn straight_down_camera_gives_no_forward() {
        let mut p = player();
        let mut input = InputState::new();
        input.press(KeyCode::KeyW);
        let mut cam = fixed_camera();
        cam.front = Vec3::NEG_Y;
        p.process_input(&input, &cam);
        assert_eq!(p.velocity.x, 0.0);
        assert_eq!(p.velocity.z, 0.0);
    }

    #[test]
    fn jump_only_when_grounded() {
        let mut p = player();
        let mut input = InputState::new();
        input.press(KeyCode::Space);
        p.process_input(&input, &fixed_camera());
        assert_eq!(p.velocity.y, 5.0);
        assert!(!p.grounded);

        p.velocity.y = 1.0;
        p.process_input(&input, &fixed_camera());
        assert_eq!(p.velocity.y, 1.0);
    }

    #[test]
    fn free_fly_suppresses_player() {
        let scene = scene_with(&[]);
        let mut cam = fixed_camera();
        cam.set_free_fly(true);
        let mut p = player();
        p.model.transform.position.y = 5.0;
        p.grounded = false;
        let mut input = InputState::new();
        input.press(KeyCode::KeyW);
        p.process_input(&input, &cam);
        p.apply_physics(1.0, &scene, &cam);
        assert_eq!(p.velocity, Vec3::ZERO);
        assert_eq!(p.position().y, 5.0);
    }

    #[test]
    fn landing_on_a_box_grounds_the_player() {
        // Platform top at y = 1.0.
        let scene = scene_with(&[(Vec3::new(0.0, 0.5, 0.0), Vec3::ONE)]);
        let mut p = player();
        p.model.transform.position.y = 1.55;
        p.grounded = false;
        p.fall_start_height = 1.55;
        p.velocity.y = -1.0;

        p.apply_physics(0.1, &scene, &fixed_camera());
        assert!(p.grounded);
        assert_eq!(p.velocity.y, 0.0);
        assert!(p.position().y > 1.0);
        assert_eq!(p.health, 100.0);
    }

    #[test]
    fn sideways_hit_undoes_horizontal_step_only() {
        let scene = scene_with(&[(Vec3::new(1.5, 3.0, 0.0), Vec3::new(1.0, 4.0, 1.0))]);
        let mut p = player();
        let start = Vec3::new(0.45, 3.0, 0.0);
        p.model.transform.position = start;
        p.grounded = false;
        p.velocity = Vec3::new(2.0, -1.0, 0.0);

        p.apply_physics(0.1, &scene, &fixed_camera());
        let expected_vy = -1.0 + p.tuning.gravity * 0.1;
        assert!((p.velocity.y - expected_vy).abs() < 1e-6);
        assert_eq!(p.velocity.x, 0.0);
        assert!((p.position().x - start.x).abs() < 1e-5);
        assert!((p.position().y - (start.y + expected_vy * 0.1)).abs() < 1e-5);
        assert!(!p.grounded);
    }

    #[test]
    fn pushing_into_a_wall_midair_slides_down_it() {
        // Wall spans x in [1, 2], y in [0, 6].
        let scene = scene_with(&[(Vec3::new(1.5, 3.0, 0.0), Vec3::new(1.0, 6.0, 1.0))]);
        let camera = Camera::new(Vec3::new(0.0, 1.0, 0.0), Vec3::X);
        let mut p = player();
        p.model.transform.position = Vec3::new(0.45, 3.0, 0.0);
        p.grounded = false;
        p.fall_start_height = 3.0;

        let mut input = InputState::new();
        input.press(KeyCode::KeyW);

        let mut last_y = p.position().y;
        for _ in 0..10 {
            p.process_input(&input, &camera);
            p.apply_physics(0.05, &scene, &camera);
            assert!(p.position().y < last_y, "stuck at y = {}", p.position().y);
            assert!((p.position().x - 0.45).abs() < 1e-5);
            last_y = p.position().y;
        }
        assert!(!p.grounded);
        assert!((p.velocity.y - 10.0 * 0.05 * p.tuning.gravity).abs() < 1e-4);
        assert!(last_y < 2.5);
    }

    #[test]
    fn walking_off_a_ledge_starts_a_fall() {
        let scene = scene_with(&[]);
        let mut p = player();
        p.model.transform.position.y = 2.0;
        p.apply_physics(0.1, &scene, &fixed_camera());
        assert!(!p.grounded);
        assert_eq!(p.fall_start_height, 2.0);
    }

    #[test]
    fn hard_landing_can_kill() {
        let scene = scene_with(&[]);
        let mut p = player();
        p.model.transform.position.y = 0.05;
        p.grounded = false;
        p.fall_start_height = 20.0;
        p.velocity.y = -10.0;

        assert_eq!(p.apply_physics(0.1, &scene, &fixed_camera()), PlayerOutcome::Dead);
        assert_eq!(p.position().y, 0.0);
        assert!(!p.is_alive());

        p.respawn();
        assert!(p.is_alive());
        assert_eq!(p.apply_physics(0.1, &scene, &fixed_camera()), PlayerOutcome::Alive);
    }
}
