// src/engine_lib/collision.rs

use glam::{Mat4, Vec3};

/// Axis-aligned bounding box in whatever space its corners were taken from.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Bounds of a point cloud. An empty cloud yields a degenerate box at the origin.
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        let mut any = false;
        for p in points {
            min = min.min(p);
            max = max.max(p);
            any = true;
        }
        if !any {
            return Self::default();
        }
        Self { min, max }
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Re-aligned bounds of this box after `matrix`. Conservative for rotations:
    /// the result encloses the rotated box rather than fitting it.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        Self::from_points(self.corners().iter().map(|c| matrix.transform_point3(*c)))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extents(&self) -> Vec3 {
        self.max - self.min
    }

    /// Closed-interval overlap on all three axes; boxes that only touch collide.
    pub fn check_collision(a: &Aabb, b: &Aabb) -> bool {
        a.min.x <= b.max.x
            && a.max.x >= b.min.x
            && a.min.y <= b.max.y
            && a.max.y >= b.min.y
            && a.min.z <= b.max.z
            && a.max.z >= b.min.z
    }

    /// The 12 edges as 24 line-list endpoints.
    pub fn edge_vertices(&self) -> [Vec3; 24] {
        let (a, b) = (self.min, self.max);
        let c = [
            a,
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            b,
        ];
        const EDGES: [usize; 24] = [
            0, 1, 1, 3, 3, 2, 2, 0, // z = min face
            4, 5, 5, 7, 7, 6, 6, 4, // z = max face
            0, 4, 1, 5, 3, 7, 2, 6, // connecting edges
        ];
        EDGES.map(|i| c[i])
    }
}

/// Outcome of testing the player against the scene.
///
/// `normal` is not a surface normal: it points from the hit model's origin to the
/// player's origin and is only good for telling "landed on top" from "blocked".
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionResult {
    pub collided: bool,
    pub normal: Vec3,
}

impl CollisionResult {
    pub const NONE: CollisionResult = CollisionResult { collided: false, normal: Vec3::ZERO };

    pub fn hit(player_position: Vec3, model_position: Vec3) -> Self {
        Self {
            collided: true,
            normal: (player_position - model_position).normalize_or_zero(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(center: Vec3, half: f32) -> Aabb {
        Aabb::new(center - Vec3::splat(half), center + Vec3::splat(half))
    }

    #[test]
    fn overlap_is_commutative() {
        let boxes = [
            cube(Vec3::ZERO, 1.0),
            cube(Vec3::new(1.5, 0.0, 0.0), 1.0),
            cube(Vec3::new(5.0, 5.0, 5.0), 0.5),
            Aabb::new(Vec3::new(-3.0, -0.1, -3.0), Vec3::new(3.0, 0.1, 3.0)),
            cube(Vec3::new(0.0, 2.0, 0.0), 1.0),
        ];
        for a in &boxes {
            for b in &boxes {
                assert_eq!(Aabb::check_collision(a, b), Aabb::check_collision(b, a));
            }
        }
    }

    #[test]
    fn touching_boxes_collide() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::new(1.0, 0.5, 0.5), Vec3::new(2.0, 1.5, 1.5));
        assert!(Aabb::check_collision(&a, &b));
    }

    #[test]
    fn separated_on_one_axis_does_not_collide() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::new(0.0, 1.001, 0.0), Vec3::new(1.0, 2.0, 1.0));
        assert!(!Aabb::check_collision(&a, &b));
    }

    #[test]
    fn identity_transform_keeps_box() {
        let a = Aabb::new(Vec3::new(-1.0, -2.0, -3.0), Vec3::new(4.0, 5.0, 6.0));
        assert_eq!(a.transformed(&Mat4::IDENTITY), a);
    }

    #[test]
    fn quarter_turns_keep_cube_extents() {
        let a = cube(Vec3::ZERO, 0.5);
        for turns in 1..4 {
            let angle = (90.0 * turns as f32).to_radians();
            for m in [Mat4::from_rotation_x(angle), Mat4::from_rotation_y(angle), Mat4::from_rotation_z(angle)] {
                let t = a.transformed(&m);
                assert!(t.extents().abs_diff_eq(a.extents(), 1e-5));
                assert!(t.center().abs_diff_eq(a.center(), 1e-5));
            }
        }
    }

    #[test]
    fn empty_point_set_is_degenerate_at_origin() {
        assert_eq!(Aabb::from_points(std::iter::empty()), Aabb::default());
    }

    #[test]
    fn hit_normal_points_at_player() {
        let r = CollisionResult::hit(Vec3::new(0.0, 3.0, 0.0), Vec3::ZERO);
        assert!(r.collided);
        assert!(r.normal.abs_diff_eq(Vec3::Y, 1e-6));

        // Coincident origins give no direction at all.
        let r = CollisionResult::hit(Vec3::ONE, Vec3::ONE);
        assert_eq!(r.normal, Vec3::ZERO);
    }
}
