//! Ray type and operations

use crate::core::types::Vec3;
use super::aabb::Aabb;

/// A ray defined by origin and direction
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    /// Precomputed 1/direction for fast AABB intersection
    pub inv_direction: Vec3,
}

impl Ray {
    /// Create a new ray (direction should be normalized)
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            inv_direction: Vec3::new(
                1.0 / direction.x,
                1.0 / direction.y,
                1.0 / direction.z,
            ),
        }
    }

    /// Get point along ray at parameter t
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Ray-AABB intersection using slab method
    /// Returns Some((t_near, t_far)) if intersection, None otherwise
    pub fn intersects_aabb(&self, aabb: &Aabb) -> Option<(f32, f32)> {
        let t1 = (aabb.min - self.origin) * self.inv_direction;
        let t2 = (aabb.max - self.origin) * self.inv_direction;

        let t_min = t1.min(t2);
        let t_max = t1.max(t2);

        let t_near = t_min.x.max(t_min.y).max(t_min.z);
        let t_far = t_max.x.min(t_max.y).min(t_max.z);

        if t_near <= t_far && t_far >= 0.0 {
            Some((t_near.max(0.0), t_far))
        } else {
            None
        }
    }

    /// Distance from an origin inside `aabb` to the point where the ray leaves it
    pub fn exit_distance(&self, aabb: &Aabb) -> f32 {
        self.intersects_aabb(aabb).map_or(0.0, |(_, t_far)| t_far)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert_eq!(ray.at(2.0), Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_intersects_aabb() {
        let aabb = Aabb::new(Vec3::splat(1.0), Vec3::splat(2.0));
        let ray = Ray::new(Vec3::splat(1.5) - Vec3::X * 5.0, Vec3::X);
        let (near, far) = ray.intersects_aabb(&aabb).unwrap();
        assert!((near - 4.5).abs() < 1e-5);
        assert!((far - 5.5).abs() < 1e-5);

        let miss = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::X);
        assert!(miss.intersects_aabb(&aabb).is_none());
    }

    #[test]
    fn test_exit_distance_from_inside() {
        let aabb = Aabb::centered(Vec3::splat(2.0));
        let ray = Ray::new(Vec3::new(0.5, 0.25, 0.25), Vec3::Y);
        assert!((ray.exit_distance(&aabb) - 0.75).abs() < 1e-6);
    }
}
