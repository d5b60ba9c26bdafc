//! Axis-aligned bounding box

use crate::core::types::Vec3;

/// Axis-aligned box, min/max corners. Chunks convert to this form for
/// frustum testing; surfaces use it for their grass-covered bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// From center and full size (the chunk representation).
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.min.x && p.x <= self.max.x
            && p.y >= self.min.y && p.y <= self.max.y
            && p.z >= self.min.z && p.z <= self.max.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_size_round_trip() {
        let aabb = Aabb::from_center_size(Vec3::splat(1.0), Vec3::splat(2.0));
        assert_eq!(aabb.min, Vec3::ZERO);
        assert_eq!(aabb.max, Vec3::splat(2.0));
        assert_eq!(aabb.center(), Vec3::splat(1.0));
        assert_eq!(aabb.size(), Vec3::splat(2.0));
    }

    #[test]
    fn test_contains_point() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert!(aabb.contains_point(Vec3::splat(0.5)));
        assert!(aabb.contains_point(Vec3::ZERO)); // boundary inclusive
        assert!(!aabb.contains_point(Vec3::splat(2.0)));
    }
}
