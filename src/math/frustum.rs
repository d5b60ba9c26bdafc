//! View frustum for culling

use crate::core::types::{Vec3, Vec4, Mat4};
use super::aabb::Aabb;

/// A frustum plane in Hessian normal form (normal, distance from origin)
#[derive(Clone, Copy, Debug)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }
    }

    /// Signed distance from point to plane (positive = in front)
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

/// 6-plane frustum extracted from a view-projection matrix
#[derive(Clone, Copy, Debug)]
pub struct Frustum {
    pub planes: [Plane; 6], // left, right, bottom, top, near, far
}

impl Frustum {
    /// Extract frustum planes from a view-projection matrix.
    /// Uses the Gribb/Hartmann method.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        // Extract rows from the VP matrix (column-major storage)
        let rows = [
            Vec4::new(vp.col(0).x, vp.col(1).x, vp.col(2).x, vp.col(3).x),
            Vec4::new(vp.col(0).y, vp.col(1).y, vp.col(2).y, vp.col(3).y),
            Vec4::new(vp.col(0).z, vp.col(1).z, vp.col(2).z, vp.col(3).z),
            Vec4::new(vp.col(0).w, vp.col(1).w, vp.col(2).w, vp.col(3).w),
        ];

        let mut planes = [Plane { normal: Vec3::ZERO, distance: 0.0 }; 6];

        // Left:   row3 + row0
        // Right:  row3 - row0
        // Bottom: row3 + row1
        // Top:    row3 - row1
        // Near:   row3 + row2
        // Far:    row3 - row2
        let raw = [
            rows[3] + rows[0], // left
            rows[3] - rows[0], // right
            rows[3] + rows[1], // bottom
            rows[3] - rows[1], // top
            rows[3] + rows[2], // near
            rows[3] - rows[2], // far
        ];

        for (i, r) in raw.iter().enumerate() {
            let len = Vec3::new(r.x, r.y, r.z).length();
            if len > 0.0 {
                planes[i] = Plane {
                    normal: Vec3::new(r.x, r.y, r.z) / len,
                    distance: r.w / len,
                };
            }
        }

        Self { planes }
    }

    /// Check if point is inside frustum
    pub fn contains_point(&self, point: Vec3) -> bool {
        for plane in &self.planes {
            if plane.distance_to_point(point) < 0.0 {
                return false;
            }
        }
        true
    }

    /// Test if an AABB intersects the frustum (conservative test).
    /// Returns true if the AABB is at least partially inside.
    pub fn test_aabb(&self, aabb: &Aabb) -> bool {
        for plane in &self.planes {
            // Find the positive vertex (most in the direction of the plane normal)
            let p = Vec3::new(
                if plane.normal.x >= 0.0 { aabb.max.x } else { aabb.min.x },
                if plane.normal.y >= 0.0 { aabb.max.y } else { aabb.min.y },
                if plane.normal.z >= 0.0 { aabb.max.z } else { aabb.min.z },
            );

            // If the positive vertex is behind the plane, AABB is fully outside
            if plane.distance_to_point(p) < 0.0 {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_distance() {
        let plane = Plane::new(Vec3::Y, 0.0); // XZ plane
        assert_eq!(plane.distance_to_point(Vec3::new(0.0, 5.0, 0.0)), 5.0);
        assert_eq!(plane.distance_to_point(Vec3::new(0.0, -3.0, 0.0)), -3.0);
    }

    #[test]
    fn test_frustum_extraction() {
        let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_3, 1.0, 0.1, 100.0);
        let frustum = Frustum::from_view_projection(&proj);

        // All 6 planes should be normalized
        for plane in &frustum.planes {
            assert!(plane.normal.length() > 0.9, "Plane normal should be normalized");
        }
    }

    #[test]
    fn test_frustum_contains_point() {
        let proj = Mat4::orthographic_rh(-1.0, 1.0, -1.0, 1.0, 0.1, 100.0);
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let frustum = Frustum::from_view_projection(&(proj * view));

        assert!(frustum.contains_point(Vec3::ZERO));
    }

    #[test]
    fn test_aabb_inside_frustum() {
        let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_3, 1.0, 0.1, 100.0);
        let frustum = Frustum::from_view_projection(&proj);

        // A box directly in front of the camera should be visible
        let visible = frustum.test_aabb(&Aabb::new(
            Vec3::new(-1.0, -1.0, -10.0),
            Vec3::new(1.0, 1.0, -5.0),
        ));
        assert!(visible, "Box in front of camera should be visible");
    }

    #[test]
    fn test_aabb_behind_frustum() {
        let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_3, 1.0, 0.1, 100.0);
        let frustum = Frustum::from_view_projection(&proj);

        // A box behind the camera should be culled
        let visible = frustum.test_aabb(&Aabb::new(
            Vec3::new(-1.0, -1.0, 5.0),
            Vec3::new(1.0, 1.0, 10.0),
        ));
        assert!(!visible, "Box behind camera should be culled");
    }

    #[test]
    fn test_aabb_far_outside() {
        let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_3, 1.0, 0.1, 100.0);
        let frustum = Frustum::from_view_projection(&proj);

        // A box way to the left should be culled
        let visible = frustum.test_aabb(&Aabb::new(
            Vec3::new(-1000.0, -1.0, -10.0),
            Vec3::new(-999.0, 1.0, -5.0),
        ));
        assert!(!visible, "Box far to the left should be culled");
    }
}
