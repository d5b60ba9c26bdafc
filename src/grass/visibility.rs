//! Per-frame adaptive chunk visibility.
//!
//! Range-query the grid around the camera, frustum-cull, then iteratively
//! subdivide chunks near the camera and re-cull once if anything split.
//! The result is ephemeral: the grid itself is never mutated.

use crate::core::types::{IVec2, Vec3};
use crate::grass::chunk::{ChunkGrid, GrassChunk};
use crate::math::Frustum;

/// Computes the per-frame set of chunks to render.
///
/// Re-uses allocations across frames to avoid per-frame heap churn.
pub struct ChunkVisibility {
    working: Vec<GrassChunk>,
    scratch: Vec<GrassChunk>,
}

impl ChunkVisibility {
    pub fn new() -> Self {
        Self {
            working: Vec::new(),
            scratch: Vec::new(),
        }
    }

    /// Select the chunks visible this frame.
    ///
    /// Subdivision thresholds are applied in declared order; a chunk split
    /// by an earlier (larger) threshold can be split again by a later
    /// (smaller) one. Culling runs once up front and once more at the end
    /// only if any subdivision happened, so downstream GPU work is never
    /// spent on children that fell outside the frustum.
    ///
    /// The returned slice is valid until the next call. Order is stable
    /// within a call; no chunk lies outside the frustum.
    pub fn select(
        &mut self,
        grid: &ChunkGrid,
        camera_pos: Vec3,
        frustum: &Frustum,
        render_distance: f32,
        subdivision_distances: &[f32],
    ) -> &[GrassChunk] {
        self.working.clear();

        if render_distance <= 0.0 {
            return &self.working;
        }

        let cell = grid.cell_size();
        let radius = IVec2::new(
            (render_distance / cell.x).ceil() as i32,
            (render_distance / cell.z).ceil() as i32,
        );

        grid.range_query(grid.cell_coord(camera_pos), radius, &mut self.working);

        Self::cull(&mut self.working, &mut self.scratch, frustum);

        let mut changed = false;
        for &distance in subdivision_distances {
            changed |= Self::subdivide_within(&mut self.working, camera_pos, distance);
        }

        // Children of an on-screen parent may individually be off-screen.
        if changed {
            Self::cull(&mut self.working, &mut self.scratch, frustum);
        }

        &self.working
    }

    fn cull(chunks: &mut Vec<GrassChunk>, scratch: &mut Vec<GrassChunk>, frustum: &Frustum) {
        scratch.clear();
        scratch.extend(chunks.iter().filter(|c| frustum.test_aabb(&c.aabb())));
        std::mem::swap(chunks, scratch);
    }

    /// Replace every chunk within `distance` of `point` by its 4 children.
    /// One pass only: chunks appended here are not revisited until the next
    /// threshold.
    fn subdivide_within(chunks: &mut Vec<GrassChunk>, point: Vec3, distance: f32) -> bool {
        let count = chunks.len();
        let mut changed = false;

        for i in 0..count {
            let chunk = chunks[i];

            if point.distance(chunk.center) > distance {
                continue;
            }

            changed = true;

            let children = chunk.subdivide();
            chunks[i] = children[0];
            chunks.extend_from_slice(&children[1..]);
        }

        changed
    }
}

impl Default for ChunkVisibility {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Mat4;
    use crate::math::Aabb;

    fn grid_2x2() -> ChunkGrid {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(100.0, 10.0, 100.0));
        ChunkGrid::build(&bounds, 50.0, 0.0).unwrap()
    }

    /// A frustum whose planes all face inward from very far away, so every
    /// chunk passes the AABB test.
    fn open_frustum() -> Frustum {
        Frustum::from_view_projection(&Mat4::orthographic_rh(
            -1e6, 1e6, -1e6, 1e6, -1e6, 1e6,
        ))
    }

    fn camera_above_center() -> Vec3 {
        Vec3::new(50.0, 30.0, 50.0)
    }

    #[test]
    fn test_no_subdivision_returns_culled_base_chunks() {
        let grid = grid_2x2();
        let mut vis = ChunkVisibility::new();
        let chunks = vis.select(&grid, camera_above_center(), &open_frustum(), 250.0, &[]);

        assert_eq!(chunks.len(), 4);
        for chunk in chunks {
            assert!(grid.chunks().contains(chunk));
        }
    }

    #[test]
    fn test_zero_render_distance_is_empty() {
        let grid = grid_2x2();
        let mut vis = ChunkVisibility::new();
        let chunks = vis.select(&grid, camera_above_center(), &open_frustum(), 0.0, &[50.0]);
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_camera_far_outside_grid_is_empty() {
        let grid = grid_2x2();
        let mut vis = ChunkVisibility::new();
        // Radius 1 cell around a cell far outside the grid clamps to an
        // empty range.
        let chunks = vis.select(
            &grid,
            Vec3::new(10_000.0, 0.0, 10_000.0),
            &open_frustum(),
            50.0,
            &[],
        );
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_single_threshold_subdivides_all_in_range() {
        let grid = grid_2x2();
        let mut vis = ChunkVisibility::new();

        // Every base chunk center is within ~36m of the camera's XZ position;
        // a 100m threshold covers them all.
        let chunks = vis.select(
            &grid,
            camera_above_center(),
            &open_frustum(),
            250.0,
            &[100.0],
        );

        assert_eq!(chunks.len(), 16);
        for chunk in chunks {
            assert_eq!(chunk.size.x, 25.0);
            assert_eq!(chunk.size.z, 25.0);
            assert_eq!(chunk.size.y, 10.0); // height unchanged
        }
    }

    #[test]
    fn test_repeated_thresholds_refine_further() {
        let grid = grid_2x2();
        let mut vis = ChunkVisibility::new();

        // Second (smaller) threshold re-splits the children near the camera.
        let chunks = vis.select(
            &grid,
            camera_above_center(),
            &open_frustum(),
            250.0,
            &[100.0, 100.0],
        );

        assert_eq!(chunks.len(), 64);
    }

    #[test]
    fn test_threshold_out_of_range_changes_nothing() {
        let grid = grid_2x2();
        let mut vis = ChunkVisibility::new();
        let chunks = vis.select(
            &grid,
            camera_above_center(),
            &open_frustum(),
            250.0,
            &[1.0],
        );
        assert_eq!(chunks.len(), 4);
    }

    #[test]
    fn test_result_never_outside_frustum() {
        let grid = grid_2x2();
        let mut vis = ChunkVisibility::new();

        // Perspective camera above the grid center looking down +X-ish.
        let camera_pos = Vec3::new(50.0, 20.0, 50.0);
        let view = Mat4::look_at_rh(camera_pos, Vec3::new(90.0, 0.0, 50.0), Vec3::Y);
        let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_3, 1.0, 0.1, 500.0);
        let frustum = Frustum::from_view_projection(&(proj * view));

        let chunks = vis.select(&grid, camera_pos, &frustum, 250.0, &[60.0, 30.0]);

        assert!(!chunks.is_empty());
        for chunk in chunks {
            assert!(frustum.test_aabb(&chunk.aabb()));
        }
    }

    #[test]
    fn test_no_duplicates() {
        let grid = grid_2x2();
        let mut vis = ChunkVisibility::new();
        let chunks = vis
            .select(&grid, camera_above_center(), &open_frustum(), 250.0, &[100.0])
            .to_vec();

        for (i, a) in chunks.iter().enumerate() {
            for b in chunks.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
