//! Spatial chunking of a grass surface.
//!
//! A surface's bounding volume is partitioned into a regular grid of
//! axis-aligned chunks at registration time. Chunks are cheap value types;
//! per-frame refinement (`visibility.rs`) copies and splits them without
//! ever touching the grid.

use crate::core::types::{IVec2, Result, Vec3};
use crate::core::Error;
use crate::math::Aabb;

/// An axis-aligned box region of a surface, the unit of visibility and
/// batching. Immutable once created.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GrassChunk {
    pub center: Vec3,
    pub size: Vec3,
}

impl GrassChunk {
    /// Split into 4 equal-area XZ quadrants with unchanged height.
    ///
    /// Children are centered at `center ± (size.x/4, 0, size.z/4)` in the
    /// four sign combinations, each with half the parent's X/Z size.
    pub fn subdivide(&self) -> [GrassChunk; 4] {
        let quarter_x = self.size.x * 0.25;
        let quarter_z = self.size.z * 0.25;
        let child_size = Vec3::new(self.size.x * 0.5, self.size.y, self.size.z * 0.5);

        let child = |sx: f32, sz: f32| GrassChunk {
            center: self.center + Vec3::new(quarter_x * sx, 0.0, quarter_z * sz),
            size: child_size,
        };

        [
            child(-1.0, -1.0),
            child(-1.0, 1.0),
            child(1.0, -1.0),
            child(1.0, 1.0),
        ]
    }

    /// World-space bounds of the chunk.
    pub fn aabb(&self) -> Aabb {
        Aabb::from_center_size(self.center, self.size)
    }
}

/// Regular grid of base chunks tiling a surface footprint.
///
/// Rebuilt whenever the surface's bounds change; never partially updated.
pub struct ChunkGrid {
    /// Chunk counts along X and Z.
    resolution: IVec2,
    /// Per-cell size; height is the surface height plus padding.
    cell_size: Vec3,
    /// World-space minimum corner of the surface bounds.
    origin: Vec3,
    /// Flat row-major chunk storage, index = x * resolution.y + z.
    chunks: Vec<GrassChunk>,
}

impl ChunkGrid {
    /// Partition `bounds` into a grid of chunks no larger than
    /// `max_chunk_size` along X/Z.
    ///
    /// Fails only on a degenerate (zero or negative) XZ footprint.
    pub fn build(bounds: &Aabb, max_chunk_size: f32, height_padding: f32) -> Result<Self> {
        let size = bounds.size();

        if size.x <= 0.0 || size.z <= 0.0 || max_chunk_size <= 0.0 {
            return Err(Error::Config(format!(
                "degenerate surface footprint {}x{} (max_chunk_size {})",
                size.x, size.z, max_chunk_size
            )));
        }

        let resolution = IVec2::new(
            (size.x / max_chunk_size).ceil().max(1.0) as i32,
            (size.z / max_chunk_size).ceil().max(1.0) as i32,
        );

        let cell_size = Vec3::new(
            size.x / resolution.x as f32,
            size.y + height_padding,
            size.z / resolution.y as f32,
        );

        let origin = bounds.min;
        let mut chunks = Vec::with_capacity((resolution.x * resolution.y) as usize);

        for x in 0..resolution.x {
            for z in 0..resolution.y {
                chunks.push(GrassChunk {
                    center: Vec3::new(
                        origin.x + (x as f32 + 0.5) * cell_size.x,
                        origin.y + size.y * 0.5,
                        origin.z + (z as f32 + 0.5) * cell_size.z,
                    ),
                    size: cell_size,
                });
            }
        }

        Ok(Self {
            resolution,
            cell_size,
            origin,
            chunks,
        })
    }

    /// Chunk counts along X and Z.
    pub fn resolution(&self) -> IVec2 {
        self.resolution
    }

    /// Per-cell world size (height includes the padding).
    pub fn cell_size(&self) -> Vec3 {
        self.cell_size
    }

    /// All base chunks in row-major order.
    pub fn chunks(&self) -> &[GrassChunk] {
        &self.chunks
    }

    /// Convert a world position to grid cell coordinates (unclamped).
    pub fn cell_coord(&self, world: Vec3) -> IVec2 {
        IVec2::new(
            ((world.x - self.origin.x) / self.cell_size.x).floor() as i32,
            ((world.z - self.origin.z) / self.cell_size.z).floor() as i32,
        )
    }

    /// Collect base chunks whose coordinates lie within `center ± radius`
    /// on both axes, clamped to the grid. An empty clamped range yields
    /// nothing.
    pub fn range_query(&self, center: IVec2, radius: IVec2, out: &mut Vec<GrassChunk>) {
        let min_x = (center.x - radius.x).max(0);
        let min_z = (center.y - radius.y).max(0);
        let max_x = (center.x + radius.x).min(self.resolution.x - 1);
        let max_z = (center.y + radius.y).min(self.resolution.y - 1);

        for x in min_x..=max_x {
            for z in min_z..=max_z {
                out.push(self.chunks[(x * self.resolution.y + z) as usize]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_100x100() -> ChunkGrid {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(100.0, 10.0, 100.0));
        ChunkGrid::build(&bounds, 50.0, 3.0).unwrap()
    }

    #[test]
    fn test_build_resolution() {
        let grid = grid_100x100();
        assert_eq!(grid.resolution(), IVec2::new(2, 2));
        assert_eq!(grid.chunks().len(), 4);
        assert_eq!(grid.cell_size(), Vec3::new(50.0, 13.0, 50.0));
    }

    #[test]
    fn test_build_rounds_up() {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(101.0, 10.0, 49.0));
        let grid = ChunkGrid::build(&bounds, 50.0, 0.0).unwrap();
        assert_eq!(grid.resolution(), IVec2::new(3, 1));
    }

    #[test]
    fn test_build_degenerate_bounds() {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(0.0, 10.0, 100.0));
        assert!(ChunkGrid::build(&bounds, 50.0, 3.0).is_err());
    }

    #[test]
    fn test_chunks_tile_footprint_exactly() {
        let bounds = Aabb::new(
            Vec3::new(-30.0, 0.0, 10.0),
            Vec3::new(90.0, 20.0, 130.0),
        );
        let grid = ChunkGrid::build(&bounds, 45.0, 2.0).unwrap();
        let res = grid.resolution();
        let cell = grid.cell_size();

        // Union of projected chunk AABBs equals the footprint: every chunk's
        // XZ extent must line up exactly with its grid cell.
        for x in 0..res.x {
            for z in 0..res.y {
                let chunk = grid.chunks()[(x * res.y + z) as usize];
                let aabb = chunk.aabb();
                let expected_min_x = bounds.min.x + x as f32 * cell.x;
                let expected_min_z = bounds.min.z + z as f32 * cell.z;
                assert!((aabb.min.x - expected_min_x).abs() < 1e-3);
                assert!((aabb.min.z - expected_min_z).abs() < 1e-3);
                assert!((aabb.max.x - (expected_min_x + cell.x)).abs() < 1e-3);
                assert!((aabb.max.z - (expected_min_z + cell.z)).abs() < 1e-3);
            }
        }

        // Outer edges match the bounds.
        let total_x = res.x as f32 * cell.x;
        let total_z = res.y as f32 * cell.z;
        assert!((total_x - bounds.size().x).abs() < 1e-3);
        assert!((total_z - bounds.size().z).abs() < 1e-3);
    }

    #[test]
    fn test_subdivide_geometry() {
        let parent = GrassChunk {
            center: Vec3::new(10.0, 5.0, -20.0),
            size: Vec3::new(40.0, 13.0, 20.0),
        };
        let children = parent.subdivide();

        let parent_area = parent.size.x * parent.size.z;
        let mut child_area = 0.0;
        for child in &children {
            assert_eq!(child.size, Vec3::new(20.0, 13.0, 10.0));
            assert_eq!(child.center.y, parent.center.y);
            assert_eq!((child.center.x - parent.center.x).abs(), 10.0);
            assert_eq!((child.center.z - parent.center.z).abs(), 5.0);
            child_area += child.size.x * child.size.z;
        }
        assert!((child_area - parent_area).abs() < 1e-3);

        // All four sign combinations present.
        let mut signs: Vec<(bool, bool)> = children
            .iter()
            .map(|c| {
                (
                    c.center.x > parent.center.x,
                    c.center.z > parent.center.z,
                )
            })
            .collect();
        signs.sort();
        signs.dedup();
        assert_eq!(signs.len(), 4);
    }

    #[test]
    fn test_cell_coord() {
        let grid = grid_100x100();
        assert_eq!(grid.cell_coord(Vec3::new(10.0, 0.0, 10.0)), IVec2::new(0, 0));
        assert_eq!(grid.cell_coord(Vec3::new(60.0, 0.0, 75.0)), IVec2::new(1, 1));
        assert_eq!(grid.cell_coord(Vec3::new(-10.0, 0.0, 10.0)), IVec2::new(-1, 0));
    }

    #[test]
    fn test_range_query_clamps() {
        let grid = grid_100x100();
        let mut out = Vec::new();
        grid.range_query(IVec2::new(0, 0), IVec2::new(5, 5), &mut out);
        assert_eq!(out.len(), 4); // whole 2x2 grid

        out.clear();
        grid.range_query(IVec2::new(0, 0), IVec2::new(0, 0), &mut out);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_range_query_outside_grid_is_empty() {
        let grid = grid_100x100();
        let mut out = Vec::new();
        grid.range_query(IVec2::new(100, 100), IVec2::new(1, 1), &mut out);
        assert!(out.is_empty());
    }
}
