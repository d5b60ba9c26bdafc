//! Grass surface abstraction.
//!
//! A surface supplies world-space bounds, a heightmap, a grass density map,
//! and a wind map; it owns the chunk grid derived from its bounds. The
//! render pass depends only on the `Surface` trait, so terrain-backed and
//! mesh-backed variants stay interchangeable.

pub mod terrain;

pub use terrain::HeightmapSurface;

use crate::core::types::{Result, UVec2};
use crate::grass::chunk::ChunkGrid;
use crate::math::Aabb;

/// Heightmap resource handle plus the metadata the kernels need.
pub struct HeightmapBinding<'a> {
    pub view: &'a wgpu::TextureView,
    pub resolution: UVec2,
    /// Vertical scale applied to sampled height values.
    pub height_scale: f32,
}

/// A texture resource handle with its cached resolution.
pub struct MapBinding<'a> {
    pub view: &'a wgpu::TextureView,
    pub resolution: UVec2,
}

/// Capability interface every grass surface implements.
pub trait Surface {
    /// Stable display name (used in pass labels and logging).
    fn name(&self) -> &str;

    /// World-space bounds of the grass-covered volume.
    fn bounds(&self) -> Aabb;

    /// The base chunk grid; rebuilt by the surface whenever bounds change.
    fn grid(&self) -> &ChunkGrid;

    fn heightmap(&self) -> HeightmapBinding<'_>;

    fn grass_map(&self) -> MapBinding<'_>;

    /// Storage-writable wind field texture, regenerated once per frame.
    fn wind_map(&self) -> MapBinding<'_>;

    /// Re-check cached resolutions against the live resources, recreating
    /// stale views. Called once per frame before dispatch.
    fn revalidate(&mut self, device: &wgpu::Device) -> Result<()>;

    /// Release surface-owned resources.
    fn dispose(&mut self);
}

/// Handle for a registered surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceId(usize);

/// Explicit registry of active surfaces, passed to the render pass by
/// reference at frame time.
pub struct SurfaceRegistry {
    surfaces: Vec<Option<Box<dyn Surface>>>,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self { surfaces: Vec::new() }
    }

    /// Register a surface, returning its handle.
    pub fn add(&mut self, surface: Box<dyn Surface>) -> SurfaceId {
        // Reuse the first free slot so ids stay stable across removals.
        for (i, slot) in self.surfaces.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(surface);
                return SurfaceId(i);
            }
        }
        self.surfaces.push(Some(surface));
        SurfaceId(self.surfaces.len() - 1)
    }

    /// Remove and dispose a surface.
    pub fn remove(&mut self, id: SurfaceId) -> bool {
        match self.surfaces.get_mut(id.0) {
            Some(slot @ Some(_)) => {
                if let Some(mut surface) = slot.take() {
                    surface.dispose();
                }
                true
            }
            _ => false,
        }
    }

    pub fn get_mut(&mut self, id: SurfaceId) -> Option<&mut dyn Surface> {
        match self.surfaces.get_mut(id.0) {
            Some(Some(surface)) => Some(&mut **surface),
            _ => None,
        }
    }

    /// Number of registered surfaces.
    pub fn len(&self) -> usize {
        self.surfaces.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over all registered surfaces.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Surface>> {
        self.surfaces.iter_mut().filter_map(|s| s.as_mut())
    }
}

impl Default for SurfaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec3;

    struct StubSurface {
        name: String,
        disposed: bool,
        grid: ChunkGrid,
    }

    impl StubSurface {
        fn new(name: &str) -> Self {
            let bounds = Aabb::new(Vec3::ZERO, Vec3::new(10.0, 1.0, 10.0));
            Self {
                name: name.into(),
                disposed: false,
                grid: ChunkGrid::build(&bounds, 10.0, 0.0).unwrap(),
            }
        }
    }

    impl Surface for StubSurface {
        fn name(&self) -> &str {
            &self.name
        }
        fn bounds(&self) -> Aabb {
            Aabb::new(Vec3::ZERO, Vec3::new(10.0, 1.0, 10.0))
        }
        fn grid(&self) -> &ChunkGrid {
            &self.grid
        }
        fn heightmap(&self) -> HeightmapBinding<'_> {
            unimplemented!("not used in registry tests")
        }
        fn grass_map(&self) -> MapBinding<'_> {
            unimplemented!("not used in registry tests")
        }
        fn wind_map(&self) -> MapBinding<'_> {
            unimplemented!("not used in registry tests")
        }
        fn revalidate(&mut self, _device: &wgpu::Device) -> Result<()> {
            Ok(())
        }
        fn dispose(&mut self) {
            self.disposed = true;
        }
    }

    #[test]
    fn test_add_remove() {
        let mut reg = SurfaceRegistry::new();
        let a = reg.add(Box::new(StubSurface::new("a")));
        let b = reg.add(Box::new(StubSurface::new("b")));
        assert_ne!(a, b);
        assert_eq!(reg.len(), 2);

        assert!(reg.remove(a));
        assert_eq!(reg.len(), 1);
        assert!(!reg.remove(a)); // already gone
    }

    #[test]
    fn test_slot_reuse_keeps_ids_stable() {
        let mut reg = SurfaceRegistry::new();
        let a = reg.add(Box::new(StubSurface::new("a")));
        let b = reg.add(Box::new(StubSurface::new("b")));
        reg.remove(a);
        let c = reg.add(Box::new(StubSurface::new("c")));
        assert_eq!(c, a); // freed slot reused
        assert!(reg.get_mut(b).is_some());
        assert_eq!(reg.get_mut(c).unwrap().name(), "c");
    }

    #[test]
    fn test_get_mut_after_remove() {
        let mut reg = SurfaceRegistry::new();
        let a = reg.add(Box::new(StubSurface::new("a")));
        assert!(reg.get_mut(a).is_some());
        reg.remove(a);
        assert!(reg.get_mut(a).is_none());
    }

    #[test]
    fn test_iter_skips_removed() {
        let mut reg = SurfaceRegistry::new();
        reg.add(Box::new(StubSurface::new("a")));
        let b = reg.add(Box::new(StubSurface::new("b")));
        reg.remove(b);
        let names: Vec<_> = reg.iter_mut().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["a"]);
    }
}
