//! Terrain-backed grass surface.
//!
//! Wraps an externally owned heightmap texture and allocates the grass
//! density map and wind map sized from the surface footprint. The chunk
//! grid is rebuilt whenever bounds change; cached resolutions are
//! revalidated once per frame in case the heightmap was reallocated.

use crate::core::types::{Result, UVec2, Vec2};
use crate::grass::chunk::ChunkGrid;
use crate::grass::config::GrassConfig;
use crate::math::Aabb;
use crate::surface::{HeightmapBinding, MapBinding, Surface};

/// Largest texture edge we will allocate for generated maps.
pub const MAX_TEXTURE_RESOLUTION: u32 = 8192;

/// Grass density map format (type index + density per texel).
pub const GRASS_MAP_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Wind field format, written by the wind kernel each frame.
pub const WIND_MAP_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Wind map resolution from footprint size: per-axis texel density, clamped.
pub fn wind_map_resolution(size: Vec2, texel_per_unit: f32) -> UVec2 {
    UVec2::new(
        ((size.x * texel_per_unit).ceil() as u32).clamp(1, MAX_TEXTURE_RESOLUTION),
        ((size.y * texel_per_unit).ceil() as u32).clamp(1, MAX_TEXTURE_RESOLUTION),
    )
}

/// Grass map resolution from footprint size: square, next power of two of
/// the larger axis, clamped.
pub fn grass_map_resolution(size: Vec2, texel_per_unit: f32) -> u32 {
    let texels = (size.x.max(size.y) * texel_per_unit).ceil().max(1.0) as u32;
    texels.next_power_of_two().min(MAX_TEXTURE_RESOLUTION)
}

/// A grass surface backed by a terrain heightmap.
pub struct HeightmapSurface {
    name: String,
    bounds: Aabb,
    grid: ChunkGrid,

    heightmap: wgpu::Texture,
    heightmap_view: wgpu::TextureView,
    heightmap_resolution: UVec2,
    height_scale: f32,

    grass_map: wgpu::Texture,
    grass_map_view: wgpu::TextureView,
    grass_map_resolution: UVec2,

    wind_map: wgpu::Texture,
    wind_map_view: wgpu::TextureView,
    wind_map_resolution: UVec2,

    wind_map_texel_per_unit: f32,
}

impl HeightmapSurface {
    /// Create a surface over `heightmap`, allocating its grass and wind
    /// maps from the configured texel densities.
    ///
    /// `height_scale` is the world-space height represented by a heightmap
    /// value of 1.0.
    pub fn new(
        device: &wgpu::Device,
        config: &GrassConfig,
        name: impl Into<String>,
        heightmap: wgpu::Texture,
        height_scale: f32,
        bounds: Aabb,
    ) -> Result<Self> {
        let name = name.into();
        let grid = ChunkGrid::build(&bounds, config.max_chunk_size, config.chunk_height_padding)?;

        let heightmap_view = heightmap.create_view(&wgpu::TextureViewDescriptor::default());
        let heightmap_resolution = UVec2::new(heightmap.width(), heightmap.height());

        let footprint = Vec2::new(bounds.size().x, bounds.size().z);

        let grass_res = grass_map_resolution(footprint, config.grass_map_texel_per_unit);
        let grass_map = create_map_texture(
            device,
            &format!("{name}_grass_map"),
            UVec2::splat(grass_res),
            GRASS_MAP_FORMAT,
        );
        let grass_map_view = grass_map.create_view(&wgpu::TextureViewDescriptor::default());

        let wind_res = wind_map_resolution(footprint, config.wind_map_texel_per_unit);
        let wind_map = create_map_texture(device, &format!("{name}_wind_map"), wind_res, WIND_MAP_FORMAT);
        let wind_map_view = wind_map.create_view(&wgpu::TextureViewDescriptor::default());

        log::debug!(
            "surface '{}': grid {:?}, grass map {}x{}, wind map {}x{}",
            name,
            grid.resolution(),
            grass_res,
            grass_res,
            wind_res.x,
            wind_res.y
        );

        Ok(Self {
            name,
            bounds,
            grid,
            heightmap,
            heightmap_view,
            heightmap_resolution,
            height_scale,
            grass_map,
            grass_map_view,
            grass_map_resolution: UVec2::splat(grass_res),
            wind_map,
            wind_map_view,
            wind_map_resolution: wind_res,
            wind_map_texel_per_unit: config.wind_map_texel_per_unit,
        })
    }

    /// Replace the surface bounds (terrain moved or heightmap reloaded):
    /// rebuilds the chunk grid and reallocates the wind map, whose
    /// resolution tracks the footprint. The painted grass map is kept.
    pub fn set_bounds(
        &mut self,
        device: &wgpu::Device,
        config: &GrassConfig,
        bounds: Aabb,
    ) -> Result<()> {
        self.grid = ChunkGrid::build(&bounds, config.max_chunk_size, config.chunk_height_padding)?;
        self.bounds = bounds;

        let footprint = Vec2::new(bounds.size().x, bounds.size().z);
        let wind_res = wind_map_resolution(footprint, config.wind_map_texel_per_unit);
        if wind_res != self.wind_map_resolution {
            self.wind_map =
                create_map_texture(device, &format!("{}_wind_map", self.name), wind_res, WIND_MAP_FORMAT);
            self.wind_map_view = self.wind_map.create_view(&wgpu::TextureViewDescriptor::default());
            self.wind_map_resolution = wind_res;
        }
        self.wind_map_texel_per_unit = config.wind_map_texel_per_unit;
        Ok(())
    }

    /// Swap in a new heightmap texture (e.g. after terrain editing).
    pub fn replace_heightmap(&mut self, heightmap: wgpu::Texture, height_scale: f32) {
        self.heightmap_view = heightmap.create_view(&wgpu::TextureViewDescriptor::default());
        self.heightmap_resolution = UVec2::new(heightmap.width(), heightmap.height());
        self.heightmap = heightmap;
        self.height_scale = height_scale;
    }

    /// Grass map texture for painting tools.
    pub fn grass_map_texture(&self) -> &wgpu::Texture {
        &self.grass_map
    }
}

impl Surface for HeightmapSurface {
    fn name(&self) -> &str {
        &self.name
    }

    fn bounds(&self) -> Aabb {
        self.bounds
    }

    fn grid(&self) -> &ChunkGrid {
        &self.grid
    }

    fn heightmap(&self) -> HeightmapBinding<'_> {
        HeightmapBinding {
            view: &self.heightmap_view,
            resolution: self.heightmap_resolution,
            height_scale: self.height_scale,
        }
    }

    fn grass_map(&self) -> MapBinding<'_> {
        MapBinding {
            view: &self.grass_map_view,
            resolution: self.grass_map_resolution,
        }
    }

    fn wind_map(&self) -> MapBinding<'_> {
        MapBinding {
            view: &self.wind_map_view,
            resolution: self.wind_map_resolution,
        }
    }

    fn revalidate(&mut self, _device: &wgpu::Device) -> Result<()> {
        // The heightmap is externally owned; its texture may have been
        // reallocated at a different resolution since last frame.
        let live = UVec2::new(self.heightmap.width(), self.heightmap.height());
        if live != self.heightmap_resolution {
            log::debug!(
                "surface '{}': heightmap resolution changed {:?} -> {:?}",
                self.name,
                self.heightmap_resolution,
                live
            );
            self.heightmap_view = self.heightmap.create_view(&wgpu::TextureViewDescriptor::default());
            self.heightmap_resolution = live;
        }
        Ok(())
    }

    fn dispose(&mut self) {
        // Texture memory is reclaimed when the handles drop; in-flight GPU
        // work holds its own references until completion.
        log::debug!("surface '{}' disposed", self.name);
    }
}

fn create_map_texture(
    device: &wgpu::Device,
    label: &str,
    resolution: UVec2,
    format: wgpu::TextureFormat,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: resolution.x,
            height: resolution.y,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::STORAGE_BINDING
            | wgpu::TextureUsages::COPY_DST
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}
