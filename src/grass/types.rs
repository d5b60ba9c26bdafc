//! Grass type definitions: per-type artistic parameters and the registry
//! the render pass reads them from.
//!
//! `GrassArtisticParams` is the GPU-side struct shared read-only by all
//! draw calls in a frame; the generation kernel writes a per-instance type
//! index that selects into it. The registry carries an explicit version
//! counter instead of change notifications: the render pass compares the
//! counter each frame and rebuilds the artistic buffer only on change.

use bytemuck::{Pod, Zeroable};

/// GPU-side artistic parameters for one grass type (176 bytes, 16-byte
/// aligned). Must match `ArtisticParams` in grass_data.wgsl / grass_draw.wgsl.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GrassArtisticParams {
    pub size: f32,
    pub width_min: f32,
    pub width_max: f32,
    pub jitter_strength: f32,
    // -- 16 bytes --
    pub clump_strength: f32,
    pub clump_size: f32,
    pub size_min: f32,
    pub size_max: f32,
    // -- 16 bytes --
    pub tilt_min: f32,
    pub tilt_max: f32,
    pub bend_min: f32,
    pub bend_max: f32,
    // -- 16 bytes --
    pub rotation_range: f32,
    pub face_camera_strength: f32,
    pub follow_wind_strength: f32,
    pub _pad0: f32,
    // -- 16 bytes --
    pub movement_cutoff: [f32; 2],
    pub bobbing_distance_cutoff: [f32; 2],
    // -- 16 bytes --
    pub bobbing_strength: [f32; 2],
    pub bobbing_speed: [f32; 2],
    // -- 16 bytes --
    pub bobbing_wavelength: [f32; 2],
    pub bobbing_fade: [f32; 2],
    // -- 16 bytes --
    pub tint_bottom: [f32; 3],
    pub _pad1: f32,
    pub tint_top: [f32; 3],
    pub _pad2: f32,
    pub tint_variation_a: [f32; 3],
    pub _pad3: f32,
    pub tint_variation_b: [f32; 3],
    pub _pad4: f32,
    // -- 64 bytes --
    // Total: 176 bytes
}

impl Default for GrassArtisticParams {
    fn default() -> Self {
        Self {
            size: 1.0,
            width_min: 0.7,
            width_max: 1.0,
            jitter_strength: 0.4,
            clump_strength: 0.3,
            clump_size: 0.5,
            size_min: 0.5,
            size_max: 1.0,
            tilt_min: 0.3,
            tilt_max: 0.7,
            bend_min: 0.0,
            bend_max: 1.0,
            rotation_range: 0.7,
            face_camera_strength: 0.2,
            follow_wind_strength: 1.5,
            _pad0: 0.0,
            movement_cutoff: [75.0, 100.0],
            bobbing_distance_cutoff: [40.0, 50.0],
            bobbing_strength: [0.02, 0.05],
            bobbing_speed: [15.0, 15.0],
            bobbing_wavelength: [0.2, 1.0],
            bobbing_fade: [3.0, 2.0],
            tint_bottom: [0.05, 0.35, 0.04],
            _pad1: 0.0,
            tint_top: [0.55, 0.65, 0.12],
            _pad2: 0.0,
            tint_variation_a: [1.0, 1.0, 1.0],
            _pad3: 0.0,
            tint_variation_b: [0.0, 0.0, 0.0],
            _pad4: 0.0,
        }
    }
}

/// A named grass type.
#[derive(Clone, Debug)]
pub struct GrassType {
    pub name: String,
    pub params: GrassArtisticParams,
}

impl GrassType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: GrassArtisticParams::default(),
        }
    }
}

/// Maximum number of grass types (type indices are 8-bit in the density map).
pub const MAX_GRASS_TYPES: usize = 256;

/// Ordered registry of grass types.
///
/// Every mutation bumps `version`; consumers compare it per frame to decide
/// whether the GPU-side artistic buffer needs a full rebuild.
pub struct GrassTypeRegistry {
    types: Vec<GrassType>,
    version: u64,
}

impl GrassTypeRegistry {
    /// Registry with a single default type at index 0.
    pub fn new() -> Self {
        Self {
            types: vec![GrassType::new("Default")],
            version: 0,
        }
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Change counter; bumped on every add/remove/edit.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Register a type, returning its index. Returns None when full.
    pub fn add(&mut self, grass_type: GrassType) -> Option<u8> {
        if self.types.len() >= MAX_GRASS_TYPES {
            return None;
        }
        self.types.push(grass_type);
        self.version += 1;
        Some((self.types.len() - 1) as u8)
    }

    /// Remove the type at `index`. Later indices shift down, so density-map
    /// values painted for them become stale; callers repaint or avoid
    /// removing mid-session.
    pub fn remove(&mut self, index: u8) -> Option<GrassType> {
        if (index as usize) < self.types.len() {
            self.version += 1;
            Some(self.types.remove(index as usize))
        } else {
            None
        }
    }

    pub fn get(&self, index: u8) -> Option<&GrassType> {
        self.types.get(index as usize)
    }

    /// Mutable access for runtime editing; counts as a change only when
    /// the index resolves to a type.
    pub fn get_mut(&mut self, index: u8) -> Option<&mut GrassType> {
        let entry = self.types.get_mut(index as usize);
        if entry.is_some() {
            self.version += 1;
        }
        entry
    }

    /// Flat artistic parameter data for GPU upload, in index order.
    pub fn gpu_data(&self) -> Vec<GrassArtisticParams> {
        self.types.iter().map(|t| t.params).collect()
    }

    /// The value written into the grass density map for a type index, read
    /// back by the generation kernel. Scaled by 255 so every index survives
    /// the map's 8-bit unorm quantization.
    pub fn map_value(index: u8) -> f32 {
        index as f32 / 255.0
    }
}

impl Default for GrassTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artistic_params_size() {
        assert_eq!(std::mem::size_of::<GrassArtisticParams>(), 176);
    }

    #[test]
    fn test_artistic_params_alignment() {
        assert_eq!(std::mem::size_of::<GrassArtisticParams>() % 16, 0);
    }

    #[test]
    fn test_bytemuck_cast() {
        let p = GrassArtisticParams::default();
        let bytes = bytemuck::bytes_of(&p);
        assert_eq!(bytes.len(), 176);
    }

    #[test]
    fn test_registry_starts_with_default_type() {
        let reg = GrassTypeRegistry::new();
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get(0).unwrap().name, "Default");
    }

    #[test]
    fn test_version_bumps_on_change() {
        let mut reg = GrassTypeRegistry::new();
        let v0 = reg.version();

        let idx = reg.add(GrassType::new("Dry")).unwrap();
        assert_eq!(idx, 1);
        assert!(reg.version() > v0);

        let v1 = reg.version();
        reg.get_mut(1).unwrap().params.size = 2.0;
        assert!(reg.version() > v1);

        let v2 = reg.version();
        reg.remove(1);
        assert!(reg.version() > v2);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_gpu_data_order() {
        let mut reg = GrassTypeRegistry::new();
        reg.add(GrassType::new("Dry")).unwrap();
        reg.get_mut(1).unwrap().params.size = 2.5;

        let data = reg.gpu_data();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].size, 1.0);
        assert_eq!(data[1].size, 2.5);
    }

    #[test]
    fn test_map_value() {
        assert_eq!(GrassTypeRegistry::map_value(0), 0.0);
        assert_eq!(GrassTypeRegistry::map_value(255), 1.0);
    }

    #[test]
    fn test_map_value_survives_unorm8_round_trip() {
        // The kernel reads back round(r * 255) from an 8-bit unorm texel.
        for index in 0..=255u32 {
            let texel = (GrassTypeRegistry::map_value(index as u8) * 255.0).round() / 255.0;
            let decoded = (texel * 255.0).round() as u32;
            assert_eq!(decoded, index);
        }
    }

    #[test]
    fn test_get_mut_miss_keeps_version() {
        let mut reg = GrassTypeRegistry::new();
        let v0 = reg.version();
        assert!(reg.get_mut(200).is_none());
        assert_eq!(reg.version(), v0);
    }
}
