//! Grass configuration (user-facing global settings).
//!
//! Per-type settings (blade shape, tint, sway) are managed through
//! `GrassTypeRegistry` in `types.rs`.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

use crate::core::types::Result;
use crate::core::Error;

/// User-facing grass configuration (global settings only).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GrassConfig {
    /// Maximum world-space size of a base chunk in meters.
    pub max_chunk_size: f32,
    /// Extra vertical padding added to chunk height, tolerating geometry
    /// slightly below or above nominal terrain height.
    pub chunk_height_padding: f32,
    /// Wind map texels per world unit.
    pub wind_map_texel_per_unit: f32,
    /// Grass density map texels per world unit.
    pub grass_map_texel_per_unit: f32,
    /// Blade instances per axis per chunk (instance count = density squared).
    pub grass_density: u32,
    /// Maximum render distance in meters.
    pub render_distance: f32,
    /// Chunk subdivision distance thresholds, applied in declared order.
    pub subdivision_distances: Vec<f32>,
}

impl Default for GrassConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 50.0,
            chunk_height_padding: 3.0,
            wind_map_texel_per_unit: 1.0,
            grass_map_texel_per_unit: 1.0,
            grass_density: 100,
            render_distance: 250.0,
            subdivision_distances: vec![50.0, 100.0, 150.0],
        }
    }
}

/// Upper bound on `grass_density` (instance buffers scale with its square).
pub const MAX_GRASS_DENSITY: u32 = 256;

impl GrassConfig {
    /// Check the configuration for degenerate values.
    ///
    /// Configuration errors are surfaced here once rather than mid-frame;
    /// callers skip rendering until the owner corrects the config.
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_size <= 0.0 {
            return Err(Error::Config(format!(
                "max_chunk_size must be positive, got {}",
                self.max_chunk_size
            )));
        }
        if self.chunk_height_padding < 0.0 {
            return Err(Error::Config(format!(
                "chunk_height_padding must be non-negative, got {}",
                self.chunk_height_padding
            )));
        }
        if self.grass_density == 0 || self.grass_density > MAX_GRASS_DENSITY {
            return Err(Error::Config(format!(
                "grass_density must be in 1..={}, got {}",
                MAX_GRASS_DENSITY, self.grass_density
            )));
        }
        if self.wind_map_texel_per_unit <= 0.0 || self.grass_map_texel_per_unit <= 0.0 {
            return Err(Error::Config(
                "texel_per_unit values must be positive".into(),
            ));
        }
        if self.render_distance < 0.0 {
            return Err(Error::Config(format!(
                "render_distance must be non-negative, got {}",
                self.render_distance
            )));
        }
        Ok(())
    }

    /// Save to file as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from a JSON file, then validate.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(GrassConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_density_rejected() {
        let mut cfg = GrassConfig::default();
        cfg.grass_density = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_oversized_density_rejected() {
        let mut cfg = GrassConfig::default();
        cfg.grass_density = MAX_GRASS_DENSITY + 1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_degenerate_chunk_size_rejected() {
        let mut cfg = GrassConfig::default();
        cfg.max_chunk_size = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let cfg = GrassConfig::default();
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        let back: GrassConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.grass_density, cfg.grass_density);
        assert_eq!(back.subdivision_distances, cfg.subdivision_distances);
    }
}
