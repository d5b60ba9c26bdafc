//! Grass system: configuration, spatial chunking, per-frame visibility,
//! and grass-type artistic parameters.
//!
//! The CPU side stops at producing a per-frame chunk list; everything
//! per-blade happens in the compute kernels under `render::pipeline`.

pub mod config;
pub mod chunk;
pub mod visibility;
pub mod types;

pub use config::GrassConfig;
pub use chunk::{GrassChunk, ChunkGrid};
pub use visibility::ChunkVisibility;
pub use types::{GrassType, GrassTypeRegistry, GrassArtisticParams};
