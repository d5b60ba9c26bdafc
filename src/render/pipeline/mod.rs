//! GPU pipeline wrappers
//!
//! One struct per pipeline; each owns its shader module, bind group
//! layouts, and pipeline object, and exposes helpers for building the
//! bind groups it expects.

pub mod grass_wind;
pub mod grass_compute;
pub mod grass_draw;

pub use grass_wind::{WindPipeline, WindUniform};
pub use grass_compute::{ArgsUniform, ChunkParams, GrassComputePipeline, SurfaceGlobals};
pub use grass_draw::{GrassDrawPipeline, BladeMesh, BladeVertex};

/// Required alignment for dynamic uniform offsets.
pub const UNIFORM_STRIDE: u64 = 256;
