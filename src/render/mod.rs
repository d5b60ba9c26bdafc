//! Rendering system and GPU interfaces

pub mod context;
pub mod buffer;
pub mod pipeline;
pub mod pass;

pub use context::GpuContext;
pub use pass::{GrassRenderPass, WindSettings};
