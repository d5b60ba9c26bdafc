//! Veldt - GPU-instanced grass rendering over heightmap terrain

pub mod core;
pub mod math;
pub mod grass;
pub mod surface;
pub mod render;
