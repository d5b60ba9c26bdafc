//! GPU buffer management

pub mod batch_pool;
pub mod camera_buffer;

pub use batch_pool::{BatchBufferPool, GrassInstance, DrawIndexedArgs, BATCH_SIZE};
pub use camera_buffer::{CameraBuffer, CameraUniform};
