//! Fixed-size ring of reusable GPU buffers for batched grass dispatch.
//!
//! Visible chunks are processed in groups of at most [`BATCH_SIZE`]; each
//! chunk in a batch owns one instance buffer slot for the duration of that
//! batch's compute-then-draw sequence. Slots are overwritten by the next
//! batch only after their reads are ordered behind them on the submission
//! timeline, so per-frame GPU memory stays bounded regardless of how many
//! chunks are visible.

use bytemuck::{Pod, Zeroable};

use crate::core::types::Result;
use crate::core::Error;
use crate::grass::config::MAX_GRASS_DENSITY;

/// Upper bound on simultaneously in-flight chunk buffers.
pub const BATCH_SIZE: usize = 8;

/// Per-blade instance record written by the generation kernel and read by
/// the draw call (64 bytes). Scalar fields only so the WGSL storage layout
/// matches byte-for-byte.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GrassInstance {
    pub position: [f32; 3],
    /// XZ bitangent the blade faces along.
    pub facing: [f32; 2],
    pub tilt: f32,
    pub bend: f32,
    pub scale: f32,
    // -- 32 bytes --
    pub width: f32,
    pub wind_intensity: f32,
    pub phase_offset: f32,
    pub type_index: u32,
    /// Stable hash for per-blade pseudo-randomness.
    pub hash: u32,
    pub _pad: [f32; 3],
    // -- 32 bytes --
    // Total: 64 bytes
}

/// Indexed-indirect draw arguments (20 bytes), written per batch slot by
/// the args kernel. Layout matches wgpu's indexed indirect format.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct DrawIndexedArgs {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub first_instance: u32,
}

/// Density and generation bookkeeping, kept apart from the buffers so the
/// reuse-vs-realloc decision can be exercised without a device.
#[derive(Default)]
struct PoolState {
    /// Density the current allocation was sized for; 0 = unallocated.
    density: u32,
    /// Bumped on every reallocation so downstream bind groups rebuild.
    generation: u64,
}

impl PoolState {
    fn needs_realloc(&self, density: u32) -> bool {
        self.density != density
    }

    /// Record a completed allocation at `density`.
    fn commit(&mut self, density: u32) {
        self.density = density;
        self.generation += 1;
    }

    /// Back to unallocated. The generation counter is monotonic and
    /// survives release.
    fn reset(&mut self) {
        self.density = 0;
    }
}

/// Pool of [`BATCH_SIZE`] instance buffers sized to the active grass
/// density, plus one shared indirect-args buffer and one per-slot atomic
/// counter buffer.
///
/// Invariant: all instance buffers have uniform capacity `density²`. A
/// density change releases and reallocates everything atomically before
/// the next use; consumers never observe a pool mid-resize.
pub struct BatchBufferPool {
    state: PoolState,
    instance_buffers: Vec<wgpu::Buffer>,
    args_buffer: Option<wgpu::Buffer>,
    counter_buffer: Option<wgpu::Buffer>,
}

impl BatchBufferPool {
    /// Create an empty (unallocated) pool.
    pub fn new() -> Self {
        Self {
            state: PoolState::default(),
            instance_buffers: Vec::new(),
            args_buffer: None,
            counter_buffer: None,
        }
    }

    /// Size in bytes of one instance buffer at the given density.
    pub fn instance_buffer_bytes(density: u32) -> u64 {
        density as u64 * density as u64 * std::mem::size_of::<GrassInstance>() as u64
    }

    /// Whether a call to [`ensure_capacity`](Self::ensure_capacity) with
    /// this density would reallocate.
    pub fn needs_realloc(&self, density: u32) -> bool {
        self.state.needs_realloc(density)
    }

    /// Validate the pool against the active density, reallocating all
    /// buffers if it changed. Idempotent when the density is unchanged.
    ///
    /// Must be called once per frame before dispatch, with the density
    /// value observed at the start of the frame.
    pub fn ensure_capacity(&mut self, device: &wgpu::Device, density: u32) -> Result<()> {
        if density == 0 || density > MAX_GRASS_DENSITY {
            self.release();
            return Err(Error::Config(format!(
                "grass density {} out of range 1..={}",
                density, MAX_GRASS_DENSITY
            )));
        }

        if !self.needs_realloc(density) {
            return Ok(());
        }

        self.release();

        let instance_bytes = Self::instance_buffer_bytes(density);
        self.instance_buffers = (0..BATCH_SIZE)
            .map(|slot| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("grass_instances_{slot}")),
                    size: instance_bytes,
                    usage: wgpu::BufferUsages::STORAGE,
                    mapped_at_creation: false,
                })
            })
            .collect();

        self.args_buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grass_indirect_args"),
            size: (BATCH_SIZE * std::mem::size_of::<DrawIndexedArgs>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::INDIRECT,
            mapped_at_creation: false,
        }));

        self.counter_buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grass_blade_counters"),
            size: (BATCH_SIZE * std::mem::size_of::<u32>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));

        self.state.commit(density);

        log::debug!(
            "batch pool reallocated: density {}, {}x{}B instance buffers",
            density,
            BATCH_SIZE,
            instance_bytes
        );

        Ok(())
    }

    /// Release all GPU resources. Idempotent.
    ///
    /// Dropping wgpu buffers defers the actual free until submitted work
    /// that references them completes, so in-flight frames stay valid.
    pub fn release(&mut self) {
        self.instance_buffers.clear();
        self.args_buffer = None;
        self.counter_buffer = None;
        self.state.reset();
    }

    /// Density the current allocation is sized for (0 when unallocated).
    pub fn density(&self) -> u32 {
        self.state.density
    }

    /// Reallocation counter.
    pub fn generation(&self) -> u64 {
        self.state.generation
    }

    pub fn is_allocated(&self) -> bool {
        self.state.density != 0
    }

    /// Instance buffer for batch slot `slot`.
    ///
    /// # Panics
    /// Panics when the pool is unallocated or `slot >= BATCH_SIZE`.
    pub fn instance_buffer(&self, slot: usize) -> &wgpu::Buffer {
        &self.instance_buffers[slot]
    }

    /// Shared indirect draw-args buffer ([`BATCH_SIZE`] records).
    pub fn args_buffer(&self) -> &wgpu::Buffer {
        self.args_buffer.as_ref().expect("pool not allocated")
    }

    /// Per-slot blade counters, cleared before each batch.
    pub fn counter_buffer(&self) -> &wgpu::Buffer {
        self.counter_buffer.as_ref().expect("pool not allocated")
    }
}

impl Default for BatchBufferPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_size() {
        assert_eq!(std::mem::size_of::<GrassInstance>(), 64);
        assert_eq!(std::mem::size_of::<GrassInstance>() % 16, 0);
    }

    #[test]
    fn test_args_size() {
        // Must match wgpu's indexed indirect argument layout.
        assert_eq!(std::mem::size_of::<DrawIndexedArgs>(), 20);
    }

    #[test]
    fn test_instance_buffer_bytes() {
        assert_eq!(BatchBufferPool::instance_buffer_bytes(100), 100 * 100 * 64);
        assert_eq!(BatchBufferPool::instance_buffer_bytes(1), 64);
    }

    #[test]
    fn test_needs_realloc() {
        let pool = BatchBufferPool::new();
        assert!(pool.needs_realloc(100));

        // Unallocated pool never matches a valid density.
        assert!(pool.needs_realloc(1));
    }

    #[test]
    fn test_unchanged_density_reuses_allocation() {
        let mut state = PoolState::default();
        state.commit(100);
        let before = state.generation;

        // Same density: no realloc, generation stable.
        assert!(!state.needs_realloc(100));
        assert_eq!(state.generation, before);
    }

    #[test]
    fn test_density_changes_realloc_last_write_wins() {
        let mut state = PoolState::default();
        state.commit(100);
        let before = state.generation;

        assert!(state.needs_realloc(200));
        state.commit(200);
        assert!(state.needs_realloc(100));
        state.commit(100);

        // 100 -> 200 -> 100: two reallocations, final size is the last one.
        assert_eq!(state.density, 100);
        assert_eq!(state.generation, before + 2);
    }

    #[test]
    fn test_generation_survives_release() {
        let mut state = PoolState::default();
        state.commit(100);
        let before = state.generation;

        state.reset();
        assert_eq!(state.density, 0);
        assert!(state.needs_realloc(100));
        assert_eq!(state.generation, before);
    }

    #[test]
    fn test_release_idempotent() {
        let mut pool = BatchBufferPool::new();
        pool.release();
        pool.release();
        assert!(!pool.is_allocated());
        assert_eq!(pool.density(), 0);
    }

    #[test]
    fn test_bytemuck_cast() {
        let inst = GrassInstance::zeroed();
        assert_eq!(bytemuck::bytes_of(&inst).len(), 64);
        let args = DrawIndexedArgs::zeroed();
        assert_eq!(bytemuck::bytes_of(&args).len(), 20);
    }
}
