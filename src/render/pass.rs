//! Per-frame grass render orchestration
//!
//! One [`GrassRenderPass::render`] call records the whole frame: wind
//! field updates for every surface, then for each batch of up to
//! [`BATCH_SIZE`] visible chunks a compute pass (blade generation plus
//! indirect-args fold) followed by an indirect render pass. Everything is
//! recorded into a single submission, so batch N+1's writes to a slot are
//! ordered behind batch N's reads without fences.

use crate::core::camera::Camera;
use crate::core::types::{Result, Vec2};
use crate::grass::config::GrassConfig;
use crate::grass::types::GrassTypeRegistry;
use crate::grass::visibility::ChunkVisibility;
use crate::render::buffer::{BatchBufferPool, CameraBuffer, BATCH_SIZE};
use crate::render::context::GpuContext;
use crate::render::pipeline::{
    ArgsUniform, ChunkParams, GrassComputePipeline, GrassDrawPipeline, SurfaceGlobals,
    WindPipeline, WindUniform, UNIFORM_STRIDE,
};
use crate::render::pipeline::grass_draw::BladeMesh;
use crate::surface::SurfaceRegistry;

/// Global wind parameters, applied to every surface's wind map.
#[derive(Clone, Copy, Debug)]
pub struct WindSettings {
    /// XZ direction; normalized before upload.
    pub direction: Vec2,
    pub strength: f32,
    pub speed: f32,
    /// Noise frequency in cycles per world unit.
    pub scale: f32,
}

impl Default for WindSettings {
    fn default() -> Self {
        Self {
            direction: Vec2::X,
            strength: 1.0,
            speed: 1.0,
            scale: 0.05,
        }
    }
}

/// Per-surface bookkeeping gathered during the visibility phase.
struct SurfaceDraw {
    /// Index into the per-surface uniform slots for this frame.
    slot: usize,
    /// Range into the frame's flat chunk list.
    chunk_range: std::ops::Range<usize>,
    bind_group: wgpu::BindGroup,
    wind_bind_group: wgpu::BindGroup,
    wind_resolution: crate::core::types::UVec2,
}

pub struct GrassRenderPass {
    wind_pipeline: WindPipeline,
    compute_pipeline: GrassComputePipeline,
    draw_pipeline: GrassDrawPipeline,
    blade_mesh: BladeMesh,
    camera_buffer: CameraBuffer,
    pool: BatchBufferPool,
    visibility: ChunkVisibility,
    sampler: wgpu::Sampler,

    /// One 256-byte slot per surface per frame.
    globals_buffer: wgpu::Buffer,
    wind_uniform_buffer: wgpu::Buffer,
    surface_capacity: usize,

    /// One 256-byte slot per visible chunk per frame.
    chunk_params_buffer: wgpu::Buffer,
    chunk_capacity: usize,

    args_uniform_buffer: wgpu::Buffer,

    /// Flat GPU copy of every registered grass type's artistic params,
    /// rebuilt when the registry version moves.
    artistic_buffer: wgpu::Buffer,
    artistic_version: Option<u64>,

    /// Cached per-slot bind groups, invalidated by pool reallocation or
    /// any backing buffer reallocation.
    chunk_bind_groups: Vec<wgpu::BindGroup>,
    draw_bind_groups: Vec<wgpu::BindGroup>,
    args_bind_group: Option<wgpu::BindGroup>,
    pool_generation: u64,
}

impl GrassRenderPass {
    pub fn new(
        gpu: &GpuContext,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> Self {
        let device = &gpu.device;

        let camera_buffer = CameraBuffer::new(device);
        let blade_mesh = BladeMesh::new(device, &gpu.queue);

        let wind_pipeline = WindPipeline::new(device);
        let compute_pipeline = GrassComputePipeline::new(device);
        let draw_pipeline = GrassDrawPipeline::new(
            device,
            camera_buffer.bind_group_layout(),
            color_format,
            depth_format,
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("grass_terrain_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let surface_capacity = 1;
        let globals_buffer = create_uniform_slots(device, "grass_surface_globals", surface_capacity);
        let wind_uniform_buffer = create_uniform_slots(device, "grass_wind_uniforms", surface_capacity);

        let chunk_capacity = 64;
        let chunk_params_buffer = create_uniform_slots(device, "grass_chunk_params", chunk_capacity);

        let args_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grass_args_uniform"),
            size: std::mem::size_of::<ArgsUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let args_uniform = ArgsUniform {
            index_count: blade_mesh.index_count(),
            _pad: [0; 3],
        };
        gpu.queue
            .write_buffer(&args_uniform_buffer, 0, bytemuck::bytes_of(&args_uniform));

        // Placeholder until the first registry upload
        let artistic_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grass_artistic_params"),
            size: std::mem::size_of::<crate::grass::types::GrassArtisticParams>() as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            wind_pipeline,
            compute_pipeline,
            draw_pipeline,
            blade_mesh,
            camera_buffer,
            pool: BatchBufferPool::new(),
            visibility: ChunkVisibility::new(),
            sampler,
            globals_buffer,
            wind_uniform_buffer,
            surface_capacity,
            chunk_params_buffer,
            chunk_capacity,
            args_uniform_buffer,
            artistic_buffer,
            artistic_version: None,
            chunk_bind_groups: Vec::new(),
            draw_bind_groups: Vec::new(),
            args_bind_group: None,
            pool_generation: 0,
        }
    }

    /// Record and submit one frame of grass.
    ///
    /// `color_view` and `depth_view` are loaded, not cleared; the caller
    /// draws terrain (and clears) before this pass. An invalid density in
    /// `config` fails the whole frame with [`Error::Config`]; nothing is
    /// submitted and the next frame re-reads the config fresh.
    ///
    /// [`Error::Config`]: crate::core::Error::Config
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        camera: &Camera,
        config: &GrassConfig,
        types: &GrassTypeRegistry,
        surfaces: &mut SurfaceRegistry,
        wind: &WindSettings,
        time: f32,
        color_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
    ) -> Result<()> {
        let device = &gpu.device;
        let queue = &gpu.queue;

        // Density is read exactly once per frame; later config edits take
        // effect next frame.
        let density = config.grass_density;
        if let Err(e) = self.pool.ensure_capacity(device, density) {
            log::warn!("skipping grass frame: {e}");
            return Err(e);
        }

        if self.pool.generation() != self.pool_generation {
            self.pool_generation = self.pool.generation();
            self.invalidate_slot_bind_groups();
        }

        if self.artistic_version != Some(types.version()) {
            self.upload_artistic_params(device, queue, types);
            self.artistic_version = Some(types.version());
            self.invalidate_slot_bind_groups();
        }

        if surfaces.is_empty() {
            return Ok(());
        }

        self.camera_buffer.update(queue, camera);
        let frustum = camera.frustum();

        self.ensure_surface_capacity(device, surfaces.len());

        // Visibility phase: walk every surface, revalidate its resources,
        // and flatten its visible chunks into one frame-wide list.
        let mut frame_chunks: Vec<ChunkParams> = Vec::new();
        let mut draws: Vec<SurfaceDraw> = Vec::new();

        for (slot, surface) in surfaces.iter_mut().enumerate() {
            surface.revalidate(device)?;

            let start = frame_chunks.len();
            let visible = self.visibility.select(
                surface.grid(),
                camera.position,
                &frustum,
                config.render_distance,
                &config.subdivision_distances,
            );
            frame_chunks.extend(visible.iter().enumerate().map(|(i, chunk)| ChunkParams {
                center: chunk.center.to_array(),
                slot: (i % BATCH_SIZE) as u32,
                size: chunk.size.to_array(),
                _pad: 0.0,
            }));
            let chunk_range = start..frame_chunks.len();

            let bounds = surface.bounds();
            let heightmap = surface.heightmap();
            let grass_map = surface.grass_map();
            let wind_map = surface.wind_map();

            let globals = SurfaceGlobals {
                origin: bounds.min.to_array(),
                height_scale: heightmap.height_scale,
                size: bounds.size().to_array(),
                time,
                heightmap_resolution: heightmap.resolution.to_array(),
                grass_map_resolution: grass_map.resolution.to_array(),
                wind_map_resolution: wind_map.resolution.to_array(),
                density,
                type_count: types.len() as u32,
                wind_direction: wind.direction.normalize_or_zero().to_array(),
                wind_strength: wind.strength,
                _pad: 0.0,
            };
            queue.write_buffer(
                &self.globals_buffer,
                slot as u64 * UNIFORM_STRIDE,
                bytemuck::bytes_of(&globals),
            );

            let wind_uniform = WindUniform {
                direction: wind.direction.normalize_or_zero().to_array(),
                strength: wind.strength,
                speed: wind.speed,
                scale: wind.scale,
                time,
                resolution: wind_map.resolution.to_array(),
            };
            queue.write_buffer(
                &self.wind_uniform_buffer,
                slot as u64 * UNIFORM_STRIDE,
                bytemuck::bytes_of(&wind_uniform),
            );

            let bind_group = self.compute_pipeline.surface_bind_group(
                device,
                &heightmap,
                grass_map.view,
                wind_map.view,
                &self.sampler,
                &self.globals_buffer,
            );
            let wind_bind_group =
                self.wind_pipeline
                    .bind_group(device, wind_map.view, &self.wind_uniform_buffer);

            draws.push(SurfaceDraw {
                slot,
                chunk_range,
                bind_group,
                wind_bind_group,
                wind_resolution: wind_map.resolution,
            });
        }

        self.ensure_chunk_capacity(device, frame_chunks.len());
        for (i, params) in frame_chunks.iter().enumerate() {
            queue.write_buffer(
                &self.chunk_params_buffer,
                i as u64 * UNIFORM_STRIDE,
                bytemuck::bytes_of(params),
            );
        }

        self.rebuild_slot_bind_groups(device);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("grass_frame"),
        });

        // Wind fields first; every later blade dispatch samples them.
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("grass_wind_pass"),
                timestamp_writes: None,
            });
            for draw in &draws {
                self.wind_pipeline.dispatch(
                    &mut pass,
                    &draw.wind_bind_group,
                    (draw.slot as u64 * UNIFORM_STRIDE) as u32,
                    draw.wind_resolution,
                );
            }
        }

        let args_bind_group = self
            .args_bind_group
            .as_ref()
            .expect("slot bind groups rebuilt above");

        for draw in &draws {
            let surface_offset = (draw.slot as u64 * UNIFORM_STRIDE) as u32;

            for batch in chunk_batches(&draw.chunk_range) {
                // Stale counts from the previous batch must not leak into
                // this batch's args.
                encoder.clear_buffer(self.pool.counter_buffer(), 0, None);

                {
                    let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                        label: Some("grass_data_pass"),
                        timestamp_writes: None,
                    });
                    for (batch_slot, chunk_index) in batch.clone().enumerate() {
                        self.compute_pipeline.dispatch_chunk(
                            &mut pass,
                            &draw.bind_group,
                            surface_offset,
                            &self.chunk_bind_groups[batch_slot],
                            (chunk_index as u64 * UNIFORM_STRIDE) as u32,
                            density,
                        );
                    }
                    self.compute_pipeline.dispatch_args(&mut pass, args_bind_group);
                }

                {
                    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("grass_draw_pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: color_view,
                            depth_slice: None,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Load,
                                store: wgpu::StoreOp::Store,
                            },
                        })],
                        depth_stencil_attachment: Some(
                            wgpu::RenderPassDepthStencilAttachment {
                                view: depth_view,
                                depth_ops: Some(wgpu::Operations {
                                    load: wgpu::LoadOp::Load,
                                    store: wgpu::StoreOp::Store,
                                }),
                                stencil_ops: None,
                            },
                        ),
                        timestamp_writes: None,
                        occlusion_query_set: None,
                        multiview_mask: None,
                    });

                    pass.set_pipeline(self.draw_pipeline.pipeline());
                    pass.set_bind_group(0, self.camera_buffer.bind_group(), &[]);
                    pass.set_vertex_buffer(0, self.blade_mesh.vertex_buffer().slice(..));
                    pass.set_index_buffer(
                        self.blade_mesh.index_buffer().slice(..),
                        wgpu::IndexFormat::Uint16,
                    );

                    for (batch_slot, _) in batch.clone().enumerate() {
                        pass.set_bind_group(
                            1,
                            &self.draw_bind_groups[batch_slot],
                            &[surface_offset],
                        );
                        pass.draw_indexed_indirect(
                            self.pool.args_buffer(),
                            batch_slot as u64
                                * std::mem::size_of::<crate::render::buffer::DrawIndexedArgs>()
                                    as u64,
                        );
                    }
                }
            }
        }

        queue.submit(std::iter::once(encoder.finish()));

        log::trace!(
            "grass frame: {} surfaces, {} chunks, density {}",
            draws.len(),
            frame_chunks.len(),
            density
        );

        Ok(())
    }

    /// Drop all pooled GPU buffers; the next frame reallocates them.
    pub fn release_buffers(&mut self) {
        self.pool.release();
        self.invalidate_slot_bind_groups();
    }

    fn invalidate_slot_bind_groups(&mut self) {
        self.chunk_bind_groups.clear();
        self.draw_bind_groups.clear();
        self.args_bind_group = None;
    }

    fn rebuild_slot_bind_groups(&mut self, device: &wgpu::Device) {
        if !self.chunk_bind_groups.is_empty() {
            return;
        }

        for slot in 0..BATCH_SIZE {
            self.chunk_bind_groups.push(self.compute_pipeline.chunk_bind_group(
                device,
                &self.chunk_params_buffer,
                self.pool.instance_buffer(slot),
                self.pool.counter_buffer(),
                &self.artistic_buffer,
            ));
            self.draw_bind_groups.push(self.draw_pipeline.instance_bind_group(
                device,
                self.pool.instance_buffer(slot),
                &self.artistic_buffer,
                &self.globals_buffer,
            ));
        }

        self.args_bind_group = Some(self.compute_pipeline.args_bind_group(
            device,
            self.pool.counter_buffer(),
            self.pool.args_buffer(),
            &self.args_uniform_buffer,
        ));
    }

    fn upload_artistic_params(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        types: &GrassTypeRegistry,
    ) {
        let mut data = types.gpu_data();
        if data.is_empty() {
            // Zero-sized storage bindings are invalid; keep one default
            // entry so blades with a stale type index still resolve.
            data.push(Default::default());
        }
        let bytes: &[u8] = bytemuck::cast_slice(&data);

        if (bytes.len() as u64) != self.artistic_buffer.size() {
            self.artistic_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("grass_artistic_params"),
                size: bytes.len() as u64,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
        }
        queue.write_buffer(&self.artistic_buffer, 0, bytes);

        log::debug!("uploaded {} grass types", data.len());
    }

    fn ensure_surface_capacity(&mut self, device: &wgpu::Device, count: usize) {
        if count <= self.surface_capacity {
            return;
        }
        self.surface_capacity = count.next_power_of_two();
        self.globals_buffer =
            create_uniform_slots(device, "grass_surface_globals", self.surface_capacity);
        self.wind_uniform_buffer =
            create_uniform_slots(device, "grass_wind_uniforms", self.surface_capacity);
        self.invalidate_slot_bind_groups();
    }

    fn ensure_chunk_capacity(&mut self, device: &wgpu::Device, count: usize) {
        if count <= self.chunk_capacity {
            return;
        }
        self.chunk_capacity = count.next_power_of_two();
        self.chunk_params_buffer =
            create_uniform_slots(device, "grass_chunk_params", self.chunk_capacity);
        self.invalidate_slot_bind_groups();
    }
}

fn create_uniform_slots(device: &wgpu::Device, label: &str, slots: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: slots as u64 * UNIFORM_STRIDE,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Split a chunk index range into batches of at most [`BATCH_SIZE`].
fn chunk_batches(
    range: &std::ops::Range<usize>,
) -> impl Iterator<Item = std::ops::Range<usize>> + '_ {
    range.clone().step_by(BATCH_SIZE).map(|start| {
        let end = (start + BATCH_SIZE).min(range.end);
        start..end
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wind_settings_default() {
        let wind = WindSettings::default();
        assert_eq!(wind.direction, Vec2::X);
        assert!(wind.strength > 0.0);
    }

    #[test]
    fn test_chunk_batches_partition() {
        let batches: Vec<_> = chunk_batches(&(0..20)).collect();
        assert_eq!(batches, vec![0..8, 8..16, 16..20]);

        let batches: Vec<_> = chunk_batches(&(5..13)).collect();
        assert_eq!(batches, vec![5..13]);

        assert_eq!(chunk_batches(&(3..3)).count(), 0);
    }

    #[test]
    fn test_batch_slot_assignment_stays_in_pool() {
        // Slot written into chunk params must match the batch-local index
        // used for bind groups and indirect draw offsets.
        let range = 10..31;
        for batch in chunk_batches(&range) {
            for (batch_slot, chunk_index) in batch.clone().enumerate() {
                assert!(batch_slot < BATCH_SIZE);
                assert_eq!(batch_slot, chunk_index - batch.start);
            }
        }
    }
}
