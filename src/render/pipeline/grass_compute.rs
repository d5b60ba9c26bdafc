//! Grass generation compute pipelines
//!
//! Two kernels per batch:
//! 1. data kernel: one thread per candidate blade in a chunk's density
//!    grid, sampling terrain textures and appending surviving blades to
//!    the chunk's instance buffer slot via an atomic counter
//! 2. args kernel: folds the per-slot counters into indexed-indirect
//!    draw arguments so instance counts never round-trip to the CPU

use bytemuck::{Pod, Zeroable};

use crate::surface::HeightmapBinding;

/// Per-surface uniform block shared by the data kernel and the draw
/// shader (80 bytes, one 256-byte slot per surface). Must match
/// `SurfaceGlobals` in grass_data.wgsl and grass_draw.wgsl.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct SurfaceGlobals {
    /// World-space minimum corner of the surface bounds.
    pub origin: [f32; 3],
    pub height_scale: f32,
    /// World-space extent of the surface bounds.
    pub size: [f32; 3],
    pub time: f32,
    pub heightmap_resolution: [u32; 2],
    pub grass_map_resolution: [u32; 2],
    pub wind_map_resolution: [u32; 2],
    /// Blades per chunk axis.
    pub density: u32,
    pub type_count: u32,
    pub wind_direction: [f32; 2],
    pub wind_strength: f32,
    pub _pad: f32,
}

/// Per-chunk uniform block (32 bytes, one 256-byte slot per visible
/// chunk per frame). Must match `ChunkParams` in grass_data.wgsl.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ChunkParams {
    pub center: [f32; 3],
    /// Batch slot this chunk writes into.
    pub slot: u32,
    pub size: [f32; 3],
    pub _pad: f32,
}

/// Uniform for the args kernel (16 bytes). `index_count` is constant for
/// the lifetime of the blade mesh.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ArgsUniform {
    pub index_count: u32,
    pub _pad: [u32; 3],
}

pub struct GrassComputePipeline {
    data_pipeline: wgpu::ComputePipeline,
    args_pipeline: wgpu::ComputePipeline,
    surface_layout: wgpu::BindGroupLayout,
    chunk_layout: wgpu::BindGroupLayout,
    args_layout: wgpu::BindGroupLayout,
}

impl GrassComputePipeline {
    pub fn new(device: &wgpu::Device) -> Self {
        let data_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("grass_data_shader"),
            source: wgpu::ShaderSource::Wgsl(
                include_str!("../../../shaders/grass_data.wgsl").into(),
            ),
        });

        let args_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("grass_args_shader"),
            source: wgpu::ShaderSource::Wgsl(
                include_str!("../../../shaders/grass_args.wgsl").into(),
            ),
        });

        // Group 0: surface textures and globals, rebound per surface
        let surface_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("grass_surface_bind_group_layout"),
            entries: &[
                texture_entry(0),
                texture_entry(1),
                texture_entry(2),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<SurfaceGlobals>() as u64,
                        ),
                    },
                    count: None,
                },
            ],
        });

        // Group 1: per-slot instance buffer plus shared chunk params,
        // counters, and artistic params
        let chunk_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("grass_chunk_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<ChunkParams>() as u64,
                        ),
                    },
                    count: None,
                },
                storage_entry(1, false),
                storage_entry(2, false),
                storage_entry(3, true),
            ],
        });

        let args_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("grass_args_bind_group_layout"),
            entries: &[
                storage_entry(0, true),
                storage_entry(1, false),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<ArgsUniform>() as u64,
                        ),
                    },
                    count: None,
                },
            ],
        });

        let data_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("grass_data_pipeline_layout"),
            bind_group_layouts: &[&surface_layout, &chunk_layout],
            immediate_size: 0,
        });

        let data_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("grass_data_pipeline"),
            layout: Some(&data_layout),
            module: &data_shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        let args_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("grass_args_pipeline_layout"),
                bind_group_layouts: &[&args_layout],
                immediate_size: 0,
            });

        let args_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("grass_args_pipeline"),
            layout: Some(&args_pipeline_layout),
            module: &args_shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Self {
            data_pipeline,
            args_pipeline,
            surface_layout,
            chunk_layout,
            args_layout,
        }
    }

    /// Bind group over one surface's terrain textures and the shared
    /// surface globals buffer.
    pub fn surface_bind_group(
        &self,
        device: &wgpu::Device,
        heightmap: &HeightmapBinding,
        grass_map_view: &wgpu::TextureView,
        wind_map_view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
        globals_buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("grass_surface_bind_group"),
            layout: &self.surface_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(heightmap.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(grass_map_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(wind_map_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: globals_buffer,
                        offset: 0,
                        size: wgpu::BufferSize::new(
                            std::mem::size_of::<SurfaceGlobals>() as u64
                        ),
                    }),
                },
            ],
        })
    }

    /// Bind group for one batch slot of the data kernel.
    pub fn chunk_bind_group(
        &self,
        device: &wgpu::Device,
        chunk_params_buffer: &wgpu::Buffer,
        instance_buffer: &wgpu::Buffer,
        counter_buffer: &wgpu::Buffer,
        artistic_buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("grass_chunk_bind_group"),
            layout: &self.chunk_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: chunk_params_buffer,
                        offset: 0,
                        size: wgpu::BufferSize::new(std::mem::size_of::<ChunkParams>() as u64),
                    }),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: instance_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: counter_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: artistic_buffer.as_entire_binding(),
                },
            ],
        })
    }

    /// Bind group for the args kernel.
    pub fn args_bind_group(
        &self,
        device: &wgpu::Device,
        counter_buffer: &wgpu::Buffer,
        args_buffer: &wgpu::Buffer,
        uniform_buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("grass_args_bind_group"),
            layout: &self.args_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: counter_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: args_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniform_buffer.as_entire_binding(),
                },
            ],
        })
    }

    /// Record the data dispatch for one chunk. Offsets select the
    /// surface's and chunk's uniform slots.
    pub fn dispatch_chunk(
        &self,
        pass: &mut wgpu::ComputePass,
        surface_bind_group: &wgpu::BindGroup,
        surface_offset: u32,
        chunk_bind_group: &wgpu::BindGroup,
        chunk_offset: u32,
        density: u32,
    ) {
        let groups = density.div_ceil(8).max(1);
        pass.set_pipeline(&self.data_pipeline);
        pass.set_bind_group(0, surface_bind_group, &[surface_offset]);
        pass.set_bind_group(1, chunk_bind_group, &[chunk_offset]);
        pass.dispatch_workgroups(groups, groups, 1);
    }

    /// Record the args dispatch for the current batch (one workgroup
    /// covering every slot).
    pub fn dispatch_args(&self, pass: &mut wgpu::ComputePass, bind_group: &wgpu::BindGroup) {
        pass.set_pipeline(&self.args_pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(1, 1, 1);
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_globals_size() {
        // Must match the WGSL struct layout
        assert_eq!(std::mem::size_of::<SurfaceGlobals>(), 80);
    }

    #[test]
    fn test_chunk_params_size() {
        assert_eq!(std::mem::size_of::<ChunkParams>(), 32);
    }

    #[test]
    fn test_args_uniform_size() {
        assert_eq!(std::mem::size_of::<ArgsUniform>(), 16);
    }
}
