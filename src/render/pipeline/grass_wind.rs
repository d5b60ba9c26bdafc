//! Wind field compute pipeline
//!
//! Runs once per surface per frame and writes a scrolling noise field
//! into the surface's wind map. The grass generation kernel samples the
//! map later in the same submission.

use bytemuck::{Pod, Zeroable};

use crate::surface::terrain::WIND_MAP_FORMAT;

/// Uniform block for the wind kernel (32 bytes, one 256-byte slot per
/// surface). Must match `WindUniform` in grass_wind.wgsl.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct WindUniform {
    /// Normalized XZ wind direction.
    pub direction: [f32; 2],
    pub strength: f32,
    pub speed: f32,
    pub scale: f32,
    pub time: f32,
    /// Wind map resolution in texels.
    pub resolution: [u32; 2],
}

pub struct WindPipeline {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl WindPipeline {
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("grass_wind_shader"),
            source: wgpu::ShaderSource::Wgsl(
                include_str!("../../../shaders/grass_wind.wgsl").into(),
            ),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("wind_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: WIND_MAP_FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<WindUniform>() as u64,
                        ),
                    },
                    count: None,
                },
            ],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("wind_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("wind_pipeline"),
            layout: Some(&layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Self {
            pipeline,
            bind_group_layout,
        }
    }

    /// Build the per-surface bind group over the wind map storage view and
    /// the shared wind uniform buffer.
    pub fn bind_group(
        &self,
        device: &wgpu::Device,
        wind_map_view: &wgpu::TextureView,
        uniform_buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("wind_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(wind_map_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: uniform_buffer,
                        offset: 0,
                        size: wgpu::BufferSize::new(std::mem::size_of::<WindUniform>() as u64),
                    }),
                },
            ],
        })
    }

    /// Record the wind dispatch for one surface. `uniform_offset` selects
    /// the surface's 256-byte slot in the wind uniform buffer.
    pub fn dispatch(
        &self,
        pass: &mut wgpu::ComputePass,
        bind_group: &wgpu::BindGroup,
        uniform_offset: u32,
        resolution: crate::core::types::UVec2,
    ) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[uniform_offset]);
        pass.dispatch_workgroups(resolution.x.div_ceil(8), resolution.y.div_ceil(8), 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_size() {
        // Must match the WGSL struct layout
        assert_eq!(std::mem::size_of::<WindUniform>(), 32);
    }
}
