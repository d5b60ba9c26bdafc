//! Grass blade render pipeline
//!
//! Draws one shared blade mesh per instance, pulling instance data from
//! the batch slot's storage buffer with `instance_index`. Instance
//! counts come from the indirect args buffer, so nothing about blade
//! counts ever touches the CPU.

use bytemuck::{Pod, Zeroable};

use crate::render::pipeline::grass_compute::SurfaceGlobals;

/// Blade mesh vertex (20 bytes). `uv.y` is the normalized height along
/// the blade, used for bend, taper, and tinting.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct BladeVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

/// Vertical quad segments per blade.
const BLADE_SEGMENTS: u32 = 4;

/// Shared unit blade mesh: a tapered strip of [`BLADE_SEGMENTS`] quads
/// plus a tip triangle, in blade-local space (x half-width, y height).
pub struct BladeMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl BladeMesh {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let (vertices, mut indices) = build_blade_geometry();
        let index_count = indices.len() as u32;
        pad_index_upload(&mut indices);

        let vertex_bytes: &[u8] = bytemuck::cast_slice(&vertices);
        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("blade_vertices"),
            size: vertex_bytes.len() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&vertex_buffer, 0, vertex_bytes);

        let index_bytes: &[u8] = bytemuck::cast_slice(&indices);
        let index_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("blade_indices"),
            size: index_bytes.len() as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&index_buffer, 0, index_bytes);

        Self {
            vertex_buffer,
            index_buffer,
            index_count,
        }
    }

    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &wgpu::Buffer {
        &self.index_buffer
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

/// `Queue::write_buffer` requires sizes aligned to `COPY_BUFFER_ALIGNMENT`
/// (4 bytes), so an odd u16 index count gets one degenerate index appended.
/// The indirect args keep the real count, so the pad is never drawn.
fn pad_index_upload(indices: &mut Vec<u16>) {
    if indices.len() % 2 != 0 {
        indices.push(0);
    }
}

fn build_blade_geometry() -> (Vec<BladeVertex>, Vec<u16>) {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    // Two columns of vertices per row, tapering toward the tip
    for row in 0..=BLADE_SEGMENTS {
        let t = row as f32 / (BLADE_SEGMENTS + 1) as f32;
        let half_width = 0.5 * (1.0 - t * t);
        vertices.push(BladeVertex {
            position: [-half_width, t, 0.0],
            uv: [0.0, t],
        });
        vertices.push(BladeVertex {
            position: [half_width, t, 0.0],
            uv: [1.0, t],
        });
    }
    let tip = vertices.len() as u16;
    vertices.push(BladeVertex {
        position: [0.0, 1.0, 0.0],
        uv: [0.5, 1.0],
    });

    for row in 0..BLADE_SEGMENTS as u16 {
        let base = row * 2;
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 1, base + 3]);
    }
    let last = BLADE_SEGMENTS as u16 * 2;
    indices.extend_from_slice(&[last, last + 1, tip]);

    (vertices, indices)
}

pub struct GrassDrawPipeline {
    pipeline: wgpu::RenderPipeline,
    instance_layout: wgpu::BindGroupLayout,
}

impl GrassDrawPipeline {
    pub fn new(
        device: &wgpu::Device,
        camera_layout: &wgpu::BindGroupLayout,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("grass_draw_shader"),
            source: wgpu::ShaderSource::Wgsl(
                include_str!("../../../shaders/grass_draw.wgsl").into(),
            ),
        });

        // Group 1: per-slot instance buffer plus shared artistic params
        // and surface globals
        let instance_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("grass_draw_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::VERTEX,
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

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("grass_draw_pipeline_layout"),
            bind_group_layouts: &[camera_layout, &instance_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("grass_draw_pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<BladeVertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // Blades are single quadstrips viewed from both sides
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_format,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        Self {
            pipeline,
            instance_layout,
        }
    }

    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    /// Bind group for one batch slot of the draw stage.
    pub fn instance_bind_group(
        &self,
        device: &wgpu::Device,
        instance_buffer: &wgpu::Buffer,
        artistic_buffer: &wgpu::Buffer,
        globals_buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("grass_draw_bind_group"),
            layout: &self.instance_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: instance_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: artistic_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_size() {
        assert_eq!(std::mem::size_of::<BladeVertex>(), 20);
    }

    #[test]
    fn test_blade_geometry() {
        let (vertices, indices) = build_blade_geometry();
        assert_eq!(vertices.len(), (BLADE_SEGMENTS as usize + 1) * 2 + 1);
        assert_eq!(indices.len(), BLADE_SEGMENTS as usize * 6 + 3);

        // All indices in range
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));

        // Tip sits at full height on the center line
        let tip = vertices.last().unwrap();
        assert_eq!(tip.position, [0.0, 1.0, 0.0]);

        // Strip tapers monotonically toward the tip
        for pair in vertices[..vertices.len() - 1].chunks_exact(2) {
            assert!(pair[1].position[0] >= 0.0);
            assert_eq!(pair[0].position[0], -pair[1].position[0]);
        }
    }

    #[test]
    fn test_index_upload_is_copy_aligned() {
        let (vertices, mut indices) = build_blade_geometry();
        let real_count = indices.len();
        pad_index_upload(&mut indices);

        let bytes = indices.len() * std::mem::size_of::<u16>();
        assert_eq!(bytes % wgpu::COPY_BUFFER_ALIGNMENT as usize, 0);

        // Padding only appends degenerate indices past the real count.
        assert!(indices.len() >= real_count);
        assert!(indices[real_count..].iter().all(|&i| (i as usize) < vertices.len()));
    }
}
