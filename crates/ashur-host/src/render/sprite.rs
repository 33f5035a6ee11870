use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::registry::TextureEntry;
use crate::transform::DrawUniform;

use super::{alpha_blend, RenderCtx};

/// Reference quad half-extent: a unit-scale sprite maps a 128px texture to
/// native pixel size.
const QUAD_HALF_EXTENT: f32 = 64.0;

/// Textured sprite pipeline.
///
/// Holds the static 6-vertex quad and the shared 64-byte transform uniform
/// written immediately before every sprite/mesh draw. Per-texture bind
/// groups (sampler + view + this uniform) are built once and cached on the
/// registry entry.
#[derive(Default)]
pub struct SpriteRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,

    quad_vbo: Option<wgpu::Buffer>,
    uniform_buf: Option<wgpu::Buffer>,
}

impl SpriteRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the pipeline and buffers exist; sprite draws are silent
    /// no-ops until then.
    pub fn is_ready(&self) -> bool {
        self.pipeline.is_some() && self.quad_vbo.is_some() && self.uniform_buf.is_some()
    }

    pub fn pipeline(&self) -> Option<&wgpu::RenderPipeline> {
        self.pipeline.as_ref()
    }

    pub fn quad_vbo(&self) -> Option<&wgpu::Buffer> {
        self.quad_vbo.as_ref()
    }

    /// The shared transform uniform buffer (sprite binding 2, mesh binding 0).
    pub fn uniform_buf(&self) -> Option<&wgpu::Buffer> {
        self.uniform_buf.as_ref()
    }

    pub fn write_uniform(&self, queue: &wgpu::Queue, uniform: &DrawUniform) {
        let Some(buf) = self.uniform_buf.as_ref() else { return };
        queue.write_buffer(buf, 0, bytemuck::bytes_of(uniform));
    }

    /// Builds the pipeline, quad, and uniform buffer from the loaded sprite
    /// shader source. Safe to call every frame.
    pub fn ensure_resources(&mut self, ctx: &RenderCtx<'_>, shader_source: &str) {
        if self.pipeline_format == Some(ctx.surface_format) && self.is_ready() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("ashur sprite shader"),
            source: wgpu::ShaderSource::Wgsl(shader_source.into()),
        });

        let bind_group_layout =
            ctx.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("ashur sprite bgl"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Texture {
                                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                                view_dimension: wgpu::TextureViewDimension::D2,
                                multisampled: false,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 2,
                            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: Some(
                                    std::num::NonZeroU64::new(
                                        std::mem::size_of::<DrawUniform>() as u64
                                    )
                                    .unwrap(),
                                ),
                            },
                            count: None,
                        },
                    ],
                });

        let pipeline_layout =
            ctx.device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("ashur sprite pipeline layout"),
                    bind_group_layouts: &[&bind_group_layout],
                    immediate_size: 0,
                });

        let pipeline = ctx
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("ashur sprite pipeline"),
                layout: Some(&pipeline_layout),

                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[SpriteVertex::layout()],
                },

                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: ctx.surface_format,
                        blend: Some(alpha_blend()),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),

                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },

                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

        if self.quad_vbo.is_none() {
            self.quad_vbo = Some(ctx.device.create_buffer_init(
                &wgpu::util::BufferInitDescriptor {
                    label: Some("ashur sprite quad vbo"),
                    contents: bytemuck::cast_slice(&QUAD_VERTICES),
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                },
            ));
        }
        if self.uniform_buf.is_none() {
            self.uniform_buf = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("ashur transform ubo"),
                size: std::mem::size_of::<DrawUniform>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
        }

        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bind_group_layout);
    }

    /// Builds and caches the entry's bind group on first use.
    pub fn ensure_bind_group(&self, device: &wgpu::Device, entry: &mut TextureEntry) {
        if entry.bind_group.is_some() {
            return;
        }
        let Some(bgl) = self.bind_group_layout.as_ref() else { return };
        let Some(uniform_buf) = self.uniform_buf.as_ref() else { return };

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ashur sprite bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Sampler(&entry.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&entry.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniform_buf.as_entire_binding(),
                },
            ],
        });
        entry.bind_group = Some(bind_group);
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct SpriteVertex {
    pos: [f32; 2],
    uv: [f32; 2],
}

impl SpriteVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x2, // pos
        1 => Float32x2  // uv
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

const QUAD_VERTICES: [SpriteVertex; 6] = [
    SpriteVertex { pos: [-QUAD_HALF_EXTENT, QUAD_HALF_EXTENT], uv: [0.0, 0.0] },
    SpriteVertex { pos: [-QUAD_HALF_EXTENT, -QUAD_HALF_EXTENT], uv: [0.0, 1.0] },
    SpriteVertex { pos: [QUAD_HALF_EXTENT, -QUAD_HALF_EXTENT], uv: [1.0, 1.0] },
    SpriteVertex { pos: [-QUAD_HALF_EXTENT, QUAD_HALF_EXTENT], uv: [0.0, 0.0] },
    SpriteVertex { pos: [QUAD_HALF_EXTENT, -QUAD_HALF_EXTENT], uv: [1.0, 1.0] },
    SpriteVertex { pos: [QUAD_HALF_EXTENT, QUAD_HALF_EXTENT], uv: [1.0, 0.0] },
];
