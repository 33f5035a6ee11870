use crate::gizmo::LineVertex;

use super::{alpha_blend, RenderCtx};

/// Floor for the dynamic vertex buffer, to amortize reallocation.
const MIN_VERTEX_BUFFER_SIZE: u64 = 256;

/// Unlit vertex-color pipeline for the per-pass gizmo batch.
///
/// All quads of a pass are packed into one dynamic vertex buffer and drawn
/// with a single call. The buffer is grown (replaced) whenever the required
/// byte size exceeds its capacity.
#[derive(Default)]
pub struct GizmoRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,

    vertex_buf: Option<wgpu::Buffer>,
    vertex_capacity: u64,
}

impl GizmoRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the pipeline from the loaded gizmo shader source.
    ///
    /// The shader consumes pre-projected NDC vertices, so the pipeline
    /// layout carries no bindings.
    pub fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>, shader_source: &str) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("ashur gizmo shader"),
            source: wgpu::ShaderSource::Wgsl(shader_source.into()),
        });

        let pipeline_layout =
            ctx.device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("ashur gizmo pipeline layout"),
                    bind_group_layouts: &[],
                    immediate_size: 0,
                });

        let pipeline = ctx
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("ashur gizmo pipeline"),
                layout: Some(&pipeline_layout),

                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[LineVertex::layout()],
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

        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
    }

    /// Uploads the expanded batch and records its single draw call.
    pub fn draw(
        &mut self,
        ctx: &RenderCtx<'_>,
        rpass: &mut wgpu::RenderPass<'_>,
        vertices: &[LineVertex],
    ) {
        if vertices.is_empty() {
            return;
        }
        let Some(pipeline) = self.pipeline.as_ref() else { return };

        let required = std::mem::size_of_val(vertices) as u64;
        if self.vertex_buf.is_none() || required > self.vertex_capacity {
            let capacity = required.max(MIN_VERTEX_BUFFER_SIZE);
            self.vertex_buf = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("ashur gizmo vbo"),
                size: capacity,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.vertex_capacity = capacity;
        }
        let Some(vertex_buf) = self.vertex_buf.as_ref() else { return };

        ctx.queue
            .write_buffer(vertex_buf, 0, bytemuck::cast_slice(vertices));

        rpass.set_pipeline(pipeline);
        rpass.set_vertex_buffer(0, vertex_buf.slice(..));
        rpass.draw(0..vertices.len() as u32, 0..1);
    }
}
