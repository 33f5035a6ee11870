//! GPU pipelines for the host's draw operations.
//!
//! Each renderer owns its pipeline and buffers, built lazily once its shader
//! source has been loaded. All pipelines target the surface format (render
//! targets are allocated in that same format) and share the alpha-blend
//! state below.

mod gizmo;
mod mesh;
mod sprite;

pub use gizmo::GizmoRenderer;
pub use mesh::MeshRenderer;
pub use sprite::SpriteRenderer;

/// Renderer-facing context (device/queue + pipeline output format).
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub surface_format: wgpu::TextureFormat,
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            device,
            queue,
            surface_format,
        }
    }
}

/// Standard `src_alpha / one_minus_src_alpha` blending on both channels.
pub(crate) fn alpha_blend() -> wgpu::BlendState {
    let component = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState {
        color: component,
        alpha: component,
    }
}
