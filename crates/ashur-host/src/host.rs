//! The rendering host: frame/pass lifecycle plus the handle-based API
//! exposed to embedded programs.
//!
//! Lifecycle states run `Idle -> FrameOpen -> (PassOpen -> FrameOpen)* ->
//! Idle`. Every out-of-order call is a silent no-op: the host favors forward
//! progress over crashing the embedded program on ordering mistakes. The
//! only synchronous failure surfaced to the caller is `DeviceNotReady`.

use anyhow::Result;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::assets::{AssetLoader, LoadEvent, PendingLoad};
use crate::device::{Gpu, GpuFrame, GpuInit};
use crate::error::HostError;
use crate::gizmo::{self, LineRecord, LineStyle};
use crate::registry::{geometry, ResourceRegistry};
use crate::render::{GizmoRenderer, MeshRenderer, RenderCtx, SpriteRenderer};
use crate::transform::{pack_draw_uniform, PassParams};

/// Reference sprite size in pixels: effective sprite scale is multiplied by
/// `texture_extent / 128` so a unit-scale sprite renders at native pixel
/// size against the 128px quad.
const SPRITE_BASE_SIZE: f32 = 128.0;

const SPRITE_SHADER_PATH: &str = "shaders/sprite.wgsl";
const MESH_SHADER_PATH: &str = "shaders/mesh.wgsl";
const GIZMO_SHADER_PATH: &str = "shaders/gizmo_lines.wgsl";

/// Host configuration.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Root directory that relative asset paths resolve under.
    pub asset_root: String,
    pub gpu: GpuInit,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            asset_root: "./assets".to_owned(),
            gpu: GpuInit::default(),
        }
    }
}

struct PassState {
    rpass: wgpu::RenderPass<'static>,
    params: PassParams,
}

/// Owns the GPU context, resource registry, asset loader, and renderers.
///
/// Single-threaded by design: all methods are driven from the host's frame
/// callback. Asset workers run on their own threads but only communicate
/// through a channel drained at frame begin.
pub struct RenderHost<'w> {
    gpu_init: GpuInit,
    gpu: Option<Gpu<'w>>,

    registry: ResourceRegistry,
    loader: AssetLoader,

    sprite: SpriteRenderer,
    mesh: MeshRenderer,
    gizmo: GizmoRenderer,

    // Built-in shader handles; 0 means load failed and the feature is
    // disabled (draws depending on it no-op).
    sprite_shader_id: i32,
    mesh_shader_id: i32,
    gizmo_shader_id: i32,

    frame: Option<GpuFrame>,
    pass: Option<PassState>,
    gizmo_lines: Vec<LineRecord>,
}

impl<'w> RenderHost<'w> {
    /// Creates a host with no GPU device yet.
    ///
    /// Texture/shader loads issued in this state are queued and replayed at
    /// `init_gpu` time; synchronous create calls fail with `DeviceNotReady`.
    pub fn new(config: HostConfig) -> Self {
        Self {
            gpu_init: config.gpu,
            gpu: None,
            registry: ResourceRegistry::new(),
            loader: AssetLoader::new(config.asset_root),
            sprite: SpriteRenderer::new(),
            mesh: MeshRenderer::new(),
            gizmo: GizmoRenderer::new(),
            sprite_shader_id: 0,
            mesh_shader_id: 0,
            gizmo_shader_id: 0,
            frame: None,
            pass: None,
            gizmo_lines: Vec::new(),
        }
    }

    /// Brings up the GPU device against a window, loads the built-in
    /// shaders, then replays loads queued before readiness in issue order.
    pub fn init_gpu(&mut self, window: &'w Window) -> Result<()> {
        let gpu = Gpu::new(window, self.gpu_init.clone())?;
        log::info!("GPU ready (surface format {:?})", gpu.surface_format());
        self.gpu = Some(gpu);

        self.sprite_shader_id = self.load_builtin_shader(SPRITE_SHADER_PATH);
        self.mesh_shader_id = self.load_builtin_shader(MESH_SHADER_PATH);
        self.gizmo_shader_id = self.load_builtin_shader(GIZMO_SHADER_PATH);

        for load in self.loader.drain_pending() {
            match load {
                PendingLoad::Texture { id, path, nearest } => {
                    self.loader.start_texture_load(id, path, nearest)
                }
                PendingLoad::Shader { id, path } => self.loader.start_shader_load(id, path),
            }
        }
        Ok(())
    }

    pub fn is_device_ready(&self) -> bool {
        self.gpu.is_some()
    }

    /// Propagates a window resize to the surface.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.resize(new_size);
        }
    }

    // ── frame / pass lifecycle ───────────────────────────────────────────

    /// Opens a frame; returns whether one was opened.
    ///
    /// The first successful call also creates the fallback texture and the
    /// sprite pipeline. Fails (without side effects) when the device or the
    /// drawable surface is unavailable, or a frame is already open.
    pub fn begin_frame(&mut self) -> bool {
        if self.frame.is_some() || self.gpu.is_none() {
            return false;
        }

        self.pump_asset_events();
        self.ensure_sprite_resources();

        let Some(gpu) = self.gpu.as_mut() else { return false };
        let frame = match gpu.acquire_frame() {
            Ok(frame) => frame,
            Err(err) => {
                let action = gpu.handle_surface_error(err.clone());
                log::warn!("failed to acquire surface texture: {err} ({action:?})");
                return false;
            }
        };

        self.pass = None;
        self.gizmo_lines.clear();
        self.frame = Some(frame);
        true
    }

    /// Opens a render pass into `target_id` (negative = swapchain).
    ///
    /// No-op when no frame is open, a pass is already open, or the target is
    /// missing. An explicit viewport applies when its extent is positive;
    /// otherwise the full logical size is used.
    #[allow(clippy::too_many_arguments)]
    pub fn begin_pass(
        &mut self,
        target_id: i32,
        width: i32,
        height: i32,
        clear: [f32; 4],
        cam_x: f32,
        cam_y: f32,
        cam_rotation: f32,
        cam_zoom: f32,
        viewport_x: f32,
        viewport_y: f32,
        viewport_width: f32,
        viewport_height: f32,
    ) {
        if self.pass.is_some() {
            return;
        }
        let Some(frame) = self.frame.as_mut() else { return };

        let view = if target_id < 0 {
            frame.view.clone()
        } else {
            match self.registry.texture(target_id) {
                Some(entry) => entry.view.clone(),
                None => return,
            }
        };

        let rpass = frame
            .encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("ashur pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear[0] as f64,
                            g: clear[1] as f64,
                            b: clear[2] as f64,
                            a: clear[3] as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        // Detach the encoder borrow so the pass can live in host state
        // between begin_pass and end_pass.
        let mut rpass = rpass.forget_lifetime();

        let vp_w = if viewport_width > 0.0 { viewport_width } else { width as f32 };
        let vp_h = if viewport_height > 0.0 { viewport_height } else { height as f32 };
        let vp_x = if viewport_width > 0.0 { viewport_x } else { 0.0 };
        let vp_y = if viewport_height > 0.0 { viewport_y } else { 0.0 };
        rpass.set_viewport(vp_x, vp_y, vp_w, vp_h, 0.0, 1.0);
        rpass.set_scissor_rect(
            vp_x.max(0.0) as u32,
            vp_y.max(0.0) as u32,
            vp_w.max(0.0) as u32,
            vp_h.max(0.0) as u32,
        );

        self.pass = Some(PassState {
            rpass,
            params: PassParams {
                width: if width > 0 { width as f32 } else { 1.0 },
                height: if height > 0 { height as f32 } else { 1.0 },
                cam_x,
                cam_y,
                cam_rotation,
                cam_zoom,
            },
        });
        self.gizmo_lines.clear();
    }

    /// Flushes the gizmo batch, closes the pass, and clears pass state.
    /// No-op if no pass is open.
    pub fn end_pass(&mut self) {
        let Some(mut pass) = self.pass.take() else { return };

        if !self.gizmo_lines.is_empty() {
            self.ensure_gizmo_pipeline();
            if let Some(gpu) = self.gpu.as_ref() {
                let vertices = gizmo::build_line_vertices(&self.gizmo_lines, &pass.params);
                let ctx = RenderCtx::new(gpu.device(), gpu.queue(), gpu.surface_format());
                self.gizmo.draw(&ctx, &mut pass.rpass, &vertices);
            }
        }
        self.gizmo_lines.clear();

        // Dropping the recorder ends the render pass on the encoder.
        drop(pass);
    }

    /// Closes any still-open pass, submits the frame, and presents.
    /// No-op if no frame is open.
    pub fn end_frame(&mut self) {
        if self.pass.is_some() {
            self.end_pass();
        }
        let Some(frame) = self.frame.take() else { return };
        let Some(gpu) = self.gpu.as_ref() else { return };
        gpu.submit(frame);
    }

    // ── draw operations ──────────────────────────────────────────────────

    /// Draws a textured quad. Missing or still-loading textures are
    /// substituted with the fallback checkerboard.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_sprite(
        &mut self,
        texture_id: i32,
        x: f32,
        y: f32,
        rotation: f32,
        scale_x: f32,
        scale_y: f32,
        r: f32,
        g: f32,
        b: f32,
        a: f32,
    ) {
        let Some(gpu) = self.gpu.as_ref() else { return };
        if !self.sprite.is_ready() || self.pass.is_none() {
            return;
        }

        let resolved = self.registry.resolve_texture(texture_id);
        let Some(entry) = self.registry.texture_mut(resolved) else { return };
        self.sprite.ensure_bind_group(gpu.device(), entry);
        let (tex_w, tex_h) = (entry.width, entry.height);
        let Some(bind_group) = entry.bind_group.as_ref() else { return };

        let Some(pass) = self.pass.as_mut() else { return };

        let tex_scale_x = if tex_w > 0 { tex_w as f32 / SPRITE_BASE_SIZE } else { 1.0 };
        let tex_scale_y = if tex_h > 0 { tex_h as f32 / SPRITE_BASE_SIZE } else { 1.0 };
        let uniform = pack_draw_uniform(
            x,
            y,
            rotation,
            scale_x * tex_scale_x,
            scale_y * tex_scale_y,
            [r, g, b, a],
            &pass.params,
        );
        self.sprite.write_uniform(gpu.queue(), &uniform);

        let Some(pipeline) = self.sprite.pipeline() else { return };
        let Some(quad_vbo) = self.sprite.quad_vbo() else { return };
        pass.rpass.set_pipeline(pipeline);
        pass.rpass.set_bind_group(0, bind_group, &[]);
        pass.rpass.set_vertex_buffer(0, quad_vbo.slice(..));
        pass.rpass.draw(0..6, 0..1);
    }

    /// Draws a registered mesh with a flat tint. Unknown handles and a
    /// disabled mesh pipeline are silent no-ops.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_mesh(
        &mut self,
        mesh_id: i32,
        x: f32,
        y: f32,
        rotation: f32,
        scale_x: f32,
        scale_y: f32,
        r: f32,
        g: f32,
        b: f32,
        a: f32,
    ) {
        if self.gpu.is_none() || self.pass.is_none() {
            return;
        }
        self.ensure_mesh_resources();

        let Some(gpu) = self.gpu.as_ref() else { return };
        if !self.mesh.is_ready() {
            return;
        }
        let Some(entry) = self.registry.mesh(mesh_id) else { return };
        let Some(pass) = self.pass.as_mut() else { return };

        let uniform =
            pack_draw_uniform(x, y, rotation, scale_x, scale_y, [r, g, b, a], &pass.params);
        self.sprite.write_uniform(gpu.queue(), &uniform);

        let Some(pipeline) = self.mesh.pipeline() else { return };
        let Some(bind_group) = self.mesh.bind_group() else { return };
        pass.rpass.set_pipeline(pipeline);
        pass.rpass.set_bind_group(0, bind_group, &[]);
        pass.rpass.set_vertex_buffer(0, entry.vertex_buf.slice(..));
        pass.rpass.draw(0..entry.vertex_count, 0..1);
    }

    /// Buffers one gizmo line for the open pass. Pure append; the batch is
    /// expanded and drawn at `end_pass`.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_gizmo_line(
        &mut self,
        start_x: f32,
        start_y: f32,
        start_r: f32,
        start_g: f32,
        start_b: f32,
        start_a: f32,
        end_x: f32,
        end_y: f32,
        end_r: f32,
        end_g: f32,
        end_b: f32,
        end_a: f32,
        width: f32,
        style: i32,
        gap_scale: f32,
        line_scale: f32,
    ) {
        if self.pass.is_none() {
            return;
        }
        self.gizmo_lines.push(LineRecord {
            start: [start_x, start_y],
            start_color: [start_r, start_g, start_b, start_a],
            end: [end_x, end_y],
            end_color: [end_r, end_g, end_b, end_a],
            width,
            style: LineStyle::from_i32(style),
            gap_scale,
            line_scale,
        });
    }

    // ── resource creation ────────────────────────────────────────────────

    /// Requests an async texture load and returns its handle immediately.
    ///
    /// Before device init the request is queued; after, it starts right
    /// away. Failures substitute the fallback texture permanently.
    pub fn load_texture(&mut self, path: &str, nearest: bool) -> i32 {
        let id = self.registry.alloc_texture_id();
        self.registry.mark_texture_loading(id);
        self.registry.record_texture_path(id, path);
        if self.gpu.is_some() {
            self.loader.start_texture_load(id, path.to_owned(), nearest);
        } else {
            self.loader.queue_pending(PendingLoad::Texture {
                id,
                path: path.to_owned(),
                nearest,
            });
        }
        id
    }

    /// Requests an async shader-source load and returns its handle.
    pub fn load_wgsl(&mut self, path: &str) -> i32 {
        let id = self.registry.alloc_shader_id();
        self.registry.mark_shader_loading(id);
        self.registry.record_shader_path(id, path);
        if self.gpu.is_some() {
            self.loader.start_shader_load(id, path.to_owned());
        } else {
            self.loader.queue_pending(PendingLoad::Shader {
                id,
                path: path.to_owned(),
            });
        }
        id
    }

    /// Creates a render target usable both as pass target and sprite
    /// texture. Synchronous; requires the device.
    pub fn create_render_target(
        &mut self,
        width: i32,
        height: i32,
        nearest: bool,
    ) -> Result<i32, HostError> {
        if self.gpu.is_none() {
            return Err(HostError::DeviceNotReady);
        }
        self.ensure_sprite_resources();

        let Some(gpu) = self.gpu.as_ref() else {
            return Err(HostError::DeviceNotReady);
        };
        let id = self.registry.alloc_texture_id();
        self.registry.register_render_target(
            gpu.device(),
            gpu.surface_format(),
            id,
            width.max(1) as u32,
            height.max(1) as u32,
            nearest,
        );
        if let Some(entry) = self.registry.texture_mut(id) {
            self.sprite.ensure_bind_group(gpu.device(), entry);
        }
        Ok(id)
    }

    /// Uploads a procedural rectangle mesh. Synchronous; requires the device.
    pub fn create_mesh_rectangle(&mut self, width: f32, height: f32) -> Result<i32, HostError> {
        let Some(gpu) = self.gpu.as_ref() else {
            return Err(HostError::DeviceNotReady);
        };
        let vertices = geometry::rectangle_vertices(width, height);
        Ok(self.registry.register_mesh(gpu.device(), &vertices))
    }

    /// Uploads a procedural capsule mesh. Synchronous; requires the device.
    pub fn create_mesh_capsule(
        &mut self,
        radius: f32,
        half_length: f32,
        segments: i32,
    ) -> Result<i32, HostError> {
        let Some(gpu) = self.gpu.as_ref() else {
            return Err(HostError::DeviceNotReady);
        };
        let vertices = geometry::capsule_vertices(radius, half_length, segments);
        Ok(self.registry.register_mesh(gpu.device(), &vertices))
    }

    // ── texture introspection ────────────────────────────────────────────

    pub fn texture_width(&self, texture_id: i32) -> u32 {
        self.registry.texture(texture_id).map_or(0, |t| t.width)
    }

    pub fn texture_height(&self, texture_id: i32) -> u32 {
        self.registry.texture(texture_id).map_or(0, |t| t.height)
    }

    pub fn is_texture_loaded(&self, texture_id: i32) -> bool {
        self.registry.texture(texture_id).is_some()
    }

    /// Drains asset diagnostics (load failures, fallback substitutions)
    /// queued since the last call, in emit order.
    ///
    /// The same messages also go to the log; this channel exists so the
    /// embedding can surface them without scraping log output. Each failure
    /// is emitted at most once.
    pub fn drain_asset_errors(&mut self) -> Vec<String> {
        self.registry.drain_asset_errors()
    }

    // ── internals ────────────────────────────────────────────────────────

    fn load_builtin_shader(&mut self, path: &str) -> i32 {
        let id = self.registry.alloc_shader_id();
        self.registry.record_shader_path(id, path);
        self.registry.mark_shader_loading(id);
        match self.loader.fetch_text_blocking(path) {
            Ok(source) => {
                self.registry.set_shader_source(id, source);
                id
            }
            Err(err) => {
                self.registry
                    .report_asset_error(format!("Shader load error: {err:#}"));
                self.registry.fail_shader(id);
                0
            }
        }
    }

    /// Applies completed asset loads. Called once per frame begin.
    fn pump_asset_events(&mut self) {
        let Some(gpu) = self.gpu.as_ref() else { return };
        for event in self.loader.poll_events() {
            match event {
                LoadEvent::TextureDecoded {
                    id,
                    width,
                    height,
                    pixels,
                    nearest,
                } => {
                    self.registry.register_texture_rgba8(
                        gpu.device(),
                        gpu.queue(),
                        id,
                        width,
                        height,
                        &pixels,
                        nearest,
                    );
                    self.registry.finish_texture_loading(id);
                    if let Some(entry) = self.registry.texture_mut(id) {
                        self.sprite.ensure_bind_group(gpu.device(), entry);
                    }
                }
                LoadEvent::TextureFailed { id, error } => {
                    self.registry
                        .report_asset_error(format!("Texture load error: {error}"));
                    self.registry.finish_texture_loading(id);
                }
                LoadEvent::ShaderLoaded { id, source } => {
                    self.registry.set_shader_source(id, source);
                }
                LoadEvent::ShaderFailed { id, error } => {
                    self.registry
                        .report_asset_error(format!("Shader load error: {error}"));
                    self.registry.fail_shader(id);
                }
            }
        }
    }

    fn ensure_sprite_resources(&mut self) {
        let Some(gpu) = self.gpu.as_ref() else { return };
        if self.sprite_shader_id <= 0 {
            return;
        }
        let Some(source) = self.registry.shader_source(self.sprite_shader_id) else { return };
        let ctx = RenderCtx::new(gpu.device(), gpu.queue(), gpu.surface_format());
        self.sprite.ensure_resources(&ctx, source);
        self.registry.ensure_fallback_texture(gpu.device(), gpu.queue());
    }

    fn ensure_mesh_resources(&mut self) {
        self.ensure_sprite_resources();
        let Some(gpu) = self.gpu.as_ref() else { return };
        if self.mesh_shader_id <= 0 {
            return;
        }
        let Some(source) = self.registry.shader_source(self.mesh_shader_id) else { return };
        let Some(uniform_buf) = self.sprite.uniform_buf() else { return };
        let ctx = RenderCtx::new(gpu.device(), gpu.queue(), gpu.surface_format());
        self.mesh.ensure_resources(&ctx, source, uniform_buf);
    }

    fn ensure_gizmo_pipeline(&mut self) {
        let Some(gpu) = self.gpu.as_ref() else { return };
        if self.gizmo_shader_id <= 0 {
            return;
        }
        let Some(source) = self.registry.shader_source(self.gizmo_shader_id) else { return };
        let ctx = RenderCtx::new(gpu.device(), gpu.queue(), gpu.surface_format());
        self.gizmo.ensure_pipeline(&ctx, source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> RenderHost<'static> {
        RenderHost::new(HostConfig::default())
    }

    #[test]
    fn begin_frame_without_device_fails() {
        let mut h = host();
        assert!(!h.begin_frame());
        assert!(!h.is_device_ready());
    }

    #[test]
    fn sync_creates_before_device_fail_without_allocating() {
        let mut h = host();
        assert_eq!(h.create_render_target(64, 64, true), Err(HostError::DeviceNotReady));
        assert_eq!(h.create_mesh_rectangle(2.0, 1.0), Err(HostError::DeviceNotReady));
        assert_eq!(h.create_mesh_capsule(1.0, 0.5, 16), Err(HostError::DeviceNotReady));
        // No texture handle was consumed by the failed render-target call.
        assert_eq!(h.load_texture("a.png", true), 1);
    }

    #[test]
    fn async_loads_before_device_queue_in_issue_order() {
        let mut h = host();
        let t1 = h.load_texture("a.png", true);
        let s1 = h.load_wgsl("fx.wgsl");
        let t2 = h.load_texture("b.png", false);
        assert_eq!((t1, s1, t2), (1, 1, 2));

        let drained = h.loader.drain_pending();
        assert_eq!(
            drained,
            vec![
                PendingLoad::Texture { id: 1, path: "a.png".into(), nearest: true },
                PendingLoad::Shader { id: 1, path: "fx.wgsl".into() },
                PendingLoad::Texture { id: 2, path: "b.png".into(), nearest: false },
            ]
        );
    }

    #[test]
    fn draws_without_pass_are_silent_noops() {
        let mut h = host();
        h.draw_sprite(1, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0);
        h.draw_mesh(1, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0);
        h.draw_gizmo_line(
            0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0, 2.0, 0, 1.0, 1.0,
        );
        h.end_pass();
        h.end_frame();
        assert!(h.gizmo_lines.is_empty());
        assert!(h.frame.is_none());
        assert!(h.pass.is_none());
    }

    #[test]
    fn pending_texture_keeps_loading_mark_until_resolved() {
        let mut h = host();
        let id = h.load_texture("a.png", true);
        // The handle is unresolved, but lookups stay quiet while loading.
        assert_eq!(h.registry.resolve_texture(id), crate::registry::FALLBACK_TEXTURE_ID);
        assert!(!h.is_texture_loaded(id));
        assert_eq!(h.texture_width(id), 0);
        assert_eq!(h.texture_height(id), 0);
    }

    #[test]
    fn failed_builtin_shader_emits_one_drainable_error() {
        let mut h = RenderHost::new(HostConfig {
            asset_root: "./definitely-not-a-dir".to_owned(),
            ..HostConfig::default()
        });
        let id = h.load_builtin_shader(SPRITE_SHADER_PATH);
        assert_eq!(id, 0);

        let errors = h.drain_asset_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Shader load error:"));
        assert!(h.drain_asset_errors().is_empty());
    }

    #[test]
    fn fallback_substitution_surfaces_through_the_error_drain() {
        let mut h = host();
        let id = h.registry.alloc_texture_id();
        h.registry.record_texture_path(id, "missing.png");
        h.registry.resolve_texture(id);
        h.registry.resolve_texture(id);

        let errors = h.drain_asset_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Fallback texture used for id"));
        assert!(errors[0].contains("missing.png"));
    }
}
