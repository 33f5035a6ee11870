//! GPU resource registry.
//!
//! Owns textures, render targets, meshes, and shader-source blobs, each
//! addressed by a monotonically increasing integer handle. Handles are never
//! reused within a process lifetime. Handle 0 is reserved for the built-in
//! fallback checkerboard texture, which is created at first frame begin and
//! never evicted.

pub mod geometry;

use std::collections::{HashMap, HashSet};

use wgpu::util::DeviceExt;

/// Handle of the always-valid fallback texture.
pub const FALLBACK_TEXTURE_ID: i32 = 0;

/// Edge length of the fallback checkerboard, in pixels.
pub const CHECKERBOARD_SIZE: u32 = 64;

/// A registered texture or render target.
///
/// Entries are immutable after creation apart from the lazily-built bind
/// group, which is cached on first sprite draw using this texture.
pub struct TextureEntry {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub bind_group: Option<wgpu::BindGroup>,
    pub width: u32,
    pub height: u32,
}

/// An uploaded procedural mesh. Immutable once created.
pub struct MeshEntry {
    pub vertex_buf: wgpu::Buffer,
    pub vertex_count: u32,
}

/// Resource tables plus the bookkeeping the asset pipeline needs: which
/// texture handles are still loading, which have already produced a fallback
/// diagnostic, the path each handle was requested from, and the queue of
/// asset diagnostics awaiting the embedding.
pub struct ResourceRegistry {
    textures: HashMap<i32, TextureEntry>,
    next_texture_id: i32,

    meshes: HashMap<i32, MeshEntry>,
    next_mesh_id: i32,

    shader_sources: HashMap<i32, String>,
    shader_paths: HashMap<i32, String>,
    loading_shaders: HashSet<i32>,
    next_shader_id: i32,

    texture_paths: HashMap<i32, String>,
    loading_textures: HashSet<i32>,
    fallback_reported: HashSet<i32>,

    asset_errors: Vec<String>,
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self {
            textures: HashMap::new(),
            next_texture_id: 1,
            meshes: HashMap::new(),
            next_mesh_id: 1,
            shader_sources: HashMap::new(),
            shader_paths: HashMap::new(),
            loading_shaders: HashSet::new(),
            next_shader_id: 1,
            texture_paths: HashMap::new(),
            loading_textures: HashSet::new(),
            fallback_reported: HashSet::new(),
            asset_errors: Vec::new(),
        }
    }

    // ── asset diagnostics ────────────────────────────────────────────────

    /// Logs an asset diagnostic and queues it for the embedding.
    ///
    /// Every message goes out on both channels: the log for operators, the
    /// queue for programmatic consumers (drained via the host).
    pub fn report_asset_error(&mut self, message: String) {
        log::error!("{message}");
        self.asset_errors.push(message);
    }

    /// Takes the diagnostics queued since the last drain, in emit order.
    pub fn drain_asset_errors(&mut self) -> Vec<String> {
        std::mem::take(&mut self.asset_errors)
    }

    // ── handle allocation ────────────────────────────────────────────────

    pub fn alloc_texture_id(&mut self) -> i32 {
        let id = self.next_texture_id;
        self.next_texture_id += 1;
        id
    }

    pub fn alloc_mesh_id(&mut self) -> i32 {
        let id = self.next_mesh_id;
        self.next_mesh_id += 1;
        id
    }

    pub fn alloc_shader_id(&mut self) -> i32 {
        let id = self.next_shader_id;
        self.next_shader_id += 1;
        id
    }

    // ── textures ─────────────────────────────────────────────────────────

    pub fn texture(&self, id: i32) -> Option<&TextureEntry> {
        self.textures.get(&id)
    }

    pub fn texture_mut(&mut self, id: i32) -> Option<&mut TextureEntry> {
        self.textures.get_mut(&id)
    }

    pub fn record_texture_path(&mut self, id: i32, path: &str) {
        self.texture_paths.insert(id, path.to_owned());
    }

    pub fn mark_texture_loading(&mut self, id: i32) {
        self.loading_textures.insert(id);
    }

    pub fn finish_texture_loading(&mut self, id: i32) {
        self.loading_textures.remove(&id);
    }

    /// Resolves a texture handle for drawing.
    ///
    /// Returns the handle itself when registered, otherwise the fallback
    /// handle. The first failed lookup per handle emits a diagnostic, unless
    /// the handle is still loading (normal async latency is not noise).
    pub fn resolve_texture(&mut self, id: i32) -> i32 {
        if self.textures.contains_key(&id) {
            return id;
        }
        self.report_fallback_usage(id, "texture id not found");
        FALLBACK_TEXTURE_ID
    }

    fn report_fallback_usage(&mut self, id: i32, reason: &str) {
        if self.loading_textures.contains(&id) {
            return;
        }
        if !self.fallback_reported.insert(id) {
            return;
        }
        let message = match self.texture_paths.get(&id) {
            Some(path) => format!("Fallback texture used for id {id}: {reason} (path: {path})"),
            None => format!("Fallback texture used for id {id}: {reason}"),
        };
        self.report_asset_error(message);
    }

    /// Uploads decoded RGBA8 pixels as a sampleable texture under `id`.
    pub fn register_texture_rgba8(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        id: i32,
        width: u32,
        height: u32,
        pixels: &[u8],
        nearest: bool,
    ) {
        let width = width.max(1);
        let height = height.max(1);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("ashur texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = create_sampler(device, nearest);
        self.textures.insert(
            id,
            TextureEntry {
                texture,
                view,
                sampler,
                bind_group: None,
                width,
                height,
            },
        );
    }

    /// Creates a writable + sampleable render target in the surface format,
    /// so passes targeting it share pipelines with swapchain passes.
    pub fn register_render_target(
        &mut self,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        id: i32,
        width: u32,
        height: u32,
        nearest: bool,
    ) {
        let width = width.max(1);
        let height = height.max(1);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("ashur render target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = create_sampler(device, nearest);
        self.texture_paths.insert(id, "<render-target>".to_owned());
        self.textures.insert(
            id,
            TextureEntry {
                texture,
                view,
                sampler,
                bind_group: None,
                width,
                height,
            },
        );
    }

    /// Creates the fallback checkerboard at handle 0 if not present yet.
    pub fn ensure_fallback_texture(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        if self.textures.contains_key(&FALLBACK_TEXTURE_ID) {
            return;
        }
        let pixels = checkerboard_pixels(CHECKERBOARD_SIZE);
        self.register_texture_rgba8(
            device,
            queue,
            FALLBACK_TEXTURE_ID,
            CHECKERBOARD_SIZE,
            CHECKERBOARD_SIZE,
            &pixels,
            true,
        );
    }

    // ── meshes ───────────────────────────────────────────────────────────

    pub fn mesh(&self, id: i32) -> Option<&MeshEntry> {
        self.meshes.get(&id)
    }

    /// Uploads a triangle list of `(x, y)` pairs as a mesh.
    ///
    /// Degenerate (empty) geometry registers nothing and returns 0.
    pub fn register_mesh(&mut self, device: &wgpu::Device, vertices: &[f32]) -> i32 {
        if vertices.is_empty() {
            return 0;
        }
        let id = self.alloc_mesh_id();
        let vertex_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("ashur mesh vbo"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        self.meshes.insert(
            id,
            MeshEntry {
                vertex_buf,
                vertex_count: (vertices.len() / 2) as u32,
            },
        );
        id
    }

    // ── shaders ──────────────────────────────────────────────────────────

    pub fn shader_source(&self, id: i32) -> Option<&str> {
        self.shader_sources.get(&id).map(String::as_str)
    }

    pub fn record_shader_path(&mut self, id: i32, path: &str) {
        self.shader_paths.insert(id, path.to_owned());
    }

    pub fn mark_shader_loading(&mut self, id: i32) {
        self.loading_shaders.insert(id);
    }

    pub fn set_shader_source(&mut self, id: i32, source: String) {
        self.shader_sources.insert(id, source);
        self.loading_shaders.remove(&id);
    }

    pub fn fail_shader(&mut self, id: i32) {
        self.loading_shaders.remove(&id);
    }

    #[cfg(test)]
    fn fallback_was_reported(&self, id: i32) -> bool {
        self.fallback_reported.contains(&id)
    }
}

/// ClampToEdge sampler with uniform nearest or linear filtering.
pub fn create_sampler(device: &wgpu::Device, nearest: bool) -> wgpu::Sampler {
    let (label, filter, mipmap) = if nearest {
        (
            "ashur sampler nearest",
            wgpu::FilterMode::Nearest,
            wgpu::MipmapFilterMode::Nearest,
        )
    } else {
        (
            "ashur sampler linear",
            wgpu::FilterMode::Linear,
            wgpu::MipmapFilterMode::Linear,
        )
    };
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: mipmap,
        ..Default::default()
    })
}

/// Two-tone checkerboard pixels for the fallback texture (8x8 px cells).
pub fn checkerboard_pixels(size: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let checker = ((x >> 3) ^ (y >> 3)) & 1;
            let base: u8 = if checker == 1 { 220 } else { 40 };
            data.extend_from_slice(&[base, 120, 255 - base, 255]);
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_monotonic_per_class() {
        let mut reg = ResourceRegistry::new();
        assert_eq!(reg.alloc_texture_id(), 1);
        assert_eq!(reg.alloc_texture_id(), 2);
        assert_eq!(reg.alloc_mesh_id(), 1);
        assert_eq!(reg.alloc_shader_id(), 1);
        assert_eq!(reg.alloc_shader_id(), 2);
        assert_eq!(reg.alloc_texture_id(), 3);
    }

    #[test]
    fn unknown_texture_resolves_to_fallback_and_reports_once() {
        let mut reg = ResourceRegistry::new();
        let id = reg.alloc_texture_id();
        assert_eq!(reg.resolve_texture(id), FALLBACK_TEXTURE_ID);
        assert!(reg.fallback_was_reported(id));
        // Second resolve stays on the fallback without re-reporting.
        assert_eq!(reg.resolve_texture(id), FALLBACK_TEXTURE_ID);
    }

    #[test]
    fn diagnostic_suppressed_while_loading() {
        let mut reg = ResourceRegistry::new();
        let id = reg.alloc_texture_id();
        reg.mark_texture_loading(id);
        assert_eq!(reg.resolve_texture(id), FALLBACK_TEXTURE_ID);
        assert!(!reg.fallback_was_reported(id));
        // Once the load settles (here: failed), the next lookup reports.
        reg.finish_texture_loading(id);
        assert_eq!(reg.resolve_texture(id), FALLBACK_TEXTURE_ID);
        assert!(reg.fallback_was_reported(id));
    }

    #[test]
    fn fallback_diagnostic_is_queued_once_for_the_embedding() {
        let mut reg = ResourceRegistry::new();
        let id = reg.alloc_texture_id();
        reg.record_texture_path(id, "sprites/ship.png");
        reg.resolve_texture(id);
        reg.resolve_texture(id);

        let errors = reg.drain_asset_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0],
            format!("Fallback texture used for id {id}: texture id not found (path: sprites/ship.png)")
        );
        // Drained; a later drain without new failures yields nothing.
        assert!(reg.drain_asset_errors().is_empty());
    }

    #[test]
    fn queued_diagnostics_preserve_emit_order() {
        let mut reg = ResourceRegistry::new();
        reg.report_asset_error("first".to_owned());
        reg.report_asset_error("second".to_owned());
        assert_eq!(reg.drain_asset_errors(), vec!["first", "second"]);
    }

    #[test]
    fn checkerboard_pixel_values() {
        let data = checkerboard_pixels(CHECKERBOARD_SIZE);
        assert_eq!(data.len(), (64 * 64 * 4) as usize);
        // (0,0): both cell indices 0, checker 0 -> dark tone.
        assert_eq!(&data[0..4], &[40, 120, 215, 255]);
        // (8,0): cell (1,0), checker 1 -> light tone.
        let i = (8 * 4) as usize;
        assert_eq!(&data[i..i + 4], &[220, 120, 35, 255]);
        // (8,8): cells (1,1), checker 0 again.
        let i = ((8 * 64 + 8) * 4) as usize;
        assert_eq!(&data[i..i + 4], &[40, 120, 215, 255]);
    }
}
