//! Transform math for sprite/mesh draws.
//!
//! Pure functions: object/camera/viewport transforms are composed into a
//! 16-float uniform consumed by the vertex stage. The computation order is
//! load-bearing for bit-compatible rendering and must not be reordered.

use bytemuck::{Pod, Zeroable};

/// Camera and target parameters fixed for the duration of one pass.
#[derive(Debug, Copy, Clone)]
pub struct PassParams {
    /// Logical target width, clamped to at least 1 at pass begin.
    pub width: f32,
    /// Logical target height, clamped to at least 1 at pass begin.
    pub height: f32,
    pub cam_x: f32,
    pub cam_y: f32,
    pub cam_rotation: f32,
    pub cam_zoom: f32,
}

impl PassParams {
    /// Zoom with the division-by-zero guard applied (0 acts as 1).
    #[inline]
    pub fn safe_zoom(&self) -> f32 {
        if self.cam_zoom == 0.0 { 1.0 } else { self.cam_zoom }
    }

    /// World-units-to-NDC scale for this pass: `2 / extent / zoom` per axis.
    ///
    /// A non-positive extent yields 0 on that axis, collapsing the draw
    /// rather than dividing by zero.
    #[inline]
    pub fn ndc_scale(&self) -> (f32, f32) {
        let zoom = self.safe_zoom();
        let sx = if self.width > 0.0 { 2.0 / self.width / zoom } else { 0.0 };
        let sy = if self.height > 0.0 { 2.0 / self.height / zoom } else { 0.0 };
        (sx, sy)
    }

    /// Camera rotation as `(cos(-rot), sin(-rot))`.
    #[inline]
    pub fn camera_cos_sin(&self) -> (f32, f32) {
        ((-self.cam_rotation).cos(), (-self.cam_rotation).sin())
    }
}

/// Projects a world-space point to NDC through this pass's camera.
///
/// Subtract camera position, rotate into view space, then apply the NDC
/// scale. Used by the gizmo batcher; sprite/mesh draws do the same math in
/// the vertex shader.
#[inline]
pub fn world_to_ndc(x: f32, y: f32, params: &PassParams) -> (f32, f32) {
    let (cos, sin) = params.camera_cos_sin();
    let (sx, sy) = params.ndc_scale();
    let rel_x = x - params.cam_x;
    let rel_y = y - params.cam_y;
    let view_x = rel_x * cos - rel_y * sin;
    let view_y = rel_x * sin + rel_y * cos;
    (view_x * sx, view_y * sy)
}

/// Per-draw uniform shared by the sprite and mesh pipelines.
///
/// Exactly 16 packed f32s; the shader reads them as four vec4s.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct DrawUniform {
    /// (x, y, cos(rot), sin(rot))
    pub model: [f32; 4],
    /// (cam_x, cam_y, cos(-cam_rot), sin(-cam_rot))
    pub view: [f32; 4],
    /// (ndc_scale_x, ndc_scale_y, obj_scale_x, obj_scale_y)
    pub scale: [f32; 4],
    /// (r, g, b, a)
    pub tint: [f32; 4],
}

/// Packs one draw's transform into the shared uniform layout.
///
/// `scale_x`/`scale_y` are the final object scale; for sprites the caller has
/// already folded in the texture-to-reference adjustment.
pub fn pack_draw_uniform(
    x: f32,
    y: f32,
    rotation: f32,
    scale_x: f32,
    scale_y: f32,
    color: [f32; 4],
    params: &PassParams,
) -> DrawUniform {
    let (ndc_x, ndc_y) = params.ndc_scale();
    let (cam_cos, cam_sin) = params.camera_cos_sin();
    DrawUniform {
        model: [x, y, rotation.cos(), rotation.sin()],
        view: [params.cam_x, params.cam_y, cam_cos, cam_sin],
        scale: [ndc_x, ndc_y, scale_x, scale_y],
        tint: color,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> PassParams {
        PassParams {
            width: 800.0,
            height: 600.0,
            cam_x: 10.0,
            cam_y: -20.0,
            cam_rotation: 0.5,
            cam_zoom: 2.0,
        }
    }

    #[test]
    fn uniform_packs_sixteen_floats_in_order() {
        let u = pack_draw_uniform(1.0, 2.0, 0.0, 3.0, 4.0, [0.1, 0.2, 0.3, 0.4], &params());
        let raw: [f32; 16] = bytemuck::cast(u);
        assert_eq!(raw[0], 1.0);
        assert_eq!(raw[1], 2.0);
        assert_eq!(raw[2], 1.0); // cos(0)
        assert_eq!(raw[3], 0.0); // sin(0)
        assert_eq!(raw[4], 10.0);
        assert_eq!(raw[5], -20.0);
        assert_eq!(raw[6], (-0.5f32).cos());
        assert_eq!(raw[7], (-0.5f32).sin());
        assert_eq!(raw[8], 2.0 / 800.0 / 2.0);
        assert_eq!(raw[9], 2.0 / 600.0 / 2.0);
        assert_eq!(raw[10], 3.0);
        assert_eq!(raw[11], 4.0);
        assert_eq!(&raw[12..], &[0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn uniform_is_exactly_64_bytes() {
        assert_eq!(std::mem::size_of::<DrawUniform>(), 64);
    }

    #[test]
    fn zero_zoom_acts_as_one() {
        let mut p = params();
        p.cam_zoom = 0.0;
        assert_eq!(p.safe_zoom(), 1.0);
        let (sx, sy) = p.ndc_scale();
        assert_eq!(sx, 2.0 / 800.0);
        assert_eq!(sy, 2.0 / 600.0);
    }

    #[test]
    fn non_positive_extent_collapses_axis() {
        let mut p = params();
        p.width = 0.0;
        let (sx, sy) = p.ndc_scale();
        assert_eq!(sx, 0.0);
        assert!(sy > 0.0);
    }

    #[test]
    fn world_to_ndc_identity_camera() {
        let p = PassParams {
            width: 200.0,
            height: 100.0,
            cam_x: 0.0,
            cam_y: 0.0,
            cam_rotation: 0.0,
            cam_zoom: 1.0,
        };
        let (x, y) = world_to_ndc(100.0, 50.0, &p);
        assert!((x - 1.0).abs() < 1e-6);
        assert!((y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn world_to_ndc_subtracts_camera_before_rotating() {
        let p = PassParams {
            width: 2.0,
            height: 2.0,
            cam_x: 5.0,
            cam_y: 0.0,
            cam_rotation: std::f32::consts::FRAC_PI_2,
            cam_zoom: 1.0,
        };
        // Point at the camera position projects to the origin regardless of
        // rotation.
        let (x, y) = world_to_ndc(5.0, 0.0, &p);
        assert_eq!((x, y), (0.0, 0.0));
        // One unit right of the camera, rotated by -90 degrees.
        let (x, y) = world_to_ndc(6.0, 0.0, &p);
        assert!((x - 0.0).abs() < 1e-6);
        assert!((y - -1.0).abs() < 1e-6);
    }
}
