//! Gizmo line batching.
//!
//! Draw calls only append `LineRecord`s; the expansion into screen-space
//! quads happens once per pass, at pass end. Each record becomes one or more
//! two-triangle quads in a single dynamic vertex buffer, drawn with the
//! dedicated vertex-color pipeline.

use bytemuck::{Pod, Zeroable};

use crate::transform::PassParams;

/// Stroke width used when a record carries a non-positive width.
pub const DEFAULT_LINE_WIDTH: f32 = 2.0;

/// Dash styling for a gizmo line.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LineStyle {
    /// One quad spanning the full segment.
    Solid,
    /// Dash length and gap length both equal the stroke width.
    FixedDash,
    /// Dash/gap lengths scaled from the stroke width per record.
    ScaledDash,
}

impl LineStyle {
    /// Wire value mapping; unknown values fall back to solid.
    pub fn from_i32(value: i32) -> Self {
        match value {
            1 => LineStyle::FixedDash,
            2 => LineStyle::ScaledDash,
            _ => LineStyle::Solid,
        }
    }
}

/// One buffered gizmo line, as appended by the draw call.
#[derive(Debug, Copy, Clone)]
pub struct LineRecord {
    pub start: [f32; 2],
    pub start_color: [f32; 4],
    pub end: [f32; 2],
    pub end_color: [f32; 4],
    pub width: f32,
    pub style: LineStyle,
    pub gap_scale: f32,
    pub line_scale: f32,
}

/// Vertex format of the expanded quads (NDC position + straight color).
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct LineVertex {
    pub pos: [f32; 2],
    pub color: [f32; 4],
}

impl LineVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x2, // pos
        1 => Float32x4  // color
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LineVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Expands buffered line records into screen-space quads.
///
/// Endpoints go through the same camera math as sprite/mesh draws, then into
/// pixel space where dash walking happens; emitted vertices are back in NDC.
/// Zero-length segments are skipped. A dash step that is non-positive or a
/// dash that covers the whole segment degrades to a single solid quad.
pub fn build_line_vertices(records: &[LineRecord], params: &PassParams) -> Vec<LineVertex> {
    if records.is_empty() || params.width <= 0.0 || params.height <= 0.0 {
        return Vec::new();
    }

    let half_w = params.width * 0.5;
    let half_h = params.height * 0.5;
    let mut vertices = Vec::new();

    for rec in records {
        let thickness = if rec.width.is_finite() && rec.width > 0.0 {
            rec.width
        } else {
            DEFAULT_LINE_WIDTH
        };
        let half_line = thickness * 0.5;

        let (ndc_sx, ndc_sy) = crate::transform::world_to_ndc(rec.start[0], rec.start[1], params);
        let (ndc_ex, ndc_ey) = crate::transform::world_to_ndc(rec.end[0], rec.end[1], params);

        let screen_sx = ndc_sx * half_w;
        let screen_sy = ndc_sy * half_h;
        let screen_ex = ndc_ex * half_w;
        let screen_ey = ndc_ey * half_h;

        let dx = screen_ex - screen_sx;
        let dy = screen_ey - screen_sy;
        let len = dx.hypot(dy);
        if !len.is_finite() || len <= 0.0 {
            continue;
        }
        let inv_len = 1.0 / len;
        let ux = dx * inv_len;
        let uy = dy * inv_len;
        // Perpendicular half-width offset, expressed in NDC.
        let off = [-uy * half_line / half_w, ux * half_line / half_h];

        let (dash_len, gap_len) = match rec.style {
            LineStyle::Solid => (len, 0.0),
            LineStyle::FixedDash => (thickness, thickness),
            LineStyle::ScaledDash => {
                let line_scale = if rec.line_scale.is_finite() && rec.line_scale > 0.0 {
                    rec.line_scale
                } else {
                    1.0
                };
                let gap_scale = if rec.gap_scale.is_finite() && rec.gap_scale > 0.0 {
                    rec.gap_scale
                } else {
                    1.0
                };
                (thickness * line_scale, thickness * gap_scale)
            }
        };

        let step = dash_len + gap_len;
        if !step.is_finite() || step <= 0.0 || dash_len >= len {
            push_quad(
                &mut vertices,
                [ndc_sx, ndc_sy],
                [ndc_ex, ndc_ey],
                rec.start_color,
                rec.end_color,
                off,
            );
            continue;
        }

        let mut pos = 0.0f32;
        while pos < len {
            let seg_len = dash_len.min(len - pos);
            if seg_len > 0.0 {
                let t0 = pos * inv_len;
                let t1 = (pos + seg_len) * inv_len;
                let seg_start = [
                    (screen_sx + ux * pos) / half_w,
                    (screen_sy + uy * pos) / half_h,
                ];
                let seg_end = [
                    (screen_sx + ux * (pos + seg_len)) / half_w,
                    (screen_sy + uy * (pos + seg_len)) / half_h,
                ];
                push_quad(
                    &mut vertices,
                    seg_start,
                    seg_end,
                    lerp_color(rec.start_color, rec.end_color, t0),
                    lerp_color(rec.start_color, rec.end_color, t1),
                    off,
                );
            }
            pos += step;
        }
    }

    vertices
}

fn lerp_color(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
        a[3] + (b[3] - a[3]) * t,
    ]
}

fn push_quad(
    out: &mut Vec<LineVertex>,
    start: [f32; 2],
    end: [f32; 2],
    start_color: [f32; 4],
    end_color: [f32; 4],
    off: [f32; 2],
) {
    let p1 = [start[0] + off[0], start[1] + off[1]];
    let p2 = [start[0] - off[0], start[1] - off[1]];
    let p3 = [end[0] - off[0], end[1] - off[1]];
    let p4 = [end[0] + off[0], end[1] + off[1]];
    out.extend_from_slice(&[
        LineVertex { pos: p1, color: start_color },
        LineVertex { pos: p2, color: start_color },
        LineVertex { pos: p3, color: end_color },
        LineVertex { pos: p1, color: start_color },
        LineVertex { pos: p3, color: end_color },
        LineVertex { pos: p4, color: end_color },
    ]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(w: f32, h: f32) -> PassParams {
        PassParams {
            width: w,
            height: h,
            cam_x: 0.0,
            cam_y: 0.0,
            cam_rotation: 0.0,
            cam_zoom: 1.0,
        }
    }

    fn line(style: LineStyle, width: f32, len: f32) -> LineRecord {
        LineRecord {
            start: [0.0, 0.0],
            start_color: [1.0, 0.0, 0.0, 1.0],
            end: [len, 0.0],
            end_color: [0.0, 0.0, 1.0, 1.0],
            width,
            style,
            gap_scale: 1.0,
            line_scale: 1.0,
        }
    }

    #[test]
    fn solid_line_is_one_quad() {
        let verts = build_line_vertices(&[line(LineStyle::Solid, 2.0, 100.0)], &params(400.0, 300.0));
        assert_eq!(verts.len(), 6);
        // Colors lerp from start to end across the quad.
        assert_eq!(verts[0].color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(verts[5].color, [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn zero_length_segment_is_skipped() {
        let verts = build_line_vertices(&[line(LineStyle::Solid, 2.0, 0.0)], &params(400.0, 300.0));
        assert!(verts.is_empty());
    }

    #[test]
    fn short_fixed_dash_degrades_to_solid() {
        // Segment shorter than one stroke width: dash covers everything.
        let verts = build_line_vertices(&[line(LineStyle::FixedDash, 8.0, 4.0)], &params(400.0, 300.0));
        assert_eq!(verts.len(), 6);
    }

    #[test]
    fn fixed_dash_walks_in_width_steps() {
        // 100px segment, width 10: dash=gap=10, step 20 -> dashes at
        // 0,20,40,60,80 = 5 quads.
        let verts =
            build_line_vertices(&[line(LineStyle::FixedDash, 10.0, 100.0)], &params(200.0, 200.0));
        assert_eq!(verts.len(), 5 * 6);
    }

    #[test]
    fn scaled_dash_uses_scale_factors() {
        let mut rec = line(LineStyle::ScaledDash, 10.0, 100.0);
        rec.line_scale = 2.0; // dash 20
        rec.gap_scale = 3.0; // gap 30
        // step 50 -> dashes at 0 and 50 = 2 quads.
        let verts = build_line_vertices(&[rec], &params(200.0, 200.0));
        assert_eq!(verts.len(), 2 * 6);
    }

    #[test]
    fn non_positive_scales_default_to_one() {
        let mut rec = line(LineStyle::ScaledDash, 10.0, 100.0);
        rec.line_scale = 0.0;
        rec.gap_scale = -1.0;
        // Behaves like fixed dash: step 20 -> 5 quads.
        let verts = build_line_vertices(&[rec], &params(200.0, 200.0));
        assert_eq!(verts.len(), 5 * 6);
    }

    #[test]
    fn dash_colors_interpolate_along_segment() {
        let verts =
            build_line_vertices(&[line(LineStyle::FixedDash, 25.0, 100.0)], &params(200.0, 200.0));
        // dash=gap=25, step 50: dashes at [0,25] and [50,75].
        assert_eq!(verts.len(), 2 * 6);
        let second_dash_start = verts[6].color;
        assert!((second_dash_start[0] - 0.5).abs() < 1e-6);
        assert!((second_dash_start[2] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn non_positive_width_uses_default() {
        let rec = line(LineStyle::FixedDash, 0.0, 1.0);
        // Default width 2: dash covers the 1px segment -> single solid quad.
        let verts = build_line_vertices(&[rec], &params(200.0, 200.0));
        assert_eq!(verts.len(), 6);
    }

    #[test]
    fn degenerate_viewport_yields_nothing() {
        let verts = build_line_vertices(&[line(LineStyle::Solid, 2.0, 10.0)], &params(0.0, 300.0));
        assert!(verts.is_empty());
    }

    #[test]
    fn unknown_style_value_maps_to_solid() {
        assert_eq!(LineStyle::from_i32(0), LineStyle::Solid);
        assert_eq!(LineStyle::from_i32(1), LineStyle::FixedDash);
        assert_eq!(LineStyle::from_i32(2), LineStyle::ScaledDash);
        assert_eq!(LineStyle::from_i32(7), LineStyle::Solid);
    }
}
