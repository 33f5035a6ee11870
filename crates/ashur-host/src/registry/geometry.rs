//! Procedural mesh geometry.
//!
//! Output is a flat list of `(x, y)` pairs forming a triangle list; the
//! vertex count is `len / 2`.

/// Axis-aligned rectangle centered on the origin, two triangles.
pub fn rectangle_vertices(width: f32, height: f32) -> Vec<f32> {
    let hw = width * 0.5;
    let hh = height * 0.5;
    vec![
        -hw, -hh, hw, -hh, hw, hh, // lower-right triangle
        -hw, -hh, hw, hh, -hw, hh, // upper-left triangle
    ]
}

/// Filled capsule silhouette: two semicircular caps joined by straight
/// sides, triangulated as a single closed fan anchored at the origin.
///
/// Cap points are sampled by linear angle interpolation over pi radians.
/// `segments` is clamped to at least 6. Zero radius/half-length fall back to
/// 0.5 each.
pub fn capsule_vertices(radius: f32, half_length: f32, segments: i32) -> Vec<f32> {
    let r = if radius == 0.0 { 0.5 } else { radius };
    let half = if half_length == 0.0 { 0.5 } else { half_length };
    let seg = segments.max(6) as usize;

    let mut points: Vec<[f32; 2]> = Vec::with_capacity((seg + 1) * 2);
    for i in 0..=seg {
        let angle = std::f32::consts::PI - (i as f32 / seg as f32) * std::f32::consts::PI;
        points.push([angle.cos() * r, half + angle.sin() * r]);
    }
    for i in 0..=seg {
        let angle = -(i as f32 / seg as f32) * std::f32::consts::PI;
        points.push([angle.cos() * r, -half + angle.sin() * r]);
    }

    let n = points.len();
    let mut vertices = Vec::with_capacity(n * 6);
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        vertices.extend_from_slice(&[0.0, 0.0, a[0], a[1], b[0], b[1]]);
    }
    vertices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(vertices: &[f32]) -> (f32, f32, f32, f32) {
        let mut min = (f32::INFINITY, f32::INFINITY);
        let mut max = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for pair in vertices.chunks_exact(2) {
            min.0 = min.0.min(pair[0]);
            min.1 = min.1.min(pair[1]);
            max.0 = max.0.max(pair[0]);
            max.1 = max.1.max(pair[1]);
        }
        (min.0, min.1, max.0, max.1)
    }

    #[test]
    fn rectangle_two_by_one_bbox() {
        let verts = rectangle_vertices(2.0, 1.0);
        assert_eq!(verts.len(), 12);
        assert_eq!(bbox(&verts), (-1.0, -0.5, 1.0, 0.5));
    }

    #[test]
    fn rectangle_vertex_order() {
        let verts = rectangle_vertices(2.0, 2.0);
        assert_eq!(
            verts,
            vec![-1.0, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0, -1.0, 1.0, 1.0, -1.0, 1.0]
        );
    }

    #[test]
    fn capsule_fan_triangle_count() {
        let verts = capsule_vertices(1.0, 0.5, 16);
        // 2 * (16 + 1) outline points, one fan triangle each, 6 floats per
        // triangle.
        assert_eq!(verts.len(), 34 * 6);
        assert_eq!(verts.len() % 6, 0);
    }

    #[test]
    fn capsule_segment_count_clamps_to_six() {
        let verts = capsule_vertices(1.0, 1.0, 2);
        assert_eq!(verts.len(), 14 * 6);
    }

    #[test]
    fn capsule_zero_dimensions_use_defaults() {
        let verts = capsule_vertices(0.0, 0.0, 8);
        let (min_x, min_y, max_x, max_y) = bbox(&verts);
        // radius 0.5, half-length 0.5: caps reach +-1 vertically.
        assert!((min_x - -0.5).abs() < 1e-5);
        assert!((max_x - 0.5).abs() < 1e-5);
        assert!((min_y - -1.0).abs() < 1e-5);
        assert!((max_y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn capsule_caps_span_the_ends() {
        let verts = capsule_vertices(1.0, 2.0, 8);
        let (.., max_y) = bbox(&verts);
        assert!((max_y - 3.0).abs() < 1e-5);
    }
}
