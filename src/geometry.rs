use glam::Vec3;
use std::f32::consts::TAU;

use crate::types::Vertex;

/// Indexed triangle mesh on the CPU
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

// ============================================================================
// Primitive Generators
// ============================================================================

/// Closed cylinder centered on the origin, axis along Y
pub fn cylinder(radius: f32, height: f32, segments: u32) -> MeshData {
    let segments = segments.max(3);
    let half = height * 0.5;
    let mut mesh = MeshData::default();

    // Side wall, with a duplicated seam column so normals stay smooth
    for y in [half, -half] {
        for x in 0..=segments {
            let theta = x as f32 / segments as f32 * TAU;
            let (sin, cos) = theta.sin_cos();
            mesh.vertices.push(Vertex::new([radius * sin, y, radius * cos], [sin, 0.0, cos]));
        }
    }
    let row = segments + 1;
    for x in 0..segments {
        let a = x;
        let b = row + x;
        let c = row + x + 1;
        let d = x + 1;
        mesh.indices.extend_from_slice(&[a, b, d, b, c, d]);
    }

    cap(&mut mesh, radius, half, segments, true);
    cap(&mut mesh, radius, -half, segments, false);
    mesh
}

fn cap(mesh: &mut MeshData, radius: f32, y: f32, segments: u32, top: bool) {
    let normal = if top { [0.0, 1.0, 0.0] } else { [0.0, -1.0, 0.0] };
    let center = mesh.vertices.len() as u32;
    mesh.vertices.push(Vertex::new([0.0, y, 0.0], normal));

    for x in 0..=segments {
        let theta = x as f32 / segments as f32 * TAU;
        let (sin, cos) = theta.sin_cos();
        mesh.vertices.push(Vertex::new([radius * sin, y, radius * cos], normal));
    }

    for x in 0..segments {
        let current = center + 1 + x;
        let next = current + 1;
        if top {
            mesh.indices.extend_from_slice(&[center, current, next]);
        } else {
            mesh.indices.extend_from_slice(&[center, next, current]);
        }
    }
}

/// Torus lying in the XY plane around the Z axis
pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> MeshData {
    let radial = radial_segments.max(3);
    let tubular = tubular_segments.max(3);
    let mut mesh = MeshData::default();

    for j in 0..=radial {
        for i in 0..=tubular {
            let u = i as f32 / tubular as f32 * TAU;
            let v = j as f32 / radial as f32 * TAU;

            let position = Vec3::new(
                (radius + tube * v.cos()) * u.cos(),
                (radius + tube * v.cos()) * u.sin(),
                tube * v.sin(),
            );
            let center = Vec3::new(radius * u.cos(), radius * u.sin(), 0.0);
            let normal = (position - center).normalize_or(Vec3::Z);

            mesh.vertices.push(Vertex::new(position.to_array(), normal.to_array()));
        }
    }

    let stride = tubular + 1;
    for j in 1..=radial {
        for i in 1..=tubular {
            let a = stride * j + i - 1;
            let b = stride * (j - 1) + i - 1;
            let c = stride * (j - 1) + i;
            let d = stride * j + i;
            mesh.indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }

    mesh
}

/// Smooth per-vertex normals from triangle faces (area weighted)
pub fn compute_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];

    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
        if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
            continue;
        }
        let face = (positions[i1] - positions[i0]).cross(positions[i2] - positions[i0]);
        normals[i0] += face;
        normals[i1] += face;
        normals[i2] += face;
    }

    normals.into_iter().map(|n| n.normalize_or(Vec3::Y)).collect()
}

// ============================================================================
// Color helpers
// ============================================================================

/// Parse "#rrggbb" into sRGB components in [0, 1]
pub fn parse_hex_color(hex: &str) -> Option<[f32; 3]> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 {
        return None;
    }
    let value = u32::from_str_radix(digits, 16).ok()?;
    Some([
        ((value >> 16) & 0xff) as f32 / 255.0,
        ((value >> 8) & 0xff) as f32 / 255.0,
        (value & 0xff) as f32 / 255.0,
    ])
}

pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Parse an sRGB hex color straight into linear space
pub fn hex_to_linear(hex: &str) -> Option<[f32; 3]> {
    parse_hex_color(hex).map(|rgb| rgb.map(srgb_to_linear))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cylinder_counts() {
        let mesh = cylinder(5.0, 0.2, 50);
        // side: 2 rows of 51, caps: 2 * (1 + 51)
        assert_eq!(mesh.vertices.len(), 2 * 51 + 2 * 52);
        assert_eq!(mesh.triangle_count(), 50 * 2 + 50 * 2);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }

    #[test]
    fn test_cylinder_extent() {
        let mesh = cylinder(5.0, 0.2, 50);
        for v in &mesh.vertices {
            assert!((v.position[1].abs() - 0.1).abs() < 1e-6);
            let r = (v.position[0].powi(2) + v.position[2].powi(2)).sqrt();
            assert!(r <= 5.0 + 1e-4);
        }
    }

    #[test]
    fn test_cylinder_caps_face_outward() {
        let mesh = cylinder(1.0, 2.0, 8);
        let side_triangles = 8 * 2;
        let top = &mesh.indices[side_triangles * 3..side_triangles * 3 + 3];
        let p: Vec<Vec3> = top.iter().map(|&i| Vec3::from_array(mesh.vertices[i as usize].position)).collect();
        let face = (p[1] - p[0]).cross(p[2] - p[0]);
        assert!(face.y > 0.0);
    }

    #[test]
    fn test_torus_counts_and_radius() {
        let mesh = torus(15.0, 0.5, 12, 48);
        assert_eq!(mesh.vertices.len(), 13 * 49);
        assert_eq!(mesh.triangle_count(), 12 * 48 * 2);

        for v in &mesh.vertices {
            let p = Vec3::from_array(v.position);
            let ring = (p.x * p.x + p.y * p.y).sqrt();
            assert!((ring - 15.0).abs() <= 0.5 + 1e-4);
            assert!(p.z.abs() <= 0.5 + 1e-4);
        }
    }

    #[test]
    fn test_compute_normals_flat_quad() {
        let positions = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(0.0, 0.0, -1.0),
        ];
        let normals = compute_normals(&positions, &[0, 1, 2, 0, 2, 3]);
        for n in normals {
            assert!(n.abs_diff_eq(Vec3::Y, 1e-6));
        }
    }

    #[test]
    fn test_compute_normals_isolated_vertex_defaults_up() {
        let positions = [Vec3::ZERO, Vec3::X, Vec3::Z, Vec3::splat(9.0)];
        let normals = compute_normals(&positions, &[0, 2, 1]);
        assert_eq!(normals[3], Vec3::Y);
    }

    #[test]
    fn test_hex_colors() {
        assert_eq!(parse_hex_color("#ffffff"), Some([1.0, 1.0, 1.0]));
        assert_eq!(parse_hex_color("#44"), None);
        assert_eq!(parse_hex_color("#gg0000"), None);

        let floor = hex_to_linear("#444444").unwrap();
        assert!((floor[0] - 0.0578).abs() < 1e-3);
    }
}
