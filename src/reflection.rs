//! Cube camera math for the reflection probe.
//!
//! Faces are rendered in the texture-array order wgpu expects for cube views
//! (+X, -X, +Y, -Y, +Z, -Z). Cube sampling uses a left-handed face frame, so
//! the face cameras use left-handed view and projection matrices.

use glam::{Mat4, Vec3};

use crate::config::ReflectionConfig;
use crate::types::CameraUniform;

pub const CUBE_FACES: usize = 6;

/// Forward and up vector of each cube face, in layer order
const FACE_BASES: [(Vec3, Vec3); CUBE_FACES] = [
    (Vec3::X, Vec3::Y),
    (Vec3::NEG_X, Vec3::Y),
    (Vec3::Y, Vec3::NEG_Z),
    (Vec3::NEG_Y, Vec3::Z),
    (Vec3::Z, Vec3::Y),
    (Vec3::NEG_Z, Vec3::Y),
];

/// Camera placement for a reflection capture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReflectionProbe {
    pub position: Vec3,
    pub resolution: u32,
    pub near: f32,
    pub far: f32,
}

impl ReflectionProbe {
    pub fn new(config: &ReflectionConfig) -> Self {
        Self {
            position: Vec3::from_array(config.probe_position),
            resolution: config.resolution.max(1),
            near: config.near,
            far: config.far,
        }
    }

    pub fn face_view(&self, face: usize) -> Mat4 {
        let (forward, up) = FACE_BASES[face % CUBE_FACES];
        Mat4::look_at_lh(self.position, self.position + forward, up)
    }

    /// 90 degree square frustum shared by all faces
    pub fn face_projection(&self) -> Mat4 {
        Mat4::perspective_lh(std::f32::consts::FRAC_PI_2, 1.0, self.near, self.far)
    }

    pub fn face_uniforms(&self) -> [CameraUniform; CUBE_FACES] {
        let projection = self.face_projection();
        std::array::from_fn(|face| CameraUniform::new(self.face_view(face), projection, self.position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe() -> ReflectionProbe {
        ReflectionProbe::new(&ReflectionConfig::default())
    }

    fn ndc(probe: &ReflectionProbe, face: usize, direction: Vec3) -> Vec3 {
        (probe.face_projection() * probe.face_view(face)).project_point3(probe.position + direction)
    }

    #[test]
    fn test_face_centers_look_along_axes() {
        let probe = probe();
        for (face, (forward, _)) in FACE_BASES.iter().enumerate() {
            let center = ndc(&probe, face, *forward);
            assert!(center.x.abs() < 1e-5 && center.y.abs() < 1e-5, "face {}", face);
            assert!(center.z > 0.0 && center.z < 1.0);
        }
    }

    #[test]
    fn test_positive_x_face_matches_cube_sampling() {
        // For +X, sampling reads s = -z, t = -y (t grows downward)
        let point = ndc(&probe(), 0, Vec3::new(1.0, 0.3, -0.4));
        assert!((point.x - 0.4).abs() < 1e-5);
        assert!((point.y - 0.3).abs() < 1e-5);
    }

    #[test]
    fn test_positive_y_face_matches_cube_sampling() {
        // For +Y, sampling reads s = x, t = z
        let point = ndc(&probe(), 2, Vec3::new(0.2, 1.0, 0.5));
        assert!((point.x - 0.2).abs() < 1e-5);
        assert!((point.y + 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_faces_share_probe_position() {
        let probe = ReflectionProbe {
            position: Vec3::new(1.0, 2.0, 3.0),
            ..probe()
        };
        for uniform in probe.face_uniforms() {
            assert_eq!(uniform.position, [1.0, 2.0, 3.0]);
        }
    }
}
