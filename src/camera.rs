use glam::{Mat4, Vec3};

use crate::core::Viewport;
use crate::types::CameraUniform;

/// Projection stays valid even if the framing rule produces an extreme angle
const MIN_FOV: f32 = 1.0;
const MAX_FOV: f32 = 179.0;

/// Perspective camera looking at a target point
///
/// `fov` is the vertical field of view in degrees. The projection matrix is
/// cached and only rebuilt by `update_projection_matrix`.
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    projection: Mat4,
}

impl PerspectiveCamera {
    pub fn new(position: Vec3, target: Vec3, fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            position,
            target,
            up: Vec3::Y,
            fov,
            aspect,
            near,
            far,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    /// Commit fov/aspect/near/far into the cached projection
    pub fn update_projection_matrix(&mut self) {
        let fov = self.fov.clamp(MIN_FOV, MAX_FOV).to_radians();
        self.projection = Mat4::perspective_rh(fov, self.aspect, self.near, self.far);
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or(Vec3::NEG_Z)
    }

    /// Resize reactor half that concerns the camera
    pub fn apply_viewport(&mut self, viewport: &Viewport) {
        self.aspect = viewport.aspect();
        self.update_projection_matrix();
    }

    pub fn to_uniform(&self) -> CameraUniform {
        CameraUniform::new(self.view_matrix(), self.projection, self.position)
    }
}

/// Field of view as a pure function of distance
pub fn framed_fov(distance: f32, fov_per_distance: f32) -> f32 {
    distance * fov_per_distance
}

/// Keeps the field of view proportional to the distance from an anchor
#[derive(Debug, Clone, Copy)]
pub struct CameraFraming {
    pub anchor: Vec3,
    pub fov_per_distance: f32,
}

impl CameraFraming {
    pub fn new(anchor: Vec3, fov_per_distance: f32) -> Self {
        Self {
            anchor,
            fov_per_distance,
        }
    }

    pub fn fov_for(&self, position: Vec3) -> f32 {
        framed_fov(position.distance(self.anchor), self.fov_per_distance)
    }

    /// Recompute fov from the camera's current position and rebuild its projection
    pub fn apply(&self, camera: &mut PerspectiveCamera) {
        camera.fov = self.fov_for(camera.position);
        camera.update_projection_matrix();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::WindowSize;

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::new(Vec3::new(-8.0, 4.0, 8.0), Vec3::new(0.0, 1.0, 0.0), 75.0, 16.0 / 9.0, 0.1, 100.0)
    }

    #[test]
    fn test_framed_fov_is_proportional() {
        assert_eq!(framed_fov(10.0, 5.0), 50.0);
        assert_eq!(framed_fov(0.0, 5.0), 0.0);
    }

    #[test]
    fn test_framing_uses_distance_to_anchor() {
        let framing = CameraFraming::new(Vec3::ZERO, 5.0);
        let mut camera = camera();
        camera.position = Vec3::new(0.0, 6.0, 8.0);

        framing.apply(&mut camera);

        assert_eq!(camera.fov, 50.0);
        let expected = Mat4::perspective_rh(50f32.to_radians(), camera.aspect, 0.1, 100.0);
        assert!(camera.projection().abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn test_framing_does_not_move_camera() {
        let framing = CameraFraming::new(Vec3::ZERO, 5.0);
        let mut camera = camera();
        let before = camera.position;
        framing.apply(&mut camera);
        assert_eq!(camera.position, before);
    }

    #[test]
    fn test_projection_is_cached_until_updated() {
        let mut camera = camera();
        let before = camera.projection();
        camera.fov = 30.0;
        assert_eq!(camera.projection(), before);
        camera.update_projection_matrix();
        assert_ne!(camera.projection(), before);
    }

    #[test]
    fn test_apply_viewport_sets_aspect() {
        let mut camera = camera();
        let viewport = Viewport::new(WindowSize::new(1000.0, 250.0, 1.0), 2.0);
        camera.apply_viewport(&viewport);
        assert_eq!(camera.aspect, 4.0);
    }

    #[test]
    fn test_degenerate_fov_keeps_projection_finite() {
        let mut camera = camera();
        camera.fov = 0.0;
        camera.update_projection_matrix();
        assert!(camera.projection().is_finite());
    }
}
