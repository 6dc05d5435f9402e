//! Orbit controls: the camera circles a target point on a sphere.
//!
//! Pointer input accumulates rotation, dolly and pan requests; `update` folds
//! them into the camera once per tick. With damping enabled only a fraction of
//! the pending rotation and pan is applied each update and the remainder decays,
//! so the camera keeps gliding after input stops.

use glam::Vec3;
use std::f32::consts::{PI, TAU};

use crate::camera::PerspectiveCamera;
use crate::config::ControlsConfig;
use crate::core::{Button, Controller};

/// Movement below this (squared) is not reported as a change
const CHANGE_EPSILON: f32 = 0.000001;
/// Keeps the camera off the poles, where look-at loses its up vector
const POLE_EPSILON: f32 = 0.000001;
/// Wheel/dolly step before zoom speed is applied
const ZOOM_BASE: f32 = 0.95;

/// Spherical coordinates with Y up: `theta` around Y from +Z, `phi` down from +Y
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    pub phi: f32,
    pub theta: f32,
}

impl Spherical {
    pub fn from_offset(offset: Vec3) -> Self {
        let radius = offset.length();
        if radius == 0.0 {
            return Self::default();
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    pub fn to_offset(&self) -> Vec3 {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vec3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,

    spherical_delta: Spherical,
    scale: f32,
    pan_offset: Vec3,
    last_position: Vec3,
    last_target: Vec3,
}

impl OrbitControls {
    /// Attach controls to a camera and settle it onto the orbit.
    ///
    /// The initial settle is not reported as a change.
    pub fn new(config: &ControlsConfig, camera: &mut PerspectiveCamera) -> Self {
        let mut controls = Self {
            target: Vec3::from_array(config.target),
            enable_damping: config.enable_damping,
            damping_factor: config.damping_factor.clamp(0.0, 1.0),
            min_distance: config.min_distance,
            max_distance: config.max_distance.max(config.min_distance),
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            pan_speed: config.pan_speed,
            spherical_delta: Spherical::default(),
            scale: 1.0,
            pan_offset: Vec3::ZERO,
            last_position: camera.position,
            last_target: Vec3::from_array(config.target),
        };
        controls.update(camera);
        controls
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.spherical_delta.theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.spherical_delta.phi -= angle;
    }

    /// Move toward the target
    pub fn dolly_in(&mut self, dolly_scale: f32) {
        self.scale *= dolly_scale;
    }

    /// Move away from the target
    pub fn dolly_out(&mut self, dolly_scale: f32) {
        self.scale /= dolly_scale;
    }

    pub fn zoom_scale(&self) -> f32 {
        ZOOM_BASE.powf(self.zoom_speed)
    }

    /// Pan by a pointer movement in logical pixels
    pub fn pan(&mut self, dx: f32, dy: f32, camera: &PerspectiveCamera, viewport_height: f32) {
        if viewport_height <= 0.0 {
            return;
        }
        let forward = camera.forward();
        let right = forward.cross(camera.up).normalize_or(Vec3::X);
        let up = right.cross(forward);

        // Half-height of the view frustum at the target distance
        let target_distance = (camera.position - self.target).length() * (camera.fov.to_radians() * 0.5).tan();

        let left = 2.0 * dx * target_distance / viewport_height * self.pan_speed;
        let upward = 2.0 * dy * target_distance / viewport_height * self.pan_speed;
        self.pan_offset += right * -left + up * upward;
    }

    /// Translate accumulated pointer input into orbit requests
    pub fn handle_input(&mut self, input: &dyn Controller, camera: &PerspectiveCamera, viewport_height: f32) {
        let (dx, dy) = input.pointer_delta();
        let height = viewport_height.max(1.0);

        let panning = input.is_down(Button::MouseRight)
            || (input.is_down(Button::MouseLeft) && input.is_down(Button::Shift));

        if panning {
            self.pan(dx, dy, camera, height);
        } else if input.is_down(Button::MouseLeft) {
            self.rotate_left(TAU * dx / height * self.rotate_speed);
            self.rotate_up(TAU * dy / height * self.rotate_speed);
        } else if input.is_down(Button::MouseMiddle) {
            if dy > 0.0 {
                self.dolly_out(self.zoom_scale());
            } else if dy < 0.0 {
                self.dolly_in(self.zoom_scale());
            }
        }

        let scroll = input.scroll_delta();
        if scroll > 0.0 {
            self.dolly_in(self.zoom_scale().powf(scroll));
        } else if scroll < 0.0 {
            self.dolly_out(self.zoom_scale().powf(-scroll));
        }
    }

    /// Apply pending input to the camera.
    ///
    /// Returns true when the camera moved enough to count as a change.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let mut spherical = Spherical::from_offset(camera.position - self.target);

        let step = if self.enable_damping { self.damping_factor } else { 1.0 };
        spherical.theta += self.spherical_delta.theta * step;
        spherical.phi += self.spherical_delta.phi * step;
        spherical.phi = spherical.phi.clamp(POLE_EPSILON, PI - POLE_EPSILON);
        spherical.radius = (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        self.target += self.pan_offset * step;

        camera.position = self.target + spherical.to_offset();
        camera.target = self.target;

        if self.enable_damping {
            let decay = 1.0 - self.damping_factor;
            self.spherical_delta.theta *= decay;
            self.spherical_delta.phi *= decay;
            self.pan_offset *= decay;
        } else {
            self.spherical_delta = Spherical::default();
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;

        let changed = camera.position.distance_squared(self.last_position) > CHANGE_EPSILON
            || self.target.distance_squared(self.last_target) > CHANGE_EPSILON;

        if changed {
            self.last_position = camera.position;
            self.last_target = self.target;
        }
        changed
    }

    pub fn distance(&self, camera: &PerspectiveCamera) -> f32 {
        camera.position.distance(self.target)
    }
}
