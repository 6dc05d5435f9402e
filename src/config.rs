//! Viewer configuration.
//!
//! Every value has a default matching the shipped demo; a JSON file passed with
//! `--config` may override any subset of fields.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub scene: SceneConfig,
    pub environment: EnvironmentConfig,
    pub reflection: ReflectionConfig,
}

impl ViewerConfig {
    /// Load a JSON config file; missing fields keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_json(&text).with_context(|| format!("Invalid config file: {:?}", path))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub max_pixel_ratio: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Scene Viewer".to_string(),
            width: 1280,
            height: 720,
            max_pixel_ratio: crate::core::MAX_PIXEL_RATIO,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    /// Vertical field of view in degrees until the first orbit change
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Degrees of fov per unit of distance between camera and floor
    pub fov_per_distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [-8.0, 4.0, 8.0],
            fov: 75.0,
            near: 0.1,
            far: 100.0,
            fov_per_distance: 5.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub target: [f32; 3],
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            target: [0.0, 1.0, 0.0],
            enable_damping: true,
            damping_factor: 0.05,
            min_distance: 5.0,
            max_distance: 20.0,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub floor: FloorConfig,
    pub ring_light: RingLightConfig,
    /// Vertical offset applied to the loaded model
    pub model_y: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            floor: FloorConfig::default(),
            ring_light: RingLightConfig::default(),
            model_y: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FloorConfig {
    pub radius: f32,
    pub height: f32,
    pub segments: u32,
    /// sRGB hex color, e.g. "#444444"
    pub color: String,
    pub metalness: f32,
    pub roughness: f32,
}

impl Default for FloorConfig {
    fn default() -> Self {
        Self {
            radius: 5.0,
            height: 0.2,
            segments: 50,
            color: "#444444".to_string(),
            metalness: 0.0,
            roughness: 0.2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RingLightConfig {
    pub radius: f32,
    pub tube: f32,
    pub radial_segments: u32,
    pub tubular_segments: u32,
    /// Linear HDR color; components above 1 glow in the reflection
    pub color: [f32; 3],
    pub height: f32,
    /// Peak rotation about X in radians
    pub amplitude: f32,
}

impl Default for RingLightConfig {
    fn default() -> Self {
        Self {
            radius: 15.0,
            tube: 0.5,
            radial_segments: 12,
            tubular_segments: 48,
            color: [10.0, 4.0, 2.0],
            height: 1.0,
            amplitude: 2.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Equirectangular background, relative to the assets directory
    pub map: String,
    pub intensity: f32,
    pub blurriness: f32,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            map: "environmentMaps/neon_city_night.jpg".to_string(),
            intensity: 1.0,
            blurriness: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReflectionConfig {
    /// Edge length of each cube face in texels
    pub resolution: u32,
    pub near: f32,
    pub far: f32,
    pub probe_position: [f32; 3],
}

impl Default for ReflectionConfig {
    fn default() -> Self {
        Self {
            resolution: 256,
            near: 0.1,
            far: 100.0,
            probe_position: [0.0, 0.0, 0.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_demo_scene() {
        let config = ViewerConfig::default();
        assert_eq!(config.camera.position, [-8.0, 4.0, 8.0]);
        assert_eq!(config.controls.target, [0.0, 1.0, 0.0]);
        assert_eq!(config.controls.min_distance, 5.0);
        assert_eq!(config.controls.max_distance, 20.0);
        assert_eq!(config.camera.fov_per_distance, 5.0);
        assert_eq!(config.reflection.resolution, 256);
        assert_eq!(config.window.max_pixel_ratio, 2.0);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ViewerConfig::from_json(
            r#"{ "controls": { "max_distance": 30.0 }, "scene": { "ring_light": { "amplitude": 1.0 } } }"#,
        )
        .unwrap();

        assert_eq!(config.controls.max_distance, 30.0);
        assert_eq!(config.controls.min_distance, 5.0);
        assert_eq!(config.scene.ring_light.amplitude, 1.0);
        assert_eq!(config.scene.ring_light.radius, 15.0);
        assert_eq!(config.scene.floor.color, "#444444");
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(ViewerConfig::from_json("{ \"camera\": ").is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = ViewerConfig::from_file("/nonexistent/viewer.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
