use anyhow::{Context, Result};
use std::path::Path;

/// Equirectangular background image, RGBA8 in sRGB
#[derive(Debug, Clone)]
pub struct EnvironmentMap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

pub fn load_environment(path: impl AsRef<Path>) -> Result<EnvironmentMap> {
    let path = path.as_ref();
    log::info!("Loading environment map: {:?}", path);

    let image = image::open(path)
        .with_context(|| format!("Failed to load environment map: {:?}", path))?
        .to_rgba8();

    let (width, height) = image.dimensions();
    if width != height * 2 {
        log::warn!(
            "Environment map is {}x{}; equirectangular maps are normally 2:1",
            width,
            height
        );
    }

    Ok(EnvironmentMap {
        width,
        height,
        pixels: image.into_raw(),
    })
}

impl EnvironmentMap {
    /// Number of mip levels down to 1x1
    pub fn mip_level_count(&self) -> u32 {
        32 - self.width.max(self.height).max(1).leading_zeros()
    }

    /// Box-filtered mip chain, full resolution first.
    ///
    /// Background blurriness picks a level from this chain.
    pub fn mip_chain(&self) -> Vec<EnvironmentMap> {
        let Some(base) = image::RgbaImage::from_raw(self.width, self.height, self.pixels.clone()) else {
            log::warn!("Environment map pixel buffer does not match its size; skipping mips");
            return vec![self.clone()];
        };

        let mut levels = vec![self.clone()];
        let (mut width, mut height) = (self.width, self.height);
        for _ in 1..self.mip_level_count() {
            width = (width / 2).max(1);
            height = (height / 2).max(1);
            let level = image::imageops::resize(&base, width, height, image::imageops::FilterType::Triangle);
            levels.push(EnvironmentMap {
                width,
                height,
                pixels: level.into_raw(),
            });
        }
        levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loads_rgba_pixels() {
        let path = std::env::temp_dir().join("scene_viewer_env_test.png");
        image::RgbaImage::from_pixel(4, 2, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let map = load_environment(&path).unwrap();
        assert_eq!((map.width, map.height), (4, 2));
        assert_eq!(map.pixels.len(), 4 * 2 * 4);
        assert_eq!(&map.pixels[0..4], &[10, 20, 30, 255]);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_mip_chain_halves_down_to_one_texel() {
        let map = EnvironmentMap {
            width: 8,
            height: 4,
            pixels: vec![128; 8 * 4 * 4],
        };
        assert_eq!(map.mip_level_count(), 4);

        let sizes: Vec<_> = map.mip_chain().iter().map(|m| (m.width, m.height)).collect();
        assert_eq!(sizes, vec![(8, 4), (4, 2), (2, 1), (1, 1)]);
        assert!(map.mip_chain().iter().all(|m| m.pixels.len() == (m.width * m.height * 4) as usize));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = load_environment("/nonexistent/env.jpg").unwrap_err();
        assert!(err.to_string().contains("Failed to load environment map"));
    }
}
