/// Highest pixel density the output surface is ever rendered at
pub const MAX_PIXEL_RATIO: f32 = 2.0;

/// Clamp a host-reported device pixel ratio to `max`
pub fn clamp_pixel_ratio(reported: f32, max: f32) -> f32 {
    if reported.is_finite() && reported > 0.0 {
        reported.min(max)
    } else {
        1.0
    }
}

/// Size of the host window as reported by a resize notification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSize {
    /// Logical (device independent) width
    pub width: f32,
    /// Logical (device independent) height
    pub height: f32,
    /// Device pixel ratio reported by the host
    pub scale_factor: f32,
}

impl WindowSize {
    pub fn new(width: f32, height: f32, scale_factor: f32) -> Self {
        Self {
            width,
            height,
            scale_factor,
        }
    }

    /// Build from physical pixels, as winit reports them
    pub fn from_physical(width: u32, height: u32, scale_factor: f64) -> Self {
        let scale = if scale_factor > 0.0 { scale_factor as f32 } else { 1.0 };
        Self::new(width as f32 / scale, height as f32 / scale, scale)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Render viewport - logical size plus the committed pixel ratio
///
/// The window keeps its native density; only the scene is rendered at the
/// committed ratio and scaled onto it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    width: f32,
    height: f32,
    scale_factor: f32,
    pixel_ratio: f32,
    max_pixel_ratio: f32,
}

impl Viewport {
    pub fn new(size: WindowSize, max_pixel_ratio: f32) -> Self {
        let mut viewport = Self {
            width: 1.0,
            height: 1.0,
            scale_factor: 1.0,
            pixel_ratio: 1.0,
            max_pixel_ratio,
        };
        viewport.resize(size);
        viewport
    }

    /// Commit a new window size. Zero-area sizes (minimized windows) are ignored.
    ///
    /// Returns false when the size was ignored.
    pub fn resize(&mut self, size: WindowSize) -> bool {
        if size.is_empty() {
            return false;
        }
        self.width = size.width;
        self.height = size.height;
        self.scale_factor = clamp_pixel_ratio(size.scale_factor, f32::INFINITY);
        self.pixel_ratio = clamp_pixel_ratio(size.scale_factor, self.max_pixel_ratio);
        true
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    /// Density the host reported, unclamped
    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }

    /// Scene render target size: logical size at the committed pixel ratio
    pub fn render_size(&self) -> (u32, u32) {
        let width = (self.width * self.pixel_ratio).floor() as u32;
        let height = (self.height * self.pixel_ratio).floor() as u32;
        (width.max(1), height.max(1))
    }

    /// Window size in physical pixels; the presentation surface matches it
    pub fn window_size(&self) -> (u32, u32) {
        // Physical sizes are whole pixels; rounding undoes the logical division
        let width = (self.width * self.scale_factor).round() as u32;
        let height = (self.height * self.scale_factor).round() as u32;
        (width.max(1), height.max(1))
    }
}
