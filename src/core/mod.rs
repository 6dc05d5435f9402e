pub mod clock;
pub mod controller;
pub mod frame;
pub mod gpu_context;
pub mod input_adapter;
pub mod viewport;

pub use clock::{Clock, InstantSource, TimeSource};
pub use controller::{Button, Controller};
pub use frame::FrameTime;
pub use gpu_context::GpuContext;
pub use input_adapter::WinitController;
pub use viewport::{clamp_pixel_ratio, Viewport, WindowSize, MAX_PIXEL_RATIO};
