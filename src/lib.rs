pub mod animation;
pub mod camera;
pub mod cli;
pub mod config;
pub mod core;
pub mod debug_panel;
pub mod frame_driver;
pub mod geometry;
pub mod loaders;
pub mod orbit;
pub mod reflection;
pub mod renderer;
pub mod route;
pub mod scene;
pub mod types;

pub use frame_driver::{FrameDriver, RenderBackend, ViewerEvent};
pub use scene::SceneGraph;
