pub mod environment;
pub mod gltf;
pub mod pending;

pub use environment::{load_environment, EnvironmentMap};
pub use gltf::{load_model, ModelData};
pub use pending::PendingModel;
