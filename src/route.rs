use std::path::{Path, PathBuf};

/// Models reachable from a startup route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRoute {
    Capsule,
    Hamburger,
}

impl ModelRoute {
    /// Match a route path exactly; unknown routes select no model
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "/" => Some(Self::Capsule),
            "/hamburger" => Some(Self::Hamburger),
            _ => None,
        }
    }

    /// Model file relative to the assets directory
    pub fn asset_path(&self) -> &'static str {
        match self {
            Self::Capsule => "models/capsule.glb",
            Self::Hamburger => "models/hamburger.glb",
        }
    }
}

/// Resolve the model file for a route, if any
pub fn select_model(route: &str, assets: &Path) -> Option<PathBuf> {
    let selected = ModelRoute::from_path(route).map(|model| assets.join(model.asset_path()));
    if selected.is_none() {
        log::info!("No model for route {:?}; showing the empty stage", route);
    }
    selected
}
