use anyhow::{anyhow, Result};
use futures::channel::oneshot;
use std::path::{Path, PathBuf};

use super::gltf::{load_model, ModelData};

/// Model decode running on a worker thread.
///
/// Completes exactly once; the frame driver polls it at the start of each tick.
pub struct PendingModel {
    path: PathBuf,
    receiver: oneshot::Receiver<Result<ModelData>>,
}

impl PendingModel {
    /// Start decoding `path` with the glTF loader
    pub fn spawn(path: PathBuf) -> Self {
        Self::spawn_with(path, |path| load_model(path))
    }

    /// Start decoding `path` with a custom loader
    pub fn spawn_with<F>(path: PathBuf, loader: F) -> Self
    where
        F: FnOnce(&Path) -> Result<ModelData> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let worker_path = path.clone();

        let spawned = std::thread::Builder::new()
            .name("model-loader".to_string())
            .spawn(move || {
                // The receiver may be gone if the viewer already shut down
                let _ = sender.send(loader(&worker_path));
            });

        // On spawn failure the sender is dropped and poll() reports the failure
        if let Err(e) = spawned {
            log::error!("Failed to start model loader thread: {}", e);
        }

        Self { path, receiver }
    }

    /// None while still loading; Some once the result is in
    pub fn poll(&mut self) -> Option<Result<ModelData>> {
        match self.receiver.try_recv() {
            Ok(Some(result)) => Some(result),
            Ok(None) => None,
            Err(oneshot::Canceled) => Some(Err(anyhow!(
                "Model loader for {:?} stopped without a result",
                self.path
            ))),
        }
    }
}
