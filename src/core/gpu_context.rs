use std::sync::Arc;
use wgpu::{Adapter, Device, DeviceDescriptor, Features, Instance, Limits, Queue, Surface};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Device and queue shared by the renderer and the debug overlay
///
/// Cloning is cheap (Arc), so the overlay renderer and the scene passes can
/// hold their own handle.
#[derive(Clone)]
pub struct GpuContext {
    device: Arc<Device>,
    queue: Arc<Queue>,
}

impl GpuContext {
    /// Create a GPU context compatible with a surface
    ///
    /// Returns the adapter too; surface configuration needs its capabilities.
    pub async fn for_surface(instance: &Instance, surface: &Surface<'_>) -> Result<(Self, Adapter)> {
        let adapter = Self::request_adapter(instance, surface).await?;
        let (device, queue) = Self::request_device(&adapter).await?;

        log::info!("Using adapter: {:?}", adapter.get_info().name);

        Ok((
            Self {
                device: Arc::new(device),
                queue: Arc::new(queue),
            },
            adapter,
        ))
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    async fn request_adapter(instance: &Instance, surface: &Surface<'_>) -> Result<Adapter> {
        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| format!("Failed to find appropriate adapter: {:?}", e).into())
    }

    async fn request_device(adapter: &Adapter) -> Result<(Device, Queue)> {
        let supported_features = adapter.features();
        let mut requested_features = Features::empty();

        // Lets the reflection cube use filterable float formats where supported
        if supported_features.contains(Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES) {
            requested_features |= Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES;
        }

        adapter
            .request_device(&DeviceDescriptor {
                label: Some("Scene Viewer Device"),
                required_features: requested_features,
                required_limits: Limits::default(),
                memory_hints: Default::default(),
                experimental_features: Default::default(),
                trace: Default::default(),
            })
            .await
            .map_err(|e| format!("Failed to create device: {:?}", e).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_semantics() {
        // Device creation needs real hardware; this only checks the handle is cheap to share
        fn assert_clone<T: Clone>() {}
        assert_clone::<GpuContext>();
    }
}
