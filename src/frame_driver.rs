//! Per-tick update loop.
//!
//! The host calls [`FrameDriver::tick`] once per refresh. Everything that
//! happens between ticks (resizes, model load completions) is queued as a
//! [`ViewerEvent`] and applied at the start of the next tick, so the scene
//! is only ever touched from the render thread.

use glam::Vec3;
use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;

use crate::animation::AnimationMixer;
use crate::camera::{CameraFraming, PerspectiveCamera};
use crate::config::ViewerConfig;
use crate::core::{Clock, FrameTime, InstantSource, TimeSource, Viewport, WindowSize, WinitController};
use crate::loaders::{ModelData, PendingModel};
use crate::orbit::OrbitControls;
use crate::scene::{ModelInstance, SceneGraph, Transform};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// GPU side of the viewer
pub trait RenderBackend {
    /// Resize the output surface to the viewport's physical size
    fn resize(&mut self, viewport: &Viewport) -> Result<()>;

    /// Create GPU resources for a newly attached model
    fn upload_model(&mut self, model: &ModelInstance) -> Result<()>;

    /// Re-render the reflection cube from the current scene
    fn capture_reflection(&mut self, scene: &SceneGraph) -> Result<()>;

    /// Draw one frame and return any parameter edits made in the debug panel
    fn render(&mut self, view: &FrameView<'_>) -> Result<PanelEdits>;
}

/// Something that happened between ticks
#[derive(Debug)]
pub enum ViewerEvent {
    Resized(WindowSize),
    ModelLoaded(ModelData),
    ModelLoadFailed(String),
}

/// Where the model for this run stands
#[derive(Debug, Clone, PartialEq)]
pub enum ModelStatus {
    /// The route selected no model
    NotRequested,
    Loading(PathBuf),
    Loaded { name: String, nodes: usize, clips: usize },
    Failed(String),
}

impl fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRequested => write!(f, "none"),
            Self::Loading(path) => write!(f, "loading {}", path.display()),
            Self::Loaded { name, nodes, clips } => write!(f, "{} ({} nodes, {} clips)", name, nodes, clips),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Read-only snapshot handed to the renderer each tick
pub struct FrameView<'a> {
    pub time: FrameTime,
    pub scene: &'a SceneGraph,
    pub camera: &'a PerspectiveCamera,
    pub viewport: &'a Viewport,
    pub orbit_distance: f32,
    pub exposure: f32,
    pub model_status: &'a ModelStatus,
}

/// Parameter changes requested from the debug panel
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PanelEdits {
    pub background_intensity: Option<f32>,
    pub exposure: Option<f32>,
}

/// Everything the loop mutates between ticks
pub struct ViewerState<S: TimeSource> {
    clock: Clock<S>,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    framing: CameraFraming,
    scene: SceneGraph,
    viewport: Viewport,
    mixer: Option<AnimationMixer>,
    input: WinitController,
    pending: Option<PendingModel>,
    events: VecDeque<ViewerEvent>,
    model_status: ModelStatus,
    model_placement: Transform,
    exposure: f32,
}

pub struct FrameDriver<B: RenderBackend, S: TimeSource = InstantSource> {
    backend: B,
    state: ViewerState<S>,
}

impl<B: RenderBackend> FrameDriver<B, InstantSource> {
    /// Driver with a wall clock starting now
    pub fn new(backend: B, config: &ViewerConfig, size: WindowSize) -> Result<Self> {
        Self::with_clock(backend, config, size, Clock::new())
    }
}

impl<B: RenderBackend, S: TimeSource> FrameDriver<B, S> {
    pub fn with_clock(mut backend: B, config: &ViewerConfig, size: WindowSize, clock: Clock<S>) -> Result<Self> {
        let viewport = Viewport::new(size, config.window.max_pixel_ratio);

        let mut camera = PerspectiveCamera::new(
            Vec3::from_array(config.camera.position),
            Vec3::from_array(config.controls.target),
            config.camera.fov,
            viewport.aspect(),
            config.camera.near,
            config.camera.far,
        );
        let controls = OrbitControls::new(&config.controls, &mut camera);

        let scene = SceneGraph::new(&config.scene, &config.environment);
        let framing = CameraFraming::new(scene.floor_anchor(), config.camera.fov_per_distance);
        // Settling onto the orbit moved the camera, so frame it before the first tick
        framing.apply(&mut camera);

        backend.resize(&viewport)?;

        Ok(Self {
            backend,
            state: ViewerState {
                clock,
                camera,
                controls,
                framing,
                scene,
                viewport,
                mixer: None,
                input: WinitController::new(),
                pending: None,
                events: VecDeque::new(),
                model_status: ModelStatus::NotRequested,
                model_placement: Transform::from_translation(Vec3::new(0.0, config.scene.model_y, 0.0)),
                exposure: 1.0,
            },
        })
    }

    /// Start decoding a model on a worker thread; it is attached on a later tick
    pub fn load_model(&mut self, path: PathBuf) {
        log::info!("Loading model {:?}", path);
        self.state.model_status = ModelStatus::Loading(path.clone());
        self.state.pending = Some(PendingModel::spawn(path));
    }

    /// Queue an event for the start of the next tick
    pub fn push_event(&mut self, event: ViewerEvent) {
        self.state.events.push_back(event);
    }

    /// Advance the viewer by one frame
    pub fn tick(&mut self) -> Result<FrameTime> {
        self.drain_events()?;

        let frame = self.state.clock.tick();

        self.state.scene.animate_ring_light(frame.elapsed);

        if let (Some(mixer), Some(model)) = (self.state.mixer.as_mut(), self.state.scene.model_mut()) {
            mixer.advance(frame.delta);
            mixer.apply(model);
        }

        self.backend.capture_reflection(&self.state.scene)?;

        let state = &mut self.state;
        state
            .controls
            .handle_input(&state.input, &state.camera, state.viewport.height());
        if state.controls.update(&mut state.camera) {
            state.framing.apply(&mut state.camera);
        }
        state.input.reset_deltas();

        let view = FrameView {
            time: frame,
            scene: &state.scene,
            camera: &state.camera,
            viewport: &state.viewport,
            orbit_distance: state.controls.distance(&state.camera),
            exposure: state.exposure,
            model_status: &state.model_status,
        };
        let edits = self.backend.render(&view)?;
        self.apply_edits(edits);

        Ok(frame)
    }

    fn drain_events(&mut self) -> Result<()> {
        if let Some(pending) = self.state.pending.as_mut() {
            if let Some(result) = pending.poll() {
                self.state.pending = None;
                let event = match result {
                    Ok(data) => ViewerEvent::ModelLoaded(data),
                    Err(e) => ViewerEvent::ModelLoadFailed(format!("{:#}", e)),
                };
                self.state.events.push_back(event);
            }
        }

        while let Some(event) = self.state.events.pop_front() {
            match event {
                ViewerEvent::Resized(size) => self.resize(size)?,
                ViewerEvent::ModelLoaded(data) => self.attach_model(data)?,
                ViewerEvent::ModelLoadFailed(reason) => {
                    log::warn!("Model failed to load: {}", reason);
                    self.state.model_status = ModelStatus::Failed(reason);
                }
            }
        }
        Ok(())
    }

    fn resize(&mut self, size: WindowSize) -> Result<()> {
        if !self.state.viewport.resize(size) {
            log::debug!("Ignoring empty window size {}x{}", size.width, size.height);
            return Ok(());
        }
        self.state.camera.apply_viewport(&self.state.viewport);
        self.backend.resize(&self.state.viewport)
    }

    fn attach_model(&mut self, data: ModelData) -> Result<()> {
        let clip_count = data.clips.len();
        let instance = match ModelInstance::new(data.name, data.nodes, data.primitives, self.state.model_placement) {
            Ok(instance) => instance,
            Err(e) => {
                log::warn!("Rejected model hierarchy: {}", e);
                self.state.model_status = ModelStatus::Failed(e.to_string());
                return Ok(());
            }
        };

        let status = ModelStatus::Loaded {
            name: instance.name.clone(),
            nodes: instance.nodes().len(),
            clips: clip_count,
        };

        if let Err(e) = self.state.scene.attach_model(instance) {
            log::warn!("Ignoring model: {}", e);
            return Ok(());
        }

        if let Some(model) = self.state.scene.model() {
            self.backend.upload_model(model)?;
        }

        self.state.mixer = AnimationMixer::new(data.clips);
        if self.state.mixer.is_none() {
            log::debug!("Model has no animations");
        }

        log::info!("Model attached: {}", status);
        self.state.model_status = status;
        Ok(())
    }

    fn apply_edits(&mut self, edits: PanelEdits) {
        if let Some(intensity) = edits.background_intensity {
            self.state.scene.background.intensity = intensity.max(0.0);
        }
        if let Some(exposure) = edits.exposure {
            self.state.exposure = exposure.max(0.0);
        }
    }

    pub fn input_mut(&mut self) -> &mut WinitController {
        &mut self.state.input
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.state.camera
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.state.controls
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.state.scene
    }

    pub fn viewport(&self) -> &Viewport {
        &self.state.viewport
    }

    pub fn mixer(&self) -> Option<&AnimationMixer> {
        self.state.mixer.as_ref()
    }

    pub fn model_status(&self) -> &ModelStatus {
        &self.state.model_status
    }

    pub fn exposure(&self) -> f32 {
        self.state.exposure
    }

    pub fn clock(&self) -> &Clock<S> {
        &self.state.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_status_display() {
        assert_eq!(ModelStatus::NotRequested.to_string(), "none");
        let loaded = ModelStatus::Loaded {
            name: "capsule".into(),
            nodes: 3,
            clips: 1,
        };
        assert_eq!(loaded.to_string(), "capsule (3 nodes, 1 clips)");
        assert_eq!(ModelStatus::Failed("bad".into()).to_string(), "failed: bad");
    }

    #[test]
    fn test_default_edits_change_nothing() {
        assert_eq!(PanelEdits::default(), PanelEdits {
            background_intensity: None,
            exposure: None,
        });
    }
}
