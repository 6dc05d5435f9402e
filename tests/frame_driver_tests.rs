use glam::{Quat, Vec3};
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use scene_viewer::animation::{AnimationClip, Channel, ChannelValues, Interpolation};
use scene_viewer::camera::framed_fov;
use scene_viewer::config::ViewerConfig;
use scene_viewer::core::{Button, Clock, TimeSource, Viewport, WindowSize};
use scene_viewer::frame_driver::{
    FrameDriver, FrameView, ModelStatus, PanelEdits, RenderBackend, Result, ViewerEvent,
};
use scene_viewer::geometry;
use scene_viewer::loaders::ModelData;
use scene_viewer::route::select_model;
use scene_viewer::scene::{Material, ModelInstance, Primitive, SceneGraph, SceneNode, Transform};

/// Time source the test advances by hand
#[derive(Clone)]
struct ManualTime(Rc<Cell<f32>>);

impl TimeSource for ManualTime {
    fn elapsed(&self) -> f32 {
        self.0.get()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Resize { surface: (u32, u32), pixel_ratio: f32 },
    Upload { primitives: usize },
    Capture { ring_rotation: f32, model_x: Option<f32> },
    Render { fov: f32, delta: f32 },
}

/// Backend that records what the driver asked of it
#[derive(Default)]
struct MockBackend {
    calls: Vec<Call>,
    edits: PanelEdits,
}

impl MockBackend {
    fn renders(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, Call::Render { .. })).count()
    }

    fn last_render(&self) -> Option<&Call> {
        self.calls.iter().rev().find(|c| matches!(c, Call::Render { .. }))
    }
}

impl RenderBackend for MockBackend {
    fn resize(&mut self, viewport: &Viewport) -> Result<()> {
        self.calls.push(Call::Resize {
            surface: viewport.render_size(),
            pixel_ratio: viewport.pixel_ratio(),
        });
        Ok(())
    }

    fn upload_model(&mut self, model: &ModelInstance) -> Result<()> {
        self.calls.push(Call::Upload {
            primitives: model.primitives().len(),
        });
        Ok(())
    }

    fn capture_reflection(&mut self, scene: &SceneGraph) -> Result<()> {
        self.calls.push(Call::Capture {
            ring_rotation: scene.ring_light_rotation(),
            model_x: scene.model().map(|m| m.world_matrix(0).w_axis.x),
        });
        Ok(())
    }

    fn render(&mut self, view: &FrameView<'_>) -> Result<PanelEdits> {
        self.calls.push(Call::Render {
            fov: view.camera.fov,
            delta: view.time.delta,
        });
        Ok(self.edits)
    }
}

fn driver_with_size(size: WindowSize) -> (FrameDriver<MockBackend, ManualTime>, Rc<Cell<f32>>) {
    let time = Rc::new(Cell::new(0.0));
    let driver = FrameDriver::with_clock(
        MockBackend::default(),
        &ViewerConfig::default(),
        size,
        Clock::with_source(ManualTime(time.clone())),
    )
    .unwrap();
    (driver, time)
}

fn driver() -> (FrameDriver<MockBackend, ManualTime>, Rc<Cell<f32>>) {
    driver_with_size(WindowSize::new(1280.0, 720.0, 1.0))
}

fn model(clips: Vec<AnimationClip>) -> ModelData {
    ModelData {
        name: "capsule".to_string(),
        nodes: vec![SceneNode {
            name: Some("root".to_string()),
            parent: None,
            transform: Transform::IDENTITY,
        }],
        primitives: vec![Primitive {
            node: 0,
            mesh: geometry::cylinder(0.5, 1.0, 8),
            material: Material::standard([0.8, 0.8, 0.8], 1.0, 0.1),
        }],
        clips,
    }
}

fn slide_clip() -> AnimationClip {
    AnimationClip::new(
        "slide",
        vec![Channel {
            node: 0,
            interpolation: Interpolation::Linear,
            times: vec![0.0, 1.0],
            values: ChannelValues::Translation(vec![Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)]),
        }],
    )
}

// ============================================================================
// Tick Ordering
// ============================================================================

#[test]
fn test_construction_sizes_the_surface_once() {
    let (driver, _) = driver();
    assert_eq!(
        driver.backend().calls,
        vec![Call::Resize {
            surface: (1280, 720),
            pixel_ratio: 1.0
        }]
    );
}

#[test]
fn test_each_tick_captures_then_renders_once() {
    let (mut driver, time) = driver();
    for step in 1..=3 {
        time.set(step as f32 * 0.016);
        driver.tick().unwrap();
    }

    let after_setup = &driver.backend().calls[1..];
    assert_eq!(after_setup.len(), 6);
    for pair in after_setup.chunks(2) {
        assert!(matches!(pair[0], Call::Capture { .. }));
        assert!(matches!(pair[1], Call::Render { .. }));
    }
    assert_eq!(driver.backend().renders(), 3);
}

#[test]
fn test_capture_sees_this_ticks_ring_rotation() {
    let (mut driver, time) = driver();
    time.set(std::f32::consts::FRAC_PI_2);
    driver.tick().unwrap();

    let Some(Call::Capture { ring_rotation, .. }) = driver.backend().calls.get(1).cloned() else {
        panic!("expected a capture after setup");
    };
    assert!((ring_rotation - 2.0).abs() < 1e-5);
}

// ============================================================================
// Clock
// ============================================================================

#[test]
fn test_delta_is_difference_of_successive_elapsed_times() {
    let (mut driver, time) = driver();
    let samples = [0.1, 0.25, 0.25, 0.7];
    let expected = [0.1, 0.15, 0.0, 0.45];

    for (elapsed, want) in samples.iter().zip(expected) {
        time.set(*elapsed);
        let frame = driver.tick().unwrap();
        assert!((frame.delta - want).abs() < 1e-6, "delta {} != {}", frame.delta, want);
        assert!(frame.delta >= 0.0);
        assert_eq!(frame.elapsed, *elapsed);
    }
    assert_eq!(driver.clock().previous_time(), 0.7);
}

#[test]
fn test_render_receives_the_same_delta() {
    let (mut driver, time) = driver();
    time.set(0.5);
    driver.tick().unwrap();
    time.set(0.75);
    driver.tick().unwrap();

    let fov = driver.camera().fov;
    assert_eq!(driver.backend().last_render(), Some(&Call::Render { fov, delta: 0.25 }));
}

// ============================================================================
// Camera Framing
// ============================================================================

#[test]
fn test_fov_is_framed_from_the_first_frame() {
    let (driver, _) = driver();
    let camera = driver.camera();
    let distance = camera.position.distance(Vec3::ZERO);

    assert!((distance - 12.0).abs() < 1e-4);
    assert!((camera.fov - framed_fov(distance, 5.0)).abs() < 1e-3);
    assert!((camera.fov - 60.0).abs() < 1e-3);
}

#[test]
fn test_fov_stays_framed_while_idle() {
    let (mut driver, time) = driver();
    let start = driver.camera().fov;
    for step in 1..=10 {
        time.set(step as f32 * 0.016);
        driver.tick().unwrap();

        let camera = driver.camera();
        let expected = framed_fov(camera.position.distance(Vec3::ZERO), 5.0);
        assert!((camera.fov - expected).abs() < 1e-3, "fov {} != {}", camera.fov, expected);
    }
    assert_eq!(driver.camera().fov, start);
}

#[test]
fn test_orbit_change_reframes_camera() {
    let (mut driver, time) = driver();

    driver.input_mut().move_cursor(100.0, 100.0);
    driver.input_mut().press(Button::MouseLeft);
    // Vertical drag changes the polar angle, and with it the distance to the floor
    driver.input_mut().move_cursor(160.0, 160.0);
    let start = driver.camera().fov;
    time.set(0.016);
    driver.tick().unwrap();

    let camera = driver.camera();
    let expected = framed_fov(camera.position.distance(Vec3::ZERO), 5.0);
    assert!((camera.fov - expected).abs() < 1e-3);
    assert!((camera.fov - start).abs() > 1e-3);

    let Some(Call::Render { fov, .. }) = driver.backend().last_render() else {
        panic!("expected a render");
    };
    assert_eq!(*fov, camera.fov);
}

#[test]
fn test_framing_rule_at_distance_ten() {
    assert_eq!(framed_fov(10.0, 5.0), 50.0);
}

#[test]
fn test_orbit_distance_stays_in_bounds_while_zooming() {
    let (mut driver, time) = driver();
    for step in 1..=200 {
        driver.input_mut().scroll(if step < 100 { 5.0 } else { -5.0 });
        time.set(step as f32 * 0.016);
        driver.tick().unwrap();

        let distance = driver.controls().distance(driver.camera());
        assert!((5.0 - 1e-3..=20.0 + 1e-3).contains(&distance), "distance {}", distance);
    }
}

// ============================================================================
// Viewport Resize
// ============================================================================

#[test]
fn test_resize_updates_aspect_and_surface() {
    let (mut driver, _) = driver();
    driver.push_event(ViewerEvent::Resized(WindowSize::new(1000.0, 500.0, 3.0)));
    driver.tick().unwrap();

    assert_eq!(driver.camera().aspect, 2.0);
    assert_eq!(driver.viewport().render_size(), (2000, 1000));
    assert_eq!(
        driver.backend().calls[1],
        Call::Resize {
            surface: (2000, 1000),
            pixel_ratio: 2.0
        }
    );
}

#[test]
fn test_resize_is_idempotent() {
    let (mut driver, _) = driver();
    let size = WindowSize::new(900.0, 600.0, 1.5);

    driver.push_event(ViewerEvent::Resized(size));
    driver.tick().unwrap();
    let projection = driver.camera().projection();
    let viewport = *driver.viewport();

    driver.push_event(ViewerEvent::Resized(size));
    driver.tick().unwrap();

    assert_eq!(driver.camera().projection(), projection);
    assert_eq!(*driver.viewport(), viewport);
}

#[test]
fn test_pixel_ratio_is_clamped_to_two() {
    for reported in [1.0, 1.5, 2.0, 3.0, 4.0] {
        let (driver, _) = driver_with_size(WindowSize::new(800.0, 600.0, reported));
        assert_eq!(driver.viewport().pixel_ratio(), reported.min(2.0));
    }
}

#[test]
fn test_minimized_window_is_ignored() {
    let (mut driver, _) = driver();
    let before = *driver.viewport();

    driver.push_event(ViewerEvent::Resized(WindowSize::new(0.0, 0.0, 1.0)));
    driver.tick().unwrap();

    assert_eq!(*driver.viewport(), before);
    let resizes = driver
        .backend()
        .calls
        .iter()
        .filter(|c| matches!(c, Call::Resize { .. }))
        .count();
    assert_eq!(resizes, 1);
}

// ============================================================================
// Model Loading
// ============================================================================

#[test]
fn test_unknown_route_leaves_scene_without_model() {
    assert_eq!(select_model("/nowhere", Path::new("static")), None);

    let (mut driver, time) = driver();
    time.set(0.1);
    driver.tick().unwrap();

    assert_eq!(driver.scene().model_node_count(), 0);
    assert_eq!(driver.model_status(), &ModelStatus::NotRequested);
    assert!(driver.mixer().is_none());
}

#[test]
fn test_model_without_clips_has_no_mixer() {
    let (mut driver, time) = driver();
    driver.push_event(ViewerEvent::ModelLoaded(model(Vec::new())));

    for step in 1..=3 {
        time.set(step as f32 * 0.1);
        driver.tick().unwrap();
    }

    assert!(driver.mixer().is_none());
    assert_eq!(driver.scene().model_node_count(), 1);
    assert!(driver.backend().calls.contains(&Call::Upload { primitives: 1 }));
    assert_eq!(
        driver.model_status(),
        &ModelStatus::Loaded {
            name: "capsule".to_string(),
            nodes: 1,
            clips: 0
        }
    );
}

#[test]
fn test_mixer_moves_model_before_capture() {
    let (mut driver, time) = driver();
    driver.push_event(ViewerEvent::ModelLoaded(model(vec![slide_clip()])));

    time.set(0.5);
    driver.tick().unwrap();

    let capture = driver
        .backend()
        .calls
        .iter()
        .rev()
        .find(|c| matches!(c, Call::Capture { .. }))
        .cloned();
    let Some(Call::Capture { model_x: Some(x), .. }) = capture else {
        panic!("expected a capture with the model attached");
    };
    assert!((x - 1.0).abs() < 1e-5);
    assert!((driver.mixer().unwrap().time() - 0.5).abs() < 1e-6);
}

#[test]
fn test_animation_loops() {
    let (mut driver, time) = driver();
    driver.push_event(ViewerEvent::ModelLoaded(model(vec![slide_clip()])));

    time.set(0.75);
    driver.tick().unwrap();
    time.set(1.5);
    driver.tick().unwrap();

    let local = driver.mixer().unwrap().local_time(0).unwrap();
    assert!((local - 0.5).abs() < 1e-5);
}

#[test]
fn test_second_model_is_rejected() {
    let (mut driver, time) = driver();
    driver.push_event(ViewerEvent::ModelLoaded(model(Vec::new())));

    let mut second = model(Vec::new());
    second.name = "hamburger".to_string();
    second.nodes.push(SceneNode {
        name: None,
        parent: Some(0),
        transform: Transform::from_translation(Vec3::Y),
    });
    driver.push_event(ViewerEvent::ModelLoaded(second));

    time.set(0.1);
    driver.tick().unwrap();

    assert_eq!(driver.scene().model_node_count(), 1);
    assert_eq!(driver.scene().model().unwrap().name, "capsule");
    let uploads = driver
        .backend()
        .calls
        .iter()
        .filter(|c| matches!(c, Call::Upload { .. }))
        .count();
    assert_eq!(uploads, 1);
}

#[test]
fn test_invalid_hierarchy_is_reported_not_fatal() {
    let (mut driver, time) = driver();
    let mut broken = model(Vec::new());
    broken.nodes[0].parent = Some(4);
    driver.push_event(ViewerEvent::ModelLoaded(broken));

    time.set(0.1);
    driver.tick().unwrap();

    assert!(matches!(driver.model_status(), ModelStatus::Failed(_)));
    assert_eq!(driver.scene().model_node_count(), 0);
}

#[test]
fn test_load_failure_keeps_viewer_running() {
    let (mut driver, time) = driver();
    driver.push_event(ViewerEvent::ModelLoadFailed("truncated file".to_string()));

    time.set(0.1);
    driver.tick().unwrap();
    time.set(0.2);
    driver.tick().unwrap();

    assert_eq!(driver.model_status(), &ModelStatus::Failed("truncated file".to_string()));
    assert_eq!(driver.backend().renders(), 2);
}

#[test]
fn test_background_load_of_missing_file_fails_on_a_later_tick() {
    let (mut driver, time) = driver();
    driver.load_model(PathBuf::from("/nonexistent/models/capsule.glb"));
    assert!(matches!(driver.model_status(), ModelStatus::Loading(_)));

    for step in 1..=500 {
        time.set(step as f32 * 0.016);
        driver.tick().unwrap();
        if matches!(driver.model_status(), ModelStatus::Failed(_)) {
            break;
        }
        std::thread::sleep(Duration::from_millis(2));
    }

    assert!(matches!(driver.model_status(), ModelStatus::Failed(_)));
    assert_eq!(driver.scene().model_node_count(), 0);
}

#[test]
fn test_draco_model_reports_a_specific_failure() {
    let path = std::env::temp_dir().join(format!("scene_viewer_driver_{}_draco.gltf", std::process::id()));
    std::fs::write(
        &path,
        r#"{
            "asset": { "version": "2.0" },
            "extensionsUsed": ["KHR_draco_mesh_compression"],
            "extensionsRequired": ["KHR_draco_mesh_compression"]
        }"#,
    )
    .unwrap();

    let (mut driver, time) = driver();
    driver.load_model(path.clone());
    for step in 1..=500 {
        time.set(step as f32 * 0.016);
        driver.tick().unwrap();
        if !matches!(driver.model_status(), ModelStatus::Loading(_)) {
            break;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    std::fs::remove_file(&path).ok();

    let ModelStatus::Failed(reason) = driver.model_status() else {
        panic!("expected a failure, got {}", driver.model_status());
    };
    assert!(reason.contains("Draco-compressed meshes unsupported"), "{}", reason);
    assert_eq!(driver.scene().model_node_count(), 0);
}

// ============================================================================
// Debug Panel Edits
// ============================================================================

#[test]
fn test_panel_edits_are_applied_after_render() {
    let (mut driver, time) = driver();
    driver.backend_mut().edits = PanelEdits {
        background_intensity: Some(2.5),
        exposure: Some(-1.0),
    };

    time.set(0.1);
    driver.tick().unwrap();

    assert_eq!(driver.scene().background.intensity, 2.5);
    assert_eq!(driver.exposure(), 0.0);
}

#[test]
fn test_model_rotation_channel_is_applied() {
    let (mut driver, time) = driver();
    let spin = AnimationClip::new(
        "spin",
        vec![Channel {
            node: 0,
            interpolation: Interpolation::Step,
            times: vec![0.0, 1.0],
            values: ChannelValues::Rotation(vec![Quat::IDENTITY, Quat::from_rotation_y(1.0)]),
        }],
    );
    driver.push_event(ViewerEvent::ModelLoaded(model(vec![spin])));

    time.set(0.5);
    driver.tick().unwrap();

    let node = &driver.scene().model().unwrap().nodes()[0];
    assert!(node.transform.rotation.abs_diff_eq(Quat::IDENTITY, 1e-6));
}
