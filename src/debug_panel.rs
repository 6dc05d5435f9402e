use crate::frame_driver::{FrameView, PanelEdits};

const FPS_UPDATE_INTERVAL: f32 = 1.0;

/// Frame rate averaged over a fixed window
#[derive(Debug, Clone, Default)]
pub struct FpsCounter {
    frame_count: u32,
    timer: f32,
    fps: f32,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, delta: f32) {
        self.frame_count += 1;
        self.timer += delta;

        if self.timer >= FPS_UPDATE_INTERVAL {
            self.fps = self.frame_count as f32 / self.timer;
            log::debug!("FPS: {:.1}", self.fps);
            self.frame_count = 0;
            self.timer = 0.0;
        }
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}

/// "Debug" overlay window: live stats plus render parameter sliders
#[derive(Debug, Clone, Default)]
pub struct DebugPanel {
    fps: FpsCounter,
}

impl DebugPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fps(&self) -> f32 {
        self.fps.fps()
    }

    /// Lay out the panel for this frame and report slider changes
    pub fn show(&mut self, ctx: &egui::Context, view: &FrameView<'_>) -> PanelEdits {
        self.fps.update(view.time.delta);
        let fps = self.fps.fps();

        let mut edits = PanelEdits::default();
        let mut intensity = view.scene.background.intensity;
        let mut exposure = view.exposure;

        egui::Window::new("Debug")
            .title_bar(true)
            .resizable(false)
            .default_pos(egui::pos2(10.0, 10.0))
            .default_width(250.0)
            .show(ctx, |ui| {
                ui.heading(
                    egui::RichText::new(format!("{:.0} FPS", fps))
                        .size(32.0)
                        .color(egui::Color32::from_rgb(74, 158, 255)),
                );

                let frame_time_ms = if fps > 0.0 { 1000.0 / fps } else { 0.0 };
                ui.label(
                    egui::RichText::new(format!("{:.2} ms", frame_time_ms))
                        .size(14.0)
                        .color(egui::Color32::GRAY),
                );

                ui.add_space(10.0);
                ui.separator();
                ui.add_space(5.0);

                ui.label(
                    egui::RichText::new("Camera")
                        .size(16.0)
                        .color(egui::Color32::from_rgb(100, 200, 100)),
                );
                let position = view.camera.position;
                ui.monospace(format!("Pos: ({:.2}, {:.2}, {:.2})", position.x, position.y, position.z));
                ui.monospace(format!("FOV: {:.1}°", view.camera.fov));
                ui.monospace(format!("Distance: {:.2}", view.orbit_distance));

                ui.add_space(5.0);
                ui.separator();
                ui.add_space(5.0);

                ui.label(
                    egui::RichText::new("Scene")
                        .size(16.0)
                        .color(egui::Color32::from_rgb(200, 150, 100)),
                );
                ui.monospace(format!("Ring rotation: {:.2} rad", view.scene.ring_light_rotation()));
                ui.monospace(format!("Model: {}", view.model_status));

                ui.add_space(5.0);
                ui.separator();
                ui.add_space(5.0);

                ui.label(
                    egui::RichText::new("Rendering")
                        .size(16.0)
                        .color(egui::Color32::from_rgb(200, 100, 200)),
                );
                ui.monospace(format!(
                    "Resolution: {}x{} @{:.1}x",
                    view.viewport.render_size().0,
                    view.viewport.render_size().1,
                    view.viewport.pixel_ratio()
                ));
                ui.monospace(format!("Time: {:.2}s", view.time.elapsed));

                if ui
                    .add(egui::Slider::new(&mut intensity, 0.0..=5.0).text("Background intensity"))
                    .changed()
                {
                    edits.background_intensity = Some(intensity);
                }
                if ui
                    .add(egui::Slider::new(&mut exposure, 0.0..=4.0).text("Exposure"))
                    .changed()
                {
                    edits.exposure = Some(exposure);
                }
            });

        edits
    }
}
