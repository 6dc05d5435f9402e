use clap::Parser;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use scene_viewer::cli::Cli;
use scene_viewer::config::ViewerConfig;
use scene_viewer::core::{WindowSize, WinitController};
use scene_viewer::frame_driver::{FrameDriver, ViewerEvent};
use scene_viewer::loaders::load_environment;
use scene_viewer::renderer::SceneRenderer;
use scene_viewer::route::select_model;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

struct App {
    cli: Cli,
    config: ViewerConfig,
    window: Option<Arc<Window>>,
    driver: Option<FrameDriver<SceneRenderer>>,
    failure: Option<Box<dyn std::error::Error>>,
}

impl App {
    fn new(cli: Cli, config: ViewerConfig) -> Self {
        Self {
            cli,
            config,
            window: None,
            driver: None,
            failure: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window = Arc::new(
            event_loop.create_window(
                Window::default_attributes()
                    .with_title(self.config.window.title.as_str())
                    .with_inner_size(winit::dpi::LogicalSize::new(
                        self.config.window.width,
                        self.config.window.height,
                    )),
            )?,
        );

        let environment = load_environment(self.cli.assets.join(&self.config.environment.map))?;
        let renderer = pollster::block_on(SceneRenderer::new(
            window.clone(),
            &self.config,
            &environment,
            !self.cli.no_ui,
        ))?;

        let size = window.inner_size();
        let scale_factor = window.scale_factor();
        let mut driver = FrameDriver::new(
            renderer,
            &self.config,
            WindowSize::from_physical(size.width, size.height, scale_factor),
        )?;
        driver.input_mut().set_scale_factor(scale_factor as f32);

        if let Some(path) = select_model(&self.cli.route, &self.cli.assets) {
            driver.load_model(path);
        }

        self.window = Some(window);
        self.driver = Some(driver);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, context: &str, error: Box<dyn std::error::Error>) {
        log::error!("{}: {}", context, error);
        self.failure = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.start(event_loop) {
                self.fail(event_loop, "Failed to start viewer", e);
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let (Some(driver), Some(window)) = (&mut self.driver, &self.window) else {
            return;
        };

        let ends_drag = WinitController::ends_drag(&event);
        if ends_drag {
            driver.input_mut().process_event(&event);
        }

        // egui sees everything else first
        if driver.backend_mut().handle_event(&event) {
            return;
        }

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::Resized(size) => {
                let size = WindowSize::from_physical(size.width, size.height, window.scale_factor());
                driver.push_event(ViewerEvent::Resized(size));
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = driver.tick() {
                    self.fail(event_loop, "Render error", e);
                }
            }
            other if !ends_drag => driver.input_mut().process_event(&other),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ViewerConfig::from_file(path)?,
        None => ViewerConfig::default(),
    };

    let event_loop = EventLoop::new()?;
    let mut app = App::new(cli, config);

    log::info!("Scene Viewer - drag to orbit, right-drag to pan, wheel to zoom, Escape to quit");
    event_loop.run_app(&mut app)?;

    match app.failure.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
