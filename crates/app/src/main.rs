//! Model viewer entry point.
//!
//! A single-window application that loads an OBJ model and a texture,
//! uploads them to the GPU, and draws the model every frame with a
//! time-driven rotation.

use std::path::Path;

use anyhow::Result;
use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use viewer_core::Config;
use viewer_platform::Window;
use viewer_renderer::Renderer;

struct App {
    config: Config,
    window: Option<Window>,
    renderer: Option<Renderer>,
    fatal: Option<String>,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            window: None,
            renderer: None,
            fatal: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, message: String) {
        error!("{}", message);
        self.fatal = Some(message);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match Window::new(
            event_loop,
            self.config.window_width,
            self.config.window_height,
            &self.config.window_title,
            !self.config.lock_window_size,
        ) {
            Ok(window) => window,
            Err(e) => {
                self.fail(event_loop, format!("Failed to create window: {}", e));
                return;
            }
        };

        match Renderer::new(&window, &self.config) {
            Ok(renderer) => {
                info!("Initialization complete, entering main loop");
                self.renderer = Some(renderer);
                self.window = Some(window);
            }
            Err(e) => {
                self.fail(event_loop, format!("Failed to create renderer: {}", e));
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(ref mut renderer) = self.renderer {
                    renderer.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(ref mut renderer) = self.renderer
                    && let Err(e) = renderer.render_frame()
                {
                    self.fail(event_loop, format!("Render error: {}", e));
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    viewer_core::init_logging();
    info!("Starting model viewer");

    let config = Config::load(Path::new("viewer.toml"))?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    if let Some(message) = app.fatal {
        anyhow::bail!(message);
    }

    Ok(())
}
