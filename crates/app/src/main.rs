//! Vulkan Practices - Main Entry Point
//!
//! Opens a window and renders the configured demo scene until the window is
//! closed or Escape is pressed.

mod suspend;

use std::time::Instant;

use anyhow::Result;
use tracing::{debug, error, info};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use practices_core::AppConfig;
use practices_platform::Window;
use practices_renderer::{FrameOutcome, Renderer};

use crate::suspend::SuspendState;

struct App {
    config: AppConfig,
    // Dropped before the window it renders to
    renderer: Option<Renderer>,
    window: Option<Window>,
    /// Waiting for a non-zero drawable size; redraws only on the size timer.
    suspend: SuspendState,
    /// First fatal error, returned from `main`.
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: AppConfig) -> Self {
        Self {
            config,
            renderer: None,
            window: None,
            suspend: SuspendState::default(),
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{:#}", err);
        if self.error.is_none() {
            self.error = Some(err);
        }
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        match renderer.render_frame() {
            Ok(FrameOutcome::Suspended) => {
                if !self.suspend.is_suspended() {
                    debug!("Window minimized, waiting for restore");
                }
                let deadline = self.suspend.suspend(Instant::now());
                event_loop.set_control_flow(ControlFlow::WaitUntil(deadline));
            }
            Ok(_) => {
                if self.suspend.resume() {
                    debug!("Window restored, resuming rendering");
                }
                event_loop.set_control_flow(ControlFlow::Poll);
            }
            Err(e) => self.fail(event_loop, anyhow::Error::new(e).context("render error")),
        }
    }

    /// Requests a redraw right away if suspended; the frame re-checks the size.
    fn wake(&mut self, event_loop: &ActiveEventLoop) {
        if !self.suspend.resume() {
            return;
        }
        event_loop.set_control_flow(ControlFlow::Poll);
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match Window::new(event_loop, &self.config.window) {
            Ok(window) => window,
            Err(e) => {
                self.fail(
                    event_loop,
                    anyhow::Error::new(e).context("failed to create window"),
                );
                return;
            }
        };

        match Renderer::new(&window, &self.config.renderer) {
            Ok(renderer) => {
                info!("Initialization complete, entering main loop");
                self.renderer = Some(renderer);
                self.window = Some(window);
            }
            Err(e) => self.fail(
                event_loop,
                anyhow::Error::new(e).context("failed to create renderer"),
            ),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                info!("Escape pressed, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                let Some(window) = self.window.as_mut() else {
                    return;
                };
                let unchanged = size.width == window.width() && size.height == window.height();
                if unchanged && !self.suspend.is_suspended() {
                    return;
                }
                window.handle_resized(size.width, size.height);
                if size.width > 0 && size.height > 0 {
                    self.wake(event_loop);
                }
            }
            // Restore from minimize on X11 and macOS arrives as one of these
            WindowEvent::Occluded(false) | WindowEvent::Focused(true) => self.wake(event_loop),
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(window) = self.window.as_ref() else {
            return;
        };

        if !self.suspend.is_suspended() {
            window.request_redraw();
            return;
        }

        let now = Instant::now();
        if self.suspend.check_due(now) {
            window.request_redraw();
            // Re-armed here too, in case the platform drops redraws while minimized
            let deadline = self.suspend.suspend(now);
            event_loop.set_control_flow(ControlFlow::WaitUntil(deadline));
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(renderer) = self.renderer.take() {
            info!("Rendered {} frames", renderer.frame_index());
        }
        self.window = None;
    }
}

fn main() -> Result<()> {
    let config = AppConfig::load_default_location()?;

    practices_core::init_logging_with(config.log_filter.as_deref());
    info!("Starting Vulkan Practices");
    debug!("{:?}", config);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
