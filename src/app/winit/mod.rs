//! Winit-based Application Framework
//!
//! This module provides a complete application framework built on top of the
//! [winit](https://crates.io/crates/winit) cross-platform windowing library.
//!
//! # Overview
//!
//! The framework consists of:
//!
//! - [`App`]: Builder for configuring and launching applications
//! - [`AppHandler`](super::AppHandler): Trait that users implement to define application behavior
//! - [`AppRunner`]: Internal event loop handler (not exposed publicly)
//!
//! # Usage
//!
//! 1. Implement [`AppHandler`](super::AppHandler) for your application struct
//! 2. Use [`App`] builder to configure window settings
//! 3. Call [`App::run`] to start the event loop
//!
//! # Example
//!
//! ```rust,ignore
//! use forgelight::app::{AppHandler, Window};
//! use forgelight::engine::{Engine, FrameState};
//!
//! struct GameApp;
//!
//! impl AppHandler for GameApp {
//!     fn init(engine: &mut Engine, window: &dyn Window) -> Self {
//!         window.set_title("My Game");
//!         GameApp {}
//!     }
//!
//!     fn update(&mut self, engine: &mut Engine, window: &dyn Window, frame: &FrameState) {
//!         // Update game logic using engine.input
//!     }
//! }
//!
//! fn main() -> forgelight::errors::Result<()> {
//!     App::new()
//!         .with_title("My Game")
//!         .run::<GameApp>()
//! }
//! ```

use std::sync::Arc;
use std::time::Instant;

use glam::Vec2;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
pub use winit::window::Window as WinitWindow;
use winit::window::{Window, WindowId};

use crate::app::input_adapter;
use crate::app::window::Window as WindowTrait;
use crate::app::AppHandler;
use crate::engine::{Engine, FrameState};
use crate::renderer::settings::RenderSettings;

// ============================================================================
// Window Trait Implementation for winit::Window
// ============================================================================

impl WindowTrait for Window {
    fn set_title(&self, title: &str) {
        Window::set_title(self, title);
    }

    fn inner_size(&self) -> Vec2 {
        let size = Window::inner_size(self);
        Vec2::new(size.width as f32, size.height as f32)
    }

    fn scale_factor(&self) -> f32 {
        Window::scale_factor(self) as f32
    }

    fn request_redraw(&self) {
        Window::request_redraw(self);
    }

    fn set_cursor_visible(&self, visible: bool) {
        Window::set_cursor_visible(self, visible);
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

// ============================================================================
// App Builder
// ============================================================================

/// Application builder for configuring and launching the engine.
///
/// Use the builder pattern to configure window settings, then call
/// [`run`](Self::run) to start the application.
///
/// # Example
///
/// ```rust,ignore
/// App::new()
///     .with_title("My 3D Application")
///     .with_settings(RenderSettings {
///         vsync: true,
///         ..Default::default()
///     })
///     .run::<MyHandler>()?;
/// ```
pub struct App {
    title: String,
    render_settings: RenderSettings,
}

impl App {
    /// Creates a new application builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            title: "Forgelight".into(),
            render_settings: RenderSettings::default(),
        }
    }

    /// Sets the window title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the render settings.
    #[must_use]
    pub fn with_settings(mut self, settings: RenderSettings) -> Self {
        self.render_settings = settings;
        self
    }

    /// Runs the application with the specified handler.
    ///
    /// This method blocks until the application exits. The event loop
    /// takes ownership of the current thread.
    ///
    /// # Type Parameters
    ///
    /// * `H` - The application handler type implementing [`AppHandler`]
    ///
    /// # Errors
    ///
    /// Returns an error if event loop creation or execution fails.
    pub fn run<H: AppHandler>(self) -> crate::errors::Result<()> {
        use crate::Error;

        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut runner = AppRunner::<H>::new(self.title, self.render_settings);
        event_loop.run_app(&mut runner).map_err(Error::from)
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Internal AppRunner
// ============================================================================

/// Internal application runner that implements winit's `ApplicationHandler`.
///
/// This struct manages the application lifecycle including window creation,
/// event handling, and frame rendering.
struct AppRunner<H: AppHandler> {
    title: String,
    render_settings: RenderSettings,

    window: Option<Arc<Window>>,
    engine: Option<Engine>,
    user_state: Option<H>,

    start_time: Instant,
    last_loop_time: Instant,
}

impl<H: AppHandler> AppRunner<H> {
    fn new(title: String, render_settings: RenderSettings) -> Self {
        let now = Instant::now();
        Self {
            title,
            render_settings,
            window: None,
            engine: None,
            user_state: None,
            start_time: now,
            last_loop_time: now,
        }
    }

    fn update_logic(&mut self) {
        let now = Instant::now();
        let total_time = now.duration_since(self.start_time).as_secs_f32();
        let dt = now.duration_since(self.last_loop_time).as_secs_f32();
        self.last_loop_time = now;

        let (Some(window), Some(engine), Some(user_state)) =
            (&self.window, &mut self.engine, &mut self.user_state)
        else {
            return;
        };

        let frame_state = FrameState {
            time: total_time,
            dt,
            frame_count: engine.frame_count(),
        };

        // Pass &dyn WindowTrait (winit::Window implements our Window trait)
        user_state.update(engine, window.as_ref(), &frame_state);
        engine.update(dt);
    }

    fn render_frame(&mut self) {
        let Some(engine) = &mut self.engine else {
            return;
        };

        engine.render_active_scene();
        engine.renderer.maybe_prune();
    }
}

impl<H: AppHandler> ApplicationHandler for AppRunner<H> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attributes = Window::default_attributes()
            .with_title(&self.title)
            .with_inner_size(winit::dpi::LogicalSize::new(1280.0, 720.0));

        let window = event_loop
            .create_window(window_attributes)
            .expect("Failed to create window");
        let window = Arc::new(window);
        self.window = Some(window.clone());

        log::info!("Initializing Renderer Backend...");

        let mut engine = Engine::new(self.render_settings.clone());
        let size = window.inner_size();

        if let Err(e) = pollster::block_on(engine.init(window.clone(), size.width, size.height)) {
            log::error!("Fatal Renderer Error: {e}");
            event_loop.exit();
            return;
        }

        // Pass &dyn WindowTrait to user init
        self.user_state = Some(H::init(&mut engine, window.as_ref()));

        self.engine = Some(engine);

        let now = Instant::now();
        self.start_time = now;
        self.last_loop_time = now;
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let (Some(window), Some(engine), Some(user_state)) =
            (&self.window, &mut self.engine, &mut self.user_state)
        else {
            return;
        };

        // Pass raw event to user via &dyn Any (platform-independent signature)
        let consumed = user_state.on_event(engine, window.as_ref(), &event);

        if consumed {
            if let WindowEvent::Resized(ps) = event {
                let scale_factor = window.scale_factor() as f32;
                engine.resize(ps.width, ps.height, scale_factor);
            }
            if let WindowEvent::RedrawRequested = event {
                self.update_logic();
                self.render_frame();
                if let Some(w) = &self.window {
                    w.request_redraw();
                }
            }
        } else {
            // Translate winit events to engine Input
            input_adapter::process_window_event(&mut engine.input, &event);

            match event {
                WindowEvent::CloseRequested => event_loop.exit(),
                WindowEvent::Resized(physical_size) => {
                    let scale_factor = window.scale_factor() as f32;
                    engine.resize(physical_size.width, physical_size.height, scale_factor);
                }
                WindowEvent::RedrawRequested => {
                    self.update_logic();
                    self.render_frame();
                    if let Some(w) = &self.window {
                        w.request_redraw();
                    }
                }
                _ => {}
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if self.engine.is_some()
            && let Some(window) = &self.window
        {
            window.request_redraw();
        }
    }
}
