//! Application framework: window creation, the event loop, and the
//! platform-independent surface user code implements against.
//!
//! The engine itself ([`crate::engine::Engine`]) has no window-management
//! logic; this module supplies the glue so a `winit` event loop can drive
//! it. Everything here is a collaborator the frame graph is exercised
//! through, not part of its contract.

pub mod input;
pub mod input_adapter;
pub mod window;
pub mod winit;

pub use window::Window;
pub use winit::App;

use crate::engine::{Engine, FrameState};

/// User-implemented application behavior, driven by [`App::run`].
///
/// Implementations own their own game/demo state; the engine and window are
/// passed in rather than reached through a global.
pub trait AppHandler: Sized {
    /// Called once after the GPU context is ready, to construct the handler.
    fn init(engine: &mut Engine, window: &dyn Window) -> Self;

    /// Called once per frame before rendering. Rendering itself happens
    /// afterwards via [`Engine::render_active_scene`] and needs no
    /// handler involvement; use this hook for game/demo logic only.
    fn update(&mut self, engine: &mut Engine, window: &dyn Window, frame: &FrameState);

    /// Called for every window event before the engine's default handling.
    /// Return `true` to mark the event consumed, suppressing the built-in
    /// resize/redraw handling for it.
    fn on_event(&mut self, engine: &mut Engine, window: &dyn Window, event: &::winit::event::WindowEvent) -> bool {
        let _ = (engine, window, event);
        false
    }
}
