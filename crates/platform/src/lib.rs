//! Platform layer for the Vulkan practices renderer.
//!
//! This crate provides:
//! - Window ownership via winit
//! - A latched resize notification shared with the renderer
//! - Vulkan surface creation from raw window handles

mod resize;
mod window;

pub use resize::ResizeLatch;
pub use window::{DrawableSize, Surface, Window, required_extensions};

// Re-export winit types that users might need
pub use winit::event::WindowEvent;
pub use winit::event_loop::{ActiveEventLoop, EventLoop};
