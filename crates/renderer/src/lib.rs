//! Frame lifecycle and the demo renderer.
//!
//! This crate provides:
//! - The frame state machine and swapchain-recreation policy ([`FrameLoop`])
//! - Per-slot command buffers and sync objects
//! - The ordered swapchain recreation procedure ([`recreate_swapchain`])
//! - The triangle/quad demo [`Renderer`] built on `practices_rhi`

pub mod error;
pub mod frame;
pub mod frame_slots;
pub mod mesh;
pub mod recreate;
mod renderer;
pub mod ubo;

pub use error::{RendererError, RendererResult};
pub use frame::{FrameBackend, FrameLoop, FrameOutcome, FrameState, RecreateOutcome};
pub use recreate::{SwapchainTarget, recreate_swapchain};
pub use renderer::{FRAGMENT_SHADER_FILE, RenderContext, Renderer, VERTEX_SHADER_FILE};

/// Maximum number of frames that can be in flight simultaneously.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;
