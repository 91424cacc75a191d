//! Vulkan abstraction layer (Render Hardware Interface).
//!
//! Thin RAII wrappers over `ash`:
//! - Instance, debug messenger and device selection
//! - Logical device with its queues and memory allocator
//! - Swapchain, render pass and framebuffers
//! - Command pools, buffers and synchronization primitives
//! - Shaders, pipelines and descriptor sets

mod error;

pub mod buffer;
pub mod command;
pub mod descriptor;
pub mod device;
pub mod framebuffer;
pub mod instance;
pub mod physical_device;
pub mod pipeline;
pub mod render_pass;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod vertex;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::{RhiError, RhiResult};

// Re-export ash types that users might need
pub use ash::vk;
