//! Errors raised by the Vulkan wrappers.

use thiserror::Error;

/// Error type for every fallible operation in this crate.
///
/// The recoverable swapchain codes never appear here: acquire and present
/// report them as typed outcomes instead.
#[derive(Error, Debug)]
pub enum RhiError {
    /// Vulkan API error
    #[error("Vulkan error: {0}")]
    VulkanError(#[from] ash::vk::Result),

    /// Failed to load the Vulkan library
    #[error("Failed to load Vulkan: {0}")]
    LoadingError(#[from] ash::LoadingError),

    #[error("Allocator error: {0}")]
    AllocatorError(#[from] gpu_allocator::AllocationError),

    /// Another thread panicked while holding the allocator lock
    #[error("Allocator mutex poisoned")]
    AllocatorPoisoned,

    /// Validation was requested but the layer is not installed
    #[error("Validation layer {0} requested but not available")]
    ValidationUnavailable(String),

    #[error("No suitable GPU found")]
    NoSuitableGpu,

    /// Shader file missing or not valid SPIR-V
    #[error("Shader error: {0}")]
    ShaderError(String),

    #[error("Surface error: {0}")]
    SurfaceError(String),

    #[error("Swapchain error: {0}")]
    SwapchainError(String),

    /// Invalid buffer size or out-of-range write
    #[error("Buffer error: {0}")]
    BufferError(String),

    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

/// Result type alias for RHI operations.
pub type RhiResult<T> = std::result::Result<T, RhiError>;

impl From<RhiError> for practices_core::Error {
    fn from(err: RhiError) -> Self {
        match err {
            RhiError::ShaderError(msg) => practices_core::Error::Shader(msg),
            other => practices_core::Error::Vulkan(other.to_string()),
        }
    }
}
