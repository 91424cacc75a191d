//! Renderer error type.

use practices_rhi::RhiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RendererError {
    #[error(transparent)]
    Rhi(#[from] RhiError),

    /// Window, surface or configuration failure
    #[error(transparent)]
    Core(#[from] practices_core::Error),

    #[error("Frame slot {0} out of range")]
    InvalidSlot(usize),

    /// Acquire returned an image with no framebuffer or semaphore
    #[error("No resources for swapchain image {0}")]
    MissingImageResource(u32),
}

pub type RendererResult<T> = std::result::Result<T, RendererError>;

impl From<RendererError> for practices_core::Error {
    fn from(err: RendererError) -> Self {
        match err {
            RendererError::Rhi(e) => e.into(),
            RendererError::Core(e) => e,
            other => practices_core::Error::Internal(other.to_string()),
        }
    }
}
