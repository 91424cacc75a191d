//! Error types shared by every crate in the workspace.

use thiserror::Error;

/// Top-level error for the Vulkan practices crates.
#[derive(Error, Debug)]
pub enum Error {
    /// Vulkan call or object creation failed
    #[error("Vulkan error: {0}")]
    Vulkan(String),

    /// Window creation or handle access failed
    #[error("Window error: {0}")]
    Window(String),

    /// A file under the resource directory could not be used
    #[error("Resource error: {0}")]
    Resource(String),

    /// SPIR-V module was missing or malformed
    #[error("Shader error: {0}")]
    Shader(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be read, parsed or validated
    #[error("Config error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
