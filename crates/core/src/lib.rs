//! Core utilities for the Vulkan practices renderer.
//!
//! This crate provides foundational types used across the workspace:
//! - Error types and result aliases
//! - Logging initialization
//! - Timer utilities
//! - Configuration loading

pub mod config;
mod error;
mod logging;
mod timer;

pub use config::{AppConfig, DemoScene, RendererConfig, WindowConfig};
pub use error::{Error, Result};
pub use logging::{DEFAULT_LOG_FILTER, init_logging, init_logging_with};
pub use timer::Timer;
