//! Application configuration.
//!
//! Configuration is read from a TOML file. Every field has a default, so a
//! missing file or a partial file is valid:
//!
//! ```toml
//! log_filter = "debug"
//!
//! [window]
//! title = "Vulkan Practices"
//! width = 1280
//! height = 720
//!
//! [renderer]
//! resource_dir = "shaders"
//! scene = "triangle"
//! animate = false
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Environment variable naming an alternative configuration file.
pub const CONFIG_ENV_VAR: &str = "VULKAN_PRACTICES_CONFIG";

/// File looked up in the working directory when [`CONFIG_ENV_VAR`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "vulkan-practices.toml";

/// Geometry drawn by the demo renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemoScene {
    /// Three vertices, non-indexed draw.
    Triangle,
    /// Four vertices and six indices.
    #[default]
    Quad,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Vulkan Practices".to_string(),
            width: 800,
            height: 600,
            resizable: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Directory holding the precompiled SPIR-V modules.
    pub resource_dir: PathBuf,
    /// Enable `VK_LAYER_KHRONOS_validation`. Creation fails if the layer is missing.
    pub enable_validation: bool,
    /// Use MAILBOX when the surface supports it, FIFO otherwise.
    pub prefer_mailbox: bool,
    pub clear_color: [f32; 4],
    pub scene: DemoScene,
    /// Rotate the model matrix over time.
    pub animate: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            resource_dir: PathBuf::from("shaders"),
            enable_validation: cfg!(debug_assertions),
            prefer_mailbox: true,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            scene: DemoScene::default(),
            animate: true,
        }
    }
}

/// Complete configuration of the application.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub renderer: RendererConfig,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
}

impl AppConfig {
    /// Loads and validates the configuration at `path`.
    ///
    /// A missing file yields the defaults. Any other read failure, a parse
    /// failure or a validation failure is an [`Error::Config`].
    pub fn load(path: &Path) -> Result<Self> {
        let config = match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                return Err(Error::Config(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Loads from [`CONFIG_ENV_VAR`] if set, otherwise [`DEFAULT_CONFIG_FILE`].
    pub fn load_default_location() -> Result<Self> {
        let path = std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load(&path)
    }

    /// Parses and validates a configuration held in memory.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config = Self::parse(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Rejects values the renderer cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(Error::Config(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }

        if self.window.title.trim().is_empty() {
            return Err(Error::Config("window title must not be empty".into()));
        }

        if let Some(c) = self
            .renderer
            .clear_color
            .iter()
            .find(|c| !(0.0..=1.0).contains(*c))
        {
            return Err(Error::Config(format!(
                "clear color components must be within [0, 1], got {}",
                c
            )));
        }

        Ok(())
    }
}
