//! Shader module loading.
//!
//! Shaders are compiled offline to SPIR-V and read from a resource directory
//! at startup. A missing or malformed module is fatal to renderer creation.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use practices_rhi::device::Device;
//! use practices_rhi::shader::{Shader, ShaderStage};
//!
//! # fn example(device: Arc<Device>) -> Result<(), practices_rhi::RhiError> {
//! let vertex = Shader::from_resource(
//!     device.clone(),
//!     Path::new("shaders"),
//!     "shader.vert.spv",
//!     ShaderStage::Vertex,
//! )?;
//! let _stage_info = vertex.stage_create_info();
//! # Ok(())
//! # }
//! ```

use std::ffi::CStr;
use std::path::Path;
use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Pipeline stage a module is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn to_vk_stage(self) -> vk::ShaderStageFlags {
        match self {
            ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Reads `name` from the resource directory `dir` as raw bytes.
///
/// # Errors
///
/// Returns `ShaderError("failed to open file: ...")` naming the full path.
pub fn read_resource(dir: &Path, name: &str) -> RhiResult<Vec<u8>> {
    let path = dir.join(name);
    std::fs::read(&path).map_err(|e| {
        RhiError::ShaderError(format!("failed to open file: {} ({})", path.display(), e))
    })
}

/// Decodes SPIR-V bytes into little-endian words and checks the header.
pub fn spirv_words(bytes: &[u8]) -> RhiResult<Vec<u32>> {
    if bytes.is_empty() || !bytes.len().is_multiple_of(4) {
        return Err(RhiError::ShaderError(format!(
            "SPIR-V code must be a non-empty multiple of 4 bytes, got {} bytes",
            bytes.len()
        )));
    }

    let words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    if words[0] != SPIRV_MAGIC {
        return Err(RhiError::ShaderError(format!(
            "bad SPIR-V magic number {:#010x}",
            words[0]
        )));
    }

    Ok(words)
}

/// Owns a `VkShaderModule`. Only needed until the pipeline is built.
pub struct Shader {
    device: Arc<Device>,
    module: vk::ShaderModule,
    stage: ShaderStage,
}

impl Shader {
    /// Entry point used by every module.
    pub const ENTRY_POINT: &'static CStr = c"main";

    /// Loads `name` from the resource directory `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not SPIR-V, or module
    /// creation fails.
    pub fn from_resource(
        device: Arc<Device>,
        dir: &Path,
        name: &str,
        stage: ShaderStage,
    ) -> RhiResult<Self> {
        debug!("Loading {} shader {} from {}", stage, name, dir.display());
        let bytes = read_resource(dir, name)?;
        Self::from_spirv_bytes(device, &bytes, stage)
    }

    /// Creates a module from SPIR-V bytes.
    pub fn from_spirv_bytes(device: Arc<Device>, bytes: &[u8], stage: ShaderStage) -> RhiResult<Self> {
        let code = spirv_words(bytes)?;
        let create_info = vk::ShaderModuleCreateInfo::default().code(&code);

        // SAFETY: code is aligned, non-empty and starts with the SPIR-V magic.
        let module = unsafe { device.handle().create_shader_module(&create_info, None)? };

        info!("Created {} shader module ({} words)", stage, code.len());

        Ok(Self {
            device,
            module,
            stage,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    #[inline]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn stage_create_info(&self) -> vk::PipelineShaderStageCreateInfo<'static> {
        vk::PipelineShaderStageCreateInfo::default()
            .stage(self.stage.to_vk_stage())
            .module(self.module)
            .name(Self::ENTRY_POINT)
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        // SAFETY: modules may be destroyed once pipeline creation returned.
        unsafe {
            self.device
                .handle()
                .destroy_shader_module(self.module, None);
        }
        debug!("Destroyed {} shader module", self.stage);
    }
}
