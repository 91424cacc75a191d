//! Owning wrappers for Vulkan synchronization objects.
//!
//! - [`Semaphore`] orders queue operations on the GPU (acquire → render → present).
//! - [`Fence`] lets the CPU wait for submitted work to complete.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use practices_rhi::device::Device;
//! use practices_rhi::sync::{Fence, Semaphore};
//!
//! # fn example(device: Arc<Device>) -> Result<(), practices_rhi::RhiError> {
//! let image_available = Semaphore::new(device.clone())?;
//!
//! // Created signaled so the first wait of a frame slot returns immediately
//! let in_flight = Fence::new(device.clone(), true)?;
//! in_flight.wait(u64::MAX)?;
//! in_flight.reset()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

/// GPU-to-GPU synchronization primitive. Destroyed on drop.
pub struct Semaphore {
    device: Arc<Device>,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Creates a binary semaphore.
    ///
    /// # Errors
    ///
    /// Returns an error if semaphore creation fails.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::default();

        // SAFETY: the device is valid and create_info is well-formed.
        let semaphore = unsafe { device.handle().create_semaphore(&create_info, None)? };

        debug!("Created semaphore");

        Ok(Self { device, semaphore })
    }

    #[inline]
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        // SAFETY: owners drop semaphores only after the device is idle.
        unsafe {
            self.device.handle().destroy_semaphore(self.semaphore, None);
        }
    }
}

/// GPU-to-CPU synchronization primitive. Destroyed on drop.
pub struct Fence {
    device: Arc<Device>,
    fence: vk::Fence,
}

impl Fence {
    /// Creates a fence, optionally in the signaled state.
    ///
    /// Per-frame fences start signaled so the first wait does not block.
    ///
    /// # Errors
    ///
    /// Returns an error if fence creation fails.
    pub fn new(device: Arc<Device>, signaled: bool) -> RhiResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };

        let create_info = vk::FenceCreateInfo::default().flags(flags);

        // SAFETY: the device is valid and create_info is well-formed.
        let fence = unsafe { device.handle().create_fence(&create_info, None)? };

        debug!(
            "Created fence ({})",
            if signaled { "signaled" } else { "unsignaled" }
        );

        Ok(Self { device, fence })
    }

    #[inline]
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }

    /// Blocks until the fence is signaled or `timeout` nanoseconds pass.
    ///
    /// # Errors
    ///
    /// Returns `VulkanError(TIMEOUT)` on timeout, or device loss errors.
    pub fn wait(&self, timeout: u64) -> RhiResult<()> {
        // SAFETY: the fence belongs to this device.
        unsafe {
            self.device
                .handle()
                .wait_for_fences(&[self.fence], true, timeout)?
        };
        Ok(())
    }

    /// Returns the fence to the unsignaled state.
    ///
    /// Only call this once work that will signal it is about to be submitted.
    pub fn reset(&self) -> RhiResult<()> {
        // SAFETY: callers reset only after a completed wait, so the fence is
        // not in use by a pending submission.
        unsafe { self.device.handle().reset_fences(&[self.fence])? };
        Ok(())
    }

    /// Non-blocking status query. Device loss reads as unsignaled.
    pub fn is_signaled(&self) -> bool {
        // SAFETY: the fence belongs to this device.
        let result = unsafe { self.device.handle().get_fence_status(self.fence) };
        matches!(result, Ok(true))
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        // SAFETY: owners drop fences only after the device is idle.
        unsafe {
            self.device.handle().destroy_fence(self.fence, None);
        }
    }
}
