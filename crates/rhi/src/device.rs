//! Vulkan logical device and queue management.
//!
//! [`Device`] owns the `VkDevice`, its graphics and present queues and the
//! `gpu-allocator` allocator every buffer draws from. Higher-level wrappers
//! hold an `Arc<Device>` so the device is destroyed only after all of them.
//!
//! # Example
//!
//! ```no_run
//! use practices_rhi::device::Device;
//! use practices_rhi::instance::Instance;
//! use practices_rhi::physical_device::PhysicalDeviceInfo;
//!
//! # fn example(instance: &Instance, gpu: &PhysicalDeviceInfo) -> practices_rhi::RhiResult<()> {
//! let device = Device::new(instance, gpu)?;
//! let graphics_queue = device.graphics_queue();
//! device.wait_idle()?;
//! # Ok(())
//! # }
//! ```

use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex, MutexGuard};

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use tracing::{debug, info};

use crate::error::{RhiError, RhiResult};
use crate::instance::Instance;
use crate::physical_device::{PhysicalDeviceInfo, QueueFamilyIndices, REQUIRED_DEVICE_EXTENSIONS};

/// Logical device plus its queues and memory allocator.
pub struct Device {
    device: ash::Device,
    physical_device: vk::PhysicalDevice,
    /// Dropped by hand before the device is destroyed.
    allocator: ManuallyDrop<Mutex<Allocator>>,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    graphics_family: u32,
    queue_families: QueueFamilyIndices,
}

impl Device {
    /// Creates the logical device on the selected GPU.
    ///
    /// One queue is created per unique family in `gpu.queue_families`, and
    /// only the swapchain extension is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue families are incomplete, device creation
    /// fails, or the allocator cannot be initialized.
    pub fn new(instance: &Instance, gpu: &PhysicalDeviceInfo) -> RhiResult<Arc<Self>> {
        let queue_families = gpu.queue_families;
        let (Some(graphics_family), Some(present_family)) =
            (queue_families.graphics_family, queue_families.present_family)
        else {
            return Err(RhiError::NoSuitableGpu);
        };

        let unique_families = queue_families.unique_families();
        let queue_priorities = [1.0f32];

        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
            })
            .collect();

        debug!(
            "Creating {} queue(s) for families: {:?}",
            queue_create_infos.len(),
            unique_families
        );

        let features = vk::PhysicalDeviceFeatures::default();

        let extension_names: Vec<*const std::ffi::c_char> = REQUIRED_DEVICE_EXTENSIONS
            .iter()
            .map(|ext| ext.as_ptr())
            .collect();

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names)
            .enabled_features(&features);

        // SAFETY: the physical device was selected from this instance and
        // create_info only references locals alive for this call.
        let device = unsafe {
            instance
                .handle()
                .create_device(gpu.device, &create_info, None)?
        };

        info!(
            "Logical device created with {} extension(s)",
            REQUIRED_DEVICE_EXTENSIONS.len()
        );

        // SAFETY: both families were requested with one queue each.
        let graphics_queue = unsafe { device.get_device_queue(graphics_family, 0) };
        let present_queue = unsafe { device.get_device_queue(present_family, 0) };
        debug!(
            "Queues retrieved: graphics family {}, present family {}",
            graphics_family, present_family
        );

        let allocator = match Allocator::new(&AllocatorCreateDesc {
            instance: instance.handle().clone(),
            device: device.clone(),
            physical_device: gpu.device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        }) {
            Ok(allocator) => allocator,
            Err(e) => {
                // SAFETY: nothing has been created from the device yet.
                unsafe { device.destroy_device(None) };
                return Err(e.into());
            }
        };

        info!("GPU memory allocator initialized");

        Ok(Arc::new(Self {
            device,
            physical_device: gpu.device,
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            graphics_queue,
            present_queue,
            graphics_family,
            queue_families,
        }))
    }

    #[inline]
    pub fn handle(&self) -> &ash::Device {
        &self.device
    }

    #[inline]
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    #[inline]
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    #[inline]
    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    #[inline]
    pub fn queue_families(&self) -> &QueueFamilyIndices {
        &self.queue_families
    }

    /// Family the command pools are created for.
    #[inline]
    pub fn graphics_family(&self) -> u32 {
        self.graphics_family
    }

    /// Locks the memory allocator.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::AllocatorPoisoned`] if a previous holder panicked.
    pub fn allocator(&self) -> RhiResult<MutexGuard<'_, Allocator>> {
        self.allocator.lock().map_err(|_| RhiError::AllocatorPoisoned)
    }

    /// Blocks until all queues are idle.
    pub fn wait_idle(&self) -> RhiResult<()> {
        // SAFETY: the device is valid; no queue is accessed concurrently.
        unsafe { self.device.device_wait_idle()? };
        Ok(())
    }

    /// Submits work to the graphics queue.
    ///
    /// # Safety
    ///
    /// Every handle referenced by `submit_infos` must be valid, and `fence`
    /// must be unsignaled and not part of another pending submission.
    pub unsafe fn submit_graphics(
        &self,
        submit_infos: &[vk::SubmitInfo<'_>],
        fence: vk::Fence,
    ) -> RhiResult<()> {
        unsafe {
            self.device
                .queue_submit(self.graphics_queue, submit_infos, fence)?;
        }
        Ok(())
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        // SAFETY: every wrapper holding an Arc<Device> has been dropped, so no
        // allocation or child object remains. The allocator must go first
        // because it frees its memory blocks through the device.
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                tracing::error!("Failed to wait for device idle during drop: {:?}", e);
            }

            ManuallyDrop::drop(&mut self.allocator);
            self.device.destroy_device(None);
        }
        info!("Logical device destroyed");
    }
}

// SAFETY: ash::Device is Send + Sync, queues and the physical device are plain
// handles, and the allocator is behind a Mutex.
unsafe impl Send for Device {}
unsafe impl Sync for Device {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::headless_gpu;

    #[test]
    fn test_only_swapchain_extension_required() {
        assert_eq!(REQUIRED_DEVICE_EXTENSIONS, [ash::khr::swapchain::NAME]);
    }

    #[test]
    fn test_device_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Device>();
    }

    #[test]
    fn test_headless_device_queues() {
        let Some(gpu) = headless_gpu() else {
            return;
        };
        let device = &gpu.device;

        assert_eq!(device.queue_families(), &gpu.info.queue_families);
        assert_eq!(Some(device.graphics_family()), gpu.info.queue_families.graphics_family);
        assert_ne!(device.graphics_queue(), vk::Queue::null());
        assert_ne!(device.present_queue(), vk::Queue::null());
        assert!(device.allocator().is_ok());
        device.wait_idle().unwrap();
    }
}
