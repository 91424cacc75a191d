//! Headless Vulkan setup for tests that need a real device.
//!
//! [`headless_gpu`] returns `None` when there is no Vulkan loader or no GPU
//! with a graphics queue and the swapchain extension; tests return early in
//! that case. No surface is created, so the graphics family doubles as the
//! present family.

use std::sync::Arc;

use ash::vk;

use crate::device::Device;
use crate::instance::Instance;
use crate::physical_device::{PhysicalDeviceInfo, find_queue_families, missing_extension};

/// Device, selected GPU and instance. Fields drop in that order.
pub struct HeadlessGpu {
    pub device: Arc<Device>,
    pub info: PhysicalDeviceInfo,
    pub instance: Instance,
}

pub fn headless_gpu() -> Option<HeadlessGpu> {
    let instance = match Instance::new(c"practices headless test", false, &[]) {
        Ok(instance) => instance,
        Err(e) => {
            eprintln!("Skipping test: Vulkan not available ({})", e);
            return None;
        }
    };

    let Some(info) = pick_device(instance.handle()) else {
        eprintln!("Skipping test: no GPU with graphics and swapchain support");
        return None;
    };

    match Device::new(&instance, &info) {
        Ok(device) => Some(HeadlessGpu {
            device,
            info,
            instance,
        }),
        Err(e) => {
            eprintln!("Skipping test: device creation failed ({})", e);
            None
        }
    }
}

fn pick_device(instance: &ash::Instance) -> Option<PhysicalDeviceInfo> {
    // SAFETY: the instance is valid for the duration of these queries.
    let devices = unsafe { instance.enumerate_physical_devices().ok()? };

    devices.into_iter().find_map(|device| {
        let properties = unsafe { instance.get_physical_device_properties(device) };
        let families = unsafe { instance.get_physical_device_queue_family_properties(device) };

        let queue_families = find_queue_families(&families, |index| {
            families[index as usize]
                .queue_flags
                .contains(vk::QueueFlags::GRAPHICS)
        });
        if !queue_families.is_complete() {
            return None;
        }

        let extensions = unsafe {
            instance
                .enumerate_device_extension_properties(device)
                .unwrap_or_default()
        };
        let available: Vec<_> = extensions
            .iter()
            .filter_map(|ext| ext.extension_name_as_c_str().ok())
            .collect();
        if missing_extension(&available).is_some() {
            return None;
        }

        Some(PhysicalDeviceInfo {
            device,
            properties,
            queue_families,
        })
    })
}
