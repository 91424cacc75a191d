//! Swapchain management.
//!
//! [`Swapchain`] owns the `VkSwapchainKHR` and one image view per swapchain
//! image. It is the only extent-dependent object in this crate besides the
//! framebuffers built on top of its views.
//!
//! Acquire and present translate the two recoverable result codes
//! (`ERROR_OUT_OF_DATE_KHR`, `SUBOPTIMAL_KHR`) into [`AcquireOutcome`] and
//! [`PresentOutcome`]; every other failure is an [`RhiError`].
//!
//! # Example
//!
//! ```no_run
//! use practices_rhi::swapchain::{AcquireOutcome, Swapchain};
//! # use practices_rhi::vk;
//!
//! # fn example(swapchain: &Swapchain, image_available: vk::Semaphore) -> practices_rhi::RhiResult<()> {
//! match swapchain.acquire_next_image(image_available)? {
//!     AcquireOutcome::Acquired { image_index, .. } => {
//!         // record and submit work for swapchain.image_views()[image_index as usize]
//!     }
//!     AcquireOutcome::OutOfDate => {
//!         // rebuild the swapchain before drawing again
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info, warn};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::instance::Instance;

/// Result of asking the swapchain for the next image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image was acquired; its semaphore will be signaled.
    ///
    /// `suboptimal` means the swapchain still works but no longer matches the
    /// surface exactly.
    Acquired { image_index: u32, suboptimal: bool },
    /// The swapchain can no longer present to the surface.
    OutOfDate,
}

/// Result of queueing an image for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    Suboptimal,
    OutOfDate,
}

impl PresentOutcome {
    /// Whether the swapchain should be rebuilt after this present.
    #[inline]
    pub fn needs_recreate(self) -> bool {
        !matches!(self, PresentOutcome::Presented)
    }
}

/// Maps the raw result of `vkAcquireNextImageKHR`.
pub fn classify_acquire(result: Result<(u32, bool), vk::Result>) -> RhiResult<AcquireOutcome> {
    match result {
        Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Acquired {
            image_index,
            suboptimal,
        }),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
        Err(e) => Err(RhiError::VulkanError(e)),
    }
}

/// Maps the raw result of `vkQueuePresentKHR`.
pub fn classify_present(result: Result<bool, vk::Result>) -> RhiResult<PresentOutcome> {
    match result {
        Ok(false) => Ok(PresentOutcome::Presented),
        Ok(true) | Err(vk::Result::SUBOPTIMAL_KHR) => Ok(PresentOutcome::Suboptimal),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
        Err(e) => Err(RhiError::VulkanError(e)),
    }
}

/// Surface support for a physical device.
#[derive(Debug, Clone)]
pub struct SwapchainSupportDetails {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupportDetails {
    /// Queries the surface capabilities, formats and present modes.
    ///
    /// Must be re-run before every swapchain (re)creation: the capabilities,
    /// `current_extent` in particular, change with the window.
    pub fn query(
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
    ) -> RhiResult<Self> {
        // SAFETY: the surface and physical device come from the same instance
        // as the loader.
        let (capabilities, formats, present_modes) = unsafe {
            (
                surface_loader.get_physical_device_surface_capabilities(physical_device, surface)?,
                surface_loader.get_physical_device_surface_formats(physical_device, surface)?,
                surface_loader
                    .get_physical_device_surface_present_modes(physical_device, surface)?,
            )
        };

        debug!(
            "Swapchain support: {} formats, {} present modes, image count: {}-{}",
            formats.len(),
            present_modes.len(),
            capabilities.min_image_count,
            if capabilities.max_image_count == 0 {
                "unlimited".to_string()
            } else {
                capabilities.max_image_count.to_string()
            }
        );

        Ok(Self {
            capabilities,
            formats,
            present_modes,
        })
    }

    #[inline]
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// The handles produced by one swapchain build.
struct SwapchainParts {
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    format: vk::Format,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
}

/// Owns the swapchain and its image views.
pub struct Swapchain {
    device: Arc<Device>,
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    format: vk::Format,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
    prefer_mailbox: bool,
}

impl Swapchain {
    /// Creates a swapchain sized for a `width` x `height` drawable.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface reports no formats or present modes,
    /// or if swapchain or image view creation fails.
    pub fn new(
        instance: &Instance,
        device: Arc<Device>,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
        (width, height): (u32, u32),
        prefer_mailbox: bool,
    ) -> RhiResult<Self> {
        let swapchain_loader = ash::khr::swapchain::Device::new(instance.handle(), device.handle());

        let support =
            SwapchainSupportDetails::query(device.physical_device(), surface, surface_loader)?;
        let parts = build_swapchain(
            &device,
            &swapchain_loader,
            surface,
            &support,
            (width, height),
            prefer_mailbox,
            vk::SwapchainKHR::null(),
        )?;

        Ok(Self {
            device,
            swapchain_loader,
            swapchain: parts.swapchain,
            images: parts.images,
            image_views: parts.image_views,
            format: parts.format,
            extent: parts.extent,
            present_mode: parts.present_mode,
            prefer_mailbox,
        })
    }

    /// Rebuilds the swapchain for a new drawable size.
    ///
    /// Waits for the device to go idle, destroys the image views, re-queries
    /// surface support and only then creates the replacement (passing the old
    /// handle as `old_swapchain`) before destroying the old swapchain. Any
    /// framebuffers over the old views must already be destroyed.
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails. The old swapchain is still owned in
    /// that case and is destroyed on drop.
    pub fn recreate(
        &mut self,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
        (width, height): (u32, u32),
    ) -> RhiResult<()> {
        self.device.wait_idle()?;

        self.destroy_image_views();

        let support =
            SwapchainSupportDetails::query(self.device.physical_device(), surface, surface_loader)?;
        let parts = build_swapchain(
            &self.device,
            &self.swapchain_loader,
            surface,
            &support,
            (width, height),
            self.prefer_mailbox,
            self.swapchain,
        )?;

        // SAFETY: the device is idle and the retired swapchain has no views left.
        unsafe {
            self.swapchain_loader
                .destroy_swapchain(self.swapchain, None);
        }

        self.swapchain = parts.swapchain;
        self.images = parts.images;
        self.image_views = parts.image_views;
        self.format = parts.format;
        self.extent = parts.extent;
        self.present_mode = parts.present_mode;

        info!(
            "Swapchain recreated: {}x{}, {} images",
            self.extent.width,
            self.extent.height,
            self.images.len()
        );

        Ok(())
    }

    /// Acquires the next image, signaling `semaphore` when it is ready.
    ///
    /// Blocks without a timeout.
    pub fn acquire_next_image(&self, semaphore: vk::Semaphore) -> RhiResult<AcquireOutcome> {
        // SAFETY: the swapchain and semaphore are valid; the semaphore has no
        // pending signal because its previous wait was submitted.
        let result = unsafe {
            self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                semaphore,
                vk::Fence::null(),
            )
        };
        classify_acquire(result)
    }

    /// Queues `image_index` for presentation after `wait_semaphore`.
    pub fn present(
        &self,
        queue: vk::Queue,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> RhiResult<PresentOutcome> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [wait_semaphore];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        // SAFETY: image_index was acquired from this swapchain.
        let result = unsafe { self.swapchain_loader.queue_present(queue, &present_info) };
        classify_present(result)
    }

    #[inline]
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    #[inline]
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    #[inline]
    pub fn image_count(&self) -> u32 {
        self.images.len() as u32
    }

    #[inline]
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    fn destroy_image_views(&mut self) {
        for image_view in self.image_views.drain(..) {
            // SAFETY: callers guarantee no pending work uses the views.
            unsafe {
                self.device.handle().destroy_image_view(image_view, None);
            }
        }
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        self.destroy_image_views();

        // SAFETY: the owner waits for device idle before dropping.
        unsafe {
            self.swapchain_loader
                .destroy_swapchain(self.swapchain, None);
        }

        info!(
            "Swapchain destroyed (was {}x{}, {} images)",
            self.extent.width,
            self.extent.height,
            self.images.len()
        );
    }
}

fn build_swapchain(
    device: &Device,
    swapchain_loader: &ash::khr::swapchain::Device,
    surface: vk::SurfaceKHR,
    support: &SwapchainSupportDetails,
    (width, height): (u32, u32),
    prefer_mailbox: bool,
    old_swapchain: vk::SwapchainKHR,
) -> RhiResult<SwapchainParts> {
    let Some(surface_format) = choose_surface_format(&support.formats) else {
        return Err(RhiError::SwapchainError(
            "Surface reports no formats".to_string(),
        ));
    };
    if support.present_modes.is_empty() {
        return Err(RhiError::SwapchainError(
            "Surface reports no present modes".to_string(),
        ));
    }

    let present_mode = choose_present_mode(&support.present_modes, prefer_mailbox);
    let extent = choose_extent(&support.capabilities, width, height);
    let image_count = determine_image_count(&support.capabilities);

    info!(
        "Creating swapchain: {}x{}, format {:?}, present mode {:?}, {} images",
        extent.width, extent.height, surface_format.format, present_mode, image_count
    );

    let queue_families = device.queue_families();
    let families: Vec<u32> = queue_families.unique_families();
    let sharing_mode = if families.len() > 1 {
        debug!("Using CONCURRENT sharing between families {:?}", families);
        vk::SharingMode::CONCURRENT
    } else {
        vk::SharingMode::EXCLUSIVE
    };
    let shared_families: &[u32] = if families.len() > 1 { &families } else { &[] };

    let create_info = vk::SwapchainCreateInfoKHR::default()
        .surface(surface)
        .min_image_count(image_count)
        .image_format(surface_format.format)
        .image_color_space(surface_format.color_space)
        .image_extent(extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
        .image_sharing_mode(sharing_mode)
        .queue_family_indices(shared_families)
        .pre_transform(support.capabilities.current_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(present_mode)
        .clipped(true)
        .old_swapchain(old_swapchain);

    // SAFETY: create_info references only locals and a surface owned by the
    // caller; old_swapchain is either null or a live swapchain of this surface.
    let swapchain = unsafe { swapchain_loader.create_swapchain(&create_info, None)? };

    let images = match unsafe { swapchain_loader.get_swapchain_images(swapchain) } {
        Ok(images) => images,
        Err(e) => {
            unsafe { swapchain_loader.destroy_swapchain(swapchain, None) };
            return Err(e.into());
        }
    };

    let image_views = match create_image_views(device, &images, surface_format.format) {
        Ok(views) => views,
        Err(e) => {
            unsafe { swapchain_loader.destroy_swapchain(swapchain, None) };
            return Err(e);
        }
    };

    Ok(SwapchainParts {
        swapchain,
        images,
        image_views,
        format: surface_format.format,
        extent,
        present_mode,
    })
}

/// B8G8R8A8_SRGB/SRGB_NONLINEAR, then B8G8R8A8_UNORM, then the first format.
fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    let find = |format: vk::Format| {
        formats
            .iter()
            .find(|f| f.format == format && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
            .copied()
    };

    if let Some(format) = find(vk::Format::B8G8R8A8_SRGB) {
        return Some(format);
    }

    if let Some(format) = find(vk::Format::B8G8R8A8_UNORM) {
        warn!("Using fallback surface format: B8G8R8A8_UNORM with SRGB_NONLINEAR");
        return Some(format);
    }

    let first = formats.first().copied();
    if let Some(format) = first {
        warn!("Using first available surface format: {:?}", format.format);
    }
    first
}

/// FIFO is always available, so it is the fallback.
fn choose_present_mode(
    present_modes: &[vk::PresentModeKHR],
    prefer_mailbox: bool,
) -> vk::PresentModeKHR {
    if prefer_mailbox && present_modes.contains(&vk::PresentModeKHR::MAILBOX) {
        return vk::PresentModeKHR::MAILBOX;
    }
    vk::PresentModeKHR::FIFO
}

fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    // The surface lets the swapchain decide; clamp the drawable size.
    vk::Extent2D {
        width: width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

fn determine_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let preferred = capabilities.min_image_count + 1;

    // max_image_count == 0 means no limit
    if capabilities.max_image_count > 0 {
        preferred.min(capabilities.max_image_count)
    } else {
        preferred
    }
}

fn create_image_views(
    device: &Device,
    images: &[vk::Image],
    format: vk::Format,
) -> RhiResult<Vec<vk::ImageView>> {
    let mut image_views = Vec::with_capacity(images.len());

    for (i, &image) in images.iter().enumerate() {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping::default())
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .level_count(1)
                    .layer_count(1),
            );

        // SAFETY: image belongs to a live swapchain of this device.
        match unsafe { device.handle().create_image_view(&create_info, None) } {
            Ok(view) => image_views.push(view),
            Err(e) => {
                for view in image_views {
                    unsafe { device.handle().destroy_image_view(view, None) };
                }
                return Err(RhiError::SwapchainError(format!(
                    "Failed to create image view {}: {:?}",
                    i, e
                )));
            }
        }
    }

    debug!("Created {} image views", image_views.len());
    Ok(image_views)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(format: vk::Format) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }
    }

    fn capabilities(current: (u32, u32)) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: current.0,
                height: current.1,
            },
            min_image_extent: vk::Extent2D {
                width: 100,
                height: 100,
            },
            max_image_extent: vk::Extent2D {
                width: 2000,
                height: 2000,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_choose_surface_format_prefers_srgb() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM),
            format(vk::Format::B8G8R8A8_UNORM),
            format(vk::Format::B8G8R8A8_SRGB),
        ];
        let selected = choose_surface_format(&formats).unwrap();
        assert_eq!(selected.format, vk::Format::B8G8R8A8_SRGB);
    }

    #[test]
    fn test_choose_surface_format_fallbacks() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM),
            format(vk::Format::B8G8R8A8_UNORM),
        ];
        assert_eq!(
            choose_surface_format(&formats).unwrap().format,
            vk::Format::B8G8R8A8_UNORM
        );

        let formats = [format(vk::Format::R16G16B16A16_SFLOAT)];
        assert_eq!(
            choose_surface_format(&formats).unwrap().format,
            vk::Format::R16G16B16A16_SFLOAT
        );

        assert!(choose_surface_format(&[]).is_none());
    }

    #[test]
    fn test_srgb_format_needs_srgb_color_space() {
        let formats = [
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT,
            },
            format(vk::Format::B8G8R8A8_UNORM),
        ];
        assert_eq!(
            choose_surface_format(&formats).unwrap().format,
            vk::Format::B8G8R8A8_UNORM
        );
    }

    #[test]
    fn test_choose_present_mode() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(choose_present_mode(&modes, true), vk::PresentModeKHR::MAILBOX);
        assert_eq!(choose_present_mode(&modes, false), vk::PresentModeKHR::FIFO);
        assert_eq!(
            choose_present_mode(&[vk::PresentModeKHR::FIFO], true),
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn test_choose_extent_uses_current() {
        let extent = choose_extent(&capabilities((1920, 1080)), 800, 600);
        assert_eq!((extent.width, extent.height), (1920, 1080));
    }

    #[test]
    fn test_choose_extent_clamps_to_limits() {
        let caps = capabilities((u32::MAX, u32::MAX));

        let extent = choose_extent(&caps, 3000, 3000);
        assert_eq!((extent.width, extent.height), (2000, 2000));

        let extent = choose_extent(&caps, 50, 50);
        assert_eq!((extent.width, extent.height), (100, 100));

        let extent = choose_extent(&caps, 800, 600);
        assert_eq!((extent.width, extent.height), (800, 600));
    }

    #[test]
    fn test_determine_image_count() {
        let mut caps = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 2,
            ..Default::default()
        };
        assert_eq!(determine_image_count(&caps), 2);

        caps.max_image_count = 8;
        assert_eq!(determine_image_count(&caps), 3);

        caps.max_image_count = 0;
        assert_eq!(determine_image_count(&caps), 3);
    }

    #[test]
    fn test_swapchain_support_details_is_adequate() {
        let mut support = SwapchainSupportDetails {
            capabilities: vk::SurfaceCapabilitiesKHR::default(),
            formats: vec![vk::SurfaceFormatKHR::default()],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        };
        assert!(support.is_adequate());

        support.present_modes.clear();
        assert!(!support.is_adequate());

        support.present_modes.push(vk::PresentModeKHR::FIFO);
        support.formats.clear();
        assert!(!support.is_adequate());
    }

    #[test]
    fn test_classify_acquire() {
        assert_eq!(
            classify_acquire(Ok((2, false))).unwrap(),
            AcquireOutcome::Acquired {
                image_index: 2,
                suboptimal: false
            }
        );
        assert_eq!(
            classify_acquire(Ok((0, true))).unwrap(),
            AcquireOutcome::Acquired {
                image_index: 0,
                suboptimal: true
            }
        );
        assert_eq!(
            classify_acquire(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)).unwrap(),
            AcquireOutcome::OutOfDate
        );
        assert!(matches!(
            classify_acquire(Err(vk::Result::ERROR_DEVICE_LOST)),
            Err(RhiError::VulkanError(vk::Result::ERROR_DEVICE_LOST))
        ));
    }

    #[test]
    fn test_classify_present() {
        assert_eq!(classify_present(Ok(false)).unwrap(), PresentOutcome::Presented);
        assert_eq!(classify_present(Ok(true)).unwrap(), PresentOutcome::Suboptimal);
        assert_eq!(
            classify_present(Err(vk::Result::SUBOPTIMAL_KHR)).unwrap(),
            PresentOutcome::Suboptimal
        );
        assert_eq!(
            classify_present(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)).unwrap(),
            PresentOutcome::OutOfDate
        );
        assert!(classify_present(Err(vk::Result::ERROR_SURFACE_LOST_KHR)).is_err());
    }

    #[test]
    fn test_needs_recreate() {
        assert!(!PresentOutcome::Presented.needs_recreate());
        assert!(PresentOutcome::Suboptimal.needs_recreate());
        assert!(PresentOutcome::OutOfDate.needs_recreate());
    }
}
