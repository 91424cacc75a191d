//! Framebuffers over the swapchain image views.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

/// One framebuffer per swapchain image, all sharing one extent.
///
/// Extent-dependent: dropped before and rebuilt after every swapchain
/// recreation.
pub struct Framebuffers {
    device: Arc<Device>,
    framebuffers: Vec<vk::Framebuffer>,
    extent: vk::Extent2D,
}

impl Framebuffers {
    /// Creates a framebuffer for each of `image_views`.
    ///
    /// # Errors
    ///
    /// Returns an error if any framebuffer fails to create; those already
    /// created are destroyed.
    pub fn new(
        device: Arc<Device>,
        render_pass: vk::RenderPass,
        image_views: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> RhiResult<Self> {
        let mut framebuffers = Self {
            device,
            framebuffers: Vec::with_capacity(image_views.len()),
            extent,
        };

        for view in image_views {
            let attachments = [*view];
            let create_info = vk::FramebufferCreateInfo::default()
                .render_pass(render_pass)
                .attachments(&attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1);

            // SAFETY: the view belongs to the current swapchain and matches
            // the render pass format. On error `framebuffers` drops the
            // handles created so far.
            let framebuffer = unsafe {
                framebuffers
                    .device
                    .handle()
                    .create_framebuffer(&create_info, None)?
            };
            framebuffers.framebuffers.push(framebuffer);
        }

        debug!(
            "Created {} framebuffers ({}x{})",
            framebuffers.framebuffers.len(),
            extent.width,
            extent.height
        );

        Ok(framebuffers)
    }

    /// Framebuffer for swapchain image `image_index`.
    #[inline]
    pub fn get(&self, image_index: u32) -> Option<vk::Framebuffer> {
        self.framebuffers.get(image_index as usize).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.framebuffers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.framebuffers.is_empty()
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for Framebuffers {
    fn drop(&mut self) {
        for framebuffer in self.framebuffers.drain(..) {
            // SAFETY: the owner waits for device idle before dropping.
            unsafe {
                self.device.handle().destroy_framebuffer(framebuffer, None);
            }
        }
    }
}
