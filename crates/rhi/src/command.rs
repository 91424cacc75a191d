//! Command pool and command buffer management.
//!
//! - [`CommandPool`] owns a `VkCommandPool` for one queue family.
//! - [`CommandBuffer`] owns one primary command buffer allocated from a pool
//!   and frees it on drop; the pool must outlive it.
//! - [`submit_one_time`] runs a synchronous allocate → record → submit →
//!   wait-idle → free cycle for startup uploads.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use practices_rhi::command::{CommandBuffer, CommandPool};
//! use practices_rhi::device::Device;
//!
//! # fn example(device: Arc<Device>) -> Result<(), practices_rhi::RhiError> {
//! let pool = CommandPool::new(device.clone(), device.graphics_family())?;
//! let cmd = CommandBuffer::new(device.clone(), &pool)?;
//!
//! cmd.begin()?;
//! // ... record rendering commands ...
//! cmd.end()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Owns a command pool whose buffers can be reset individually.
pub struct CommandPool {
    device: Arc<Device>,
    pool: vk::CommandPool,
    queue_family_index: u32,
}

impl CommandPool {
    /// Creates a pool with `RESET_COMMAND_BUFFER` so per-frame buffers can be
    /// re-recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if command pool creation fails.
    pub fn new(device: Arc<Device>, queue_family_index: u32) -> RhiResult<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family_index)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        // SAFETY: the queue family index comes from the device's own families.
        let pool = unsafe { device.handle().create_command_pool(&create_info, None)? };

        info!(
            "Command pool created for queue family {}",
            queue_family_index
        );

        Ok(Self {
            device,
            pool,
            queue_family_index,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    fn allocate_primary(&self) -> RhiResult<vk::CommandBuffer> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        // SAFETY: the pool is valid and only used from the render thread.
        let buffers = unsafe { self.device.handle().allocate_command_buffers(&alloc_info)? };
        buffers
            .into_iter()
            .next()
            .ok_or(RhiError::VulkanError(vk::Result::ERROR_UNKNOWN))
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        // SAFETY: all buffers from this pool have been freed or are no longer
        // pending; the owner waits for device idle first.
        unsafe {
            self.device.handle().destroy_command_pool(self.pool, None);
        }
        info!(
            "Command pool destroyed for queue family {}",
            self.queue_family_index
        );
    }
}

/// A primary command buffer. Freed back to its pool on drop.
pub struct CommandBuffer {
    device: Arc<Device>,
    pool: vk::CommandPool,
    buffer: vk::CommandBuffer,
}

impl CommandBuffer {
    /// Allocates a primary command buffer from `pool`.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails.
    pub fn new(device: Arc<Device>, pool: &CommandPool) -> RhiResult<Self> {
        let buffer = pool.allocate_primary()?;
        Ok(Self {
            device,
            pool: pool.handle(),
            buffer,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::CommandBuffer {
        self.buffer
    }

    // =========================================================================
    // Recording Control
    // =========================================================================

    /// Begins recording for a single submission.
    pub fn begin(&self) -> RhiResult<()> {
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        // SAFETY: the buffer is not pending; callers wait on its fence first.
        unsafe {
            self.device
                .handle()
                .begin_command_buffer(self.buffer, &begin_info)?;
        }

        Ok(())
    }

    pub fn end(&self) -> RhiResult<()> {
        // SAFETY: the buffer is in the recording state.
        unsafe {
            self.device.handle().end_command_buffer(self.buffer)?;
        }

        Ok(())
    }

    /// Returns the buffer to the initial state.
    pub fn reset(&self) -> RhiResult<()> {
        // SAFETY: the pool was created with RESET_COMMAND_BUFFER and the
        // buffer is not pending.
        unsafe {
            self.device
                .handle()
                .reset_command_buffer(self.buffer, vk::CommandBufferResetFlags::empty())?;
        }

        Ok(())
    }

    // =========================================================================
    // Render Pass
    // =========================================================================

    /// Begins `render_pass` on `framebuffer`, clearing the color attachment.
    pub fn begin_render_pass(
        &self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear_color: [f32; 4],
    ) {
        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue {
                float32: clear_color,
            },
        }];

        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .clear_values(&clear_values);

        // SAFETY: recording; the framebuffer is compatible with the pass.
        unsafe {
            self.device.handle().cmd_begin_render_pass(
                self.buffer,
                &begin_info,
                vk::SubpassContents::INLINE,
            );
        }
    }

    pub fn end_render_pass(&self) {
        // SAFETY: a render pass is active.
        unsafe {
            self.device.handle().cmd_end_render_pass(self.buffer);
        }
    }

    // =========================================================================
    // Binding
    // =========================================================================

    pub fn bind_pipeline(&self, bind_point: vk::PipelineBindPoint, pipeline: vk::Pipeline) {
        unsafe {
            self.device
                .handle()
                .cmd_bind_pipeline(self.buffer, bind_point, pipeline);
        }
    }

    pub fn bind_vertex_buffers(
        &self,
        first_binding: u32,
        buffers: &[vk::Buffer],
        offsets: &[vk::DeviceSize],
    ) {
        unsafe {
            self.device.handle().cmd_bind_vertex_buffers(
                self.buffer,
                first_binding,
                buffers,
                offsets,
            );
        }
    }

    pub fn bind_index_buffer(
        &self,
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        index_type: vk::IndexType,
    ) {
        unsafe {
            self.device
                .handle()
                .cmd_bind_index_buffer(self.buffer, buffer, offset, index_type);
        }
    }

    pub fn bind_descriptor_sets(
        &self,
        bind_point: vk::PipelineBindPoint,
        layout: vk::PipelineLayout,
        first_set: u32,
        descriptor_sets: &[vk::DescriptorSet],
    ) {
        unsafe {
            self.device.handle().cmd_bind_descriptor_sets(
                self.buffer,
                bind_point,
                layout,
                first_set,
                descriptor_sets,
                &[],
            );
        }
    }

    // =========================================================================
    // Dynamic State
    // =========================================================================

    pub fn set_viewport(&self, viewport: &vk::Viewport) {
        unsafe {
            self.device
                .handle()
                .cmd_set_viewport(self.buffer, 0, std::slice::from_ref(viewport));
        }
    }

    pub fn set_scissor(&self, scissor: &vk::Rect2D) {
        unsafe {
            self.device
                .handle()
                .cmd_set_scissor(self.buffer, 0, std::slice::from_ref(scissor));
        }
    }

    // =========================================================================
    // Drawing and Transfer
    // =========================================================================

    pub fn draw(&self, vertex_count: u32, instance_count: u32) {
        unsafe {
            self.device
                .handle()
                .cmd_draw(self.buffer, vertex_count, instance_count, 0, 0);
        }
    }

    pub fn draw_indexed(&self, index_count: u32, instance_count: u32) {
        unsafe {
            self.device
                .handle()
                .cmd_draw_indexed(self.buffer, index_count, instance_count, 0, 0, 0);
        }
    }

    /// Copies `size` bytes from the start of `src` to the start of `dst`.
    pub fn copy_buffer(&self, src: vk::Buffer, dst: vk::Buffer, size: vk::DeviceSize) {
        let region = vk::BufferCopy::default().size(size);
        unsafe {
            self.device
                .handle()
                .cmd_copy_buffer(self.buffer, src, dst, std::slice::from_ref(&region));
        }
    }
}

impl Drop for CommandBuffer {
    fn drop(&mut self) {
        // SAFETY: the buffer is not pending (fence waited or queue idle) and
        // its pool is still alive.
        unsafe {
            self.device
                .handle()
                .free_command_buffers(self.pool, &[self.buffer]);
        }
    }
}

/// Records and runs a command buffer synchronously on `queue`.
///
/// Allocates a buffer from `pool`, lets `record` fill it, submits it, blocks
/// until the queue is idle and frees the buffer. Intended for startup uploads
/// only: nothing else can overlap with it.
///
/// # Errors
///
/// Returns an error if allocation, recording, submission or the idle wait
/// fails. The buffer is freed in every case.
pub fn submit_one_time<F>(
    device: &Arc<Device>,
    pool: &CommandPool,
    queue: vk::Queue,
    record: F,
) -> RhiResult<()>
where
    F: FnOnce(&CommandBuffer),
{
    let cmd = CommandBuffer::new(device.clone(), pool)?;

    cmd.begin()?;
    record(&cmd);
    cmd.end()?;

    let command_buffers = [cmd.handle()];
    let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

    // SAFETY: the buffer is fully recorded; queue belongs to this device.
    unsafe {
        device
            .handle()
            .queue_submit(queue, &[submit_info], vk::Fence::null())?;
        device.handle().queue_wait_idle(queue)?;
    }

    debug!("One-time command buffer completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::headless_gpu;

    #[test]
    fn test_command_types_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CommandPool>();
        assert_send_sync::<CommandBuffer>();
    }

    #[test]
    fn test_submit_one_time_records_then_completes() {
        let Some(gpu) = headless_gpu() else {
            return;
        };
        let device = &gpu.device;
        let pool = CommandPool::new(device.clone(), device.graphics_family()).unwrap();

        let mut recorded = false;
        submit_one_time(device, &pool, device.graphics_queue(), |cmd| {
            assert_ne!(cmd.handle(), vk::CommandBuffer::null());
            recorded = true;
        })
        .unwrap();

        assert!(recorded);
        // The queue is idle on return, so a full device idle has nothing to wait on
        device.wait_idle().unwrap();
    }

    #[test]
    fn test_command_buffer_can_be_rerecorded() {
        let Some(gpu) = headless_gpu() else {
            return;
        };
        let device = gpu.device.clone();
        let pool = CommandPool::new(device.clone(), device.graphics_family()).unwrap();
        let cmd = CommandBuffer::new(device, &pool).unwrap();

        for _ in 0..2 {
            cmd.reset().unwrap();
            cmd.begin().unwrap();
            cmd.end().unwrap();
        }
    }
}
