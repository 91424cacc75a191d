//! Per-slot synchronization objects and command buffers.
//!
//! Each frame in flight owns its own command buffer and sync objects so the
//! CPU can record slot N+1 while the GPU still executes slot N:
//!
//! ```text
//! 1. Wait on in_flight (previous use of this slot is done)
//! 2. Acquire an image, signaling image_available
//! 3. Reset in_flight and the command buffer, then record
//! 4. Submit: wait image_available, signal render_finished[image], fence in_flight
//! 5. Present: wait render_finished[image]
//! ```
//!
//! The render-finished semaphore is indexed by swapchain image rather than by
//! slot. A slot's fence covers its submission but not the present that waits
//! on the semaphore; an image is only handed out again by acquire once that
//! present is done, so reusing the semaphore per image is always safe.

use std::sync::Arc;

use tracing::{debug, info};

use practices_rhi::RhiResult;
use practices_rhi::command::{CommandBuffer, CommandPool};
use practices_rhi::device::Device;
use practices_rhi::sync::{Fence, Semaphore};

/// Resources of one frame in flight.
pub struct FrameSlot {
    command_buffer: CommandBuffer,
    image_available: Semaphore,
    in_flight: Fence,
}

impl FrameSlot {
    fn new(device: Arc<Device>, pool: &CommandPool) -> RhiResult<Self> {
        let command_buffer = CommandBuffer::new(device.clone(), pool)?;
        let image_available = Semaphore::new(device.clone())?;
        // Signaled so the first wait on this slot returns immediately
        let in_flight = Fence::new(device, true)?;

        Ok(Self {
            command_buffer,
            image_available,
            in_flight,
        })
    }

    #[inline]
    pub fn command_buffer(&self) -> &CommandBuffer {
        &self.command_buffer
    }

    #[inline]
    pub fn image_available(&self) -> &Semaphore {
        &self.image_available
    }

    #[inline]
    pub fn in_flight(&self) -> &Fence {
        &self.in_flight
    }
}

/// All frame slots, created together at startup.
pub struct FrameSlots {
    slots: Vec<FrameSlot>,
}

impl FrameSlots {
    /// Creates `count` slots with command buffers from `pool`.
    ///
    /// # Errors
    ///
    /// Returns an error if any command buffer or sync object cannot be created.
    pub fn new(device: Arc<Device>, pool: &CommandPool, count: usize) -> RhiResult<Self> {
        let mut slots = Vec::with_capacity(count);

        for i in 0..count {
            slots.push(FrameSlot::new(device.clone(), pool)?);
            debug!("Created frame slot {}", i);
        }

        info!("Created {} frame slots", count);

        Ok(Self { slots })
    }

    #[inline]
    pub fn get(&self, slot: usize) -> Option<&FrameSlot> {
        self.slots.get(slot)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Render-finished semaphores, one per swapchain image.
///
/// Rebuilt with the swapchain, since the image count may change.
pub struct RenderFinishedSemaphores {
    semaphores: Vec<Semaphore>,
}

impl RenderFinishedSemaphores {
    pub fn new(device: Arc<Device>, image_count: u32) -> RhiResult<Self> {
        let semaphores = (0..image_count)
            .map(|_| Semaphore::new(device.clone()))
            .collect::<RhiResult<Vec<_>>>()?;

        debug!("Created {} render-finished semaphores", image_count);

        Ok(Self { semaphores })
    }

    #[inline]
    pub fn get(&self, image_index: u32) -> Option<&Semaphore> {
        self.semaphores.get(image_index as usize)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.semaphores.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.semaphores.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use practices_rhi::test_support::headless_gpu;

    #[test]
    fn test_frame_slots_are_send() {
        fn assert_send<T: Send>() {}
        assert_send::<FrameSlot>();
        assert_send::<FrameSlots>();
        assert_send::<RenderFinishedSemaphores>();
    }

    #[test]
    fn test_slots_start_with_signaled_fences() {
        let Some(gpu) = headless_gpu() else {
            return;
        };
        let pool = CommandPool::new(gpu.device.clone(), gpu.device.graphics_family()).unwrap();
        let slots = FrameSlots::new(gpu.device.clone(), &pool, 2).unwrap();

        assert_eq!(slots.len(), 2);
        assert!(slots.get(2).is_none());
        for slot in 0..2 {
            // Returns immediately: the first frame must not block
            slots.get(slot).unwrap().in_flight().wait(0).unwrap();
        }
    }

    #[test]
    fn test_render_finished_indexed_by_image() {
        let Some(gpu) = headless_gpu() else {
            return;
        };
        let semaphores = RenderFinishedSemaphores::new(gpu.device.clone(), 3).unwrap();

        assert_eq!(semaphores.len(), 3);
        assert!(semaphores.get(2).is_some());
        assert!(semaphores.get(3).is_none());
        assert_ne!(
            semaphores.get(0).unwrap().handle(),
            semaphores.get(1).unwrap().handle()
        );
    }
}
