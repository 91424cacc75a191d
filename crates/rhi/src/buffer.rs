//! GPU buffer management.
//!
//! - [`BufferUsage`] picks the Vulkan usage flags and the memory location.
//! - [`Buffer`] owns a `VkBuffer` and its `gpu-allocator` allocation.
//!
//! Host-visible buffers (uniform, staging) stay persistently mapped, so
//! [`Buffer::write_data`] is a plain memcpy. Vertex and index buffers live in
//! device-local memory and are filled once through
//! [`Buffer::device_local_with_data`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use practices_rhi::buffer::{Buffer, BufferUsage};
//! use practices_rhi::command::CommandPool;
//! use practices_rhi::device::Device;
//!
//! # fn example(device: Arc<Device>, pool: &CommandPool) -> Result<(), practices_rhi::RhiError> {
//! let vertices: [f32; 6] = [0.0, -0.5, 0.5, 0.5, -0.5, 0.5];
//! let vertex_buffer = Buffer::device_local_with_data(
//!     device,
//!     pool,
//!     BufferUsage::Vertex,
//!     bytemuck::cast_slice(&vertices),
//! )?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use tracing::debug;

use crate::command::{CommandPool, submit_one_time};
use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// What a buffer is used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    /// Device-local vertex data, filled by a transfer.
    Vertex,
    /// Device-local index data, filled by a transfer.
    Index,
    /// Host-visible, rewritten every frame.
    Uniform,
    /// Host-visible transfer source, used once.
    Staging,
}

impl BufferUsage {
    pub fn to_vk_usage(self) -> vk::BufferUsageFlags {
        match self {
            BufferUsage::Vertex => {
                vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST
            }
            BufferUsage::Index => {
                vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST
            }
            BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
            BufferUsage::Staging => vk::BufferUsageFlags::TRANSFER_SRC,
        }
    }

    pub fn memory_location(self) -> MemoryLocation {
        match self {
            BufferUsage::Vertex | BufferUsage::Index => MemoryLocation::GpuOnly,
            BufferUsage::Uniform | BufferUsage::Staging => MemoryLocation::CpuToGpu,
        }
    }

    /// Whether the CPU can write the buffer directly.
    #[inline]
    pub fn is_host_visible(self) -> bool {
        self.memory_location() != MemoryLocation::GpuOnly
    }

    pub fn name(self) -> &'static str {
        match self {
            BufferUsage::Vertex => "vertex",
            BufferUsage::Index => "index",
            BufferUsage::Uniform => "uniform",
            BufferUsage::Staging => "staging",
        }
    }
}

/// A buffer and its memory. Releases both on drop: buffer first, then memory.
pub struct Buffer {
    device: Arc<Device>,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: vk::DeviceSize,
    usage: BufferUsage,
}

impl Buffer {
    /// Creates a buffer of `size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::BufferError`] for a zero size, or an error if
    /// creation, allocation or binding fails.
    pub fn new(device: Arc<Device>, usage: BufferUsage, size: vk::DeviceSize) -> RhiResult<Self> {
        if size == 0 {
            return Err(RhiError::BufferError(format!(
                "{} buffer size must be greater than 0",
                usage.name()
            )));
        }

        let buffer_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage.to_vk_usage())
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        // SAFETY: buffer_info is well-formed and the device is valid.
        let buffer = unsafe { device.handle().create_buffer(&buffer_info, None)? };
        let requirements = unsafe { device.handle().get_buffer_memory_requirements(buffer) };

        let allocation = device.allocator().and_then(|mut allocator| {
            allocator
                .allocate(&AllocationCreateDesc {
                    name: usage.name(),
                    requirements,
                    location: usage.memory_location(),
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(RhiError::from)
        });

        // Owning the buffer from here on means Drop cleans up on any error below
        let mut this = Self {
            device,
            buffer,
            allocation: None,
            size,
            usage,
        };
        let allocation = allocation?;

        // SAFETY: the allocation satisfies the buffer's requirements.
        let bind = unsafe {
            this.device
                .handle()
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
        };
        this.allocation = Some(allocation);
        bind?;

        debug!("Created {} buffer: {} bytes", usage.name(), size);

        Ok(this)
    }

    /// Creates a host-visible buffer holding `data`.
    pub fn new_with_data(device: Arc<Device>, usage: BufferUsage, data: &[u8]) -> RhiResult<Self> {
        let buffer = Self::new(device, usage, data.len() as vk::DeviceSize)?;
        buffer.write_data(0, data)?;
        Ok(buffer)
    }

    /// Creates a device-local buffer and fills it with `data`.
    ///
    /// The data goes through a staging buffer copied by a one-time command
    /// buffer on the graphics queue; this blocks until the copy finishes and
    /// the staging buffer is released before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if either buffer cannot be created or the transfer
    /// fails.
    pub fn device_local_with_data(
        device: Arc<Device>,
        pool: &CommandPool,
        usage: BufferUsage,
        data: &[u8],
    ) -> RhiResult<Self> {
        let staging = Self::new_with_data(device.clone(), BufferUsage::Staging, data)?;
        let buffer = Self::new(device.clone(), usage, staging.size())?;

        submit_one_time(&device, pool, device.graphics_queue(), |cmd| {
            cmd.copy_buffer(staging.handle(), buffer.handle(), staging.size());
        })?;

        debug!(
            "Uploaded {} bytes to device-local {} buffer",
            data.len(),
            usage.name()
        );

        Ok(buffer)
    }

    /// Copies `data` into the mapped memory at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::BufferError`] if the range exceeds the buffer or
    /// the buffer is not host-visible.
    pub fn write_data(&self, offset: vk::DeviceSize, data: &[u8]) -> RhiResult<()> {
        check_write_range(self.size, offset, data.len())?;
        if data.is_empty() {
            return Ok(());
        }

        let mapped_ptr = self
            .allocation
            .as_ref()
            .and_then(|allocation| allocation.mapped_ptr())
            .ok_or_else(|| {
                RhiError::BufferError(format!("{} buffer is not mapped", self.usage.name()))
            })?;

        // SAFETY: the range was checked against the allocation size and the
        // memory is host-coherent.
        unsafe {
            let dst = mapped_ptr.as_ptr().cast::<u8>().add(offset as usize);
            std::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
        }

        Ok(())
    }

    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    #[inline]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        // SAFETY: the owner guarantees no pending GPU work uses the buffer.
        unsafe {
            self.device.handle().destroy_buffer(self.buffer, None);
        }

        if let Some(allocation) = self.allocation.take() {
            match self.device.allocator() {
                Ok(mut allocator) => {
                    if let Err(e) = allocator.free(allocation) {
                        tracing::error!("Failed to free buffer allocation: {:?}", e);
                    }
                }
                Err(e) => tracing::error!("Leaking {} buffer memory: {}", self.usage.name(), e),
            }
        }
    }
}

fn check_write_range(size: vk::DeviceSize, offset: vk::DeviceSize, len: usize) -> RhiResult<()> {
    let end = offset.checked_add(len as vk::DeviceSize);
    match end {
        Some(end) if end <= size => Ok(()),
        _ => Err(RhiError::BufferError(format!(
            "Write exceeds buffer size: offset {} + data {} > buffer {}",
            offset, len, size
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::headless_gpu;

    #[test]
    fn test_buffer_usage_to_vk_usage() {
        assert!(
            BufferUsage::Vertex
                .to_vk_usage()
                .contains(vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST)
        );
        assert!(
            BufferUsage::Index
                .to_vk_usage()
                .contains(vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST)
        );
        assert_eq!(
            BufferUsage::Uniform.to_vk_usage(),
            vk::BufferUsageFlags::UNIFORM_BUFFER
        );
        assert_eq!(
            BufferUsage::Staging.to_vk_usage(),
            vk::BufferUsageFlags::TRANSFER_SRC
        );
    }

    #[test]
    fn test_geometry_is_device_local() {
        assert_eq!(BufferUsage::Vertex.memory_location(), MemoryLocation::GpuOnly);
        assert_eq!(BufferUsage::Index.memory_location(), MemoryLocation::GpuOnly);
        assert!(!BufferUsage::Vertex.is_host_visible());
    }

    #[test]
    fn test_per_frame_buffers_are_host_visible() {
        assert_eq!(BufferUsage::Uniform.memory_location(), MemoryLocation::CpuToGpu);
        assert_eq!(BufferUsage::Staging.memory_location(), MemoryLocation::CpuToGpu);
        assert!(BufferUsage::Uniform.is_host_visible());
        assert!(BufferUsage::Staging.is_host_visible());
    }

    #[test]
    fn test_write_range() {
        assert!(check_write_range(192, 0, 192).is_ok());
        assert!(check_write_range(192, 64, 128).is_ok());
        assert!(check_write_range(192, 192, 0).is_ok());
        assert!(check_write_range(192, 65, 128).is_err());
        assert!(check_write_range(16, u64::MAX, 1).is_err());
    }

    #[test]
    fn test_buffer_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Buffer>();
    }

    #[test]
    fn test_uniform_buffer_writes_in_range() {
        let Some(gpu) = headless_gpu() else {
            return;
        };
        let buffer = Buffer::new(gpu.device.clone(), BufferUsage::Uniform, 192).unwrap();
        assert_eq!(buffer.size(), 192);

        let matrices = [0u8; 192];
        buffer.write_data(0, &matrices).unwrap();
        buffer.write_data(128, &matrices[..64]).unwrap();
        assert!(matches!(
            buffer.write_data(129, &matrices[..64]),
            Err(RhiError::BufferError(_))
        ));
    }

    #[test]
    fn test_device_local_buffer_rejects_host_writes() {
        let Some(gpu) = headless_gpu() else {
            return;
        };
        let buffer = Buffer::new(gpu.device.clone(), BufferUsage::Vertex, 64).unwrap();
        assert!(buffer.write_data(0, &[1, 2, 3, 4]).is_err());
    }

    #[test]
    fn test_zero_sized_buffer_is_an_error() {
        let Some(gpu) = headless_gpu() else {
            return;
        };
        assert!(Buffer::new(gpu.device.clone(), BufferUsage::Uniform, 0).is_err());
    }

    #[test]
    fn test_staged_upload_to_device_local() {
        let Some(gpu) = headless_gpu() else {
            return;
        };
        let device = gpu.device.clone();
        let pool = CommandPool::new(device.clone(), device.graphics_family()).unwrap();
        let indices: [u16; 6] = [0, 1, 2, 2, 3, 0];

        let buffer = Buffer::device_local_with_data(
            device.clone(),
            &pool,
            BufferUsage::Index,
            bytemuck::cast_slice(&indices),
        )
        .unwrap();

        assert_eq!(buffer.size(), 12);
        assert_eq!(buffer.usage(), BufferUsage::Index);
        // The copy finished and the staging buffer is gone; teardown must not block
        drop(buffer);
        device.wait_idle().unwrap();
    }
}
