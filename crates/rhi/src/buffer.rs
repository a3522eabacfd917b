//! GPU buffer management.
//!
//! This module handles vertex, index, uniform, staging and readback buffers
//! using gpu-allocator for memory management.
//!
//! # Lifecycles
//!
//! Two buffer lifecycles exist:
//!
//! - *Transient staging*: host-visible, written once, copied from, and
//!   destroyed within the same setup step.
//! - *Resident*: device-local, uploaded through the mandatory staging
//!   round-trip ([`Buffer::new_device_local`]) and alive for the
//!   application's duration.
//!
//! Host-visible buffers are mapped once at creation by the allocator and
//! stay mapped for their whole lifetime; per-frame uniform updates are a
//! plain memory copy with no map/unmap traffic.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use viewer_rhi::device::Device;
//! use viewer_rhi::buffer::{Buffer, BufferUsage};
//! use viewer_rhi::command::CommandPool;
//!
//! # fn example(device: Arc<Device>, pool: &CommandPool) -> Result<(), viewer_rhi::RhiError> {
//! let vertices: [f32; 6] = [0.0, 0.5, -0.5, -0.5, 0.5, -0.5];
//! let vertex_buffer = Buffer::new_device_local(
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

use crate::command::{CommandPool, submit_one_shot};
use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Buffer usage type.
///
/// Defines the intended use of the buffer, which determines the Vulkan
/// usage flags and the memory location.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    /// Vertex buffer - device-local vertex data
    Vertex,
    /// Index buffer - device-local index data
    Index,
    /// Uniform buffer - host-visible, persistently mapped, updated per frame
    Uniform,
    /// Staging buffer - host-visible transfer source for uploads
    Staging,
    /// Readback buffer - host-visible transfer destination for downloads
    Readback,
}

impl BufferUsage {
    /// Converts to Vulkan buffer usage flags.
    ///
    /// Device-local buffers carry `TRANSFER_SRC` in addition to
    /// `TRANSFER_DST` so their contents can be copied back out through
    /// [`Buffer::read_back`].
    pub fn to_vk_usage(self) -> vk::BufferUsageFlags {
        match self {
            BufferUsage::Vertex => {
                vk::BufferUsageFlags::VERTEX_BUFFER
                    | vk::BufferUsageFlags::TRANSFER_DST
                    | vk::BufferUsageFlags::TRANSFER_SRC
            }
            BufferUsage::Index => {
                vk::BufferUsageFlags::INDEX_BUFFER
                    | vk::BufferUsageFlags::TRANSFER_DST
                    | vk::BufferUsageFlags::TRANSFER_SRC
            }
            BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
            BufferUsage::Staging => vk::BufferUsageFlags::TRANSFER_SRC,
            BufferUsage::Readback => vk::BufferUsageFlags::TRANSFER_DST,
        }
    }

    /// Returns the memory location for this buffer type.
    pub fn memory_location(self) -> MemoryLocation {
        match self {
            // Resident data lives in device-local memory
            BufferUsage::Vertex | BufferUsage::Index => MemoryLocation::GpuOnly,
            // Uniform buffers need per-frame CPU writes
            BufferUsage::Uniform => MemoryLocation::CpuToGpu,
            BufferUsage::Staging => MemoryLocation::CpuToGpu,
            BufferUsage::Readback => MemoryLocation::GpuToCpu,
        }
    }

    /// Returns a human-readable name for the buffer type.
    pub fn name(self) -> &'static str {
        match self {
            BufferUsage::Vertex => "vertex",
            BufferUsage::Index => "index",
            BufferUsage::Uniform => "uniform",
            BufferUsage::Staging => "staging",
            BufferUsage::Readback => "readback",
        }
    }
}

/// GPU buffer wrapper with managed memory.
///
/// Wraps a Vulkan buffer and its memory allocation. Memory is managed by
/// gpu-allocator, which handles suballocation and memory type selection.
///
/// # Thread Safety
///
/// The buffer itself is not thread-safe. Synchronize access externally when
/// sharing between threads.
pub struct Buffer {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan buffer handle.
    buffer: vk::Buffer,
    /// GPU memory allocation.
    allocation: Option<Allocation>,
    /// Buffer size in bytes.
    size: vk::DeviceSize,
    /// Buffer usage type.
    usage: BufferUsage,
}

impl Buffer {
    /// Creates a new buffer with the specified size.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device
    /// * `usage` - The intended buffer usage
    /// * `size` - Buffer size in bytes
    ///
    /// # Errors
    ///
    /// Returns an error if buffer creation or memory allocation fails, or
    /// if `size` is zero.
    pub fn new(device: Arc<Device>, usage: BufferUsage, size: vk::DeviceSize) -> RhiResult<Self> {
        if size == 0 {
            return Err(RhiError::InvalidHandle(
                "Buffer size must be greater than 0".to_string(),
            ));
        }

        let buffer_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage.to_vk_usage())
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.handle().create_buffer(&buffer_info, None)? };

        let requirements = unsafe { device.handle().get_buffer_memory_requirements(buffer) };

        let allocation = {
            let mut allocator = device.allocator().lock().unwrap();
            allocator.allocate(&AllocationCreateDesc {
                name: usage.name(),
                requirements,
                location: usage.memory_location(),
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })?
        };

        unsafe {
            device
                .handle()
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())?;
        }

        debug!("Created {} buffer: {} bytes", usage.name(), size);

        Ok(Self {
            device,
            buffer,
            allocation: Some(allocation),
            size,
            usage,
        })
    }

    /// Creates a host-visible buffer and initializes it with data.
    ///
    /// # Errors
    ///
    /// Returns an error if creation fails or the buffer's memory is not
    /// host-visible.
    pub fn new_with_data(device: Arc<Device>, usage: BufferUsage, data: &[u8]) -> RhiResult<Self> {
        let buffer = Self::new(device, usage, data.len() as vk::DeviceSize)?;
        buffer.write_bytes(0, data)?;
        Ok(buffer)
    }

    /// Creates a device-local buffer and uploads data through a staging
    /// buffer.
    ///
    /// This is the mandatory path for resident data: a host-visible staging
    /// buffer sized to the payload is created and filled, a one-shot copy
    /// command moves the bytes into the device-local destination, the copy
    /// is waited on, and the staging buffer is destroyed before returning.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device
    /// * `pool` - A transient command pool on the graphics queue family
    /// * `usage` - `Vertex` or `Index`
    /// * `data` - The payload to upload
    ///
    /// # Errors
    ///
    /// Returns an error if any allocation, the copy submission, or the wait
    /// fails.
    pub fn new_device_local(
        device: Arc<Device>,
        pool: &CommandPool,
        usage: BufferUsage,
        data: &[u8],
    ) -> RhiResult<Self> {
        let staging = Self::new_with_data(device.clone(), BufferUsage::Staging, data)?;
        let buffer = Self::new(device.clone(), usage, data.len() as vk::DeviceSize)?;

        submit_one_shot(pool, device.graphics_queue(), |cmd| {
            let region = vk::BufferCopy::default().size(data.len() as vk::DeviceSize);
            unsafe {
                device
                    .handle()
                    .cmd_copy_buffer(cmd, staging.handle(), buffer.handle(), &[region]);
            }
            Ok(())
        })?;

        debug!(
            "Uploaded {} bytes to device-local {} buffer via staging",
            data.len(),
            usage.name()
        );

        // Staging buffer dropped here, after the copy completed
        Ok(buffer)
    }

    /// Writes data to the buffer at the specified offset.
    ///
    /// The buffer must be host-visible; the write goes through the
    /// allocation's persistent mapping.
    ///
    /// # Arguments
    ///
    /// * `offset` - Byte offset into the buffer
    /// * `data` - Data to write
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The buffer memory is not mapped
    /// - The write would exceed the buffer size
    pub fn write_bytes(&self, offset: vk::DeviceSize, data: &[u8]) -> RhiResult<()> {
        if data.is_empty() {
            return Ok(());
        }

        let end = offset + data.len() as vk::DeviceSize;
        if end > self.size {
            return Err(RhiError::InvalidHandle(format!(
                "Write exceeds buffer size: offset {} + data {} > buffer {}",
                offset,
                data.len(),
                self.size
            )));
        }

        let allocation = self.allocation.as_ref().ok_or_else(|| {
            RhiError::InvalidHandle("Buffer allocation is not available".to_string())
        })?;

        let mapped_ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| RhiError::InvalidHandle("Buffer memory is not mapped".to_string()))?;

        unsafe {
            let dst = mapped_ptr.as_ptr().add(offset as usize);
            std::ptr::copy_nonoverlapping(data.as_ptr(), dst as *mut u8, data.len());
        }

        Ok(())
    }

    /// Copies the buffer's contents back to the host.
    ///
    /// Creates a host-visible readback buffer, records a one-shot
    /// device-side copy into it, waits for completion and returns the
    /// bytes. Setup/testing path, never used per frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the copy or the readback mapping fails.
    pub fn read_back(&self, pool: &CommandPool) -> RhiResult<Vec<u8>> {
        let readback = Self::new(self.device.clone(), BufferUsage::Readback, self.size)?;

        submit_one_shot(pool, self.device.graphics_queue(), |cmd| {
            let region = vk::BufferCopy::default().size(self.size);
            unsafe {
                self.device.handle().cmd_copy_buffer(
                    cmd,
                    self.handle(),
                    readback.handle(),
                    &[region],
                );
            }
            Ok(())
        })?;

        let allocation = readback.allocation.as_ref().ok_or_else(|| {
            RhiError::InvalidHandle("Readback allocation is not available".to_string())
        })?;

        let mapped_ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| RhiError::InvalidHandle("Readback memory is not mapped".to_string()))?;

        let mut bytes = vec![0u8; self.size as usize];
        unsafe {
            std::ptr::copy_nonoverlapping(
                mapped_ptr.as_ptr() as *const u8,
                bytes.as_mut_ptr(),
                self.size as usize,
            );
        }

        Ok(bytes)
    }

    /// Returns the Vulkan buffer handle.
    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Returns the buffer size in bytes.
    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    /// Returns the buffer usage type.
    #[inline]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        // Free allocation first, then destroy buffer
        if let Some(allocation) = self.allocation.take() {
            let mut allocator = self.device.allocator().lock().unwrap();
            if let Err(e) = allocator.free(allocation) {
                tracing::error!("Failed to free buffer allocation: {:?}", e);
            }
        }

        unsafe {
            self.device.handle().destroy_buffer(self.buffer, None);
        }

        debug!("Destroyed {} buffer", self.usage.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
        assert!(
            BufferUsage::Uniform
                .to_vk_usage()
                .contains(vk::BufferUsageFlags::UNIFORM_BUFFER)
        );
        assert!(
            BufferUsage::Staging
                .to_vk_usage()
                .contains(vk::BufferUsageFlags::TRANSFER_SRC)
        );
        assert!(
            BufferUsage::Readback
                .to_vk_usage()
                .contains(vk::BufferUsageFlags::TRANSFER_DST)
        );
    }

    #[test]
    fn test_buffer_usage_memory_location() {
        // Resident data is device-local, per-frame and transfer data is
        // host-visible
        assert_eq!(BufferUsage::Vertex.memory_location(), MemoryLocation::GpuOnly);
        assert_eq!(BufferUsage::Index.memory_location(), MemoryLocation::GpuOnly);
        assert_eq!(
            BufferUsage::Uniform.memory_location(),
            MemoryLocation::CpuToGpu
        );
        assert_eq!(
            BufferUsage::Staging.memory_location(),
            MemoryLocation::CpuToGpu
        );
        assert_eq!(
            BufferUsage::Readback.memory_location(),
            MemoryLocation::GpuToCpu
        );
    }

    #[test]
    fn test_buffer_usage_name() {
        assert_eq!(BufferUsage::Vertex.name(), "vertex");
        assert_eq!(BufferUsage::Index.name(), "index");
        assert_eq!(BufferUsage::Uniform.name(), "uniform");
        assert_eq!(BufferUsage::Staging.name(), "staging");
        assert_eq!(BufferUsage::Readback.name(), "readback");
    }
}
