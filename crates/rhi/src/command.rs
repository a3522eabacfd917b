//! Command pool and command buffer management.
//!
//! This module provides wrappers for VkCommandPool and VkCommandBuffer,
//! plus the one-shot submission helper used by setup-time transfers.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use viewer_rhi::device::Device;
//! use viewer_rhi::command::CommandPool;
//!
//! # fn example(device: Arc<Device>) -> Result<(), viewer_rhi::RhiError> {
//! let queue_family = device.queue_families().graphics_family.unwrap();
//! let pool = CommandPool::new(device.clone(), queue_family)?;
//! let cmd = pool.allocate_command_buffer()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::info;

use crate::device::Device;
use crate::error::RhiResult;

/// Vulkan command pool wrapper.
///
/// A command pool allocates command buffers for a specific queue family.
///
/// # Thread Safety
///
/// Command pools are not thread-safe. For multi-threaded command recording,
/// create a separate pool per thread.
pub struct CommandPool {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan command pool handle.
    pool: vk::CommandPool,
    /// Queue family index this pool belongs to.
    queue_family_index: u32,
}

impl CommandPool {
    /// Creates a new command pool for the specified queue family.
    ///
    /// The pool is created with the `RESET_COMMAND_BUFFER` flag, allowing
    /// individual command buffers to be reset without resetting the whole
    /// pool.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device
    /// * `queue_family_index` - The queue family for command buffer submission
    ///
    /// # Errors
    ///
    /// Returns an error if command pool creation fails.
    pub fn new(device: Arc<Device>, queue_family_index: u32) -> RhiResult<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family_index)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

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

    /// Creates a transient command pool for short-lived command buffers.
    ///
    /// Transient pools are optimized for buffers that are recorded once,
    /// submitted and discarded, as in the staging-upload protocol.
    ///
    /// # Errors
    ///
    /// Returns an error if command pool creation fails.
    pub fn new_transient(device: Arc<Device>, queue_family_index: u32) -> RhiResult<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family_index)
            .flags(vk::CommandPoolCreateFlags::TRANSIENT);

        let pool = unsafe { device.handle().create_command_pool(&create_info, None)? };

        info!(
            "Transient command pool created for queue family {}",
            queue_family_index
        );

        Ok(Self {
            device,
            pool,
            queue_family_index,
        })
    }

    /// Returns the Vulkan command pool handle.
    #[inline]
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    /// Returns the queue family index this pool belongs to.
    #[inline]
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    /// Returns a reference to the device.
    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Allocates a primary command buffer from this pool.
    ///
    /// The handle is freed when the pool is destroyed, or explicitly via
    /// [`free_command_buffer`](Self::free_command_buffer).
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails.
    pub fn allocate_command_buffer(&self) -> RhiResult<vk::CommandBuffer> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let buffers = unsafe { self.device.handle().allocate_command_buffers(&alloc_info)? };
        Ok(buffers[0])
    }

    /// Frees a command buffer back to this pool.
    ///
    /// The buffer must not be pending execution.
    pub fn free_command_buffer(&self, buffer: vk::CommandBuffer) {
        unsafe {
            self.device
                .handle()
                .free_command_buffers(self.pool, &[buffer]);
        }
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_command_pool(self.pool, None);
        }
        info!(
            "Command pool destroyed for queue family {}",
            self.queue_family_index
        );
    }
}

/// Records and submits a one-shot command buffer, waiting for completion.
///
/// This is the transfer workhorse of the upload protocol: allocate a
/// short-lived buffer from a transient pool, begin with one-time-submit,
/// let the caller record, end, submit to the given queue, wait for the
/// queue to go idle, then free the buffer.
///
/// # Arguments
///
/// * `pool` - A (preferably transient) command pool
/// * `queue` - The queue to submit to
/// * `record` - Closure recording commands into the provided buffer
///
/// # Errors
///
/// Returns an error if any stage of the record/submit/wait sequence fails.
pub fn submit_one_shot<F>(pool: &CommandPool, queue: vk::Queue, record: F) -> RhiResult<()>
where
    F: FnOnce(vk::CommandBuffer) -> RhiResult<()>,
{
    let device = pool.device().handle();
    let cmd = pool.allocate_command_buffer()?;

    let begin_info =
        vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

    let result = (|| {
        unsafe { device.begin_command_buffer(cmd, &begin_info)? };
        record(cmd)?;
        unsafe { device.end_command_buffer(cmd)? };

        let command_buffers = [cmd];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

        unsafe {
            device.queue_submit(queue, &[submit_info], vk::Fence::null())?;
            device.queue_wait_idle(queue)?;
        }
        Ok(())
    })();

    pool.free_command_buffer(cmd);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_pool_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<CommandPool>();
    }
}
