//! Frame scheduling and per-frame synchronization.
//!
//! This module implements the frames-in-flight protocol around a bounded
//! ring of [`FrameSlot`]s. Each slot owns one command buffer (with its own
//! pool), an image-available semaphore, a render-finished semaphore, and an
//! in-flight fence. A slot's resources are never touched by the CPU until
//! its fence signals.
//!
//! # Synchronization Flow
//!
//! ```text
//! 1. Wait on the slot's in-flight fence (CPU backpressure, unbounded)
//! 2. Acquire a swapchain image (signals image_available)
//! 3. Write per-frame data, reset the fence, record the command buffer
//! 4. Submit: wait image_available at color-output, signal render_finished
//!    and the fence
//! 5. Present: wait render_finished
//! 6. Advance the frame counter - only after a successful submission
//! ```
//!
//! The fence is reset immediately before submission and never on a path
//! that can still abort; resetting and then bailing would deadlock the
//! next wait on a fence nothing will signal.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use viewer_rhi::command::CommandPool;
use viewer_rhi::device::Device;
use viewer_rhi::swapchain::Swapchain;
use viewer_rhi::sync::{Fence, Semaphore};
use viewer_rhi::{RhiError, RhiResult};

/// Outcome of an image acquisition attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image was acquired. `suboptimal` means the frame proceeds but a
    /// rebuild should be scheduled after presenting.
    Acquired {
        /// Index of the acquired swapchain image.
        image_index: u32,
        /// The surface still works but no longer matches the target.
        suboptimal: bool,
    },
    /// The swapchain is out of date; the frame must be aborted and the
    /// swapchain rebuilt before the next iteration.
    OutOfDate,
}

/// Ring counter for the current frame index.
///
/// Advances exactly once per successfully submitted frame; aborted frames
/// leave it untouched.
#[derive(Clone, Copy, Debug)]
pub struct FrameCounter {
    current: usize,
    count: usize,
}

impl FrameCounter {
    /// Creates a counter over `count` slots.
    pub fn new(count: usize) -> Self {
        Self { current: 0, count }
    }

    /// Returns the current frame index.
    #[inline]
    pub fn current(&self) -> usize {
        self.current
    }

    /// Returns the number of slots.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Advances to the next slot, wrapping at the ring size.
    pub fn advance(&mut self) {
        self.current = (self.current + 1) % self.count;
    }
}

/// Per-frame-slot resources.
///
/// Each slot owns its own command pool so the command buffer can be reset
/// and re-recorded each cycle without touching other slots.
pub struct FrameSlot {
    /// Command pool for this slot's command buffer.
    command_pool: CommandPool,
    /// The slot's primary command buffer.
    command_buffer: vk::CommandBuffer,
    /// Signaled when the acquired swapchain image is ready.
    image_available: Semaphore,
    /// Signaled when rendering to the image has finished.
    render_finished: Semaphore,
    /// Signaled when this slot's submission completes on the GPU.
    in_flight: Fence,
}

impl FrameSlot {
    /// Creates the resources for one frame slot.
    ///
    /// The fence starts signaled so the first wait on a fresh slot does not
    /// block forever.
    fn new(device: Arc<Device>) -> RhiResult<Self> {
        let graphics_family = device
            .queue_families()
            .graphics_family
            .ok_or_else(|| RhiError::InvalidHandle("graphics queue family unresolved".into()))?;

        let command_pool = CommandPool::new(device.clone(), graphics_family)?;
        let command_buffer = command_pool.allocate_command_buffer()?;
        let image_available = Semaphore::new(device.clone())?;
        let render_finished = Semaphore::new(device.clone())?;
        let in_flight = Fence::new(device, true)?;

        Ok(Self {
            command_pool,
            command_buffer,
            image_available,
            render_finished,
            in_flight,
        })
    }

    /// Returns the slot's command buffer.
    #[inline]
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    /// Returns the pool the slot's command buffer was allocated from.
    #[inline]
    pub fn command_pool(&self) -> &CommandPool {
        &self.command_pool
    }
}

/// Drives the per-frame loop over a bounded ring of frame slots.
///
/// # Thread Safety
///
/// Not thread-safe; the single frame-driving thread owns it.
pub struct FrameScheduler {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// The slot ring.
    slots: Vec<FrameSlot>,
    /// Current frame index, advanced only on submitted frames.
    counter: FrameCounter,
    /// Swapchain image index from the last successful acquire.
    image_index: u32,
}

impl FrameScheduler {
    /// Creates a scheduler with `frames_in_flight` slots.
    ///
    /// # Errors
    ///
    /// Returns an error if any slot resource creation fails.
    pub fn new(device: Arc<Device>, frames_in_flight: usize) -> RhiResult<Self> {
        let mut slots = Vec::with_capacity(frames_in_flight);
        for i in 0..frames_in_flight {
            slots.push(FrameSlot::new(device.clone())?);
            debug!("Created frame slot {}", i);
        }

        info!(
            "Frame scheduler created with {} frames in flight",
            frames_in_flight
        );

        Ok(Self {
            device,
            slots,
            counter: FrameCounter::new(frames_in_flight),
            image_index: 0,
        })
    }

    /// Returns the current frame index.
    #[inline]
    pub fn current_frame(&self) -> usize {
        self.counter.current()
    }

    /// Returns the number of frames in flight.
    #[inline]
    pub fn frames_in_flight(&self) -> usize {
        self.counter.count()
    }

    /// Returns the swapchain image index of the last acquire.
    #[inline]
    pub fn image_index(&self) -> u32 {
        self.image_index
    }

    /// Returns the current slot's command buffer.
    #[inline]
    pub fn current_command_buffer(&self) -> vk::CommandBuffer {
        self.slots[self.counter.current()].command_buffer()
    }

    /// Blocks until the current slot's previous submission completes.
    ///
    /// This is the backpressure bound: the CPU can run at most
    /// `frames_in_flight` frames ahead of the GPU.
    ///
    /// # Errors
    ///
    /// Returns an error if the wait fails.
    pub fn wait_for_frame(&self) -> RhiResult<()> {
        self.slots[self.counter.current()].in_flight.wait()
    }

    /// Acquires the next swapchain image with the current slot's
    /// image-available semaphore.
    ///
    /// An out-of-date surface is not an error: the caller aborts the frame
    /// (without resetting the fence or advancing the counter), rebuilds,
    /// and retries on the next loop iteration.
    ///
    /// # Errors
    ///
    /// Any result other than success, suboptimal or out-of-date is fatal
    /// and propagated.
    pub fn acquire(&mut self, swapchain: &Swapchain) -> RhiResult<AcquireOutcome> {
        let slot = &self.slots[self.counter.current()];

        match swapchain.acquire_next_image(slot.image_available.handle()) {
            Ok((index, suboptimal)) => {
                self.image_index = index;
                Ok(AcquireOutcome::Acquired {
                    image_index: index,
                    suboptimal,
                })
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                debug!("Swapchain out of date during acquire");
                Ok(AcquireOutcome::OutOfDate)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Resets the current slot's fence and command buffer, and begins
    /// recording.
    ///
    /// Must only be called once this frame is certain to submit; the fence
    /// reset happens here and nowhere else.
    ///
    /// # Errors
    ///
    /// Returns an error if the reset or begin fails.
    pub fn begin_recording(&self) -> RhiResult<()> {
        let slot = &self.slots[self.counter.current()];

        slot.in_flight.reset()?;

        unsafe {
            self.device.handle().reset_command_buffer(
                slot.command_buffer,
                vk::CommandBufferResetFlags::empty(),
            )?;

            let begin_info = vk::CommandBufferBeginInfo::default();
            self.device
                .handle()
                .begin_command_buffer(slot.command_buffer, &begin_info)?;
        }

        Ok(())
    }

    /// Ends recording on the current slot's command buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if ending fails.
    pub fn end_recording(&self) -> RhiResult<()> {
        let slot = &self.slots[self.counter.current()];
        unsafe {
            self.device
                .handle()
                .end_command_buffer(slot.command_buffer)?;
        }
        Ok(())
    }

    /// Submits the current slot's command buffer to the graphics queue.
    ///
    /// Waits on the slot's image-available semaphore at the
    /// color-attachment-output stage, signals the render-finished semaphore
    /// and the slot's fence on completion.
    ///
    /// # Errors
    ///
    /// Returns an error if submission fails.
    pub fn submit(&self) -> RhiResult<()> {
        let slot = &self.slots[self.counter.current()];

        let wait_semaphores = [slot.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [slot.render_finished.handle()];
        let command_buffers = [slot.command_buffer];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.device.handle().queue_submit(
                self.device.graphics_queue(),
                &[submit_info],
                slot.in_flight.handle(),
            )?;
        }

        Ok(())
    }

    /// Presents the acquired image, waiting on the render-finished
    /// semaphore.
    ///
    /// # Returns
    ///
    /// `true` if the surface is stale (out of date or suboptimal) and the
    /// presentation set must be rebuilt before the next frame.
    ///
    /// # Errors
    ///
    /// Any result other than the two staleness conditions is fatal and
    /// propagated.
    pub fn present(&self, swapchain: &Swapchain) -> RhiResult<bool> {
        let slot = &self.slots[self.counter.current()];

        match swapchain.present(
            self.device.present_queue(),
            self.image_index,
            slot.render_finished.handle(),
        ) {
            Ok(suboptimal) => Ok(suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                debug!("Swapchain out of date during present");
                Ok(true)
            }
            Err(vk::Result::SUBOPTIMAL_KHR) => {
                debug!("Swapchain suboptimal during present");
                Ok(true)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Advances to the next frame slot.
    ///
    /// Call exactly once per successfully submitted frame, never on an
    /// early-return path.
    pub fn advance(&mut self) {
        self.counter.advance();
    }

    /// Waits for every slot's in-flight work to complete.
    ///
    /// # Errors
    ///
    /// Returns an error if the wait fails.
    pub fn wait_all(&self) -> RhiResult<()> {
        let fences: Vec<vk::Fence> = self.slots.iter().map(|s| s.in_flight.handle()).collect();

        unsafe {
            self.device
                .handle()
                .wait_for_fences(&fences, true, u64::MAX)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_wraps_mod_k() {
        // K = 2, three successful frames use indices 0, 1, 0
        let mut counter = FrameCounter::new(2);
        let mut used = Vec::new();
        for _ in 0..3 {
            used.push(counter.current());
            counter.advance();
        }
        assert_eq!(used, vec![0, 1, 0]);
    }

    #[test]
    fn test_counter_after_m_frames_is_m_mod_k() {
        for k in 2..=4 {
            let mut counter = FrameCounter::new(k);
            for m in 0..10 {
                assert_eq!(counter.current(), m % k);
                counter.advance();
            }
        }
    }

    #[test]
    fn test_aborted_frame_does_not_advance() {
        // An out-of-date acquire aborts the frame without advancing; the
        // same slot index is used on the retry.
        let mut counter = FrameCounter::new(2);
        let outcomes = [true, false, true, true];

        let mut used = Vec::new();
        for &submitted in &outcomes {
            used.push(counter.current());
            if submitted {
                counter.advance();
            }
        }

        assert_eq!(used, vec![0, 1, 1, 0]);
    }
}
