//! Depth buffer management.
//!
//! The depth buffer is a device-local 2D image recreated alongside the
//! swapchain so both always agree on extent. The format is picked by a
//! device capability query from a descending-precision candidate list. No
//! explicit layout transition is recorded for it: the render pass performs
//! the transition from the undefined layout itself.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use viewer_rhi::device::Device;
use viewer_rhi::image::Image2D;
use viewer_rhi::{RhiError, RhiResult};

/// Depth format candidates in order of decreasing precision.
const DEPTH_FORMAT_CANDIDATES: &[vk::Format] = &[
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
];

/// Finds the first candidate depth format the device supports as an
/// optimal-tiling depth/stencil attachment.
///
/// # Errors
///
/// Returns [`RhiError::NoSupportedFormat`] if no candidate qualifies.
pub fn find_depth_format(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
) -> RhiResult<vk::Format> {
    for &format in DEPTH_FORMAT_CANDIDATES {
        let props =
            unsafe { instance.get_physical_device_format_properties(physical_device, format) };

        if props
            .optimal_tiling_features
            .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
        {
            debug!("Selected depth format: {:?}", format);
            return Ok(format);
        }
    }

    Err(RhiError::NoSupportedFormat(format!(
        "no depth attachment format among {:?}",
        DEPTH_FORMAT_CANDIDATES
    )))
}

/// Depth buffer for depth testing.
///
/// Wraps a device-local image and view sized to the swapchain extent.
pub struct DepthBuffer {
    image: Image2D,
}

impl DepthBuffer {
    /// Creates a new depth buffer.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device
    /// * `width` - Width in pixels (the swapchain extent)
    /// * `height` - Height in pixels (the swapchain extent)
    /// * `format` - A depth format from [`find_depth_format`]
    ///
    /// # Errors
    ///
    /// Returns an error if image or view creation fails.
    pub fn new(
        device: Arc<Device>,
        width: u32,
        height: u32,
        format: vk::Format,
    ) -> RhiResult<Self> {
        let image = Image2D::new(
            device,
            width,
            height,
            format,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            vk::ImageAspectFlags::DEPTH,
        )?;

        info!("Created depth buffer: {}x{} ({:?})", width, height, format);

        Ok(Self { image })
    }

    /// Returns the depth image view handle.
    #[inline]
    pub fn view(&self) -> vk::ImageView {
        self.image.view()
    }

    /// Returns the depth format.
    #[inline]
    pub fn format(&self) -> vk::Format {
        self.image.format()
    }

    /// Returns the depth buffer extent.
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.image.extent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_are_descending_precision() {
        assert_eq!(
            DEPTH_FORMAT_CANDIDATES,
            &[
                vk::Format::D32_SFLOAT,
                vk::Format::D32_SFLOAT_S8_UINT,
                vk::Format::D24_UNORM_S8_UINT,
            ]
        );
    }
}
