//! Texture upload.
//!
//! A texture is a device-local 2D image filled from decoded RGBA8 pixels.
//! The upload follows the staging protocol: pixels land in a host-visible
//! staging buffer, the image is transitioned from its undefined layout to
//! the transfer-destination layout, the buffer is copied into the image,
//! and the image is transitioned again to the shader-read-only layout. The
//! staging buffer is destroyed before the constructor returns.

use std::sync::Arc;

use ash::vk;
use tracing::info;

use crate::buffer::{Buffer, BufferUsage};
use crate::command::{CommandPool, submit_one_shot};
use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::image::{Image2D, record_layout_transition};

/// A sampled 2D texture in device-local memory.
pub struct Texture {
    image: Image2D,
}

impl Texture {
    /// Creates a texture from decoded RGBA8 pixel bytes.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device
    /// * `pool` - A transient command pool on the graphics queue family
    /// * `width` - Texture width in pixels
    /// * `height` - Texture height in pixels
    /// * `pixels` - Tightly packed RGBA8 pixel data (`width * height * 4` bytes)
    ///
    /// # Errors
    ///
    /// Returns an error if the pixel buffer size does not match the
    /// dimensions, or if any upload step fails.
    pub fn from_rgba8(
        device: Arc<Device>,
        pool: &CommandPool,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> RhiResult<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(RhiError::InvalidHandle(format!(
                "Texture pixel buffer is {} bytes, expected {} for {}x{} RGBA8",
                pixels.len(),
                expected,
                width,
                height
            )));
        }

        let staging = Buffer::new_with_data(device.clone(), BufferUsage::Staging, pixels)?;

        let image = Image2D::new(
            device.clone(),
            width,
            height,
            vk::Format::R8G8B8A8_SRGB,
            vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
            vk::ImageAspectFlags::COLOR,
        )?;

        submit_one_shot(pool, device.graphics_queue(), |cmd| {
            record_layout_transition(
                &device,
                cmd,
                image.handle(),
                vk::ImageAspectFlags::COLOR,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            )?;

            let region = vk::BufferImageCopy::default()
                .buffer_offset(0)
                .buffer_row_length(0)
                .buffer_image_height(0)
                .image_subresource(
                    vk::ImageSubresourceLayers::default()
                        .aspect_mask(vk::ImageAspectFlags::COLOR)
                        .mip_level(0)
                        .base_array_layer(0)
                        .layer_count(1),
                )
                .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
                .image_extent(vk::Extent3D {
                    width,
                    height,
                    depth: 1,
                });

            unsafe {
                device.handle().cmd_copy_buffer_to_image(
                    cmd,
                    staging.handle(),
                    image.handle(),
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[region],
                );
            }

            record_layout_transition(
                &device,
                cmd,
                image.handle(),
                vk::ImageAspectFlags::COLOR,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            )
        })?;

        info!("Texture uploaded: {}x{} RGBA8", width, height);

        // Staging buffer dropped here, after the copy completed
        Ok(Self { image })
    }

    /// Returns the texture's image view handle.
    #[inline]
    pub fn view(&self) -> vk::ImageView {
        self.image.view()
    }

    /// Returns the texture's extent.
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.image.extent()
    }
}
