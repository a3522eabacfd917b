//! Texture sampler management.
//!
//! Samplers use linear filtering and repeat addressing on every axis.
//! Anisotropic filtering is optional; when enabled, the anisotropy level is
//! the device's reported maximum.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

/// Vulkan sampler wrapper.
///
/// Immutable after creation; one sampler serves every frame slot.
pub struct Sampler {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan sampler handle.
    sampler: vk::Sampler,
}

impl Sampler {
    /// Creates a sampler with linear filtering and repeat addressing.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device
    /// * `anisotropic_filter` - Enable anisotropic filtering at the
    ///   device's maximum supported level. The device feature must already
    ///   be enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if sampler creation fails.
    pub fn new(device: Arc<Device>, anisotropic_filter: bool) -> RhiResult<Self> {
        let max_anisotropy = if anisotropic_filter {
            device.properties().limits.max_sampler_anisotropy
        } else {
            1.0
        };

        let create_info = vk::SamplerCreateInfo::default()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .anisotropy_enable(anisotropic_filter)
            .max_anisotropy(max_anisotropy)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .mip_lod_bias(0.0)
            .min_lod(0.0)
            .max_lod(0.0);

        let sampler = unsafe { device.handle().create_sampler(&create_info, None)? };

        debug!(
            "Created sampler (anisotropy: {})",
            if anisotropic_filter {
                format!("{}x", max_anisotropy)
            } else {
                "off".to_string()
            }
        );

        Ok(Self { device, sampler })
    }

    /// Returns the Vulkan sampler handle.
    #[inline]
    pub fn handle(&self) -> vk::Sampler {
        self.sampler
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_sampler(self.sampler, None);
        }
        debug!("Destroyed sampler");
    }
}
