//! Integration test for the staging upload protocol.
//!
//! Requires a live Vulkan implementation; skips cleanly when none is
//! available (no loader, no devices, or device creation fails).

use std::sync::Arc;

use ash::vk;

use viewer_rhi::buffer::{Buffer, BufferUsage};
use viewer_rhi::command::CommandPool;
use viewer_rhi::device::{Device, DeviceFeatureRequest};
use viewer_rhi::instance::Instance;
use viewer_rhi::physical_device::{PhysicalDeviceInfo, QueueFamilyIndices, Suitability};

/// Builds a logical device without a window surface.
///
/// Selection here is minimal on purpose: the first device with a graphics
/// queue family that accepts device creation wins. Surface-dependent
/// checks do not apply without a window.
fn create_headless_device() -> Option<(Instance, Arc<Device>)> {
    let instance = Instance::new(false, "rhi-tests").ok()?;

    let devices = unsafe { instance.handle().enumerate_physical_devices() }.ok()?;

    for device in devices {
        let properties = unsafe { instance.handle().get_physical_device_properties(device) };
        let features = unsafe { instance.handle().get_physical_device_features(device) };
        let queue_families = unsafe {
            instance
                .handle()
                .get_physical_device_queue_family_properties(device)
        };

        let graphics = queue_families.iter().position(|family| {
            family.queue_count > 0 && family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
        });
        let Some(graphics) = graphics else {
            continue;
        };
        let graphics = graphics as u32;

        let info = PhysicalDeviceInfo {
            device,
            properties,
            features,
            queue_families: QueueFamilyIndices {
                graphics_family: Some(graphics),
                present_family: Some(graphics),
            },
            suitability: Suitability {
                device_type: properties.device_type,
                max_image_dimension_2d: properties.limits.max_image_dimension2_d,
                queue_families_complete: true,
                extensions_supported: true,
                surface_adequate: true,
                supports_anisotropy: features.sampler_anisotropy == vk::TRUE,
            },
        };

        if let Ok(logical) = Device::new(&instance, &info, DeviceFeatureRequest::default()) {
            return Some((instance, logical));
        }
    }

    None
}

#[test]
fn staging_upload_round_trips_byte_identical() {
    let Some((_instance, device)) = create_headless_device() else {
        eprintln!("Skipping test: no usable Vulkan device");
        return;
    };

    let graphics = device.queue_families().graphics_family.unwrap();
    let pool = CommandPool::new_transient(device.clone(), graphics).unwrap();

    let data: Vec<u8> = (0u32..4096).map(|i| (i % 251) as u8).collect();

    let buffer =
        Buffer::new_device_local(device.clone(), &pool, BufferUsage::Vertex, &data).unwrap();
    assert_eq!(buffer.size(), data.len() as u64);

    let bytes = buffer.read_back(&pool).unwrap();
    assert_eq!(bytes, data);
}

#[test]
fn uniform_buffer_persistent_map_accepts_rewrites() {
    let Some((_instance, device)) = create_headless_device() else {
        eprintln!("Skipping test: no usable Vulkan device");
        return;
    };

    let buffer = Buffer::new(device.clone(), BufferUsage::Uniform, 256).unwrap();

    // The mapping persists across writes; no map/unmap per write
    for frame in 0u8..4 {
        let payload = vec![frame; 256];
        buffer.write_bytes(0, &payload).unwrap();
    }

    // Out-of-bounds writes are rejected
    let oversized = vec![0u8; 512];
    assert!(buffer.write_bytes(0, &oversized).is_err());
    assert!(buffer.write_bytes(128, &vec![0u8; 256]).is_err());
}
