//! Physical device (GPU) probing and selection.
//!
//! This module enumerates the available GPUs, scores them, and selects the
//! most suitable one.
//!
//! # Overview
//!
//! Selection is score-based: discrete GPUs with complete queue families get
//! a large fixed bonus, and every device earns points proportional to its
//! maximum 2D image dimension (a proxy for texture and render-target
//! quality). Hard requirements force a score of zero: a zero-scoring device
//! is never selectable. An optional interactive mode lists the suitable
//! devices and lets the operator pick one by index, falling back to the
//! automatic scoring on invalid input.

use std::ffi::CStr;

use ash::vk;
use tracing::{debug, info, warn};

use crate::error::RhiError;
use crate::swapchain::SwapchainSupportDetails;

/// Required device extensions. Presentation needs the swapchain extension
/// at minimum.
pub const REQUIRED_DEVICE_EXTENSIONS: &[&CStr] = &[ash::khr::swapchain::NAME];

/// Fixed score bonus for discrete GPUs with complete queue families.
const DISCRETE_GPU_BONUS: u32 = 1000;

/// Queue family indices for rendering and presentation.
///
/// The same index may serve both roles; a device is usable only once both
/// resolve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    /// Index of the queue family that supports graphics operations.
    pub graphics_family: Option<u32>,
    /// Index of the queue family that supports presentation to a surface.
    pub present_family: Option<u32>,
}

impl QueueFamilyIndices {
    /// Checks if the required queue families are available.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.graphics_family.is_some() && self.present_family.is_some()
    }

    /// Returns the unique queue family indices as a vector.
    ///
    /// Used at logical device creation to avoid requesting duplicate queues
    /// when graphics and present resolve to the same family.
    pub fn unique_families(&self) -> Vec<u32> {
        let mut families = Vec::with_capacity(2);

        if let Some(graphics) = self.graphics_family {
            families.push(graphics);
        }
        if let Some(present) = self.present_family
            && !families.contains(&present)
        {
            families.push(present);
        }

        families
    }
}

/// Capability snapshot used by the scoring function.
///
/// Kept separate from the Vulkan handles so the scoring arithmetic is plain
/// data in, number out.
#[derive(Clone, Copy, Debug)]
pub struct Suitability {
    /// Device class (discrete, integrated, virtual, CPU).
    pub device_type: vk::PhysicalDeviceType,
    /// Maximum supported 2D image dimension.
    pub max_image_dimension_2d: u32,
    /// Both graphics and present queue families resolved.
    pub queue_families_complete: bool,
    /// All required device extensions are present.
    pub extensions_supported: bool,
    /// The surface reports at least one format and one present mode.
    pub surface_adequate: bool,
    /// The device supports anisotropic sampler filtering.
    pub supports_anisotropy: bool,
}

/// Information about a physical device (GPU).
///
/// Immutable once enumerated; candidates other than the selected one are
/// discarded after selection.
#[derive(Clone)]
pub struct PhysicalDeviceInfo {
    /// Vulkan physical device handle.
    pub device: vk::PhysicalDevice,
    /// Device properties (name, limits, API version, etc.).
    pub properties: vk::PhysicalDeviceProperties,
    /// Supported device features.
    pub features: vk::PhysicalDeviceFeatures,
    /// Queue family indices for rendering and presentation.
    pub queue_families: QueueFamilyIndices,
    /// Capability snapshot for scoring.
    pub suitability: Suitability,
}

impl PhysicalDeviceInfo {
    /// Returns the device name as a string.
    pub fn device_name(&self) -> &str {
        unsafe {
            CStr::from_ptr(self.properties.device_name.as_ptr())
                .to_str()
                .unwrap_or("Unknown Device")
        }
    }

    /// Returns a human-readable string for the device type.
    pub fn device_type_name(&self) -> &'static str {
        match self.properties.device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => "Discrete GPU",
            vk::PhysicalDeviceType::INTEGRATED_GPU => "Integrated GPU",
            vk::PhysicalDeviceType::VIRTUAL_GPU => "Virtual GPU",
            vk::PhysicalDeviceType::CPU => "CPU",
            _ => "Other",
        }
    }
}

impl std::fmt::Debug for PhysicalDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicalDeviceInfo")
            .field("name", &self.device_name())
            .field("type", &self.device_type_name())
            .field("queue_families", &self.queue_families)
            .finish()
    }
}

/// Enumerates all physical devices with their queried capabilities.
///
/// Nothing is filtered here; unsuitable devices simply score zero later.
///
/// # Errors
///
/// Returns [`RhiError::NoSuitableGpu`] if no Vulkan-capable device exists,
/// or the underlying error if enumeration itself fails.
pub fn enumerate_candidates(
    instance: &ash::Instance,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> Result<Vec<PhysicalDeviceInfo>, RhiError> {
    let devices = unsafe { instance.enumerate_physical_devices()? };

    if devices.is_empty() {
        warn!("No Vulkan-capable GPUs found");
        return Err(RhiError::NoSuitableGpu);
    }

    info!("Found {} GPU(s)", devices.len());

    let candidates = devices
        .into_iter()
        .map(|device| query_device(instance, device, surface, surface_loader))
        .collect();

    Ok(candidates)
}

/// Selects the most suitable physical device for rendering.
///
/// The highest-scoring candidate wins; ties are broken by enumeration order
/// (first wins). With `choose_on_startup` set, the suitable candidates are
/// listed on stdout and an index is read from stdin; malformed or
/// out-of-range input logs a warning and falls back to the automatic
/// scoring; it never fails the selection.
///
/// # Arguments
///
/// * `instance` - The Vulkan instance
/// * `surface` - The window surface for present-support checking
/// * `surface_loader` - The surface extension loader
/// * `require_anisotropy` - Disqualify devices without sampler anisotropy
/// * `choose_on_startup` - Offer the interactive selection prompt
///
/// # Errors
///
/// Returns [`RhiError::NoSuitableGpu`] if every candidate scores zero.
pub fn select_physical_device(
    instance: &ash::Instance,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
    require_anisotropy: bool,
    choose_on_startup: bool,
) -> Result<PhysicalDeviceInfo, RhiError> {
    let candidates = enumerate_candidates(instance, surface, surface_loader)?;

    let scores: Vec<u32> = candidates
        .iter()
        .map(|info| {
            let score = rate_device(&info.suitability, require_anisotropy);
            debug!(
                "GPU '{}' ({}) - Score: {}",
                info.device_name(),
                info.device_type_name(),
                score
            );
            score
        })
        .collect();

    let suitable: Vec<usize> = (0..candidates.len()).filter(|&i| scores[i] > 0).collect();

    if suitable.is_empty() {
        warn!("No suitable GPU found with required capabilities");
        return Err(RhiError::NoSuitableGpu);
    }

    if choose_on_startup {
        println!("Select GPU to run the application:");
        for (display_index, &candidate_index) in suitable.iter().enumerate() {
            println!(
                "({}) {} [{}]",
                display_index,
                candidates[candidate_index].device_name(),
                candidates[candidate_index].device_type_name()
            );
        }

        let mut line = String::new();
        if std::io::stdin().read_line(&mut line).is_ok()
            && let Some(display_index) = parse_gpu_selection(&line, suitable.len())
        {
            let selected = candidates[suitable[display_index]].clone();
            info!(
                "Proceeding with operator-selected GPU: '{}'",
                selected.device_name()
            );
            return Ok(selected);
        }
        warn!("Invalid GPU selection, falling back to automatic scoring");
    }

    // Highest score wins; strict comparison keeps the first of equal scores.
    let best = pick_best_index(&scores).ok_or(RhiError::NoSuitableGpu)?;
    let selected = candidates[best].clone();

    info!(
        "Selected GPU: '{}' ({}) - Score: {}",
        selected.device_name(),
        selected.device_type_name(),
        scores[best]
    );

    Ok(selected)
}

/// Queries the properties, features, queue families and support flags of a
/// single device.
fn query_device(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> PhysicalDeviceInfo {
    let properties = unsafe { instance.get_physical_device_properties(device) };
    let features = unsafe { instance.get_physical_device_features(device) };

    let queue_families = find_queue_families(instance, device, surface, surface_loader);
    let extensions_supported = check_extension_support(instance, device);

    // Swapchain adequacy is only meaningful once the swapchain extension
    // exists; the query would fail without it.
    let surface_adequate = extensions_supported
        && SwapchainSupportDetails::query(device, surface, surface_loader)
            .map(|support| support.is_adequate())
            .unwrap_or(false);

    let suitability = Suitability {
        device_type: properties.device_type,
        max_image_dimension_2d: properties.limits.max_image_dimension2_d,
        queue_families_complete: queue_families.is_complete(),
        extensions_supported,
        surface_adequate,
        supports_anisotropy: features.sampler_anisotropy == vk::TRUE,
    };

    PhysicalDeviceInfo {
        device,
        properties,
        features,
        queue_families,
        suitability,
    }
}

/// Finds graphics and presentation queue family indices.
fn find_queue_families(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> QueueFamilyIndices {
    let queue_families = unsafe { instance.get_physical_device_queue_family_properties(device) };

    let mut indices = QueueFamilyIndices::default();

    for (i, family) in queue_families.iter().enumerate() {
        let i = i as u32;

        if family.queue_count == 0 {
            continue;
        }

        if indices.graphics_family.is_none()
            && family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
        {
            indices.graphics_family = Some(i);
        }

        if indices.present_family.is_none() {
            let present_support = unsafe {
                surface_loader
                    .get_physical_device_surface_support(device, i, surface)
                    .unwrap_or(false)
            };

            if present_support {
                indices.present_family = Some(i);
            }
        }

        if indices.is_complete() {
            break;
        }
    }

    indices
}

/// Checks that all required device extensions are available.
fn check_extension_support(instance: &ash::Instance, device: vk::PhysicalDevice) -> bool {
    let available = match unsafe { instance.enumerate_device_extension_properties(device) } {
        Ok(extensions) => extensions,
        Err(_) => return false,
    };

    REQUIRED_DEVICE_EXTENSIONS.iter().all(|&required| {
        available.iter().any(|ext| {
            let name = unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) };
            name == required
        })
    })
}

/// Rates a device based on its capability snapshot.
///
/// Discrete GPUs with complete queue families earn a fixed bonus, and every
/// device earns its maximum 2D image dimension on top. Hard requirements
/// force the score to zero: incomplete queue families, missing extensions,
/// an inadequate surface, or (when required) missing anisotropic filtering.
pub fn rate_device(suitability: &Suitability, require_anisotropy: bool) -> u32 {
    let mut score = 0u32;

    if suitability.device_type == vk::PhysicalDeviceType::DISCRETE_GPU
        && suitability.queue_families_complete
    {
        score += DISCRETE_GPU_BONUS;
    }

    // Maximum possible size of textures affects graphics quality
    score += suitability.max_image_dimension_2d;

    if !suitability.queue_families_complete
        || !suitability.extensions_supported
        || !suitability.surface_adequate
    {
        return 0;
    }

    if require_anisotropy && !suitability.supports_anisotropy {
        return 0;
    }

    score
}

/// Returns the index of the highest-scoring candidate, or `None` when every
/// score is zero. Ties go to the earlier index.
pub fn pick_best_index(scores: &[u32]) -> Option<usize> {
    let mut best: Option<usize> = None;

    for (i, &score) in scores.iter().enumerate() {
        if score == 0 {
            continue;
        }
        match best {
            Some(b) if scores[b] >= score => {}
            _ => best = Some(i),
        }
    }

    best
}

/// Parses the operator's device selection.
///
/// Accepts only a whole non-negative number within bounds. Returns `None`
/// for anything else; the caller falls back to automatic selection.
pub fn parse_gpu_selection(input: &str, count: usize) -> Option<usize> {
    let index: usize = input.trim().parse().ok()?;
    (index < count).then_some(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suitable(device_type: vk::PhysicalDeviceType, max_dim: u32) -> Suitability {
        Suitability {
            device_type,
            max_image_dimension_2d: max_dim,
            queue_families_complete: true,
            extensions_supported: true,
            surface_adequate: true,
            supports_anisotropy: true,
        }
    }

    #[test]
    fn test_queue_family_indices_complete() {
        let indices = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: Some(0),
        };
        assert!(indices.is_complete());

        let indices = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: None,
        };
        assert!(!indices.is_complete());

        assert!(!QueueFamilyIndices::default().is_complete());
    }

    #[test]
    fn test_unique_families_deduplicates() {
        let shared = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: Some(0),
        };
        assert_eq!(shared.unique_families(), vec![0]);

        let split = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: Some(2),
        };
        assert_eq!(split.unique_families(), vec![0, 2]);
    }

    #[test]
    fn test_rate_device_discrete_bonus() {
        let discrete = suitable(vk::PhysicalDeviceType::DISCRETE_GPU, 4096);
        assert_eq!(rate_device(&discrete, false), 1000 + 4096);

        let integrated = suitable(vk::PhysicalDeviceType::INTEGRATED_GPU, 4096);
        assert_eq!(rate_device(&integrated, false), 4096);
    }

    #[test]
    fn test_rate_device_disqualifiers() {
        let mut s = suitable(vk::PhysicalDeviceType::DISCRETE_GPU, 4096);
        s.queue_families_complete = false;
        assert_eq!(rate_device(&s, false), 0);

        let mut s = suitable(vk::PhysicalDeviceType::DISCRETE_GPU, 4096);
        s.extensions_supported = false;
        assert_eq!(rate_device(&s, false), 0);

        let mut s = suitable(vk::PhysicalDeviceType::DISCRETE_GPU, 4096);
        s.surface_adequate = false;
        assert_eq!(rate_device(&s, false), 0);
    }

    #[test]
    fn test_rate_device_anisotropy_requirement() {
        let mut s = suitable(vk::PhysicalDeviceType::DISCRETE_GPU, 4096);
        s.supports_anisotropy = false;

        // Only disqualifying when anisotropic filtering is required
        assert_eq!(rate_device(&s, false), 1000 + 4096);
        assert_eq!(rate_device(&s, true), 0);
    }

    #[test]
    fn test_integrated_can_outscore_discrete() {
        // Regression check on the additive formula: a discrete device with
        // maxDim 4096 scores 5096, an integrated one with maxDim 8192
        // scores 8192 - the integrated device wins.
        let discrete = suitable(vk::PhysicalDeviceType::DISCRETE_GPU, 4096);
        let integrated = suitable(vk::PhysicalDeviceType::INTEGRATED_GPU, 8192);

        let scores = [
            rate_device(&discrete, false),
            rate_device(&integrated, false),
        ];
        assert_eq!(scores, [5096, 8192]);
        assert_eq!(pick_best_index(&scores), Some(1));
    }

    #[test]
    fn test_pick_best_index_never_selects_zero() {
        assert_eq!(pick_best_index(&[0, 0, 0]), None);
        assert_eq!(pick_best_index(&[]), None);
        assert_eq!(pick_best_index(&[0, 5, 0]), Some(1));
    }

    #[test]
    fn test_pick_best_index_first_wins_ties() {
        assert_eq!(pick_best_index(&[7, 7, 7]), Some(0));
        assert_eq!(pick_best_index(&[3, 7, 7]), Some(1));
    }

    #[test]
    fn test_parse_gpu_selection() {
        assert_eq!(parse_gpu_selection("1\n", 3), Some(1));
        assert_eq!(parse_gpu_selection("  0  ", 3), Some(0));

        // Out of range
        assert_eq!(parse_gpu_selection("3", 3), None);

        // Not a number; a trailing-garbage number must not be accepted
        assert_eq!(parse_gpu_selection("abc", 3), None);
        assert_eq!(parse_gpu_selection("1abc", 3), None);
        assert_eq!(parse_gpu_selection("-1", 3), None);
        assert_eq!(parse_gpu_selection("", 3), None);
    }
}
