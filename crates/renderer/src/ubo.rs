//! Uniform buffer object definitions for shaders.
//!
//! The structures must match the GLSL uniform block layouts exactly. All
//! use `#[repr(C)]` for predictable memory layout and implement `Pod` and
//! `Zeroable` for safe byte casting.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Model/view/projection transform uniform data.
///
/// Matches the vertex shader's binding 0 uniform block.
///
/// # Memory Layout
///
/// - Offset 0: model matrix (64 bytes)
/// - Offset 64: view matrix (64 bytes)
/// - Offset 128: projection matrix (64 bytes)
/// - Total size: 192 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TransformUbo {
    /// Model matrix (object to world space).
    pub model: Mat4,
    /// View matrix (world to view space).
    pub view: Mat4,
    /// Projection matrix (view to clip space), Y-flipped for Vulkan.
    pub proj: Mat4,
}

impl TransformUbo {
    /// Size of the struct in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Builds the transform for a model spinning about the Z axis.
    ///
    /// The model turns a quarter revolution per second of elapsed
    /// wall-clock time, viewed from a fixed diagonal eye point. The
    /// projection's Y axis is flipped to map GL-convention clip space onto
    /// Vulkan's.
    ///
    /// # Arguments
    ///
    /// * `elapsed_secs` - Elapsed wall-clock time in seconds
    /// * `aspect` - Current framebuffer aspect ratio (width / height)
    pub fn rotating(elapsed_secs: f32, aspect: f32) -> Self {
        let model = Mat4::from_rotation_z(elapsed_secs * 90.0_f32.to_radians());

        let view = Mat4::look_at_rh(Vec3::new(2.0, 2.0, 2.0), Vec3::ZERO, Vec3::Z);

        let mut proj = Mat4::perspective_rh(45.0_f32.to_radians(), aspect, 0.1, 10.0);
        proj.y_axis.y *= -1.0;

        Self { model, view, proj }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_ubo_size() {
        // 3 Mat4 = 3 * 64 = 192 bytes
        assert_eq!(TransformUbo::SIZE, 192);
    }

    #[test]
    fn test_transform_ubo_alignment() {
        // Mat4 requires 16-byte alignment on the GPU side
        assert_eq!(std::mem::align_of::<TransformUbo>(), 16);
    }

    #[test]
    fn test_rotating_model_starts_at_identity() {
        let ubo = TransformUbo::rotating(0.0, 4.0 / 3.0);
        assert_eq!(ubo.model, Mat4::IDENTITY);
    }

    #[test]
    fn test_rotating_quarter_turn_per_second() {
        let ubo = TransformUbo::rotating(1.0, 1.0);
        let expected = Mat4::from_rotation_z(90.0_f32.to_radians());
        assert!((ubo.model.x_axis - expected.x_axis).length() < 1e-6);
    }

    #[test]
    fn test_projection_is_y_flipped() {
        let ubo = TransformUbo::rotating(0.0, 16.0 / 9.0);
        assert!(ubo.proj.y_axis.y < 0.0);
    }

    #[test]
    fn test_ubo_pod_cast() {
        let ubo = TransformUbo::rotating(0.5, 1.5);
        let bytes: &[u8] = bytemuck::bytes_of(&ubo);
        assert_eq!(bytes.len(), TransformUbo::SIZE);
    }
}
