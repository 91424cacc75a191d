//! Uniform buffer object written once per frame slot.
//!
//! Must match `UniformBufferObject` in `shaders/src/shader.vert` (std140: three
//! column-major `mat4`s, no padding).

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Rotation speed of the animated model, in degrees per second.
pub const ROTATION_DEGREES_PER_SEC: f32 = 90.0;

/// Vertical field of view of the demo camera.
pub const FOV_Y_DEGREES: f32 = 45.0;

pub const Z_NEAR: f32 = 0.1;
pub const Z_FAR: f32 = 10.0;

/// Model, view and projection matrices.
///
/// # Memory Layout
///
/// - Offset 0: model (64 bytes)
/// - Offset 64: view (64 bytes)
/// - Offset 128: proj (64 bytes)
/// - Total size: 192 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct UniformBufferObject {
    pub model: Mat4,
    pub view: Mat4,
    pub proj: Mat4,
}

impl UniformBufferObject {
    /// Size of the struct in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Builds the transforms for `elapsed_secs` into the run.
    ///
    /// The model spins about Z when `animate` is set; the camera looks at the
    /// origin from (2, 2, 2) with Z up. `aspect` is width over height of the
    /// current extent.
    pub fn new(elapsed_secs: f32, aspect: f32, animate: bool) -> Self {
        let angle = if animate {
            (elapsed_secs * ROTATION_DEGREES_PER_SEC).to_radians()
        } else {
            0.0
        };

        let model = Mat4::from_rotation_z(angle);
        let view = Mat4::look_at_rh(Vec3::new(2.0, 2.0, 2.0), Vec3::ZERO, Vec3::Z);

        let mut proj = Mat4::perspective_rh(FOV_Y_DEGREES.to_radians(), aspect, Z_NEAR, Z_FAR);
        // Vulkan clip space has Y pointing down
        proj.y_axis.y *= -1.0;

        Self { model, view, proj }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Width over height, or 1.0 for a degenerate extent.
pub fn aspect_ratio(width: u32, height: u32) -> f32 {
    if width == 0 || height == 0 {
        1.0
    } else {
        width as f32 / height as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::offset_of;

    #[test]
    fn test_ubo_size() {
        // 3 Mat4 = 3 * 64
        assert_eq!(UniformBufferObject::SIZE, 192);
        assert_eq!(std::mem::align_of::<UniformBufferObject>(), 16);
    }

    #[test]
    fn test_ubo_field_offsets() {
        assert_eq!(offset_of!(UniformBufferObject, model), 0);
        assert_eq!(offset_of!(UniformBufferObject, view), 64);
        assert_eq!(offset_of!(UniformBufferObject, proj), 128);
    }

    #[test]
    fn test_static_model_is_identity() {
        let ubo = UniformBufferObject::new(3.7, 4.0 / 3.0, false);
        assert_eq!(ubo.model, Mat4::IDENTITY);
    }

    #[test]
    fn test_model_rotates_ninety_degrees_per_second() {
        let ubo = UniformBufferObject::new(1.0, 1.0, true);
        let rotated = ubo.model.transform_point3(Vec3::X);
        assert!((rotated - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_projection_flips_y() {
        let ubo = UniformBufferObject::new(0.0, 1.0, false);
        let reference = Mat4::perspective_rh(FOV_Y_DEGREES.to_radians(), 1.0, Z_NEAR, Z_FAR);
        assert_eq!(ubo.proj.y_axis.y, -reference.y_axis.y);
        assert_eq!(ubo.proj.x_axis.x, reference.x_axis.x);
    }

    #[test]
    fn test_aspect_ratio() {
        assert_eq!(aspect_ratio(800, 600), 800.0 / 600.0);
        assert_eq!(aspect_ratio(800, 0), 1.0);
    }

    #[test]
    fn test_as_bytes_len() {
        let ubo = UniformBufferObject::new(0.5, 1.5, true);
        assert_eq!(ubo.as_bytes().len(), UniformBufferObject::SIZE);
    }
}
