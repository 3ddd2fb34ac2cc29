//! Clip planes and the transform from view space into cube model space.
//!
//! A clip plane removes the part of the volume with negative signed distance.
//! The caller specifies planes in view space; geometry is clipped in the
//! cube's model space, so planes are carried through the inverse view matrix
//! and the axis-correction transform first.

use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VolspyError};

/// Model matrix of the volume cube: a 180° rotation about X that turns the
/// stack to the orientation microscopy viewers conventionally show.
pub const CUBE_MODEL: Mat4 = Mat4::from_cols(Vec4::X, Vec4::NEG_Y, Vec4::NEG_Z, Vec4::W);

/// Inverse of [`CUBE_MODEL`] (a -180° rotation about X).
pub const CUBE_ANTI_MODEL: Mat4 = Mat4::from_cols(Vec4::X, Vec4::NEG_Y, Vec4::NEG_Z, Vec4::W);

/// A plane `A*x + B*y + C*z + D = 0` with unit normal `(A, B, C)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipPlane {
    normal: Vec3,
    offset: f32,
}

impl ClipPlane {
    /// Creates a plane from its equation, normalizing so `(a, b, c)` is unit length.
    pub fn new(a: f32, b: f32, c: f32, d: f32) -> Result<Self> {
        let normal = Vec3::new(a, b, c);
        let len = normal.length();
        if !(len.is_finite() && len > f32::EPSILON) || !d.is_finite() {
            return Err(VolspyError::DegeneratePlane);
        }
        Ok(Self {
            normal: normal / len,
            offset: d / len,
        })
    }

    /// Creates a plane from an `[A, B, C, D]` array.
    pub fn from_array(plane: [f32; 4]) -> Result<Self> {
        Self::new(plane[0], plane[1], plane[2], plane[3])
    }

    /// Unit normal pointing into the kept half-space.
    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// Signed distance of the origin to the plane.
    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.normal.x, self.normal.y, self.normal.z, self.offset]
    }

    /// Signed distance of `point`; negative values are clipped away.
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.offset
    }

    /// Returns whether `point` lies in the kept half-space.
    pub fn is_kept(&self, point: Vec3) -> bool {
        self.signed_distance(point) >= 0.0
    }
}

/// Maps a view-space clip plane into cube model space.
///
/// The view origin and the point one unit along the plane normal are carried
/// through `CUBE_ANTI_MODEL * anti_view`. Their difference is the model-space
/// normal; the offset gains the scalar projection of the model origin's
/// displacement from the mapped view origin onto that normal, which keeps the
/// signed-distance convention under the composed transform.
pub fn view_plane_to_model(view_plane: &ClipPlane, anti_view: Mat4) -> Result<ClipPlane> {
    let view_to_model = |p: Vec4| {
        let m = CUBE_ANTI_MODEL * (anti_view * p);
        m / m.w
    };

    let p0 = view_to_model(Vec4::W);
    let p1 = view_to_model(view_plane.normal().extend(1.0));

    let normal = (p1 - p0).truncate();
    let len = normal.length();
    if !(len.is_finite() && len > f32::EPSILON) {
        return Err(VolspyError::DegeneratePlane);
    }

    let offset = view_plane.offset() + scalar_projection(-p0.truncate(), normal);

    Ok(ClipPlane {
        normal: normal / len,
        offset,
    })
}

/// Scalar projection of `a` onto `b`.
fn scalar_projection(a: Vec3, b: Vec3) -> f32 {
    a.dot(b) / b.length()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_normalization() {
        let plane = ClipPlane::new(0.0, 0.0, 2.0, 1.0).unwrap();
        assert_eq!(plane.normal(), Vec3::Z);
        assert!((plane.offset() - 0.5).abs() < 1e-6);
        assert_eq!(plane.to_array(), [0.0, 0.0, 1.0, 0.5]);
    }

    #[test]
    fn test_degenerate_plane() {
        assert!(matches!(
            ClipPlane::new(0.0, 0.0, 0.0, 1.0),
            Err(VolspyError::DegeneratePlane)
        ));
        assert!(ClipPlane::new(f32::NAN, 0.0, 1.0, 0.0).is_err());
    }

    #[test]
    fn test_signed_distance() {
        let plane = ClipPlane::from_array([0.0, 1.0, 0.0, -0.25]).unwrap();
        assert!((plane.signed_distance(Vec3::new(3.0, 0.25, -1.0))).abs() < 1e-6);
        assert!(plane.is_kept(Vec3::new(0.0, 1.0, 0.0)));
        assert!(!plane.is_kept(Vec3::ZERO));
    }

    #[test]
    fn test_axis_correction_is_self_inverse() {
        let product = CUBE_MODEL * CUBE_ANTI_MODEL;
        assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-6));
        let flipped = CUBE_MODEL.transform_point3(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(flipped, Vec3::new(1.0, -2.0, -3.0));
    }

    #[test]
    fn test_identity_view_flips_normal_into_model_space() {
        let view_plane = ClipPlane::from_array([0.0, 0.0, 1.0, 0.0]).unwrap();
        let model_plane = view_plane_to_model(&view_plane, Mat4::IDENTITY).unwrap();
        assert!(model_plane.normal().abs_diff_eq(Vec3::NEG_Z, 1e-6));
        assert!(model_plane.offset().abs() < 1e-6);
    }

    #[test]
    fn test_translated_view_offsets_plane() {
        // camera two units in front of the volume centre
        let view = Mat4::from_translation(Vec3::new(0.0, 0.0, -2.0));
        let anti_view = view.inverse();
        let view_plane = ClipPlane::from_array([0.0, 0.0, 1.0, 2.25]).unwrap();
        let model_plane = view_plane_to_model(&view_plane, anti_view).unwrap();

        assert!(model_plane.normal().abs_diff_eq(Vec3::NEG_Z, 1e-6));
        assert!((model_plane.offset() - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_model_plane_agrees_with_view_plane() {
        let view = Mat4::from_translation(Vec3::new(0.1, -0.2, -3.0))
            * Mat4::from_rotation_y(0.7)
            * Mat4::from_rotation_x(-0.3);
        let anti_view = view.inverse();
        let view_plane = ClipPlane::from_array([0.3, -0.5, 0.8, 2.9]).unwrap();
        let model_plane = view_plane_to_model(&view_plane, anti_view).unwrap();

        // any model-space point must have the same signed distance in both spaces
        for p in [
            Vec3::ZERO,
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(-0.5, 0.25, -0.1),
            Vec3::new(0.3, -0.4, 0.2),
        ] {
            let in_view = (view * CUBE_MODEL).transform_point3(p);
            let expected = view_plane.signed_distance(in_view);
            let actual = model_plane.signed_distance(p);
            assert!(
                (expected - actual).abs() < 1e-4,
                "distance mismatch at {p:?}: {expected} vs {actual}"
            );
        }
    }
}
