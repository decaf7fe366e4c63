use glam::Vec3;
use thiserror::Error;

use crate::sampling::degrees_to_radians;
use crate::shader::UniformValue;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera position and target coincide")]
    NoViewDirection,
    #[error("up vector is parallel to the view direction")]
    DegenerateUp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LensSettings {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub vfov_degrees: f32,
    pub aspect_ratio: f32,
    pub aperture: f32,
    pub focus_distance: f32,
}

/// Thin-lens camera: the viewport spans `horizontal` × `vertical` starting at
/// `lower_left_corner` on the focus plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LensCamera {
    origin: Vec3,
    horizontal: Vec3,
    vertical: Vec3,
    lower_left_corner: Vec3,
    u: Vec3,
    v: Vec3,
    w: Vec3,
    lens_radius: f32,
}

impl LensCamera {
    pub fn new(settings: &LensSettings) -> Result<Self, CameraError> {
        let w = (settings.position - settings.target)
            .try_normalize()
            .ok_or(CameraError::NoViewDirection)?;
        let u = settings
            .up
            .cross(w)
            .try_normalize()
            .ok_or(CameraError::DegenerateUp)?;
        let v = w.cross(u);

        let half_height = (degrees_to_radians(settings.vfov_degrees) / 2.0).tan();
        let half_width = settings.aspect_ratio * half_height;
        let focus = settings.focus_distance;
        let origin = settings.position;

        Ok(Self {
            origin,
            horizontal: 2.0 * half_width * focus * u,
            vertical: 2.0 * half_height * focus * v,
            lower_left_corner: origin - half_width * focus * u - half_height * focus * v - focus * w,
            u,
            v,
            w,
            lens_radius: settings.aperture / 2.0,
        })
    }

    #[must_use]
    pub const fn origin(&self) -> Vec3 {
        self.origin
    }

    #[must_use]
    pub const fn horizontal(&self) -> Vec3 {
        self.horizontal
    }

    #[must_use]
    pub const fn vertical(&self) -> Vec3 {
        self.vertical
    }

    #[must_use]
    pub const fn lower_left_corner(&self) -> Vec3 {
        self.lower_left_corner
    }

    #[must_use]
    pub const fn basis(&self) -> [Vec3; 3] {
        [self.u, self.v, self.w]
    }

    #[must_use]
    pub const fn lens_radius(&self) -> f32 {
        self.lens_radius
    }

    /// Push-constant values read by the sphere shader.
    #[must_use]
    pub fn uniforms(&self) -> Vec<(String, UniformValue)> {
        [
            ("camera_origin", UniformValue::from(self.origin)),
            ("camera_lower_left_corner", self.lower_left_corner.into()),
            ("camera_horizontal", self.horizontal.into()),
            ("camera_vertical", self.vertical.into()),
            ("camera_u", self.u.into()),
            ("camera_v", self.v.into()),
            ("lens_radius", self.lens_radius.into()),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn square_settings() -> LensSettings {
        LensSettings {
            position: Vec3::ZERO,
            target: Vec3::NEG_Z,
            up: Vec3::Y,
            vfov_degrees: 90.0,
            aspect_ratio: 1.0,
            aperture: 0.0,
            focus_distance: 1.0,
        }
    }

    #[test]
    fn basis_is_orthonormal() {
        let camera = LensCamera::new(&square_settings()).unwrap();
        let [u, v, w] = camera.basis();

        for axis in [u, v, w] {
            assert!((axis.length() - 1.0).abs() < EPSILON);
        }
        assert!(u.dot(v).abs() < EPSILON);
        assert!(u.dot(w).abs() < EPSILON);
        assert!(v.dot(w).abs() < EPSILON);
        assert!(u.abs_diff_eq(Vec3::X, EPSILON));
        assert!(v.abs_diff_eq(Vec3::Y, EPSILON));
        assert!(w.abs_diff_eq(Vec3::Z, EPSILON));
    }

    #[test]
    fn viewport_is_symmetric_about_the_view_axis() {
        let camera = LensCamera::new(&square_settings()).unwrap();
        let center =
            camera.lower_left_corner() + camera.horizontal() / 2.0 + camera.vertical() / 2.0;
        let upper_right = camera.lower_left_corner() + camera.horizontal() + camera.vertical();

        assert!(center.abs_diff_eq(Vec3::NEG_Z, EPSILON));
        assert!(camera
            .lower_left_corner()
            .abs_diff_eq(Vec3::new(-1.0, -1.0, -1.0), EPSILON));
        assert!(upper_right.abs_diff_eq(Vec3::new(1.0, 1.0, -1.0), EPSILON));
        assert_eq!(camera.lens_radius(), 0.0);
    }

    #[test]
    fn focus_distance_and_aperture_scale_the_lens() {
        let camera = LensCamera::new(&LensSettings {
            aspect_ratio: 2.0,
            aperture: 0.5,
            focus_distance: 3.0,
            ..square_settings()
        })
        .unwrap();

        assert!(camera.horizontal().abs_diff_eq(Vec3::X * 12.0, EPSILON));
        assert!(camera.vertical().abs_diff_eq(Vec3::Y * 6.0, EPSILON));
        assert_eq!(camera.lens_radius(), 0.25);
    }

    #[test]
    fn degenerate_setups_are_rejected() {
        let same_point = LensSettings {
            target: Vec3::ZERO,
            ..square_settings()
        };
        assert_eq!(
            LensCamera::new(&same_point).unwrap_err(),
            CameraError::NoViewDirection
        );

        let parallel_up = LensSettings {
            up: Vec3::NEG_Z,
            ..square_settings()
        };
        assert_eq!(
            LensCamera::new(&parallel_up).unwrap_err(),
            CameraError::DegenerateUp
        );
    }

    #[test]
    fn exposes_every_shader_uniform() {
        let camera = LensCamera::new(&square_settings()).unwrap();
        let uniforms = camera.uniforms();
        let names = uniforms.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>();

        assert!(names.contains(&"camera_origin"));
        assert!(names.contains(&"lens_radius"));
        assert_eq!(names.len(), 7);
    }
}
