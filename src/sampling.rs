//! Random vector helpers mirroring the ones used on the shader side.

use std::f32::consts::{PI, TAU};

use glam::Vec3;
use rand::Rng;

#[must_use]
pub fn degrees_to_radians(degrees: f32) -> f32 {
    degrees * PI / 180.0
}

/// Uniform sample in `[min, max)`.
pub fn random_in_range(rng: &mut impl Rng, min: f32, max: f32) -> f32 {
    rng.gen_range(min..max)
}

pub fn random_vec(rng: &mut impl Rng, min: f32, max: f32) -> Vec3 {
    Vec3::new(
        random_in_range(rng, min, max),
        random_in_range(rng, min, max),
        random_in_range(rng, min, max),
    )
}

/// Rejection sample strictly inside the unit sphere.
pub fn random_in_unit_sphere(rng: &mut impl Rng) -> Vec3 {
    loop {
        let v = random_vec(rng, -1.0, 1.0);
        if v.length_squared() < 1.0 {
            return v;
        }
    }
}

pub fn random_unit_vector(rng: &mut impl Rng) -> Vec3 {
    let a = random_in_range(rng, 0.0, TAU);
    let z = random_in_range(rng, -1.0, 1.0);
    let r = (1.0 - z * z).sqrt();
    Vec3::new(r * a.cos(), r * a.sin(), z)
}

/// Sample in the unit sphere flipped onto the side `normal` points to.
pub fn random_in_hemisphere(rng: &mut impl Rng, normal: Vec3) -> Vec3 {
    let v = random_in_unit_sphere(rng);
    if v.dot(normal) > 0.0 {
        v
    } else {
        -v
    }
}

/// Lens sample in the `z = 0` plane.
pub fn random_in_unit_disk(rng: &mut impl Rng) -> Vec3 {
    loop {
        let point = Vec3::new(
            random_in_range(rng, -1.0, 1.0),
            random_in_range(rng, -1.0, 1.0),
            0.0,
        );
        if point.length_squared() < 1.0 {
            return point;
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    const SAMPLES: usize = 10_000;

    #[test]
    fn degrees_convert_to_radians() {
        assert!((degrees_to_radians(180.0) - PI).abs() < 1e-6);
        assert!((degrees_to_radians(90.0) - PI / 2.0).abs() < 1e-6);
    }

    #[test]
    fn unit_sphere_samples_stay_inside() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..SAMPLES {
            assert!(random_in_unit_sphere(&mut rng).length_squared() < 1.0);
        }
    }

    #[test]
    fn hemisphere_samples_face_the_normal() {
        let mut rng = StdRng::seed_from_u64(11);
        let normal = Vec3::new(0.3, -0.5, 0.8).normalize();
        for _ in 0..SAMPLES {
            assert!(random_in_hemisphere(&mut rng, normal).dot(normal) >= 0.0);
        }
    }

    #[test]
    fn unit_vectors_have_unit_length() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1_000 {
            assert!((random_unit_vector(&mut rng).length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn disk_samples_are_flat_and_inside() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..1_000 {
            let p = random_in_unit_disk(&mut rng);
            assert_eq!(p.z, 0.0);
            assert!(p.length_squared() < 1.0);
        }
    }

    #[test]
    fn range_samples_respect_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1_000 {
            let v = random_vec(&mut rng, 0.5, 0.75);
            assert!(v.cmpge(Vec3::splat(0.5)).all() && v.cmplt(Vec3::splat(0.75)).all());
        }
    }
}
