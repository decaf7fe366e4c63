use glam::Vec3;
use rand::Rng;
use vulkano::buffer::{BufferContents, BufferUsage, Subbuffer};

use crate::error::GpuError;
use crate::init::context::VulkanoContext;
use crate::sampling::{random_in_range, random_vec};
use crate::shader::UniformValue;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Sphere { center: Vec3, radius: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Material {
    Lambert { albedo: Vec3 },
    Metal { albedo: Vec3, roughness: f32 },
    Dielectric { refractive_index: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hittable {
    pub shape: Shape,
    pub material: Material,
}

impl Hittable {
    #[must_use]
    pub const fn sphere(center: Vec3, radius: f32, material: Material) -> Self {
        Self {
            shape: Shape::Sphere { center, radius },
            material,
        }
    }
}

/// Storage-buffer record of one hittable, laid out for std430.
///
/// Fields of the inactive material stay zero.
#[derive(BufferContents, Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct GpuHittable {
    pub sphere_center: [f32; 4],
    pub lambert_albedo: [f32; 4],
    pub metal_albedo: [f32; 4],
    /// 0: sphere.
    pub hittable_type: i32,
    pub sphere_radius: f32,
    /// 0: lambert, 1: metal, 2: dielectric.
    pub material_type: i32,
    pub metal_roughness: f32,
    pub dielectric_ref_idx: f32,
    pub _padding: [f32; 3],
}

pub const SPHERE: i32 = 0;
pub const LAMBERT: i32 = 0;
pub const METAL: i32 = 1;
pub const DIELECTRIC: i32 = 2;

impl From<&Hittable> for GpuHittable {
    fn from(hittable: &Hittable) -> Self {
        let mut record = Self::default();
        match hittable.shape {
            Shape::Sphere { center, radius } => {
                record.hittable_type = SPHERE;
                record.sphere_center = center.extend(0.0).to_array();
                record.sphere_radius = radius;
            }
        }
        match hittable.material {
            Material::Lambert { albedo } => {
                record.material_type = LAMBERT;
                record.lambert_albedo = albedo.extend(0.0).to_array();
            }
            Material::Metal { albedo, roughness } => {
                record.material_type = METAL;
                record.metal_albedo = albedo.extend(0.0).to_array();
                record.metal_roughness = roughness;
            }
            Material::Dielectric { refractive_index } => {
                record.material_type = DIELECTRIC;
                record.dielectric_ref_idx = refractive_index;
            }
        }
        record
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub hittables: Vec<Hittable>,
}

impl Scene {
    /// Ground, three large spheres and a grid of small randomized ones.
    pub fn random(rng: &mut impl Rng) -> Self {
        let mut hittables = vec![Hittable::sphere(
            Vec3::new(0.0, -1000.0, 0.0),
            1000.0,
            Material::Lambert {
                albedo: Vec3::splat(0.5),
            },
        )];

        for a in -4..4 {
            for b in -4..4 {
                #[allow(clippy::cast_precision_loss)]
                let center = Vec3::new(
                    a as f32 + 0.9 * random_in_range(rng, 0.0, 1.0),
                    0.2,
                    b as f32 + 0.9 * random_in_range(rng, 0.0, 1.0),
                );
                if (center - Vec3::new(4.0, 0.2, 0.0)).length() <= 0.9 {
                    continue;
                }

                let choice = random_in_range(rng, 0.0, 1.0);
                let material = if choice < 0.8 {
                    Material::Lambert {
                        albedo: random_vec(rng, 0.0, 1.0) * random_vec(rng, 0.0, 1.0),
                    }
                } else if choice < 0.95 {
                    Material::Metal {
                        albedo: random_vec(rng, 0.5, 1.0),
                        roughness: random_in_range(rng, 0.0, 0.5),
                    }
                } else {
                    Material::Dielectric {
                        refractive_index: 1.5,
                    }
                };
                hittables.push(Hittable::sphere(center, 0.2, material));
            }
        }

        hittables.extend([
            Hittable::sphere(
                Vec3::new(0.0, 1.0, 0.0),
                1.0,
                Material::Dielectric {
                    refractive_index: 1.5,
                },
            ),
            Hittable::sphere(
                Vec3::new(-4.0, 1.0, 0.0),
                1.0,
                Material::Lambert {
                    albedo: Vec3::new(0.4, 0.2, 0.1),
                },
            ),
            Hittable::sphere(
                Vec3::new(4.0, 1.0, 0.0),
                1.0,
                Material::Metal {
                    albedo: Vec3::new(0.7, 0.6, 0.5),
                    roughness: 0.0,
                },
            ),
        ]);

        Self { hittables }
    }

    #[must_use]
    pub fn records(&self) -> Vec<GpuHittable> {
        self.hittables.iter().map(GpuHittable::from).collect()
    }

    /// Number of records the shader should read.
    #[must_use]
    pub fn uniforms(&self) -> Vec<(String, UniformValue)> {
        let count = i32::try_from(self.hittables.len()).unwrap_or(i32::MAX);
        vec![("hittable_count".to_string(), count.into())]
    }

    /// Stages the records into a device-local storage buffer.
    ///
    /// An empty scene still gets a single zeroed record so the binding is valid.
    pub fn upload(&self, context: &VulkanoContext) -> Result<Subbuffer<[GpuHittable]>, GpuError> {
        let mut records = self.records();
        if records.is_empty() {
            records.push(GpuHittable::default());
        }
        tracing::debug!("Uploading {} hittables", self.hittables.len());
        crate::buffers::upload_to_device(context, records, BufferUsage::STORAGE_BUFFER)
    }
}

#[cfg(test)]
mod tests {
    use std::mem::{offset_of, size_of};

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn record_layout_matches_the_shader_struct() {
        assert_eq!(size_of::<GpuHittable>(), 80);
        assert_eq!(offset_of!(GpuHittable, lambert_albedo), 16);
        assert_eq!(offset_of!(GpuHittable, metal_albedo), 32);
        assert_eq!(offset_of!(GpuHittable, hittable_type), 48);
        assert_eq!(offset_of!(GpuHittable, sphere_radius), 52);
        assert_eq!(offset_of!(GpuHittable, material_type), 56);
        assert_eq!(offset_of!(GpuHittable, metal_roughness), 60);
        assert_eq!(offset_of!(GpuHittable, dielectric_ref_idx), 64);
    }

    #[test]
    fn records_carry_only_the_active_material() {
        let metal = Hittable::sphere(
            Vec3::new(1.0, 2.0, 3.0),
            0.5,
            Material::Metal {
                albedo: Vec3::splat(0.8),
                roughness: 0.3,
            },
        );
        let record = GpuHittable::from(&metal);

        assert_eq!(record.hittable_type, SPHERE);
        assert_eq!(record.sphere_center, [1.0, 2.0, 3.0, 0.0]);
        assert_eq!(record.sphere_radius, 0.5);
        assert_eq!(record.material_type, METAL);
        assert_eq!(record.metal_albedo, [0.8, 0.8, 0.8, 0.0]);
        assert_eq!(record.metal_roughness, 0.3);
        assert_eq!(record.lambert_albedo, [0.0; 4]);
        assert_eq!(record.dielectric_ref_idx, 0.0);

        let glass = GpuHittable::from(&Hittable::sphere(
            Vec3::ZERO,
            1.0,
            Material::Dielectric {
                refractive_index: 1.5,
            },
        ));
        assert_eq!(glass.material_type, DIELECTRIC);
        assert_eq!(glass.dielectric_ref_idx, 1.5);
    }

    #[test]
    fn random_scene_is_reproducible_and_well_formed() {
        let scene = Scene::random(&mut StdRng::seed_from_u64(42));
        let again = Scene::random(&mut StdRng::seed_from_u64(42));
        assert_eq!(scene, again);

        // Ground plus the three large spheres are always present.
        assert!(scene.hittables.len() >= 4);
        for hittable in &scene.hittables {
            let Shape::Sphere { radius, .. } = hittable.shape;
            assert!(radius > 0.0);
            if let Material::Metal { roughness, .. } = hittable.material {
                assert!((0.0..0.5).contains(&roughness));
            }
        }
    }

    #[test]
    fn hittable_count_uniform_follows_the_scene() {
        let scene = Scene {
            hittables: vec![Hittable::sphere(
                Vec3::ZERO,
                1.0,
                Material::Lambert { albedo: Vec3::ONE },
            )],
        };
        assert_eq!(
            scene.uniforms(),
            vec![("hittable_count".to_string(), UniformValue::Int(1))]
        );
    }
}
