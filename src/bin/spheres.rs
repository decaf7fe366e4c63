//! Random sphere scene seen through a thin-lens camera.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use compute_raytracer::camera::{LensCamera, LensSettings};
use compute_raytracer::scene::Scene;
use compute_raytracer::DemoConfig;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;

const WIDTH: u32 = 640;
const HEIGHT: u32 = 360;
const SEED: u64 = 2024;

fn main() {
    compute_raytracer::init_tracing();

    #[allow(clippy::cast_precision_loss)]
    let settings = LensSettings {
        position: Vec3::new(13.0, 2.0, 3.0),
        target: Vec3::ZERO,
        up: Vec3::Y,
        vfov_degrees: 20.0,
        aspect_ratio: WIDTH as f32 / HEIGHT as f32,
        aperture: 0.1,
        focus_distance: 10.0,
    };
    let camera = match LensCamera::new(&settings) {
        Ok(camera) => camera,
        Err(err) => {
            tracing::error!("Invalid camera: {err}");
            std::process::exit(-1);
        }
    };

    let scene = Scene::random(&mut StdRng::seed_from_u64(SEED));

    let config = camera.uniforms().into_iter().fold(
        DemoConfig::new("spheres window", "spheres.comp")
            .with_window_size(WIDTH, HEIGHT)
            .with_scene(scene),
        |config, (name, value)| config.with_uniform(name, value),
    );

    compute_raytracer::launch(config);
}
