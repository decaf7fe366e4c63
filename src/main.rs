//! Compute shader writing every pixel of a 640x360 image.

// Hide console window on Windows in release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use compute_raytracer::DemoConfig;

fn main() {
    compute_raytracer::init_tracing();

    let config =
        DemoConfig::new("Compute Shader Window", "compute02.comp").with_window_size(640, 360);

    compute_raytracer::launch(config);
}
