//! Compute shader reading an input texture.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use compute_raytracer::DemoConfig;

fn main() {
    compute_raytracer::init_tracing();

    let config = DemoConfig::new("compute05 window", "compute05.comp")
        .with_window_size(384, 216)
        .with_input_texture("earth.jpg");

    compute_raytracer::launch(config);
}
