//! Ray traced sphere shaded from an input texture.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use compute_raytracer::DemoConfig;

fn main() {
    compute_raytracer::init_tracing();

    let config = DemoConfig::new("compute07 window", "compute07.comp")
        .with_window_size(384, 216)
        .with_input_texture("earth.jpg");

    compute_raytracer::launch(config);
}
