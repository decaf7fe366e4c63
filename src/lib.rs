#![deny(clippy::all)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

mod buffers;
pub mod camera;
pub mod config;
pub mod controls;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod frame_loop;
pub mod init;
mod pipeline;
pub mod present;
pub mod sampling;
pub mod scene;
pub mod shader;
pub mod surface;
pub mod texture;

pub use config::{DemoConfig, MediaPaths};
pub use error::AppError;

use std::sync::Arc;

use winit::event::{Event, WindowEvent};
use winit::event_loop::EventLoop;
use winit::window::Window;

use crate::dispatch::{ComputeStep, DispatchGrid};
use crate::frame::{GpuFrame, GpuResources};
use crate::frame_loop::{FrameLoop, LoopState};
use crate::init::context::VulkanoContext;
use crate::init::renderer::VulkanoWindowRenderer;
use crate::init::window::build_window;
use crate::present::PresentStep;
use crate::shader::{CompiledProgram, ProgramSources, ShaderCompiler, ShaderProgram};
use crate::surface::FrameSurface;
use crate::texture::{DecodedImage, InputImage};

/// A window running one compute program and showing its output.
pub struct ComputeApp {
    window: Arc<Window>,
    frame: GpuFrame,
}

impl ComputeApp {
    /// Allocates every resource up front. Nothing is created lazily once the
    /// frame loop runs.
    pub fn new(config: DemoConfig, event_loop: &EventLoop<()>) -> Result<Self, AppError> {
        let grid = DispatchGrid::for_extent(config.output_size);

        let window = build_window(event_loop, &config.window)?;
        let context = VulkanoContext::new(event_loop, &window)?;
        grid.validate(context.compute_limits().max_work_group_count)?;
        let renderer = VulkanoWindowRenderer::new(&context, &window, &config.window)?;

        let compiler = ShaderCompiler::new()?;
        let display = CompiledProgram::compile(
            &compiler,
            &ProgramSources::load_display(&config.media, &config.display_shaders)?,
        )?;
        let compute = CompiledProgram::compile(
            &compiler,
            &ProgramSources::load_compute(&config.media, &config.compute_shader)?,
        )?;

        let surface = FrameSurface::new(&context, config.output_size)?;
        let input_image = match config.input_texture_path() {
            Some(path) => Some(InputImage::upload(&context, &DecodedImage::open(&path)?)?),
            None => None,
        };
        let scene = config
            .scene
            .as_ref()
            .map(|scene| scene.upload(&context))
            .transpose()?;

        let mut compute_program = ShaderProgram::link(context.device(), &compute, None)?;
        let scene_uniforms = config
            .scene
            .as_ref()
            .map(crate::scene::Scene::uniforms)
            .unwrap_or_default();
        for (name, value) in scene_uniforms.iter().chain(&config.uniforms) {
            compute_program.set_uniform(name, *value);
        }

        let compute = ComputeStep::new(
            &context,
            compute_program,
            surface.output(),
            input_image.as_ref(),
            scene.as_ref(),
            grid,
        )?;
        let present = PresentStep::new(
            &context,
            renderer.swapchain_format(),
            &display,
            &surface,
            renderer.swapchain_image_views(),
        )?;

        tracing::info!("Demo `{}` ready", config.window.title);

        let frame = GpuFrame::new(
            context,
            GpuResources {
                renderer,
                surface,
                compute,
                present,
                input_image,
                scene,
            },
        );
        Ok(Self { window, frame })
    }

    #[must_use]
    pub const fn window(&self) -> &Arc<Window> {
        &self.window
    }

    /// Drives the frame loop until the window closes.
    ///
    /// Exits with code 0 on a normal close and 1 when a frame fails.
    pub fn run(self, event_loop: EventLoop<()>) -> ! {
        let Self { window, mut frame } = self;
        let mut frame_loop = FrameLoop::new();

        event_loop.run(move |event, _, control_flow| {
            control_flow.set_poll();
            frame.input_mut().handle_event(&event);

            match event {
                Event::WindowEvent {
                    event: WindowEvent::Resized(_),
                    window_id,
                } if window_id == window.id() => frame.resize(),
                Event::MainEventsCleared => match frame_loop.iterate(&mut frame) {
                    Ok(LoopState::Running) => (),
                    Ok(LoopState::Closing) => control_flow.set_exit(),
                    Err(err) => {
                        tracing::error!("Frame loop stopped: {err}");
                        control_flow.set_exit_with_code(1);
                    }
                },
                Event::LoopDestroyed => frame_loop.shutdown(&mut frame),
                _ => (),
            }
        })
    }
}

/// Builds the demo described by `config` and runs it.
///
/// Startup failures are logged and exit the process with code -1.
pub fn launch(config: DemoConfig) -> ! {
    let event_loop = EventLoop::new();
    match ComputeApp::new(config, &event_loop) {
        Ok(app) => app.run(event_loop),
        Err(err) => {
            tracing::error!("Startup failed: {err}");
            std::process::exit(-1)
        }
    }
}

/// Installs the log subscriber used by the demo binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_max_level(if cfg!(debug_assertions) {
            tracing::Level::TRACE
        } else {
            tracing::Level::INFO
        })
        .init();
}
