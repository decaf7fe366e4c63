use std::sync::Arc;

use vulkano::swapchain::PresentMode;
use winit::dpi::{LogicalPosition, LogicalSize};
use winit::event_loop::EventLoopWindowTarget;
use winit::window::{Window, WindowBuilder};

use crate::error::InitError;

/// Creates the demo window. The GPU context is created against it afterwards.
pub fn build_window<T>(
    event_loop: &EventLoopWindowTarget<T>,
    descriptor: &WindowDescriptor,
) -> Result<Arc<Window>, InitError> {
    let mut builder = WindowBuilder::new()
        .with_title(&descriptor.title)
        .with_inner_size(LogicalSize::new(descriptor.width, descriptor.height))
        .with_resizable(descriptor.resizable);

    if let Some(position) = descriptor.position {
        builder = builder.with_position(LogicalPosition::new(
            f64::from(position[0]),
            f64::from(position[1]),
        ));
    }

    let constraints = descriptor.resize_constraints.check_constraints();
    builder = builder.with_min_inner_size(LogicalSize::new(
        constraints.min_width,
        constraints.min_height,
    ));
    if constraints.max_width < u32::MAX && constraints.max_height < u32::MAX {
        builder = builder.with_max_inner_size(LogicalSize::new(
            constraints.max_width,
            constraints.max_height,
        ));
    }

    let window = builder.build(event_loop)?;

    if let Some(name) = window.current_monitor().and_then(|monitor| monitor.name()) {
        tracing::info!("Window created on monitor {}", name);
    }

    Ok(Arc::new(window))
}

#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Clone)]
pub struct WindowDescriptor {
    pub width: u32,
    pub height: u32,
    pub position: Option<[f32; 2]>,
    pub resize_constraints: WindowResizeConstraints,
    pub title: String,
    /// Falls back to `Fifo` when the surface does not support it.
    pub present_mode: PresentMode,
    pub resizable: bool,
}

impl Default for WindowDescriptor {
    fn default() -> Self {
        Self {
            title: "Compute".to_string(),
            width: 384,
            height: 216,
            position: None,
            resize_constraints: WindowResizeConstraints::default(),
            present_mode: PresentMode::Fifo,
            resizable: true,
        }
    }
}

#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowResizeConstraints {
    pub min_width: u32,
    pub min_height: u32,
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for WindowResizeConstraints {
    fn default() -> Self {
        Self {
            min_width: 1,
            min_height: 1,
            max_width: u32::MAX,
            max_height: u32::MAX,
        }
    }
}

impl WindowResizeConstraints {
    /// Clamps the bounds so that `1 <= min <= max` on both axes.
    #[must_use]
    pub fn check_constraints(&self) -> Self {
        let min_width = self.min_width.max(1);
        let min_height = self.min_height.max(1);
        let mut max_width = self.max_width;
        let mut max_height = self.max_height;
        if max_width < min_width {
            tracing::debug!(
                "The given maximum width {} is smaller than the minimum width {}",
                max_width,
                min_width
            );
            max_width = min_width;
        }
        if max_height < min_height {
            tracing::debug!(
                "The given maximum height {} is smaller than the minimum height {}",
                max_height,
                min_height
            );
            max_height = min_height;
        }
        Self {
            min_width,
            min_height,
            max_width,
            max_height,
        }
    }
}
