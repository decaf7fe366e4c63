use std::sync::Arc;

use vulkano::{
    format::Format,
    image::{view::ImageView, ImageUsage},
    swapchain::{
        self, PresentMode, Surface, SurfaceInfo, Swapchain, SwapchainCreateInfo,
        SwapchainPresentInfo,
    },
    sync::{self, GpuFuture},
    Validated, VulkanError,
};
use winit::window::Window;

use crate::error::{GpuError, InitError};
use crate::init::context::VulkanoContext;
use crate::init::window::WindowDescriptor;

const PREFERRED_FORMATS: [Format; 2] = [Format::B8G8R8A8_UNORM, Format::R8G8B8A8_UNORM];

/// A swapchain image ready to be rendered to.
pub struct Acquired {
    pub future: Box<dyn GpuFuture>,
    pub image_index: u32,
    /// The swapchain was rebuilt before this image was acquired.
    pub recreated: bool,
}

#[allow(clippy::module_name_repetitions)]
pub struct VulkanoWindowRenderer {
    window: Arc<Window>,
    queue: Arc<vulkano::device::Queue>,
    swapchain: Arc<Swapchain>,
    final_views: Vec<Arc<ImageView>>,
    recreate_swapchain: bool,
    previous_frame_end: Option<Box<dyn GpuFuture>>,
    image_index: u32,
}

impl VulkanoWindowRenderer {
    pub fn new(
        context: &VulkanoContext,
        window: &Arc<Window>,
        descriptor: &WindowDescriptor,
    ) -> Result<Self, InitError> {
        let (swapchain, final_views) = Self::create_swapchain(context, window, descriptor)?;

        tracing::debug!(
            "Swapchain created ({:?}, {} images)",
            swapchain.image_format(),
            final_views.len()
        );

        Ok(Self {
            window: window.clone(),
            queue: context.queue().clone(),
            swapchain,
            final_views,
            recreate_swapchain: false,
            previous_frame_end: Some(sync::now(context.device().clone()).boxed()),
            image_index: 0,
        })
    }

    fn create_swapchain(
        context: &VulkanoContext,
        window: &Arc<Window>,
        window_descriptor: &WindowDescriptor,
    ) -> Result<(Arc<Swapchain>, Vec<Arc<ImageView>>), InitError> {
        let physical_device = context.device().physical_device();
        let surface: &Arc<Surface> = context.surface();
        let surface_capabilities =
            physical_device.surface_capabilities(surface, SurfaceInfo::default())?;

        let formats = physical_device.surface_formats(surface, SurfaceInfo::default())?;
        let image_format = PREFERRED_FORMATS
            .into_iter()
            .find(|preferred| formats.iter().any(|(format, _)| format == preferred))
            .or_else(|| formats.first().map(|(format, _)| *format))
            .ok_or(InitError::NoSurfaceFormat)?;

        let present_mode = if physical_device
            .surface_present_modes(surface, SurfaceInfo::default())?
            .any(|p| p == window_descriptor.present_mode)
        {
            window_descriptor.present_mode
        } else {
            const FALLBACK_PRESENT_MODE: PresentMode = PresentMode::Fifo;
            tracing::warn!(
                "Requested present mode {:?} not supported, falling back to {:?}",
                window_descriptor.present_mode,
                FALLBACK_PRESENT_MODE
            );
            FALLBACK_PRESENT_MODE
        };

        let min_image_count = surface_capabilities
            .max_image_count
            .map_or(surface_capabilities.min_image_count + 1, |max| {
                (surface_capabilities.min_image_count + 1).min(max)
            });
        let composite_alpha = surface_capabilities
            .supported_composite_alpha
            .into_iter()
            .next()
            .ok_or(InitError::NoSurfaceFormat)?;

        let (swapchain, images) = Swapchain::new(
            context.device().clone(),
            surface.clone(),
            SwapchainCreateInfo {
                min_image_count,
                image_format,
                image_extent: window.inner_size().into(),
                image_usage: ImageUsage::COLOR_ATTACHMENT,
                composite_alpha,
                present_mode,
                ..Default::default()
            },
        )?;

        let final_views = images
            .into_iter()
            .map(ImageView::new_default)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((swapchain, final_views))
    }

    #[must_use]
    pub fn swapchain_format(&self) -> Format {
        self.swapchain.image_format()
    }

    #[must_use]
    pub fn swapchain_image_size(&self) -> [u32; 2] {
        self.swapchain.image_extent()
    }

    #[must_use]
    pub fn swapchain_image_views(&self) -> &[Arc<ImageView>] {
        &self.final_views
    }

    pub fn resize(&mut self) {
        self.recreate_swapchain = true;
    }

    /// Begins a frame.
    ///
    /// Returns `None` when no image can be rendered this frame: the window is
    /// minimized or the swapchain went out of date while acquiring.
    pub fn acquire(&mut self) -> Result<Option<Acquired>, GpuError> {
        if let Some(previous) = self.previous_frame_end.as_mut() {
            previous.cleanup_finished();
        }

        let mut recreated = false;
        if self.recreate_swapchain {
            if !self.recreate_swapchain_and_views()? {
                return Ok(None);
            }
            recreated = true;
        }

        let (image_index, suboptimal, acquire_future) =
            match swapchain::acquire_next_image(self.swapchain.clone(), None)
                .map_err(Validated::unwrap)
            {
                Ok(r) => r,
                Err(VulkanError::OutOfDate) => {
                    tracing::debug!("Swapchain out of date, skipping frame");
                    self.recreate_swapchain = true;
                    return Ok(None);
                }
                Err(e) => return Err(GpuError::Vulkan(Validated::Error(e))),
            };

        self.recreate_swapchain |= suboptimal;
        self.image_index = image_index;

        let previous = self
            .previous_frame_end
            .take()
            .unwrap_or_else(|| sync::now(self.queue.device().clone()).boxed());

        Ok(Some(Acquired {
            future: previous.join(acquire_future).boxed(),
            image_index,
            recreated,
        }))
    }

    /// Finishes the frame by presenting the acquired image and waiting for it.
    pub fn present(&mut self, after_future: Box<dyn GpuFuture>) -> Result<(), GpuError> {
        let future = after_future
            .then_swapchain_present(
                self.queue.clone(),
                SwapchainPresentInfo::swapchain_image_index(
                    self.swapchain.clone(),
                    self.image_index,
                ),
            )
            .then_signal_fence_and_flush();

        match future.map_err(Validated::unwrap) {
            Ok(future) => {
                future.wait(None).map_err(GpuError::from)?;
                self.previous_frame_end = Some(future.boxed());
                Ok(())
            }
            Err(VulkanError::OutOfDate) => {
                self.recreate_swapchain = true;
                self.previous_frame_end =
                    Some(sync::now(self.queue.device().clone()).boxed());
                Ok(())
            }
            Err(e) => {
                self.previous_frame_end =
                    Some(sync::now(self.queue.device().clone()).boxed());
                Err(GpuError::Vulkan(Validated::Error(e)))
            }
        }
    }

    /// Blocks until every submitted frame has finished on the device.
    pub fn wait_idle(&mut self) -> Result<(), GpuError> {
        if let Some(previous) = self.previous_frame_end.take() {
            previous.then_signal_fence_and_flush()?.wait(None)?;
        }
        Ok(())
    }

    /// Returns `false` when the window has no area to present to.
    fn recreate_swapchain_and_views(&mut self) -> Result<bool, GpuError> {
        let image_extent: [u32; 2] = self.window.inner_size().into();

        if image_extent.contains(&0) {
            return Ok(false);
        }

        let (new_swapchain, new_images) = self.swapchain.recreate(SwapchainCreateInfo {
            image_extent,
            ..self.swapchain.create_info()
        })?;

        self.swapchain = new_swapchain;
        self.final_views = new_images
            .into_iter()
            .map(ImageView::new_default)
            .collect::<Result<Vec<_>, _>>()?;
        self.recreate_swapchain = false;

        tracing::debug!("Swapchain recreated at {}x{}", image_extent[0], image_extent[1]);
        Ok(true)
    }
}
