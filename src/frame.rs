use std::sync::Arc;

use vulkano::{
    buffer::Subbuffer,
    command_buffer::{
        allocator::StandardCommandBufferAllocator, AutoCommandBufferBuilder, CommandBufferUsage,
        PrimaryAutoCommandBuffer,
    },
    sync::GpuFuture,
};

use crate::controls::InputState;
use crate::dispatch::ComputeStep;
use crate::error::{FrameError, GpuError};
use crate::frame_loop::{ExitSignal, FrameStages};
use crate::init::context::VulkanoContext;
use crate::init::renderer::VulkanoWindowRenderer;
use crate::present::PresentStep;
use crate::scene::GpuHittable;
use crate::surface::FrameSurface;
use crate::texture::InputImage;

pub type CommandBuilder = AutoCommandBufferBuilder<
    PrimaryAutoCommandBuffer<Arc<StandardCommandBufferAllocator>>,
    Arc<StandardCommandBufferAllocator>,
>;

pub(crate) fn one_time_builder(context: &VulkanoContext) -> Result<CommandBuilder, GpuError> {
    Ok(AutoCommandBufferBuilder::primary(
        context.command_buffer_allocator(),
        context.queue().queue_family_index(),
        CommandBufferUsage::OneTimeSubmit,
    )?)
}

/// Command buffer of the current frame.
///
/// The present step only accepts a `Synchronized` recording, so the compute
/// writes are always ordered before the sampled read. The barrier itself is
/// inserted by the auto command buffer when the output image changes usage.
enum Recording {
    Compute(CommandBuilder),
    Synchronized(CommandBuilder),
}

/// Everything released by teardown.
pub struct GpuResources {
    pub renderer: VulkanoWindowRenderer,
    pub surface: FrameSurface,
    pub compute: ComputeStep,
    pub present: PresentStep,
    pub input_image: Option<InputImage>,
    pub scene: Option<Subbuffer<[GpuHittable]>>,
}

/// Runs the frame steps on the device.
pub struct GpuFrame {
    context: VulkanoContext,
    resources: Option<GpuResources>,
    input: InputState,
    recording: Option<Recording>,
    submitted: Option<Box<dyn GpuFuture>>,
}

impl GpuFrame {
    #[must_use]
    pub fn new(context: VulkanoContext, resources: GpuResources) -> Self {
        Self {
            context,
            resources: Some(resources),
            input: InputState::default(),
            recording: None,
            submitted: None,
        }
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    pub fn resize(&mut self) {
        if let Some(resources) = self.resources.as_mut() {
            resources.renderer.resize();
        }
    }

    fn resources(&mut self) -> Result<&mut GpuResources, FrameError> {
        self.resources
            .as_mut()
            .ok_or(FrameError::OutOfOrder("resources already released"))
    }
}

impl FrameStages for GpuFrame {
    type Error = FrameError;

    fn dispatch(&mut self) -> Result<(), FrameError> {
        let mut builder = one_time_builder(&self.context)?;
        self.resources()?.compute.record(&mut builder)?;
        self.recording = Some(Recording::Compute(builder));
        Ok(())
    }

    fn barrier(&mut self) -> Result<(), FrameError> {
        match self.recording.take() {
            Some(Recording::Compute(builder)) => {
                self.recording = Some(Recording::Synchronized(builder));
                Ok(())
            }
            _ => Err(FrameError::OutOfOrder("barrier without a dispatch")),
        }
    }

    fn present(&mut self) -> Result<(), FrameError> {
        let Some(Recording::Synchronized(mut builder)) = self.recording.take() else {
            return Err(FrameError::OutOfOrder("present before the barrier"));
        };
        let queue = self.context.queue().clone();
        let resources = self.resources()?;

        let Some(acquired) = resources.renderer.acquire()? else {
            // No image this frame; the recorded dispatch is dropped with the builder.
            return Ok(());
        };
        if acquired.recreated {
            resources
                .present
                .rebuild_framebuffers(resources.renderer.swapchain_image_views())?;
        }

        resources.present.record(
            &mut builder,
            acquired.image_index,
            resources.renderer.swapchain_image_size(),
        )?;
        let command_buffer = builder.build().map_err(GpuError::from)?;

        let future = acquired
            .future
            .then_execute(queue, command_buffer)
            .map_err(GpuError::from)?;
        self.submitted = Some(future.boxed());
        Ok(())
    }

    fn poll_input(&mut self) -> Option<ExitSignal> {
        self.input.take_exit_signal()
    }

    fn swap_buffers(&mut self) -> Result<(), FrameError> {
        let Some(future) = self.submitted.take() else {
            return Ok(());
        };
        self.resources()?.renderer.present(future)?;
        Ok(())
    }

    fn teardown(&mut self) {
        self.recording = None;
        let Some(mut resources) = self.resources.take() else {
            return;
        };
        if let Some(future) = self.submitted.take() {
            if let Err(err) = resources.renderer.present(future) {
                tracing::warn!("Dropping the last frame: {err}");
            }
        }
        if let Err(err) = resources.renderer.wait_idle() {
            tracing::error!("Failed to wait for the device: {err}");
        }
        drop(resources);
        tracing::debug!("GPU resources released");
    }
}
