use std::sync::Arc;

use vulkano::{
    buffer::Subbuffer,
    command_buffer::{RenderPassBeginInfo, SubpassBeginInfo, SubpassContents, SubpassEndInfo},
    descriptor_set::{PersistentDescriptorSet, WriteDescriptorSet},
    device::Device,
    format::Format,
    image::view::ImageView,
    pipeline::{graphics::viewport::Viewport, GraphicsPipeline, Pipeline, PipelineBindPoint},
    render_pass::{Framebuffer, FramebufferCreateInfo, RenderPass, Subpass},
};

use crate::error::{AppError, GpuError, ShaderError};
use crate::frame::CommandBuilder;
use crate::init::context::VulkanoContext;
use crate::shader::{CompiledProgram, ShaderProgram};
use crate::surface::{FrameSurface, QuadVertex, QUAD_VERTICES};

const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Draws the output image onto the swapchain through the display program.
pub struct PresentStep {
    program: ShaderProgram,
    pipeline: Arc<GraphicsPipeline>,
    render_pass: Arc<RenderPass>,
    framebuffers: Vec<Arc<Framebuffer>>,
    descriptor_set: Arc<PersistentDescriptorSet>,
    quad: Subbuffer<[QuadVertex]>,
}

fn create_render_pass(device: &Arc<Device>, format: Format) -> Result<Arc<RenderPass>, GpuError> {
    Ok(vulkano::single_pass_renderpass!(
        device.clone(),
        attachments: {
            color: {
                format: format,
                samples: 1,
                load_op: Clear,
                store_op: Store,
            },
        },
        pass: {
            color: [color],
            depth_stencil: {},
        },
    )?)
}

impl PresentStep {
    pub fn new(
        context: &VulkanoContext,
        swapchain_format: Format,
        display: &CompiledProgram,
        surface: &FrameSurface,
        swapchain_views: &[Arc<ImageView>],
    ) -> Result<Self, AppError> {
        let render_pass = create_render_pass(context.device(), swapchain_format)?;
        let subpass = Subpass::from(render_pass.clone(), 0)
            .ok_or_else(|| ShaderError::link(display.name(), "render pass has no subpass"))?;

        let program = ShaderProgram::link(context.device(), display, Some(subpass))?;
        let pipeline = program
            .display_pipeline()
            .cloned()
            .ok_or_else(|| ShaderError::link(program.name(), "no display stages"))?;
        let set_layout = pipeline
            .layout()
            .set_layouts()
            .first()
            .cloned()
            .ok_or_else(|| ShaderError::link(program.name(), "no descriptor set 0"))?;

        let output = surface.output();
        let descriptor_set = PersistentDescriptorSet::new(
            context.descriptor_set_allocator(),
            set_layout,
            [WriteDescriptorSet::image_view_sampler(
                0,
                output.view().clone(),
                output.sampler().clone(),
            )],
            [],
        )
        .map_err(GpuError::from)?;

        let framebuffers = create_framebuffers(&render_pass, swapchain_views)?;

        Ok(Self {
            program,
            pipeline,
            render_pass,
            framebuffers,
            descriptor_set,
            quad: surface.quad().clone(),
        })
    }

    /// Called after the swapchain was recreated.
    pub fn rebuild_framebuffers(&mut self, swapchain_views: &[Arc<ImageView>]) -> Result<(), GpuError> {
        self.framebuffers = create_framebuffers(&self.render_pass, swapchain_views)?;
        Ok(())
    }

    pub fn record(
        &self,
        builder: &mut CommandBuilder,
        image_index: u32,
        extent: [u32; 2],
    ) -> Result<(), GpuError> {
        let framebuffer = self.framebuffers[image_index as usize].clone();

        #[allow(clippy::cast_precision_loss)]
        let viewport = Viewport {
            offset: [0.0, 0.0],
            extent: [extent[0] as f32, extent[1] as f32],
            depth_range: 0.0..=1.0,
        };

        builder
            .begin_render_pass(
                RenderPassBeginInfo {
                    clear_values: vec![Some(CLEAR_COLOR.into())],
                    ..RenderPassBeginInfo::framebuffer(framebuffer)
                },
                SubpassBeginInfo {
                    contents: SubpassContents::Inline,
                    ..Default::default()
                },
            )?
            .set_viewport(0, [viewport].into_iter().collect())?
            .bind_pipeline_graphics(self.pipeline.clone())?
            .bind_descriptor_sets(
                PipelineBindPoint::Graphics,
                self.pipeline.layout().clone(),
                0,
                self.descriptor_set.clone(),
            )?
            .bind_vertex_buffers(0, self.quad.clone())?;
        self.program.push_display_uniforms(builder)?;
        #[allow(clippy::cast_possible_truncation)]
        builder
            .draw(QUAD_VERTICES.len() as u32, 1, 0, 0)?
            .end_render_pass(SubpassEndInfo::default())?;
        Ok(())
    }
}

fn create_framebuffers(
    render_pass: &Arc<RenderPass>,
    swapchain_views: &[Arc<ImageView>],
) -> Result<Vec<Arc<Framebuffer>>, GpuError> {
    swapchain_views
        .iter()
        .map(|view| {
            Framebuffer::new(
                render_pass.clone(),
                FramebufferCreateInfo {
                    attachments: vec![view.clone()],
                    ..Default::default()
                },
            )
            .map_err(GpuError::from)
        })
        .collect()
}
