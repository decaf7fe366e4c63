use std::sync::Arc;

use vulkano::device::Device;
use vulkano::pipeline::compute::ComputePipelineCreateInfo;
use vulkano::pipeline::graphics::color_blend::{ColorBlendAttachmentState, ColorBlendState};
use vulkano::pipeline::graphics::input_assembly::{InputAssemblyState, PrimitiveTopology};
use vulkano::pipeline::graphics::multisample::MultisampleState;
use vulkano::pipeline::graphics::rasterization::RasterizationState;
use vulkano::pipeline::graphics::vertex_input::{Vertex, VertexDefinition};
use vulkano::pipeline::graphics::viewport::ViewportState;
use vulkano::pipeline::graphics::GraphicsPipelineCreateInfo;
use vulkano::pipeline::layout::PipelineDescriptorSetLayoutCreateInfo;
use vulkano::pipeline::{
    ComputePipeline, DynamicState, GraphicsPipeline, PipelineLayout,
    PipelineShaderStageCreateInfo,
};
use vulkano::render_pass::Subpass;
use vulkano::shader::{ShaderModule, ShaderModuleCreateInfo};

use crate::error::ShaderError;
use crate::surface::QuadVertex;

const ENTRY_POINT: &str = "main";

pub fn shader_module(
    device: &Arc<Device>,
    program: &str,
    words: &[u32],
) -> Result<Arc<ShaderModule>, ShaderError> {
    // SAFETY: `words` is SPIR-V produced by shaderc for a Vulkan 1.0 target.
    unsafe { ShaderModule::new(device.clone(), ShaderModuleCreateInfo::new(words)) }
        .map_err(|err| ShaderError::link(program, err))
}

fn entry_stage(
    program: &str,
    module: &Arc<ShaderModule>,
) -> Result<PipelineShaderStageCreateInfo, ShaderError> {
    let entry_point = module
        .entry_point(ENTRY_POINT)
        .ok_or_else(|| ShaderError::link(program, "missing `main` entry point"))?;
    Ok(PipelineShaderStageCreateInfo::new(entry_point))
}

fn layout_for(
    device: &Arc<Device>,
    program: &str,
    stages: &[PipelineShaderStageCreateInfo],
) -> Result<Arc<PipelineLayout>, ShaderError> {
    let create_info = PipelineDescriptorSetLayoutCreateInfo::from_stages(stages)
        .into_pipeline_layout_create_info(device.clone())
        .map_err(|err| ShaderError::link(program, format!("{err:?}")))?;
    PipelineLayout::new(device.clone(), create_info).map_err(|err| ShaderError::link(program, err))
}

pub fn compute(
    device: &Arc<Device>,
    program: &str,
    module: &Arc<ShaderModule>,
) -> Result<Arc<ComputePipeline>, ShaderError> {
    let stage = entry_stage(program, module)?;
    let layout = layout_for(device, program, &[stage.clone()])?;

    ComputePipeline::new(
        device.clone(),
        None,
        ComputePipelineCreateInfo::stage_layout(stage, layout),
    )
    .map_err(|err| ShaderError::link(program, err))
}

/// Graphics pipeline drawing the textured quad as a triangle strip.
pub fn display(
    device: &Arc<Device>,
    program: &str,
    vertex: &Arc<ShaderModule>,
    fragment: &Arc<ShaderModule>,
    subpass: Subpass,
) -> Result<Arc<GraphicsPipeline>, ShaderError> {
    let vertex_stage = entry_stage(program, vertex)?;
    let fragment_stage = entry_stage(program, fragment)?;

    let vertex_input_state = QuadVertex::per_vertex()
        .definition(&vertex_stage.entry_point.info().input_interface)
        .map_err(|err| ShaderError::link(program, err))?;

    let stages = [vertex_stage, fragment_stage];
    let layout = layout_for(device, program, &stages)?;

    GraphicsPipeline::new(
        device.clone(),
        None,
        GraphicsPipelineCreateInfo {
            stages: stages.into_iter().collect(),
            vertex_input_state: Some(vertex_input_state),
            input_assembly_state: Some(InputAssemblyState {
                topology: PrimitiveTopology::TriangleStrip,
                ..Default::default()
            }),
            viewport_state: Some(ViewportState::default()),
            rasterization_state: Some(RasterizationState::default()),
            multisample_state: Some(MultisampleState::default()),
            color_blend_state: Some(ColorBlendState::with_attachment_states(
                subpass.num_color_attachments(),
                ColorBlendAttachmentState::default(),
            )),
            dynamic_state: [DynamicState::Viewport].into_iter().collect(),
            subpass: Some(subpass.into()),
            ..GraphicsPipelineCreateInfo::layout(layout)
        },
    )
    .map_err(|err| ShaderError::link(program, err))
}
