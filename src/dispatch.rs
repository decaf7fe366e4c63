use std::sync::Arc;

use vulkano::{
    buffer::Subbuffer,
    descriptor_set::{PersistentDescriptorSet, WriteDescriptorSet},
    pipeline::{ComputePipeline, Pipeline, PipelineBindPoint},
};

use crate::error::{AppError, DispatchError, GpuError, ResourceError, ShaderError};
use crate::frame::CommandBuilder;
use crate::init::context::VulkanoContext;
use crate::scene::GpuHittable;
use crate::shader::ShaderProgram;
use crate::surface::OutputImage;
use crate::texture::InputImage;

pub const OUTPUT_BINDING: u32 = 0;
pub const INPUT_BINDING: u32 = 1;
pub const SCENE_BINDING: u32 = 2;

/// Work group counts of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchGrid {
    groups: [u32; 3],
}

impl DispatchGrid {
    /// One work group per output pixel.
    #[must_use]
    pub const fn for_extent(extent: [u32; 2]) -> Self {
        Self {
            groups: [extent[0], extent[1], 1],
        }
    }

    #[must_use]
    pub const fn groups(&self) -> [u32; 3] {
        self.groups
    }

    /// Rejects grids the device cannot run. Never clamps.
    pub fn validate(&self, max_work_group_count: [u32; 3]) -> Result<(), DispatchError> {
        if self.groups.contains(&0) {
            return Err(DispatchError::Empty { grid: self.groups });
        }
        if self
            .groups
            .iter()
            .zip(max_work_group_count)
            .any(|(groups, limit)| *groups > limit)
        {
            return Err(DispatchError::ExceedsDeviceLimit {
                grid: self.groups,
                limit: max_work_group_count,
            });
        }
        Ok(())
    }
}

/// Runs the compute program once over the output image.
pub struct ComputeStep {
    program: ShaderProgram,
    pipeline: Arc<ComputePipeline>,
    descriptor_set: Arc<PersistentDescriptorSet>,
    grid: DispatchGrid,
}

impl ComputeStep {
    /// Binds every resource the compute program declares in set 0.
    pub fn new(
        context: &VulkanoContext,
        program: ShaderProgram,
        output: &OutputImage,
        input: Option<&InputImage>,
        scene: Option<&Subbuffer<[GpuHittable]>>,
        grid: DispatchGrid,
    ) -> Result<Self, AppError> {
        let pipeline = program
            .compute_pipeline()
            .cloned()
            .ok_or_else(|| ShaderError::link(program.name(), "no compute stage"))?;
        let set_layout = pipeline
            .layout()
            .set_layouts()
            .first()
            .cloned()
            .ok_or_else(|| ShaderError::link(program.name(), "no descriptor set 0"))?;
        let declares = |binding: u32| set_layout.bindings().contains_key(&binding);
        let missing = |binding: u32, resource: &'static str| ResourceError::MissingBinding {
            program: program.name().to_string(),
            binding,
            resource,
        };

        let mut writes = Vec::new();
        if declares(OUTPUT_BINDING) {
            writes.push(WriteDescriptorSet::image_view(
                OUTPUT_BINDING,
                output.view().clone(),
            ));
        }
        if declares(INPUT_BINDING) {
            let input = input.ok_or_else(|| missing(INPUT_BINDING, "input texture"))?;
            writes.push(WriteDescriptorSet::image_view(
                INPUT_BINDING,
                input.view().clone(),
            ));
        }
        if declares(SCENE_BINDING) {
            let scene = scene.ok_or_else(|| missing(SCENE_BINDING, "scene"))?;
            writes.push(WriteDescriptorSet::buffer(SCENE_BINDING, scene.clone()));
        }

        let descriptor_set = PersistentDescriptorSet::new(
            context.descriptor_set_allocator(),
            set_layout,
            writes,
            [],
        )
        .map_err(GpuError::from)?;

        let [x, y, z] = grid.groups();
        tracing::debug!("Compute step `{}` dispatches {x}x{y}x{z}", program.name());

        Ok(Self {
            program,
            pipeline,
            descriptor_set,
            grid,
        })
    }

    pub fn record(&self, builder: &mut CommandBuilder) -> Result<(), GpuError> {
        builder
            .bind_pipeline_compute(self.pipeline.clone())?
            .bind_descriptor_sets(
                PipelineBindPoint::Compute,
                self.pipeline.layout().clone(),
                0,
                self.descriptor_set.clone(),
            )?;
        self.program.push_compute_uniforms(builder)?;
        builder.dispatch(self.grid.groups())?;
        Ok(())
    }
}
