mod compile;
mod reflect;
mod source;
mod uniform;

use std::fmt;
use std::sync::Arc;

use vulkano::device::Device;
use vulkano::pipeline::{ComputePipeline, GraphicsPipeline, Pipeline, PipelineLayout};
use vulkano::render_pass::Subpass;
use vulkano::ValidationError;

pub use compile::{CompiledProgram, CompiledStage, ShaderCompiler};
pub use reflect::{push_constant_layout, ReflectError};
pub use source::{ProgramSources, ShaderSource};
pub use uniform::{
    UniformBlock, UniformKind, UniformLayout, UniformSlot, UniformValue, UniformWrite,
};

use crate::error::ShaderError;
use crate::frame::CommandBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
            Self::Compute => "compute",
        })
    }
}

/// Push-constant values of one pipeline, pushed whole on every record.
struct Bound<P> {
    pipeline: Arc<P>,
    uniforms: UniformBlock,
}

impl<P: Pipeline> Bound<P> {
    fn new(pipeline: Arc<P>, layout: UniformLayout) -> Self {
        let ranges = pipeline
            .layout()
            .push_constant_ranges()
            .iter()
            .map(|range| range.offset..range.offset + range.size)
            .collect::<Vec<_>>();
        Self {
            uniforms: UniformBlock::new(layout, ranges),
            pipeline,
        }
    }
}

fn push_uniforms(
    builder: &mut CommandBuilder,
    layout: &Arc<PipelineLayout>,
    uniforms: &UniformBlock,
) -> Result<(), Box<ValidationError>> {
    for (offset, word) in uniforms.words() {
        builder.push_constants(layout.clone(), offset, word)?;
    }
    Ok(())
}

/// A linked program: a compute pipeline, a display pipeline, or both.
pub struct ShaderProgram {
    name: String,
    compute: Option<Bound<ComputePipeline>>,
    display: Option<Bound<GraphicsPipeline>>,
}

impl ShaderProgram {
    /// Creates the device objects for every compiled stage.
    ///
    /// Display stages need the subpass they will be drawn in. Either every
    /// pipeline is created or none is.
    pub fn link(
        device: &Arc<Device>,
        compiled: &CompiledProgram,
        subpass: Option<Subpass>,
    ) -> Result<Self, ShaderError> {
        let name = compiled.name().to_string();
        let module = |stage: &CompiledStage| crate::pipeline::shader_module(device, &name, &stage.words);

        let display = if compiled.has_display_stages() {
            let uniforms = compiled.display_uniforms()?;
            let subpass = subpass
                .ok_or_else(|| ShaderError::link(&name, "display stages need a render subpass"))?;
            let (Some(vertex), Some(fragment)) = (
                compiled.stage(ShaderStage::Vertex),
                compiled.stage(ShaderStage::Fragment),
            ) else {
                return Err(ShaderError::link(&name, "incomplete display stages"));
            };
            let pipeline = crate::pipeline::display(
                device,
                &name,
                &module(vertex)?,
                &module(fragment)?,
                subpass,
            )?;
            Some(Bound::new(pipeline, uniforms))
        } else {
            None
        };

        let compute = match compiled.stage(ShaderStage::Compute) {
            Some(stage) => {
                let pipeline = crate::pipeline::compute(device, &name, &module(stage)?)?;
                Some(Bound::new(pipeline, stage.uniforms.clone()))
            }
            None => None,
        };

        if compute.is_none() && display.is_none() {
            return Err(ShaderError::link(&name, "no stages to link"));
        }
        tracing::debug!("Linked program `{name}`");
        Ok(Self {
            name,
            compute,
            display,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn compute_pipeline(&self) -> Option<&Arc<ComputePipeline>> {
        self.compute.as_ref().map(|bound| &bound.pipeline)
    }

    #[must_use]
    pub fn display_pipeline(&self) -> Option<&Arc<GraphicsPipeline>> {
        self.display.as_ref().map(|bound| &bound.pipeline)
    }

    /// Writes a uniform into every pipeline of the program that declares it.
    ///
    /// Unknown names and mismatched types are logged and skipped.
    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) -> UniformWrite {
        set_in_blocks(
            &self.name,
            self.compute
                .iter_mut()
                .map(|bound| &mut bound.uniforms)
                .chain(self.display.iter_mut().map(|bound| &mut bound.uniforms)),
            name,
            value.into(),
        )
    }

    pub(crate) fn push_compute_uniforms(
        &self,
        builder: &mut CommandBuilder,
    ) -> Result<(), Box<ValidationError>> {
        match &self.compute {
            Some(bound) => push_uniforms(builder, bound.pipeline.layout(), &bound.uniforms),
            None => Ok(()),
        }
    }

    pub(crate) fn push_display_uniforms(
        &self,
        builder: &mut CommandBuilder,
    ) -> Result<(), Box<ValidationError>> {
        match &self.display {
            Some(bound) => push_uniforms(builder, bound.pipeline.layout(), &bound.uniforms),
            None => Ok(()),
        }
    }
}

fn set_in_blocks<'a>(
    program: &str,
    blocks: impl Iterator<Item = &'a mut UniformBlock>,
    name: &str,
    value: UniformValue,
) -> UniformWrite {
    let mut outcome = UniformWrite::Unresolved;
    for block in blocks.filter(|block| block.declares(name)) {
        match block.set(name, value) {
            UniformWrite::Written => outcome = UniformWrite::Written,
            other if outcome == UniformWrite::Unresolved => outcome = other,
            _ => {}
        }
    }
    if outcome == UniformWrite::Unresolved {
        tracing::warn!("Uniform `{name}` does not resolve in program `{program}`");
    }
    outcome
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    fn block(name: &str, kind: UniformKind) -> UniformBlock {
        let mut layout = UniformLayout::default();
        layout.insert(
            name,
            UniformSlot {
                offset: 0,
                kind,
                matrix_stride: 0,
                row_major: false,
            },
        );
        UniformBlock::new(layout, [0..16])
    }

    #[test]
    fn stage_names_are_lowercase() {
        assert_eq!(ShaderStage::Compute.to_string(), "compute");
        assert_eq!(ShaderStage::Fragment.to_string(), "fragment");
    }

    #[test]
    fn writes_reach_every_block_declaring_the_name() {
        let mut compute = block("tint", UniformKind::Vec(3));
        let mut display = block("tint", UniformKind::Vec(3));

        let outcome = set_in_blocks(
            "demo",
            [&mut compute, &mut display].into_iter(),
            "tint",
            Vec3::ONE.into(),
        );

        assert_eq!(outcome, UniformWrite::Written);
        assert_eq!(compute.words().next(), Some((0, 1.0_f32.to_bits())));
        assert_eq!(display.words().nth(2), Some((8, 1.0_f32.to_bits())));
    }

    #[test]
    fn unresolved_names_leave_blocks_untouched() {
        let mut compute = block("tint", UniformKind::Vec(3));

        let outcome = set_in_blocks(
            "demo",
            std::iter::once(&mut compute),
            "missing",
            Vec3::ONE.into(),
        );

        assert_eq!(outcome, UniformWrite::Unresolved);
        assert!(compute.words().all(|(_, word)| word == 0));
    }

    #[test]
    fn empty_programs_treat_every_write_as_unresolved() {
        let outcome = set_in_blocks("empty", std::iter::empty(), "time", 1.0_f32.into());
        assert_eq!(outcome, UniformWrite::Unresolved);
    }

    #[test]
    fn mismatches_are_reported_when_nothing_was_written() {
        let mut compute = block("count", UniformKind::Int);

        let outcome = set_in_blocks(
            "demo",
            std::iter::once(&mut compute),
            "count",
            Vec3::ONE.into(),
        );

        assert_eq!(outcome, UniformWrite::TypeMismatch);
    }
}
