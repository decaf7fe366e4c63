use shaderc::{CompileOptions, Compiler, EnvVersion, ShaderKind, TargetEnv};

use crate::error::ShaderError;

use super::reflect::push_constant_layout;
use super::source::{ProgramSources, ShaderSource};
use super::uniform::UniformLayout;
use super::ShaderStage;

/// GLSL to SPIR-V front end.
pub struct ShaderCompiler {
    compiler: Compiler,
}

impl ShaderCompiler {
    pub fn new() -> Result<Self, ShaderError> {
        let compiler = Compiler::new().ok_or(ShaderError::CompilerUnavailable)?;
        Ok(Self { compiler })
    }

    pub fn compile(&self, source: &ShaderSource) -> Result<CompiledStage, ShaderError> {
        let compile_error = |log: String| ShaderError::Compile {
            stage: source.stage,
            name: source.name.clone(),
            log,
        };

        let mut options = CompileOptions::new().ok_or(ShaderError::CompilerUnavailable)?;
        options.set_target_env(TargetEnv::Vulkan, EnvVersion::Vulkan1_0 as u32);
        // Keeps member names for push-constant reflection.
        options.set_generate_debug_info();

        let artifact = self
            .compiler
            .compile_into_spirv(
                &source.text,
                shader_kind(source.stage),
                &source.name,
                "main",
                Some(&options),
            )
            .map_err(|err| compile_error(err.to_string()))?;
        if artifact.get_num_warnings() > 0 {
            tracing::warn!(
                "Warnings in {} shader `{}`: {}",
                source.stage,
                source.name,
                artifact.get_warning_messages()
            );
        }

        let words = artifact.as_binary().to_vec();
        let uniforms = push_constant_layout(&words).map_err(|err| compile_error(err.to_string()))?;
        tracing::debug!(
            "Compiled {} shader `{}` ({} words)",
            source.stage,
            source.name,
            words.len()
        );

        Ok(CompiledStage {
            stage: source.stage,
            name: source.name.clone(),
            words,
            uniforms,
        })
    }
}

const fn shader_kind(stage: ShaderStage) -> ShaderKind {
    match stage {
        ShaderStage::Vertex => ShaderKind::Vertex,
        ShaderStage::Fragment => ShaderKind::Fragment,
        ShaderStage::Compute => ShaderKind::Compute,
    }
}

/// SPIR-V of one stage plus its reflected uniforms.
#[derive(Debug, Clone)]
pub struct CompiledStage {
    pub stage: ShaderStage,
    pub name: String,
    pub words: Vec<u32>,
    pub uniforms: UniformLayout,
}

/// Every stage of a program, compiled but not yet linked on a device.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    name: String,
    stages: Vec<CompiledStage>,
}

impl CompiledProgram {
    /// Compiles all stages; the first failing stage aborts the program.
    pub fn compile(compiler: &ShaderCompiler, sources: &ProgramSources) -> Result<Self, ShaderError> {
        let stages = sources
            .stages()
            .into_iter()
            .map(|source| compiler.compile(source))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: sources.program_name(),
            stages,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn stage(&self, stage: ShaderStage) -> Option<&CompiledStage> {
        self.stages.iter().find(|compiled| compiled.stage == stage)
    }

    #[must_use]
    pub fn has_display_stages(&self) -> bool {
        self.stage(ShaderStage::Vertex).is_some() && self.stage(ShaderStage::Fragment).is_some()
    }

    /// Uniforms of the vertex and fragment stages, which share one push-constant block.
    pub fn display_uniforms(&self) -> Result<UniformLayout, ShaderError> {
        let mut layout = UniformLayout::default();
        for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
            if let Some(compiled) = self.stage(stage) {
                layout.merge(&compiled.uniforms).map_err(|member| {
                    ShaderError::link(
                        &self.name,
                        format!("push constant `{member}` differs between vertex and fragment stages"),
                    )
                })?;
            }
        }
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::{UniformBlock, UniformKind, UniformWrite};

    const COMPUTE: &str = r"
        #version 450
        layout(local_size_x = 1, local_size_y = 1) in;
        layout(rgba32f, binding = 0) uniform writeonly image2D img_output;
        layout(push_constant) uniform Params {
            vec3 camera_origin;
            float lens_radius;
            int hittable_count;
        } params;

        void main() {
            ivec2 pixel = ivec2(gl_GlobalInvocationID.xy);
            float shade = params.lens_radius * float(params.hittable_count);
            imageStore(img_output, pixel, vec4(params.camera_origin, shade));
        }
    ";

    #[test]
    fn reflects_push_constants_of_a_compiled_stage() {
        let compiler = ShaderCompiler::new().unwrap();
        let stage = compiler
            .compile(&ShaderSource::new(ShaderStage::Compute, "test.comp", COMPUTE))
            .unwrap();

        let layout = &stage.uniforms;
        assert_eq!(layout.get("camera_origin").map(|s| s.offset), Some(0));
        assert_eq!(layout.get("lens_radius").map(|s| s.offset), Some(12));
        assert_eq!(
            layout.get("hittable_count").map(|s| (s.offset, s.kind)),
            Some((16, UniformKind::Int))
        );
    }

    #[test]
    fn invalid_source_is_a_compile_error() {
        let compiler = ShaderCompiler::new().unwrap();
        let sources = ProgramSources::Compute {
            compute: ShaderSource::new(ShaderStage::Compute, "broken.comp", "#version 450\nvoid main( {"),
        };

        let err = CompiledProgram::compile(&compiler, &sources).unwrap_err();
        match err {
            ShaderError::Compile { stage, name, log } => {
                assert_eq!(stage, ShaderStage::Compute);
                assert_eq!(name, "broken.comp");
                assert!(!log.is_empty());
            }
            other => panic!("unexpected error {other:?}"),
        }

        // Nothing linked, so uniform writes have nowhere to go.
        let mut block = UniformBlock::default();
        assert_eq!(block.set("anything", 1.0_f32.into()), UniformWrite::Unresolved);
    }

    #[test]
    fn display_stages_must_agree_on_push_constants() {
        let vertex = r"
            #version 450
            layout(location = 0) in vec3 position;
            layout(push_constant) uniform Params { float scale; } params;
            void main() { gl_Position = vec4(position * params.scale, 1.0); }
        ";
        let fragment = r"
            #version 450
            layout(location = 0) out vec4 f_color;
            layout(push_constant) uniform Params { int scale; } params;
            void main() { f_color = vec4(float(params.scale)); }
        ";
        let compiler = ShaderCompiler::new().unwrap();
        let sources = ProgramSources::Display {
            vertex: ShaderSource::new(ShaderStage::Vertex, "scale.vert", vertex),
            fragment: ShaderSource::new(ShaderStage::Fragment, "scale.frag", fragment),
        };

        let program = CompiledProgram::compile(&compiler, &sources).unwrap();
        assert!(program.has_display_stages());
        assert!(matches!(
            program.display_uniforms(),
            Err(ShaderError::Link { .. })
        ));
    }
}
