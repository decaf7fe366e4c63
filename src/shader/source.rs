use std::path::Path;

use crate::config::{DisplayShaders, MediaPaths};
use crate::error::ResourceError;

use super::ShaderStage;

/// GLSL text of a single stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    pub stage: ShaderStage,
    /// File name, used in compiler diagnostics.
    pub name: String,
    pub text: String,
}

impl ShaderSource {
    pub fn new(stage: ShaderStage, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            stage,
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn load(dir: &Path, file: &str, stage: ShaderStage) -> Result<Self, ResourceError> {
        let path = dir.join(file);
        tracing::debug!("Loading {stage} shader {}", path.display());
        let text = std::fs::read_to_string(&path)
            .map_err(|source| ResourceError::ShaderFile { path, source })?;
        Ok(Self::new(stage, file, text))
    }
}

/// The stage combinations a program can be built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramSources {
    Display {
        vertex: ShaderSource,
        fragment: ShaderSource,
    },
    Compute {
        compute: ShaderSource,
    },
    /// Display and compute stages built together; yields two pipelines.
    Full {
        vertex: ShaderSource,
        fragment: ShaderSource,
        compute: ShaderSource,
    },
}

impl ProgramSources {
    pub fn load_display(
        media: &MediaPaths,
        shaders: &DisplayShaders,
    ) -> Result<Self, ResourceError> {
        let dir = media.shader_dir();
        Ok(Self::Display {
            vertex: ShaderSource::load(&dir, &shaders.vertex, ShaderStage::Vertex)?,
            fragment: ShaderSource::load(&dir, &shaders.fragment, ShaderStage::Fragment)?,
        })
    }

    pub fn load_compute(media: &MediaPaths, file: &str) -> Result<Self, ResourceError> {
        Ok(Self::Compute {
            compute: ShaderSource::load(&media.shader_dir(), file, ShaderStage::Compute)?,
        })
    }

    pub fn load_full(
        media: &MediaPaths,
        shaders: &DisplayShaders,
        compute: &str,
    ) -> Result<Self, ResourceError> {
        let dir = media.shader_dir();
        Ok(Self::Full {
            vertex: ShaderSource::load(&dir, &shaders.vertex, ShaderStage::Vertex)?,
            fragment: ShaderSource::load(&dir, &shaders.fragment, ShaderStage::Fragment)?,
            compute: ShaderSource::load(&dir, compute, ShaderStage::Compute)?,
        })
    }

    /// Name used for link diagnostics.
    #[must_use]
    pub fn program_name(&self) -> String {
        match self {
            Self::Display { vertex, fragment } => format!("{}+{}", vertex.name, fragment.name),
            Self::Compute { compute } => compute.name.clone(),
            Self::Full {
                vertex,
                fragment,
                compute,
            } => format!("{}+{}+{}", vertex.name, fragment.name, compute.name),
        }
    }

    /// Sources in pipeline order: vertex, fragment, compute.
    #[must_use]
    pub fn stages(&self) -> Vec<&ShaderSource> {
        match self {
            Self::Display { vertex, fragment } => vec![vertex, fragment],
            Self::Compute { compute } => vec![compute],
            Self::Full {
                vertex,
                fragment,
                compute,
            } => vec![vertex, fragment, compute],
        }
    }
}
