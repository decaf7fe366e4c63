use std::path::PathBuf;

use thiserror::Error;
use vulkano::{
    buffer::AllocateBufferError, command_buffer::CommandBufferExecError,
    image::AllocateImageError, library::LoadingError, Validated, ValidationError, VulkanError,
};

use crate::shader::ShaderStage;

/// Failure while bringing up the window or the Vulkan device.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("failed to load the Vulkan library: {0}")]
    Library(#[from] LoadingError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("Vulkan library does not support the required instance extensions")]
    MissingExtensions,
    #[error("no physical device with a graphics and compute queue that can present")]
    NoSuitableDevice,
    #[error("device was created without a queue")]
    NoQueue,
    #[error("surface exposes no usable color format")]
    NoSurfaceFormat,
    #[error("Vulkan initialization failed: {0}")]
    Vulkan(#[from] Validated<VulkanError>),
    #[error("Vulkan query failed: {0}")]
    Query(#[from] VulkanError),
}

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("shader compiler is unavailable")]
    CompilerUnavailable,
    #[error("{stage} shader `{name}` failed to compile:\n{log}")]
    Compile {
        stage: ShaderStage,
        name: String,
        log: String,
    },
    #[error("program `{program}` failed to link: {reason}")]
    Link { program: String, reason: String },
}

impl ShaderError {
    pub(crate) fn link(program: &str, reason: impl ToString) -> Self {
        Self::Link {
            program: program.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// A file or GPU resource the demo needs could not be provided.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("failed to read shader file {}: {source}", path.display())]
    ShaderFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to load texture {}: {source}", path.display())]
    Texture {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("compute program `{program}` reads binding {binding} but no {resource} is configured")]
    MissingBinding {
        program: String,
        binding: u32,
        resource: &'static str,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("dispatch grid {grid:?} is empty")]
    Empty { grid: [u32; 3] },
    #[error("dispatch grid {grid:?} exceeds the device work group limit {limit:?}")]
    ExceedsDeviceLimit { grid: [u32; 3], limit: [u32; 3] },
}

/// Any other failure reported by vulkano.
#[derive(Debug, Error)]
pub enum GpuError {
    #[error(transparent)]
    Vulkan(#[from] Validated<VulkanError>),
    #[error(transparent)]
    Validation(#[from] Box<ValidationError>),
    #[error("failed to allocate image: {0}")]
    ImageAllocation(#[from] Validated<AllocateImageError>),
    #[error("failed to allocate buffer: {0}")]
    BufferAllocation(#[from] Validated<AllocateBufferError>),
    #[error("failed to submit command buffer: {0}")]
    Execution(#[from] CommandBufferExecError),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("initialization failed: {0}")]
    Init(#[from] InitError),
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
}

/// Failure of one frame step.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error("frame step out of order: {0}")]
    OutOfOrder(&'static str),
}
