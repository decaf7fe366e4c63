use std::sync::Arc;

use vulkano::{
    buffer::{BufferContents, Subbuffer},
    format::{Format, FormatFeatures},
    image::{
        sampler::{Filter, Sampler, SamplerAddressMode, SamplerCreateInfo},
        view::ImageView,
        Image, ImageCreateInfo, ImageType, ImageUsage,
    },
    memory::allocator::AllocationCreateInfo,
    pipeline::graphics::vertex_input::Vertex,
};

use crate::error::GpuError;
use crate::init::context::VulkanoContext;

pub const OUTPUT_FORMAT: Format = Format::R32G32B32A32_SFLOAT;

#[derive(BufferContents, Vertex, Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct QuadVertex {
    #[format(R32G32B32_SFLOAT)]
    pub position: [f32; 3],
    #[format(R32G32_SFLOAT)]
    pub tex_coords: [f32; 2],
}

/// Full-screen quad drawn as a triangle strip.
pub const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex {
        position: [-1.0, -1.0, 0.0],
        tex_coords: [0.0, 0.0],
    },
    QuadVertex {
        position: [-1.0, 1.0, 0.0],
        tex_coords: [0.0, 1.0],
    },
    QuadVertex {
        position: [1.0, -1.0, 0.0],
        tex_coords: [1.0, 0.0],
    },
    QuadVertex {
        position: [1.0, 1.0, 0.0],
        tex_coords: [1.0, 1.0],
    },
];

/// Linear filtering when the format allows it.
#[must_use]
pub fn sampler_filter(features: FormatFeatures) -> Filter {
    if features.intersects(FormatFeatures::SAMPLED_IMAGE_FILTER_LINEAR) {
        Filter::Linear
    } else {
        Filter::Nearest
    }
}

/// Image written by the compute program and sampled by the display program.
///
/// Its extent is fixed at creation; window resizes only stretch the quad.
pub struct OutputImage {
    view: Arc<ImageView>,
    sampler: Arc<Sampler>,
}

impl OutputImage {
    pub fn new(context: &VulkanoContext, extent: [u32; 2]) -> Result<Self, GpuError> {
        let image = Image::new(
            context.memory_allocator().clone(),
            ImageCreateInfo {
                image_type: ImageType::Dim2d,
                format: OUTPUT_FORMAT,
                extent: [extent[0], extent[1], 1],
                usage: ImageUsage::STORAGE | ImageUsage::SAMPLED,
                ..Default::default()
            },
            AllocationCreateInfo::default(),
        )?;
        let view = ImageView::new_default(image)?;

        let features = context
            .device()
            .physical_device()
            .format_properties(OUTPUT_FORMAT)?
            .optimal_tiling_features;
        let filter = sampler_filter(features);
        tracing::debug!("Output image {}x{} sampled with {:?} filtering", extent[0], extent[1], filter);

        let sampler = Sampler::new(
            context.device().clone(),
            SamplerCreateInfo {
                mag_filter: filter,
                min_filter: filter,
                address_mode: [SamplerAddressMode::ClampToEdge; 3],
                ..Default::default()
            },
        )?;

        Ok(Self {
            view,
            sampler,
        })
    }

    #[must_use]
    pub const fn view(&self) -> &Arc<ImageView> {
        &self.view
    }

    #[must_use]
    pub const fn sampler(&self) -> &Arc<Sampler> {
        &self.sampler
    }
}

/// GPU objects shared by the compute and present steps.
pub struct FrameSurface {
    quad: Subbuffer<[QuadVertex]>,
    output: OutputImage,
}

impl FrameSurface {
    pub fn new(context: &VulkanoContext, output_size: [u32; 2]) -> Result<Self, GpuError> {
        Ok(Self {
            quad: crate::buffers::new_vertex_buffer(context, QUAD_VERTICES)?,
            output: OutputImage::new(context, output_size)?,
        })
    }

    #[must_use]
    pub const fn quad(&self) -> &Subbuffer<[QuadVertex]> {
        &self.quad
    }

    #[must_use]
    pub const fn output(&self) -> &OutputImage {
        &self.output
    }
}
