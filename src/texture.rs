use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;
use vulkano::{
    format::Format,
    image::{view::ImageView, Image, ImageCreateInfo, ImageType, ImageUsage},
    memory::allocator::AllocationCreateInfo,
};

use crate::error::{AppError, GpuError, ResourceError};
use crate::init::context::VulkanoContext;

pub const INPUT_FORMAT: Format = Format::R32G32B32A32_SFLOAT;

/// A decoded image file, expanded to RGBA floats in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Channel count of the source file.
    pub channels: u8,
    /// Row-major RGBA texels, first row first.
    pub pixels: Vec<f32>,
}

impl DecodedImage {
    pub fn open(path: &Path) -> Result<Self, ResourceError> {
        let image = image::open(path).map_err(|source| ResourceError::Texture {
            path: PathBuf::from(path),
            source,
        })?;
        let decoded = Self::from_dynamic(image);
        tracing::debug!(
            "Decoded {} ({}x{}, {} channels)",
            path.display(),
            decoded.width,
            decoded.height,
            decoded.channels
        );
        Ok(decoded)
    }

    /// Single channel sources land in red and two channel sources in red and
    /// green; missing color channels are zero and missing alpha is one.
    #[must_use]
    pub fn from_dynamic(image: DynamicImage) -> Self {
        let (width, height) = (image.width(), image.height());
        let channels = image.color().channel_count();
        let pixels = match channels {
            1 => image
                .to_luma32f()
                .pixels()
                .flat_map(|p| [p.0[0], 0.0, 0.0, 1.0])
                .collect(),
            2 => image
                .to_luma_alpha32f()
                .pixels()
                .flat_map(|p| [p.0[0], p.0[1], 0.0, 1.0])
                .collect(),
            _ => image.into_rgba32f().into_raw(),
        };
        Self {
            width,
            height,
            channels,
            pixels,
        }
    }
}

/// Read-only image bound to the compute program.
pub struct InputImage {
    view: Arc<ImageView>,
}

impl InputImage {
    pub fn upload(context: &VulkanoContext, decoded: &DecodedImage) -> Result<Self, AppError> {
        let image = Image::new(
            context.memory_allocator().clone(),
            ImageCreateInfo {
                image_type: ImageType::Dim2d,
                format: INPUT_FORMAT,
                extent: [decoded.width, decoded.height, 1],
                usage: ImageUsage::STORAGE | ImageUsage::TRANSFER_DST,
                ..Default::default()
            },
            AllocationCreateInfo::default(),
        )
        .map_err(GpuError::from)?;

        let staging =
            crate::buffers::new_staging_buffer(context, decoded.pixels.iter().copied())?;
        crate::buffers::upload_to_image(context, staging, image.clone())?;

        let view = ImageView::new_default(image).map_err(GpuError::from)?;
        Ok(Self { view })
    }

    #[must_use]
    pub const fn view(&self) -> &Arc<ImageView> {
        &self.view
    }
}
