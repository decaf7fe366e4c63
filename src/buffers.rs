use vulkano::{
    buffer::{Buffer, BufferContents, BufferCreateInfo, BufferUsage, Subbuffer},
    command_buffer::{CommandBufferExecFuture, CopyBufferInfo, CopyBufferToImageInfo},
    image::Image,
    memory::allocator::{AllocationCreateInfo, MemoryTypeFilter},
    sync::{self, future::FenceSignalFuture, GpuFuture},
};

use std::sync::Arc;

use crate::error::GpuError;
use crate::frame::one_time_builder;
use crate::init::context::VulkanoContext;

pub type SendBufferFuture = FenceSignalFuture<CommandBufferExecFuture<sync::future::NowFuture>>;

/// Host-visible buffer filled with `data`, used as a copy source.
pub fn new_staging_buffer<T, I>(
    context: &VulkanoContext,
    data: I,
) -> Result<Subbuffer<[T]>, GpuError>
where
    T: BufferContents,
    I: IntoIterator<Item = T>,
    I::IntoIter: ExactSizeIterator,
{
    Ok(Buffer::from_iter(
        context.memory_allocator().clone(),
        BufferCreateInfo {
            usage: BufferUsage::TRANSFER_SRC,
            ..Default::default()
        },
        AllocationCreateInfo {
            memory_type_filter: MemoryTypeFilter::PREFER_HOST
                | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
            ..Default::default()
        },
        data,
    )?)
}

/// Copies a staging buffer into a new device-local buffer with `usage`.
pub fn send_staging_to_device<T>(
    context: &VulkanoContext,
    staging_buffer: Subbuffer<[T]>,
    usage: BufferUsage,
) -> Result<(Subbuffer<[T]>, SendBufferFuture), GpuError>
where
    T: BufferContents,
{
    let destination_buffer = Buffer::new_slice::<T>(
        context.memory_allocator().clone(),
        BufferCreateInfo {
            usage: usage | BufferUsage::TRANSFER_DST,
            ..Default::default()
        },
        AllocationCreateInfo {
            memory_type_filter: MemoryTypeFilter::PREFER_DEVICE,
            ..Default::default()
        },
        staging_buffer.len(),
    )?;

    let mut builder = one_time_builder(context)?;
    builder.copy_buffer(CopyBufferInfo::buffers(
        staging_buffer,
        destination_buffer.clone(),
    ))?;
    let command_buffer = builder.build()?;

    let future = sync::now(context.device().clone())
        .then_execute(context.queue().clone(), command_buffer)?
        .then_signal_fence_and_flush()?;

    Ok((destination_buffer, future))
}

/// Uploads `data` into a device-local buffer and waits for the copy.
pub fn upload_to_device<T, I>(
    context: &VulkanoContext,
    data: I,
    usage: BufferUsage,
) -> Result<Subbuffer<[T]>, GpuError>
where
    T: BufferContents,
    I: IntoIterator<Item = T>,
    I::IntoIter: ExactSizeIterator,
{
    let staging_buffer = new_staging_buffer(context, data)?;
    let (buffer, future) = send_staging_to_device(context, staging_buffer, usage)?;
    future.wait(None)?;
    Ok(buffer)
}

/// Fills `image` from a staging buffer laid out as tightly packed texels.
pub fn upload_to_image<T>(
    context: &VulkanoContext,
    staging_buffer: Subbuffer<[T]>,
    image: Arc<Image>,
) -> Result<(), GpuError>
where
    T: BufferContents,
{
    let mut builder = one_time_builder(context)?;
    builder.copy_buffer_to_image(CopyBufferToImageInfo::buffer_image(staging_buffer, image))?;
    let command_buffer = builder.build()?;

    sync::now(context.device().clone())
        .then_execute(context.queue().clone(), command_buffer)?
        .then_signal_fence_and_flush()?
        .wait(None)?;
    Ok(())
}

/// Host-writable vertex buffer; small enough not to need staging.
pub fn new_vertex_buffer<T, I>(
    context: &VulkanoContext,
    vertices: I,
) -> Result<Subbuffer<[T]>, GpuError>
where
    T: BufferContents,
    I: IntoIterator<Item = T>,
    I::IntoIter: ExactSizeIterator,
{
    Ok(Buffer::from_iter(
        context.memory_allocator().clone(),
        BufferCreateInfo {
            usage: BufferUsage::VERTEX_BUFFER,
            ..Default::default()
        },
        AllocationCreateInfo {
            memory_type_filter: MemoryTypeFilter::PREFER_DEVICE
                | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
            ..Default::default()
        },
        vertices,
    )?)
}
