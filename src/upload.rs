//! One-shot texture upload pipeline.
//!
//! Copies CPU pixel data into a GPU-resident texture through a staging
//! buffer, transitions it to shader-readable, and blocks on a fence until the
//! copy has completed. The blocking wait is the documented contract: texture
//! creation is not on any per-frame hot path, and waiting here lets the
//! staging buffer and one-shot command objects be torn down before returning.

use std::sync::Arc;

use crate::device::{
    BufferImageCopy, RenderDevice, ResourceId, ResourceState, TextureDescriptor, TextureFormat,
};
use crate::error::{SceneError, SceneResult};
use crate::fence::GpuFence;

/// Row alignment required by the GPU copy engine, in bytes. A hardware/API
/// constant, not user-configurable.
pub const ROW_PITCH_ALIGNMENT: u32 = 256;

/// Round a tightly packed row size up to the copy-engine alignment.
pub fn aligned_row_pitch(width: u32, bytes_per_pixel: u32) -> u32 {
    (width * bytes_per_pixel + ROW_PITCH_ALIGNMENT - 1) & !(ROW_PITCH_ALIGNMENT - 1)
}

/// Upload `pixels` into a new device-local texture and return it fully
/// populated and shader-readable. Only 4-byte-per-pixel data is accepted.
pub(crate) fn upload_texture(
    device: &Arc<dyn RenderDevice>,
    pixels: &[u8],
    width: u32,
    height: u32,
    bytes_per_pixel: u32,
    format: TextureFormat,
) -> SceneResult<ResourceId> {
    if bytes_per_pixel != 4 {
        return Err(SceneError::UnsupportedPixelFormat { bytes_per_pixel });
    }
    let row_bytes = (width * bytes_per_pixel) as usize;
    let expected = row_bytes * height as usize;
    if pixels.len() < expected {
        return Err(SceneError::PixelDataTooSmall {
            expected,
            actual: pixels.len(),
        });
    }

    let texture = device.create_texture(&TextureDescriptor {
        label: None,
        width,
        height,
        format,
    })?;

    let pitch = aligned_row_pitch(width, bytes_per_pixel);
    let staging = device.create_upload_buffer(height as u64 * pitch as u64)?;

    // Source rows are tightly packed while the staging buffer rows are
    // pitch-aligned, so each row lands at its own offset. A single bulk copy
    // would corrupt every row after the first whenever the strides differ.
    for y in 0..height as usize {
        let row = &pixels[y * row_bytes..(y + 1) * row_bytes];
        device.write_upload_buffer(staging, y as u64 * pitch as u64, row)?;
    }

    // Dedicated queue and list, scoped entirely to this one upload.
    let queue = device.create_command_queue()?;
    let list = device.create_command_list()?;
    device.copy_buffer_to_texture(
        list,
        &BufferImageCopy {
            buffer: staging,
            row_pitch: pitch,
            width,
            height,
            format,
        },
        texture,
    )?;
    device.transition(list, texture, ResourceState::CopyDest, ResourceState::ShaderResource)?;
    device.submit(queue, list)?;

    let mut fence = GpuFence::new(device)?;
    let token = fence.signal(queue)?;
    fence.wait(token)?;

    device.destroy_resource(staging);
    device.destroy_command_list(list);
    device.destroy_command_queue(queue);

    log::debug!("uploaded {width}x{height} texture ({format:?})");
    Ok(texture)
}
