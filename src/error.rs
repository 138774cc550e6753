//! Crate-level error type.

use thiserror::Error;

use crate::device::DeviceError;

/// Errors surfaced by the scene core.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("unsupported pixel format: {bytes_per_pixel} bytes per pixel (only 4-byte RGBA is supported)")]
    UnsupportedPixelFormat { bytes_per_pixel: u32 },
    #[error("pixel data too small: expected {expected} bytes, got {actual}")]
    PixelDataTooSmall { expected: usize, actual: usize },
    #[error("descriptor heap exhausted: all {capacity} dynamic slots are in use this frame")]
    DescriptorHeapExhausted { capacity: u32 },
    #[error("static texture index {index} out of range ({count} static slots)")]
    StaticIndexOutOfRange { index: u32, count: u32 },
    #[error("texture has already been disposed")]
    TextureDisposed,
    #[error("back buffer index {index} out of range ({count} render targets)")]
    InvalidBackBuffer { index: u32, count: u32 },
    #[error(transparent)]
    Device(#[from] DeviceError),
}

pub type SceneResult<T> = Result<T, SceneError>;
