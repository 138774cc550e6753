//! UI Overlay - texture residency and descriptor management for an
//! immediate-mode UI hosted inside an existing render loop
//!
//! The host application owns the GPU device, swapchain, and presentation
//! queue; this crate owns everything UI-specific on top of them:
//! - Blocking texture uploads through a staging buffer
//! - A fixed-capacity shader-visible descriptor table, split into static
//!   (caller-indexed, persistent) and dynamic (per-frame) regions
//! - Render target views that follow the host's swapchain lifecycle
//! - Frame pacing via a post-present fence
//!
//! GPU access goes through the [`RenderDevice`] capability trait, so the
//! whole crate runs against the recording [`device::mock::MockDevice`] in
//! tests (enabled by the default `mock-device` feature).

pub mod descriptor;
pub mod device;
pub mod draw;
pub mod error;
pub mod fence;
pub mod render_target;
pub mod scene;
pub mod texture;
pub mod upload;

pub use descriptor::DescriptorAllocator;
pub use device::{DescriptorHandle, RenderDevice, TextureFormat};
pub use draw::{DrawCommand, DrawData, DrawVert};
pub use error::{SceneError, SceneResult};
pub use render_target::RenderTargetSet;
pub use scene::Scene;
pub use texture::UiTexture;
pub use upload::{aligned_row_pitch, ROW_PITCH_ALIGNMENT};

/// Descriptor table sizing.
#[derive(Debug, Clone)]
pub struct SceneConfig {
    /// Number of caller-indexed static texture slots at the front of the
    /// table.
    pub static_texture_count: u32,
    /// Number of dynamic slots handed out per frame.
    pub dynamic_texture_capacity: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        // One static slot for the font atlas plus enough dynamic slots that
        // a frame never plausibly exhausts them.
        Self {
            static_texture_count: 1,
            dynamic_texture_capacity: 1023,
        }
    }
}
