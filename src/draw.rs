//! Finished UI draw lists handed to the device for submission.

use bytemuck::{Pod, Zeroable};

use crate::device::DescriptorHandle;

/// One UI vertex, laid out to match the native vertex buffer format.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DrawVert {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
    /// Packed RGBA, 8 bits per channel.
    pub color: u32,
}

/// One draw call: a contiguous index range rendered with a single texture
/// binding and scissor rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCommand {
    /// Shader-visible texture binding, resolved through the descriptor table.
    pub texture: DescriptorHandle,
    /// Scissor rectangle as `[min_x, min_y, max_x, max_y]` in framebuffer
    /// coordinates.
    pub clip_rect: [f32; 4],
    pub index_count: u32,
    pub index_offset: u32,
    pub vertex_offset: u32,
}

/// A complete frame of UI geometry.
#[derive(Debug, Clone, Default)]
pub struct DrawData {
    pub vertices: Vec<DrawVert>,
    pub indices: Vec<u16>,
    pub commands: Vec<DrawCommand>,
    /// Logical size of the target surface.
    pub display_size: [f32; 2],
}

impl DrawData {
    /// Whether there is anything to draw.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() || self.indices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<DrawVert>(), 20);
        assert_eq!(std::mem::align_of::<DrawVert>(), 4);
    }

    #[test]
    fn empty_draw_data_reports_empty() {
        assert!(DrawData::default().is_empty());
    }
}
