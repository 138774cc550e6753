//! Swapchain render target views.
//!
//! Tracks one render-target view per swapchain back buffer. The set follows
//! the host's swapchain lifecycle: torn down before a resize, rebuilt after,
//! and empty in between. While empty, rendering is skipped entirely rather
//! than treated as an error.

use std::sync::Arc;

use crate::device::{DescriptorHeapKind, HeapId, RenderDevice, ResourceId};
use crate::error::SceneResult;

struct RenderTargetEntry {
    buffer: ResourceId,
    slot: u32,
}

/// The per-back-buffer render target views and their heap.
pub struct RenderTargetSet {
    device: Arc<dyn RenderDevice>,
    heap: Option<HeapId>,
    targets: Vec<RenderTargetEntry>,
}

impl RenderTargetSet {
    /// An empty set. Targets exist only after [`RenderTargetSet::rebuild`].
    pub fn new(device: Arc<dyn RenderDevice>) -> Self {
        Self {
            device,
            heap: None,
            targets: Vec::new(),
        }
    }

    pub fn len(&self) -> u32 {
        self.targets.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Release every back-buffer reference and the view heap. Idempotent;
    /// must run before the host resizes its swapchain, since outstanding
    /// buffer references block the resize.
    pub fn invalidate(&mut self) {
        if !self.targets.is_empty() {
            log::debug!("releasing {} render target views", self.targets.len());
        }
        for entry in self.targets.drain(..) {
            self.device.destroy_resource(entry.buffer);
        }
        if let Some(heap) = self.heap.take() {
            self.device.destroy_descriptor_heap(heap);
        }
    }

    /// Recreate one render-target view per swapchain buffer. Any existing
    /// set is invalidated first. On failure the set is left empty, never
    /// partially built.
    pub fn rebuild(&mut self, buffer_count: u32) -> SceneResult<()> {
        self.invalidate();

        let heap = self
            .device
            .create_descriptor_heap(DescriptorHeapKind::RenderTarget, buffer_count)?;
        self.heap = Some(heap);

        for slot in 0..buffer_count {
            let buffer = match self.device.swapchain_buffer(slot) {
                Ok(buffer) => buffer,
                Err(err) => {
                    self.invalidate();
                    return Err(err.into());
                }
            };
            // Push before creating the view so invalidate releases this
            // buffer reference even if the view fails.
            self.targets.push(RenderTargetEntry { buffer, slot });
            if let Err(err) = self.device.create_render_target_view(heap, slot, buffer) {
                self.invalidate();
                return Err(err.into());
            }
        }
        log::debug!("created {buffer_count} render target views");
        Ok(())
    }

    /// The heap, view slot, and back buffer at `index`.
    pub(crate) fn entry(&self, index: u32) -> Option<(HeapId, u32, ResourceId)> {
        let heap = self.heap?;
        self.targets
            .get(index as usize)
            .map(|entry| (heap, entry.slot, entry.buffer))
    }
}

impl Drop for RenderTargetSet {
    fn drop(&mut self) {
        self.invalidate();
    }
}
