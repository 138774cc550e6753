//! Caller-facing texture handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::descriptor::DescriptorAllocator;
use crate::device::{DescriptorHandle, RenderDevice, ResourceId};
use crate::error::SceneResult;

/// Shared identity of a texture's GPU resource plus its one-shot release
/// flag. The flag, not any drop glue, decides when the device resource is
/// destroyed: GPU teardown has to be ordered relative to fence waits, which
/// implicit destructors cannot guarantee.
pub(crate) struct TextureInner {
    resource: ResourceId,
    released: AtomicBool,
}

impl TextureInner {
    pub(crate) fn new(resource: ResourceId) -> Self {
        Self {
            resource,
            released: AtomicBool::new(false),
        }
    }

    pub(crate) fn resource(&self) -> ResourceId {
        self.resource
    }

    pub(crate) fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Destroy the GPU resource exactly once; later calls are no-ops.
    pub(crate) fn release(&self, device: &dyn RenderDevice) {
        if !self.released.swap(true, Ordering::AcqRel) {
            device.destroy_resource(self.resource);
        }
    }
}

/// Owning wrapper around an uploaded texture.
///
/// The bindable identity is resolved lazily: the first call to
/// [`UiTexture::descriptor`] in a frame may allocate a dynamic descriptor
/// slot, while later calls in the same frame return the same handle. A
/// statically bound texture always resolves to its fixed slot.
///
/// Disposal is explicit. [`UiTexture::dispose`] releases the GPU resource
/// (through the allocator, so a static table entry is freed together with
/// it) and is idempotent; resolving a disposed texture is an error.
pub struct UiTexture {
    inner: Arc<TextureInner>,
    width: u32,
    height: u32,
    allocator: Arc<DescriptorAllocator>,
}

impl UiTexture {
    pub(crate) fn new(
        resource: ResourceId,
        width: u32,
        height: u32,
        allocator: Arc<DescriptorAllocator>,
    ) -> Self {
        Self {
            inner: Arc::new(TextureInner::new(resource)),
            width,
            height,
            allocator,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The underlying GPU resource.
    pub fn resource(&self) -> ResourceId {
        self.inner.resource()
    }

    /// Resolve the shader-visible handle for this texture, binding it into
    /// the descriptor table if it is not bound yet.
    pub fn descriptor(&self) -> SceneResult<DescriptorHandle> {
        self.allocator.resolve(&self.inner)
    }

    /// Whether the GPU resource has been released.
    pub fn is_disposed(&self) -> bool {
        self.inner.is_released()
    }

    /// Release the GPU resource. Idempotent.
    pub fn dispose(&self) {
        self.allocator.release(&self.inner);
    }

    pub(crate) fn inner(&self) -> &Arc<TextureInner> {
        &self.inner
    }
}

impl Drop for UiTexture {
    fn drop(&mut self) {
        // No implicit GPU cleanup here; only surface the leak.
        if Arc::strong_count(&self.inner) == 1 && !self.inner.is_released() {
            log::warn!(
                "UiTexture ({}x{}) dropped without dispose(); its GPU resource leaks",
                self.width,
                self.height
            );
        }
    }
}
