//! Descriptor slot allocator.
//!
//! Owns one fixed-capacity shader-visible descriptor table, split into a
//! static region (caller-assigned indices, stable across frames) and a
//! dynamic region (assigned on demand per frame, keyed by resource identity,
//! reclaimed in bulk by [`DescriptorAllocator::clear_dynamic`]).
//!
//! All table operations take a single coarse mutex. The table is small and
//! the operations infrequent; the lock exists so disposal cannot race
//! resolution when a caller drives them from different threads.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::device::{DescriptorHandle, DescriptorHeapKind, HeapId, RenderDevice};
use crate::error::{SceneError, SceneResult};
use crate::texture::TextureInner;

struct Table {
    /// Static region, indexed by caller-chosen slot.
    static_bound: Vec<Option<Arc<TextureInner>>>,
    /// Dynamic region, keyed by resource identity. Cleared each frame; the
    /// underlying resources are untouched by the clear.
    dynamic: HashMap<u64, DescriptorHandle>,
}

/// Allocator for the shader-visible descriptor table.
pub struct DescriptorAllocator {
    device: Arc<dyn RenderDevice>,
    heap: HeapId,
    static_count: u32,
    capacity: u32,
    table: Mutex<Table>,
}

impl DescriptorAllocator {
    /// Create the allocator and its backing heap of
    /// `static_count + dynamic_capacity` slots.
    pub fn new(
        device: Arc<dyn RenderDevice>,
        static_count: u32,
        dynamic_capacity: u32,
    ) -> SceneResult<Self> {
        let capacity = static_count + dynamic_capacity;
        let heap = device.create_descriptor_heap(DescriptorHeapKind::ShaderVisible, capacity)?;
        Ok(Self {
            device,
            heap,
            static_count,
            capacity,
            table: Mutex::new(Table {
                static_bound: vec![None; static_count as usize],
                dynamic: HashMap::new(),
            }),
        })
    }

    /// The backing shader-visible heap, for binding on command lists and for
    /// native-backend initialization.
    pub fn heap(&self) -> HeapId {
        self.heap
    }

    pub fn static_count(&self) -> u32 {
        self.static_count
    }

    pub fn dynamic_capacity(&self) -> u32 {
        self.capacity - self.static_count
    }

    /// Dynamic slots handed out since the last clear.
    pub fn dynamic_in_use(&self) -> u32 {
        self.table.lock().dynamic.len() as u32
    }

    /// Bind a texture at a fixed static index. A prior occupant bound to a
    /// different resource is released synchronously. Callers must only rebind
    /// static slots at initialization or frame boundaries; the allocator does
    /// not fence this against in-flight reads.
    pub(crate) fn bind_static(&self, inner: &Arc<TextureInner>, index: u32) -> SceneResult<()> {
        if index >= self.static_count {
            return Err(SceneError::StaticIndexOutOfRange {
                index,
                count: self.static_count,
            });
        }
        if inner.is_released() {
            return Err(SceneError::TextureDisposed);
        }
        let mut table = self.table.lock();
        self.device
            .create_shader_resource_view(self.heap, index, inner.resource())?;
        if let Some(prev) = table.static_bound[index as usize].replace(inner.clone()) {
            if !Arc::ptr_eq(&prev, inner) {
                prev.release(self.device.as_ref());
            }
        }
        Ok(())
    }

    /// Resolve the shader-visible handle for a resource: dynamic map first,
    /// then the static region, then a fresh dynamic slot.
    pub(crate) fn resolve(&self, inner: &Arc<TextureInner>) -> SceneResult<DescriptorHandle> {
        if inner.is_released() {
            return Err(SceneError::TextureDisposed);
        }
        let mut table = self.table.lock();

        let key = inner.resource().to_raw();
        if let Some(&handle) = table.dynamic.get(&key) {
            return Ok(handle);
        }
        for (index, slot) in table.static_bound.iter().enumerate() {
            if slot.as_ref().is_some_and(|bound| Arc::ptr_eq(bound, inner)) {
                return Ok(self.device.descriptor_handle(self.heap, index as u32));
            }
        }

        let next = self.static_count + table.dynamic.len() as u32;
        if next >= self.capacity {
            return Err(SceneError::DescriptorHeapExhausted {
                capacity: self.dynamic_capacity(),
            });
        }
        self.device
            .create_shader_resource_view(self.heap, next, inner.resource())?;
        let handle = self.device.descriptor_handle(self.heap, next);
        table.dynamic.insert(key, handle);
        Ok(handle)
    }

    /// Drop all dynamic bindings. Underlying resources are untouched. Must be
    /// called once per frame, before the frame's first resolve, and only
    /// after the previous frame's submissions no longer read the table.
    // TODO: replace the full per-frame clear with an LRU once a frame ever
    // needs more dynamic slots than the table holds.
    pub fn clear_dynamic(&self) {
        let mut table = self.table.lock();
        log::trace!("clearing {} dynamic descriptor bindings", table.dynamic.len());
        table.dynamic.clear();
    }

    /// Disposal path for texture handles: release the resource once and free
    /// any static entry bound to it together with it. A stale dynamic-map
    /// key stays behind and is harmless until the next clear.
    pub(crate) fn release(&self, inner: &Arc<TextureInner>) {
        let mut table = self.table.lock();
        for slot in table.static_bound.iter_mut() {
            if slot.as_ref().is_some_and(|bound| Arc::ptr_eq(bound, inner)) {
                *slot = None;
            }
        }
        inner.release(self.device.as_ref());
    }
}

impl Drop for DescriptorAllocator {
    fn drop(&mut self) {
        let mut table = self.table.lock();
        for slot in table.static_bound.drain(..).flatten() {
            slot.release(self.device.as_ref());
        }
        self.device.destroy_descriptor_heap(self.heap);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::MockDevice;
    use crate::device::TextureFormat;
    use crate::texture::UiTexture;

    fn setup(static_count: u32, dynamic: u32) -> (Arc<MockDevice>, Arc<DescriptorAllocator>) {
        let mock = Arc::new(MockDevice::new());
        let device: Arc<dyn RenderDevice> = mock.clone();
        let allocator = Arc::new(DescriptorAllocator::new(device, static_count, dynamic).unwrap());
        (mock, allocator)
    }

    fn texture(mock: &Arc<MockDevice>, allocator: &Arc<DescriptorAllocator>) -> UiTexture {
        let device: Arc<dyn RenderDevice> = mock.clone();
        let pixels = vec![0x7Fu8; 2 * 2 * 4];
        let resource =
            crate::upload::upload_texture(&device, &pixels, 2, 2, 4, TextureFormat::Rgba8Unorm)
                .unwrap();
        UiTexture::new(resource, 2, 2, allocator.clone())
    }

    #[test]
    fn resolve_is_stable_within_a_frame() {
        let (mock, allocator) = setup(1, 8);
        let tex = texture(&mock, &allocator);

        let first = tex.descriptor().unwrap();
        let second = tex.descriptor().unwrap();
        assert_eq!(first, second);
        assert_eq!(allocator.dynamic_in_use(), 1);
    }

    #[test]
    fn clear_dynamic_releases_bindings_not_resources() {
        let (mock, allocator) = setup(1, 8);
        let tex = texture(&mock, &allocator);
        let before = mock.texture_data(tex.resource()).unwrap();

        tex.descriptor().unwrap();
        allocator.clear_dynamic();
        assert_eq!(allocator.dynamic_in_use(), 0);

        // Resolving again re-binds; the resource and its contents are untouched.
        tex.descriptor().unwrap();
        assert_eq!(mock.destroy_count(tex.resource()), 0);
        assert_eq!(mock.texture_data(tex.resource()).unwrap(), before);
    }

    #[test]
    fn dynamic_capacity_is_enforced_and_resets() {
        let (mock, allocator) = setup(1, 2);
        let a = texture(&mock, &allocator);
        let b = texture(&mock, &allocator);
        let c = texture(&mock, &allocator);

        a.descriptor().unwrap();
        b.descriptor().unwrap();
        // Resolving an already-bound texture does not consume another slot.
        a.descriptor().unwrap();

        let err = c.descriptor();
        assert!(matches!(
            err,
            Err(SceneError::DescriptorHeapExhausted { capacity: 2 })
        ));

        allocator.clear_dynamic();
        c.descriptor().unwrap();
    }

    #[test]
    fn static_binding_resolves_to_its_fixed_slot() {
        let (mock, allocator) = setup(2, 4);
        let device: Arc<dyn RenderDevice> = mock.clone();
        let tex = texture(&mock, &allocator);

        allocator.bind_static(tex.inner(), 1).unwrap();
        let handle = tex.descriptor().unwrap();
        assert_eq!(handle, device.descriptor_handle(allocator.heap(), 1));
        // Static resolution never consumes a dynamic slot.
        assert_eq!(allocator.dynamic_in_use(), 0);
    }

    #[test]
    fn static_rebind_releases_previous_occupant_once() {
        let (mock, allocator) = setup(1, 4);
        let a = texture(&mock, &allocator);
        let b = texture(&mock, &allocator);
        let a_resource = a.resource();

        allocator.bind_static(a.inner(), 0).unwrap();
        allocator.bind_static(b.inner(), 0).unwrap();

        assert_eq!(mock.destroy_count(a_resource), 1);
        assert!(a.is_disposed());
        assert!(matches!(a.descriptor(), Err(SceneError::TextureDisposed)));

        // Disposing the evicted handle again must not double-free.
        a.dispose();
        assert_eq!(mock.destroy_count(a_resource), 1);
    }

    #[test]
    fn rebinding_same_texture_does_not_release_it() {
        let (mock, allocator) = setup(1, 4);
        let a = texture(&mock, &allocator);

        allocator.bind_static(a.inner(), 0).unwrap();
        allocator.bind_static(a.inner(), 0).unwrap();

        assert!(!a.is_disposed());
        assert_eq!(mock.destroy_count(a.resource()), 0);
    }

    #[test]
    fn static_index_out_of_range_is_rejected() {
        let (mock, allocator) = setup(1, 4);
        let tex = texture(&mock, &allocator);
        assert!(matches!(
            allocator.bind_static(tex.inner(), 1),
            Err(SceneError::StaticIndexOutOfRange { index: 1, count: 1 })
        ));
    }

    #[test]
    fn dispose_of_static_texture_frees_entry_and_resource_together() {
        let (mock, allocator) = setup(1, 4);
        let tex = texture(&mock, &allocator);
        let resource = tex.resource();

        allocator.bind_static(tex.inner(), 0).unwrap();
        tex.dispose();

        assert_eq!(mock.destroy_count(resource), 1);
        // The slot is free again; a new texture can take it.
        let other = texture(&mock, &allocator);
        allocator.bind_static(other.inner(), 0).unwrap();
        assert_eq!(mock.destroy_count(resource), 1);
    }

    #[test]
    fn zero_dynamic_capacity_fails_first_dynamic_resolve() {
        let (mock, allocator) = setup(1, 0);
        let tex = texture(&mock, &allocator);
        assert!(matches!(
            tex.descriptor(),
            Err(SceneError::DescriptorHeapExhausted { capacity: 0 })
        ));
    }
}
