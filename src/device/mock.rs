//! Recording mock device for testing and development.
//!
//! `MockDevice` implements [`RenderDevice`] entirely on the CPU: buffer and
//! texture contents live in host memory, recorded commands execute at submit
//! time, and fence signals complete immediately. It keeps an ordered log of
//! the calls tests care about, so ordering properties (a signal must precede
//! the wait that observes it, a resource must be destroyed exactly once) can
//! be asserted without GPU hardware.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::device::traits::*;
use crate::device::types::*;
use crate::draw::DrawData;

/// One entry in the mock call log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    CreateTexture(ResourceId),
    CreateUploadBuffer(ResourceId),
    DestroyResource(ResourceId),
    CopyBufferToTexture { src: ResourceId, dst: ResourceId },
    Transition { resource: ResourceId, to: ResourceState },
    Submit { queue: QueueId, list: CommandListId },
    RenderDrawData { commands: usize },
    SignalFence { fence: FenceId, value: u64 },
    WaitFence { fence: FenceId, value: u64 },
}

#[derive(Debug, Clone)]
struct MockTexture {
    width: u32,
    height: u32,
    state: ResourceState,
    /// Tightly packed `width * height * 4` bytes.
    data: Vec<u8>,
    swapchain: bool,
}

#[derive(Debug)]
struct MockHeap {
    kind: DescriptorHeapKind,
    capacity: u32,
    views: HashMap<u32, ResourceId>,
}

#[derive(Debug, Clone)]
enum Command {
    Copy { src: BufferImageCopy, dst: ResourceId },
    Transition { resource: ResourceId, from: ResourceState, to: ResourceState },
    SetRenderTarget { heap: HeapId, slot: u32 },
    SetDescriptorHeap { heap: HeapId },
    Draw { commands: usize },
}

#[derive(Default)]
struct MockState {
    next_id: u64,
    buffers: HashMap<u64, Vec<u8>>,
    textures: HashMap<u64, MockTexture>,
    heaps: HashMap<u64, MockHeap>,
    queues: HashMap<u64, ()>,
    lists: HashMap<u64, Vec<Command>>,
    fences: HashMap<u64, u64>,
    swapchain: Vec<u64>,
    swapchain_refs: HashMap<u64, i64>,
    destroy_counts: HashMap<u64, u32>,
    calls: Vec<MockCall>,
}

impl MockState {
    fn alloc_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// CPU-only recording implementation of [`RenderDevice`].
#[derive(Default)]
pub struct MockDevice {
    state: Mutex<MockState>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock device whose swapchain has `buffer_count` back buffers of the
    /// given size, all in the present state.
    pub fn with_swapchain(buffer_count: u32, width: u32, height: u32) -> Self {
        let device = Self::new();
        {
            let mut state = device.state.lock();
            for _ in 0..buffer_count {
                let id = state.alloc_id();
                state.textures.insert(
                    id,
                    MockTexture {
                        width,
                        height,
                        state: ResourceState::Present,
                        data: vec![0; (width * height * 4) as usize],
                        swapchain: true,
                    },
                );
                state.swapchain.push(id);
                state.swapchain_refs.insert(id, 0);
            }
        }
        device
    }

    /// The recorded call log, in order.
    pub fn call_log(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    /// Tightly packed contents of a texture, if it exists.
    pub fn texture_data(&self, texture: ResourceId) -> Option<Vec<u8>> {
        self.state.lock().textures.get(&texture.0).map(|t| t.data.clone())
    }

    /// Current usage state of a texture, if it exists.
    pub fn texture_state(&self, texture: ResourceId) -> Option<ResourceState> {
        self.state.lock().textures.get(&texture.0).map(|t| t.state)
    }

    /// How many times `destroy_resource` was called for this id.
    pub fn destroy_count(&self, resource: ResourceId) -> u32 {
        self.state.lock().destroy_counts.get(&resource.0).copied().unwrap_or(0)
    }

    /// Number of live non-swapchain textures and buffers.
    pub fn live_resource_count(&self) -> usize {
        let state = self.state.lock();
        state.buffers.len() + state.textures.values().filter(|t| !t.swapchain).count()
    }

    /// Outstanding references acquired via `swapchain_buffer`.
    pub fn swapchain_ref_count(&self, index: u32) -> i64 {
        let state = self.state.lock();
        state
            .swapchain
            .get(index as usize)
            .and_then(|id| state.swapchain_refs.get(id))
            .copied()
            .unwrap_or(0)
    }

    fn execute(state: &mut MockState, commands: Vec<Command>) -> DeviceResult<()> {
        for command in commands {
            match command {
                Command::Copy { src, dst } => {
                    let buffer = state
                        .buffers
                        .get(&src.buffer.0)
                        .cloned()
                        .ok_or_else(|| DeviceError::InvalidHandle(format!("{:?}", src.buffer)))?;
                    let texture = state
                        .textures
                        .get_mut(&dst.0)
                        .ok_or_else(|| DeviceError::InvalidHandle(format!("{dst:?}")))?;
                    if texture.state != ResourceState::CopyDest {
                        return Err(DeviceError::SubmitFailed(format!(
                            "copy into texture in state {:?}",
                            texture.state
                        )));
                    }
                    let row_bytes = (src.width * src.format.bytes_per_pixel()) as usize;
                    let pitch = src.row_pitch as usize;
                    for y in 0..src.height as usize {
                        let begin = y * pitch;
                        let row = buffer.get(begin..begin + row_bytes).ok_or_else(|| {
                            DeviceError::SubmitFailed("copy source out of bounds".into())
                        })?;
                        texture.data[y * row_bytes..(y + 1) * row_bytes].copy_from_slice(row);
                    }
                    state.calls.push(MockCall::CopyBufferToTexture { src: src.buffer, dst });
                }
                Command::Transition { resource, from, to } => {
                    let texture = state
                        .textures
                        .get_mut(&resource.0)
                        .ok_or_else(|| DeviceError::InvalidHandle(format!("{resource:?}")))?;
                    if texture.state != from {
                        return Err(DeviceError::SubmitFailed(format!(
                            "transition from {:?} but resource is in {:?}",
                            from, texture.state
                        )));
                    }
                    texture.state = to;
                    state.calls.push(MockCall::Transition { resource, to });
                }
                Command::SetRenderTarget { heap, slot } => {
                    let heap = state
                        .heaps
                        .get(&heap.0)
                        .ok_or_else(|| DeviceError::InvalidHandle(format!("{heap:?}")))?;
                    if !heap.views.contains_key(&slot) {
                        return Err(DeviceError::SubmitFailed(format!(
                            "no render-target view at slot {slot}"
                        )));
                    }
                }
                Command::SetDescriptorHeap { heap } => {
                    if !state.heaps.contains_key(&heap.0) {
                        return Err(DeviceError::InvalidHandle(format!("{heap:?}")));
                    }
                }
                Command::Draw { commands } => {
                    state.calls.push(MockCall::RenderDrawData { commands });
                }
            }
        }
        Ok(())
    }
}

impl RenderDevice for MockDevice {
    fn create_texture(&self, desc: &TextureDescriptor) -> DeviceResult<ResourceId> {
        let mut state = self.state.lock();
        let id = state.alloc_id();
        log::trace!(
            "MockDevice: creating texture {:?} ({}x{})",
            desc.label,
            desc.width,
            desc.height
        );
        state.textures.insert(
            id,
            MockTexture {
                width: desc.width,
                height: desc.height,
                state: ResourceState::CopyDest,
                data: vec![0; (desc.width * desc.height * desc.format.bytes_per_pixel()) as usize],
                swapchain: false,
            },
        );
        state.calls.push(MockCall::CreateTexture(ResourceId(id)));
        Ok(ResourceId(id))
    }

    fn create_upload_buffer(&self, size: u64) -> DeviceResult<ResourceId> {
        let mut state = self.state.lock();
        let id = state.alloc_id();
        log::trace!("MockDevice: creating upload buffer (size: {size})");
        state.buffers.insert(id, vec![0; size as usize]);
        state.calls.push(MockCall::CreateUploadBuffer(ResourceId(id)));
        Ok(ResourceId(id))
    }

    fn write_upload_buffer(
        &self,
        buffer: ResourceId,
        offset: u64,
        data: &[u8],
    ) -> DeviceResult<()> {
        let mut state = self.state.lock();
        let bytes = state
            .buffers
            .get_mut(&buffer.0)
            .ok_or_else(|| DeviceError::InvalidHandle(format!("{buffer:?}")))?;
        let begin = offset as usize;
        let end = begin + data.len();
        if end > bytes.len() {
            return Err(DeviceError::InvalidParameter(format!(
                "write of {} bytes at offset {} exceeds buffer size {}",
                data.len(),
                offset,
                bytes.len()
            )));
        }
        bytes[begin..end].copy_from_slice(data);
        Ok(())
    }

    fn destroy_resource(&self, resource: ResourceId) {
        let mut state = self.state.lock();
        *state.destroy_counts.entry(resource.0).or_insert(0) += 1;
        state.calls.push(MockCall::DestroyResource(resource));
        if let Some(refs) = state.swapchain_refs.get_mut(&resource.0) {
            *refs -= 1;
            if *refs < 0 {
                log::warn!("MockDevice: over-released swapchain buffer {resource:?}");
            }
            return;
        }
        if state.textures.remove(&resource.0).is_none() && state.buffers.remove(&resource.0).is_none()
        {
            log::warn!("MockDevice: destroy of unknown resource {resource:?}");
        }
    }

    fn create_descriptor_heap(
        &self,
        kind: DescriptorHeapKind,
        capacity: u32,
    ) -> DeviceResult<HeapId> {
        if capacity == 0 {
            return Err(DeviceError::InvalidParameter(
                "descriptor heap capacity must be non-zero".into(),
            ));
        }
        let mut state = self.state.lock();
        let id = state.alloc_id();
        log::trace!("MockDevice: creating {kind:?} descriptor heap (capacity: {capacity})");
        state.heaps.insert(id, MockHeap { kind, capacity, views: HashMap::new() });
        Ok(HeapId(id))
    }

    fn destroy_descriptor_heap(&self, heap: HeapId) {
        let mut state = self.state.lock();
        if state.heaps.remove(&heap.0).is_none() {
            log::warn!("MockDevice: destroy of unknown heap {heap:?}");
        }
    }

    fn create_shader_resource_view(
        &self,
        heap: HeapId,
        slot: u32,
        texture: ResourceId,
    ) -> DeviceResult<()> {
        let mut state = self.state.lock();
        if !state.textures.contains_key(&texture.0) {
            return Err(DeviceError::InvalidHandle(format!("{texture:?}")));
        }
        let heap = state
            .heaps
            .get_mut(&heap.0)
            .ok_or_else(|| DeviceError::InvalidHandle(format!("{heap:?}")))?;
        if heap.kind != DescriptorHeapKind::ShaderVisible {
            return Err(DeviceError::InvalidParameter(
                "shader-resource view in a non-shader-visible heap".into(),
            ));
        }
        if slot >= heap.capacity {
            return Err(DeviceError::InvalidParameter(format!(
                "slot {slot} out of heap capacity {}",
                heap.capacity
            )));
        }
        heap.views.insert(slot, texture);
        Ok(())
    }

    fn create_render_target_view(
        &self,
        heap: HeapId,
        slot: u32,
        buffer: ResourceId,
    ) -> DeviceResult<()> {
        let mut state = self.state.lock();
        if !state.textures.contains_key(&buffer.0) {
            return Err(DeviceError::InvalidHandle(format!("{buffer:?}")));
        }
        let heap = state
            .heaps
            .get_mut(&heap.0)
            .ok_or_else(|| DeviceError::InvalidHandle(format!("{heap:?}")))?;
        if heap.kind != DescriptorHeapKind::RenderTarget {
            return Err(DeviceError::InvalidParameter(
                "render-target view in a non-render-target heap".into(),
            ));
        }
        if slot >= heap.capacity {
            return Err(DeviceError::InvalidParameter(format!(
                "slot {slot} out of heap capacity {}",
                heap.capacity
            )));
        }
        heap.views.insert(slot, buffer);
        Ok(())
    }

    fn descriptor_handle(&self, heap: HeapId, slot: u32) -> DescriptorHandle {
        // Mimics heap-start plus slot times increment size.
        DescriptorHandle(heap.0 * 0x1_0000 + slot as u64 * 32)
    }

    fn swapchain_buffer(&self, index: u32) -> DeviceResult<ResourceId> {
        let mut state = self.state.lock();
        let id = *state
            .swapchain
            .get(index as usize)
            .ok_or_else(|| DeviceError::InvalidParameter(format!("no swapchain buffer {index}")))?;
        *state.swapchain_refs.entry(id).or_insert(0) += 1;
        Ok(ResourceId(id))
    }

    fn create_command_queue(&self) -> DeviceResult<QueueId> {
        let mut state = self.state.lock();
        let id = state.alloc_id();
        state.queues.insert(id, ());
        Ok(QueueId(id))
    }

    fn destroy_command_queue(&self, queue: QueueId) {
        self.state.lock().queues.remove(&queue.0);
    }

    fn create_command_list(&self) -> DeviceResult<CommandListId> {
        let mut state = self.state.lock();
        let id = state.alloc_id();
        state.lists.insert(id, Vec::new());
        Ok(CommandListId(id))
    }

    fn destroy_command_list(&self, list: CommandListId) {
        self.state.lock().lists.remove(&list.0);
    }

    fn reset_command_list(&self, list: CommandListId) -> DeviceResult<()> {
        let mut state = self.state.lock();
        let commands = state
            .lists
            .get_mut(&list.0)
            .ok_or_else(|| DeviceError::InvalidHandle(format!("{list:?}")))?;
        commands.clear();
        Ok(())
    }

    fn copy_buffer_to_texture(
        &self,
        list: CommandListId,
        src: &BufferImageCopy,
        dst: ResourceId,
    ) -> DeviceResult<()> {
        let mut state = self.state.lock();
        let commands = state
            .lists
            .get_mut(&list.0)
            .ok_or_else(|| DeviceError::InvalidHandle(format!("{list:?}")))?;
        commands.push(Command::Copy { src: *src, dst });
        Ok(())
    }

    fn transition(
        &self,
        list: CommandListId,
        resource: ResourceId,
        from: ResourceState,
        to: ResourceState,
    ) -> DeviceResult<()> {
        let mut state = self.state.lock();
        let commands = state
            .lists
            .get_mut(&list.0)
            .ok_or_else(|| DeviceError::InvalidHandle(format!("{list:?}")))?;
        commands.push(Command::Transition { resource, from, to });
        Ok(())
    }

    fn set_render_target(&self, list: CommandListId, heap: HeapId, slot: u32) -> DeviceResult<()> {
        let mut state = self.state.lock();
        let commands = state
            .lists
            .get_mut(&list.0)
            .ok_or_else(|| DeviceError::InvalidHandle(format!("{list:?}")))?;
        commands.push(Command::SetRenderTarget { heap, slot });
        Ok(())
    }

    fn set_descriptor_heap(&self, list: CommandListId, heap: HeapId) -> DeviceResult<()> {
        let mut state = self.state.lock();
        let commands = state
            .lists
            .get_mut(&list.0)
            .ok_or_else(|| DeviceError::InvalidHandle(format!("{list:?}")))?;
        commands.push(Command::SetDescriptorHeap { heap });
        Ok(())
    }

    fn render_draw_data(&self, list: CommandListId, draw_data: &DrawData) -> DeviceResult<()> {
        let mut state = self.state.lock();
        let commands = state
            .lists
            .get_mut(&list.0)
            .ok_or_else(|| DeviceError::InvalidHandle(format!("{list:?}")))?;
        commands.push(Command::Draw { commands: draw_data.commands.len() });
        Ok(())
    }

    fn submit(&self, queue: QueueId, list: CommandListId) -> DeviceResult<()> {
        let mut state = self.state.lock();
        if !state.queues.contains_key(&queue.0) {
            return Err(DeviceError::InvalidHandle(format!("{queue:?}")));
        }
        let commands = state
            .lists
            .get_mut(&list.0)
            .ok_or_else(|| DeviceError::InvalidHandle(format!("{list:?}")))?
            .drain(..)
            .collect::<Vec<_>>();
        state.calls.push(MockCall::Submit { queue, list });
        Self::execute(&mut state, commands)
    }

    fn create_fence(&self) -> DeviceResult<FenceId> {
        let mut state = self.state.lock();
        let id = state.alloc_id();
        state.fences.insert(id, 0);
        Ok(FenceId(id))
    }

    fn destroy_fence(&self, fence: FenceId) {
        self.state.lock().fences.remove(&fence.0);
    }

    fn signal_fence(&self, queue: QueueId, fence: FenceId, value: u64) -> DeviceResult<()> {
        let mut state = self.state.lock();
        if !state.queues.contains_key(&queue.0) {
            return Err(DeviceError::InvalidHandle(format!("{queue:?}")));
        }
        let completed = state
            .fences
            .get_mut(&fence.0)
            .ok_or_else(|| DeviceError::InvalidHandle(format!("{fence:?}")))?;
        // The mock GPU completes queued work instantly.
        *completed = (*completed).max(value);
        state.calls.push(MockCall::SignalFence { fence, value });
        Ok(())
    }

    fn fence_completed_value(&self, fence: FenceId) -> u64 {
        self.state.lock().fences.get(&fence.0).copied().unwrap_or(0)
    }

    fn wait_fence(&self, fence: FenceId, value: u64) -> DeviceResult<()> {
        let mut state = self.state.lock();
        let completed = state
            .fences
            .get(&fence.0)
            .copied()
            .ok_or_else(|| DeviceError::InvalidHandle(format!("{fence:?}")))?;
        assert!(
            completed >= value,
            "MockDevice: wait on fence value {value} that no submitted work will signal \
             (completed: {completed}); a real device would block forever"
        );
        state.calls.push(MockCall::WaitFence { fence, value });
        Ok(())
    }
}
