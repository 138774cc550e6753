//! Core device abstraction trait.
//!
//! The host application owns the real GPU device; this trait is the
//! capability the scene core is handed at construction. Every GPU-touching
//! component holds it as `Arc<dyn RenderDevice>`, which also lets tests
//! substitute a recording device instead of real hardware.

use thiserror::Error;

use crate::device::types::*;
use crate::draw::DrawData;

/// Device error type
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("failed to initialize device objects: {0}")]
    InitializationFailed(String),
    #[error("failed to create resource: {0}")]
    ResourceCreationFailed(String),
    #[error("failed to create fence: {0}")]
    FenceCreationFailed(String),
    #[error("failed to submit command list: {0}")]
    SubmitFailed(String),
    #[error("unknown handle: {0}")]
    InvalidHandle(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("out of GPU memory")]
    OutOfMemory,
    #[error("GPU device lost")]
    DeviceLost,
}

pub type DeviceResult<T> = Result<T, DeviceError>;

/// Handle to a GPU resource (texture or buffer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(pub(crate) u64);

/// Handle to a descriptor heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapId(pub(crate) u64);

/// Handle to a command queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueId(pub(crate) u64);

/// Handle to a command list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandListId(pub(crate) u64);

/// Handle to a fence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FenceId(pub(crate) u64);

/// Opaque shader-visible descriptor identity for one table slot.
///
/// This is the bindable handle the UI library stores in its draw commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorHandle(pub(crate) u64);

macro_rules! raw_handle {
    ($ty:ident) => {
        impl $ty {
            /// Wrap a raw backend value.
            pub fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// The raw backend value.
            pub fn to_raw(self) -> u64 {
                self.0
            }
        }
    };
}

raw_handle!(ResourceId);
raw_handle!(HeapId);
raw_handle!(QueueId);
raw_handle!(CommandListId);
raw_handle!(FenceId);
raw_handle!(DescriptorHandle);

/// Main device capability trait.
///
/// Semantics follow an explicit-queue GPU API: textures are created in the
/// copy-destination state, transitions are explicit, and fences carry
/// monotonically increasing 64-bit values signaled on a queue.
pub trait RenderDevice: Send + Sync {
    // Resource creation

    /// Create a device-local texture. The texture starts in
    /// [`ResourceState::CopyDest`].
    fn create_texture(&self, desc: &TextureDescriptor) -> DeviceResult<ResourceId>;

    /// Create a CPU-writable staging buffer.
    fn create_upload_buffer(&self, size: u64) -> DeviceResult<ResourceId>;

    /// Write bytes into a staging buffer at the given offset.
    fn write_upload_buffer(&self, buffer: ResourceId, offset: u64, data: &[u8])
        -> DeviceResult<()>;

    /// Release a resource. Releasing a swapchain buffer drops the reference
    /// acquired by [`RenderDevice::swapchain_buffer`].
    fn destroy_resource(&self, resource: ResourceId);

    // Descriptor heaps

    /// Create a descriptor heap with `capacity` sequential slots.
    fn create_descriptor_heap(
        &self,
        kind: DescriptorHeapKind,
        capacity: u32,
    ) -> DeviceResult<HeapId>;

    /// Destroy a descriptor heap.
    fn destroy_descriptor_heap(&self, heap: HeapId);

    /// Create a shader-resource view for `texture` at `slot` of a
    /// shader-visible heap, overwriting any previous view at that slot.
    fn create_shader_resource_view(
        &self,
        heap: HeapId,
        slot: u32,
        texture: ResourceId,
    ) -> DeviceResult<()>;

    /// Create a render-target view for `buffer` at `slot` of a render-target
    /// heap.
    fn create_render_target_view(
        &self,
        heap: HeapId,
        slot: u32,
        buffer: ResourceId,
    ) -> DeviceResult<()>;

    /// The shader-visible identity of `slot` in `heap`. Stable for the
    /// lifetime of the heap.
    fn descriptor_handle(&self, heap: HeapId, slot: u32) -> DescriptorHandle;

    // Swapchain

    /// Acquire a reference to the swapchain buffer at `index`. Must be
    /// balanced by [`RenderDevice::destroy_resource`].
    fn swapchain_buffer(&self, index: u32) -> DeviceResult<ResourceId>;

    // Command recording and submission

    /// Create a command queue.
    fn create_command_queue(&self) -> DeviceResult<QueueId>;

    /// Destroy a command queue.
    fn destroy_command_queue(&self, queue: QueueId);

    /// Create a command list, ready for recording.
    fn create_command_list(&self) -> DeviceResult<CommandListId>;

    /// Destroy a command list.
    fn destroy_command_list(&self, list: CommandListId);

    /// Reset a command list for re-recording.
    fn reset_command_list(&self, list: CommandListId) -> DeviceResult<()>;

    /// Record a buffer-to-texture copy using the given footprint.
    fn copy_buffer_to_texture(
        &self,
        list: CommandListId,
        src: &BufferImageCopy,
        dst: ResourceId,
    ) -> DeviceResult<()>;

    /// Record a resource state transition.
    fn transition(
        &self,
        list: CommandListId,
        resource: ResourceId,
        from: ResourceState,
        to: ResourceState,
    ) -> DeviceResult<()>;

    /// Record binding of the render target at `slot` of `heap`.
    fn set_render_target(&self, list: CommandListId, heap: HeapId, slot: u32) -> DeviceResult<()>;

    /// Record binding of the shader-visible descriptor heap.
    fn set_descriptor_heap(&self, list: CommandListId, heap: HeapId) -> DeviceResult<()>;

    /// Record draw calls for a finished UI draw list against the currently
    /// bound target and descriptor heap. This is the thin native draw
    /// surface; the scene core never walks the list itself.
    fn render_draw_data(&self, list: CommandListId, draw_data: &DrawData) -> DeviceResult<()>;

    /// Close and submit a recorded command list to `queue`.
    fn submit(&self, queue: QueueId, list: CommandListId) -> DeviceResult<()>;

    // Fences

    /// Create a fence with completed value 0, including whatever OS waitable
    /// object the device needs to block on it. Failure here is fatal to the
    /// caller; there is no fallback synchronization path.
    fn create_fence(&self) -> DeviceResult<FenceId>;

    /// Destroy a fence and its waitable object.
    fn destroy_fence(&self, fence: FenceId);

    /// Enqueue a GPU-side signal of `value` on `queue` after all currently
    /// queued work.
    fn signal_fence(&self, queue: QueueId, fence: FenceId, value: u64) -> DeviceResult<()>;

    /// The highest value the GPU has completed on `fence`.
    fn fence_completed_value(&self, fence: FenceId) -> u64;

    /// Block the calling thread until `fence` reaches `value`. Unbounded.
    fn wait_fence(&self, fence: FenceId, value: u64) -> DeviceResult<()>;
}
