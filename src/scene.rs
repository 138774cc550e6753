//! Scene façade: the single entry point the host render loop drives.
//!
//! The host owns the device, the swapchain, and the presentation queue; the
//! scene owns everything UI-specific on top of them. Per frame the host calls
//! [`Scene::new_frame`], builds its draw lists, calls [`Scene::render`] with
//! the current back buffer index, presents, and calls
//! [`Scene::on_post_present`]. Swapchain resizes are bracketed by
//! [`Scene::on_pre_resize`] and [`Scene::on_resize`].

use std::sync::Arc;

use parking_lot::Mutex;

use crate::descriptor::DescriptorAllocator;
use crate::device::{CommandListId, HeapId, QueueId, RenderDevice, ResourceState};
use crate::draw::DrawData;
use crate::error::SceneResult;
use crate::fence::GpuFence;
use crate::render_target::RenderTargetSet;
use crate::texture::UiTexture;
use crate::upload;
use crate::SceneConfig;

struct FrameState {
    render_targets: RenderTargetSet,
    command_list: CommandListId,
    frame_fence: GpuFence,
    /// Fence value of the most recent post-present signal, 0 when none is
    /// outstanding.
    last_submitted_frame: u64,
}

/// UI scene hosted inside an existing render loop.
pub struct Scene {
    device: Arc<dyn RenderDevice>,
    /// The host's presentation queue. Borrowed, never destroyed here.
    queue: QueueId,
    allocator: Arc<DescriptorAllocator>,
    frame: Mutex<FrameState>,
}

impl Scene {
    /// Build the scene on the host's device and presentation queue. No
    /// render targets exist yet; call [`Scene::on_resize`] once the
    /// swapchain is ready.
    pub fn new(
        device: Arc<dyn RenderDevice>,
        queue: QueueId,
        config: &SceneConfig,
    ) -> SceneResult<Self> {
        let allocator = Arc::new(DescriptorAllocator::new(
            device.clone(),
            config.static_texture_count,
            config.dynamic_texture_capacity,
        )?);
        let command_list = device.create_command_list()?;
        let frame_fence = GpuFence::new(&device)?;
        log::info!(
            "scene initialized ({} static + {} dynamic texture slots)",
            config.static_texture_count,
            config.dynamic_texture_capacity
        );
        let frame = FrameState {
            render_targets: RenderTargetSet::new(device.clone()),
            command_list,
            frame_fence,
            last_submitted_frame: 0,
        };
        Ok(Self {
            device,
            queue,
            allocator,
            frame: Mutex::new(frame),
        })
    }

    /// Upload raw pixel data into a new shader-readable texture. Blocks
    /// until the copy has completed on the GPU; intended for load-time use,
    /// not the per-frame path.
    pub fn create_texture(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        bytes_per_pixel: u32,
        format: crate::device::TextureFormat,
    ) -> SceneResult<UiTexture> {
        let resource =
            upload::upload_texture(&self.device, pixels, width, height, bytes_per_pixel, format)?;
        Ok(UiTexture::new(
            resource,
            width,
            height,
            self.allocator.clone(),
        ))
    }

    /// Pin a texture at a fixed static descriptor index, replacing and
    /// releasing any previous occupant. Static bindings survive frame
    /// boundaries; index 0 conventionally holds the font atlas.
    pub fn bind_static_texture(&self, texture: &UiTexture, index: u32) -> SceneResult<()> {
        self.allocator.bind_static(texture.inner(), index)
    }

    /// Begin a frame: all dynamic descriptor bindings from the previous
    /// frame are dropped.
    pub fn new_frame(&self) {
        self.allocator.clear_dynamic();
    }

    /// Record and submit the UI draw lists against the back buffer at
    /// `back_buffer_index`. A no-op while no render targets exist (between
    /// [`Scene::on_pre_resize`] and [`Scene::on_resize`]) or when the draw
    /// data is empty.
    pub fn render(&self, draw_data: &DrawData, back_buffer_index: u32) -> SceneResult<()> {
        let frame = self.frame.lock();
        if frame.render_targets.is_empty() {
            return Ok(());
        }
        if draw_data.is_empty() {
            return Ok(());
        }
        let (heap, slot, buffer) = frame
            .render_targets
            .entry(back_buffer_index)
            .ok_or_else(|| crate::error::SceneError::InvalidBackBuffer {
                index: back_buffer_index,
                count: frame.render_targets.len(),
            })?;

        let list = frame.command_list;
        self.device.reset_command_list(list)?;
        self.device
            .transition(list, buffer, ResourceState::Present, ResourceState::RenderTarget)?;
        self.device.set_render_target(list, heap, slot)?;
        self.device.set_descriptor_heap(list, self.allocator.heap())?;
        self.device.render_draw_data(list, draw_data)?;
        self.device
            .transition(list, buffer, ResourceState::RenderTarget, ResourceState::Present)?;
        self.device.submit(self.queue, list)?;
        Ok(())
    }

    /// Release all render target views ahead of a swapchain resize. The
    /// scene stays alive but skips rendering until [`Scene::on_resize`].
    pub fn on_pre_resize(&self) {
        self.frame.lock().render_targets.invalidate();
    }

    /// Rebuild render target views against the resized swapchain.
    pub fn on_resize(&self, buffer_count: u32) -> SceneResult<()> {
        self.frame.lock().render_targets.rebuild(buffer_count)
    }

    /// Signal the frame-pacing fence after the host has presented. The
    /// signaled value marks the frame that [`Scene::wait_for_last_submitted_frame`]
    /// will wait for.
    pub fn on_post_present(&self) -> SceneResult<()> {
        let mut frame = self.frame.lock();
        let value = frame.frame_fence.signal(self.queue)?;
        frame.last_submitted_frame = value;
        Ok(())
    }

    /// Block until the GPU has finished the most recently presented frame.
    /// A no-op when no frame is outstanding or the GPU has already passed
    /// it. Call before tearing down resources the frame may still read.
    pub fn wait_for_last_submitted_frame(&self) -> SceneResult<()> {
        let mut frame = self.frame.lock();
        let value = frame.last_submitted_frame;
        if value == 0 {
            return Ok(());
        }
        frame.last_submitted_frame = 0;
        if frame.frame_fence.completed() >= value {
            return Ok(());
        }
        frame.frame_fence.wait(value)?;
        Ok(())
    }

    /// The shader-visible descriptor heap backing all texture bindings.
    pub fn descriptor_heap(&self) -> HeapId {
        self.allocator.heap()
    }

    /// The descriptor allocator, for hosts that drive binding directly.
    pub fn allocator(&self) -> &Arc<DescriptorAllocator> {
        &self.allocator
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        if let Err(err) = self.wait_for_last_submitted_frame() {
            log::warn!("failed to wait for the last frame during shutdown: {err}");
        }
        let frame = self.frame.lock();
        self.device.destroy_command_list(frame.command_list);
        // The queue belongs to the host and is left untouched.
    }
}
