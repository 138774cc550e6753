//! CPU/GPU fence synchronization.
//!
//! Wraps a device fence carrying a monotonically increasing completion value.
//! This is the only primitive in the crate that ever blocks the calling
//! thread: once for the synchronous texture upload, and optionally once for
//! the last submitted frame during shutdown.

use std::sync::Arc;

use crate::device::{DeviceResult, FenceId, QueueId, RenderDevice};

/// A monotonic GPU fence with its OS waitable object.
///
/// Values only increase. [`GpuFence::signal`] enqueues a GPU-side signal
/// after all currently queued work on the given queue; [`GpuFence::wait`]
/// blocks until the GPU reaches the value, returning immediately when it
/// already has. All waits are unbounded.
pub struct GpuFence {
    device: Arc<dyn RenderDevice>,
    fence: FenceId,
    last_signaled: u64,
    last_waited: u64,
}

impl GpuFence {
    /// Create the fence and its waitable object. Failure is fatal to the
    /// caller; there is no fallback synchronization path.
    pub fn new(device: &Arc<dyn RenderDevice>) -> DeviceResult<Self> {
        let fence = device.create_fence()?;
        Ok(Self {
            device: device.clone(),
            fence,
            last_signaled: 0,
            last_waited: 0,
        })
    }

    /// Schedule a GPU-side signal of the next value on `queue` and return
    /// that value as the token to wait on.
    pub fn signal(&mut self, queue: QueueId) -> DeviceResult<u64> {
        let value = self.last_signaled + 1;
        self.device.signal_fence(queue, self.fence, value)?;
        self.last_signaled = value;
        Ok(value)
    }

    /// Block until the GPU has reached `value`. A value already waited for
    /// is a no-op.
    pub fn wait(&mut self, value: u64) -> DeviceResult<()> {
        if value <= self.last_waited {
            return Ok(());
        }
        self.device.wait_fence(self.fence, value)?;
        self.last_waited = value;
        Ok(())
    }

    /// The highest value the GPU has completed.
    pub fn completed(&self) -> u64 {
        self.device.fence_completed_value(self.fence)
    }

    /// The highest value scheduled for signaling.
    pub fn last_signaled(&self) -> u64 {
        self.last_signaled
    }
}

impl Drop for GpuFence {
    fn drop(&mut self) {
        self.device.destroy_fence(self.fence);
    }
}
