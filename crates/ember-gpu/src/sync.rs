//! Synchronization primitives.

use crate::error::Result;
use ash::vk;
use std::sync::Arc;

/// Create a semaphore.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_semaphore(device: &ash::Device) -> Result<vk::Semaphore> {
    let create_info = vk::SemaphoreCreateInfo::default();
    let semaphore = device.create_semaphore(&create_info, None)?;
    Ok(semaphore)
}

/// Create a fence.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_fence(device: &ash::Device, signaled: bool) -> Result<vk::Fence> {
    let flags = if signaled {
        vk::FenceCreateFlags::SIGNALED
    } else {
        vk::FenceCreateFlags::empty()
    };

    let create_info = vk::FenceCreateInfo::default().flags(flags);
    let fence = device.create_fence(&create_info, None)?;
    Ok(fence)
}

/// Wait for a fence to be signaled.
///
/// # Safety
/// The device and fence must be valid.
#[cfg_attr(feature = "profiling-tracy", tracing::instrument(level = "trace", skip_all))]
pub unsafe fn wait_for_fence(
    device: &ash::Device,
    fence: vk::Fence,
    timeout_ns: u64,
) -> Result<()> {
    device.wait_for_fences(&[fence], true, timeout_ns)?;
    Ok(())
}

/// Reset a fence to unsignaled state.
///
/// # Safety
/// The device and fence must be valid.
pub unsafe fn reset_fence(device: &ash::Device, fence: vk::Fence) -> Result<()> {
    device.reset_fences(&[fence])?;
    Ok(())
}

/// Create an event, for fine-grained host/device signaling.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_event(device: &ash::Device) -> Result<vk::Event> {
    let create_info = vk::EventCreateInfo::default();
    let event = device.create_event(&create_info, None)?;
    Ok(event)
}

/// Signal an event from the host.
///
/// # Safety
/// The device and event must be valid.
pub unsafe fn set_event(device: &ash::Device, event: vk::Event) -> Result<()> {
    device.set_event(event)?;
    Ok(())
}

/// Unsignal an event from the host.
///
/// # Safety
/// The device and event must be valid.
pub unsafe fn reset_event(device: &ash::Device, event: vk::Event) -> Result<()> {
    device.reset_event(event)?;
    Ok(())
}

/// Query event status from the host; `true` means signaled.
///
/// # Safety
/// The device and event must be valid.
pub unsafe fn event_signaled(device: &ash::Device, event: vk::Event) -> Result<bool> {
    let signaled = device.get_event_status(event)?;
    Ok(signaled)
}

/// Per-frame synchronization resources; destroyed when dropped.
pub struct FrameSync {
    device: Arc<ash::Device>,
    /// Semaphore signaled when the swapchain image is available.
    pub image_available: vk::Semaphore,
    /// Semaphore signaled when rendering is complete.
    pub render_finished: vk::Semaphore,
    /// Fence signaled when the frame's work has drained.
    pub in_flight: vk::Fence,
}

impl FrameSync {
    /// Create frame synchronization resources.
    ///
    /// The fence starts signaled so the first frame does not wait.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(device: Arc<ash::Device>) -> Result<Self> {
        Ok(Self {
            image_available: create_semaphore(&device)?,
            render_finished: create_semaphore(&device)?,
            in_flight: create_fence(&device, true)?,
            device,
        })
    }

    /// Wait for this frame's previous submission to finish.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn wait(&self) -> Result<()> {
        wait_for_fence(&self.device, self.in_flight, u64::MAX)
    }

    /// Reset the fence for the next submission.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn reset(&self) -> Result<()> {
        reset_fence(&self.device, self.in_flight)
    }
}

impl Drop for FrameSync {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.image_available, None);
            self.device.destroy_semaphore(self.render_finished, None);
            self.device.destroy_fence(self.in_flight, None);
        }
    }
}

/// Ring of `FrameSync` bundles for multiple frames in flight.
pub struct FrameSyncManager {
    frame_syncs: Vec<FrameSync>,
    current_frame: usize,
}

impl FrameSyncManager {
    /// Create a sync manager for the given number of frames in flight.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(device: &Arc<ash::Device>, frames_in_flight: usize) -> Result<Self> {
        let mut frame_syncs = Vec::with_capacity(frames_in_flight);
        for _ in 0..frames_in_flight {
            frame_syncs.push(FrameSync::new(device.clone())?);
        }

        Ok(Self {
            frame_syncs,
            current_frame: 0,
        })
    }

    /// Get the current frame's sync resources.
    pub fn current(&self) -> &FrameSync {
        &self.frame_syncs[self.current_frame]
    }

    /// Advance to the next frame.
    pub fn advance(&mut self) {
        self.current_frame = (self.current_frame + 1) % self.frame_syncs.len();
    }

    /// Get the current frame index.
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// Number of frames in flight.
    pub fn frames_in_flight(&self) -> usize {
        self.frame_syncs.len()
    }
}
