//! Vulkan abstraction layer for the Ember renderer.
//!
//! This crate provides:
//! - Vulkan instance and device management
//! - GPU capability detection
//! - Memory allocation via gpu-allocator
//! - Buffer, image, sampler, and shader module ownership
//! - Render pass, framebuffer, and pipeline construction
//! - Command buffer and synchronization management
//! - Swapchain handling

pub mod capabilities;
pub mod command;
pub mod context;
pub mod debug;
pub mod descriptors;
pub mod device;
pub mod error;
pub mod flags;
pub mod image;
pub mod instance;
pub mod memory;
pub mod physical_device;
pub mod pipeline;
pub mod render_pass;
pub mod sampler;
pub mod shader;
pub mod surface;
pub mod swapchain;
pub mod sync;

pub use capabilities::{DeviceLimits, GpuCapabilities, GpuVendor};
pub use command::{execute_single_time_commands, CommandPool};
pub use context::{GpuContext, GpuContextBuilder};
pub use descriptors::{
    write_sampled_image, write_storage_buffer, write_storage_image, write_uniform_buffer,
    DescriptorPool, DescriptorSetLayoutBuilder,
};
pub use error::{GpuError, Result};
pub use flags::{Bits, FlagBits, Flags};
pub use image::ImageView;
pub use memory::{BufferDesc, GpuAllocator, GpuBuffer, GpuImage, ImageDesc};
pub use physical_device::{find_memory_type, max_sample_count, QueueFamilyIndices};
pub use pipeline::{ComputePipeline, GraphicsPipeline, GraphicsPipelineConfig, PipelineCache};
pub use render_pass::{Framebuffer, RenderPass, RenderPassConfig};
pub use sampler::{Sampler, SamplerConfig};
pub use shader::ShaderModule;
pub use surface::{SurfaceCapabilities, SurfaceContext};
pub use swapchain::Swapchain;
pub use sync::{create_fence, create_semaphore, FrameSync, FrameSyncManager};
