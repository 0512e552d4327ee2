//! GPU error types.

use ash::vk;
use thiserror::Error;

/// GPU-related errors.
///
/// Native result codes surface unchanged through the `Vulkan` variant; the
/// remaining variants cover decisions this crate makes itself.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Vulkan error.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// No suitable GPU found.
    #[error("No suitable GPU found")]
    NoSuitableDevice,

    /// No memory type satisfies the given filter and property flags.
    #[error("No memory type matches filter {type_filter:#x} with flags {required:?}")]
    NoSuitableMemoryType {
        type_filter: u32,
        required: vk::MemoryPropertyFlags,
    },

    /// Required extension not supported.
    #[error("Required extension not supported: {0}")]
    ExtensionNotSupported(String),

    /// Memory allocation failed.
    #[error("Memory allocation failed: {0}")]
    AllocationFailed(String),

    /// Surface creation failed.
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    /// Swapchain creation failed.
    #[error("Swapchain creation failed: {0}")]
    SwapchainCreation(String),

    /// SPIR-V shader code rejected.
    #[error("Invalid shader code: {0}")]
    InvalidShader(String),

    /// Pipeline creation failed.
    #[error("Pipeline creation failed: {0}")]
    PipelineCreation(String),

    /// Invalid state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;
