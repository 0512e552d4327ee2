//! Vulkan instance creation.

use crate::error::{GpuError, Result};
use ash::vk;
use std::ffi::{CStr, CString};

/// Application identity and API version reported at instance creation.
#[derive(Debug, Clone)]
pub struct AppInfo {
    /// Application name.
    pub app_name: String,
    /// Application version, packed with `vk::make_api_version`.
    pub app_version: u32,
    /// Engine version, packed with `vk::make_api_version`.
    pub engine_version: u32,
    /// Requested Vulkan API version.
    pub api_version: u32,
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            app_name: "Ember".to_string(),
            app_version: vk::make_api_version(0, 0, 1, 0),
            engine_version: vk::make_api_version(0, 0, 1, 0),
            api_version: vk::API_VERSION_1_3,
        }
    }
}

/// Required instance extensions for the renderer.
pub fn required_instance_extensions(with_debug: bool) -> Vec<&'static CStr> {
    let mut extensions = vec![
        ash::khr::surface::NAME,
        #[cfg(target_os = "windows")]
        ash::khr::win32_surface::NAME,
        #[cfg(target_os = "linux")]
        ash::khr::xlib_surface::NAME,
        #[cfg(target_os = "linux")]
        ash::khr::wayland_surface::NAME,
        #[cfg(target_os = "macos")]
        ash::ext::metal_surface::NAME,
        #[cfg(target_os = "macos")]
        ash::khr::portability_enumeration::NAME,
    ];

    if with_debug {
        extensions.push(ash::ext::debug_utils::NAME);
    }

    extensions
}

/// Validation layers to enable in debug builds.
pub fn validation_layers() -> Vec<&'static CStr> {
    vec![c"VK_LAYER_KHRONOS_validation"]
}

/// Create a Vulkan instance.
///
/// Requested validation layers that are not installed are skipped with a
/// warning rather than failing instance creation.
///
/// # Safety
/// The entry must be a valid Vulkan entry point.
pub unsafe fn create_instance(
    entry: &ash::Entry,
    app_info: &AppInfo,
    enable_validation: bool,
) -> Result<ash::Instance> {
    let app_name = CString::new(app_info.app_name.as_str())
        .map_err(|_| GpuError::InvalidState("Application name contains NUL".to_string()))?;
    let engine_name = c"Ember";

    let application_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .application_version(app_info.app_version)
        .engine_name(engine_name)
        .engine_version(app_info.engine_version)
        .api_version(app_info.api_version);

    let extension_names: Vec<*const i8> = required_instance_extensions(enable_validation)
        .iter()
        .map(|ext| ext.as_ptr())
        .collect();

    // Keep only layers the loader actually knows about
    let available_layers = entry.enumerate_instance_layer_properties()?;
    let layers: Vec<&CStr> = if enable_validation {
        validation_layers()
            .into_iter()
            .filter(|layer| {
                let found = available_layers.iter().any(|props| {
                    let name = CStr::from_ptr(props.layer_name.as_ptr());
                    name == *layer
                });
                if !found {
                    tracing::warn!("Validation layer {:?} not available", layer);
                }
                found
            })
            .collect()
    } else {
        vec![]
    };

    let layer_names: Vec<*const i8> = layers.iter().map(|l| l.as_ptr()).collect();

    // Required for MoltenVK on macOS
    #[cfg(target_os = "macos")]
    let create_flags = vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
    #[cfg(not(target_os = "macos"))]
    let create_flags = vk::InstanceCreateFlags::empty();

    let create_info = vk::InstanceCreateInfo::default()
        .application_info(&application_info)
        .enabled_extension_names(&extension_names)
        .enabled_layer_names(&layer_names)
        .flags(create_flags);

    let instance = entry.create_instance(&create_info, None)?;

    tracing::debug!(
        "Created instance for {:?}, API {}.{}.{}",
        app_info.app_name,
        vk::api_version_major(app_info.api_version),
        vk::api_version_minor(app_info.api_version),
        vk::api_version_patch(app_info.api_version),
    );

    Ok(instance)
}
