//! Logical device creation.

use crate::error::{GpuError, Result};
use crate::physical_device::QueueFamilyIndices;
use ash::vk;
use std::ffi::CStr;

/// Device queues retrieved at creation time, one per discovered family.
#[derive(Debug, Clone, Copy)]
pub struct DeviceQueues {
    pub graphics: vk::Queue,
    pub compute: vk::Queue,
    pub transfer: vk::Queue,
}

/// Required device extensions.
pub fn required_device_extensions() -> Vec<&'static CStr> {
    vec![
        ash::khr::swapchain::NAME,
        #[cfg(target_os = "macos")]
        ash::khr::portability_subset::NAME,
    ]
}

/// Check that a physical device exposes every required extension.
///
/// # Safety
/// The instance and physical device must be valid.
pub unsafe fn check_device_extensions(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
) -> Result<()> {
    let available = instance.enumerate_device_extension_properties(physical_device)?;

    for required in required_device_extensions() {
        let found = available
            .iter()
            .any(|props| CStr::from_ptr(props.extension_name.as_ptr()) == required);
        if !found {
            return Err(GpuError::ExtensionNotSupported(
                required.to_string_lossy().into_owned(),
            ));
        }
    }

    Ok(())
}

/// Create the logical device and retrieve queues.
///
/// # Safety
/// The instance and physical device must be valid.
pub unsafe fn create_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    queue_families: &QueueFamilyIndices,
) -> Result<(ash::Device, DeviceQueues)> {
    check_device_extensions(instance, physical_device)?;

    // Collect unique queue families
    let mut unique_families = std::collections::HashSet::new();
    unique_families.insert(queue_families.graphics);
    unique_families.insert(queue_families.compute);
    unique_families.insert(queue_families.transfer);

    let queue_priority = 1.0_f32;
    let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
        .iter()
        .map(|&family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(std::slice::from_ref(&queue_priority))
        })
        .collect();

    let extensions = required_device_extensions();
    let extension_names: Vec<*const i8> = extensions.iter().map(|ext| ext.as_ptr()).collect();

    // Vulkan 1.3 features
    let mut vulkan_1_3_features = vk::PhysicalDeviceVulkan13Features::default()
        .dynamic_rendering(true)
        .synchronization2(true)
        .maintenance4(true);

    // Vulkan 1.2 features
    let mut vulkan_1_2_features = vk::PhysicalDeviceVulkan12Features::default()
        .buffer_device_address(true)
        .descriptor_indexing(true)
        .scalar_block_layout(true)
        .runtime_descriptor_array(true)
        .shader_sampled_image_array_non_uniform_indexing(true);

    let features = vk::PhysicalDeviceFeatures::default().sampler_anisotropy(true);

    let mut features2 = vk::PhysicalDeviceFeatures2::default()
        .features(features)
        .push_next(&mut vulkan_1_3_features)
        .push_next(&mut vulkan_1_2_features);

    let device_create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&extension_names)
        .push_next(&mut features2);

    let device = instance
        .create_device(physical_device, &device_create_info, None)
        .map_err(GpuError::from)?;

    let queues = DeviceQueues {
        graphics: device.get_device_queue(queue_families.graphics, 0),
        compute: device.get_device_queue(queue_families.compute, 0),
        transfer: device.get_device_queue(queue_families.transfer, 0),
    };

    Ok((device, queues))
}
