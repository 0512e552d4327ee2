//! Physical device selection and queries.

use crate::error::{GpuError, Result};
use ash::vk;

/// Queue family indices discovered on a physical device.
#[derive(Debug, Clone, Copy)]
pub struct QueueFamilyIndices {
    pub graphics: u32,
    pub compute: u32,
    pub transfer: u32,
}

/// Select the best physical device.
///
/// # Safety
/// The instance must be valid.
pub unsafe fn select_physical_device(instance: &ash::Instance) -> Result<vk::PhysicalDevice> {
    let devices = instance.enumerate_physical_devices()?;

    if devices.is_empty() {
        return Err(GpuError::NoSuitableDevice);
    }

    let mut best_device = None;
    let mut best_score = 0i32;

    for device in devices {
        let score = score_physical_device(instance, device);
        if score > best_score {
            best_score = score;
            best_device = Some(device);
        }
    }

    best_device.ok_or(GpuError::NoSuitableDevice)
}

/// Score a physical device for selection.
unsafe fn score_physical_device(instance: &ash::Instance, device: vk::PhysicalDevice) -> i32 {
    let properties = instance.get_physical_device_properties(device);

    // Vulkan 1.3 is the floor
    let api_version = properties.api_version;
    if vk::api_version_major(api_version) < 1
        || (vk::api_version_major(api_version) == 1 && vk::api_version_minor(api_version) < 3)
    {
        return -1;
    }

    let mut score = 0;

    // Prefer discrete GPUs
    match properties.device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => score += 1000,
        vk::PhysicalDeviceType::INTEGRATED_GPU => score += 100,
        vk::PhysicalDeviceType::VIRTUAL_GPU => score += 50,
        _ => {}
    }

    // Prefer more VRAM
    let memory = instance.get_physical_device_memory_properties(device);
    let vram_mb: u64 = memory
        .memory_heaps
        .iter()
        .take(memory.memory_heap_count as usize)
        .filter(|h| h.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL))
        .map(|h| h.size / (1024 * 1024))
        .sum();
    score += (vram_mb / 1024) as i32; // +1 per GB

    score
}

/// Find queue families for graphics, compute, and transfer.
///
/// Graphics is required. Compute and transfer prefer dedicated families and
/// fall back along the graphics → compute chain.
///
/// # Safety
/// The instance and physical device must be valid.
pub unsafe fn find_queue_families(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
) -> Result<QueueFamilyIndices> {
    let queue_families = instance.get_physical_device_queue_family_properties(physical_device);
    pick_queue_families(&queue_families)
}

fn pick_queue_families(
    queue_families: &[vk::QueueFamilyProperties],
) -> Result<QueueFamilyIndices> {
    let mut graphics_family = None;
    let mut compute_family = None;
    let mut transfer_family = None;

    for (i, family) in queue_families.iter().enumerate() {
        let i = i as u32;

        // Dedicated compute queue (no graphics)
        if family.queue_flags.contains(vk::QueueFlags::COMPUTE)
            && !family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
            && compute_family.is_none()
        {
            compute_family = Some(i);
        }

        // Dedicated transfer queue (no graphics or compute)
        if family.queue_flags.contains(vk::QueueFlags::TRANSFER)
            && !family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
            && !family.queue_flags.contains(vk::QueueFlags::COMPUTE)
            && transfer_family.is_none()
        {
            transfer_family = Some(i);
        }

        if family.queue_flags.contains(vk::QueueFlags::GRAPHICS) && graphics_family.is_none() {
            graphics_family = Some(i);
        }
    }

    let graphics = graphics_family.ok_or(GpuError::NoSuitableDevice)?;
    let compute = compute_family.unwrap_or(graphics);
    let transfer = transfer_family.unwrap_or(compute);

    Ok(QueueFamilyIndices {
        graphics,
        compute,
        transfer,
    })
}

/// Find the lowest memory type index allowed by `type_filter` that has all
/// `required` property flags.
///
/// `type_filter` comes from `vk::MemoryRequirements::memory_type_bits`; bit
/// `i` permits memory type `i`.
pub fn find_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_filter: u32,
    required: vk::MemoryPropertyFlags,
) -> Result<u32> {
    for i in 0..memory_properties.memory_type_count {
        let allowed = type_filter & (1 << i) != 0;
        let has_flags = memory_properties.memory_types[i as usize]
            .property_flags
            .contains(required);
        if allowed && has_flags {
            return Ok(i);
        }
    }

    Err(GpuError::NoSuitableMemoryType {
        type_filter,
        required,
    })
}

/// Highest sample count supported by both the color and depth framebuffer
/// limits, checked in descending order.
pub fn max_sample_count(
    color: vk::SampleCountFlags,
    depth: vk::SampleCountFlags,
) -> vk::SampleCountFlags {
    let both = color & depth;

    for candidate in [
        vk::SampleCountFlags::TYPE_64,
        vk::SampleCountFlags::TYPE_32,
        vk::SampleCountFlags::TYPE_16,
        vk::SampleCountFlags::TYPE_8,
        vk::SampleCountFlags::TYPE_4,
        vk::SampleCountFlags::TYPE_2,
    ] {
        if both.contains(candidate) {
            return candidate;
        }
    }

    vk::SampleCountFlags::TYPE_1
}

/// Highest multisample count usable for color+depth rendering on a device.
///
/// # Safety
/// The instance and physical device must be valid.
pub unsafe fn max_usable_sample_count(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
) -> vk::SampleCountFlags {
    let limits = instance
        .get_physical_device_properties(physical_device)
        .limits;
    max_sample_count(
        limits.framebuffer_color_sample_counts,
        limits.framebuffer_depth_sample_counts,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_properties(flags: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut props = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: flags.len() as u32,
            ..Default::default()
        };
        for (i, &f) in flags.iter().enumerate() {
            props.memory_types[i].property_flags = f;
        }
        props
    }

    #[test]
    fn find_memory_type_returns_lowest_matching_index() {
        let props = memory_properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ]);

        // All types permitted: index 1 is the first host-visible match.
        let index = find_memory_type(
            &props,
            0b111,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )
        .unwrap();
        assert_eq!(index, 1);

        // Filter excludes index 1: fall through to index 2.
        let index = find_memory_type(
            &props,
            0b101,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
        )
        .unwrap();
        assert_eq!(index, 2);
    }

    #[test]
    fn find_memory_type_requires_all_flags() {
        let props = memory_properties(&[vk::MemoryPropertyFlags::HOST_VISIBLE]);

        let err = find_memory_type(
            &props,
            0b1,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )
        .unwrap_err();
        assert!(matches!(err, GpuError::NoSuitableMemoryType { .. }));
    }

    #[test]
    fn find_memory_type_respects_filter() {
        let props = memory_properties(&[vk::MemoryPropertyFlags::DEVICE_LOCAL]);

        // Type exists but the filter forbids it.
        let err =
            find_memory_type(&props, 0b0, vk::MemoryPropertyFlags::DEVICE_LOCAL).unwrap_err();
        assert!(matches!(err, GpuError::NoSuitableMemoryType { .. }));
    }

    #[test]
    fn max_sample_count_takes_highest_common_bit() {
        let color = vk::SampleCountFlags::TYPE_1
            | vk::SampleCountFlags::TYPE_2
            | vk::SampleCountFlags::TYPE_4;
        let depth = vk::SampleCountFlags::TYPE_1 | vk::SampleCountFlags::TYPE_2;

        assert_eq!(max_sample_count(color, depth), vk::SampleCountFlags::TYPE_2);
    }

    #[test]
    fn max_sample_count_defaults_to_one() {
        assert_eq!(
            max_sample_count(vk::SampleCountFlags::empty(), vk::SampleCountFlags::empty()),
            vk::SampleCountFlags::TYPE_1
        );
        assert_eq!(
            max_sample_count(
                vk::SampleCountFlags::TYPE_8,
                vk::SampleCountFlags::TYPE_1 | vk::SampleCountFlags::TYPE_8,
            ),
            vk::SampleCountFlags::TYPE_8
        );
    }

    #[test]
    fn queue_family_fallback_chain() {
        // Only one family with everything: all three collapse onto it.
        let families = [vk::QueueFamilyProperties {
            queue_flags: vk::QueueFlags::GRAPHICS
                | vk::QueueFlags::COMPUTE
                | vk::QueueFlags::TRANSFER,
            queue_count: 1,
            ..Default::default()
        }];
        let indices = pick_queue_families(&families).unwrap();
        assert_eq!(indices.graphics, 0);
        assert_eq!(indices.compute, 0);
        assert_eq!(indices.transfer, 0);
    }

    #[test]
    fn queue_family_prefers_dedicated() {
        let families = [
            vk::QueueFamilyProperties {
                queue_flags: vk::QueueFlags::GRAPHICS
                    | vk::QueueFlags::COMPUTE
                    | vk::QueueFlags::TRANSFER,
                queue_count: 1,
                ..Default::default()
            },
            vk::QueueFamilyProperties {
                queue_flags: vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER,
                queue_count: 1,
                ..Default::default()
            },
            vk::QueueFamilyProperties {
                queue_flags: vk::QueueFlags::TRANSFER,
                queue_count: 1,
                ..Default::default()
            },
        ];
        let indices = pick_queue_families(&families).unwrap();
        assert_eq!(indices.graphics, 0);
        assert_eq!(indices.compute, 1);
        assert_eq!(indices.transfer, 2);
    }

    #[test]
    fn queue_family_requires_graphics() {
        let families = [vk::QueueFamilyProperties {
            queue_flags: vk::QueueFlags::COMPUTE,
            queue_count: 1,
            ..Default::default()
        }];
        assert!(matches!(
            pick_queue_families(&families),
            Err(GpuError::NoSuitableDevice)
        ));
    }
}
