//! Sampler creation.

use crate::error::Result;
use ash::vk;
use std::sync::Arc;

/// Sampler parameters, defaulting to linear filtering with repeat addressing
/// and no anisotropy.
#[derive(Debug, Clone, Copy)]
pub struct SamplerConfig {
    pub mag_filter: vk::Filter,
    pub min_filter: vk::Filter,
    pub mipmap_mode: vk::SamplerMipmapMode,
    pub address_mode: vk::SamplerAddressMode,
    /// Anisotropic filtering level; `None` disables it.
    pub max_anisotropy: Option<f32>,
    pub compare_op: Option<vk::CompareOp>,
    pub min_lod: f32,
    pub max_lod: f32,
    pub border_color: vk::BorderColor,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            mag_filter: vk::Filter::LINEAR,
            min_filter: vk::Filter::LINEAR,
            mipmap_mode: vk::SamplerMipmapMode::LINEAR,
            address_mode: vk::SamplerAddressMode::REPEAT,
            max_anisotropy: None,
            compare_op: None,
            min_lod: 0.0,
            max_lod: vk::LOD_CLAMP_NONE,
            border_color: vk::BorderColor::INT_OPAQUE_BLACK,
        }
    }
}

impl SamplerConfig {
    /// Nearest-neighbor filtering, for pixel-exact sampling.
    pub fn nearest() -> Self {
        Self {
            mag_filter: vk::Filter::NEAREST,
            min_filter: vk::Filter::NEAREST,
            mipmap_mode: vk::SamplerMipmapMode::NEAREST,
            ..Self::default()
        }
    }
}

/// Create a sampler from the given config.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_sampler(device: &ash::Device, config: &SamplerConfig) -> Result<vk::Sampler> {
    let create_info = vk::SamplerCreateInfo::default()
        .mag_filter(config.mag_filter)
        .min_filter(config.min_filter)
        .mipmap_mode(config.mipmap_mode)
        .address_mode_u(config.address_mode)
        .address_mode_v(config.address_mode)
        .address_mode_w(config.address_mode)
        .anisotropy_enable(config.max_anisotropy.is_some())
        .max_anisotropy(config.max_anisotropy.unwrap_or(1.0))
        .compare_enable(config.compare_op.is_some())
        .compare_op(config.compare_op.unwrap_or(vk::CompareOp::ALWAYS))
        .min_lod(config.min_lod)
        .max_lod(config.max_lod)
        .border_color(config.border_color)
        .unnormalized_coordinates(false);

    let sampler = device.create_sampler(&create_info, None)?;
    Ok(sampler)
}

/// An owned sampler destroyed when dropped.
pub struct Sampler {
    device: Arc<ash::Device>,
    sampler: vk::Sampler,
}

impl Sampler {
    /// Create an owned sampler.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(device: Arc<ash::Device>, config: &SamplerConfig) -> Result<Self> {
        let sampler = create_sampler(&device, config)?;
        Ok(Self { device, sampler })
    }

    /// Get the raw sampler handle.
    pub fn handle(&self) -> vk::Sampler {
        self.sampler
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_sampler(self.sampler, None);
        }
    }
}

impl PartialEq for Sampler {
    fn eq(&self, other: &Self) -> bool {
        self.sampler == other.sampler
    }
}

impl Eq for Sampler {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_linear_repeat() {
        let config = SamplerConfig::default();
        assert_eq!(config.mag_filter, vk::Filter::LINEAR);
        assert_eq!(config.address_mode, vk::SamplerAddressMode::REPEAT);
        assert!(config.max_anisotropy.is_none());
        assert!(config.compare_op.is_none());
    }

    #[test]
    fn nearest_config_overrides_filters_only() {
        let config = SamplerConfig::nearest();
        assert_eq!(config.mag_filter, vk::Filter::NEAREST);
        assert_eq!(config.min_filter, vk::Filter::NEAREST);
        assert_eq!(config.address_mode, vk::SamplerAddressMode::REPEAT);
    }
}
