//! Shader module creation.

use crate::error::{GpuError, Result};
use ash::vk;
use std::sync::Arc;

const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Convert a raw SPIR-V byte slice into the word vector Vulkan consumes.
///
/// Validates the 4-byte alignment and the SPIR-V magic number, handling both
/// byte orders.
pub fn spirv_words_from_bytes(bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return Err(GpuError::InvalidShader(format!(
            "SPIR-V byte length {} is not a positive multiple of 4",
            bytes.len()
        )));
    }

    let words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    match words[0] {
        SPIRV_MAGIC => Ok(words),
        w if w.swap_bytes() == SPIRV_MAGIC => Ok(words.iter().map(|w| w.swap_bytes()).collect()),
        _ => Err(GpuError::InvalidShader(
            "Missing SPIR-V magic number".to_string(),
        )),
    }
}

/// Create a shader module from SPIR-V words.
///
/// # Safety
/// The device must be valid and the code must be valid SPIR-V.
pub unsafe fn create_shader_module(
    device: &ash::Device,
    code: &[u32],
) -> Result<vk::ShaderModule> {
    let create_info = vk::ShaderModuleCreateInfo::default().code(code);
    let module = device.create_shader_module(&create_info, None)?;
    Ok(module)
}

/// An owned shader module destroyed when dropped.
pub struct ShaderModule {
    device: Arc<ash::Device>,
    module: vk::ShaderModule,
}

impl ShaderModule {
    /// Create an owned shader module from SPIR-V words.
    ///
    /// # Safety
    /// The device must be valid and the code must be valid SPIR-V.
    pub unsafe fn new(device: Arc<ash::Device>, code: &[u32]) -> Result<Self> {
        let module = create_shader_module(&device, code)?;
        Ok(Self { device, module })
    }

    /// Create an owned shader module from raw SPIR-V bytes.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn from_bytes(device: Arc<ash::Device>, bytes: &[u8]) -> Result<Self> {
        let words = spirv_words_from_bytes(bytes)?;
        Self::new(device, &words)
    }

    /// Get the raw module handle.
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}

impl PartialEq for ShaderModule {
    fn eq(&self, other: &Self) -> bool {
        self.module == other.module
    }
}

impl Eq for ShaderModule {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_misaligned_input() {
        assert!(matches!(
            spirv_words_from_bytes(&[0x03, 0x02, 0x23]),
            Err(GpuError::InvalidShader(_))
        ));
        assert!(matches!(
            spirv_words_from_bytes(&[]),
            Err(GpuError::InvalidShader(_))
        ));
    }

    #[test]
    fn rejects_missing_magic() {
        let bytes = [0u8; 8];
        assert!(matches!(
            spirv_words_from_bytes(&bytes),
            Err(GpuError::InvalidShader(_))
        ));
    }

    #[test]
    fn accepts_little_endian_magic() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&SPIRV_MAGIC.to_le_bytes());
        bytes.extend_from_slice(&0x0001_0000u32.to_le_bytes());
        let words = spirv_words_from_bytes(&bytes).unwrap();
        assert_eq!(words, vec![SPIRV_MAGIC, 0x0001_0000]);
    }

    #[test]
    fn swaps_big_endian_input() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&SPIRV_MAGIC.to_be_bytes());
        bytes.extend_from_slice(&0x0001_0000u32.to_be_bytes());
        let words = spirv_words_from_bytes(&bytes).unwrap();
        assert_eq!(words[0], SPIRV_MAGIC);
        assert_eq!(words[1], 0x0001_0000);
    }
}
