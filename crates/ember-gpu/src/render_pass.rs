//! Render pass and framebuffer creation.
//!
//! Pipelines targeting Vulkan 1.3 dynamic rendering skip this module
//! entirely; it exists for the classic attachment-description path.

use crate::error::Result;
use ash::vk;
use std::sync::Arc;

/// Render pass parameters: one color attachment, an optional depth
/// attachment, and a single subpass.
#[derive(Debug, Clone, Copy)]
pub struct RenderPassConfig {
    pub color_format: vk::Format,
    pub depth_format: Option<vk::Format>,
    pub samples: vk::SampleCountFlags,
    pub color_load_op: vk::AttachmentLoadOp,
    pub color_store_op: vk::AttachmentStoreOp,
    /// Layout the color attachment transitions to when the pass ends.
    pub final_layout: vk::ImageLayout,
}

impl Default for RenderPassConfig {
    fn default() -> Self {
        Self {
            color_format: vk::Format::B8G8R8A8_SRGB,
            depth_format: Some(vk::Format::D32_SFLOAT),
            samples: vk::SampleCountFlags::TYPE_1,
            color_load_op: vk::AttachmentLoadOp::CLEAR,
            color_store_op: vk::AttachmentStoreOp::STORE,
            final_layout: vk::ImageLayout::PRESENT_SRC_KHR,
        }
    }
}

/// Create a render pass from the given config.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_render_pass(
    device: &ash::Device,
    config: &RenderPassConfig,
) -> Result<vk::RenderPass> {
    let mut attachments = vec![vk::AttachmentDescription::default()
        .format(config.color_format)
        .samples(config.samples)
        .load_op(config.color_load_op)
        .store_op(config.color_store_op)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(config.final_layout)];

    let color_ref = vk::AttachmentReference::default()
        .attachment(0)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

    let depth_ref = vk::AttachmentReference::default()
        .attachment(1)
        .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

    let mut subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(std::slice::from_ref(&color_ref));

    let mut dependency = vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE);

    if let Some(depth_format) = config.depth_format {
        attachments.push(
            vk::AttachmentDescription::default()
                .format(depth_format)
                .samples(config.samples)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::DONT_CARE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
        );

        subpass = subpass.depth_stencil_attachment(&depth_ref);

        dependency = dependency
            .src_stage_mask(
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                    | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            )
            .dst_stage_mask(
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                    | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            )
            .dst_access_mask(
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            );
    }

    let create_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(std::slice::from_ref(&subpass))
        .dependencies(std::slice::from_ref(&dependency));

    let render_pass = device.create_render_pass(&create_info, None)?;
    Ok(render_pass)
}

/// An owned render pass destroyed when dropped.
pub struct RenderPass {
    device: Arc<ash::Device>,
    render_pass: vk::RenderPass,
}

impl RenderPass {
    /// Create an owned render pass.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(device: Arc<ash::Device>, config: &RenderPassConfig) -> Result<Self> {
        let render_pass = create_render_pass(&device, config)?;
        Ok(Self {
            device,
            render_pass,
        })
    }

    /// Get the raw render pass handle.
    pub fn handle(&self) -> vk::RenderPass {
        self.render_pass
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_render_pass(self.render_pass, None);
        }
    }
}

impl PartialEq for RenderPass {
    fn eq(&self, other: &Self) -> bool {
        self.render_pass == other.render_pass
    }
}

impl Eq for RenderPass {}

/// Create a framebuffer binding the given views to a render pass.
///
/// # Safety
/// All handles must be valid; view count and formats must match the pass.
pub unsafe fn create_framebuffer(
    device: &ash::Device,
    render_pass: vk::RenderPass,
    attachments: &[vk::ImageView],
    extent: vk::Extent2D,
) -> Result<vk::Framebuffer> {
    let create_info = vk::FramebufferCreateInfo::default()
        .render_pass(render_pass)
        .attachments(attachments)
        .width(extent.width)
        .height(extent.height)
        .layers(1);

    let framebuffer = device.create_framebuffer(&create_info, None)?;
    Ok(framebuffer)
}

/// An owned framebuffer destroyed when dropped.
pub struct Framebuffer {
    device: Arc<ash::Device>,
    framebuffer: vk::Framebuffer,
    extent: vk::Extent2D,
}

impl Framebuffer {
    /// Create an owned framebuffer.
    ///
    /// # Safety
    /// All handles must be valid; the attachments must outlive the
    /// framebuffer.
    pub unsafe fn new(
        device: Arc<ash::Device>,
        render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> Result<Self> {
        let framebuffer = create_framebuffer(&device, render_pass, attachments, extent)?;
        Ok(Self {
            device,
            framebuffer,
            extent,
        })
    }

    /// Get the raw framebuffer handle.
    pub fn handle(&self) -> vk::Framebuffer {
        self.framebuffer
    }

    /// The framebuffer dimensions.
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_framebuffer(self.framebuffer, None);
        }
    }
}

impl PartialEq for Framebuffer {
    fn eq(&self, other: &Self) -> bool {
        self.framebuffer == other.framebuffer
    }
}

impl Eq for Framebuffer {}
