//! Present pass: copies the graph's `Final` image into the swapchain.
//!
//! The swapchain texture isn't a frame-graph resource — it's handed in
//! fresh every frame by the windowing surface — so this pass is the one
//! place barriers are issued directly rather than synthesized by the
//! compiler: `Final`'s `TransferSrc` usage comes from its own declared
//! [`UsageKind`], but the swapchain side of the copy has no logical
//! resource to attach a usage to.

use crate::framegraph::handle::LogicalResourceHandle;
use crate::framegraph::node::{FrameInfo, NodeInfo, Pass};
use crate::framegraph::pool::ResourcePool;
use crate::framegraph::resource::Usage;
use crate::framegraph::usage::UsageKind;

pub struct PresentPass {
    final_image: LogicalResourceHandle,
    target: Option<wgpu::Texture>,
}

impl PresentPass {
    #[must_use]
    pub fn new(final_image: LogicalResourceHandle) -> Self {
        Self { final_image, target: None }
    }

    /// Hands this frame's swapchain texture to the pass. Must be called
    /// before [`crate::framegraph::graph::FrameGraph::execute`] every frame.
    pub fn set_target(&mut self, target: wgpu::Texture) {
        self.target = Some(target);
    }
}

impl Pass for PresentPass {
    fn info(&self) -> NodeInfo {
        NodeInfo {
            name: "Present".into(),
            reads: vec![Usage { resource: self.final_image, kind: UsageKind::TransferSrc }],
            writes: vec![],
        }
    }

    fn execute(&mut self, pool: &ResourcePool, _frame: &FrameInfo, encoder: &mut wgpu::CommandEncoder) {
        let Some(target) = self.target.take() else {
            log::warn!("present pass: no swapchain target set for this frame");
            return;
        };
        let Ok(final_image) = pool.image(self.final_image) else {
            log::warn!("present pass: Final image not materialized, skipping");
            return;
        };

        encoder.copy_texture_to_texture(
            wgpu::TexelCopyTextureInfo { texture: &final_image.texture, mip_level: 0, origin: wgpu::Origin3d::ZERO, aspect: wgpu::TextureAspect::All },
            wgpu::TexelCopyTextureInfo { texture: &target, mip_level: 0, origin: wgpu::Origin3d::ZERO, aspect: wgpu::TextureAspect::All },
            wgpu::Extent3d { width: final_image.extent.0, height: final_image.extent.1, depth_or_array_layers: 1 },
        );
    }
}
