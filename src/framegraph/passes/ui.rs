//! UI pass: draws overlay geometry on top of `Final` with `LoadOp::Load`
//! on both reads and writes — it shares the same image for both, since UI
//! composites onto whatever the post-processing chain already produced.

use crate::framegraph::handle::LogicalResourceHandle;
use crate::framegraph::node::{FrameInfo, NodeInfo, Pass};
use crate::framegraph::pool::ResourcePool;
use crate::framegraph::resource::Usage;
use crate::framegraph::usage::UsageKind;

pub struct UiPass {
    final_image: LogicalResourceHandle,
    pipeline: Option<wgpu::RenderPipeline>,
    draw: Option<(wgpu::BindGroup, u32)>,
}

impl UiPass {
    #[must_use]
    pub fn new(final_image: LogicalResourceHandle) -> Self {
        Self { final_image, pipeline: None, draw: None }
    }

    /// Installs this frame's compiled UI draw list: a bind group holding
    /// the vertex/index/texture-atlas bindings plus a vertex count.
    /// Building that bind group is the UI layer's job, not this pass's —
    /// it only ever replays whatever it's handed.
    pub fn set_pipeline(&mut self, pipeline: wgpu::RenderPipeline) {
        self.pipeline = Some(pipeline);
    }

    pub fn set_draw(&mut self, bind_group: wgpu::BindGroup, vertex_count: u32) {
        self.draw = Some((bind_group, vertex_count));
    }
}

impl Pass for UiPass {
    fn info(&self) -> NodeInfo {
        NodeInfo {
            name: "UI".into(),
            reads: vec![Usage { resource: self.final_image, kind: UsageKind::ColorAttachment }],
            writes: vec![Usage { resource: self.final_image, kind: UsageKind::ColorAttachment }],
        }
    }

    fn execute(&mut self, pool: &ResourcePool, _frame: &FrameInfo, encoder: &mut wgpu::CommandEncoder) {
        let Some(pipeline) = &self.pipeline else {
            return;
        };
        let Some((bind_group, vertex_count)) = self.draw.take() else {
            return;
        };
        let Ok(final_image) = pool.image(self.final_image) else {
            log::warn!("ui pass: Final image not materialized, skipping");
            return;
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("UI Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &final_image.view,
                resolve_target: None,
                ops: wgpu::Operations { load: wgpu::LoadOp::Load, store: wgpu::StoreOp::Store },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..vertex_count, 0..1);
    }
}
