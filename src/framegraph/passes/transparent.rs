//! Transparent pass: forward-renders alpha-blended geometry on top of the
//! lit opaque image, back-to-front, with depth testing on and depth writes
//! off so overlapping transparent batches blend against what's already
//! there rather than occluding each other.
//!
//! Runs after [`crate::framegraph::passes::skybox::SkyboxPass`] and before
//! [`crate::framegraph::passes::lighting::LightingPass`] resolves the
//! G-buffer, matching the donor's ordering: opaque, then transmission
//! copy (not modeled here), then transparent.

use crate::framegraph::handle::LogicalResourceHandle;
use crate::framegraph::node::{FrameInfo, NodeInfo, Pass};
use crate::framegraph::pipeline::{ColorTargetKey, DepthStencilKey, GraphicsPipelineKey, PipelineCache, ShaderCache};
use crate::framegraph::pool::ResourcePool;
use crate::framegraph::resource::Usage;
use crate::framegraph::scene_feed::SceneFeed;
use crate::framegraph::usage::UsageKind;

const SHADER_PATH: &str = "shaders/transparent.wgsl";

pub struct TransparentPass {
    scene_color: LogicalResourceHandle,
    depth: LogicalResourceHandle,

    frame_layout: wgpu::BindGroupLayout,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group: Option<wgpu::BindGroup>,
    batches: Vec<(u32, u32)>,
}

impl TransparentPass {
    #[must_use]
    pub fn new(device: &wgpu::Device, scene_color: LogicalResourceHandle, depth: LogicalResourceHandle) -> Self {
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("transparent-frame-layout"),
            entries: &[
                storage_entry(0, true),
                storage_entry(1, true),
                storage_entry(2, true),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer { ty: wgpu::BufferBindingType::Uniform, has_dynamic_offset: false, min_binding_size: None },
                    count: None,
                },
            ],
        });

        Self { scene_color, depth, frame_layout, pipeline: None, bind_group: None, batches: Vec::new() }
    }

    /// Rebuilds the frame bind group and the back-to-front batch order for
    /// the coming frame. `batches` is the caller's already depth-sorted
    /// `(first_instance, count)` ranges — sorting draw order is a scene
    /// concern, not this pass's.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        scene_feed: &SceneFeed,
        pipelines: &mut PipelineCache,
        shaders: &mut ShaderCache,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
        batches: &[(u32, u32)],
    ) {
        if self.pipeline.is_none() {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("transparent-pipeline-layout"),
                bind_group_layouts: &[&self.frame_layout],
                immediate_size: 0,
            });
            let key = GraphicsPipelineKey {
                shader_path: SHADER_PATH.into(),
                vs_entry: "vs_main".into(),
                fs_entry: "fs_main".into(),
                vertex_layout_id: 0,
                bind_group_layout_ids: smallvec::smallvec![],
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                color_targets: smallvec::smallvec![ColorTargetKey {
                    format: color_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL.bits(),
                }],
                depth_stencil: Some(DepthStencilKey { format: depth_format, depth_write_enabled: false, depth_compare: wgpu::CompareFunction::GreaterEqual }),
                sample_count: 1,
            };
            match pipelines.get_or_create_graphics(device, shaders, &key, &layout, &[]) {
                Ok(id) => self.pipeline = Some(pipelines.get_render_pipeline(id).clone()),
                Err(err) => log::warn!("transparent pipeline build failed: {err}"),
            }
        }

        self.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("transparent-frame-bind-group"),
            layout: &self.frame_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: scene_feed.static_instances().as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: scene_feed.dynamic_instances().as_entire_binding() },
                wgpu::BindGroupEntry { binding: 2, resource: scene_feed.batch_metadata().as_entire_binding() },
                wgpu::BindGroupEntry { binding: 3, resource: scene_feed.camera().as_entire_binding() },
            ],
        }));

        self.batches.clear();
        self.batches.extend_from_slice(batches);
    }
}

impl Pass for TransparentPass {
    fn info(&self) -> NodeInfo {
        NodeInfo {
            name: "Transparent".into(),
            reads: vec![Usage { resource: self.depth, kind: UsageKind::DepthStencilAttachment }],
            writes: vec![Usage { resource: self.scene_color, kind: UsageKind::ColorAttachment }],
        }
    }

    fn execute(&mut self, pool: &ResourcePool, _frame: &FrameInfo, encoder: &mut wgpu::CommandEncoder) {
        let (Some(pipeline), Some(bind_group)) = (&self.pipeline, &self.bind_group) else {
            return;
        };
        let (Ok(color), Ok(depth)) = (pool.image(self.scene_color), pool.image(self.depth)) else {
            log::warn!("transparent pass: SceneColor or Depth not materialized, skipping");
            return;
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Transparent Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &color.view,
                resolve_target: None,
                ops: wgpu::Operations { load: wgpu::LoadOp::Load, store: wgpu::StoreOp::Store },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth.view,
                depth_ops: Some(wgpu::Operations { load: wgpu::LoadOp::Load, store: wgpu::StoreOp::Store }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        for &(first_instance, count) in &self.batches {
            if count == 0 {
                continue;
            }
            pass.draw(0..3, first_instance..first_instance + count);
        }
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer { ty: wgpu::BufferBindingType::Storage { read_only }, has_dynamic_offset: false, min_binding_size: None },
        count: None,
    }
}
