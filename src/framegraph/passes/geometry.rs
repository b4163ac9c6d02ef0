//! Geometry pass: the only writer of the deferred G-buffer.
//!
//! Clears Position, Normal, Albedo, ARM, Emissive, and Depth on load and
//! draws every registered batch as a single instanced draw over its
//! contiguous instance range, matching the layout [`crate::framegraph::batch::BatchRegistry`]
//! maintains. Vertex data is derived in the vertex shader from
//! `instance_index` against the bindless mesh handle packed into each
//! [`crate::framegraph::scene_feed::Instance`] — there is no separate
//! vertex/index buffer bound here.

use crate::framegraph::batch::BatchRegistry;
use crate::framegraph::bindless::BindlessTable;
use crate::framegraph::handle::LogicalResourceHandle;
use crate::framegraph::node::{FrameInfo, NodeInfo, Pass};
use crate::framegraph::pipeline::{ColorTargetKey, DepthStencilKey, GraphicsPipelineKey, PipelineCache, ShaderCache};
use crate::framegraph::pool::ResourcePool;
use crate::framegraph::resource::Usage;
use crate::framegraph::scene_feed::SceneFeed;
use crate::framegraph::usage::UsageKind;

const SHADER_PATH: &str = "shaders/geometry.wgsl";

pub struct GeometryPass {
    position: LogicalResourceHandle,
    normal: LogicalResourceHandle,
    albedo: LogicalResourceHandle,
    arm: LogicalResourceHandle,
    emissive: LogicalResourceHandle,
    depth: LogicalResourceHandle,

    frame_layout: wgpu::BindGroupLayout,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group: Option<wgpu::BindGroup>,
    batches: Vec<(u32, u32)>,
}

impl GeometryPass {
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        position: LogicalResourceHandle,
        normal: LogicalResourceHandle,
        albedo: LogicalResourceHandle,
        arm: LogicalResourceHandle,
        emissive: LogicalResourceHandle,
        depth: LogicalResourceHandle,
    ) -> Self {
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("geometry-frame-layout"),
            entries: &[
                storage_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT, true),
                storage_entry(1, wgpu::ShaderStages::VERTEX_FRAGMENT, true),
                storage_entry(2, wgpu::ShaderStages::VERTEX_FRAGMENT, true),
                uniform_entry(3, wgpu::ShaderStages::VERTEX_FRAGMENT),
            ],
        });

        Self { position, normal, albedo, arm, emissive, depth, frame_layout, pipeline: None, bind_group: None, batches: Vec::new() }
    }

    /// Rebuilds the frame bind group and draw-batch list for the coming
    /// frame. Called once per frame before [`crate::framegraph::graph::FrameGraph::execute`].
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        scene_feed: &SceneFeed,
        bindless: &BindlessTable,
        registry: &BatchRegistry,
        pipelines: &mut PipelineCache,
        shaders: &mut ShaderCache,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) {
        if self.pipeline.is_none() {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("geometry-pipeline-layout"),
                bind_group_layouts: &[bindless.layout(), &self.frame_layout],
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
                cull_mode: Some(wgpu::Face::Back),
                color_targets: smallvec::smallvec![
                    ColorTargetKey { format: color_format, blend: None, write_mask: wgpu::ColorWrites::ALL.bits() };
                    5
                ],
                depth_stencil: Some(DepthStencilKey {
                    format: depth_format,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::GreaterEqual,
                }),
                sample_count: 1,
            };
            match pipelines.get_or_create_graphics(device, shaders, &key, &layout, &[]) {
                Ok(id) => self.pipeline = Some(pipelines.get_render_pipeline(id).clone()),
                Err(err) => log::warn!("geometry pipeline build failed: {err}"),
            }
        }

        self.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("geometry-frame-bind-group"),
            layout: &self.frame_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: scene_feed.static_instances().as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: scene_feed.dynamic_instances().as_entire_binding() },
                wgpu::BindGroupEntry { binding: 2, resource: scene_feed.batch_metadata().as_entire_binding() },
                wgpu::BindGroupEntry { binding: 3, resource: scene_feed.camera().as_entire_binding() },
            ],
        }));

        self.batches.clear();
        for i in 0..registry.batch_count() {
            let id = crate::framegraph::batch::BatchId::from_index(i as u32);
            self.batches.push((registry.first_instance(id), registry.instance_count(id)));
        }
    }
}

impl Pass for GeometryPass {
    fn info(&self) -> NodeInfo {
        NodeInfo {
            name: "Geometry".into(),
            reads: vec![],
            writes: vec![
                Usage { resource: self.position, kind: UsageKind::ColorAttachment },
                Usage { resource: self.normal, kind: UsageKind::ColorAttachment },
                Usage { resource: self.albedo, kind: UsageKind::ColorAttachment },
                Usage { resource: self.arm, kind: UsageKind::ColorAttachment },
                Usage { resource: self.emissive, kind: UsageKind::ColorAttachment },
                Usage { resource: self.depth, kind: UsageKind::DepthStencilAttachment },
            ],
        }
    }

    fn execute(&mut self, pool: &ResourcePool, _frame: &FrameInfo, encoder: &mut wgpu::CommandEncoder) {
        let (Some(pipeline), Some(bind_group)) = (&self.pipeline, &self.bind_group) else {
            return;
        };

        let handles = [self.position, self.normal, self.albedo, self.arm, self.emissive];
        let mut attachments = Vec::with_capacity(handles.len());
        for handle in handles {
            match pool.image(handle) {
                Ok(img) => attachments.push(img),
                Err(err) => {
                    log::warn!("geometry pass: G-buffer attachment not materialized: {err}");
                    return;
                }
            }
        }
        let Ok(depth) = pool.image(self.depth) else {
            return;
        };

        let color_attachments: Vec<_> = attachments
            .iter()
            .map(|img| {
                Some(wgpu::RenderPassColorAttachment {
                    view: &img.view,
                    resolve_target: None,
                    ops: wgpu::Operations { load: wgpu::LoadOp::Clear(wgpu::Color::BLACK), store: wgpu::StoreOp::Store },
                    depth_slice: None,
                })
            })
            .collect();

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Geometry Pass"),
            color_attachments: &color_attachments,
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth.view,
                depth_ops: Some(wgpu::Operations { load: wgpu::LoadOp::Clear(0.0), store: wgpu::StoreOp::Store }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        pass.set_pipeline(pipeline);
        pass.set_bind_group(1, bind_group, &[]);
        for &(first_instance, count) in &self.batches {
            if count == 0 {
                continue;
            }
            pass.draw(0..3, first_instance..first_instance + count);
        }
    }
}

fn storage_entry(binding: u32, visibility: wgpu::ShaderStages, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer { ty: wgpu::BufferBindingType::Storage { read_only }, has_dynamic_offset: false, min_binding_size: None },
        count: None,
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer { ty: wgpu::BufferBindingType::Uniform, has_dynamic_offset: false, min_binding_size: None },
        count: None,
    }
}
