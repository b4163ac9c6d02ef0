//! Skybox pass: draws the background behind already-rendered opaque
//! geometry, using Reverse-Z depth testing so opaque pixels mask it via
//! early-Z. Depth write stays off — this pass only reads depth.

use crate::framegraph::handle::LogicalResourceHandle;
use crate::framegraph::node::{FrameInfo, NodeInfo, Pass};
use crate::framegraph::pipeline::{ColorTargetKey, DepthStencilKey, GraphicsPipelineKey, PipelineCache, ShaderCache};
use crate::framegraph::pool::ResourcePool;
use crate::framegraph::resource::Usage;
use crate::framegraph::usage::UsageKind;

const SHADER_PATH: &str = "shaders/skybox.wgsl";

pub struct SkyboxPass {
    scene_color: LogicalResourceHandle,
    depth: LogicalResourceHandle,
    params_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group: Option<wgpu::BindGroup>,
}

impl SkyboxPass {
    #[must_use]
    pub fn new(device: &wgpu::Device, scene_color: LogicalResourceHandle, depth: LogicalResourceHandle) -> Self {
        let params_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("skybox-params-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer { ty: wgpu::BufferBindingType::Uniform, has_dynamic_offset: false, min_binding_size: None },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture { sample_type: wgpu::TextureSampleType::Float { filterable: true }, view_dimension: wgpu::TextureViewDimension::Cube, multisampled: false },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("skybox-sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Linear,
            ..Default::default()
        });

        Self { scene_color, depth, params_layout, sampler, pipeline: None, bind_group: None }
    }

    /// Rebuilds the pipeline (if needed) and the params/cubemap bind group
    /// for the coming frame.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        params: &wgpu::Buffer,
        cubemap: &wgpu::TextureView,
        pipelines: &mut PipelineCache,
        shaders: &mut ShaderCache,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) {
        if self.pipeline.is_none() {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("skybox-pipeline-layout"),
                bind_group_layouts: &[&self.params_layout],
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
                color_targets: smallvec::smallvec![ColorTargetKey { format: color_format, blend: None, write_mask: wgpu::ColorWrites::ALL.bits() }],
                depth_stencil: Some(DepthStencilKey { format: depth_format, depth_write_enabled: false, depth_compare: wgpu::CompareFunction::GreaterEqual }),
                sample_count: 1,
            };
            match pipelines.get_or_create_graphics(device, shaders, &key, &layout, &[]) {
                Ok(id) => self.pipeline = Some(pipelines.get_render_pipeline(id).clone()),
                Err(err) => log::warn!("skybox pipeline build failed: {err}"),
            }
        }

        self.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("skybox-bind-group"),
            layout: &self.params_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: params.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(cubemap) },
                wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::Sampler(&self.sampler) },
            ],
        }));
    }
}

impl Pass for SkyboxPass {
    fn info(&self) -> NodeInfo {
        NodeInfo {
            name: "Skybox".into(),
            reads: vec![Usage { resource: self.depth, kind: UsageKind::DepthStencilAttachment }],
            writes: vec![Usage { resource: self.scene_color, kind: UsageKind::ColorAttachment }],
        }
    }

    fn execute(&mut self, pool: &ResourcePool, _frame: &FrameInfo, encoder: &mut wgpu::CommandEncoder) {
        let (Some(pipeline), Some(bind_group)) = (&self.pipeline, &self.bind_group) else {
            return;
        };
        let (Ok(color), Ok(depth)) = (pool.image(self.scene_color), pool.image(self.depth)) else {
            log::warn!("skybox pass: SceneColor or Depth not materialized, skipping");
            return;
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Skybox Pass"),
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
        pass.draw(0..3, 0..1);
    }
}
