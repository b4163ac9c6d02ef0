//! Lighting pass: a compute shader that resolves the deferred G-buffer into
//! lit color, dispatched in 16×16 tiles over the swapchain extent.

use crate::framegraph::handle::LogicalResourceHandle;
use crate::framegraph::node::{FrameInfo, NodeInfo, Pass};
use crate::framegraph::pipeline::{ComputePipelineKey, PipelineCache, ShaderCache};
use crate::framegraph::pool::ResourcePool;
use crate::framegraph::resource::Usage;
use crate::framegraph::usage::UsageKind;

const SHADER_PATH: &str = "shaders/lighting.wgsl";
const TILE_SIZE: u32 = 16;

pub struct LightingPass {
    position: LogicalResourceHandle,
    normal: LogicalResourceHandle,
    albedo: LogicalResourceHandle,
    arm: LogicalResourceHandle,
    emissive: LogicalResourceHandle,
    scene_color: LogicalResourceHandle,

    bind_group_layout: wgpu::BindGroupLayout,
    pipeline: Option<wgpu::ComputePipeline>,
    bind_group: Option<wgpu::BindGroup>,
}

impl LightingPass {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: &wgpu::Device,
        position: LogicalResourceHandle,
        normal: LogicalResourceHandle,
        albedo: LogicalResourceHandle,
        arm: LogicalResourceHandle,
        emissive: LogicalResourceHandle,
        scene_color: LogicalResourceHandle,
    ) -> Self {
        let sampled = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Texture { sample_type: wgpu::TextureSampleType::Float { filterable: false }, view_dimension: wgpu::TextureViewDimension::D2, multisampled: false },
            count: None,
        };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lighting-layout"),
            entries: &[
                sampled(0),
                sampled(1),
                sampled(2),
                sampled(3),
                sampled(4),
                wgpu::BindGroupLayoutEntry {
                    binding: 5,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture { access: wgpu::StorageTextureAccess::WriteOnly, format: wgpu::TextureFormat::Rgba16Float, view_dimension: wgpu::TextureViewDimension::D2 },
                    count: None,
                },
            ],
        });

        Self { position, normal, albedo, arm, emissive, scene_color, bind_group_layout, pipeline: None, bind_group: None }
    }

    pub fn prepare(&mut self, device: &wgpu::Device, pool: &ResourcePool, pipelines: &mut PipelineCache, shaders: &mut ShaderCache) {
        if self.pipeline.is_none() {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("lighting-pipeline-layout"),
                bind_group_layouts: &[&self.bind_group_layout],
                immediate_size: 0,
            });
            let key = ComputePipelineKey { shader_path: SHADER_PATH.into(), entry_point: "main".into(), bind_group_layout_ids: smallvec::smallvec![] };
            match pipelines.get_or_create_compute(device, shaders, &key, &layout) {
                Ok(id) => self.pipeline = Some(pipelines.get_compute_pipeline(id).clone()),
                Err(err) => log::warn!("lighting pipeline build failed: {err}"),
            }
        }

        let handles = [self.position, self.normal, self.albedo, self.arm, self.emissive];
        let mut views = Vec::with_capacity(handles.len());
        for handle in handles {
            match pool.image(handle) {
                Ok(img) => views.push(&img.view),
                Err(err) => {
                    log::warn!("lighting pass: G-buffer attachment not materialized: {err}");
                    return;
                }
            }
        }
        let Ok(scene_color) = pool.image(self.scene_color) else {
            return;
        };

        self.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lighting-bind-group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(views[0]) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(views[1]) },
                wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::TextureView(views[2]) },
                wgpu::BindGroupEntry { binding: 3, resource: wgpu::BindingResource::TextureView(views[3]) },
                wgpu::BindGroupEntry { binding: 4, resource: wgpu::BindingResource::TextureView(views[4]) },
                wgpu::BindGroupEntry { binding: 5, resource: wgpu::BindingResource::TextureView(&scene_color.view) },
            ],
        }));
    }
}

impl Pass for LightingPass {
    fn info(&self) -> NodeInfo {
        NodeInfo {
            name: "Lighting".into(),
            reads: vec![
                Usage { resource: self.position, kind: UsageKind::ComputeReadSampled },
                Usage { resource: self.normal, kind: UsageKind::ComputeReadSampled },
                Usage { resource: self.albedo, kind: UsageKind::ComputeReadSampled },
                Usage { resource: self.arm, kind: UsageKind::ComputeReadSampled },
                Usage { resource: self.emissive, kind: UsageKind::ComputeReadSampled },
            ],
            writes: vec![Usage { resource: self.scene_color, kind: UsageKind::ComputeWriteStorage }],
        }
    }

    fn execute(&mut self, _pool: &ResourcePool, frame: &FrameInfo, encoder: &mut wgpu::CommandEncoder) {
        let (Some(pipeline), Some(bind_group)) = (&self.pipeline, &self.bind_group) else {
            return;
        };

        let (width, height) = frame.swapchain_extent;
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor { label: Some("Lighting Pass"), timestamp_writes: None });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(width.div_ceil(TILE_SIZE), height.div_ceil(TILE_SIZE), 1);
    }
}
