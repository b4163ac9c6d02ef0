//! Bloom pass: threshold, then a 6-mip downsample/upsample chain over a
//! bloom texture the pass owns outright (it never goes through the
//! frame-graph pool, since nothing outside this pass ever reads or writes
//! it by name).
//!
//! Each stage runs in its own `wgpu::ComputePass`, which is sufficient
//! synchronization between the mip levels it reads and writes in sequence —
//! wgpu inserts the barrier a Vulkan-class backend would need explicitly
//! between compute pass boundaries.

use crate::framegraph::handle::LogicalResourceHandle;
use crate::framegraph::node::{FrameInfo, NodeInfo, Pass};
use crate::framegraph::pipeline::{ComputePipelineKey, PipelineCache, ShaderCache};
use crate::framegraph::pool::ResourcePool;
use crate::framegraph::resource::Usage;
use crate::framegraph::usage::UsageKind;

const MIP_COUNT: u32 = 6;
const TILE_SIZE: u32 = 8;
const THRESHOLD_SHADER: &str = "shaders/bloom_threshold.wgsl";
const DOWNSAMPLE_SHADER: &str = "shaders/bloom_downsample.wgsl";
const UPSAMPLE_SHADER: &str = "shaders/bloom_upsample.wgsl";

struct BloomMips {
    texture: wgpu::Texture,
    views: Vec<wgpu::TextureView>,
    extent: (u32, u32),
}

pub struct BloomPass {
    scene_color: LogicalResourceHandle,
    mips: Option<BloomMips>,

    sampled_storage_layout: wgpu::BindGroupLayout,
    threshold_pipeline: Option<wgpu::ComputePipeline>,
    downsample_pipeline: Option<wgpu::ComputePipeline>,
    upsample_pipeline: Option<wgpu::ComputePipeline>,
    stage_bind_groups: Vec<wgpu::BindGroup>,
}

impl BloomPass {
    #[must_use]
    pub fn new(device: &wgpu::Device, scene_color: LogicalResourceHandle) -> Self {
        let sampled_storage_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bloom-stage-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture { sample_type: wgpu::TextureSampleType::Float { filterable: false }, view_dimension: wgpu::TextureViewDimension::D2, multisampled: false },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture { access: wgpu::StorageTextureAccess::WriteOnly, format: wgpu::TextureFormat::Rgba16Float, view_dimension: wgpu::TextureViewDimension::D2 },
                    count: None,
                },
            ],
        });

        Self {
            scene_color,
            mips: None,
            sampled_storage_layout,
            threshold_pipeline: None,
            downsample_pipeline: None,
            upsample_pipeline: None,
            stage_bind_groups: Vec::new(),
        }
    }

    fn rebuild_mips(&mut self, device: &wgpu::Device, extent: (u32, u32)) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("bloom-mips"),
            size: wgpu::Extent3d { width: extent.0.max(1), height: extent.1.max(1), depth_or_array_layers: 1 },
            mip_level_count: MIP_COUNT,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba16Float,
            usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let views = (0..MIP_COUNT)
            .map(|level| {
                texture.create_view(&wgpu::TextureViewDescriptor {
                    base_mip_level: level,
                    mip_level_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();
        self.mips = Some(BloomMips { texture, views, extent });
    }

    /// Rebuilds the mip chain (if the extent changed), the three stage
    /// pipelines (once), and every stage's bind group for the coming frame.
    pub fn prepare(&mut self, device: &wgpu::Device, pool: &ResourcePool, pipelines: &mut PipelineCache, shaders: &mut ShaderCache, extent: (u32, u32)) {
        if self.mips.as_ref().is_none_or(|m| m.extent != extent) {
            self.rebuild_mips(device, extent);
        }

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("bloom-pipeline-layout"),
            bind_group_layouts: &[&self.sampled_storage_layout],
            immediate_size: 0,
        });

        if self.threshold_pipeline.is_none() {
            self.threshold_pipeline = build_compute(device, shaders, pipelines, &layout, THRESHOLD_SHADER);
        }
        if self.downsample_pipeline.is_none() {
            self.downsample_pipeline = build_compute(device, shaders, pipelines, &layout, DOWNSAMPLE_SHADER);
        }
        if self.upsample_pipeline.is_none() {
            self.upsample_pipeline = build_compute(device, shaders, pipelines, &layout, UPSAMPLE_SHADER);
        }

        let Ok(scene_color) = pool.image(self.scene_color) else {
            log::warn!("bloom pass: SceneColor not materialized, skipping");
            return;
        };
        let Some(mips) = &self.mips else { return };

        self.stage_bind_groups.clear();
        self.stage_bind_groups.push(make_bind_group(device, &self.sampled_storage_layout, &scene_color.view, &mips.views[0]));
        for level in 0..MIP_COUNT as usize - 1 {
            self.stage_bind_groups.push(make_bind_group(device, &self.sampled_storage_layout, &mips.views[level], &mips.views[level + 1]));
        }
        for level in (1..MIP_COUNT as usize).rev() {
            self.stage_bind_groups.push(make_bind_group(device, &self.sampled_storage_layout, &mips.views[level], &mips.views[level - 1]));
        }
    }
}

fn build_compute(device: &wgpu::Device, shaders: &mut ShaderCache, pipelines: &mut PipelineCache, layout: &wgpu::PipelineLayout, shader_path: &str) -> Option<wgpu::ComputePipeline> {
    let key = ComputePipelineKey { shader_path: shader_path.into(), entry_point: "main".into(), bind_group_layout_ids: smallvec::smallvec![] };
    match pipelines.get_or_create_compute(device, shaders, &key, layout) {
        Ok(id) => Some(pipelines.get_compute_pipeline(id).clone()),
        Err(err) => {
            log::warn!("bloom pipeline build failed ({shader_path}): {err}");
            None
        }
    }
}

fn make_bind_group(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, src: &wgpu::TextureView, dst: &wgpu::TextureView) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("bloom-stage-bind-group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(src) },
            wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(dst) },
        ],
    })
}

impl Pass for BloomPass {
    fn info(&self) -> NodeInfo {
        NodeInfo {
            name: "Bloom".into(),
            reads: vec![Usage { resource: self.scene_color, kind: UsageKind::ComputeReadSampled }],
            writes: vec![Usage { resource: self.scene_color, kind: UsageKind::ComputeWriteStorage }],
        }
    }

    fn execute(&mut self, _pool: &ResourcePool, _frame: &FrameInfo, encoder: &mut wgpu::CommandEncoder) {
        let Some(mips) = &self.mips else { return };
        let groups_for = |level_extent: (u32, u32)| (level_extent.0.div_ceil(TILE_SIZE).max(1), level_extent.1.div_ceil(TILE_SIZE).max(1));

        let stages: Vec<(&wgpu::ComputePipeline, (u32, u32))> = {
            let Some(threshold) = &self.threshold_pipeline else { return };
            let Some(downsample) = &self.downsample_pipeline else { return };
            let Some(upsample) = &self.upsample_pipeline else { return };

            let mut stages = vec![(threshold, groups_for(mips.extent))];
            let mut extent = mips.extent;
            for _ in 0..MIP_COUNT - 1 {
                extent = ((extent.0 / 2).max(1), (extent.1 / 2).max(1));
                stages.push((downsample, groups_for(extent)));
            }
            for _ in 0..MIP_COUNT - 1 {
                extent = (extent.0 * 2, extent.1 * 2);
                stages.push((upsample, groups_for(extent)));
            }
            stages
        };

        for (i, (pipeline, (gx, gy))) in stages.iter().enumerate() {
            let Some(bind_group) = self.stage_bind_groups.get(i) else { break };
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Bloom Stage"),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.dispatch_workgroups(*gx, *gy, 1);
        }
    }
}
