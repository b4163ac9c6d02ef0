//! Post-process pass: tone-maps the bloom-composited HDR `SceneColor` into
//! the LDR `Final` image the present/UI passes read from.
//!
//! Grounded in the donor's `ToneMapPass`: a single exposure uniform plus a
//! version check so the uniform buffer is only rewritten when exposure
//! actually changes, and a [`Tracked`]/[`BindGroupCache`] pair so the
//! frame bind group is only rebuilt when the input view or sampler
//! actually changes identity rather than every frame.

use crate::framegraph::handle::LogicalResourceHandle;
use crate::framegraph::node::{FrameInfo, NodeInfo, Pass};
use crate::framegraph::pipeline::{ColorTargetKey, GraphicsPipelineKey, PipelineCache, ShaderCache};
use crate::framegraph::pool::ResourcePool;
use crate::framegraph::resource::Usage;
use crate::framegraph::tracked::{BindGroupCache, ResourceIdSet, Tracked};
use crate::framegraph::usage::UsageKind;

const SHADER_PATH: &str = "shaders/tone_map.wgsl";

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct ToneMapUniforms {
    exposure: f32,
    _pad: [u32; 3],
}

pub struct PostProcessPass {
    scene_color: LogicalResourceHandle,
    final_image: LogicalResourceHandle,

    layout: Tracked<wgpu::BindGroupLayout>,
    sampler: Tracked<wgpu::Sampler>,
    uniforms: wgpu::Buffer,
    bind_group_cache: BindGroupCache,

    exposure: f32,
    last_exposure: f32,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group: Option<wgpu::BindGroup>,
}

impl PostProcessPass {
    #[must_use]
    pub fn new(device: &wgpu::Device, scene_color: LogicalResourceHandle, final_image: LogicalResourceHandle) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("post-process-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture { sample_type: wgpu::TextureSampleType::Float { filterable: true }, view_dimension: wgpu::TextureViewDimension::D2, multisampled: false },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer { ty: wgpu::BufferBindingType::Uniform, has_dynamic_offset: false, min_binding_size: None },
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("post-process-sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("post-process-uniforms"),
            size: std::mem::size_of::<ToneMapUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            scene_color,
            final_image,
            layout: Tracked::new(bind_group_layout),
            sampler: Tracked::new(sampler),
            uniforms,
            bind_group_cache: BindGroupCache::new(),
            exposure: 1.0,
            last_exposure: f32::NAN,
            pipeline: None,
            bind_group: None,
        }
    }

    pub fn set_exposure(&mut self, exposure: f32) {
        self.exposure = exposure;
    }

    /// Rebuilds the pipeline (once) and, if the input view's identity or
    /// the sampler changed since the last frame, the frame bind group.
    /// Reuses the cached bind group otherwise.
    pub fn prepare(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, pool: &ResourcePool, pipelines: &mut PipelineCache, shaders: &mut ShaderCache, output_format: wgpu::TextureFormat) {
        if self.pipeline.is_none() {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("post-process-pipeline-layout"),
                bind_group_layouts: &[&self.layout],
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
                color_targets: smallvec::smallvec![ColorTargetKey { format: output_format, blend: None, write_mask: wgpu::ColorWrites::ALL.bits() }],
                depth_stencil: None,
                sample_count: 1,
            };
            match pipelines.get_or_create_graphics(device, shaders, &key, &layout, &[]) {
                Ok(id) => self.pipeline = Some(pipelines.get_render_pipeline(id).clone()),
                Err(err) => log::warn!("post-process pipeline build failed: {err}"),
            }
        }

        if self.exposure != self.last_exposure {
            queue.write_buffer(&self.uniforms, 0, bytemuck::bytes_of(&ToneMapUniforms { exposure: self.exposure, _pad: [0; 3] }));
            self.last_exposure = self.exposure;
        }

        let Ok(input) = pool.image(self.scene_color) else {
            log::warn!("post-process pass: SceneColor not materialized, skipping");
            return;
        };

        let extent_id = (u64::from(input.extent.0) << 32) | u64::from(input.extent.1);
        let key = ResourceIdSet::new(self.layout.id())
            .with_resource(u64::from(self.scene_color.index()))
            .with_resource(extent_id)
            .with_resource(self.sampler.id());

        if let Some(cached) = self.bind_group_cache.get(&key) {
            self.bind_group = Some(cached.clone());
            return;
        }

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("post-process-bind-group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&input.view) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(&self.sampler) },
                wgpu::BindGroupEntry { binding: 2, resource: self.uniforms.as_entire_binding() },
            ],
        });
        self.bind_group_cache.insert(key, bind_group.clone());
        self.bind_group = Some(bind_group);
    }
}

impl Pass for PostProcessPass {
    fn info(&self) -> NodeInfo {
        NodeInfo {
            name: "PostProcess".into(),
            reads: vec![Usage { resource: self.scene_color, kind: UsageKind::FragmentReadSampled }],
            writes: vec![Usage { resource: self.final_image, kind: UsageKind::ColorAttachment }],
        }
    }

    fn execute(&mut self, pool: &ResourcePool, _frame: &FrameInfo, encoder: &mut wgpu::CommandEncoder) {
        let Some(pipeline) = &self.pipeline else {
            return;
        };
        let Some(bind_group) = &self.bind_group else {
            return;
        };
        let Ok(output) = pool.image(self.final_image) else {
            log::warn!("post-process pass: Final image not materialized, skipping");
            return;
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Post-Process Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &output.view,
                resolve_target: None,
                ops: wgpu::Operations { load: wgpu::LoadOp::Clear(wgpu::Color::BLACK), store: wgpu::StoreOp::Store },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}
