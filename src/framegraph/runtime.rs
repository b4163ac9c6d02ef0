//! Wires the eight standard passes into a single [`FrameGraph`] and drives
//! it from a [`Scene`] every frame.
//!
//! This is the frame graph's one real consumer: [`crate::engine::Engine::render_active_scene`]
//! owns a [`FrameGraphRenderer`] and calls [`FrameGraphRenderer::render`]
//! once per frame. Scene extraction here is deliberately simple next to the
//! legacy `renderer/graph` composer path — one batch per material, no
//! per-object culling, no back-to-front transparent sort — since this
//! runtime's job is compiling and executing the graph correctly, not
//! matching the legacy renderer's full feature set.

use std::any::Any;

use glam::{Mat3, Mat4, Vec4};
use slotmap::Key;

use crate::framegraph::batch::{BatchId, BatchRegistry, MaterialTemplateId};
use crate::framegraph::bindless::BindlessTable;
use crate::framegraph::graph::FrameGraph;
use crate::framegraph::handle::{LogicalResourceHandle, NodeHandle};
use crate::framegraph::node::{FrameInfo, Pass};
use crate::framegraph::passes::{
    BloomPass, GeometryPass, LightingPass, PostProcessPass, PresentPass, SkyboxPass,
    TransparentPass, UiPass,
};
use crate::framegraph::pipeline::{PipelineCache, ShaderCache};
use crate::framegraph::pool::ResourcePool;
use crate::framegraph::resource::{ImageSpec, ResizePolicy};
use crate::framegraph::scene_feed::{CameraUniform, Instance, SceneFeed};
use crate::framegraph::usage::UsageKind;
use crate::scene::Scene;
use crate::scene::camera::RenderCamera;

const GBUFFER_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const SCENE_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

struct NoopPass;

impl Pass for NoopPass {
    fn info(&self) -> crate::framegraph::node::NodeInfo {
        crate::framegraph::node::NodeInfo::default()
    }
    fn execute(&mut self, _pool: &ResourcePool, _frame: &FrameInfo, _encoder: &mut wgpu::CommandEncoder) {}
}

/// Borrows the pass registered at `handle` back out as `P`, calls `f` with
/// it and a fresh `&ResourcePool`, then restores it. Needed because a pass's
/// `prepare()` sometimes wants to read already-materialized images from the
/// very pool it's stored in, which a plain `&mut` borrow can't also hand out
/// immutably — the same aliasing problem [`FrameGraph::execute`] solves by
/// swapping the pass out for the duration of the call.
fn prepare_with_pool<P: Pass + 'static>(pool: &mut ResourcePool, handle: NodeHandle, f: impl FnOnce(&mut P, &ResourcePool)) {
    let idx = handle.index() as usize;
    let mut boxed = std::mem::replace(&mut pool.nodes[idx].pass, Box::new(NoopPass));
    {
        let any: &mut dyn Any = &mut *boxed;
        let typed = any.downcast_mut::<P>().expect("pass type mismatch");
        f(typed, pool);
    }
    pool.nodes[idx].pass = boxed;
}

/// Borrows the pass registered at `handle` back out as `P` and calls `f`
/// with it directly — for passes whose `prepare()` doesn't touch the pool.
fn prepare_pass<P: Pass + 'static>(pool: &mut ResourcePool, handle: NodeHandle, f: impl FnOnce(&mut P)) {
    let idx = handle.index() as usize;
    let any: &mut dyn Any = &mut *pool.nodes[idx].pass;
    f(any.downcast_mut::<P>().expect("pass type mismatch"));
}

struct PassHandles {
    geometry: NodeHandle,
    skybox: NodeHandle,
    transparent: NodeHandle,
    lighting: NodeHandle,
    bloom: NodeHandle,
    post_process: NodeHandle,
    present: NodeHandle,
}

struct Resources {
    position: LogicalResourceHandle,
    normal: LogicalResourceHandle,
    albedo: LogicalResourceHandle,
    arm: LogicalResourceHandle,
    emissive: LogicalResourceHandle,
    depth: LogicalResourceHandle,
    scene_color: LogicalResourceHandle,
    final_image: LogicalResourceHandle,
}

fn declare_resources(pool: &mut ResourcePool, extent: (u32, u32)) -> Resources {
    let image = |format| ImageSpec { format, extent, mip_levels: 1, resize_policy: ResizePolicy::SwapchainRelative };

    Resources {
        position: pool.add_image("Position", UsageKind::ColorAttachment, image(GBUFFER_FORMAT)),
        normal: pool.add_image("Normal", UsageKind::ColorAttachment, image(GBUFFER_FORMAT)),
        albedo: pool.add_image("Albedo", UsageKind::ColorAttachment, image(GBUFFER_FORMAT)),
        arm: pool.add_image("ARM", UsageKind::ColorAttachment, image(GBUFFER_FORMAT)),
        emissive: pool.add_image("Emissive", UsageKind::ColorAttachment, image(GBUFFER_FORMAT)),
        depth: pool.add_image("Depth", UsageKind::DepthStencilAttachment, image(DEPTH_FORMAT)),
        scene_color: pool.add_image("SceneColor", UsageKind::ColorAttachment, image(SCENE_COLOR_FORMAT)),
        final_image: pool.add_image("Final", UsageKind::ColorAttachment, image(SCENE_COLOR_FORMAT)),
    }
}

fn fallback_cubemap(device: &wgpu::Device) -> (wgpu::Buffer, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("skybox-fallback-cubemap"),
        size: wgpu::Extent3d { width: 1, height: 1, depth_or_array_layers: 6 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor {
        dimension: Some(wgpu::TextureViewDimension::Cube),
        ..Default::default()
    });
    let params = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("skybox-fallback-params"),
        size: 16,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    (params, view)
}

/// Drives the eight standard passes against a real scene: extracts
/// instances and draw batches every frame, uploads them through
/// [`SceneFeed`], compiles the graph once, and replays it via
/// [`FrameGraph::execute`].
pub struct FrameGraphRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    graph: FrameGraph,
    handles: PassHandles,
    scene_feed: SceneFeed,
    bindless: BindlessTable,
    pipelines: PipelineCache,
    shaders: ShaderCache,
    skybox_params: wgpu::Buffer,
    skybox_cubemap: wgpu::TextureView,
    color_format: wgpu::TextureFormat,
    extent: (u32, u32),
    frame_index: u64,
}

impl FrameGraphRenderer {
    /// Builds the graph, declares every standard resource, and registers
    /// all eight standard passes. `color_format` is the swapchain's own
    /// format, which `Final` and the present/post-process passes must
    /// ultimately match.
    #[must_use]
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, color_format: wgpu::TextureFormat, extent: (u32, u32)) -> Self {
        let mut graph = FrameGraph::new();
        let resources = declare_resources(graph.pool_mut(), extent);

        let pool = graph.pool_mut();
        let handles = PassHandles {
            geometry: pool.add_node(Box::new(GeometryPass::new(
                &device, resources.position, resources.normal, resources.albedo, resources.arm, resources.emissive, resources.depth,
            ))),
            skybox: pool.add_node(Box::new(SkyboxPass::new(&device, resources.scene_color, resources.depth))),
            transparent: pool.add_node(Box::new(TransparentPass::new(&device, resources.scene_color, resources.depth))),
            lighting: pool.add_node(Box::new(LightingPass::new(
                &device, resources.position, resources.normal, resources.albedo, resources.arm, resources.emissive, resources.scene_color,
            ))),
            bloom: pool.add_node(Box::new(BloomPass::new(&device, resources.scene_color))),
            post_process: pool.add_node(Box::new(PostProcessPass::new(&device, resources.scene_color, resources.final_image))),
            present: pool.add_node(Box::new(PresentPass::new(resources.final_image))),
        };
        pool.add_node(Box::new(UiPass::new(resources.final_image)));

        let scene_feed = SceneFeed::new(&device);
        let bindless = BindlessTable::new(&device);
        let (skybox_params, skybox_cubemap) = fallback_cubemap(&device);

        Self {
            device,
            queue,
            graph,
            handles,
            scene_feed,
            bindless,
            pipelines: PipelineCache::new(),
            shaders: ShaderCache::new(),
            skybox_params,
            skybox_cubemap,
            color_format,
            extent,
            frame_index: 0,
        }
    }

    /// Re-declares swapchain-relative resources at the new extent, lets
    /// every pass rebuild derived state, and recompiles.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.extent = (width, height);
        if let Err(err) = self.graph.swapchain_resized(&self.device, width, height) {
            log::warn!("frame graph resize failed: {err}");
        }
    }

    /// Extracts every visible mesh instance in `scene` (one batch per
    /// distinct material), uploads instances/batches/camera for the
    /// current frame-in-flight slot, runs every standard pass's
    /// `prepare()`, compiles the graph on first use, then executes it
    /// against `encoder` and presents into `target`.
    pub fn render(&mut self, scene: &Scene, camera: &RenderCamera, target: wgpu::Texture, time: f32, encoder: &mut wgpu::CommandEncoder) {
        let slot = (self.frame_index as usize) % crate::framegraph::resource::MAX_FRAMES_IN_FLIGHT;

        // BatchRegistry keeps every batch's instance range contiguous, which
        // only holds if instances are written to the buffer grouped by batch.
        // Registering and filling one batch fully before moving to the next
        // keeps `add_instance`'s range-shifting from invalidating slots
        // already assigned to an earlier batch.
        let mut registry = BatchRegistry::new();
        let mut grouped: Vec<Vec<Instance>> = Vec::new();

        for (node_handle, mesh_key) in &scene.meshes {
            let Some(mesh) = scene.mesh_pool.get(*mesh_key) else { continue };
            if !mesh.visible {
                continue;
            }
            let material_id = MaterialTemplateId(mesh.material.data().as_ffi());
            let batch = registry.register(material_id);

            let model = Mat4::from(scene.get_global_transform(node_handle));
            let normal_matrix = Mat3::from_mat4(model).inverse().transpose();

            let instance = Instance::new(
                model,
                normal_matrix.row(0),
                normal_matrix.row(1),
                normal_matrix.row(2),
                mesh.geometry.data().as_ffi(),
                mesh.material.data().as_ffi(),
                batch.index(),
            );

            let idx = batch.index() as usize;
            if idx >= grouped.len() {
                grouped.resize_with(idx + 1, Vec::new);
            }
            grouped[idx].push(instance);
        }

        let mut instances = Vec::with_capacity(grouped.iter().map(Vec::len).sum());
        for (i, group) in grouped.into_iter().enumerate() {
            let batch = BatchId::from_index(i as u32);
            for instance in group {
                registry.add_instance(batch);
                instances.push(instance);
            }
        }

        self.scene_feed.write_dynamic(&self.queue, slot, &instances);
        self.scene_feed.write_batches(&self.queue, slot, &registry);
        self.scene_feed.write_camera(&self.queue, slot, &camera_uniform(camera));

        let batches: Vec<(u32, u32)> = (0..registry.batch_count())
            .map(|i| {
                let id = BatchId::from_index(i as u32);
                (registry.first_instance(id), registry.instance_count(id))
            })
            .collect();

        self.prepare_passes(&registry, &batches);

        if !self.graph.is_compiled() {
            if let Err(err) = self.graph.compile(&self.device, self.extent) {
                log::warn!("frame graph compile failed: {err}");
                return;
            }
        }

        prepare_pass::<PresentPass>(self.graph.pool_mut(), self.handles.present, |present| {
            present.set_target(target);
        });

        let frame = FrameInfo { frame_index: self.frame_index, slot, time, swapchain_extent: self.extent };
        self.graph.execute(&frame, encoder);

        self.frame_index += 1;
    }

    fn prepare_passes(&mut self, registry: &BatchRegistry, batches: &[(u32, u32)]) {
        let device = &self.device;
        let queue = &self.queue;
        let scene_feed = &self.scene_feed;
        let bindless = &self.bindless;
        let pipelines = &mut self.pipelines;
        let shaders = &mut self.shaders;
        let pool = self.graph.pool_mut();

        prepare_pass::<GeometryPass>(pool, self.handles.geometry, |pass| {
            pass.prepare(device, scene_feed, bindless, registry, pipelines, shaders, GBUFFER_FORMAT, DEPTH_FORMAT);
        });

        prepare_pass::<SkyboxPass>(pool, self.handles.skybox, |pass| {
            pass.prepare(device, &self.skybox_params, &self.skybox_cubemap, pipelines, shaders, SCENE_COLOR_FORMAT, DEPTH_FORMAT);
        });

        prepare_pass::<TransparentPass>(pool, self.handles.transparent, |pass| {
            pass.prepare(device, scene_feed, pipelines, shaders, SCENE_COLOR_FORMAT, DEPTH_FORMAT, batches);
        });

        prepare_with_pool::<LightingPass>(pool, self.handles.lighting, |pass, pool| {
            pass.prepare(device, pool, pipelines, shaders);
        });

        prepare_with_pool::<BloomPass>(pool, self.handles.bloom, |pass, pool| {
            pass.prepare(device, pool, pipelines, shaders, self.extent);
        });

        prepare_with_pool::<PostProcessPass>(pool, self.handles.post_process, |pass, pool| {
            pass.prepare(device, queue, pool, pipelines, shaders, self.color_format);
        });
    }
}

fn camera_uniform(camera: &RenderCamera) -> CameraUniform {
    CameraUniform {
        view: camera.view_matrix,
        proj: camera.projection_matrix,
        view_proj: camera.view_projection_matrix,
        frustum_planes: [Vec4::ZERO; 6],
        position: Vec4::from((glam::Vec3::from(camera.position), 1.0)),
    }
}
