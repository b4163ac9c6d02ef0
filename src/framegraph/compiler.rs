//! The frame graph compiler: reference resolution, producer/adjacency
//! construction, topological sort, resource materialization, and barrier
//! synthesis.
//!
//! Runs once after the graph is first built, and again whenever passes are
//! replaced or the swapchain is resized. Stateless: every stage is a
//! function over a [`ResourcePool`], not a struct with its own fields.

use std::collections::BinaryHeap;
use std::cmp::Reverse;

use rustc_hash::FxHashMap;

use crate::framegraph::error::{CompilerError, Result};
use crate::framegraph::handle::{LogicalResourceHandle, NodeHandle};
use crate::framegraph::node::{BufferBarrier, ImageBarrier};
use crate::framegraph::pool::{MaterializedBuffer, MaterializedImage, ResourcePool};
use crate::framegraph::resource::{LogicalResource, PerFrame, ResizePolicy, MAX_FRAMES_IN_FLIGHT};
use crate::framegraph::usage::{layout_transition, usage_sync_info, ResourceUsageFlags, UsageKind};

/// Compiles `pool` in place and returns the topologically sorted node order.
///
/// # Errors
///
/// Returns [`CompilerError::UnresolvedReference`] if a reference names no
/// non-reference resource, [`CompilerError::SameNodeReadWrite`] if a pass
/// declares the same resource in both its read- and write-set, or
/// [`CompilerError::Cycle`] if the read/write adjacency is not a DAG.
pub fn compile(pool: &mut ResourcePool, device: &wgpu::Device, swapchain_extent: (u32, u32)) -> Result<Vec<NodeHandle>> {
    resolve_references(pool)?;
    let order = topological_sort(pool)?;
    materialize(pool, device, swapchain_extent);
    synthesize_barriers(pool, &order);
    Ok(order.into_iter().map(|i| NodeHandle::new(i as u32)).collect())
}

/// Stage 1: reference resolution.
fn resolve_references(pool: &mut ResourcePool) -> Result<()> {
    let targets: Vec<(usize, String)> = pool
        .resources
        .iter()
        .enumerate()
        .filter_map(|(i, r)| match r {
            LogicalResource::Reference(r) => Some((i, r.target_name.clone())),
            _ => None,
        })
        .collect();

    for (i, name) in targets {
        let resolved = pool
            .handle_by_name(&name)
            .ok_or_else(|| CompilerError::UnresolvedReference(name.clone()))?;
        let usage_flags = pool.resource(LogicalResourceHandle::new(i as u32)).usage_flags();
        if let LogicalResource::Reference(r) = pool.resource_mut(LogicalResourceHandle::new(i as u32)) {
            r.resolved = Some(resolved);
        }
        // Invariant 4: OR the reference's usage flags into the resolved target.
        match pool.resource_mut(resolved) {
            LogicalResource::Buffer(b) => b.usage_flags |= usage_flags,
            LogicalResource::Image(img) => img.usage_flags |= usage_flags,
            LogicalResource::Reference(_) => {
                return Err(CompilerError::UnresolvedReference(format!(
                    "{name} resolves to another reference, not a concrete resource"
                ))
                .into())
            }
        }
    }
    Ok(())
}

/// Stages 2 & 3 combined: a single forward walk over nodes in insertion
/// order that both maintains the "last writer" producer map and builds the
/// DAG adjacency, followed by stage 4's Kahn's-algorithm topological sort.
fn topological_sort(pool: &ResourcePool) -> Result<Vec<usize>> {
    let n = pool.nodes.len();
    let mut producer: FxHashMap<u32, usize> = FxHashMap::default();
    let mut edges: std::collections::HashSet<(usize, usize)> = std::collections::HashSet::new();
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut indegree: Vec<usize> = vec![0; n];

    for (node_idx, node) in pool.nodes.iter().enumerate() {
        let read_resolved: Vec<LogicalResourceHandle> =
            node.reads.iter().map(|u| pool.resolve(u.resource)).collect();
        let write_resolved: Vec<LogicalResourceHandle> =
            node.writes.iter().map(|u| pool.resolve(u.resource)).collect();

        for w in &write_resolved {
            if read_resolved.contains(w) {
                return Err(CompilerError::SameNodeReadWrite {
                    node: node.name.clone(),
                    resource: format!("{w:?}"),
                }
                .into());
            }
        }

        for resolved in read_resolved.iter().chain(write_resolved.iter()) {
            if let Some(&p) = producer.get(&resolved.index()) {
                if p != node_idx && edges.insert((p, node_idx)) {
                    adj[p].push(node_idx);
                    indegree[node_idx] += 1;
                }
            }
        }
        for w in &write_resolved {
            producer.insert(w.index(), node_idx);
        }
    }

    let mut queue: BinaryHeap<Reverse<usize>> = BinaryHeap::new();
    for (i, &d) in indegree.iter().enumerate() {
        if d == 0 {
            queue.push(Reverse(i));
        }
    }

    let mut order = Vec::with_capacity(n);
    while let Some(Reverse(i)) = queue.pop() {
        order.push(i);
        for &j in &adj[i] {
            indegree[j] -= 1;
            if indegree[j] == 0 {
                queue.push(Reverse(j));
            }
        }
    }

    if order.len() != n {
        return Err(CompilerError::Cycle.into());
    }
    Ok(order)
}

/// Stage 5: usage accumulation (already folded into every `accumulate_usage`
/// call at declaration time and reference resolution above) followed by
/// materialization of every logical resource that doesn't already carry a
/// materialized handle.
fn materialize(pool: &mut ResourcePool, device: &wgpu::Device, swapchain_extent: (u32, u32)) {
    for i in 0..pool.resources.len() {
        let handle = LogicalResourceHandle::new(i as u32);
        match pool.resource(handle) {
            LogicalResource::Image(img) if img.materialized.is_none() => {
                let extent = match img.spec.resize_policy {
                    ResizePolicy::Fixed => img.spec.extent,
                    ResizePolicy::SwapchainRelative => swapchain_extent,
                };
                let mut usage = texture_usages(img.usage_flags);
                if img.spec.mip_levels > 1 {
                    usage |= wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST;
                }
                let texture = device.create_texture(&wgpu::TextureDescriptor {
                    label: Some("framegraph-image"),
                    size: wgpu::Extent3d { width: extent.0.max(1), height: extent.1.max(1), depth_or_array_layers: 1 },
                    mip_level_count: img.spec.mip_levels,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: img.spec.format,
                    usage,
                    view_formats: &[],
                });
                let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
                let materialized = MaterializedImage { texture, view, format: img.spec.format, extent, mip_levels: img.spec.mip_levels };
                let image_handle = pool.set_materialized_image(materialized);
                if let LogicalResource::Image(img) = pool.resource_mut(handle) {
                    img.materialized = Some(image_handle);
                }
            }
            LogicalResource::Buffer(buf) if buf.materialized.is_none() => {
                let frames = match buf.spec.per_frame {
                    PerFrame::Single => 1,
                    PerFrame::PerFrameInFlight => MAX_FRAMES_IN_FLIGHT as u64,
                };
                let size = buf.spec.size * frames;
                let usage = buffer_usages(buf.usage_flags);
                let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("framegraph-buffer"),
                    size,
                    usage,
                    mapped_at_creation: false,
                });
                let buffer_handle = pool.set_materialized_buffer(MaterializedBuffer { buffer, size });
                if let LogicalResource::Buffer(buf) = pool.resource_mut(handle) {
                    buf.materialized = Some(buffer_handle);
                }
            }
            _ => {}
        }
    }
}

/// Resizes every already-materialized `SwapchainRelative` image in place
/// (new texture + view at `new_extent`, same format and mip count) rather
/// than reallocating the whole pool. Called by
/// [`crate::framegraph::graph::FrameGraph::swapchain_resized`] before a
/// recompile picks up the new extent for any resource materialized for the
/// first time afterward.
pub fn resize_swapchain_relative(pool: &mut ResourcePool, device: &wgpu::Device, new_extent: (u32, u32)) {
    for i in 0..pool.resources.len() {
        let handle = LogicalResourceHandle::new(i as u32);
        let Some((materialized, usage_flags, format, mip_levels)) = (match pool.resource(handle) {
            LogicalResource::Image(img) if img.spec.resize_policy == ResizePolicy::SwapchainRelative => {
                img.materialized.map(|m| (m, img.usage_flags, img.spec.format, img.spec.mip_levels))
            }
            _ => None,
        }) else {
            continue;
        };

        let mut usage = texture_usages(usage_flags);
        if mip_levels > 1 {
            usage |= wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST;
        }
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("framegraph-image"),
            size: wgpu::Extent3d { width: new_extent.0.max(1), height: new_extent.1.max(1), depth_or_array_layers: 1 },
            mip_level_count: mip_levels,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        pool.replace_image(materialized, MaterializedImage { texture, view, format, extent: new_extent, mip_levels });
    }
}

fn texture_usages(flags: ResourceUsageFlags) -> wgpu::TextureUsages {
    let mut usage = wgpu::TextureUsages::empty();
    if flags.contains(ResourceUsageFlags::SAMPLED) {
        usage |= wgpu::TextureUsages::TEXTURE_BINDING;
    }
    if flags.contains(ResourceUsageFlags::STORAGE) {
        usage |= wgpu::TextureUsages::STORAGE_BINDING;
    }
    if flags.contains(ResourceUsageFlags::COLOR_ATTACHMENT) || flags.contains(ResourceUsageFlags::DEPTH_STENCIL) {
        usage |= wgpu::TextureUsages::RENDER_ATTACHMENT;
    }
    if flags.contains(ResourceUsageFlags::TRANSFER_SRC) {
        usage |= wgpu::TextureUsages::COPY_SRC;
    }
    if flags.contains(ResourceUsageFlags::TRANSFER_DST) {
        usage |= wgpu::TextureUsages::COPY_DST;
    }
    usage
}

fn buffer_usages(flags: ResourceUsageFlags) -> wgpu::BufferUsages {
    let mut usage = wgpu::BufferUsages::COPY_DST;
    if flags.contains(ResourceUsageFlags::STORAGE) {
        usage |= wgpu::BufferUsages::STORAGE;
    }
    if flags.contains(ResourceUsageFlags::UNIFORM) {
        usage |= wgpu::BufferUsages::UNIFORM;
    }
    if flags.contains(ResourceUsageFlags::TRANSFER_SRC) {
        usage |= wgpu::BufferUsages::COPY_SRC;
    }
    usage
}

/// Stage 6: barrier synthesis. Walks nodes in sorted order, maintaining a
/// `lastUsage` map from resolved handle to the producing node and the usage
/// kind it was last touched with, and emits image/buffer barriers on every
/// node whose reads or writes followed an earlier touch.
fn synthesize_barriers(pool: &mut ResourcePool, order: &[usize]) {
    let mut last_usage: FxHashMap<u32, UsageKind> = FxHashMap::default();

    for &node_idx in order {
        pool.nodes[node_idx].clear_barriers();

        let reads = pool.nodes[node_idx].reads.clone();
        let writes = pool.nodes[node_idx].writes.clone();

        let mut src_stage = crate::framegraph::usage::PipelineStageMask::empty();
        let mut dst_stage = crate::framegraph::usage::PipelineStageMask::empty();
        let mut image_barriers = Vec::new();
        let mut buffer_barriers = Vec::new();

        for usage in reads.iter().chain(writes.iter()) {
            let resolved = pool.resolve(usage.resource);
            if let Some(&prev_kind) = last_usage.get(&resolved.index()) {
                let prev_info = usage_sync_info(prev_kind);
                let new_info = usage_sync_info(usage.kind);
                let (src_access, dst_access, s_stage, d_stage) = layout_transition(prev_info.layout, new_info.layout);
                src_stage |= s_stage;
                dst_stage |= d_stage;

                let is_image = matches!(pool.resource(resolved), LogicalResource::Image(_));
                if is_image {
                    image_barriers.push(ImageBarrier {
                        resource: resolved,
                        src_access,
                        dst_access,
                        old_layout: prev_info.layout,
                        new_layout: new_info.layout,
                    });
                } else {
                    buffer_barriers.push(BufferBarrier { resource: resolved, src_access, dst_access });
                }
            }
            last_usage.insert(resolved.index(), usage.kind);
        }

        let node = &mut pool.nodes[node_idx];
        node.src_stage = src_stage;
        node.dst_stage = dst_stage;
        node.image_barriers = image_barriers;
        node.buffer_barriers = buffer_barriers;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framegraph::node::{FrameInfo, NodeInfo, Pass};
    use crate::framegraph::pool::ResourcePool;
    use crate::framegraph::resource::{BufferSpec, ImageSpec, PerFrame, ResizePolicy};

    struct StubPass {
        info: NodeInfo,
    }
    impl Pass for StubPass {
        fn info(&self) -> NodeInfo {
            self.info.clone()
        }
        fn execute(&mut self, _pool: &ResourcePool, _frame: &FrameInfo, _encoder: &mut wgpu::CommandEncoder) {}
    }

    fn image_spec() -> ImageSpec {
        ImageSpec {
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            extent: (64, 64),
            mip_levels: 1,
            resize_policy: ResizePolicy::Fixed,
        }
    }

    #[test]
    fn write_then_read_orders_producer_before_consumer() {
        let mut pool = ResourcePool::new();
        let albedo = pool.add_image("Albedo", UsageKind::ColorAttachment, image_spec());

        let geometry = Box::new(StubPass {
            info: NodeInfo {
                name: "Geometry".into(),
                reads: vec![],
                writes: vec![crate::framegraph::resource::Usage { resource: albedo, kind: UsageKind::ColorAttachment }],
            },
        });
        let post = Box::new(StubPass {
            info: NodeInfo {
                name: "Post".into(),
                reads: vec![crate::framegraph::resource::Usage { resource: albedo, kind: UsageKind::FragmentReadSampled }],
                writes: vec![],
            },
        });
        pool.add_node(post);
        pool.add_node(geometry);

        let order = topological_sort(&pool).unwrap();
        assert_eq!(order, vec![1, 0], "Geometry (writer) must precede Post (reader) despite insertion order");
    }

    #[test]
    fn independent_nodes_keep_insertion_order() {
        let mut pool = ResourcePool::new();
        for name in ["A", "B", "C"] {
            pool.add_node(Box::new(StubPass { info: NodeInfo { name: name.into(), reads: vec![], writes: vec![] } }));
        }
        let order = topological_sort(&pool).unwrap();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn same_node_read_and_write_is_rejected() {
        let mut pool = ResourcePool::new();
        let buffer = pool.add_buffer(
            "Camera",
            UsageKind::ComputeReadStorage,
            BufferSpec { size: 256, per_frame: PerFrame::Single },
        );
        pool.add_node(Box::new(StubPass {
            info: NodeInfo {
                name: "Bad".into(),
                reads: vec![crate::framegraph::resource::Usage { resource: buffer, kind: UsageKind::ComputeReadStorage }],
                writes: vec![crate::framegraph::resource::Usage { resource: buffer, kind: UsageKind::ComputeWriteStorage }],
            },
        }));
        let err = topological_sort(&pool).unwrap_err();
        assert!(matches!(err, crate::framegraph::error::FrameGraphError::Compiler(CompilerError::SameNodeReadWrite { .. })));
    }

    #[test]
    fn unresolved_reference_is_an_error() {
        let mut pool = ResourcePool::new();
        pool.add_reference("Missing", UsageKind::FragmentReadSampled);
        let err = resolve_references(&mut pool).unwrap_err();
        assert!(matches!(err, crate::framegraph::error::FrameGraphError::Compiler(CompilerError::UnresolvedReference(_))));
    }

    #[test]
    fn diamond_dependency_sorts_deterministically() {
        // A -> {B1, B2} -> C: either B ordering is valid, but repeated
        // compiles of the same pool must always pick the same one.
        let mut pool = ResourcePool::new();
        let x = pool.add_image("X", UsageKind::ColorAttachment, image_spec());
        let y1 = pool.add_image("Y1", UsageKind::ColorAttachment, image_spec());
        let y2 = pool.add_image("Y2", UsageKind::ColorAttachment, image_spec());
        let z = pool.add_image("Z", UsageKind::ColorAttachment, image_spec());

        let node = |name: &str, reads: Vec<LogicalResourceHandle>, writes: Vec<LogicalResourceHandle>| {
            Box::new(StubPass {
                info: NodeInfo {
                    name: name.into(),
                    reads: reads.into_iter().map(|h| crate::framegraph::resource::Usage { resource: h, kind: UsageKind::FragmentReadSampled }).collect(),
                    writes: writes.into_iter().map(|h| crate::framegraph::resource::Usage { resource: h, kind: UsageKind::ColorAttachment }).collect(),
                },
            })
        };

        pool.add_node(node("A", vec![], vec![x]));
        pool.add_node(node("B1", vec![x], vec![y1]));
        pool.add_node(node("B2", vec![x], vec![y2]));
        pool.add_node(node("C", vec![y1, y2], vec![z]));

        let order = topological_sort(&pool).unwrap();
        assert_eq!(order[0], 0, "A has no dependencies and must run first");
        assert_eq!(order[3], 3, "C depends on both B1 and B2 and must run last");
        assert!(order[1..3].contains(&1) && order[1..3].contains(&2));

        let order_again = topological_sort(&pool).unwrap();
        assert_eq!(order, order_again, "identical pool must compile to the identical order every time");
    }

    #[test]
    fn write_after_write_barrier_reflects_latest_writer() {
        // A and B both write X (B after A in insertion order), C reads X.
        // The scheduled order must still be A, B, C, and the barrier on C
        // must reflect B's usage, not A's earlier one.
        let mut pool = ResourcePool::new();
        let x = pool.add_image("X", UsageKind::TransferDst, image_spec());

        pool.add_node(Box::new(StubPass {
            info: NodeInfo {
                name: "A".into(),
                reads: vec![],
                writes: vec![crate::framegraph::resource::Usage { resource: x, kind: UsageKind::TransferDst }],
            },
        }));
        pool.add_node(Box::new(StubPass {
            info: NodeInfo {
                name: "B".into(),
                reads: vec![],
                writes: vec![crate::framegraph::resource::Usage { resource: x, kind: UsageKind::ColorAttachment }],
            },
        }));
        pool.add_node(Box::new(StubPass {
            info: NodeInfo {
                name: "C".into(),
                reads: vec![crate::framegraph::resource::Usage { resource: x, kind: UsageKind::FragmentReadSampled }],
                writes: vec![],
            },
        }));

        let order = topological_sort(&pool).unwrap();
        assert_eq!(order, vec![0, 1, 2]);

        synthesize_barriers(&mut pool, &order);
        let barrier = pool.nodes[2].image_barriers.first().expect("C must see a barrier on X");
        assert_eq!(barrier.old_layout, crate::framegraph::usage::ImageLayout::ColorAttachmentOptimal, "barrier must reflect B's write, not A's");
    }

    #[test]
    fn reference_resolves_to_a_resource_declared_by_an_earlier_pass() {
        // Pass F writes a resource named "Final"; pass R only declares a
        // reference to that name. Resolution must schedule R after F.
        let mut pool = ResourcePool::new();
        let final_image = pool.add_image("Final", UsageKind::ColorAttachment, image_spec());
        let final_ref = pool.add_reference("Final", UsageKind::FragmentReadSampled);

        pool.add_node(Box::new(StubPass {
            info: NodeInfo {
                name: "F".into(),
                reads: vec![],
                writes: vec![crate::framegraph::resource::Usage { resource: final_image, kind: UsageKind::ColorAttachment }],
            },
        }));
        pool.add_node(Box::new(StubPass {
            info: NodeInfo {
                name: "R".into(),
                reads: vec![crate::framegraph::resource::Usage { resource: final_ref, kind: UsageKind::FragmentReadSampled }],
                writes: vec![],
            },
        }));

        resolve_references(&mut pool).unwrap();
        let order = topological_sort(&pool).unwrap();
        assert_eq!(order, vec![0, 1], "F must be scheduled before R, which only references F's output by name");
    }

    #[test]
    fn reference_usage_flags_union_into_resolved_target() {
        let mut pool = ResourcePool::new();
        let target = pool.add_image("Final", UsageKind::ColorAttachment, image_spec());
        pool.add_reference("Final", UsageKind::FragmentReadSampled);

        resolve_references(&mut pool).unwrap();
        let LogicalResource::Image(img) = pool.resource(target) else { panic!("expected image") };
        assert!(img.usage_flags.contains(ResourceUsageFlags::COLOR_ATTACHMENT));
        assert!(img.usage_flags.contains(ResourceUsageFlags::SAMPLED), "reference's read usage must union into the resolved target's flags");
    }
}
