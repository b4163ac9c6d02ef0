//! The pass trait and the compiled node that wraps it.
//!
//! Passes are trait objects owned by the pool, never an inheritance
//! hierarchy: each one carries its own pipelines, descriptor-set layouts,
//! and any per-mip view caches it needs (see [`crate::framegraph::passes::bloom`]).

use std::any::Any;

use crate::framegraph::handle::LogicalResourceHandle;
use crate::framegraph::pool::ResourcePool;
use crate::framegraph::resource::Usage;
use crate::framegraph::usage::{AccessMask, ImageLayout, PipelineStageMask};

/// Per-frame information handed to every pass at execute time.
#[derive(Debug, Clone, Copy)]
pub struct FrameInfo {
    pub frame_index: u64,
    pub slot: usize,
    pub time: f32,
    pub swapchain_extent: (u32, u32),
}

/// What a node reads and writes, returned by [`Pass::info`].
///
/// Reads and writes are `Usage` (handle + `UsageKind`) rather than bare
/// handles: the compiler needs the usage kind to look up synchronization
/// intent in the same place it resolves the dependency, and the data model
/// in spec §3 already ties a `UsageKind` to every read/write.
#[derive(Debug, Clone, Default)]
pub struct NodeInfo {
    pub name: String,
    pub reads: Vec<Usage>,
    pub writes: Vec<Usage>,
}

/// The boundary the frame graph imposes on its consumers.
///
/// A pass never talks to the graph directly; it only ever sees the
/// [`ResourcePool`] it was registered with, and only during the three
/// calls below.
pub trait Pass: Send + Any {
    /// Declares this node's name and its read/write sets. Called once,
    /// right after [`crate::framegraph::pool::ResourcePool::add_node`].
    fn info(&self) -> NodeInfo;

    /// Rebuilds any state derived from a `SwapchainRelative` resource
    /// (per-mip views, sized scratch buffers). Called once at registration
    /// and again after every [`crate::framegraph::graph::FrameGraph::swapchain_resized`].
    fn create_resources(&mut self, _pool: &mut ResourcePool) {}

    /// Records this node's commands. Barriers have already been applied by
    /// the executor before this is called; the pass only ever issues
    /// draws, dispatches, and blits using resources looked up from `pool`.
    fn execute(&mut self, pool: &ResourcePool, frame: &FrameInfo, encoder: &mut wgpu::CommandEncoder);
}

#[derive(Debug, Clone, Copy)]
pub struct ImageBarrier {
    pub resource: LogicalResourceHandle,
    pub src_access: AccessMask,
    pub dst_access: AccessMask,
    pub old_layout: ImageLayout,
    pub new_layout: ImageLayout,
}

#[derive(Debug, Clone, Copy)]
pub struct BufferBarrier {
    pub resource: LogicalResourceHandle,
    pub src_access: AccessMask,
    pub dst_access: AccessMask,
}

/// A compiled node: the pass plus everything the compiler computed about
/// it (§3 "post-compile barrier payload").
pub struct Node {
    pub name: String,
    pub reads: Vec<Usage>,
    pub writes: Vec<Usage>,
    pub pass: Box<dyn Pass>,

    pub src_stage: PipelineStageMask,
    pub dst_stage: PipelineStageMask,
    pub image_barriers: Vec<ImageBarrier>,
    pub buffer_barriers: Vec<BufferBarrier>,
}

impl Node {
    pub(crate) fn new(name: String, reads: Vec<Usage>, writes: Vec<Usage>, pass: Box<dyn Pass>) -> Self {
        Self {
            name,
            reads,
            writes,
            pass,
            src_stage: PipelineStageMask::empty(),
            dst_stage: PipelineStageMask::empty(),
            image_barriers: Vec::new(),
            buffer_barriers: Vec::new(),
        }
    }

    pub(crate) fn clear_barriers(&mut self) {
        self.src_stage = PipelineStageMask::empty();
        self.dst_stage = PipelineStageMask::empty();
        self.image_barriers.clear();
        self.buffer_barriers.clear();
    }
}
