//! Frame graph: declarative frame composition over a pool of logical
//! resources, compiled once into a topologically sorted node order with
//! synthesized GPU barriers, then replayed every frame.
//!
//! Submodules mirror the compiler's stages: [`resource`] and [`node`] hold
//! the declarations a graph is built from, [`pool`] owns them, [`compiler`]
//! resolves and orders them, and [`usage`] maps declared intent to wgpu
//! synchronization primitives. [`handle`] and [`bindless`] are the index-based
//! addressing scheme shared by all of the above. [`runtime`] is the one piece
//! that turns all of this into something an application actually drives every
//! frame: it registers the eight standard [`passes`] against a single graph
//! and feeds it from a [`crate::scene::Scene`].

pub mod batch;
pub mod bindless;
pub mod compiler;
pub mod deletion_queue;
pub mod error;
pub mod graph;
pub mod handle;
pub mod node;
pub mod passes;
pub mod pipeline;
pub mod pool;
pub mod resource;
pub mod runtime;
pub mod scene_feed;
pub mod tracked;
pub mod usage;

pub use batch::{BatchId, BatchRegistry, MaterialTemplateId};
pub use bindless::BindlessTable;
pub use deletion_queue::{DeletionItem, DeletionQueue};
pub use compiler::compile;
pub use error::{CompilerError, FrameGraphError, LoadError, Result, RuntimeError};
pub use graph::FrameGraph;
pub use runtime::FrameGraphRenderer;
pub use handle::{BindlessAccess, BindlessHandle, BindlessKind, BufferHandle, ImageHandle, LogicalResourceHandle, NodeHandle};
pub use node::{FrameInfo, NodeInfo, Pass};
pub use pipeline::{
    ComputePipelineId, ComputePipelineKey, GraphicsPipelineKey, PipelineCache, RenderPipelineId,
    ShaderCache,
};
pub use passes::{BloomPass, GeometryPass, LightingPass, PostProcessPass, PresentPass, SkyboxPass, TransparentPass, UiPass};
pub use pool::{MaterializedBuffer, MaterializedImage, ResourcePool};
pub use resource::{BufferSpec, ImageSpec, LogicalResource, PerFrame, ResizePolicy, Usage, MAX_FRAMES_IN_FLIGHT};
pub use scene_feed::{BatchMeta, CameraUniform, Instance, SceneFeed};
pub use tracked::{BindGroupCache, ResourceIdSet, Tracked};
pub use usage::{AccessMask, ImageLayout, PipelineStageMask, ResourceUsageFlags, UsageKind};
