//! Logical resources: the named, pre-materialization declarations nodes
//! read and write.
//!
//! Expressed as a closed sum type ([`LogicalResource`]) rather than a base
//! class with downcasts — the three variants are exhaustively matched
//! everywhere the compiler needs to tell them apart.

use crate::framegraph::handle::{BufferHandle, ImageHandle, LogicalResourceHandle};
use crate::framegraph::usage::{ResourceUsageFlags, UsageKind};

pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// How an image's extent is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizePolicy {
    /// A fixed extent, independent of the swapchain.
    Fixed,
    /// Always matches the current swapchain extent; resized in place on
    /// [`crate::framegraph::graph::FrameGraph::swapchain_resized`].
    SwapchainRelative,
}

/// How many copies of a buffer's data exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerFrame {
    /// One copy, shared across all frames in flight.
    Single,
    /// `MAX_FRAMES_IN_FLIGHT` copies, indexed by the current frame slot.
    PerFrameInFlight,
}

#[derive(Debug, Clone, Copy)]
pub struct ImageSpec {
    pub format: wgpu::TextureFormat,
    pub extent: (u32, u32),
    pub mip_levels: u32,
    pub resize_policy: ResizePolicy,
}

#[derive(Debug, Clone, Copy)]
pub struct BufferSpec {
    pub size: u64,
    pub per_frame: PerFrame,
}

/// A declared image resource: spec plus the usage flags accumulated during
/// compile and, once compiled, its materialized handle.
#[derive(Debug, Clone)]
pub struct ImageResource {
    pub spec: ImageSpec,
    pub usage_flags: ResourceUsageFlags,
    pub materialized: Option<ImageHandle>,
}

/// A declared buffer resource: spec plus the usage flags accumulated during
/// compile and, once compiled, its materialized handle.
#[derive(Debug, Clone)]
pub struct BufferResource {
    pub spec: BufferSpec,
    pub usage_flags: ResourceUsageFlags,
    pub materialized: Option<BufferHandle>,
}

/// A name-keyed alias: "I read/write the resource some other pass produced
/// under this name." Resolved to the concrete resource's handle during
/// compile (spec §4.6 step 1).
#[derive(Debug, Clone)]
pub struct ReferenceResource {
    /// The name this reference is resolved against during compile.
    pub target_name: String,
    pub usage_flags: ResourceUsageFlags,
    pub resolved: Option<LogicalResourceHandle>,
}

/// One entry in the resource pool's logical-resource vector.
///
/// Invariants (enforced by [`crate::framegraph::compiler`]):
/// 1. Exactly one non-reference resource exists per unique name.
/// 2. A reference resolves to exactly one non-reference; failure is fatal.
/// 3. After compile, every `Buffer`/`Image` carries a materialized handle.
/// 4. Usage flags on the materialized resource are the OR of all usages
///    declared on it and on every reference to it.
#[derive(Debug, Clone)]
pub enum LogicalResource {
    Buffer(BufferResource),
    Image(ImageResource),
    Reference(ReferenceResource),
}

impl LogicalResource {
    #[must_use]
    pub fn usage_flags(&self) -> ResourceUsageFlags {
        match self {
            Self::Buffer(b) => b.usage_flags,
            Self::Image(i) => i.usage_flags,
            Self::Reference(r) => r.usage_flags,
        }
    }

    pub fn accumulate_usage(&mut self, kind: UsageKind) {
        let flags = crate::framegraph::usage::usage_sync_info(kind).resource_flags;
        match self {
            Self::Buffer(b) => b.usage_flags |= flags,
            Self::Image(i) => i.usage_flags |= flags,
            Self::Reference(r) => r.usage_flags |= flags,
        }
    }

    #[must_use]
    pub const fn is_reference(&self) -> bool {
        matches!(self, Self::Reference(_))
    }
}

/// An entry in a node's read-set or write-set: the declared resource plus
/// the intent it is accessed with.
#[derive(Debug, Clone, Copy)]
pub struct Usage {
    pub resource: LogicalResourceHandle,
    pub kind: UsageKind,
}
