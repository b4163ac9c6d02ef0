//! Frame graph error taxonomy.
//!
//! Mirrors the categorized-variant, doc-commented `thiserror` style used by
//! the crate's top-level [`crate::errors`] module, scoped to errors that
//! originate in the frame graph itself.

use thiserror::Error;

use crate::framegraph::handle::BindlessKind;
use crate::framegraph::usage::ImageLayout;

/// Errors raised while compiling a graph (reference resolution, adjacency,
/// topological sort, materialization, barrier synthesis).
///
/// Policy: every variant here is fatal except `CapacityExceeded`, which is
/// logged and truncated so rendering can continue.
#[derive(Debug, Error)]
pub enum CompilerError {
    /// A reference resource had no matching non-reference resource with the
    /// same name anywhere in the pool.
    #[error("unresolved reference to resource named {0:?}")]
    UnresolvedReference(String),

    /// The read/write adjacency between nodes is not a DAG.
    #[error("frame graph contains a dependency cycle")]
    Cycle,

    /// A bindless array, instance buffer, or batch registry would exceed
    /// its fixed capacity. Recoverable: the caller truncates and continues.
    #[error("{kind:?} capacity exceeded: requested {requested}, limit {limit}")]
    CapacityExceeded {
        kind: BindlessKind,
        requested: u32,
        limit: u32,
    },

    /// Two usage kinds implied an image-layout transition the central
    /// table in [`crate::framegraph::usage`] does not recognize.
    #[error("unsupported layout transition {old:?} -> {new:?}")]
    UnknownLayoutTransition {
        old: ImageLayout,
        new: ImageLayout,
    },

    /// A pass declared the same resource in both its read-set and its
    /// write-set. The source behavior here is unclear (see DESIGN.md);
    /// this crate rejects it outright at compile time.
    #[error("node {node:?} both reads and writes resource {resource:?} in the same pass")]
    SameNodeReadWrite { node: String, resource: String },
}

/// Errors raised while executing a compiled graph.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The swapchain is out of date (wgpu's `SurfaceError::Outdated`/`Lost`).
    /// Recoverable: the frame loop reconfigures the surface and retries.
    #[error("swapchain is out of date and must be reconfigured")]
    SwapchainOutOfDate,

    /// Acquiring the next swapchain image failed for a reason other than
    /// being out of date.
    #[error("failed to acquire swapchain image: {0}")]
    AcquireFailed(String),

    /// Submitting the frame's command buffer failed.
    #[error("failed to submit frame command buffer: {0}")]
    SubmitFailed(String),
}

/// Errors raised while loading pipeline inputs.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A pipeline builder was asked for a shader module that does not
    /// exist on disk.
    #[error("shader module missing: {0}")]
    ShaderMissing(String),
}

/// Unified frame graph error, composing the three families above.
#[derive(Debug, Error)]
pub enum FrameGraphError {
    #[error(transparent)]
    Compiler(#[from] CompilerError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Load(#[from] LoadError),
}

pub type Result<T> = std::result::Result<T, FrameGraphError>;
