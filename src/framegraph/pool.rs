//! The resource pool: owns every declared node and logical resource, plus
//! the materialized images and buffers the compiler allocates for them.
//!
//! No materialization happens here — `add_*` only ever appends a
//! declaration and hands back a handle. Materialization is entirely the
//! compiler's job (see [`crate::framegraph::compiler`]).

use rustc_hash::FxHashMap;

use crate::framegraph::error::{CompilerError, Result};
use crate::framegraph::handle::{BufferHandle, ImageHandle, LogicalResourceHandle, NodeHandle};
use crate::framegraph::node::{Node, NodeInfo, Pass};
use crate::framegraph::resource::{
    BufferResource, BufferSpec, ImageResource, ImageSpec, LogicalResource, ReferenceResource,
};
use crate::framegraph::usage::UsageKind;

/// A materialized GPU image, owned by the pool once the compiler has run.
pub struct MaterializedImage {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    pub extent: (u32, u32),
    pub mip_levels: u32,
}

/// A materialized GPU buffer, owned by the pool once the compiler has run.
pub struct MaterializedBuffer {
    pub buffer: wgpu::Buffer,
    pub size: u64,
}

/// Owns every node and logical resource declared against a frame graph, plus
/// their materialized GPU counterparts once compiled.
#[derive(Default)]
pub struct ResourcePool {
    pub(crate) nodes: Vec<Node>,
    pub(crate) resources: Vec<LogicalResource>,
    names: FxHashMap<String, LogicalResourceHandle>,

    images: Vec<MaterializedImage>,
    buffers: Vec<MaterializedBuffer>,
}

impl ResourcePool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a named image resource. Returns its logical handle.
    pub fn add_image(&mut self, name: impl Into<String>, usage: UsageKind, spec: ImageSpec) -> LogicalResourceHandle {
        let mut resource = LogicalResource::Image(ImageResource {
            spec,
            usage_flags: crate::framegraph::usage::ResourceUsageFlags::empty(),
            materialized: None,
        });
        resource.accumulate_usage(usage);
        self.push_named(name.into(), resource)
    }

    /// Declares a named buffer resource. Returns its logical handle.
    pub fn add_buffer(&mut self, name: impl Into<String>, usage: UsageKind, spec: BufferSpec) -> LogicalResourceHandle {
        let mut resource = LogicalResource::Buffer(BufferResource {
            spec,
            usage_flags: crate::framegraph::usage::ResourceUsageFlags::empty(),
            materialized: None,
        });
        resource.accumulate_usage(usage);
        self.push_named(name.into(), resource)
    }

    /// Declares "some other pass produces a resource under this name; I
    /// depend on it." Resolved by the compiler's reference-resolution stage.
    pub fn add_reference(&mut self, name: impl Into<String>, usage: UsageKind) -> LogicalResourceHandle {
        let mut resource = LogicalResource::Reference(ReferenceResource {
            target_name: name.into(),
            usage_flags: crate::framegraph::usage::ResourceUsageFlags::empty(),
            resolved: None,
        });
        resource.accumulate_usage(usage);
        self.resources.push(resource);
        LogicalResourceHandle::new((self.resources.len() - 1) as u32)
    }

    fn push_named(&mut self, name: String, resource: LogicalResource) -> LogicalResourceHandle {
        self.resources.push(resource);
        let handle = LogicalResourceHandle::new((self.resources.len() - 1) as u32);
        self.names.insert(name, handle);
        handle
    }

    /// Registers a pass, consulting its declared `info()` for the read/write
    /// sets stored alongside it.
    pub fn add_node(&mut self, pass: Box<dyn Pass>) -> NodeHandle {
        let NodeInfo { name, reads, writes } = pass.info();
        self.nodes.push(Node::new(name, reads, writes, pass));
        NodeHandle::new((self.nodes.len() - 1) as u32)
    }

    /// Looks up a non-reference resource's handle by the name it was
    /// declared with (used by reference resolution).
    #[must_use]
    pub(crate) fn handle_by_name(&self, name: &str) -> Option<LogicalResourceHandle> {
        self.names.get(name).copied()
    }

    #[must_use]
    pub fn resource(&self, handle: LogicalResourceHandle) -> &LogicalResource {
        &self.resources[handle.index() as usize]
    }

    pub(crate) fn resource_mut(&mut self, handle: LogicalResourceHandle) -> &mut LogicalResource {
        &mut self.resources[handle.index() as usize]
    }

    /// Follows a reference to its resolved concrete handle. Non-reference
    /// handles resolve to themselves.
    #[must_use]
    pub fn resolve(&self, handle: LogicalResourceHandle) -> LogicalResourceHandle {
        match self.resource(handle) {
            LogicalResource::Reference(r) => r.resolved.unwrap_or(handle),
            _ => handle,
        }
    }

    /// Looks up a materialized image by its logical handle, following
    /// references first.
    ///
    /// # Errors
    ///
    /// Returns [`CompilerError::UnresolvedReference`] if the resource was
    /// never materialized (the graph has not been compiled, or is not an
    /// image resource).
    pub fn image(&self, handle: LogicalResourceHandle) -> Result<&MaterializedImage> {
        let resolved = self.resolve(handle);
        match self.resource(resolved) {
            LogicalResource::Image(i) => {
                let materialized = i.materialized.ok_or_else(|| {
                    CompilerError::UnresolvedReference(format!("image handle {resolved:?} not yet materialized"))
                })?;
                Ok(&self.images[materialized.index() as usize])
            }
            _ => Err(CompilerError::UnresolvedReference(format!("handle {resolved:?} is not an image")).into()),
        }
    }

    /// Looks up a materialized buffer by its logical handle, following
    /// references first.
    ///
    /// # Errors
    ///
    /// Returns [`CompilerError::UnresolvedReference`] if the resource was
    /// never materialized, or is not a buffer resource.
    pub fn buffer(&self, handle: LogicalResourceHandle) -> Result<&MaterializedBuffer> {
        let resolved = self.resolve(handle);
        match self.resource(resolved) {
            LogicalResource::Buffer(b) => {
                let materialized = b.materialized.ok_or_else(|| {
                    CompilerError::UnresolvedReference(format!("buffer handle {resolved:?} not yet materialized"))
                })?;
                Ok(&self.buffers[materialized.index() as usize])
            }
            _ => Err(CompilerError::UnresolvedReference(format!("handle {resolved:?} is not a buffer")).into()),
        }
    }

    pub(crate) fn set_materialized_image(&mut self, image: MaterializedImage) -> ImageHandle {
        self.images.push(image);
        ImageHandle::new((self.images.len() - 1) as u32)
    }

    pub(crate) fn set_materialized_buffer(&mut self, buffer: MaterializedBuffer) -> BufferHandle {
        self.buffers.push(buffer);
        BufferHandle::new((self.buffers.len() - 1) as u32)
    }

    pub(crate) fn replace_image(&mut self, handle: ImageHandle, image: MaterializedImage) {
        self.images[handle.index() as usize] = image;
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framegraph::node::FrameInfo;
    use crate::framegraph::resource::{PerFrame, ResizePolicy};

    struct NoopPass;
    impl Pass for NoopPass {
        fn info(&self) -> NodeInfo {
            NodeInfo { name: "noop".into(), reads: vec![], writes: vec![] }
        }
        fn execute(&mut self, _pool: &ResourcePool, _frame: &FrameInfo, _encoder: &mut wgpu::CommandEncoder) {}
    }

    #[test]
    fn add_image_and_buffer_return_distinct_handles() {
        let mut pool = ResourcePool::new();
        let image = pool.add_image(
            "Final",
            UsageKind::ColorAttachment,
            ImageSpec {
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                extent: (1920, 1080),
                mip_levels: 1,
                resize_policy: ResizePolicy::SwapchainRelative,
            },
        );
        let buffer = pool.add_buffer(
            "Camera",
            UsageKind::ComputeReadStorage,
            BufferSpec { size: 256, per_frame: PerFrame::PerFrameInFlight },
        );
        assert_ne!(image.index(), buffer.index());
    }

    #[test]
    fn add_node_stores_declared_reads_and_writes() {
        let mut pool = ResourcePool::new();
        pool.add_node(Box::new(NoopPass));
        assert_eq!(pool.node_count(), 1);
    }
}
