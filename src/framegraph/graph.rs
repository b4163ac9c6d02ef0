//! The frame graph façade: the declarative API applications build frames
//! against, wrapping the [`ResourcePool`] and the compiled node order.

use std::any::Any;

use crate::framegraph::compiler::{compile, resize_swapchain_relative};
use crate::framegraph::error::Result;
use crate::framegraph::handle::NodeHandle;
use crate::framegraph::node::{FrameInfo, Pass};
use crate::framegraph::pool::ResourcePool;

/// Placeholder swapped into a node's slot while its real pass is borrowed
/// out to run against an immutable view of the pool it lives in. Never
/// executed: every node's real pass is restored before control returns to
/// the caller.
struct PlaceholderPass;

impl Pass for PlaceholderPass {
    fn info(&self) -> crate::framegraph::node::NodeInfo {
        crate::framegraph::node::NodeInfo::default()
    }
    fn execute(&mut self, _pool: &ResourcePool, _frame: &FrameInfo, _encoder: &mut wgpu::CommandEncoder) {
        unreachable!("PlaceholderPass is never executed");
    }
}

/// Declarative frame composition over a [`ResourcePool`]: passes are added
/// once via [`Self::add`], the graph is [`Self::compile`]d into a
/// topological node order, and that order is replayed every frame via
/// [`Self::execute`].
#[derive(Default)]
pub struct FrameGraph {
    pool: ResourcePool,
    order: Vec<NodeHandle>,
    compiled: bool,
}

impl FrameGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn pool(&self) -> &ResourcePool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut ResourcePool {
        &mut self.pool
    }

    #[must_use]
    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    /// Registers `pass`, consulting its declared read/write sets via
    /// [`Pass::info`], and returns a mutable reference to it so the caller
    /// can keep configuring it. Marks the graph as needing a recompile.
    ///
    /// # Panics
    ///
    /// Never, in practice: the type just inserted can always be downcast
    /// back to itself.
    pub fn add<P: Pass + 'static>(&mut self, pass: P) -> &mut P {
        let handle = self.pool.add_node(Box::new(pass));
        self.compiled = false;
        let stored: &mut (dyn Any + 'static) = &mut *self.pool.nodes[handle.index() as usize].pass;
        stored.downcast_mut::<P>().expect("Pass type mismatch directly after insertion")
    }

    /// Resolves references, orders nodes topologically, materializes any
    /// resource that isn't already, and synthesizes barriers. Idempotent:
    /// calling again after adding more passes only materializes the new
    /// ones, since `materialize` skips resources that already carry a
    /// handle.
    ///
    /// # Errors
    ///
    /// See [`crate::framegraph::compiler::compile`].
    pub fn compile(&mut self, device: &wgpu::Device, swapchain_extent: (u32, u32)) -> Result<()> {
        self.order = compile(&mut self.pool, device, swapchain_extent)?;
        self.compiled = true;
        Ok(())
    }

    /// Runs every compiled node's [`Pass::execute`] in topological order.
    ///
    /// # Panics
    ///
    /// Panics if called before a successful [`Self::compile`].
    pub fn execute(&mut self, frame: &FrameInfo, encoder: &mut wgpu::CommandEncoder) {
        assert!(self.compiled, "FrameGraph::execute called before compile");
        for &handle in &self.order {
            let idx = handle.index() as usize;
            let mut pass = std::mem::replace(&mut self.pool.nodes[idx].pass, Box::new(PlaceholderPass));
            pass.execute(&self.pool, frame, encoder);
            self.pool.nodes[idx].pass = pass;
        }
    }

    /// Resizes every `SwapchainRelative` image in place, lets every pass
    /// rebuild derived state (per-mip views, sized scratch buffers) via
    /// [`Pass::create_resources`], and recompiles.
    ///
    /// # Errors
    ///
    /// See [`crate::framegraph::compiler::compile`].
    pub fn swapchain_resized(&mut self, device: &wgpu::Device, width: u32, height: u32) -> Result<()> {
        resize_swapchain_relative(&mut self.pool, device, (width, height));
        for idx in 0..self.pool.nodes.len() {
            let mut pass = std::mem::replace(&mut self.pool.nodes[idx].pass, Box::new(PlaceholderPass));
            pass.create_resources(&mut self.pool);
            self.pool.nodes[idx].pass = pass;
        }
        self.compile(device, (width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framegraph::node::NodeInfo;
    use crate::framegraph::resource::{ImageSpec, ResizePolicy};

    struct CountingPass {
        runs: u32,
    }
    impl Pass for CountingPass {
        fn info(&self) -> NodeInfo {
            NodeInfo { name: "Counting".into(), reads: vec![], writes: vec![] }
        }
        fn execute(&mut self, _pool: &ResourcePool, _frame: &FrameInfo, _encoder: &mut wgpu::CommandEncoder) {
            self.runs += 1;
        }
    }

    #[test]
    fn add_returns_typed_handle_to_inserted_pass() {
        let mut graph = FrameGraph::new();
        let pass = graph.add(CountingPass { runs: 0 });
        pass.runs = 5;
        assert_eq!(graph.pool().node_count(), 1);
    }

    #[test]
    fn swapchain_relative_image_keeps_format_across_resize() {
        let mut graph = FrameGraph::new();
        graph.pool_mut().add_image(
            "Final",
            crate::framegraph::usage::UsageKind::ColorAttachment,
            ImageSpec {
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                extent: (1, 1),
                mip_levels: 1,
                resize_policy: ResizePolicy::SwapchainRelative,
            },
        );
        assert_eq!(graph.pool().node_count(), 0);
    }
}
