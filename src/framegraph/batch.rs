//! Draw batch registry: groups instances by material template and keeps
//! every batch's `first_instance` contiguous as instances come and go.
//!
//! A pure logical structure, same spirit as [`crate::renderer::core::resources::allocator::ModelBufferAllocator`]:
//! it only manages indices and counts, never touching a GPU buffer directly.
//! [`crate::framegraph::scene_feed`] is what actually writes instance bytes
//! at the offsets this registry hands out.

use rustc_hash::FxHashMap;

/// Opaque key identifying a material template (shader + pipeline state the
/// instances in a batch share). Produced by whatever owns material
/// templates; this registry only ever compares and hashes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialTemplateId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchId(u32);

impl BatchId {
    #[must_use]
    pub fn index(self) -> u32 {
        self.0
    }

    /// Reconstructs a `BatchId` from a raw index, for callers iterating
    /// `0..registry.batch_count()` (e.g. [`crate::framegraph::scene_feed`]
    /// writing every batch's metadata in order).
    #[must_use]
    pub fn from_index(index: u32) -> Self {
        Self(index)
    }
}

#[derive(Debug, Clone, Copy)]
struct Batch {
    template: MaterialTemplateId,
    first_instance: u32,
    instance_count: u32,
}

/// Registers draw batches by material template and tracks, for every batch,
/// a contiguous `[first_instance, first_instance + instance_count)` range
/// into the instance buffer.
///
/// Batch ids are stable for the registry's lifetime once assigned by
/// [`Self::register`]; only the `first_instance`/`instance_count` of
/// existing batches move as instances are added or removed.
#[derive(Default)]
pub struct BatchRegistry {
    batches: Vec<Batch>,
    by_template: FxHashMap<MaterialTemplateId, BatchId>,
}

impl BatchRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the batch for `template`, creating an empty one at the end
    /// of the instance range if none exists yet. Idempotent: calling this
    /// again with the same template returns the same [`BatchId`].
    pub fn register(&mut self, template: MaterialTemplateId) -> BatchId {
        if let Some(&id) = self.by_template.get(&template) {
            return id;
        }
        let first_instance = self.total_count();
        let id = BatchId(self.batches.len() as u32);
        self.batches.push(Batch { template, first_instance, instance_count: 0 });
        self.by_template.insert(template, id);
        id
    }

    /// Grows `batch`'s instance count by one, shifting every later batch's
    /// `first_instance` forward by one to keep ranges contiguous.
    ///
    /// Returns the newly allocated instance's absolute index in the
    /// instance buffer (`batch.first_instance + batch.instance_count`
    /// before the grow).
    pub fn add_instance(&mut self, batch: BatchId) -> u32 {
        let i = batch.index() as usize;
        let slot = self.batches[i].first_instance + self.batches[i].instance_count;
        self.batches[i].instance_count += 1;
        for b in &mut self.batches[i + 1..] {
            b.first_instance += 1;
        }
        slot
    }

    /// Shrinks `batch`'s instance count by one, shifting every later
    /// batch's `first_instance` back by one.
    ///
    /// # Panics
    ///
    /// Panics if `batch` is already empty.
    pub fn remove_instance(&mut self, batch: BatchId) {
        let i = batch.index() as usize;
        assert!(self.batches[i].instance_count > 0, "batch {batch:?} has no instances to remove");
        self.batches[i].instance_count -= 1;
        for b in &mut self.batches[i + 1..] {
            b.first_instance -= 1;
        }
    }

    #[must_use]
    pub fn first_instance(&self, batch: BatchId) -> u32 {
        self.batches[batch.index() as usize].first_instance
    }

    #[must_use]
    pub fn instance_count(&self, batch: BatchId) -> u32 {
        self.batches[batch.index() as usize].instance_count
    }

    #[must_use]
    pub fn total_count(&self) -> u32 {
        self.batches.last().map_or(0, |b| b.first_instance + b.instance_count)
    }

    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent() {
        let mut reg = BatchRegistry::new();
        let a = reg.register(MaterialTemplateId(1));
        let b = reg.register(MaterialTemplateId(1));
        assert_eq!(a, b);
        assert_eq!(reg.batch_count(), 1);
    }

    #[test]
    fn churn_keeps_ranges_contiguous() {
        let mut reg = BatchRegistry::new();
        let a = reg.register(MaterialTemplateId(1));
        let b = reg.register(MaterialTemplateId(2));
        let c = reg.register(MaterialTemplateId(3));

        for _ in 0..3 {
            reg.add_instance(a);
        }
        for _ in 0..2 {
            reg.add_instance(b);
        }
        reg.add_instance(c);

        reg.remove_instance(a);

        assert_eq!(reg.first_instance(a), 0);
        assert_eq!(reg.instance_count(a), 2);
        assert_eq!(reg.first_instance(b), 2);
        assert_eq!(reg.instance_count(b), 2);
        assert_eq!(reg.first_instance(c), 4);
        assert_eq!(reg.instance_count(c), 1);
        assert_eq!(reg.total_count(), 5);
    }
}
