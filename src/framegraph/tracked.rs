//! Process-global resource identity and a bind-group cache keyed on it.
//!
//! Grounded in the donor's `core::resources::Tracked<T>` and
//! `core::binding::BindGroupKey`: wgpu handles are opaque and don't expose
//! a stable identity of their own, so anything that needs to detect "same
//! resource, different generation" (the bindless table, per-pass bind
//! groups) wraps its GPU objects in [`Tracked`] and keys its cache on the
//! ids, not the handles themselves.

use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Wraps a GPU object with a process-unique id, stable for the object's
/// lifetime even if it's rebuilt in place (resize, format change).
#[derive(Debug, Clone)]
pub struct Tracked<T> {
    inner: T,
    id: u64,
}

impl<T> Tracked<T> {
    pub fn new(inner: T) -> Self {
        Self { inner, id: next_id() }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> Deref for Tracked<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Fingerprint of a bind group's layout plus the ids of every resource
/// bound into it. Two calls that would bind the same resources to the same
/// layout produce an equal `ResourceIdSet`, so a cache keyed on it never
/// rebuilds a bind group it already has.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceIdSet {
    layout_id: u64,
    resources: SmallVec<[u64; 8]>,
}

impl ResourceIdSet {
    #[must_use]
    pub fn new(layout_id: u64) -> Self {
        Self { layout_id, resources: SmallVec::new() }
    }

    #[must_use]
    pub fn with_resource(mut self, id: u64) -> Self {
        self.resources.push(id);
        self
    }
}

/// A small bind-group cache keyed on [`ResourceIdSet`], used by passes whose
/// per-object bind groups would otherwise be rebuilt every frame even
/// though the same handful of resource ids recur.
#[derive(Default)]
pub struct BindGroupCache {
    entries: FxHashMap<ResourceIdSet, wgpu::BindGroup>,
}

impl BindGroupCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &ResourceIdSet) -> Option<&wgpu::BindGroup> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: ResourceIdSet, bind_group: wgpu::BindGroup) {
        self.entries.insert(key, bind_group);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracked_ids_are_distinct() {
        let a = Tracked::new(1u32);
        let b = Tracked::new(2u32);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn resource_id_set_equality_matches_same_resources() {
        let a = ResourceIdSet::new(1).with_resource(10).with_resource(20);
        let b = ResourceIdSet::new(1).with_resource(10).with_resource(20);
        assert_eq!(a, b);
    }
}
