// Copyright 2026 the Linkview Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The link context: scene graph, snapshot cache and link handles together.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use crate::cache::{Holder, SnapshotCache};
use crate::config::LinkConfig;
use crate::handle::{HandleId, LinkHandle};
use crate::object::{LinkedObjectSource, ObjectId};
use crate::scene::{GraphChanges, NodeStore};
use crate::trace::{NoopSink, TraceSink, Tracer};

/// Owner of all link state.
///
/// A single context serves a whole application: it owns the shared
/// [`NodeStore`] (document render graphs are built in it too), the
/// [`SnapshotCache`] registry and every link handle. Operations that may
/// acquire or release cache entries take the document as
/// `&mut impl LinkedObjectSource`; pure queries take it by shared
/// reference.
#[derive(Debug)]
pub struct LinkContext<T: TraceSink = NoopSink> {
    pub(crate) graph: NodeStore,
    pub(crate) cache: SnapshotCache,
    pub(crate) handles: BTreeMap<HandleId, LinkHandle>,
    pub(crate) next_handle: u32,
    pub(crate) config: LinkConfig,
    pub(crate) tracer: Tracer<T>,
}

impl LinkContext {
    /// Creates an empty context without tracing.
    #[must_use]
    pub fn new(config: LinkConfig) -> Self {
        Self::with_trace_sink(config, NoopSink)
    }
}

impl<T: TraceSink> LinkContext<T> {
    /// Creates an empty context reporting to `sink`.
    ///
    /// Events only reach the sink when the `trace` feature is enabled.
    #[must_use]
    pub fn with_trace_sink(config: LinkConfig, sink: T) -> Self {
        Self {
            graph: NodeStore::new(),
            cache: SnapshotCache::new(),
            handles: BTreeMap::new(),
            next_handle: 0,
            config,
            tracer: Tracer::new(sink),
        }
    }

    /// The shared scene graph.
    #[must_use]
    pub fn graph(&self) -> &NodeStore {
        &self.graph
    }

    /// The shared scene graph, for building document render graphs.
    pub fn graph_mut(&mut self) -> &mut NodeStore {
        &mut self.graph
    }

    /// The snapshot cache registry.
    #[must_use]
    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    /// The configuration the context was created with.
    #[must_use]
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// The trace sink.
    #[must_use]
    pub fn trace_sink(&self) -> &T {
        self.tracer.sink()
    }

    /// The trace sink, mutably.
    pub fn trace_sink_mut(&mut self) -> &mut T {
        self.tracer.sink_mut()
    }

    /// Drains the graph's dirty channels.
    pub fn evaluate(&mut self) -> GraphChanges {
        self.graph.evaluate()
    }

    // -- Document notifications --

    /// Rebuilds the entry of an object whose data changed.
    ///
    /// Returns the owners of links that target `obj` directly. Callers
    /// should mark those owners recomputed so the change travels up through
    /// chains of links.
    pub fn object_changed<S: LinkedObjectSource + ?Sized>(
        &mut self,
        src: &mut S,
        obj: ObjectId,
    ) -> Vec<ObjectId> {
        let Some(id) = self.cache.lookup(obj) else {
            return Vec::new();
        };
        let mut owners = Vec::new();
        for holder in self.holder_list(id) {
            if let Holder::Link(h) = holder
                && let Some(owner) = self.owner_of(h)
                && owner != obj
                && !owners.contains(&owner)
            {
                owners.push(owner);
            }
        }
        self.update_entry(src, id);
        owners
    }

    /// Re-mirrors an object's display-mode switch after its visibility or
    /// display mode changed. Nothing is rebuilt.
    pub fn visibility_changed<S: LinkedObjectSource + ?Sized>(&mut self, src: &S, obj: ObjectId) {
        if let Some(id) = self.cache.lookup(obj) {
            self.update_switch(src, id);
        }
    }

    /// Drops cached composited icons of an object and of every link owner
    /// that shows the object's icon, transitively.
    ///
    /// Returns those owners, nearest first.
    pub fn icon_changed<S: LinkedObjectSource + ?Sized>(
        &mut self,
        src: &S,
        obj: ObjectId,
    ) -> Vec<ObjectId> {
        let mut changed = Vec::new();
        let mut seen = BTreeSet::new();
        let mut queue = alloc::vec![obj];
        while let Some(obj) = queue.pop() {
            if !seen.insert(obj) {
                continue;
            }
            let Some(id) = self.cache.lookup(obj) else {
                continue;
            };
            self.clear_icons(id);
            if !src.is_attached(obj) {
                continue;
            }
            for holder in self.holder_list(id) {
                let h = match holder {
                    Holder::Link(h) => h,
                    Holder::SubObject(h, _)
                        if self
                            .handles
                            .get(&h)
                            .is_some_and(|hd| hd.auto_sub_link && hd.subs.len() == 1) =>
                    {
                        h
                    }
                    _ => continue,
                };
                if let Some(owner) = self.owner_of(h)
                    && owner != obj
                {
                    changed.push(owner);
                    queue.push(owner);
                }
            }
        }
        changed
    }

    /// Rebuilds the entry of an object that finished loading.
    pub fn finish_restoring<S: LinkedObjectSource + ?Sized>(&mut self, src: &mut S, obj: ObjectId) {
        if let Some(id) = self.cache.lookup(obj) {
            self.update_entry(src, id);
        }
    }

    /// Detaches everything that holds an object about to be deleted.
    ///
    /// Each holder unlinks in its own way: a handle target unlinks the
    /// whole handle, an element or sub-object link unlinks just that part,
    /// and a container drops the child from its group. The entry is gone
    /// afterwards.
    pub fn object_deleted<S: LinkedObjectSource + ?Sized>(&mut self, src: &mut S, obj: ObjectId) {
        let Some(id) = self.cache.lookup(obj) else {
            return;
        };
        while let Some(holder) = self.cache.holders(id).next().cloned() {
            match &holder {
                Holder::Link(h) => {
                    _ = self.unlink(src, *h);
                }
                Holder::Owner(h) => self.forget_owner(src, *h),
                Holder::Element(h, index) => self.unlink_element_at(src, *h, *index),
                Holder::SubObject(h, key) => self.unlink_sub_at(src, *h, key),
                Holder::Container(parent) => self.drop_container_child(src, *parent, id),
            }
            if self.cache.holders(id).any(|x| *x == holder) {
                self.release(src, id, &holder);
            }
        }
    }

    fn owner_of(&self, h: HandleId) -> Option<ObjectId> {
        let owner = self.handles.get(&h)?.owner?;
        self.cache.object(owner)
    }
}
