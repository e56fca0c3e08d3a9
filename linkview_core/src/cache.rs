// Copyright 2026 the Linkview Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The snapshot cache.
//!
//! One [`SnapshotCache`] entry exists per linked object while anything holds
//! it. An entry mirrors the object's live render graph in up to three
//! [`SnapshotKind`] flavors. Each flavor shares the object's geometry nodes
//! but carries its own copy of the display-mode switch, so links showing the
//! same object never fight over switch state.
//!
//! Containers (objects with a child root) also get a *child group*: one
//! [`SnapshotKind::Child`] snapshot per claimed child, each held through a
//! nested entry. The child group replaces the child root inside every
//! mirrored switch, so containers compose recursively.
//!
//! # Holders
//!
//! Entries are shared by the closed set of [`Holder`]s. The entry is torn
//! down when its last holder leaves: a *detached* trace event fires first,
//! then every node the entry owns is destroyed and its child entries are
//! released, then a *destroyed* event fires.
//!
//! Holders also carry a *live* flag. While at least one live holder exists
//! the document is asked (via
//! [`force_update`](crate::object::LinkedObjectSource::force_update)) to keep
//! the object's render graph current even when the object itself is hidden.
//!
//! # Reentrancy
//!
//! Releasing an entry can release nested entries. [`update_entry`] therefore
//! acquires every new child before swapping the child index and only then
//! releases the previous index; an entry is removed from the registry before
//! anything it holds is released.
//!
//! [`update_entry`]: crate::LinkContext::update_entry

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::context::LinkContext;
use crate::error::LinkError;
use crate::handle::HandleId;
use crate::object::{Icon, LinkedObjectSource, ObjectId};
use crate::scene::{Detail, NodeId, NodeKind, NodeStore, PickedPoint, ScenePath};
use crate::subname::{check_subname, flattened_subname};
use crate::trace::{
    ContainerUpdatedEvent, EntryAcquiredEvent, EntryDestroyedEvent, EntryDetachedEvent,
    EntryReleasedEvent, SnapshotBuiltEvent, TraceSink,
};

/// Generational handle to a cache entry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId {
    idx: u32,
    generation: u32,
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryId({}@gen{})", self.idx, self.generation)
    }
}

/// A snapshot flavor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SnapshotKind {
    /// Everything except the object's own transform; the holder supplies
    /// the placement.
    Transform,
    /// Everything, including the object's own transform.
    Visible,
    /// Like [`Visible`](Self::Visible), but the mirrored switch shows
    /// nothing while the object itself is hidden. Used inside container
    /// child groups.
    Child,
}

impl SnapshotKind {
    /// Every flavor, in index order.
    pub const ALL: [Self; 3] = [Self::Transform, Self::Visible, Self::Child];

    /// Array index of the flavor.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Transform => 0,
            Self::Visible => 1,
            Self::Child => 2,
        }
    }
}

impl TryFrom<i32> for SnapshotKind {
    type Error = LinkError;

    fn try_from(raw: i32) -> Result<Self, LinkError> {
        match raw {
            0 => Ok(Self::Transform),
            1 => Ok(Self::Visible),
            2 => Ok(Self::Child),
            _ => Err(LinkError::InvalidSnapshotKind(raw)),
        }
    }
}

/// Who holds a cache entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Holder {
    /// A link handle's direct target.
    Link(HandleId),
    /// A link handle's owner object, held to observe restore state.
    Owner(HandleId),
    /// One slot of a link handle's element array.
    Element(HandleId, usize),
    /// One named sub-object link of a link handle, keyed by its path.
    SubObject(HandleId, String),
    /// A container entry's child group.
    Container(EntryId),
}

#[derive(Debug)]
struct HolderRecord {
    holder: Holder,
    live: bool,
}

#[derive(Debug)]
pub(crate) struct Entry {
    pub(crate) object: ObjectId,
    holders: Vec<HolderRecord>,
    live: usize,
    pub(crate) snapshots: [Option<NodeId>; 3],
    pub(crate) switches: [Option<NodeId>; 3],
    pub(crate) linked_switch: Option<NodeId>,
    pub(crate) child_group: Option<NodeId>,
    pub(crate) child_map: BTreeMap<NodeId, EntryId>,
    icons: BTreeMap<String, Icon>,
}

impl Entry {
    fn new(object: ObjectId) -> Self {
        Self {
            object,
            holders: Vec::new(),
            live: 0,
            snapshots: [None; 3],
            switches: [None; 3],
            linked_switch: None,
            child_group: None,
            child_map: BTreeMap::new(),
            icons: BTreeMap::new(),
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// Registry of snapshot cache entries, keyed by linked object.
///
/// Owned by a [`LinkContext`]; all mutation goes through the context so
/// that nodes, holders and trace events stay consistent.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_object: BTreeMap<ObjectId, EntryId>,
}

impl SnapshotCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_object.len()
    }

    /// Whether no entry is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_object.is_empty()
    }

    /// The entry mirroring `obj`, if one is live.
    #[must_use]
    pub fn lookup(&self, obj: ObjectId) -> Option<EntryId> {
        self.by_object.get(&obj).copied()
    }

    /// Whether the handle refers to a live entry.
    #[must_use]
    pub fn contains(&self, id: EntryId) -> bool {
        self.get(id).is_some()
    }

    /// The object an entry mirrors.
    #[must_use]
    pub fn object(&self, id: EntryId) -> Option<ObjectId> {
        self.get(id).map(|e| e.object)
    }

    /// Number of holders; `0` for dead entries.
    #[must_use]
    pub fn holder_count(&self, id: EntryId) -> usize {
        self.get(id).map_or(0, |e| e.holders.len())
    }

    /// Number of live holders; `0` for dead entries.
    #[must_use]
    pub fn live_count(&self, id: EntryId) -> usize {
        self.get(id).map_or(0, |e| e.live)
    }

    /// The holders of an entry, oldest first.
    pub fn holders(&self, id: EntryId) -> impl Iterator<Item = &Holder> + '_ {
        self.get(id)
            .into_iter()
            .flat_map(|e| e.holders.iter().map(|r| &r.holder))
    }

    /// The cached root of a flavor, without building it.
    #[must_use]
    pub fn snapshot_root(&self, id: EntryId, kind: SnapshotKind) -> Option<NodeId> {
        self.get(id).and_then(|e| e.snapshots[kind.index()])
    }

    /// The mirrored display-mode switch of a flavor.
    #[must_use]
    pub fn mode_switch(&self, id: EntryId, kind: SnapshotKind) -> Option<NodeId> {
        self.get(id).and_then(|e| e.switches[kind.index()])
    }

    /// The child group of a container entry.
    #[must_use]
    pub fn child_group(&self, id: EntryId) -> Option<NodeId> {
        self.get(id).and_then(|e| e.child_group)
    }

    /// The entries held by a container entry's child group, keyed by the
    /// child snapshot root.
    #[must_use]
    pub fn child_entries(&self, id: EntryId) -> Vec<(NodeId, EntryId)> {
        self.get(id)
            .map(|e| e.child_map.iter().map(|(&n, &c)| (n, c)).collect())
            .unwrap_or_default()
    }

    pub(crate) fn get(&self, id: EntryId) -> Option<&Entry> {
        let slot = self.slots.get(id.idx as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: EntryId) -> Option<&mut Entry> {
        let slot = self.slots.get_mut(id.idx as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_mut()
    }

    fn insert(&mut self, entry: Entry) -> EntryId {
        let object = entry.object;
        let id = if let Some(idx) = self.free.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.generation += 1;
            slot.entry = Some(entry);
            EntryId {
                idx,
                generation: slot.generation,
            }
        } else {
            let idx = slot_index(self.slots.len());
            self.slots.push(Slot {
                generation: 0,
                entry: Some(entry),
            });
            EntryId { idx, generation: 0 }
        };
        self.by_object.insert(object, id);
        id
    }

    fn remove(&mut self, id: EntryId) -> Option<Entry> {
        let slot = self.slots.get_mut(id.idx as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let entry = slot.entry.take()?;
        self.free.push(id.idx);
        if self.by_object.get(&entry.object) == Some(&id) {
            self.by_object.remove(&entry.object);
        }
        Some(entry)
    }
}

/// Removes every child of `node`, then destroys it.
pub(crate) fn dispose_node(graph: &mut NodeStore, node: NodeId) {
    if graph.is_alive(node) {
        graph.remove_all_children(node);
        graph.destroy_node(node);
    }
}

impl<T: TraceSink> LinkContext<T> {
    /// Adds `holder` to the entry for `obj`, creating the entry if needed.
    ///
    /// A new entry is registered before its container children are
    /// snapshotted, so a child claiming its own container finds the entry
    /// instead of recursing.
    ///
    /// Returns `None` if the object is not attached to a document.
    pub fn acquire<S: LinkedObjectSource + ?Sized>(
        &mut self,
        src: &mut S,
        obj: ObjectId,
        holder: Holder,
        live: bool,
    ) -> Option<EntryId> {
        if !src.is_attached(obj) {
            return None;
        }
        let (id, created) = match self.cache.lookup(obj) {
            Some(id) => (id, false),
            None => (self.cache.insert(Entry::new(obj)), true),
        };
        let entry = self.cache.get_mut(id)?;
        entry.holders.push(HolderRecord { holder, live });
        let holders = entry.holders.len();
        if live {
            entry.live += 1;
            if entry.live == 1 {
                src.force_update(obj, true);
            }
        }
        self.tracer.entry_acquired(&EntryAcquiredEvent {
            object: obj,
            holders,
            created,
        });
        if created {
            self.update_entry(src, id);
        }
        Some(id)
    }

    /// Removes one `holder` from an entry, tearing the entry down when it
    /// was the last.
    ///
    /// Releasing a holder that does not hold the entry, or a dead entry, is
    /// a no-op.
    pub fn release<S: LinkedObjectSource + ?Sized>(
        &mut self,
        src: &mut S,
        id: EntryId,
        holder: &Holder,
    ) {
        let Some(entry) = self.cache.get_mut(id) else {
            return;
        };
        let Some(pos) = entry.holders.iter().position(|r| r.holder == *holder) else {
            return;
        };
        let record = entry.holders.remove(pos);
        let object = entry.object;
        let holders = entry.holders.len();
        if record.live {
            entry.live -= 1;
            if entry.live == 0 {
                src.force_update(object, false);
            }
        }
        self.tracer
            .entry_released(&EntryReleasedEvent { object, holders });
        if holders == 0 {
            self.teardown(src, id);
        }
    }

    fn teardown<S: LinkedObjectSource + ?Sized>(&mut self, src: &mut S, id: EntryId) {
        let Some(mut entry) = self.cache.remove(id) else {
            return;
        };
        let object = entry.object;
        self.tracer.entry_detached(&EntryDetachedEvent { object });

        for node in entry
            .snapshots
            .iter_mut()
            .chain(entry.switches.iter_mut())
            .filter_map(Option::take)
        {
            dispose_node(&mut self.graph, node);
        }
        if let Some(group) = entry.child_group.take() {
            dispose_node(&mut self.graph, group);
        }
        let children = core::mem::take(&mut entry.child_map);
        for child in children.into_values() {
            self.release(src, child, &Holder::Container(id));
        }

        self.tracer.entry_destroyed(&EntryDestroyedEvent { object });
    }

    /// Marks one holder of an entry live or not.
    ///
    /// The document is told to keep the object updated when the first live
    /// holder appears, and released when the last one goes.
    pub fn set_live<S: LinkedObjectSource + ?Sized>(
        &mut self,
        src: &mut S,
        id: EntryId,
        holder: &Holder,
        live: bool,
    ) {
        let Some(entry) = self.cache.get_mut(id) else {
            return;
        };
        let Some(record) = entry.holders.iter_mut().find(|r| r.holder == *holder) else {
            return;
        };
        if record.live == live {
            return;
        }
        record.live = live;
        if live {
            entry.live += 1;
            if entry.live == 1 {
                src.force_update(entry.object, true);
            }
        } else {
            entry.live -= 1;
            if entry.live == 0 {
                src.force_update(entry.object, false);
            }
        }
    }

    /// Returns the root of one snapshot flavor, building it on first use.
    ///
    /// With `rebuild`, an existing snapshot is cleared and repopulated in
    /// place, so every holder attached to it sees the new content without
    /// being touched. Other flavors are left alone.
    ///
    /// Returns `None` if the object is gone or has no render graph.
    pub fn snapshot<S: LinkedObjectSource + ?Sized>(
        &mut self,
        src: &S,
        id: EntryId,
        kind: SnapshotKind,
        rebuild: bool,
    ) -> Option<NodeId> {
        let obj = self.cache.get(id)?.object;
        if !src.is_attached(obj) {
            return None;
        }
        let root = src.render_root(obj)?;
        let k = kind.index();

        let entry = self.cache.get_mut(id)?;
        let (snap, switch) = match (entry.snapshots[k], entry.switches[k]) {
            (Some(snap), Some(switch)) => {
                if !rebuild {
                    return Some(snap);
                }
                (snap, switch)
            }
            _ => {
                let snap = self.graph.create_named(NodeKind::Separator, "snapshot");
                let switch = self.graph.create_named(NodeKind::EMPTY_SWITCH, "snapshot-mode");
                entry.snapshots[k] = Some(snap);
                entry.switches[k] = Some(switch);
                (snap, switch)
            }
        };
        entry.linked_switch = None;
        let child_group = entry.child_group;

        let graph = &mut self.graph;
        graph.remove_all_children(snap);
        graph.set_which(switch, None);
        graph.remove_all_children(switch);

        let child_root = src.child_root(obj);
        let transform = src.transform_node(obj);
        let mode_switch = src.mode_switch(obj);

        if kind != SnapshotKind::Transform
            && let Some(t) = transform
        {
            graph.add_child(snap, t);
        }

        let mut linked_switch = None;
        let top: Vec<NodeId> = graph.children(root).collect();
        for node in top {
            if Some(node) == transform {
                continue;
            }
            if Some(node) != mode_switch {
                graph.add_child(snap, node);
                continue;
            }
            linked_switch = Some(node);
            graph.add_child(snap, switch);
            let modes: Vec<NodeId> = graph.children(node).collect();
            for child in modes {
                match child_group {
                    Some(group) if Some(child) == child_root => graph.add_child(switch, group),
                    _ => graph.add_child(switch, child),
                }
            }
        }
        let children = graph.child_count(snap);

        if let Some(entry) = self.cache.get_mut(id) {
            entry.linked_switch = linked_switch;
        }
        self.update_switch(src, id);
        self.tracer.snapshot_built(&SnapshotBuiltEvent {
            object: obj,
            kind,
            children,
        });
        Some(snap)
    }

    /// Mirrors the object's display-mode switch into every cached flavor.
    ///
    /// A mirror with no children shows nothing, and so does the
    /// [`Child`](SnapshotKind::Child) mirror while the object's own switch
    /// shows nothing. Otherwise the mirror shows the default display mode
    /// when it has one, else its first child.
    pub fn update_switch<S: LinkedObjectSource + ?Sized>(&mut self, src: &S, id: EntryId) {
        let Some(entry) = self.cache.get(id) else {
            return;
        };
        if !src.is_attached(entry.object) {
            return;
        }
        let Some(linked) = entry.linked_switch.filter(|&n| self.graph.is_alive(n)) else {
            return;
        };
        let index = self.graph.which(linked);
        let default_mode = src.default_mode(entry.object);
        for kind in SnapshotKind::ALL {
            let Some(switch) = entry.switches[kind.index()] else {
                continue;
            };
            let count = self.graph.child_count(switch);
            let which = if (index.is_none() && kind == SnapshotKind::Child) || count == 0 {
                None
            } else if count > default_mode {
                Some(default_mode)
            } else {
                Some(0)
            };
            self.graph.set_which(switch, which);
        }
    }

    /// Rebuilds an entry after its object changed.
    ///
    /// For containers the child group is regrouped from
    /// [`claim_children`](LinkedObjectSource::claim_children): each child's
    /// entry is acquired and its [`Child`](SnapshotKind::Child) snapshot
    /// added, the new child index is swapped in, and only then is the
    /// previous index released. Afterwards every cached flavor is rebuilt.
    ///
    /// Does nothing while the object is being restored.
    pub fn update_entry<S: LinkedObjectSource + ?Sized>(&mut self, src: &mut S, id: EntryId) {
        let Some(entry) = self.cache.get(id) else {
            return;
        };
        let obj = entry.object;
        if !src.is_attached(obj) || src.is_restoring(obj) {
            return;
        }

        if src.child_root(obj).is_some() {
            self.regroup_children(src, id);
        } else if let Some(entry) = self.cache.get_mut(id)
            && let Some(group) = entry.child_group.take()
        {
            let old = core::mem::take(&mut entry.child_map);
            dispose_node(&mut self.graph, group);
            for child in old.into_values() {
                self.release(src, child, &Holder::Container(id));
            }
        }

        for kind in SnapshotKind::ALL {
            if self.cache.snapshot_root(id, kind).is_some() {
                self.snapshot(src, id, kind, true);
            }
        }
    }

    fn regroup_children<S: LinkedObjectSource + ?Sized>(&mut self, src: &mut S, id: EntryId) {
        let Some(entry) = self.cache.get_mut(id) else {
            return;
        };
        let obj = entry.object;
        let group = match entry.child_group {
            Some(group) => {
                self.graph.remove_all_children(group);
                group
            }
            None => {
                let group = self.graph.create_named(NodeKind::Group, "child-group");
                entry.child_group = Some(group);
                group
            }
        };

        let holder = Holder::Container(id);
        let mut map = BTreeMap::new();
        for child in src.claim_children(obj) {
            let Some(cid) = self.acquire(src, child, holder.clone(), true) else {
                continue;
            };
            match self.snapshot(src, cid, SnapshotKind::Child, false) {
                Some(node) if !map.contains_key(&node) => {
                    map.insert(node, cid);
                    self.graph.add_child(group, node);
                }
                _ => self.release(src, cid, &holder),
            }
        }
        let children = map.len();

        let old = match self.cache.get_mut(id) {
            Some(entry) => core::mem::replace(&mut entry.child_map, map),
            None => map,
        };
        for child in old.into_values() {
            self.release(src, child, &holder);
        }
        self.tracer.container_updated(&ContainerUpdatedEvent {
            object: obj,
            children,
        });
    }

    /// Names the sub-element hit by `pick` inside one flavor of an entry,
    /// appending to `out`.
    ///
    /// Picks inside an active child group are resolved by the child's own
    /// entry and prefixed with the child's name. `out` may hold a partial
    /// name when this returns `false`.
    pub fn entry_element_picked<S: LinkedObjectSource + ?Sized>(
        &self,
        src: &S,
        id: EntryId,
        add_name: bool,
        kind: SnapshotKind,
        pick: &PickedPoint,
        out: &mut String,
    ) -> bool {
        let Some(entry) = self.cache.get(id) else {
            return false;
        };
        let obj = entry.object;
        if !src.is_attached(obj) || !src.is_selectable(obj) {
            return false;
        }
        if add_name {
            let Some(name) = src.name(obj) else {
                return false;
            };
            out.push_str(name);
            out.push('.');
        }

        if let Some(group) = self.active_child_group(entry, kind) {
            let Some(index) = pick.path.find(group).filter(|&i| i > 0) else {
                return false;
            };
            let Some(child) = pick
                .path
                .node(index + 1)
                .and_then(|node| entry.child_map.get(&node))
            else {
                return false;
            };
            return self.entry_element_picked(src, *child, true, SnapshotKind::Child, pick, out);
        }

        match src.element_picked(obj, &self.graph, pick) {
            Some(sub) => {
                out.push_str(&sub);
                true
            }
            None => false,
        }
    }

    /// Resolves `sub` inside one flavor of an entry, appending the nodes
    /// from the snapshot root downwards to `path`.
    ///
    /// With `check_name`, `sub` must start with the object's own name. Inside
    /// an active child group the name is first flattened (see
    /// [`flattened_subname`]) and then offered to every child entry. On
    /// failure `path` is restored to its original length.
    pub fn entry_detail<S: LinkedObjectSource + ?Sized>(
        &self,
        src: &S,
        id: EntryId,
        check_name: bool,
        kind: SnapshotKind,
        sub: &str,
        mut path: Option<&mut ScenePath>,
    ) -> Option<Detail> {
        let entry = self.cache.get(id)?;
        let obj = entry.object;
        if !src.is_attached(obj) {
            return None;
        }
        let sub = if check_name {
            check_subname(src.name(obj)?, sub)?
        } else {
            sub
        };

        let snap = entry.snapshots[kind.index()]?;
        let switch = entry.switches[kind.index()]?;
        self.graph.find_child(snap, switch)?;

        let len = path.as_ref().map_or(0, |p| p.len());
        if let Some(p) = path.as_deref_mut() {
            p.append(&self.graph, snap);
            p.append(&self.graph, switch);
        }
        if sub.is_empty() {
            return Some(Detail::Object);
        }

        let found = match self.active_child_group(entry, kind) {
            None => src.detail_path(obj, &self.graph, sub, path.as_deref_mut()),
            Some(group) => {
                if let Some(p) = path.as_deref_mut() {
                    p.append(&self.graph, group);
                }
                let child_kind = if src.child_root(obj).is_some() {
                    SnapshotKind::Child
                } else {
                    SnapshotKind::Visible
                };
                flattened_subname(src, obj, sub).and_then(|sub| {
                    entry.child_map.values().find_map(|&child| {
                        self.entry_detail(src, child, true, child_kind, sub, path.as_deref_mut())
                    })
                })
            }
        };
        if found.is_none()
            && let Some(p) = path
        {
            p.truncate(len);
        }
        found
    }

    /// The entry's object icon, optionally composited with an overlay.
    ///
    /// Composited icons are cached per overlay until the object's icon
    /// changes.
    pub fn entry_icon<S: LinkedObjectSource + ?Sized>(
        &mut self,
        src: &S,
        id: EntryId,
        overlay: Option<&str>,
    ) -> Option<Icon> {
        let obj = self.cache.get(id)?.object;
        if !src.is_attached(obj) {
            return None;
        }
        let Some(overlay) = overlay else {
            return src.icon(obj);
        };
        if let Some(icon) = self.cache.get(id)?.icons.get(overlay) {
            return Some(icon.clone());
        }
        let base = src.icon(obj)?;
        let icon = Icon {
            name: base.name,
            overlay: Some(overlay.into()),
            size: self.config.icon_size,
        };
        self.cache
            .get_mut(id)?
            .icons
            .insert(overlay.into(), icon.clone());
        Some(icon)
    }

    pub(crate) fn clear_icons(&mut self, id: EntryId) {
        if let Some(entry) = self.cache.get_mut(id) {
            entry.icons.clear();
        }
    }

    pub(crate) fn holder_list(&self, id: EntryId) -> Vec<Holder> {
        self.cache.holders(id).cloned().collect()
    }

    /// Drops a child from a container's child group without touching the
    /// rest of the group.
    pub(crate) fn drop_container_child<S: LinkedObjectSource + ?Sized>(
        &mut self,
        src: &mut S,
        container: EntryId,
        child: EntryId,
    ) {
        let Some(entry) = self.cache.get_mut(container) else {
            return;
        };
        let node = entry
            .child_map
            .iter()
            .find_map(|(&n, &c)| (c == child).then_some(n));
        let group = entry.child_group;
        if let Some(node) = node {
            entry.child_map.remove(&node);
            if let Some(group) = group
                && self.graph.is_alive(node)
            {
                self.graph.remove_child(group, node);
            }
        }
        self.release(src, child, &Holder::Container(container));
    }

    fn active_child_group(&self, entry: &Entry, kind: SnapshotKind) -> Option<NodeId> {
        let group = entry.child_group?;
        let switch = entry.switches[kind.index()]?;
        (self.graph.active_child(switch) == Some(group)).then_some(group)
    }
}

fn slot_index(len: usize) -> u32 {
    u32::try_from(len).expect("entry arena exhausted")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_kind_from_raw() {
        assert_eq!(SnapshotKind::try_from(0), Ok(SnapshotKind::Transform));
        assert_eq!(SnapshotKind::try_from(2), Ok(SnapshotKind::Child));
        assert_eq!(
            SnapshotKind::try_from(3),
            Err(LinkError::InvalidSnapshotKind(3))
        );
        assert_eq!(
            SnapshotKind::try_from(-1),
            Err(LinkError::InvalidSnapshotKind(-1))
        );
    }

    #[test]
    fn registry_reuses_slots_with_new_generation() {
        let mut cache = SnapshotCache::new();
        let a = cache.insert(Entry::new(ObjectId(1)));
        assert_eq!(cache.lookup(ObjectId(1)), Some(a));
        assert!(cache.remove(a).is_some());
        assert!(cache.is_empty());
        assert!(!cache.contains(a));

        let b = cache.insert(Entry::new(ObjectId(2)));
        assert_ne!(a, b, "recycled slot must not alias the old handle");
        assert_eq!(cache.object(b), Some(ObjectId(2)));
        assert_eq!(cache.object(a), None);
        assert!(cache.remove(a).is_none());
    }

    #[test]
    fn dead_entries_report_nothing() {
        let mut cache = SnapshotCache::new();
        let a = cache.insert(Entry::new(ObjectId(7)));
        cache.remove(a);
        assert_eq!(cache.holder_count(a), 0);
        assert_eq!(cache.live_count(a), 0);
        assert_eq!(cache.holders(a).count(), 0);
        assert!(cache.child_entries(a).is_empty());
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    #[should_panic(expected = "entry arena exhausted")]
    fn entry_arena_exhaustion_panics() {
        assert_eq!(slot_index(7), 7);
        slot_index(usize::MAX);
    }
}
