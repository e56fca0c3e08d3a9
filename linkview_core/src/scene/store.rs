// Copyright 2026 the Linkview Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with allocation, topology, and property
//! management.

use alloc::string::String;
use alloc::vec::Vec;

use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use crate::dirty;
use crate::transform::TransformParts;

use super::id::NodeId;
use super::node::{DrawStyleNode, MaterialNode, NodeKind, ShapeHintsNode};
use super::path::{ElementDetail, Highlight, ScenePath};
use super::traverse::Children;

/// Struct-of-arrays storage for all scene nodes.
///
/// Nodes are addressed by [`NodeId`] handles. Internally, each node occupies
/// a slot in parallel arrays. Destroyed nodes are recycled via a free list,
/// and generation counters prevent stale handle access.
///
/// The topology is a directed acyclic graph: a node may be the child of
/// several parents, but of each parent at most once.
#[derive(Debug)]
pub struct NodeStore {
    // -- Topology --
    pub(crate) children: Vec<Vec<u32>>,
    pub(crate) parents: Vec<Vec<u32>>,

    // -- Properties --
    pub(crate) kind: Vec<NodeKind>,
    pub(crate) name: Vec<Option<String>>,
    pub(crate) selection: Vec<Vec<Highlight>>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,

    // -- Lifecycle tracking --
    pub(crate) pending_added: Vec<u32>,
    pub(crate) pending_removed: Vec<u32>,
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStore {
    /// Creates an empty node store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            children: Vec::new(),
            parents: Vec::new(),
            kind: Vec::new(),
            name: Vec::new(),
            selection: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
        }
    }

    // -- Allocation API --

    /// Creates a new unattached node and returns its handle.
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            let i = idx as usize;
            self.generation[i] += 1;
            self.children[i].clear();
            self.parents[i].clear();
            self.kind[i] = kind;
            self.name[i] = None;
            self.selection[i].clear();
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.children.push(Vec::new());
            self.parents.push(Vec::new());
            self.kind.push(kind);
            self.name.push(None);
            self.selection.push(Vec::new());
            self.generation.push(0);
            idx
        };

        self.pending_added.push(idx);
        self.dirty.mark(idx, dirty::STRUCTURE);

        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Creates a new node carrying a diagnostic name.
    pub fn create_named(&mut self, kind: NodeKind, name: &str) -> NodeId {
        let id = self.create_node(kind);
        self.name[id.idx as usize] = Some(name.into());
        id
    }

    /// Destroys a node, detaching it from every parent and freeing its slot.
    ///
    /// # Panics
    ///
    /// Panics if the node has children (remove them first) or if the handle
    /// is stale.
    pub fn destroy_node(&mut self, id: NodeId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.children[idx as usize].is_empty(),
            "cannot destroy node with children"
        );

        let parents = core::mem::take(&mut self.parents[idx as usize]);
        for p in parents {
            self.children[p as usize].retain(|&c| c != idx);
            self.dirty.mark_with(p, dirty::STRUCTURE, &EagerPolicy);
        }

        self.dirty.remove_key(idx);
        self.selection[idx as usize].clear();

        // Bump generation so old handles immediately fail validation.
        self.generation[idx as usize] += 1;

        self.free_list.push(idx);
        self.pending_removed.push(idx);
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    /// Returns the number of live nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.len as usize - self.free_list.len()
    }

    // -- Topology API --

    /// Adds `child` as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, if `parent` cannot hold children, if
    /// `child` is already a child of `parent`, or if the edge would create a
    /// cycle.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        let len = self.child_count(parent);
        self.insert_child(parent, child, len);
    }

    /// Inserts `child` at position `index` among `parent`'s children.
    ///
    /// # Panics
    ///
    /// Same as [`add_child`](Self::add_child), and if `index` is greater than
    /// the current child count.
    pub fn insert_child(&mut self, parent: NodeId, child: NodeId, index: usize) {
        self.check_new_edge(parent, child);
        let p = parent.idx;
        assert!(
            index <= self.children[p as usize].len(),
            "insert index {index} out of range"
        );
        self.children[p as usize].insert(index, child.idx);
        self.link_edge(p, child.idx);
    }

    /// Removes `child` from `parent`'s children.
    ///
    /// Returns `false` if `child` was not a child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        self.validate(parent);
        self.validate(child);
        let p = parent.idx;
        let Some(pos) = self.children[p as usize].iter().position(|&c| c == child.idx) else {
            return false;
        };
        self.children[p as usize].remove(pos);
        self.unlink_edge(p, child.idx);
        true
    }

    /// Removes every child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn remove_all_children(&mut self, parent: NodeId) {
        self.validate(parent);
        let p = parent.idx;
        let children = core::mem::take(&mut self.children[p as usize]);
        for c in children {
            self.unlink_edge(p, c);
        }
    }

    /// Replaces `old` with `new` at the same position among `parent`'s
    /// children.
    ///
    /// Returns `false` (and changes nothing) if `old` is not a child of
    /// `parent`.
    ///
    /// # Panics
    ///
    /// Panics on stale handles, or if `new` is already a child of `parent`
    /// or would create a cycle.
    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> bool {
        self.validate(old);
        if old == new {
            return self.find_child(parent, old).is_some();
        }
        let Some(pos) = self.find_child(parent, old) else {
            return false;
        };
        self.check_new_edge(parent, new);
        let p = parent.idx;
        self.children[p as usize][pos] = new.idx;
        self.unlink_edge(p, old.idx);
        self.link_edge(p, new.idx);
        true
    }

    /// Returns the position of `child` among `parent`'s children.
    #[must_use]
    pub fn find_child(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.validate(parent);
        if !self.is_alive(child) {
            return None;
        }
        self.children[parent.idx as usize]
            .iter()
            .position(|&c| c == child.idx)
    }

    /// Returns the child at `index`, if any.
    #[must_use]
    pub fn child(&self, parent: NodeId, index: usize) -> Option<NodeId> {
        self.validate(parent);
        self.children[parent.idx as usize]
            .get(index)
            .map(|&c| self.handle_at(c))
    }

    /// Returns the number of direct children.
    #[must_use]
    pub fn child_count(&self, parent: NodeId) -> usize {
        self.validate(parent);
        self.children[parent.idx as usize].len()
    }

    /// Returns an iterator over the direct children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        self.validate(id);
        Children::new(self, &self.children[id.idx as usize])
    }

    /// Returns every node that has `id` as a direct child.
    #[must_use]
    pub fn parents(&self, id: NodeId) -> Vec<NodeId> {
        self.validate(id);
        self.parents[id.idx as usize]
            .iter()
            .map(|&p| self.handle_at(p))
            .collect()
    }

    // -- Property getters --

    /// Returns the kind (and payload) of a node.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.validate(id);
        self.kind[id.idx as usize]
    }

    /// Returns the diagnostic name of a node.
    #[must_use]
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.validate(id);
        self.name[id.idx as usize].as_deref()
    }

    /// Returns the selected child index of a switch.
    ///
    /// # Panics
    ///
    /// Panics if the node is not a switch.
    #[must_use]
    pub fn which(&self, id: NodeId) -> Option<usize> {
        match self.kind(id) {
            NodeKind::Switch { which } => which,
            _ => panic!("{id:?} is not a switch"),
        }
    }

    /// Returns the child a switch currently traverses.
    #[must_use]
    pub fn active_child(&self, id: NodeId) -> Option<NodeId> {
        self.which(id).and_then(|i| self.child(id, i))
    }

    /// Returns the parts of a transform node.
    ///
    /// # Panics
    ///
    /// Panics if the node is not a transform.
    #[must_use]
    pub fn transform(&self, id: NodeId) -> TransformParts {
        match self.kind(id) {
            NodeKind::Transform(parts) => parts,
            _ => panic!("{id:?} is not a transform"),
        }
    }

    /// Returns the payload of a material node.
    ///
    /// # Panics
    ///
    /// Panics if the node is not a material.
    #[must_use]
    pub fn material(&self, id: NodeId) -> MaterialNode {
        match self.kind(id) {
            NodeKind::Material(m) => m,
            _ => panic!("{id:?} is not a material"),
        }
    }

    /// Returns the payload of a draw style node.
    ///
    /// # Panics
    ///
    /// Panics if the node is not a draw style.
    #[must_use]
    pub fn draw_style(&self, id: NodeId) -> DrawStyleNode {
        match self.kind(id) {
            NodeKind::DrawStyle(s) => s,
            _ => panic!("{id:?} is not a draw style"),
        }
    }

    /// Returns the payload of a shape hints node.
    ///
    /// # Panics
    ///
    /// Panics if the node is not a shape hints node.
    #[must_use]
    pub fn shape_hints(&self, id: NodeId) -> ShapeHintsNode {
        match self.kind(id) {
            NodeKind::ShapeHints(h) => h,
            _ => panic!("{id:?} is not a shape hints node"),
        }
    }

    /// Returns the highlights recorded on a selection root.
    #[must_use]
    pub fn selection(&self, id: NodeId) -> &[Highlight] {
        self.validate(id);
        &self.selection[id.idx as usize]
    }

    // -- Mutation API (auto-marks dirty) --

    /// Sets the diagnostic name of a node.
    pub fn set_name(&mut self, id: NodeId, name: &str) {
        self.validate(id);
        self.name[id.idx as usize] = Some(name.into());
    }

    /// Selects the child a switch traverses.
    ///
    /// # Panics
    ///
    /// Panics if the node is not a switch.
    pub fn set_which(&mut self, id: NodeId, which: Option<usize>) {
        assert!(
            matches!(self.kind(id), NodeKind::Switch { .. }),
            "{id:?} is not a switch"
        );
        self.kind[id.idx as usize] = NodeKind::Switch { which };
        self.dirty.mark_with(id.idx, dirty::SWITCH, &EagerPolicy);
    }

    /// Sets the parts of a transform node.
    ///
    /// # Panics
    ///
    /// Panics if the node is not a transform.
    pub fn set_transform(&mut self, id: NodeId, parts: TransformParts) {
        assert!(
            matches!(self.kind(id), NodeKind::Transform(_)),
            "{id:?} is not a transform"
        );
        self.kind[id.idx as usize] = NodeKind::Transform(parts);
        self.dirty.mark_with(id.idx, dirty::TRANSFORM, &EagerPolicy);
    }

    /// Sets the payload of a material node.
    ///
    /// # Panics
    ///
    /// Panics if the node is not a material.
    pub fn set_material(&mut self, id: NodeId, material: MaterialNode) {
        assert!(
            matches!(self.kind(id), NodeKind::Material(_)),
            "{id:?} is not a material"
        );
        self.kind[id.idx as usize] = NodeKind::Material(material);
        self.dirty.mark_with(id.idx, dirty::MATERIAL, &EagerPolicy);
    }

    /// Sets the payload of a draw style node.
    ///
    /// # Panics
    ///
    /// Panics if the node is not a draw style.
    pub fn set_draw_style(&mut self, id: NodeId, style: DrawStyleNode) {
        assert!(
            matches!(self.kind(id), NodeKind::DrawStyle(_)),
            "{id:?} is not a draw style"
        );
        self.kind[id.idx as usize] = NodeKind::DrawStyle(style);
        self.dirty.mark_with(id.idx, dirty::MATERIAL, &EagerPolicy);
    }

    /// Sets the payload of a shape hints node.
    ///
    /// # Panics
    ///
    /// Panics if the node is not a shape hints node.
    pub fn set_shape_hints(&mut self, id: NodeId, hints: ShapeHintsNode) {
        assert!(
            matches!(self.kind(id), NodeKind::ShapeHints(_)),
            "{id:?} is not a shape hints node"
        );
        self.kind[id.idx as usize] = NodeKind::ShapeHints(hints);
        self.dirty.mark_with(id.idx, dirty::MATERIAL, &EagerPolicy);
    }

    /// Records a secondary selection highlight along `path`.
    ///
    /// The highlight is stored on the path's head, which must be a selection
    /// root; the remaining nodes identify the highlighted sub-tree.
    ///
    /// # Panics
    ///
    /// Panics if the path is empty or its head is not a selection root.
    pub fn append_selection(&mut self, path: &ScenePath, detail: Option<ElementDetail>) {
        assert!(!path.is_empty(), "cannot select along an empty path");
        let head = path.nodes()[0];
        assert!(
            matches!(self.kind(head), NodeKind::SelectionRoot),
            "{head:?} is not a selection root"
        );
        self.selection[head.idx as usize].push(Highlight {
            path: path.nodes()[1..].to_vec(),
            detail,
        });
        self.dirty.mark_with(head.idx, dirty::SELECTION, &EagerPolicy);
    }

    /// Clears highlights recorded on `id`, and with `recursive` on every
    /// selection root below it.
    pub fn clear_selection(&mut self, id: NodeId, recursive: bool) {
        self.validate(id);
        let mut stack = alloc::vec![id.idx];
        let mut seen = Vec::new();
        while let Some(idx) = stack.pop() {
            if seen.contains(&idx) {
                continue;
            }
            seen.push(idx);
            if !self.selection[idx as usize].is_empty() {
                self.selection[idx as usize].clear();
                self.dirty.mark_with(idx, dirty::SELECTION, &EagerPolicy);
            }
            if recursive {
                stack.extend(self.children[idx as usize].iter().copied());
            }
        }
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: NodeId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    /// Returns the current handle for a live slot.
    pub(crate) fn handle_at(&self, idx: u32) -> NodeId {
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    fn check_new_edge(&self, parent: NodeId, child: NodeId) {
        self.validate(parent);
        self.validate(child);
        assert!(
            self.kind[parent.idx as usize].is_group(),
            "{parent:?} cannot have children"
        );
        assert!(
            !self.children[parent.idx as usize].contains(&child.idx),
            "{child:?} is already a child of {parent:?}"
        );
        assert!(
            !self.reaches(child.idx, parent.idx),
            "adding {child:?} under {parent:?} would create a cycle"
        );
    }

    /// Whether `to` is `from` or one of its descendants.
    fn reaches(&self, from: u32, to: u32) -> bool {
        let mut stack = alloc::vec![from];
        let mut seen = Vec::new();
        while let Some(idx) = stack.pop() {
            if idx == to {
                return true;
            }
            if seen.contains(&idx) {
                continue;
            }
            seen.push(idx);
            stack.extend(self.children[idx as usize].iter().copied());
        }
        false
    }

    /// Records the parent back-link and the dirty dependencies of a new edge.
    fn link_edge(&mut self, p: u32, c: u32) {
        self.parents[c as usize].push(p);
        for ch in dirty::ALL {
            let _ = self.dirty.add_dependency(p, c, ch);
        }
        self.dirty.mark_with(p, dirty::STRUCTURE, &EagerPolicy);
    }

    /// Drops the parent back-link and the dirty dependencies of an edge.
    fn unlink_edge(&mut self, p: u32, c: u32) {
        let parents = &mut self.parents[c as usize];
        if let Some(pos) = parents.iter().position(|&x| x == p) {
            parents.swap_remove(pos);
        }
        for ch in dirty::ALL {
            self.dirty.remove_dependency(p, c, ch);
        }
        self.dirty.mark_with(p, dirty::STRUCTURE, &EagerPolicy);
    }
}
