// Copyright 2026 the Linkview Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change collection for renderers.
//!
//! [`NodeStore::evaluate`] drains every dirty channel and reports the raw
//! slot indices of the nodes a renderer must revisit. Because every channel
//! propagates to ancestors, a change inside a snapshot shared by several
//! link roots lists all of those roots.

use alloc::vec::Vec;

use super::id::NodeId;
use super::store::NodeStore;
use crate::dirty;

/// The set of changes produced by a single [`NodeStore::evaluate`] call.
#[derive(Clone, Debug, Default)]
pub struct GraphChanges {
    /// Nodes whose children (or a descendant's children) changed.
    pub structure: Vec<u32>,
    /// Nodes below which a switch selection changed.
    pub switches: Vec<u32>,
    /// Nodes below which a transform changed.
    pub transforms: Vec<u32>,
    /// Nodes below which a material, draw style or shape hint changed.
    pub materials: Vec<u32>,
    /// Nodes whose recorded selection highlights changed.
    pub selections: Vec<u32>,
    /// Nodes created since the last evaluate.
    pub added: Vec<u32>,
    /// Nodes destroyed since the last evaluate.
    pub removed: Vec<u32>,
}

impl GraphChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.structure.clear();
        self.switches.clear();
        self.transforms.clear();
        self.materials.clear();
        self.selections.clear();
        self.added.clear();
        self.removed.clear();
    }

    /// Whether nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.structure.is_empty()
            && self.switches.is_empty()
            && self.transforms.is_empty()
            && self.materials.is_empty()
            && self.selections.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
    }

    /// Whether any channel lists `id`.
    #[must_use]
    pub fn touches(&self, id: NodeId) -> bool {
        let idx = id.index();
        [
            &self.structure,
            &self.switches,
            &self.transforms,
            &self.materials,
            &self.selections,
        ]
        .iter()
        .any(|list| list.contains(&idx))
    }
}

impl NodeStore {
    /// Drains all dirty channels and returns the set of changes.
    pub fn evaluate(&mut self) -> GraphChanges {
        let mut changes = GraphChanges::default();
        self.evaluate_into(&mut changes);
        changes
    }

    /// Like [`evaluate`](Self::evaluate), but reuses a caller-provided buffer
    /// to avoid allocation.
    pub fn evaluate_into(&mut self, changes: &mut GraphChanges) {
        changes.clear();

        changes.structure = self.drain_live(dirty::STRUCTURE);
        changes.switches = self.drain_live(dirty::SWITCH);
        changes.transforms = self.drain_live(dirty::TRANSFORM);
        changes.materials = self.drain_live(dirty::MATERIAL);
        changes.selections = self.drain_live(dirty::SELECTION);

        core::mem::swap(&mut self.pending_added, &mut changes.added);
        core::mem::swap(&mut self.pending_removed, &mut changes.removed);
    }

    fn drain_live(&mut self, channel: understory_dirty::Channel) -> Vec<u32> {
        let drained: Vec<u32> = self
            .dirty
            .drain(channel)
            .affected()
            .deterministic()
            .run()
            .collect();
        drained
            .into_iter()
            .filter(|idx| !self.free_list.contains(idx))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{MaterialNode, NodeKind};
    use crate::transform::TransformParts;

    #[test]
    fn creation_is_reported_once() {
        let mut g = NodeStore::new();
        let id = g.create_node(NodeKind::Group);
        let changes = g.evaluate();
        assert!(changes.added.contains(&id.index()));
        assert!(g.evaluate().is_empty());
    }

    #[test]
    fn transform_change_reaches_every_parent_of_a_shared_child() {
        let mut g = NodeStore::new();
        let root_a = g.create_node(NodeKind::SelectionRoot);
        let root_b = g.create_node(NodeKind::SelectionRoot);
        let shared = g.create_node(NodeKind::Separator);
        let t = g.create_node(NodeKind::Transform(TransformParts::IDENTITY));
        g.add_child(shared, t);
        g.add_child(root_a, shared);
        g.add_child(root_b, shared);
        let _ = g.evaluate();

        g.set_transform(
            t,
            TransformParts {
                scale: [2.0; 3],
                ..TransformParts::IDENTITY
            },
        );
        let changes = g.evaluate();
        for id in [t, shared, root_a, root_b] {
            assert!(changes.transforms.contains(&id.index()), "{id:?} not reported");
        }
        assert!(changes.structure.is_empty());
    }

    #[test]
    fn detached_root_stops_receiving_changes() {
        let mut g = NodeStore::new();
        let root = g.create_node(NodeKind::Separator);
        let mat = g.create_node(NodeKind::Material(MaterialNode::default()));
        g.add_child(root, mat);
        g.remove_child(root, mat);
        let changes = g.evaluate();
        assert!(changes.touches(root));

        g.set_material(mat, MaterialNode::default());
        let changes = g.evaluate();
        assert!(changes.materials.contains(&mat.index()));
        assert!(!changes.touches(root));
    }

    #[test]
    fn destroyed_nodes_are_reported_removed() {
        let mut g = NodeStore::new();
        let parent = g.create_node(NodeKind::Group);
        let child = g.create_node(NodeKind::Group);
        g.add_child(parent, child);
        let _ = g.evaluate();
        g.destroy_node(child);
        let changes = g.evaluate();
        assert_eq!(changes.removed, [child.index()]);
        assert!(changes.structure.contains(&parent.index()));
        assert!(!changes.structure.contains(&child.index()));
    }
}
