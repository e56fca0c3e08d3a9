// Copyright 2026 the Linkview Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Graph traversal utilities.

use crate::transform::Transform3d;

use super::id::NodeId;
use super::node::{Aabb, NodeKind};
use super::store::NodeStore;

/// An iterator over the direct children of a node.
///
/// Created by [`NodeStore::children`].
#[derive(Debug)]
pub struct Children<'a> {
    store: &'a NodeStore,
    slots: core::slice::Iter<'a, u32>,
}

impl<'a> Children<'a> {
    pub(crate) fn new(store: &'a NodeStore, slots: &'a [u32]) -> Self {
        Self {
            store,
            slots: slots.iter(),
        }
    }
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        self.slots.next().map(|&idx| self.store.handle_at(idx))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.slots.size_hint()
    }
}

impl ExactSizeIterator for Children<'_> {}

impl NodeStore {
    /// Computes the bounds of everything rendered below `root`.
    ///
    /// Transform nodes apply to their later siblings; separators and
    /// selection roots scope them. Switches contribute only their selected
    /// child. Returns `None` when nothing with geometry is reachable.
    #[must_use]
    pub fn bounding_box(&self, root: NodeId) -> Option<Aabb> {
        self.validate(root);
        let mut current = Transform3d::IDENTITY;
        self.accumulate_bounds(root.idx, &mut current)
    }

    fn accumulate_bounds(&self, idx: u32, current: &mut Transform3d) -> Option<Aabb> {
        let kind = self.kind[idx as usize];
        match kind {
            NodeKind::Shape { bounds } => Some(bounds.transformed(current)),
            NodeKind::Transform(parts) => {
                *current = *current * parts.to_matrix();
                None
            }
            NodeKind::Switch { which } => {
                let child = which.and_then(|i| self.children[idx as usize].get(i).copied())?;
                self.accumulate_bounds(child, current)
            }
            NodeKind::Separator | NodeKind::SelectionRoot | NodeKind::Group => {
                let saved = *current;
                let mut out: Option<Aabb> = None;
                for &child in &self.children[idx as usize] {
                    if let Some(b) = self.accumulate_bounds(child, current) {
                        out = Some(out.map_or(b, |acc| acc.union(b)));
                    }
                }
                if kind.scopes_state() {
                    *current = saved;
                }
                out
            }
            NodeKind::Material(_) | NodeKind::DrawStyle(_) | NodeKind::ShapeHints(_) => None,
        }
    }
}
