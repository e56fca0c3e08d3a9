// Copyright 2026 the Linkview Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Translation between picks and symbolic sub-names for link handles.
//!
//! [`element_picked`] turns a raw [`PickedPoint`] below a handle root into a
//! dotted name such as `"2.Face4"` (array slot 2) or `"Body.Pad.Edge1"`
//! (named sub-object link). [`detail_path`] goes the other way, appending
//! the scene nodes a name addresses to a [`ScenePath`]. For any pick that
//! resolves, feeding the name back into `detail_path` yields a path through
//! the same shape.
//!
//! [`element_picked`]: crate::LinkContext::element_picked
//! [`detail_path`]: crate::LinkContext::detail_path

use alloc::string::String;

use crate::cache::SnapshotKind;
use crate::context::LinkContext;
use crate::handle::{HandleId, LinkHandle, NodeType};
use crate::object::LinkedObjectSource;
use crate::scene::{Detail, PickedPoint, ScenePath};
use crate::subname::array_index;
use crate::trace::TraceSink;

impl<T: TraceSink> LinkContext<T> {
    /// Names the sub-element of the handle's content hit by `pick`.
    ///
    /// Returns `None` when the pick is outside the handle, lands on a hidden
    /// array slot, or on an element the link does not show.
    pub fn element_picked<S: LinkedObjectSource + ?Sized>(
        &self,
        src: &S,
        h: HandleId,
        pick: &PickedPoint,
    ) -> Option<String> {
        let hd = self.handles.get(&h)?;
        let mut out = String::new();

        if !hd.elements.is_empty() {
            let idx = pick.path.find(hd.root)?;
            if idx + 2 >= pick.path.len() {
                return None;
            }
            let slot = *hd.element_index.get(&pick.path.node(idx + 1)?)?;
            if !self.is_element_visible(h, slot) {
                return None;
            }
            out.push_str(&alloc::format!("{slot}."));
            if let Some(entry) = hd.elements[slot].entry {
                let kind = hd.child_type.unwrap_or(SnapshotKind::Visible);
                return self
                    .entry_element_picked(src, entry, false, kind, pick, &mut out)
                    .then_some(out);
            }
        }

        let target = hd.target.filter(|&e| self.cache.contains(e))?;
        if let NodeType::Snapshot(kind) = hd.node_type {
            return self
                .entry_element_picked(src, target, false, kind, pick, &mut out)
                .then_some(out);
        }
        self.sub_link_picked(src, hd, pick, out)
    }

    fn sub_link_picked<S: LinkedObjectSource + ?Sized>(
        &self,
        src: &S,
        hd: &LinkHandle,
        pick: &PickedPoint,
        mut out: String,
    ) -> Option<String> {
        let idx = pick.path.find(hd.linked_root?)?;
        let node = pick.path.node(idx + 1)?;
        let (key, sub) = hd.subs.iter().find(|(_, sub)| sub.node == node)?;

        let mut element = String::new();
        if !self.entry_element_picked(
            src,
            sub.entry?,
            false,
            SnapshotKind::Transform,
            pick,
            &mut element,
        ) {
            return None;
        }
        if !sub.elements.is_empty() && !sub.elements.contains(&element) {
            let (_, nested) = element.split_once('.')?;
            if !sub.elements.contains(nested) {
                return None;
            }
        }
        if !hd.auto_sub_link || hd.subs.len() > 1 {
            out.push_str(key);
        }
        out.push_str(&element);
        Some(out)
    }

    /// Resolves a sub-name below the handle, appending the nodes it
    /// addresses to `path` starting with the handle root.
    ///
    /// An empty name addresses the handle itself and leaves `path` alone.
    /// On failure `path` is restored to its original length.
    pub fn detail_path<S: LinkedObjectSource + ?Sized>(
        &self,
        src: &S,
        h: HandleId,
        sub: &str,
        path: &mut ScenePath,
    ) -> Option<Detail> {
        if sub.is_empty() {
            return Some(Detail::Object);
        }
        let hd = self.handles.get(&h)?;
        let len = path.len();
        let found = self.handle_detail(src, hd, sub, path);
        if found.is_none() {
            path.truncate(len);
        }
        found
    }

    fn handle_detail<S: LinkedObjectSource + ?Sized>(
        &self,
        src: &S,
        hd: &LinkHandle,
        mut sub: &str,
        path: &mut ScenePath,
    ) -> Option<Detail> {
        path.append(&self.graph, hd.root);
        if !hd.elements.is_empty() {
            let (slot, rest) = array_index(sub)?;
            let el = hd.elements.get(slot)?;
            path.append(&self.graph, el.switch);
            path.append(&self.graph, el.root);
            if rest.is_empty() {
                return Some(Detail::Object);
            }
            if let Some(entry) = el.entry {
                let kind = hd.child_type.unwrap_or(SnapshotKind::Visible);
                return Some(
                    self.entry_detail(src, entry, false, kind, rest, Some(path))
                        .unwrap_or(Detail::Object),
                );
            }
            sub = rest;
        }

        let target = hd.target.filter(|&e| self.cache.contains(e))?;
        if let NodeType::Snapshot(kind) = hd.node_type {
            return self.entry_detail(src, target, false, kind, sub, Some(path));
        }

        path.append(&self.graph, hd.linked_root?);
        for (key, link) in &hd.subs {
            let Some(entry) = link.entry else {
                continue;
            };
            let next = if hd.auto_sub_link && hd.subs.len() == 1 {
                sub
            } else {
                let Some(next) = sub.strip_prefix(key.as_str()) else {
                    continue;
                };
                next
            };
            if !next.is_empty() && !link.elements.is_empty() && !link.elements.contains(next) {
                return None;
            }
            path.append(&self.graph, link.node);
            return self.entry_detail(src, entry, false, SnapshotKind::Transform, next, Some(path));
        }
        None
    }
}
