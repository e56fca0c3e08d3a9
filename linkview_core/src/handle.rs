// Copyright 2026 the Linkview Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Link handles.
//!
//! A handle is the scene-side controller of one link. It owns a selection
//! root laid out as
//!
//! ```text
//! root
//! ├── transform      (after the first set_transform with no index)
//! ├── shape hints    (after the first render_double_side)
//! ├── draw style     (after the first set_draw_style)
//! ├── material       (shared by the root and every element)
//! └── linked root | element switches
//! ```
//!
//! The *linked root* is what the handle shows of its target: either a
//! snapshot owned by the cache, or a composite of named sub-object links
//! owned by the handle.
//!
//! In array mode each element is `switch → root [material, transform,
//! linked root]`. In array-of-objects mode (see [`set_children`]) each
//! element root holds `[material, snapshot]` of its own object instead.
//!
//! [`set_children`]: crate::LinkContext::set_children

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::cache::{EntryId, Holder, SnapshotKind, dispose_node};
use crate::context::LinkContext;
use crate::error::LinkError;
use crate::object::{Icon, LinkedObjectSource, ObjectId};
use crate::scene::{
    Aabb, DrawStyleNode, LineStyle, Material, MaterialNode, NodeId, NodeKind, NodeStore,
    ScenePath, ShapeHintsNode,
};
use crate::subname::split_element;
use crate::trace::{LinkUpdatedEvent, RestoringSkippedEvent, TraceSink};
use crate::transform::{Transform3d, TransformParts};

/// Identity of a link handle within its [`LinkContext`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(pub(crate) u32);

impl HandleId {
    /// Rebuilds a handle identity from [`to_raw`](Self::to_raw), for
    /// decoding recorded traces.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw identity.
    #[must_use]
    pub const fn to_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HandleId({})", self.0)
    }
}

/// How a handle composes its linked root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// Show one snapshot flavor of the target directly.
    Snapshot(SnapshotKind),
    /// Compose the named sub-objects, each placed by its transform relative
    /// to the target including the target's own placement.
    Container,
    /// Compose the named sub-objects, placed relative to the target without
    /// its own placement.
    ContainerTransform,
}

impl NodeType {
    /// Whether the linked root is a composite of sub-object links.
    #[must_use]
    pub const fn is_composite(self) -> bool {
        matches!(self, Self::Container | Self::ContainerTransform)
    }
}

impl TryFrom<i32> for NodeType {
    type Error = LinkError;

    fn try_from(raw: i32) -> Result<Self, LinkError> {
        match raw {
            -1 => Ok(Self::Container),
            -2 => Ok(Self::ContainerTransform),
            0..=2 => SnapshotKind::try_from(raw).map(Self::Snapshot),
            _ => Err(LinkError::InvalidNodeType(raw)),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Element {
    pub(crate) switch: NodeId,
    pub(crate) root: NodeId,
    pub(crate) material: NodeId,
    pub(crate) transform: NodeId,
    pub(crate) entry: Option<EntryId>,
}

impl Element {
    fn new(graph: &mut NodeStore, material: NodeId) -> Self {
        let transform = graph.create_node(NodeKind::Transform(TransformParts::IDENTITY));
        let root = graph.create_named(NodeKind::SelectionRoot, "element-root");
        graph.add_child(root, material);
        let switch = graph.create_named(NodeKind::Switch { which: Some(0) }, "element");
        graph.add_child(switch, root);
        Self {
            switch,
            root,
            material,
            transform,
            entry: None,
        }
    }
}

#[derive(Debug)]
pub(crate) struct SubLink {
    pub(crate) entry: Option<EntryId>,
    pub(crate) node: NodeId,
    pub(crate) transform: NodeId,
    pub(crate) elements: BTreeSet<String>,
}

impl SubLink {
    fn new(graph: &mut NodeStore) -> Self {
        let node = graph.create_named(NodeKind::SelectionRoot, "sub-link");
        let transform = graph.create_node(NodeKind::Transform(TransformParts::IDENTITY));
        graph.add_child(node, transform);
        Self {
            entry: None,
            node,
            transform,
            elements: BTreeSet::new(),
        }
    }
}

/// State of one link handle. Owned by the [`LinkContext`].
#[derive(Debug)]
pub struct LinkHandle {
    pub(crate) id: HandleId,
    pub(crate) root: NodeId,
    pub(crate) material: NodeId,
    pub(crate) transform: Option<NodeId>,
    pub(crate) shape_hints: Option<NodeId>,
    pub(crate) draw_style: Option<NodeId>,
    pub(crate) linked_root: Option<NodeId>,
    pub(crate) composite: Option<NodeId>,
    pub(crate) target: Option<EntryId>,
    pub(crate) owner: Option<EntryId>,
    pub(crate) elements: Vec<Element>,
    pub(crate) element_index: BTreeMap<NodeId, usize>,
    pub(crate) child_type: Option<SnapshotKind>,
    pub(crate) subs: BTreeMap<String, SubLink>,
    pub(crate) node_type: NodeType,
    pub(crate) auto_sub_link: bool,
    pub(crate) visible: bool,
}

impl<T: TraceSink> LinkContext<T> {
    // -- Lifecycle --

    /// Creates an unlinked handle showing nothing but its material.
    pub fn create_handle(&mut self) -> HandleId {
        let id = HandleId(self.next_handle);
        self.next_handle = self
            .next_handle
            .checked_add(1)
            .expect("handle ids exhausted");
        let root = self.graph.create_named(NodeKind::SelectionRoot, "link-root");
        let material = self
            .graph
            .create_node(NodeKind::Material(MaterialNode::default()));
        self.graph.add_child(root, material);
        self.handles.insert(
            id,
            LinkHandle {
                id,
                root,
                material,
                transform: None,
                shape_hints: None,
                draw_style: None,
                linked_root: None,
                composite: None,
                target: None,
                owner: None,
                elements: Vec::new(),
                element_index: BTreeMap::new(),
                child_type: None,
                subs: BTreeMap::new(),
                node_type: NodeType::Snapshot(SnapshotKind::Transform),
                auto_sub_link: true,
                visible: true,
            },
        );
        id
    }

    /// Releases everything a handle holds and destroys its nodes.
    pub fn destroy_handle<S: LinkedObjectSource + ?Sized>(
        &mut self,
        src: &mut S,
        h: HandleId,
    ) -> Result<(), LinkError> {
        let mut hd = self.handles.remove(&h).ok_or(LinkError::UnknownHandle(h))?;
        self.unlink_target(src, &mut hd);
        if let Some(owner) = hd.owner.take() {
            self.release(src, owner, &Holder::Owner(h));
        }
        self.clear_elements(src, &mut hd);
        self.clear_subs(src, &mut hd);
        if let Some(composite) = hd.composite.take() {
            dispose_node(&mut self.graph, composite);
        }
        dispose_node(&mut self.graph, hd.root);
        for node in [hd.transform, hd.shape_hints, hd.draw_style, Some(hd.material)]
            .into_iter()
            .flatten()
        {
            dispose_node(&mut self.graph, node);
        }
        Ok(())
    }

    /// Root node of the handle's sub-tree, for attaching to a view.
    pub fn link_root(&self, h: HandleId) -> Result<NodeId, LinkError> {
        self.handle(h).map(|hd| hd.root)
    }

    /// Sets the object whose view shows this handle.
    ///
    /// The owner's restore state suppresses rebuilds, and the owner is
    /// reported when the target changes.
    pub fn set_owner<S: LinkedObjectSource + ?Sized>(
        &mut self,
        src: &mut S,
        h: HandleId,
        owner: Option<ObjectId>,
    ) -> Result<(), LinkError> {
        self.with_handle(h, |ctx, hd| {
            if let Some(old) = hd.owner.take() {
                ctx.release(src, old, &Holder::Owner(h));
            }
            hd.owner = owner.and_then(|obj| ctx.acquire(src, obj, Holder::Owner(h), false));
        })
    }

    /// The handle's owner object.
    #[must_use]
    pub fn owner(&self, h: HandleId) -> Option<ObjectId> {
        let owner = self.handles.get(&h)?.owner?;
        self.cache.object(owner)
    }

    /// Whether the handle has a live target.
    #[must_use]
    pub fn is_linked(&self, h: HandleId) -> bool {
        self.handles
            .get(&h)
            .and_then(|hd| hd.target)
            .is_some_and(|e| self.cache.contains(e))
    }

    // -- Appearance --

    /// Overrides line style, width and point size below the handle.
    ///
    /// [`LineStyle::None`] turns the override off.
    pub fn set_draw_style(
        &mut self,
        h: HandleId,
        style: LineStyle,
        line_width: f32,
        point_size: f32,
    ) -> Result<(), LinkError> {
        let hd = self.handles.get_mut(&h).ok_or(LinkError::UnknownHandle(h))?;
        let node = match hd.draw_style {
            Some(node) => node,
            None if style == LineStyle::None => return Ok(()),
            None => {
                let node = self
                    .graph
                    .create_node(NodeKind::DrawStyle(DrawStyleNode::default()));
                self.graph.insert_child(hd.root, node, 0);
                hd.draw_style = Some(node);
                node
            }
        };
        let mut payload = self.graph.draw_style(node);
        if style == LineStyle::None {
            payload.is_override = false;
        } else {
            payload.is_override = true;
            payload.line_width = line_width;
            payload.point_size = point_size;
            payload.line_pattern = style.pattern();
        }
        self.graph.set_draw_style(node, payload);
        Ok(())
    }

    /// Forces two-sided lighting below the handle, for mirrored geometry.
    pub fn render_double_side(&mut self, h: HandleId, enable: bool) -> Result<(), LinkError> {
        let hd = self.handles.get_mut(&h).ok_or(LinkError::UnknownHandle(h))?;
        let node = match hd.shape_hints {
            Some(node) => node,
            None if !enable => return Ok(()),
            None => {
                let node = self.graph.create_node(NodeKind::ShapeHints(ShapeHintsNode {
                    is_override: false,
                    double_sided: true,
                }));
                self.graph.insert_child(hd.root, node, 0);
                hd.shape_hints = Some(node);
                node
            }
        };
        self.graph.set_shape_hints(
            node,
            ShapeHintsNode {
                is_override: enable,
                double_sided: true,
            },
        );
        Ok(())
    }

    /// Overrides the material of the whole handle (`index` `None`) or of
    /// one element.
    ///
    /// An element given its own material stops following the shared one;
    /// passing `None` as material puts it back on the shared material. For
    /// the whole handle `None` turns the override off.
    pub fn set_material(
        &mut self,
        h: HandleId,
        index: Option<usize>,
        material: Option<&Material>,
    ) -> Result<(), LinkError> {
        let hd = self.handles.get_mut(&h).ok_or(LinkError::UnknownHandle(h))?;
        let graph = &mut self.graph;
        let target = match index {
            None => match material {
                Some(_) => hd.material,
                None => {
                    let mut payload = graph.material(hd.material);
                    payload.is_override = false;
                    graph.set_material(hd.material, payload);
                    return Ok(());
                }
            },
            Some(i) => {
                let len = hd.elements.len();
                let el = hd
                    .elements
                    .get_mut(i)
                    .ok_or(LinkError::IndexOutOfRange { index: i, len })?;
                if el.material == hd.material {
                    if material.is_none() {
                        return Ok(());
                    }
                    let own = graph.create_node(NodeKind::Material(MaterialNode::default()));
                    graph.replace_child(el.root, hd.material, own);
                    el.material = own;
                    own
                } else if material.is_none() {
                    let own = el.material;
                    graph.replace_child(el.root, own, hd.material);
                    el.material = hd.material;
                    dispose_node(graph, own);
                    return Ok(());
                } else {
                    el.material
                }
            }
        };
        if let Some(values) = material {
            graph.set_material(
                target,
                MaterialNode {
                    is_override: true,
                    values: *values,
                },
            );
        }
        Ok(())
    }

    /// Shows or hides the handle as a whole.
    ///
    /// Hidden handles stop being live holders, so the document may stop
    /// updating linked objects that nothing else displays.
    pub fn set_handle_visible<S: LinkedObjectSource + ?Sized>(
        &mut self,
        src: &mut S,
        h: HandleId,
        visible: bool,
    ) -> Result<(), LinkError> {
        self.with_handle(h, |ctx, hd| {
            hd.visible = visible;
            if let Some(e) = hd.target {
                ctx.set_live(src, e, &Holder::Link(h), visible);
            }
            for (i, el) in hd.elements.iter().enumerate() {
                if let Some(e) = el.entry {
                    ctx.set_live(src, e, &Holder::Element(h, i), visible);
                }
            }
            for (key, sub) in &hd.subs {
                if let Some(e) = sub.entry {
                    ctx.set_live(src, e, &Holder::SubObject(h, key.clone()), visible);
                }
            }
        })
    }

    // -- Linking --

    /// Points the handle at `obj`, optionally restricted to named
    /// sub-objects and sub-elements.
    ///
    /// Each entry of `subs` is split into a sub-object path and an element
    /// (`"Body.Pad.Face1"` into `"Body.Pad."` and `"Face1"`); entries sharing
    /// a path become one sub-object link carrying all their elements. Empty
    /// entries are ignored. Relinking the current target keeps its entry.
    pub fn set_link<S: LinkedObjectSource + ?Sized, N: AsRef<str>>(
        &mut self,
        src: &mut S,
        h: HandleId,
        obj: Option<ObjectId>,
        subs: &[N],
    ) -> Result<(), LinkError> {
        self.with_handle(h, |ctx, hd| {
            let current = hd.target.and_then(|e| ctx.cache.object(e));
            if current.is_none() || current != obj {
                ctx.unlink_target(src, hd);
                let Some(obj) = obj else {
                    return;
                };
                let Some(e) = ctx.acquire(src, obj, Holder::Link(h), hd.visible) else {
                    return;
                };
                hd.target = Some(e);
            }
            ctx.clear_subs(src, hd);
            for sub in subs {
                let sub = sub.as_ref();
                if sub.is_empty() {
                    continue;
                }
                let (path, element) = split_element(sub);
                let graph = &mut ctx.graph;
                let link = hd
                    .subs
                    .entry(path.into())
                    .or_insert_with(|| SubLink::new(graph));
                if !element.is_empty() {
                    link.elements.insert(element.into());
                }
            }
            ctx.update_link_inner(src, hd);
        })
    }

    /// Switches between showing a snapshot flavor and composing named
    /// sub-objects, and sets whether a single sub-object link is
    /// transparent to picking and icons.
    ///
    /// Leaving snapshot mode clears selection highlights in the outgoing
    /// tree.
    pub fn set_node_type<S: LinkedObjectSource + ?Sized>(
        &mut self,
        src: &mut S,
        h: HandleId,
        node_type: NodeType,
        auto_sub_link: bool,
    ) -> Result<(), LinkError> {
        self.with_handle(h, |ctx, hd| {
            hd.auto_sub_link = auto_sub_link;
            if hd.node_type == node_type {
                return;
            }
            let was_composite = hd.node_type.is_composite();
            if !was_composite && node_type.is_composite() {
                if let Some(lr) = hd.linked_root {
                    ctx.graph.clear_selection(lr, true);
                }
                let composite = ctx
                    .graph
                    .create_named(NodeKind::SelectionRoot, "link-composite");
                hd.composite = Some(composite);
                ctx.replace_linked_root(hd, Some(composite));
            } else if was_composite && !node_type.is_composite() {
                let snap = match (hd.target, node_type) {
                    (Some(e), NodeType::Snapshot(kind)) => ctx.snapshot(src, e, kind, false),
                    _ => None,
                };
                ctx.replace_linked_root(hd, snap);
                if let Some(composite) = hd.composite.take() {
                    dispose_node(&mut ctx.graph, composite);
                }
            }
            hd.node_type = node_type;
            ctx.update_link_inner(src, hd);
        })
    }

    /// Rebuilds the handle's linked root from its target.
    ///
    /// Does nothing when unlinked or while the owner is being restored.
    pub fn update_link<S: LinkedObjectSource + ?Sized>(
        &mut self,
        src: &mut S,
        h: HandleId,
    ) -> Result<(), LinkError> {
        self.with_handle(h, |ctx, hd| ctx.update_link_inner(src, hd))
    }

    /// Drops the handle's target and every sub-object link, leaving the
    /// handle root consistent.
    pub fn unlink<S: LinkedObjectSource + ?Sized>(
        &mut self,
        src: &mut S,
        h: HandleId,
    ) -> Result<(), LinkError> {
        self.with_handle(h, |ctx, hd| ctx.unlink_target(src, hd))
    }

    // -- Arrays --

    /// Resizes the element array to `n` copies of the linked root.
    ///
    /// Surviving elements keep their transform, material and visibility.
    /// Switching from array-of-objects mode discards all elements first.
    /// `n == 0` shows the linked root directly again.
    pub fn set_size<S: LinkedObjectSource + ?Sized>(
        &mut self,
        src: &mut S,
        h: HandleId,
        n: usize,
    ) -> Result<(), LinkError> {
        self.with_handle(h, |ctx, hd| {
            if hd.child_type.is_none() && n == hd.elements.len() {
                return;
            }
            ctx.reset_root(hd);
            if n == 0 || hd.child_type.is_some() {
                ctx.clear_elements(src, hd);
                hd.child_type = None;
                if n == 0 {
                    if let Some(lr) = hd.linked_root.filter(|&n| ctx.graph.is_alive(n)) {
                        ctx.graph.add_child(hd.root, lr);
                    }
                    return;
                }
            }
            if n < hd.elements.len() {
                let tail = hd.elements.split_off(n);
                ctx.dispose_elements(src, hd, n, tail);
            }
            for el in &hd.elements {
                ctx.graph.add_child(hd.root, el.switch);
            }
            while hd.elements.len() < n {
                let el = Element::new(&mut ctx.graph, hd.material);
                ctx.graph.add_child(el.root, el.transform);
                if let Some(lr) = hd.linked_root {
                    ctx.graph.add_child(el.root, lr);
                }
                ctx.graph.add_child(hd.root, el.switch);
                hd.element_index.insert(el.switch, hd.elements.len());
                hd.elements.push(el);
            }
        })
    }

    /// Number of elements; `0` outside array modes or for unknown handles.
    #[must_use]
    pub fn size(&self, h: HandleId) -> usize {
        self.handles.get(&h).map_or(0, |hd| hd.elements.len())
    }

    /// Shows one object per element, each in its own snapshot of `kind`.
    ///
    /// Element `i` is visible unless `visibility[i]` is `false`. Elements
    /// already showing the same object are kept. An empty list leaves
    /// array-of-objects mode.
    pub fn set_children<S: LinkedObjectSource + ?Sized>(
        &mut self,
        src: &mut S,
        h: HandleId,
        objects: &[ObjectId],
        visibility: &[bool],
        kind: SnapshotKind,
    ) -> Result<(), LinkError> {
        self.with_handle(h, |ctx, hd| {
            if objects.is_empty() {
                if !hd.elements.is_empty() {
                    ctx.clear_elements(src, hd);
                    hd.child_type = None;
                    ctx.reset_root(hd);
                    if let Some(lr) = hd.linked_root {
                        ctx.graph.add_child(hd.root, lr);
                    }
                }
                return;
            }
            ctx.reset_root(hd);
            if hd.child_type != Some(kind) {
                ctx.clear_elements(src, hd);
            }
            hd.child_type = Some(kind);
            if hd.elements.len() > objects.len() {
                let tail = hd.elements.split_off(objects.len());
                ctx.dispose_elements(src, hd, objects.len(), tail);
            }
            for (i, &obj) in objects.iter().enumerate() {
                if hd.elements.len() <= i {
                    let el = Element::new(&mut ctx.graph, hd.material);
                    hd.elements.push(el);
                }
                let visible = visibility.get(i).copied().unwrap_or(true);
                ctx.graph
                    .set_which(hd.elements[i].switch, visible.then_some(0));
                ctx.link_element(src, hd, i, obj);
            }
            hd.element_index.clear();
            for (i, el) in hd.elements.iter().enumerate() {
                ctx.graph.add_child(hd.root, el.switch);
                hd.element_index.insert(el.switch, i);
            }
        })
    }

    /// The objects shown by array-of-objects elements, in order.
    #[must_use]
    pub fn children_objects(&self, h: HandleId) -> Vec<ObjectId> {
        self.handles
            .get(&h)
            .map(|hd| {
                hd.elements
                    .iter()
                    .filter_map(|el| el.entry.and_then(|e| self.cache.object(e)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Places the whole handle (`index` `None`) or one element.
    ///
    /// The matrix is decomposed into translation, rotation and per-axis
    /// scale (see [`TransformParts::decompose`]).
    pub fn set_transform(
        &mut self,
        h: HandleId,
        index: Option<usize>,
        matrix: &Transform3d,
    ) -> Result<(), LinkError> {
        let hd = self.handles.get_mut(&h).ok_or(LinkError::UnknownHandle(h))?;
        let parts = TransformParts::decompose(matrix);
        let node = match index {
            None => match hd.transform {
                Some(node) => node,
                None => {
                    let node = self
                        .graph
                        .create_node(NodeKind::Transform(TransformParts::IDENTITY));
                    self.graph.insert_child(hd.root, node, 0);
                    hd.transform = Some(node);
                    node
                }
            },
            Some(i) => {
                hd.elements
                    .get(i)
                    .ok_or(LinkError::IndexOutOfRange {
                        index: i,
                        len: hd.elements.len(),
                    })?
                    .transform
            }
        };
        self.graph.set_transform(node, parts);
        Ok(())
    }

    /// Shows or hides one element. Out-of-range indices are ignored.
    pub fn set_element_visible(&mut self, h: HandleId, index: usize, visible: bool) {
        if let Some(el) = self.handles.get(&h).and_then(|hd| hd.elements.get(index)) {
            let switch = el.switch;
            self.graph.set_which(switch, visible.then_some(0));
        }
    }

    /// Whether one element is shown; `false` for out-of-range indices.
    #[must_use]
    pub fn is_element_visible(&self, h: HandleId, index: usize) -> bool {
        self.handles
            .get(&h)
            .and_then(|hd| hd.elements.get(index))
            .is_some_and(|el| self.graph.which(el.switch).is_some())
    }

    // -- Queries --

    /// The object the handle shows.
    ///
    /// With a single transparent sub-object link this is the sub-object.
    /// With `recursive`, links whose target is itself the owner of another
    /// handle are followed to the end of the chain.
    pub fn linked_object(&self, h: HandleId, recursive: bool) -> Result<Option<ObjectId>, LinkError> {
        let hd = self.handle(h)?;
        let Some(mut obj) = self.shown_object(hd) else {
            return Ok(None);
        };
        if !recursive {
            return Ok(Some(obj));
        }
        let max = self.config.max_link_depth;
        let mut depth = 0;
        loop {
            let next = self
                .handles
                .values()
                .find(|other| other.owner.and_then(|e| self.cache.object(e)) == Some(obj))
                .and_then(|other| self.shown_object(other));
            let Some(next) = next else {
                return Ok(Some(obj));
            };
            depth += 1;
            if depth > max {
                return Err(LinkError::LinkDepthExceeded(max));
            }
            obj = next;
        }
    }

    /// The sub-names the handle was linked with, regrouped: one per
    /// sub-object without elements, else one per element.
    #[must_use]
    pub fn sub_names(&self, h: HandleId) -> Vec<String> {
        let Some(hd) = self.handles.get(&h) else {
            return Vec::new();
        };
        let mut names = Vec::new();
        for (key, sub) in &hd.subs {
            if sub.elements.is_empty() {
                names.push(key.clone());
            } else {
                names.extend(sub.elements.iter().map(|e| alloc::format!("{key}{e}")));
            }
        }
        names
    }

    /// Whether the handle is linked with named sub-objects.
    #[must_use]
    pub fn has_subs(&self, h: HandleId) -> bool {
        self.is_linked(h) && self.handles.get(&h).is_some_and(|hd| !hd.subs.is_empty())
    }

    /// Icon of the shown object, composited with `overlay` when given.
    pub fn linked_icon<S: LinkedObjectSource + ?Sized>(
        &mut self,
        src: &S,
        h: HandleId,
        overlay: Option<&str>,
    ) -> Option<Icon> {
        let hd = self.handles.get(&h)?;
        let entry = if hd.auto_sub_link && hd.subs.len() == 1 {
            hd.subs.values().next()?.entry
        } else {
            hd.target
        }?;
        self.entry_icon(src, entry, overlay)
    }

    /// Bounds of everything the handle currently shows.
    #[must_use]
    pub fn bounding_box(&self, h: HandleId) -> Option<Aabb> {
        let hd = self.handles.get(&h)?;
        self.graph.bounding_box(hd.root)
    }

    // -- Internals --

    pub(crate) fn handle(&self, h: HandleId) -> Result<&LinkHandle, LinkError> {
        self.handles.get(&h).ok_or(LinkError::UnknownHandle(h))
    }

    /// Runs `f` with the handle taken out of the registry.
    fn with_handle<R>(
        &mut self,
        h: HandleId,
        f: impl FnOnce(&mut Self, &mut LinkHandle) -> R,
    ) -> Result<R, LinkError> {
        let mut hd = self.handles.remove(&h).ok_or(LinkError::UnknownHandle(h))?;
        let result = f(self, &mut hd);
        self.handles.insert(h, hd);
        Ok(result)
    }

    fn shown_object(&self, hd: &LinkHandle) -> Option<ObjectId> {
        let entry = if hd.auto_sub_link && hd.subs.len() == 1 {
            hd.subs.values().next()?.entry
        } else {
            hd.target
        }?;
        self.cache.object(entry)
    }

    fn reset_root(&mut self, hd: &LinkHandle) {
        self.graph.remove_all_children(hd.root);
        for node in [hd.transform, hd.shape_hints, hd.draw_style, Some(hd.material)]
            .into_iter()
            .flatten()
        {
            self.graph.add_child(hd.root, node);
        }
    }

    fn replace_linked_root(&mut self, hd: &mut LinkHandle, new: Option<NodeId>) {
        let old = hd.linked_root.filter(|&n| self.graph.is_alive(n));
        if new == old {
            hd.linked_root = new;
            return;
        }
        let graph = &mut self.graph;
        if hd.elements.is_empty() {
            match (old, new) {
                (Some(old), Some(new)) if graph.find_child(hd.root, old).is_some() => {
                    graph.replace_child(hd.root, old, new);
                }
                (_, Some(new)) => graph.add_child(hd.root, new),
                (_, None) => self.reset_root(hd),
            }
        } else if hd.child_type.is_none() {
            for el in &hd.elements {
                match (old, new) {
                    (Some(old), Some(new)) if graph.find_child(el.root, old).is_some() => {
                        graph.replace_child(el.root, old, new);
                    }
                    (_, Some(new)) => graph.add_child(el.root, new),
                    (Some(old), None) => {
                        graph.remove_child(el.root, old);
                    }
                    (None, None) => {}
                }
            }
        }
        hd.linked_root = new;
    }

    pub(crate) fn update_link_inner<S: LinkedObjectSource + ?Sized>(
        &mut self,
        src: &mut S,
        hd: &mut LinkHandle,
    ) {
        let Some(target) = hd.target else {
            return;
        };
        let Some(obj) = self.cache.object(target) else {
            return;
        };
        if !src.is_attached(obj) {
            return;
        }
        if let Some(owner) = hd.owner.and_then(|e| self.cache.object(e))
            && src.is_attached(owner)
            && src.is_restoring(owner)
        {
            self.tracer.restoring_skipped(&RestoringSkippedEvent {
                handle: hd.id,
                owner,
            });
            return;
        }

        self.graph.clear_selection(hd.root, false);

        if let NodeType::Snapshot(kind) = hd.node_type {
            let snap = self.snapshot(src, target, kind, false);
            self.replace_linked_root(hd, snap);
            self.tracer.link_updated(&LinkUpdatedEvent {
                handle: hd.id,
                object: obj,
                subs: 0,
            });
            return;
        }

        let composite = match hd.composite {
            Some(c) => {
                self.graph.clear_selection(c, false);
                self.graph.remove_all_children(c);
                c
            }
            None => {
                let c = self
                    .graph
                    .create_named(NodeKind::SelectionRoot, "link-composite");
                hd.composite = Some(c);
                c
            }
        };

        let with_placement = hd.node_type == NodeType::Container;
        let keys: Vec<String> = hd.subs.keys().cloned().collect();
        for key in keys {
            let Some((sobj, matrix)) = src.sub_object(obj, &key, with_placement) else {
                self.unlink_sub(src, hd, &key);
                continue;
            };
            self.link_sub(src, hd, &key, sobj);
            let Some(sub) = hd.subs.get(&key) else {
                continue;
            };
            self.graph.add_child(composite, sub.node);
            self.graph
                .set_transform(sub.transform, TransformParts::decompose(&matrix));

            let Some(entry) = sub.entry else {
                continue;
            };
            for element in &sub.elements {
                let mut path = ScenePath::from_nodes(&self.graph, &[composite, sub.node]);
                if let Some(detail) = self.entry_detail(
                    src,
                    entry,
                    false,
                    SnapshotKind::Transform,
                    element,
                    Some(&mut path),
                ) {
                    self.graph.append_selection(&path, detail.element());
                }
            }
        }
        self.replace_linked_root(hd, Some(composite));
        self.tracer.link_updated(&LinkUpdatedEvent {
            handle: hd.id,
            object: obj,
            subs: hd.subs.len(),
        });
    }

    fn unlink_target<S: LinkedObjectSource + ?Sized>(&mut self, src: &mut S, hd: &mut LinkHandle) {
        let Some(target) = hd.target.take() else {
            return;
        };
        self.graph.clear_selection(hd.root, false);
        if let Some(lr) = hd.linked_root.take() {
            if hd.elements.is_empty() {
                self.reset_root(hd);
            } else {
                for el in &hd.elements {
                    if el.entry.is_none()
                        && self.graph.is_alive(lr)
                        && self.graph.find_child(el.root, lr).is_some()
                    {
                        self.graph.remove_child(el.root, lr);
                    }
                }
            }
        }
        self.clear_subs(src, hd);
        if let Some(composite) = hd.composite.take() {
            dispose_node(&mut self.graph, composite);
        }
        self.release(src, target, &Holder::Link(hd.id));
    }

    pub(crate) fn forget_owner<S: LinkedObjectSource + ?Sized>(&mut self, src: &mut S, h: HandleId) {
        if let Some(owner) = self.handles.get_mut(&h).and_then(|hd| hd.owner.take()) {
            self.release(src, owner, &Holder::Owner(h));
        }
    }

    fn clear_subs<S: LinkedObjectSource + ?Sized>(&mut self, src: &mut S, hd: &mut LinkHandle) {
        let subs = core::mem::take(&mut hd.subs);
        for (key, sub) in subs {
            self.graph.remove_all_children(sub.node);
            if let Some(e) = sub.entry {
                self.release(src, e, &Holder::SubObject(hd.id, key));
            }
            dispose_node(&mut self.graph, sub.transform);
            dispose_node(&mut self.graph, sub.node);
        }
    }

    fn link_sub<S: LinkedObjectSource + ?Sized>(
        &mut self,
        src: &mut S,
        hd: &mut LinkHandle,
        key: &str,
        obj: ObjectId,
    ) {
        let Some(current) = hd.subs.get(key).map(|s| s.entry) else {
            return;
        };
        if current.and_then(|e| self.cache.object(e)) == Some(obj) {
            return;
        }
        self.unlink_sub(src, hd, key);
        let Some(e) = self.acquire(src, obj, Holder::SubObject(hd.id, key.into()), hd.visible)
        else {
            return;
        };
        let snap = self.snapshot(src, e, SnapshotKind::Transform, false);
        if let Some(sub) = hd.subs.get_mut(key) {
            sub.entry = Some(e);
            if let Some(snap) = snap {
                self.graph.add_child(sub.node, snap);
            }
        }
    }

    fn unlink_sub<S: LinkedObjectSource + ?Sized>(
        &mut self,
        src: &mut S,
        hd: &mut LinkHandle,
        key: &str,
    ) {
        let Some(sub) = hd.subs.get_mut(key) else {
            return;
        };
        self.graph.remove_all_children(sub.node);
        self.graph.add_child(sub.node, sub.transform);
        if let Some(e) = sub.entry.take() {
            self.release(src, e, &Holder::SubObject(hd.id, key.into()));
        }
    }

    pub(crate) fn unlink_sub_at<S: LinkedObjectSource + ?Sized>(
        &mut self,
        src: &mut S,
        h: HandleId,
        key: &str,
    ) {
        _ = self.with_handle(h, |ctx, hd| {
            ctx.unlink_sub(src, hd, key);
            if let Some(node) = hd.subs.get(key).map(|s| s.node)
                && let Some(composite) = hd.composite
                && ctx.graph.find_child(composite, node).is_some()
            {
                ctx.graph.remove_child(composite, node);
            }
        });
    }

    fn link_element<S: LinkedObjectSource + ?Sized>(
        &mut self,
        src: &mut S,
        hd: &mut LinkHandle,
        index: usize,
        obj: ObjectId,
    ) {
        let current = hd.elements[index].entry;
        if current.and_then(|e| self.cache.object(e)) == Some(obj) {
            return;
        }
        self.unlink_element(src, hd, index);
        let Some(e) = self.acquire(src, obj, Holder::Element(hd.id, index), hd.visible) else {
            return;
        };
        hd.elements[index].entry = Some(e);
        if let Some(kind) = hd.child_type
            && let Some(snap) = self.snapshot(src, e, kind, false)
        {
            self.graph.add_child(hd.elements[index].root, snap);
        }
    }

    fn unlink_element<S: LinkedObjectSource + ?Sized>(
        &mut self,
        src: &mut S,
        hd: &mut LinkHandle,
        index: usize,
    ) {
        let el = &mut hd.elements[index];
        self.graph.remove_all_children(el.root);
        self.graph.add_child(el.root, el.material);
        if let Some(e) = el.entry.take() {
            self.release(src, e, &Holder::Element(hd.id, index));
        }
    }

    pub(crate) fn unlink_element_at<S: LinkedObjectSource + ?Sized>(
        &mut self,
        src: &mut S,
        h: HandleId,
        index: usize,
    ) {
        _ = self.with_handle(h, |ctx, hd| {
            if index < hd.elements.len() {
                ctx.unlink_element(src, hd, index);
            }
        });
    }

    fn clear_elements<S: LinkedObjectSource + ?Sized>(&mut self, src: &mut S, hd: &mut LinkHandle) {
        let elements = core::mem::take(&mut hd.elements);
        self.dispose_elements(src, hd, 0, elements);
        hd.element_index.clear();
    }

    /// Disposes elements that were at indices `first..`.
    fn dispose_elements<S: LinkedObjectSource + ?Sized>(
        &mut self,
        src: &mut S,
        hd: &mut LinkHandle,
        first: usize,
        elements: Vec<Element>,
    ) {
        for (i, el) in elements.into_iter().enumerate() {
            hd.element_index.remove(&el.switch);
            self.graph.remove_all_children(el.root);
            if let Some(e) = el.entry {
                self.release(src, e, &Holder::Element(hd.id, first + i));
            }
            dispose_node(&mut self.graph, el.transform);
            if el.material != hd.material {
                dispose_node(&mut self.graph, el.material);
            }
            dispose_node(&mut self.graph, el.switch);
            dispose_node(&mut self.graph, el.root);
        }
    }
}
