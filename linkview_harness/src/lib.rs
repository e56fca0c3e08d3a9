// Copyright 2026 the Linkview Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An in-memory CAD document for exercising linkview snapshots.
//!
//! [`MemoryDocument`] implements [`LinkedObjectSource`] over four kinds of
//! object. All but plain objects build their render graph in the caller's
//! [`NodeStore`] (normally
//! [`LinkContext::graph_mut`](linkview_core::LinkContext::graph_mut)):
//!
//! ```text
//! part        root [transform, modes [Shaded [shape], Wireframe [shape]]]
//! container   root [transform, modes [Group [child roots...]]]
//! empty       root [transform, modes []]
//! plain       no render graph (links, groups)
//! ```
//!
//! Parts are boxes with six faces, twelve edges and eight vertices. The
//! document records every [`force_update`](LinkedObjectSource::force_update)
//! call so tests can check the live-holder bookkeeping.
//!
//! [`find_paths`] and [`pick`] build [`PickedPoint`]s the way a viewer ray
//! pick would, following only the active child of each switch.

use std::collections::BTreeMap;

use linkview_core::object::{Icon, LinkedObjectSource, ObjectId};
use linkview_core::scene::{
    Aabb, Detail, ElementDetail, ElementKind, NodeId, NodeKind, NodeStore, PickedPoint, ScenePath,
};
use linkview_core::transform::{Transform3d, TransformParts};

/// An empty sub-name list, for linking whole objects.
pub const NO_SUBS: &[&str] = &[];

/// Icon of a part.
pub const PART_ICON: &str = "Part";
/// Icon of a container.
pub const CONTAINER_ICON: &str = "Group";
/// Icon of a plain object.
pub const PLAIN_ICON: &str = "Feature";

#[derive(Debug)]
enum Content {
    Plain,
    Part {
        shape: NodeId,
        modes: Vec<NodeId>,
    },
    Container {
        child_root: NodeId,
        children: Vec<ObjectId>,
    },
    Empty,
}

#[derive(Debug)]
struct Graph {
    root: NodeId,
    transform: NodeId,
    mode_switch: NodeId,
}

#[derive(Debug)]
struct DocObject {
    name: String,
    graph: Option<Graph>,
    content: Content,
    placement: Transform3d,
    default_mode: usize,
    selectable: bool,
    restoring: bool,
    icon: String,
}

/// A CAD document held in memory.
#[derive(Debug)]
pub struct MemoryDocument {
    name: String,
    objects: BTreeMap<ObjectId, DocObject>,
    next_id: u32,
    force_updates: Vec<(ObjectId, bool)>,
}

impl MemoryDocument {
    /// Creates an empty document.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            objects: BTreeMap::new(),
            next_id: 1,
            force_updates: Vec::new(),
        }
    }

    /// Adds a box-shaped part spanning `bounds`.
    pub fn add_part(&mut self, graph: &mut NodeStore, name: &str, bounds: Aabb) -> ObjectId {
        let g = Self::build_graph(graph, name);
        let shape = graph.create_named(NodeKind::Shape { bounds }, name);
        let mut modes = Vec::new();
        for mode in ["Shaded", "Wireframe"] {
            let node = graph.create_named(NodeKind::Group, mode);
            graph.add_child(node, shape);
            graph.add_child(g.mode_switch, node);
            modes.push(node);
        }
        self.insert(name, Some(g), Content::Part { shape, modes }, PART_ICON)
    }

    /// Adds an object with a render graph but no display modes, like a
    /// feature before its first recompute.
    pub fn add_empty(&mut self, graph: &mut NodeStore, name: &str) -> ObjectId {
        let g = Self::build_graph(graph, name);
        self.insert(name, Some(g), Content::Empty, PLAIN_ICON)
    }

    /// Adds a container. Fill it with [`add_to_container`](Self::add_to_container).
    pub fn add_container(&mut self, graph: &mut NodeStore, name: &str) -> ObjectId {
        let g = Self::build_graph(graph, name);
        let child_root = graph.create_named(NodeKind::Group, "Group");
        graph.add_child(g.mode_switch, child_root);
        let content = Content::Container {
            child_root,
            children: Vec::new(),
        };
        self.insert(name, Some(g), content, CONTAINER_ICON)
    }

    /// Adds an object without a render graph, such as a link.
    pub fn add_object(&mut self, name: &str) -> ObjectId {
        self.insert(name, None, Content::Plain, PLAIN_ICON)
    }

    /// Appends `child` to a container's children.
    ///
    /// The caller reports the change with
    /// [`LinkContext::object_changed`](linkview_core::LinkContext::object_changed).
    pub fn add_to_container(&mut self, graph: &mut NodeStore, container: ObjectId, child: ObjectId) {
        let Some(child_graph) = self.objects.get(&child).and_then(|o| o.graph.as_ref()) else {
            return;
        };
        let child_node = child_graph.root;
        if let Some(DocObject {
            content: Content::Container {
                child_root,
                children,
            },
            ..
        }) = self.objects.get_mut(&container)
        {
            children.push(child);
            graph.add_child(*child_root, child_node);
        }
    }

    /// Removes `child` from a container's children. Returns whether it was
    /// there.
    pub fn remove_from_container(
        &mut self,
        graph: &mut NodeStore,
        container: ObjectId,
        child: ObjectId,
    ) -> bool {
        let child_node = self
            .objects
            .get(&child)
            .and_then(|o| o.graph.as_ref())
            .map(|g| g.root);
        let Some(DocObject {
            content: Content::Container {
                child_root,
                children,
            },
            ..
        }) = self.objects.get_mut(&container)
        else {
            return false;
        };
        let Some(pos) = children.iter().position(|&c| c == child) else {
            return false;
        };
        children.remove(pos);
        if let Some(node) = child_node {
            graph.remove_child(*child_root, node);
        }
        true
    }

    /// Deletes an object and its render graph.
    ///
    /// Call [`LinkContext::object_deleted`](linkview_core::LinkContext::object_deleted)
    /// first so no snapshot still references the object's nodes.
    pub fn remove_object(&mut self, graph: &mut NodeStore, obj: ObjectId) {
        let containers: Vec<ObjectId> = self.objects.keys().copied().collect();
        for container in containers {
            self.remove_from_container(graph, container, obj);
        }
        let Some(object) = self.objects.remove(&obj) else {
            return;
        };
        let mut nodes = Vec::new();
        if let Some(g) = object.graph {
            nodes.extend([g.root, g.mode_switch]);
            match object.content {
                Content::Part { shape, modes } => {
                    nodes.extend(modes);
                    nodes.push(shape);
                }
                Content::Container { child_root, .. } => nodes.push(child_root),
                Content::Plain | Content::Empty => {}
            }
            nodes.push(g.transform);
        }
        for node in nodes {
            if graph.is_alive(node) {
                graph.remove_all_children(node);
                graph.destroy_node(node);
            }
        }
    }

    /// Moves an object.
    pub fn set_placement(&mut self, graph: &mut NodeStore, obj: ObjectId, placement: Transform3d) {
        if let Some(object) = self.objects.get_mut(&obj) {
            object.placement = placement;
            if let Some(g) = &object.graph {
                graph.set_transform(g.transform, TransformParts::decompose(&placement));
            }
        }
    }

    /// Shows or hides an object in its own view.
    ///
    /// The caller reports the change with
    /// [`LinkContext::visibility_changed`](linkview_core::LinkContext::visibility_changed).
    pub fn set_visible(&mut self, graph: &mut NodeStore, obj: ObjectId, visible: bool) {
        if let Some(object) = self.objects.get(&obj)
            && let Some(g) = &object.graph
        {
            let mode = if object.default_mode < graph.child_count(g.mode_switch) {
                object.default_mode
            } else {
                0
            };
            graph.set_which(g.mode_switch, visible.then_some(mode));
        }
    }

    /// Selects the display mode shown by default.
    pub fn set_default_mode(&mut self, graph: &mut NodeStore, obj: ObjectId, mode: usize) {
        if let Some(object) = self.objects.get_mut(&obj) {
            object.default_mode = mode;
            if let Some(g) = &object.graph
                && graph.which(g.mode_switch).is_some()
                && mode < graph.child_count(g.mode_switch)
            {
                graph.set_which(g.mode_switch, Some(mode));
            }
        }
    }

    /// Marks an object as being restored from a file, or done restoring.
    pub fn set_restoring(&mut self, obj: ObjectId, restoring: bool) {
        if let Some(object) = self.objects.get_mut(&obj) {
            object.restoring = restoring;
        }
    }

    /// Allows or forbids picking an object.
    pub fn set_selectable(&mut self, obj: ObjectId, selectable: bool) {
        if let Some(object) = self.objects.get_mut(&obj) {
            object.selectable = selectable;
        }
    }

    /// Replaces an object's icon.
    ///
    /// The caller reports the change with
    /// [`LinkContext::icon_changed`](linkview_core::LinkContext::icon_changed).
    pub fn set_icon(&mut self, obj: ObjectId, icon: &str) {
        if let Some(object) = self.objects.get_mut(&obj) {
            object.icon = icon.into();
        }
    }

    /// The geometry node of a part.
    #[must_use]
    pub fn shape(&self, obj: ObjectId) -> Option<NodeId> {
        match self.objects.get(&obj)?.content {
            Content::Part { shape, .. } => Some(shape),
            _ => None,
        }
    }

    /// Every [`force_update`](LinkedObjectSource::force_update) call so far.
    #[must_use]
    pub fn force_updates(&self) -> &[(ObjectId, bool)] {
        &self.force_updates
    }

    /// Whether the last force-update request for `obj` enabled it.
    #[must_use]
    pub fn is_force_updated(&self, obj: ObjectId) -> bool {
        self.force_updates
            .iter()
            .rev()
            .find(|(o, _)| *o == obj)
            .is_some_and(|&(_, on)| on)
    }

    fn build_graph(graph: &mut NodeStore, name: &str) -> Graph {
        let root = graph.create_named(NodeKind::Separator, name);
        let transform = graph.create_node(NodeKind::Transform(TransformParts::IDENTITY));
        let mode_switch = graph.create_named(NodeKind::Switch { which: Some(0) }, "modes");
        graph.add_child(root, transform);
        graph.add_child(root, mode_switch);
        Graph {
            root,
            transform,
            mode_switch,
        }
    }

    fn insert(&mut self, name: &str, graph: Option<Graph>, content: Content, icon: &str) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects.insert(
            id,
            DocObject {
                name: name.into(),
                graph,
                content,
                placement: Transform3d::IDENTITY,
                default_mode: 0,
                selectable: true,
                restoring: false,
                icon: icon.into(),
            },
        );
        id
    }

    fn child_named(&self, obj: ObjectId, name: &str) -> Option<ObjectId> {
        match &self.objects.get(&obj)?.content {
            Content::Container { children, .. } => children
                .iter()
                .copied()
                .find(|c| self.objects.get(c).is_some_and(|o| o.name == name)),
            _ => None,
        }
    }

    /// The display mode the snapshot mirrors show for a part.
    fn shown_mode(object: &DocObject) -> Option<NodeId> {
        let Content::Part { modes, .. } = &object.content else {
            return None;
        };
        modes
            .get(object.default_mode)
            .or_else(|| modes.first())
            .copied()
    }
}

/// Number of faces, edges and vertices of every part.
const BOX_ELEMENTS: [(ElementKind, u32); 3] = [
    (ElementKind::Face, 6),
    (ElementKind::Edge, 12),
    (ElementKind::Vertex, 8),
];

fn element_exists(detail: ElementDetail) -> bool {
    BOX_ELEMENTS
        .iter()
        .any(|&(kind, count)| kind == detail.kind && detail.index <= count)
}

impl LinkedObjectSource for MemoryDocument {
    fn is_attached(&self, obj: ObjectId) -> bool {
        self.objects.contains_key(&obj)
    }

    fn name(&self, obj: ObjectId) -> Option<&str> {
        self.objects.get(&obj).map(|o| o.name.as_str())
    }

    fn document_name(&self, obj: ObjectId) -> Option<&str> {
        self.objects.contains_key(&obj).then_some(self.name.as_str())
    }

    fn render_root(&self, obj: ObjectId) -> Option<NodeId> {
        Some(self.objects.get(&obj)?.graph.as_ref()?.root)
    }

    fn transform_node(&self, obj: ObjectId) -> Option<NodeId> {
        Some(self.objects.get(&obj)?.graph.as_ref()?.transform)
    }

    fn mode_switch(&self, obj: ObjectId) -> Option<NodeId> {
        Some(self.objects.get(&obj)?.graph.as_ref()?.mode_switch)
    }

    fn child_root(&self, obj: ObjectId) -> Option<NodeId> {
        match self.objects.get(&obj)?.content {
            Content::Container { child_root, .. } => Some(child_root),
            _ => None,
        }
    }

    fn default_mode(&self, obj: ObjectId) -> usize {
        self.objects.get(&obj).map_or(0, |o| o.default_mode)
    }

    fn claim_children(&self, obj: ObjectId) -> Vec<ObjectId> {
        match self.objects.get(&obj).map(|o| &o.content) {
            Some(Content::Container { children, .. }) => children.clone(),
            _ => Vec::new(),
        }
    }

    fn sub_object(
        &self,
        obj: ObjectId,
        path: &str,
        transform: bool,
    ) -> Option<(ObjectId, Transform3d)> {
        let object = self.objects.get(&obj)?;
        let mut matrix = if transform {
            object.placement
        } else {
            Transform3d::IDENTITY
        };
        let mut current = obj;
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            current = self.child_named(current, segment)?;
            matrix = matrix * self.objects.get(&current)?.placement;
        }
        Some((current, matrix))
    }

    fn is_selectable(&self, obj: ObjectId) -> bool {
        self.objects.get(&obj).is_some_and(|o| o.selectable)
    }

    fn is_restoring(&self, obj: ObjectId) -> bool {
        self.objects.get(&obj).is_some_and(|o| o.restoring)
    }

    fn element_picked(
        &self,
        obj: ObjectId,
        _graph: &NodeStore,
        pick: &PickedPoint,
    ) -> Option<String> {
        let shape = self.shape(obj)?;
        if pick.path.tail() != Some(shape) {
            return None;
        }
        Some(pick.detail.map(|d| d.name()).unwrap_or_default())
    }

    fn detail_path(
        &self,
        obj: ObjectId,
        graph: &NodeStore,
        sub: &str,
        path: Option<&mut ScenePath>,
    ) -> Option<Detail> {
        let object = self.objects.get(&obj)?;
        let shape = self.shape(obj)?;
        let detail = ElementDetail::parse(sub).filter(|&d| element_exists(d))?;
        if let Some(path) = path {
            path.append(graph, Self::shown_mode(object)?);
            path.append(graph, shape);
        }
        Some(Detail::Element(detail))
    }

    fn icon(&self, obj: ObjectId) -> Option<Icon> {
        self.objects.get(&obj).map(|o| Icon::named(&o.icon))
    }

    fn force_update(&mut self, obj: ObjectId, enable: bool) {
        self.force_updates.push((obj, enable));
    }
}

/// Every path from `root` down to `target` that a viewer would draw,
/// following only the active child of each switch. Paths are listed in
/// traversal order.
#[must_use]
pub fn find_paths(graph: &NodeStore, root: NodeId, target: NodeId) -> Vec<ScenePath> {
    let mut out = Vec::new();
    let mut stack = Vec::new();
    collect_paths(graph, root, target, &mut stack, &mut out);
    out
}

fn collect_paths(
    graph: &NodeStore,
    node: NodeId,
    target: NodeId,
    stack: &mut Vec<NodeId>,
    out: &mut Vec<ScenePath>,
) {
    if stack.contains(&node) {
        return;
    }
    stack.push(node);
    if node == target {
        out.push(ScenePath::from_nodes(graph, stack));
    } else {
        let children: Vec<NodeId> = match graph.kind(node) {
            NodeKind::Switch { .. } => graph.active_child(node).into_iter().collect(),
            _ => graph.children(node).collect(),
        };
        for child in children {
            collect_paths(graph, child, target, stack, out);
        }
    }
    stack.pop();
}

/// A pick at the first drawn path from `root` to `target`.
#[must_use]
pub fn pick(
    graph: &NodeStore,
    root: NodeId,
    target: NodeId,
    detail: Option<ElementDetail>,
) -> Option<PickedPoint> {
    let path = find_paths(graph, root, target).into_iter().next()?;
    Some(PickedPoint { path, detail })
}

/// A unit box with its minimum corner at `origin`.
#[must_use]
pub fn unit_box(origin: [f64; 3]) -> Aabb {
    let [x, y, z] = origin;
    Aabb::new(origin, [x + 1.0, y + 1.0, z + 1.0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_object_walks_container_children() {
        let mut graph = NodeStore::new();
        let mut doc = MemoryDocument::new("Doc");
        let asm = doc.add_container(&mut graph, "Assembly");
        let body = doc.add_container(&mut graph, "Body");
        let pad = doc.add_part(&mut graph, "Pad", unit_box([0.0; 3]));
        doc.add_to_container(&mut graph, asm, body);
        doc.add_to_container(&mut graph, body, pad);
        doc.set_placement(&mut graph, asm, Transform3d::from_translation(10.0, 0.0, 0.0));
        doc.set_placement(&mut graph, pad, Transform3d::from_translation(1.0, 0.0, 0.0));

        let (found, m) = doc.sub_object(asm, "Body.Pad.", false).unwrap();
        assert_eq!(found, pad);
        assert_eq!(m.translation(), [1.0, 0.0, 0.0]);
        let (_, m) = doc.sub_object(asm, "Body.Pad.", true).unwrap();
        assert_eq!(m.translation(), [11.0, 0.0, 0.0]);
        assert_eq!(doc.sub_object(asm, "", false).map(|(o, _)| o), Some(asm));
        assert!(doc.sub_object(asm, "Pad.", false).is_none());
    }

    #[test]
    fn detail_path_rejects_missing_elements() {
        let mut graph = NodeStore::new();
        let mut doc = MemoryDocument::new("Doc");
        let part = doc.add_part(&mut graph, "Box", unit_box([0.0; 3]));
        assert!(doc.detail_path(part, &graph, "Face6", None).is_some());
        assert!(doc.detail_path(part, &graph, "Face7", None).is_none());
        assert!(doc.detail_path(part, &graph, "Wire1", None).is_none());
    }

    #[test]
    fn paths_follow_active_switch_children() {
        let mut graph = NodeStore::new();
        let mut doc = MemoryDocument::new("Doc");
        let part = doc.add_part(&mut graph, "Box", unit_box([0.0; 3]));
        let root = doc.render_root(part).unwrap();
        let shape = doc.shape(part).unwrap();
        assert_eq!(find_paths(&graph, root, shape).len(), 1);

        doc.set_visible(&mut graph, part, false);
        assert!(find_paths(&graph, root, shape).is_empty());
    }

    #[test]
    fn remove_object_frees_its_graph() {
        let mut graph = NodeStore::new();
        let mut doc = MemoryDocument::new("Doc");
        let body = doc.add_container(&mut graph, "Body");
        let pad = doc.add_part(&mut graph, "Pad", unit_box([0.0; 3]));
        doc.add_to_container(&mut graph, body, pad);
        let before = graph.node_count();

        doc.remove_object(&mut graph, pad);
        assert!(!doc.is_attached(pad));
        assert!(doc.claim_children(body).is_empty());
        assert_eq!(graph.node_count(), before - 6);
    }
}
