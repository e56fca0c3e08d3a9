// Copyright 2026 the Linkview Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene paths, picks and element details.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use super::id::NodeId;
use super::store::NodeStore;

/// An ordered list of nodes from some root down to a target node.
///
/// Each node after the first must be a direct child of its predecessor. The
/// check runs in [`append`](Self::append) in debug builds only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScenePath {
    nodes: Vec<NodeId>,
}

impl ScenePath {
    /// Creates an empty path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a path from a node list, checking each link in debug builds.
    #[must_use]
    pub fn from_nodes(graph: &NodeStore, nodes: &[NodeId]) -> Self {
        let mut path = Self::new();
        for &n in nodes {
            path.append(graph, n);
        }
        path
    }

    /// Appends `node` to the path.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if `node` is not a child of the current tail.
    pub fn append(&mut self, graph: &NodeStore, node: NodeId) {
        if let Some(tail) = self.tail() {
            debug_assert!(
                graph.find_child(tail, node).is_some(),
                "scene path error: {node:?} is not a child of {tail:?}"
            );
        }
        #[cfg(not(debug_assertions))]
        let _ = graph;
        self.nodes.push(node);
    }

    /// Shortens the path to `len` nodes.
    pub fn truncate(&mut self, len: usize) {
        self.nodes.truncate(len);
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the path has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the position of the first occurrence of `node`.
    #[must_use]
    pub fn find(&self, node: NodeId) -> Option<usize> {
        self.nodes.iter().position(|&n| n == node)
    }

    /// Returns the node at `index`.
    #[must_use]
    pub fn node(&self, index: usize) -> Option<NodeId> {
        self.nodes.get(index).copied()
    }

    /// Returns the last node.
    #[must_use]
    pub fn tail(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    /// Returns all nodes, root first.
    #[must_use]
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }
}

/// The kind of a leaf sub-element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    /// A face.
    Face,
    /// An edge.
    Edge,
    /// A vertex.
    Vertex,
}

impl ElementKind {
    /// The name prefix used in symbolic element names.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Face => "Face",
            Self::Edge => "Edge",
            Self::Vertex => "Vertex",
        }
    }
}

/// A concrete sub-element of a shape, named like `Face3`.
///
/// Indices are one-based, as in the symbolic names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementDetail {
    /// Face, edge or vertex.
    pub kind: ElementKind,
    /// One-based index within the shape.
    pub index: u32,
}

impl ElementDetail {
    /// Creates a detail.
    #[must_use]
    pub const fn new(kind: ElementKind, index: u32) -> Self {
        Self { kind, index }
    }

    /// Parses a name like `Edge12`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        [ElementKind::Face, ElementKind::Edge, ElementKind::Vertex]
            .into_iter()
            .find_map(|kind| {
                let digits = name.strip_prefix(kind.prefix())?;
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                let index = digits.parse().ok().filter(|&i| i > 0)?;
                Some(Self { kind, index })
            })
    }

    /// Returns the symbolic name, like `Face3`.
    #[must_use]
    pub fn name(&self) -> String {
        format!("{self}")
    }
}

impl fmt::Display for ElementDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.index)
    }
}

/// A picked point: the path to the hit node plus the hit sub-element.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PickedPoint {
    /// Path from the viewer root to the picked shape.
    pub path: ScenePath,
    /// The picked sub-element, if the shape reports one.
    pub detail: Option<ElementDetail>,
}

/// The successful result of resolving a symbolic name to a scene path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Detail {
    /// The name addressed a whole object.
    Object,
    /// The name addressed a sub-element of the path's tail shape.
    Element(ElementDetail),
}

impl Detail {
    /// Returns the element detail, if any.
    #[must_use]
    pub const fn element(self) -> Option<ElementDetail> {
        match self {
            Self::Object => None,
            Self::Element(e) => Some(e),
        }
    }
}

/// A secondary selection highlight recorded on a selection root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Highlight {
    /// Nodes below the selection root leading to the highlighted sub-tree.
    pub path: Vec<NodeId>,
    /// The highlighted sub-element, or `None` for the whole sub-tree.
    pub detail: Option<ElementDetail>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::NodeKind;

    #[test]
    fn element_names_round_trip() {
        let d = ElementDetail::new(ElementKind::Edge, 12);
        assert_eq!(d.name(), "Edge12");
        assert_eq!(ElementDetail::parse("Edge12"), Some(d));
        assert_eq!(ElementDetail::parse("Vertex1").map(|d| d.kind), Some(ElementKind::Vertex));
    }

    #[test]
    fn element_parse_rejects_garbage() {
        assert_eq!(ElementDetail::parse("Face"), None);
        assert_eq!(ElementDetail::parse("Face0"), None);
        assert_eq!(ElementDetail::parse("Face1a"), None);
        assert_eq!(ElementDetail::parse("Wire1"), None);
    }

    #[test]
    fn path_find_and_truncate() {
        let mut g = NodeStore::new();
        let a = g.create_node(NodeKind::Separator);
        let b = g.create_node(NodeKind::Group);
        let c = g.create_node(NodeKind::Group);
        g.add_child(a, b);
        g.add_child(b, c);
        let mut path = ScenePath::from_nodes(&g, &[a, b, c]);
        assert_eq!(path.find(b), Some(1));
        assert_eq!(path.tail(), Some(c));
        path.truncate(1);
        assert_eq!(path.nodes(), &[a]);
        assert_eq!(path.node(1), None);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "scene path error")]
    fn append_checks_parentage() {
        let mut g = NodeStore::new();
        let a = g.create_node(NodeKind::Separator);
        let b = g.create_node(NodeKind::Group);
        let mut path = ScenePath::new();
        path.append(&g, a);
        path.append(&g, b);
    }
}
