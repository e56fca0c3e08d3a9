// Copyright 2026 the Linkview Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The document model as seen by the link engine.
//!
//! Links never own document objects. They consult them through
//! [`LinkedObjectSource`], keyed by [`ObjectId`]. The source also owns each
//! object's live render graph, built in the shared
//! [`NodeStore`](crate::scene::NodeStore) so snapshots can reference its
//! nodes directly.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::scene::{Detail, NodeId, NodeStore, PickedPoint, ScenePath};
use crate::transform::Transform3d;

/// Identity of a document object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

/// A tree-view icon, possibly composited with an overlay.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Icon {
    /// Name of the base pixmap.
    pub name: String,
    /// Overlay pixmap merged into the bottom-left corner, if any.
    pub overlay: Option<String>,
    /// Edge length in pixels, `0` when not rasterized.
    pub size: u32,
}

impl Icon {
    /// A plain named icon without overlay.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.into(),
            overlay: None,
            size: 0,
        }
    }
}

/// Access to the document objects and their render graphs.
///
/// Implementations answer for objects they no longer know about by
/// returning `None`, `false` or an empty list.
pub trait LinkedObjectSource {
    /// Whether the object exists and has a name in its document.
    fn is_attached(&self, obj: ObjectId) -> bool;

    /// The object's name within its document.
    fn name(&self, obj: ObjectId) -> Option<&str>;

    /// The name of the document holding the object.
    fn document_name(&self, obj: ObjectId) -> Option<&str>;

    /// Root of the object's own render graph.
    fn render_root(&self, obj: ObjectId) -> Option<NodeId>;

    /// The object's placement transform node, a direct child of its root.
    fn transform_node(&self, obj: ObjectId) -> Option<NodeId>;

    /// The object's display-mode switch, a direct child of its root.
    fn mode_switch(&self, obj: ObjectId) -> Option<NodeId>;

    /// For containers, the display-mode child that holds the children's
    /// graphs.
    fn child_root(&self, obj: ObjectId) -> Option<NodeId>;

    /// Index of the display mode shown by default.
    fn default_mode(&self, obj: ObjectId) -> usize;

    /// Children a container displays, in order.
    fn claim_children(&self, obj: ObjectId) -> Vec<ObjectId>;

    /// Resolves a dotted sub-object path (`"Body.Pad."`) below `obj`.
    ///
    /// Returns the resolved object and the placements accumulated along the
    /// path. `obj`'s own placement is included only when `transform` is set.
    /// An empty path resolves to `obj` itself.
    fn sub_object(&self, obj: ObjectId, path: &str, transform: bool)
    -> Option<(ObjectId, Transform3d)>;

    /// Whether picks on the object may be turned into selections.
    fn is_selectable(&self, obj: ObjectId) -> bool;

    /// Whether the object is being restored from a file.
    fn is_restoring(&self, obj: ObjectId) -> bool;

    /// Names the sub-element of `obj` hit by `pick`.
    fn element_picked(&self, obj: ObjectId, graph: &NodeStore, pick: &PickedPoint)
    -> Option<String>;

    /// Resolves `sub` below `obj`, appending the nodes below the object's
    /// display-mode switch to `path` when given.
    fn detail_path(
        &self,
        obj: ObjectId,
        graph: &NodeStore,
        sub: &str,
        path: Option<&mut ScenePath>,
    ) -> Option<Detail>;

    /// The object's own icon.
    fn icon(&self, obj: ObjectId) -> Option<Icon>;

    /// Asks the document to keep the object's render graph up to date even
    /// while it is hidden.
    fn force_update(&mut self, obj: ObjectId, enable: bool);
}
