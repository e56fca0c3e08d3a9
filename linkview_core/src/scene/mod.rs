// Copyright 2026 the Linkview Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Retained-mode scene graph.
//!
//! A *node* is a vertex in a directed acyclic render graph. Each node has:
//!
//! - An identity ([`NodeId`]), a generational handle that becomes stale when
//!   the node is destroyed.
//! - Topology: an ordered child list plus back-links to every parent. A node
//!   can be shared by several parents, which is how one cached snapshot is
//!   displayed under many link roots.
//! - A [`NodeKind`] carrying its payload: grouping (separator, group,
//!   selection root, switch), state (transform, material, draw style, shape
//!   hints) or geometry (shape).
//!
//! # Dirty tracking
//!
//! Mutations mark the matching channel (see [`dirty`](crate::dirty)) with
//! eager propagation to all ancestors; [`NodeStore::evaluate`] drains them
//! into [`GraphChanges`].
//!
//! # Paths
//!
//! [`ScenePath`] is the bridge between picking and symbolic names. A
//! [`PickedPoint`] carries the path to a hit and the hit [`ElementDetail`].

mod evaluate;
mod id;
mod node;
mod path;
mod store;
mod traverse;

pub use evaluate::GraphChanges;
pub use id::NodeId;
pub use node::{
    Aabb, Color, DrawStyleNode, LineStyle, Material, MaterialNode, NodeKind, ShapeHintsNode,
};
pub use path::{Detail, ElementDetail, ElementKind, Highlight, PickedPoint, ScenePath};
pub use store::NodeStore;
pub use traverse::Children;
