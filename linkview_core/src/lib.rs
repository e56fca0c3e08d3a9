// Copyright 2026 the Linkview Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared, reference-counted scene-graph snapshots for linked CAD objects.
//!
//! `linkview_core` keeps the scene-graph mirror of a *link* (a view that
//! displays another object's geometry, possibly many times) synchronized
//! with the linked object and with the link's own properties. It is `no_std`
//! compatible (with `alloc`).
//!
//! # Architecture
//!
//! ```text
//!   document property change
//!       │
//!       ▼
//!   LinkViewProvider::update_data() ──► LinkContext (handle ops)
//!                                           │
//!                 ┌─────────────────────────┘
//!                 ▼
//!   SnapshotCache entry ──► snapshot()/update() ──► NodeStore edits
//!                                                      │
//!                 ┌────────────────────────────────────┘
//!                 ▼
//!   NodeStore::evaluate() ──► GraphChanges (renderer)
//! ```
//!
//! **[`scene`]**: Struct-of-arrays retained-mode graph with generational
//! node handles. Unlike a strict tree, one node may have several parents so
//! that a single cached snapshot can be attached under many link roots.
//!
//! **[`dirty`]**: Multi-channel dirty tracking via `understory_dirty`.
//! Every channel propagates from a node to all of its ancestors.
//!
//! **[`cache`]**: The snapshot cache: one reference-counted entry per linked
//! object, holding up to three snapshot flavors and, for containers, a
//! recursively snapshotted child group.
//!
//! **[`handle`]**: Per-link controllers: single target, element arrays and
//! named sub-object links.
//!
//! **[`pick`]**: Translation between picked scene paths and symbolic
//! sub-object names, in both directions.
//!
//! **[`sync`]**: Rules mapping link property changes onto handle
//! operations.
//!
//! **[`object`]**: The [`LinkedObjectSource`](object::LinkedObjectSource)
//! trait through which the document model is consulted.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! cache and handle instrumentation.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod cache;
pub mod config;
pub mod context;
pub mod dirty;
pub mod error;
pub mod handle;
pub mod object;
pub mod pick;
pub mod scene;
pub mod subname;
pub mod sync;
pub mod trace;
pub mod transform;

pub use config::LinkConfig;
pub use context::LinkContext;
pub use error::LinkError;
