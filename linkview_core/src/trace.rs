// Copyright 2026 the Linkview Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the snapshot cache and link handles.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! cache and handle operations call as they run. All method bodies default to
//! no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] owns the sink of a [`LinkContext`](crate::LinkContext). When
//! the `trace` feature is **off**, every `Tracer` emit method compiles to
//! nothing. When **on**, each method dispatches straight to the sink.
//!
//! # Crate features
//!
//! - `trace` enables the `Tracer` method bodies.

use crate::cache::SnapshotKind;
use crate::handle::HandleId;
use crate::object::ObjectId;

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a holder acquires a cache entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryAcquiredEvent {
    /// The object the entry mirrors.
    pub object: ObjectId,
    /// Holder count after the acquisition.
    pub holders: usize,
    /// Whether the entry was created by this acquisition.
    pub created: bool,
}

/// Emitted when a holder releases a cache entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryReleasedEvent {
    /// The object the entry mirrors.
    pub object: ObjectId,
    /// Holder count after the release.
    pub holders: usize,
}

/// Emitted when an entry loses its last holder, before its nodes are freed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryDetachedEvent {
    /// The object the entry mirrored.
    pub object: ObjectId,
}

/// Emitted once an entry and everything it owned are gone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryDestroyedEvent {
    /// The object the entry mirrored.
    pub object: ObjectId,
}

/// Emitted after a snapshot flavor is (re)built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SnapshotBuiltEvent {
    /// The snapshotted object.
    pub object: ObjectId,
    /// The flavor built.
    pub kind: SnapshotKind,
    /// Number of nodes directly under the snapshot root.
    pub children: usize,
}

/// Emitted after a container entry regroups its children.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContainerUpdatedEvent {
    /// The container object.
    pub object: ObjectId,
    /// Number of children now in the child group.
    pub children: usize,
}

/// Emitted after a handle rebuilds its linked sub-tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinkUpdatedEvent {
    /// The handle.
    pub handle: HandleId,
    /// The linked object.
    pub object: ObjectId,
    /// Number of sub-object links, `0` in snapshot mode.
    pub subs: usize,
}

/// Emitted when a handle skips a rebuild because its owner is restoring.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RestoringSkippedEvent {
    /// The handle.
    pub handle: HandleId,
    /// The restoring owner.
    pub owner: ObjectId,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from link operations.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a holder acquires an entry.
    fn on_entry_acquired(&mut self, e: &EntryAcquiredEvent) {
        _ = e;
    }

    /// Called when a holder releases an entry.
    fn on_entry_released(&mut self, e: &EntryReleasedEvent) {
        _ = e;
    }

    /// Called when an entry loses its last holder.
    fn on_entry_detached(&mut self, e: &EntryDetachedEvent) {
        _ = e;
    }

    /// Called when an entry is gone.
    fn on_entry_destroyed(&mut self, e: &EntryDestroyedEvent) {
        _ = e;
    }

    /// Called after a snapshot flavor is built.
    fn on_snapshot_built(&mut self, e: &SnapshotBuiltEvent) {
        _ = e;
    }

    /// Called after a container entry regroups its children.
    fn on_container_updated(&mut self, e: &ContainerUpdatedEvent) {
        _ = e;
    }

    /// Called after a handle rebuilds its linked sub-tree.
    fn on_link_updated(&mut self, e: &LinkUpdatedEvent) {
        _ = e;
    }

    /// Called when a rebuild is skipped during restore.
    fn on_restoring_skipped(&mut self, e: &RestoringSkippedEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper owning a [`TraceSink`].
///
/// When the `trace` feature is **off**, every emit method compiles to
/// nothing and the sink never sees an event.
#[derive(Debug, Default)]
pub struct Tracer<T> {
    sink: T,
}

impl<T: TraceSink> Tracer<T> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: T) -> Self {
        Self { sink }
    }

    /// Returns the sink.
    #[inline]
    #[must_use]
    pub fn sink(&self) -> &T {
        &self.sink
    }

    /// Returns the sink mutably.
    #[inline]
    pub fn sink_mut(&mut self) -> &mut T {
        &mut self.sink
    }

    /// Emits an [`EntryAcquiredEvent`].
    #[inline]
    pub fn entry_acquired(&mut self, e: &EntryAcquiredEvent) {
        #[cfg(feature = "trace")]
        self.sink.on_entry_acquired(e);
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`EntryReleasedEvent`].
    #[inline]
    pub fn entry_released(&mut self, e: &EntryReleasedEvent) {
        #[cfg(feature = "trace")]
        self.sink.on_entry_released(e);
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`EntryDetachedEvent`].
    #[inline]
    pub fn entry_detached(&mut self, e: &EntryDetachedEvent) {
        #[cfg(feature = "trace")]
        self.sink.on_entry_detached(e);
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`EntryDestroyedEvent`].
    #[inline]
    pub fn entry_destroyed(&mut self, e: &EntryDestroyedEvent) {
        #[cfg(feature = "trace")]
        self.sink.on_entry_destroyed(e);
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SnapshotBuiltEvent`].
    #[inline]
    pub fn snapshot_built(&mut self, e: &SnapshotBuiltEvent) {
        #[cfg(feature = "trace")]
        self.sink.on_snapshot_built(e);
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ContainerUpdatedEvent`].
    #[inline]
    pub fn container_updated(&mut self, e: &ContainerUpdatedEvent) {
        #[cfg(feature = "trace")]
        self.sink.on_container_updated(e);
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`LinkUpdatedEvent`].
    #[inline]
    pub fn link_updated(&mut self, e: &LinkUpdatedEvent) {
        #[cfg(feature = "trace")]
        self.sink.on_link_updated(e);
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`RestoringSkippedEvent`].
    #[inline]
    pub fn restoring_skipped(&mut self, e: &RestoringSkippedEvent) {
        #[cfg(feature = "trace")]
        self.sink.on_restoring_skipped(e);
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
