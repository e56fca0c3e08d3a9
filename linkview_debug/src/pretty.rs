// Copyright 2026 the Linkview Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use linkview_core::cache::SnapshotKind;
use linkview_core::trace::{
    ContainerUpdatedEvent, EntryAcquiredEvent, EntryDestroyedEvent, EntryDetachedEvent,
    EntryReleasedEvent, LinkUpdatedEvent, RestoringSkippedEvent, SnapshotBuiltEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its writer.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

fn kind_name(kind: SnapshotKind) -> &'static str {
    match kind {
        SnapshotKind::Transform => "transform",
        SnapshotKind::Visible => "visible",
        SnapshotKind::Child => "child",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_entry_acquired(&mut self, e: &EntryAcquiredEvent) {
        let created = if e.created { " (new)" } else { "" };
        let _ = writeln!(
            self.writer,
            "[acquire] object={} holders={}{created}",
            e.object.0, e.holders,
        );
    }

    fn on_entry_released(&mut self, e: &EntryReleasedEvent) {
        let _ = writeln!(
            self.writer,
            "[release] object={} holders={}",
            e.object.0, e.holders,
        );
    }

    fn on_entry_detached(&mut self, e: &EntryDetachedEvent) {
        let _ = writeln!(self.writer, "[detach] object={}", e.object.0);
    }

    fn on_entry_destroyed(&mut self, e: &EntryDestroyedEvent) {
        let _ = writeln!(self.writer, "[destroy] object={}", e.object.0);
    }

    fn on_snapshot_built(&mut self, e: &SnapshotBuiltEvent) {
        let _ = writeln!(
            self.writer,
            "[snapshot] object={} kind={} children={}",
            e.object.0,
            kind_name(e.kind),
            e.children,
        );
    }

    fn on_container_updated(&mut self, e: &ContainerUpdatedEvent) {
        let _ = writeln!(
            self.writer,
            "[container] object={} children={}",
            e.object.0, e.children,
        );
    }

    fn on_link_updated(&mut self, e: &LinkUpdatedEvent) {
        let _ = writeln!(
            self.writer,
            "[link] handle={} object={} subs={}",
            e.handle.to_raw(),
            e.object.0,
            e.subs,
        );
    }

    fn on_restoring_skipped(&mut self, e: &RestoringSkippedEvent) {
        let _ = writeln!(
            self.writer,
            "[restoring] handle={} owner={} skipped",
            e.handle.to_raw(),
            e.owner.0,
        );
    }
}
