// Copyright 2026 the Linkview Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as tagged little-endian records. [`decode`] reads them back as
//! an iterator of [`RecordedEvent`]. Counts are stored as `u32`, saturating.

use linkview_core::cache::SnapshotKind;
use linkview_core::handle::HandleId;
use linkview_core::object::ObjectId;
use linkview_core::trace::{
    ContainerUpdatedEvent, EntryAcquiredEvent, EntryDestroyedEvent, EntryDetachedEvent,
    EntryReleasedEvent, LinkUpdatedEvent, RestoringSkippedEvent, SnapshotBuiltEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_ENTRY_ACQUIRED: u8 = 1;
const TAG_ENTRY_RELEASED: u8 = 2;
const TAG_ENTRY_DETACHED: u8 = 3;
const TAG_ENTRY_DESTROYED: u8 = 4;
const TAG_SNAPSHOT_BUILT: u8 = 5;
const TAG_CONTAINER_UPDATED: u8 = 6;
const TAG_LINK_UPDATED: u8 = 7;
const TAG_RESTORING_SKIPPED: u8 = 8;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_count(&mut self, n: usize) {
        self.write_u32(u32::try_from(n).unwrap_or(u32::MAX));
    }

    fn write_object(&mut self, obj: ObjectId) {
        self.write_u32(obj.0);
    }

    fn write_handle(&mut self, h: HandleId) {
        self.write_u32(h.to_raw());
    }

    fn write_kind(&mut self, kind: SnapshotKind) {
        self.write_u8(match kind {
            SnapshotKind::Transform => 0,
            SnapshotKind::Visible => 1,
            SnapshotKind::Child => 2,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_entry_acquired(&mut self, e: &EntryAcquiredEvent) {
        self.write_u8(TAG_ENTRY_ACQUIRED);
        self.write_object(e.object);
        self.write_count(e.holders);
        self.write_u8(u8::from(e.created));
    }

    fn on_entry_released(&mut self, e: &EntryReleasedEvent) {
        self.write_u8(TAG_ENTRY_RELEASED);
        self.write_object(e.object);
        self.write_count(e.holders);
    }

    fn on_entry_detached(&mut self, e: &EntryDetachedEvent) {
        self.write_u8(TAG_ENTRY_DETACHED);
        self.write_object(e.object);
    }

    fn on_entry_destroyed(&mut self, e: &EntryDestroyedEvent) {
        self.write_u8(TAG_ENTRY_DESTROYED);
        self.write_object(e.object);
    }

    fn on_snapshot_built(&mut self, e: &SnapshotBuiltEvent) {
        self.write_u8(TAG_SNAPSHOT_BUILT);
        self.write_object(e.object);
        self.write_kind(e.kind);
        self.write_count(e.children);
    }

    fn on_container_updated(&mut self, e: &ContainerUpdatedEvent) {
        self.write_u8(TAG_CONTAINER_UPDATED);
        self.write_object(e.object);
        self.write_count(e.children);
    }

    fn on_link_updated(&mut self, e: &LinkUpdatedEvent) {
        self.write_u8(TAG_LINK_UPDATED);
        self.write_handle(e.handle);
        self.write_object(e.object);
        self.write_count(e.subs);
    }

    fn on_restoring_skipped(&mut self, e: &RestoringSkippedEvent) {
        self.write_u8(TAG_RESTORING_SKIPPED);
        self.write_handle(e.handle);
        self.write_object(e.owner);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedEvent {
    /// An [`EntryAcquiredEvent`].
    EntryAcquired(EntryAcquiredEvent),
    /// An [`EntryReleasedEvent`].
    EntryReleased(EntryReleasedEvent),
    /// An [`EntryDetachedEvent`].
    EntryDetached(EntryDetachedEvent),
    /// An [`EntryDestroyedEvent`].
    EntryDestroyed(EntryDestroyedEvent),
    /// A [`SnapshotBuiltEvent`].
    SnapshotBuilt(SnapshotBuiltEvent),
    /// A [`ContainerUpdatedEvent`].
    ContainerUpdated(ContainerUpdatedEvent),
    /// A [`LinkUpdatedEvent`].
    LinkUpdated(LinkUpdatedEvent),
    /// A [`RestoringSkippedEvent`].
    RestoringSkipped(RestoringSkippedEvent),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
///
/// Iteration stops at the first unknown tag or truncated record.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Some(v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = u32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().ok()?);
        self.pos += 4;
        Some(v)
    }

    fn read_count(&mut self) -> Option<usize> {
        self.read_u32().map(|n| n as usize)
    }

    fn read_object(&mut self) -> Option<ObjectId> {
        self.read_u32().map(ObjectId)
    }

    fn read_handle(&mut self) -> Option<HandleId> {
        self.read_u32().map(HandleId::from_raw)
    }

    fn read_kind(&mut self) -> Option<SnapshotKind> {
        SnapshotKind::try_from(i32::from(self.read_u8()?)).ok()
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        Some(match tag {
            TAG_ENTRY_ACQUIRED => RecordedEvent::EntryAcquired(EntryAcquiredEvent {
                object: self.read_object()?,
                holders: self.read_count()?,
                created: self.read_u8()? != 0,
            }),
            TAG_ENTRY_RELEASED => RecordedEvent::EntryReleased(EntryReleasedEvent {
                object: self.read_object()?,
                holders: self.read_count()?,
            }),
            TAG_ENTRY_DETACHED => RecordedEvent::EntryDetached(EntryDetachedEvent {
                object: self.read_object()?,
            }),
            TAG_ENTRY_DESTROYED => RecordedEvent::EntryDestroyed(EntryDestroyedEvent {
                object: self.read_object()?,
            }),
            TAG_SNAPSHOT_BUILT => RecordedEvent::SnapshotBuilt(SnapshotBuiltEvent {
                object: self.read_object()?,
                kind: self.read_kind()?,
                children: self.read_count()?,
            }),
            TAG_CONTAINER_UPDATED => RecordedEvent::ContainerUpdated(ContainerUpdatedEvent {
                object: self.read_object()?,
                children: self.read_count()?,
            }),
            TAG_LINK_UPDATED => RecordedEvent::LinkUpdated(LinkUpdatedEvent {
                handle: self.read_handle()?,
                object: self.read_object()?,
                subs: self.read_count()?,
            }),
            TAG_RESTORING_SKIPPED => RecordedEvent::RestoringSkipped(RestoringSkippedEvent {
                handle: self.read_handle()?,
                owner: self.read_object()?,
            }),
            _ => return None, // unknown tag → stop iteration
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_lifecycle(rec: &mut RecorderSink) {
        rec.on_entry_acquired(&EntryAcquiredEvent {
            object: ObjectId(4),
            holders: 1,
            created: true,
        });
        rec.on_snapshot_built(&SnapshotBuiltEvent {
            object: ObjectId(4),
            kind: SnapshotKind::Child,
            children: 3,
        });
        rec.on_link_updated(&LinkUpdatedEvent {
            handle: HandleId::from_raw(9),
            object: ObjectId(4),
            subs: 2,
        });
        rec.on_entry_released(&EntryReleasedEvent {
            object: ObjectId(4),
            holders: 0,
        });
        rec.on_entry_detached(&EntryDetachedEvent {
            object: ObjectId(4),
        });
        rec.on_entry_destroyed(&EntryDestroyedEvent {
            object: ObjectId(4),
        });
    }

    #[test]
    fn decodes_a_recorded_lifecycle_in_order() {
        let mut rec = RecorderSink::new();
        entry_lifecycle(&mut rec);

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 6);
        assert_eq!(
            events[1],
            RecordedEvent::SnapshotBuilt(SnapshotBuiltEvent {
                object: ObjectId(4),
                kind: SnapshotKind::Child,
                children: 3,
            })
        );
        match &events[2] {
            RecordedEvent::LinkUpdated(e) => {
                assert_eq!(e.handle, HandleId::from_raw(9));
                assert_eq!(e.subs, 2);
            }
            other => panic!("expected LinkUpdated, got {other:?}"),
        }
        assert!(matches!(events[5], RecordedEvent::EntryDestroyed(_)));
    }

    #[test]
    fn truncated_record_ends_iteration() {
        let mut rec = RecorderSink::new();
        entry_lifecycle(&mut rec);
        let bytes = rec.into_bytes();
        let cut = &bytes[..bytes.len() - 2];
        assert_eq!(decode(cut).count(), 5);
    }

    #[test]
    fn unknown_tag_ends_iteration() {
        assert_eq!(decode(&[0xff, 0, 0, 0, 0]).count(), 0);
        assert_eq!(decode(&[]).count(), 0);
    }
}
