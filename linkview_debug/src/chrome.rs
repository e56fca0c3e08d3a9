// Copyright 2026 the Linkview Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Link events carry no clock, so each event is placed at its sequence
//! index in microseconds. Entry lifetimes become `B`/`E` duration pairs on
//! one track per object; everything else is an instant event.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for (ts, recorded) in decode(bytes).enumerate() {
        let event = match recorded {
            RecordedEvent::EntryAcquired(e) if e.created => json!({
                "ph": "B",
                "name": "Entry",
                "cat": "Cache",
                "ts": ts,
                "pid": 0,
                "tid": e.object.0,
                "args": { "holders": e.holders }
            }),
            RecordedEvent::EntryAcquired(e) => instant(
                "EntryAcquired",
                "Cache",
                ts,
                e.object.0,
                json!({ "holders": e.holders }),
            ),
            RecordedEvent::EntryReleased(e) => instant(
                "EntryReleased",
                "Cache",
                ts,
                e.object.0,
                json!({ "holders": e.holders }),
            ),
            RecordedEvent::EntryDetached(e) => {
                instant("EntryDetached", "Cache", ts, e.object.0, json!({}))
            }
            RecordedEvent::EntryDestroyed(e) => json!({
                "ph": "E",
                "name": "Entry",
                "cat": "Cache",
                "ts": ts,
                "pid": 0,
                "tid": e.object.0,
            }),
            RecordedEvent::SnapshotBuilt(e) => instant(
                "SnapshotBuilt",
                "Cache",
                ts,
                e.object.0,
                json!({
                    "kind": format!("{:?}", e.kind),
                    "children": e.children,
                }),
            ),
            RecordedEvent::ContainerUpdated(e) => instant(
                "ContainerUpdated",
                "Cache",
                ts,
                e.object.0,
                json!({ "children": e.children }),
            ),
            RecordedEvent::LinkUpdated(e) => instant(
                "LinkUpdated",
                "Link",
                ts,
                e.object.0,
                json!({
                    "handle": e.handle.to_raw(),
                    "subs": e.subs,
                }),
            ),
            RecordedEvent::RestoringSkipped(e) => instant(
                "RestoringSkipped",
                "Link",
                ts,
                e.owner.0,
                json!({ "handle": e.handle.to_raw() }),
            ),
        };
        events.push(event);
    }

    serde_json::to_writer_pretty(&mut *writer, &events).map_err(io::Error::other)?;
    writeln!(writer)
}

fn instant(name: &str, cat: &str, ts: usize, tid: u32, args: Value) -> Value {
    json!({
        "ph": "i",
        "name": name,
        "cat": cat,
        "ts": ts,
        "pid": 0,
        "tid": tid,
        "s": "t",
        "args": args,
    })
}
