// Copyright 2026 the Linkview Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Snapshot cache behavior against an in-memory document.

use linkview_core::cache::{Holder, SnapshotKind};
use linkview_core::trace::{
    EntryDestroyedEvent, EntryDetachedEvent, SnapshotBuiltEvent, TraceSink,
};
use linkview_core::transform::Transform3d;
use linkview_core::{LinkConfig, LinkContext};
use linkview_harness::{MemoryDocument, NO_SUBS, unit_box};

#[derive(Debug, Default)]
struct Counter {
    built: usize,
    detached: usize,
    destroyed: usize,
}

impl TraceSink for Counter {
    fn on_snapshot_built(&mut self, _: &SnapshotBuiltEvent) {
        self.built += 1;
    }

    fn on_entry_detached(&mut self, _: &EntryDetachedEvent) {
        self.detached += 1;
    }

    fn on_entry_destroyed(&mut self, _: &EntryDestroyedEvent) {
        self.destroyed += 1;
    }
}

fn counting_context() -> LinkContext<Counter> {
    LinkContext::with_trace_sink(LinkConfig::default(), Counter::default())
}

#[test]
fn entries_are_shared_and_destroyed_once() {
    let mut ctx = counting_context();
    let mut doc = MemoryDocument::new("Doc");
    let part = doc.add_part(ctx.graph_mut(), "Box", unit_box([0.0; 3]));
    let a = ctx.create_handle();
    let b = ctx.create_handle();
    ctx.set_link(&mut doc, a, Some(part), NO_SUBS).unwrap();
    ctx.set_link(&mut doc, b, Some(part), NO_SUBS).unwrap();

    let entry = ctx.cache().lookup(part).unwrap();
    assert_eq!(ctx.cache().holder_count(entry), 2);
    assert_eq!(ctx.cache().live_count(entry), 2);
    let snap = ctx
        .cache()
        .snapshot_root(entry, SnapshotKind::Transform)
        .unwrap();
    for h in [a, b] {
        let root = ctx.link_root(h).unwrap();
        assert!(ctx.graph().find_child(root, snap).is_some());
    }
    assert_eq!(ctx.trace_sink().built, 1);
    assert_eq!(doc.force_updates(), [(part, true)]);

    ctx.unlink(&mut doc, a).unwrap();
    assert_eq!(ctx.cache().holder_count(entry), 1);
    assert_eq!(ctx.trace_sink().detached, 0);
    assert_eq!(ctx.graph().child_count(ctx.link_root(a).unwrap()), 1);

    ctx.unlink(&mut doc, b).unwrap();
    assert_eq!(ctx.cache().lookup(part), None);
    assert!(!ctx.cache().contains(entry));
    assert_eq!(ctx.trace_sink().detached, 1);
    assert_eq!(ctx.trace_sink().destroyed, 1);
    assert_eq!(doc.force_updates(), [(part, true), (part, false)]);
    assert!(!ctx.graph().is_alive(snap));
    assert!(ctx.graph().is_alive(doc.shape(part).unwrap()));
}

#[test]
fn hidden_holders_do_not_keep_objects_updated() {
    let mut ctx = counting_context();
    let mut doc = MemoryDocument::new("Doc");
    let part = doc.add_part(ctx.graph_mut(), "Box", unit_box([0.0; 3]));
    let h = ctx.create_handle();
    ctx.set_link(&mut doc, h, Some(part), NO_SUBS).unwrap();
    assert!(doc.is_force_updated(part));

    ctx.set_handle_visible(&mut doc, h, false).unwrap();
    assert!(!doc.is_force_updated(part));
    let entry = ctx.cache().lookup(part).unwrap();
    assert_eq!(ctx.cache().holder_count(entry), 1);
    assert_eq!(ctx.cache().live_count(entry), 0);

    ctx.set_handle_visible(&mut doc, h, true).unwrap();
    assert!(doc.is_force_updated(part));
}

#[test]
fn snapshots_are_built_once_and_rebuilt_in_place() {
    let mut ctx = counting_context();
    let mut doc = MemoryDocument::new("Doc");
    let part = doc.add_part(ctx.graph_mut(), "Box", unit_box([0.0; 3]));
    let h = ctx.create_handle();
    ctx.set_link(&mut doc, h, Some(part), NO_SUBS).unwrap();
    let entry = ctx.cache().lookup(part).unwrap();

    let visible = ctx
        .snapshot(&doc, entry, SnapshotKind::Visible, false)
        .unwrap();
    let again = ctx
        .snapshot(&doc, entry, SnapshotKind::Visible, false)
        .unwrap();
    assert_eq!(visible, again);
    assert_eq!(ctx.trace_sink().built, 2);
    // Transform node plus mirrored mode switch.
    assert_eq!(ctx.graph().child_count(visible), 2);
    let transform = ctx
        .cache()
        .snapshot_root(entry, SnapshotKind::Transform)
        .unwrap();
    assert_eq!(ctx.graph().child_count(transform), 1);

    doc.set_placement(
        ctx.graph_mut(),
        part,
        Transform3d::from_translation(5.0, 0.0, 0.0),
    );
    let owners = ctx.object_changed(&mut doc, part);
    assert!(owners.is_empty());
    assert_eq!(ctx.trace_sink().built, 4);
    assert_eq!(
        ctx.cache().snapshot_root(entry, SnapshotKind::Visible),
        Some(visible)
    );
    let root = ctx.link_root(h).unwrap();
    assert!(ctx.graph().find_child(root, transform).is_some());

    // Only the visible flavor carries the object's own placement.
    assert_eq!(ctx.bounding_box(h).unwrap().min, [0.0; 3]);
    assert_eq!(ctx.graph().bounding_box(visible).unwrap().min, [5.0, 0.0, 0.0]);
}

#[test]
fn forced_rebuild_keeps_every_flavor_root() {
    let mut ctx = counting_context();
    let mut doc = MemoryDocument::new("Doc");
    let part = doc.add_part(ctx.graph_mut(), "Box", unit_box([0.0; 3]));
    let h = ctx.create_handle();
    ctx.set_link(&mut doc, h, Some(part), NO_SUBS).unwrap();
    let entry = ctx.cache().lookup(part).unwrap();

    let transform = ctx
        .snapshot(&doc, entry, SnapshotKind::Transform, false)
        .unwrap();
    let visible = ctx
        .snapshot(&doc, entry, SnapshotKind::Visible, false)
        .unwrap();
    let transform_children: Vec<_> = ctx.graph().children(transform).collect();
    let visible_children: Vec<_> = ctx.graph().children(visible).collect();
    let built = ctx.trace_sink().built;

    let rebuilt = ctx
        .snapshot(&doc, entry, SnapshotKind::Transform, true)
        .unwrap();
    assert_eq!(rebuilt, transform);
    assert_eq!(ctx.trace_sink().built, built + 1);
    assert_eq!(
        ctx.graph().children(transform).collect::<Vec<_>>(),
        transform_children
    );
    assert_eq!(
        ctx.cache().snapshot_root(entry, SnapshotKind::Visible),
        Some(visible)
    );
    assert_eq!(
        ctx.graph().children(visible).collect::<Vec<_>>(),
        visible_children
    );
    let root = ctx.link_root(h).unwrap();
    assert!(ctx.graph().find_child(root, transform).is_some());
}

#[test]
fn mirrored_switches_follow_visibility_and_default_mode() {
    let mut ctx = counting_context();
    let mut doc = MemoryDocument::new("Doc");
    let part = doc.add_part(ctx.graph_mut(), "Box", unit_box([0.0; 3]));
    let h = ctx.create_handle();
    ctx.set_link(&mut doc, h, Some(part), NO_SUBS).unwrap();
    let entry = ctx.cache().lookup(part).unwrap();
    ctx.snapshot(&doc, entry, SnapshotKind::Child, false).unwrap();
    let transform = ctx
        .cache()
        .mode_switch(entry, SnapshotKind::Transform)
        .unwrap();
    let child = ctx.cache().mode_switch(entry, SnapshotKind::Child).unwrap();
    assert_eq!(ctx.graph().which(transform), Some(0));
    assert_eq!(ctx.graph().which(child), Some(0));

    doc.set_visible(ctx.graph_mut(), part, false);
    ctx.visibility_changed(&doc, part);
    assert_eq!(ctx.graph().which(transform), Some(0));
    assert_eq!(ctx.graph().which(child), None);

    doc.set_visible(ctx.graph_mut(), part, true);
    doc.set_default_mode(ctx.graph_mut(), part, 1);
    ctx.visibility_changed(&doc, part);
    assert_eq!(ctx.graph().which(transform), Some(1));
    assert_eq!(ctx.graph().which(child), Some(1));
}

#[test]
fn object_without_display_modes_shows_nothing() {
    let mut ctx = counting_context();
    let mut doc = MemoryDocument::new("Doc");
    let feature = doc.add_empty(ctx.graph_mut(), "Feature");
    let h = ctx.create_handle();
    ctx.set_link(&mut doc, h, Some(feature), NO_SUBS).unwrap();
    let entry = ctx.cache().lookup(feature).unwrap();
    let switch = ctx
        .cache()
        .mode_switch(entry, SnapshotKind::Transform)
        .unwrap();
    assert_eq!(ctx.graph().child_count(switch), 0);
    assert_eq!(ctx.graph().which(switch), None);
    assert_eq!(ctx.bounding_box(h), None);
}

#[test]
fn container_swaps_child_index_before_releasing() {
    let mut ctx = counting_context();
    let mut doc = MemoryDocument::new("Doc");
    let body = doc.add_container(ctx.graph_mut(), "Body");
    let pad = doc.add_part(ctx.graph_mut(), "Pad", unit_box([0.0; 3]));
    let sketch = doc.add_part(ctx.graph_mut(), "Sketch", unit_box([2.0, 0.0, 0.0]));
    doc.add_to_container(ctx.graph_mut(), body, pad);
    doc.add_to_container(ctx.graph_mut(), body, sketch);
    let link = doc.add_object("Link");

    let h = ctx.create_handle();
    ctx.set_owner(&mut doc, h, Some(link)).unwrap();
    ctx.set_link(&mut doc, h, Some(body), NO_SUBS).unwrap();

    let body_entry = ctx.cache().lookup(body).unwrap();
    let pad_entry = ctx.cache().lookup(pad).unwrap();
    assert_eq!(ctx.cache().child_entries(body_entry).len(), 2);
    assert!(
        ctx.cache()
            .holders(pad_entry)
            .any(|x| *x == Holder::Container(body_entry))
    );
    assert_eq!(ctx.bounding_box(h).unwrap().max, [3.0, 1.0, 1.0]);
    let pad_snap = ctx
        .cache()
        .snapshot_root(pad_entry, SnapshotKind::Child)
        .unwrap();

    doc.remove_from_container(ctx.graph_mut(), body, sketch);
    let owners = ctx.object_changed(&mut doc, body);
    assert_eq!(owners, [link]);

    assert_eq!(ctx.cache().lookup(pad), Some(pad_entry));
    assert_eq!(
        ctx.cache().snapshot_root(pad_entry, SnapshotKind::Child),
        Some(pad_snap)
    );
    assert_eq!(ctx.cache().lookup(sketch), None);
    assert!(!doc.force_updates().contains(&(pad, false)));
    assert_eq!(ctx.cache().child_entries(body_entry), [(pad_snap, pad_entry)]);
    let group = ctx.cache().child_group(body_entry).unwrap();
    assert_eq!(ctx.graph().children(group).collect::<Vec<_>>(), [pad_snap]);
    assert_eq!(ctx.bounding_box(h).unwrap().max, [1.0, 1.0, 1.0]);
}

#[test]
fn object_deleted_detaches_every_holder() {
    let mut ctx = counting_context();
    let mut doc = MemoryDocument::new("Doc");
    let body = doc.add_container(ctx.graph_mut(), "Body");
    let cube = doc.add_part(ctx.graph_mut(), "Box", unit_box([0.0; 3]));
    let cyl = doc.add_part(ctx.graph_mut(), "Cylinder", unit_box([2.0, 0.0, 0.0]));
    doc.add_to_container(ctx.graph_mut(), body, cube);

    let direct = ctx.create_handle();
    ctx.set_link(&mut doc, direct, Some(cube), NO_SUBS).unwrap();
    let array = ctx.create_handle();
    ctx.set_children(&mut doc, array, &[cube, cyl], &[], SnapshotKind::Visible)
        .unwrap();
    let group = ctx.create_handle();
    ctx.set_link(&mut doc, group, Some(body), NO_SUBS).unwrap();
    let body_entry = ctx.cache().lookup(body).unwrap();
    let cube_entry = ctx.cache().lookup(cube).unwrap();
    assert_eq!(ctx.cache().holder_count(cube_entry), 3);

    ctx.object_deleted(&mut doc, cube);
    doc.remove_object(ctx.graph_mut(), cube);

    assert!(!ctx.is_linked(direct));
    assert_eq!(ctx.children_objects(array), [cyl]);
    assert_eq!(ctx.size(array), 2);
    assert!(ctx.cache().child_entries(body_entry).is_empty());
    assert!(!ctx.cache().contains(cube_entry));
    assert!(ctx.is_linked(group));
    assert_eq!(ctx.trace_sink().destroyed, 1);

    ctx.object_changed(&mut doc, body);
    assert_eq!(ctx.bounding_box(group), None);
    assert_eq!(ctx.bounding_box(array).unwrap().min, [2.0, 0.0, 0.0]);
}

#[test]
fn shared_snapshot_changes_reach_every_link_root() {
    let mut ctx = counting_context();
    let mut doc = MemoryDocument::new("Doc");
    let part = doc.add_part(ctx.graph_mut(), "Box", unit_box([0.0; 3]));
    let a = ctx.create_handle();
    let b = ctx.create_handle();
    let idle = ctx.create_handle();
    ctx.set_link(&mut doc, a, Some(part), NO_SUBS).unwrap();
    ctx.set_link(&mut doc, b, Some(part), NO_SUBS).unwrap();
    let _ = ctx.evaluate();

    doc.set_visible(ctx.graph_mut(), part, false);
    ctx.visibility_changed(&doc, part);
    let changes = ctx.evaluate();
    for h in [a, b] {
        assert!(changes.touches(ctx.link_root(h).unwrap()));
    }
    assert!(!changes.touches(ctx.link_root(idle).unwrap()));
    assert!(ctx.evaluate().is_empty());
}
