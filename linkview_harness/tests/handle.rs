// Copyright 2026 the Linkview Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Link handle layout, arrays and sub-object links.

use linkview_core::cache::{Holder, SnapshotKind};
use linkview_core::handle::{HandleId, NodeType};
use linkview_core::scene::{ElementDetail, ElementKind, Material, NodeId, NodeKind};
use linkview_core::transform::{Rotation, Transform3d};
use linkview_core::{LinkConfig, LinkContext, LinkError};
use linkview_harness::{MemoryDocument, NO_SUBS, unit_box};

fn element_roots(ctx: &LinkContext, h: HandleId) -> Vec<NodeId> {
    let graph = ctx.graph();
    graph
        .children(ctx.link_root(h).unwrap())
        .filter(|&n| matches!(graph.kind(n), NodeKind::Switch { .. }))
        .map(|switch| graph.child(switch, 0).unwrap())
        .collect()
}

#[test]
fn transform_decomposition_round_trips() {
    let mut ctx = LinkContext::new(LinkConfig::default());
    let mut doc = MemoryDocument::new("Doc");
    let h = ctx.create_handle();
    ctx.set_size(&mut doc, h, 1).unwrap();

    let m = Transform3d::from_translation(1.0, -2.0, 3.5)
        * Transform3d::from_rotation(Rotation::from_axis_angle([0.0, 0.0, 1.0], 0.7))
        * Transform3d::from_scale(2.0, 0.5, 3.0);
    ctx.set_transform(h, None, &m).unwrap();
    ctx.set_transform(h, Some(0), &m).unwrap();

    let root = ctx.link_root(h).unwrap();
    let top = ctx.graph().child(root, 0).unwrap();
    assert!(ctx.graph().transform(top).to_matrix().approx_eq(&m, 1e-10));
    let element = ctx.graph().child(element_roots(&ctx, h)[0], 1).unwrap();
    assert!(ctx.graph().transform(element).to_matrix().approx_eq(&m, 1e-10));
}

#[test]
fn resize_keeps_surviving_elements() {
    let mut ctx = LinkContext::new(LinkConfig::default());
    let mut doc = MemoryDocument::new("Doc");
    let part = doc.add_part(ctx.graph_mut(), "Box", unit_box([0.0; 3]));
    let h = ctx.create_handle();
    ctx.set_link(&mut doc, h, Some(part), NO_SUBS).unwrap();
    ctx.set_size(&mut doc, h, 3).unwrap();
    let red = Material::with_packed_diffuse(0xff00_00ff);

    ctx.set_transform(h, Some(1), &Transform3d::from_translation(0.0, 4.0, 0.0))
        .unwrap();
    ctx.set_material(h, Some(2), Some(&red)).unwrap();
    ctx.set_element_visible(h, 0, false);

    ctx.set_size(&mut doc, h, 2).unwrap();
    assert_eq!(ctx.size(h), 2);
    ctx.set_size(&mut doc, h, 3).unwrap();
    assert_eq!(ctx.size(h), 3);

    assert!(!ctx.is_element_visible(h, 0));
    assert!(ctx.is_element_visible(h, 2));
    assert!(!ctx.is_element_visible(h, 3));
    let roots = element_roots(&ctx, h);
    let graph = ctx.graph();
    let moved = graph.child(roots[1], 1).unwrap();
    assert_eq!(graph.transform(moved).translation, [0.0, 4.0, 0.0]);
    let shared = graph.child(ctx.link_root(h).unwrap(), 0).unwrap();
    assert_eq!(graph.child(roots[2], 0), Some(shared));
    assert_eq!(graph.child(roots[1], 0), Some(shared));

    assert_eq!(
        ctx.set_transform(h, Some(3), &Transform3d::IDENTITY),
        Err(LinkError::IndexOutOfRange { index: 3, len: 3 })
    );
}

#[test]
fn array_bounds_follow_element_visibility() {
    let mut ctx = LinkContext::new(LinkConfig::default());
    let mut doc = MemoryDocument::new("Doc");
    let part = doc.add_part(ctx.graph_mut(), "Box", unit_box([0.0; 3]));
    let h = ctx.create_handle();
    ctx.set_link(&mut doc, h, Some(part), NO_SUBS).unwrap();
    ctx.set_size(&mut doc, h, 3).unwrap();
    for i in 0..3 {
        let x = 2.0 * i as f64;
        ctx.set_transform(h, Some(i), &Transform3d::from_translation(x, 0.0, 0.0))
            .unwrap();
    }
    assert_eq!(ctx.bounding_box(h).unwrap().max, [5.0, 1.0, 1.0]);

    ctx.set_element_visible(h, 2, false);
    assert_eq!(ctx.bounding_box(h).unwrap().max, [3.0, 1.0, 1.0]);

    ctx.set_size(&mut doc, h, 0).unwrap();
    assert_eq!(ctx.size(h), 0);
    assert_eq!(ctx.bounding_box(h).unwrap().max, [1.0, 1.0, 1.0]);
    let root = ctx.link_root(h).unwrap();
    assert_eq!(ctx.graph().child_count(root), 2);
}

#[test]
fn relinking_an_array_moves_every_element() {
    let mut ctx = LinkContext::new(LinkConfig::default());
    let mut doc = MemoryDocument::new("Doc");
    let small = doc.add_part(ctx.graph_mut(), "Box", unit_box([0.0; 3]));
    let far = doc.add_part(ctx.graph_mut(), "Far", unit_box([10.0, 0.0, 0.0]));
    let h = ctx.create_handle();
    ctx.set_link(&mut doc, h, Some(small), NO_SUBS).unwrap();
    ctx.set_size(&mut doc, h, 2).unwrap();

    ctx.set_link(&mut doc, h, Some(far), NO_SUBS).unwrap();
    assert_eq!(ctx.cache().lookup(small), None);
    assert_eq!(ctx.bounding_box(h).unwrap().min, [10.0, 0.0, 0.0]);
    let far_entry = ctx.cache().lookup(far).unwrap();
    let snap = ctx
        .cache()
        .snapshot_root(far_entry, SnapshotKind::Transform)
        .unwrap();
    for root in element_roots(&ctx, h) {
        assert!(ctx.graph().find_child(root, snap).is_some());
    }

    ctx.unlink(&mut doc, h).unwrap();
    assert_eq!(ctx.size(h), 2);
    assert_eq!(ctx.bounding_box(h), None);
}

#[test]
fn array_of_objects_keeps_matching_slots() {
    let mut ctx = LinkContext::new(LinkConfig::default());
    let mut doc = MemoryDocument::new("Doc");
    let a = doc.add_part(ctx.graph_mut(), "A", unit_box([0.0; 3]));
    let b = doc.add_part(ctx.graph_mut(), "B", unit_box([2.0, 0.0, 0.0]));
    let c = doc.add_part(ctx.graph_mut(), "C", unit_box([4.0, 0.0, 0.0]));
    let h = ctx.create_handle();

    ctx.set_children(&mut doc, h, &[a, b], &[], SnapshotKind::Visible)
        .unwrap();
    let a_entry = ctx.cache().lookup(a).unwrap();
    let a_snap = ctx
        .cache()
        .snapshot_root(a_entry, SnapshotKind::Visible)
        .unwrap();

    ctx.set_children(&mut doc, h, &[a, c], &[true, false], SnapshotKind::Visible)
        .unwrap();
    assert_eq!(ctx.children_objects(h), [a, c]);
    assert_eq!(ctx.cache().lookup(a), Some(a_entry));
    assert_eq!(ctx.cache().lookup(b), None);
    assert!(
        ctx.cache()
            .holders(a_entry)
            .any(|x| *x == Holder::Element(h, 0))
    );
    let roots = element_roots(&ctx, h);
    assert!(ctx.graph().find_child(roots[0], a_snap).is_some());
    assert!(ctx.is_element_visible(h, 0));
    assert!(!ctx.is_element_visible(h, 1));
    assert_eq!(ctx.bounding_box(h).unwrap().max, [1.0, 1.0, 1.0]);

    ctx.set_children(&mut doc, h, &[], &[], SnapshotKind::Visible)
        .unwrap();
    assert_eq!(ctx.size(h), 0);
    assert_eq!(ctx.cache().lookup(a), None);
    assert_eq!(ctx.graph().child_count(ctx.link_root(h).unwrap()), 1);
}

#[test]
fn sub_names_group_elements_by_path() {
    let mut ctx = LinkContext::new(LinkConfig::default());
    let mut doc = MemoryDocument::new("Doc");
    let asm = doc.add_container(ctx.graph_mut(), "Assembly");
    let body = doc.add_container(ctx.graph_mut(), "Body");
    let pad = doc.add_part(ctx.graph_mut(), "Pad", unit_box([0.0; 3]));
    let sketch = doc.add_part(ctx.graph_mut(), "Sketch", unit_box([2.0, 0.0, 0.0]));
    doc.add_to_container(ctx.graph_mut(), asm, body);
    doc.add_to_container(ctx.graph_mut(), body, pad);
    doc.add_to_container(ctx.graph_mut(), body, sketch);

    let h = ctx.create_handle();
    ctx.set_link(&mut doc, h, Some(asm), &["Body.Pad", "Body.Sketch"])
        .unwrap();
    assert_eq!(ctx.sub_names(h), ["Body.Pad", "Body.Sketch"]);
    assert!(ctx.has_subs(h));

    ctx.set_node_type(&mut doc, h, NodeType::Container, true)
        .unwrap();
    let root = ctx.link_root(h).unwrap();
    let composite = ctx.graph().child(root, 1).unwrap();
    assert_eq!(ctx.graph().child_count(composite), 1);
    let body_entry = ctx.cache().lookup(body).unwrap();
    assert!(
        ctx.cache()
            .holders(body_entry)
            .any(|x| *x == Holder::SubObject(h, "Body.".into()))
    );
    assert_eq!(ctx.linked_object(h, false), Ok(Some(body)));
    assert_eq!(ctx.sub_names(h), ["Body.Pad", "Body.Sketch"]);
}

#[test]
fn sub_elements_are_highlighted() {
    let mut ctx = LinkContext::new(LinkConfig::default());
    let mut doc = MemoryDocument::new("Doc");
    let asm = doc.add_container(ctx.graph_mut(), "Assembly");
    let body = doc.add_container(ctx.graph_mut(), "Body");
    let pad = doc.add_part(ctx.graph_mut(), "Pad", unit_box([0.0; 3]));
    doc.add_to_container(ctx.graph_mut(), asm, body);
    doc.add_to_container(ctx.graph_mut(), body, pad);

    let h = ctx.create_handle();
    ctx.set_node_type(&mut doc, h, NodeType::Container, true)
        .unwrap();
    ctx.set_link(
        &mut doc,
        h,
        Some(asm),
        &["Body.Pad.Face1", "Body.Pad.Edge2", "Body.Pad.Face9"],
    )
    .unwrap();

    let root = ctx.link_root(h).unwrap();
    let composite = ctx.graph().child(root, 1).unwrap();
    let sub_link = ctx.graph().child(composite, 0).unwrap();
    let highlights = ctx.graph().selection(composite);
    assert_eq!(highlights.len(), 2);
    let mut details: Vec<_> = highlights.iter().filter_map(|hl| hl.detail).collect();
    details.sort();
    assert_eq!(
        details,
        [
            ElementDetail::new(ElementKind::Face, 1),
            ElementDetail::new(ElementKind::Edge, 2),
        ]
    );
    assert!(highlights.iter().all(|hl| hl.path[0] == sub_link));
    assert_eq!(highlights[0].path.last().copied(), doc.shape(pad));

    ctx.set_link(&mut doc, h, Some(asm), &["Body.Pad."]).unwrap();
    assert!(ctx.graph().selection(composite).is_empty());
}

#[test]
fn composite_placement_depends_on_node_type() {
    let mut ctx = LinkContext::new(LinkConfig::default());
    let mut doc = MemoryDocument::new("Doc");
    let asm = doc.add_container(ctx.graph_mut(), "Assembly");
    let pad = doc.add_part(ctx.graph_mut(), "Pad", unit_box([0.0; 3]));
    doc.add_to_container(ctx.graph_mut(), asm, pad);
    doc.set_placement(
        ctx.graph_mut(),
        asm,
        Transform3d::from_translation(10.0, 0.0, 0.0),
    );
    doc.set_placement(
        ctx.graph_mut(),
        pad,
        Transform3d::from_translation(3.0, 0.0, 0.0),
    );

    let h = ctx.create_handle();
    ctx.set_link(&mut doc, h, Some(asm), &["Pad."]).unwrap();
    ctx.set_node_type(&mut doc, h, NodeType::ContainerTransform, true)
        .unwrap();
    assert_eq!(ctx.bounding_box(h).unwrap().min, [3.0, 0.0, 0.0]);

    ctx.set_node_type(&mut doc, h, NodeType::Container, true)
        .unwrap();
    assert_eq!(ctx.bounding_box(h).unwrap().min, [13.0, 0.0, 0.0]);

    ctx.set_node_type(&mut doc, h, NodeType::Snapshot(SnapshotKind::Visible), true)
        .unwrap();
    assert_eq!(ctx.bounding_box(h).unwrap().min, [13.0, 0.0, 0.0]);
    assert_eq!(ctx.linked_object(h, false), Ok(Some(pad)));
}
