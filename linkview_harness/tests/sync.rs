// Copyright 2026 the Linkview Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Link view providers following their link properties.

use std::collections::BTreeMap;

use linkview_core::object::{Icon, ObjectId};
use linkview_core::sync::{
    LINK_ARRAY_ICON, LINK_ICON, LinkProperties, LinkProperty, LinkViewProvider, Placement,
    ViewProperties,
};
use linkview_core::trace::{RestoringSkippedEvent, TraceSink};
use linkview_core::transform::Transform3d;
use linkview_core::{LinkConfig, LinkContext, LinkError};
use linkview_harness::{MemoryDocument, NO_SUBS, PART_ICON, unit_box};

type Peers = BTreeMap<ObjectId, ViewProperties>;

fn linked_to(obj: ObjectId) -> LinkProperties {
    LinkProperties {
        linked_object: Some(obj),
        ..LinkProperties::default()
    }
}

fn attach_linked(
    ctx: &mut LinkContext,
    doc: &mut MemoryDocument,
    object: ObjectId,
    props: &LinkProperties,
) -> LinkViewProvider {
    let mut vp = LinkViewProvider::attach(ctx, doc, object, props).unwrap();
    vp.update_data(ctx, doc, &Peers::new(), props, &LinkProperty::LinkedObject)
        .unwrap();
    vp
}

#[test]
fn provider_icon_follows_linked_object() {
    let mut ctx = LinkContext::new(LinkConfig::default());
    let mut doc = MemoryDocument::new("Doc");
    let part = doc.add_part(ctx.graph_mut(), "Box", unit_box([0.0; 3]));
    let link = doc.add_object("Link");
    let mut props = LinkProperties::default();
    let mut vp = LinkViewProvider::attach(&mut ctx, &mut doc, link, &props).unwrap();
    assert_eq!(vp.icon(&mut ctx, &doc), Icon::named(LINK_ICON));

    props.linked_object = Some(part);
    let outcome = vp
        .update_data(&mut ctx, &mut doc, &Peers::new(), &props, &LinkProperty::LinkedObject)
        .unwrap();
    assert!(outcome.icon_changed);
    assert_eq!(
        vp.icon(&mut ctx, &doc),
        Icon {
            name: PART_ICON.into(),
            overlay: Some("LinkOverlay".into()),
            size: 16,
        }
    );

    props.element_count = 2;
    let outcome = vp
        .update_data(&mut ctx, &mut doc, &Peers::new(), &props, &LinkProperty::ElementCount)
        .unwrap();
    assert!(outcome.icon_changed);
    assert_eq!(vp.icon_name(), LINK_ARRAY_ICON);
    assert_eq!(ctx.size(vp.handle()), 2);
}

#[test]
fn icon_changes_travel_up_link_chains() {
    let mut ctx = LinkContext::new(LinkConfig::default());
    let mut doc = MemoryDocument::new("Doc");
    let part = doc.add_part(ctx.graph_mut(), "Box", unit_box([0.0; 3]));
    let inner = doc.add_object("Inner");
    let outer = doc.add_object("Outer");
    let inner_vp = attach_linked(&mut ctx, &mut doc, inner, &linked_to(part));
    let outer_vp = attach_linked(&mut ctx, &mut doc, outer, &linked_to(inner));

    assert_eq!(ctx.linked_object(outer_vp.handle(), false), Ok(Some(inner)));
    assert_eq!(ctx.linked_object(outer_vp.handle(), true), Ok(Some(part)));
    assert_eq!(inner_vp.icon(&mut ctx, &doc).name, PART_ICON);

    doc.set_icon(part, "Cube");
    assert_eq!(inner_vp.icon(&mut ctx, &doc).name, PART_ICON);
    assert_eq!(ctx.icon_changed(&doc, part), [inner, outer]);
    assert_eq!(inner_vp.icon(&mut ctx, &doc).name, "Cube");
}

#[test]
fn cyclic_links_stop_at_the_depth_limit() {
    let mut ctx = LinkContext::new(LinkConfig::default());
    let mut doc = MemoryDocument::new("Doc");
    let a = doc.add_object("A");
    let b = doc.add_object("B");
    let ha = ctx.create_handle();
    let hb = ctx.create_handle();
    ctx.set_owner(&mut doc, ha, Some(a)).unwrap();
    ctx.set_owner(&mut doc, hb, Some(b)).unwrap();
    ctx.set_link(&mut doc, ha, Some(b), NO_SUBS).unwrap();
    ctx.set_link(&mut doc, hb, Some(a), NO_SUBS).unwrap();

    assert_eq!(ctx.linked_object(ha, false), Ok(Some(b)));
    assert_eq!(
        ctx.linked_object(ha, true),
        Err(LinkError::LinkDepthExceeded(100))
    );
}

#[test]
fn claimed_children_depend_on_link_kind() {
    let mut ctx = LinkContext::new(LinkConfig::default());
    let mut doc = MemoryDocument::new("Doc");
    let body = doc.add_container(ctx.graph_mut(), "Body");
    let pad = doc.add_part(ctx.graph_mut(), "Pad", unit_box([0.0; 3]));
    let sketch = doc.add_part(ctx.graph_mut(), "Sketch", unit_box([0.0; 3]));
    doc.add_to_container(ctx.graph_mut(), body, pad);
    doc.add_to_container(ctx.graph_mut(), body, sketch);
    let link = doc.add_object("Link");
    let mut props = linked_to(body);
    let mut vp = attach_linked(&mut ctx, &mut doc, link, &props);

    assert_eq!(vp.claim_children(&ctx, &doc, &props), [pad, sketch]);

    props.element_count = 2;
    assert_eq!(vp.claim_children(&ctx, &doc, &props), [body]);

    props.element_count = 0;
    props.sub_name = "Pad.".into();
    vp.update_data(&mut ctx, &mut doc, &Peers::new(), &props, &LinkProperty::LinkedObject)
        .unwrap();
    assert!(vp.has_sub_name());
    assert!(vp.claim_children(&ctx, &doc, &props).is_empty());
    assert_eq!(vp.icon(&mut ctx, &doc).overlay.as_deref(), Some("LinkSubOverlay"));
}

#[derive(Debug, Default)]
struct SkipCounter {
    skipped: usize,
}

impl TraceSink for SkipCounter {
    fn on_restoring_skipped(&mut self, _: &RestoringSkippedEvent) {
        self.skipped += 1;
    }
}

#[test]
fn restoring_owner_defers_rebuild() {
    let mut ctx = LinkContext::with_trace_sink(LinkConfig::default(), SkipCounter::default());
    let mut doc = MemoryDocument::new("Doc");
    let part = doc.add_part(ctx.graph_mut(), "Box", unit_box([0.0; 3]));
    let owner = doc.add_object("Link");
    doc.set_restoring(owner, true);

    let h = ctx.create_handle();
    ctx.set_owner(&mut doc, h, Some(owner)).unwrap();
    ctx.set_link(&mut doc, h, Some(part), NO_SUBS).unwrap();
    assert!(ctx.is_linked(h));
    assert_eq!(ctx.trace_sink().skipped, 1);
    assert_eq!(ctx.bounding_box(h), None);

    doc.set_restoring(owner, false);
    ctx.update_link(&mut doc, h).unwrap();
    assert_eq!(ctx.bounding_box(h), Some(unit_box([0.0; 3])));
}

#[test]
fn provider_replays_properties_after_restore() {
    let mut ctx = LinkContext::new(LinkConfig::default());
    let mut doc = MemoryDocument::new("Doc");
    let part = doc.add_part(ctx.graph_mut(), "Box", unit_box([0.0; 3]));
    let link = doc.add_object("Link");
    doc.set_restoring(link, true);
    let props = LinkProperties {
        placement: Placement::from_translation([5.0, 0.0, 0.0]),
        ..linked_to(part)
    };
    let mut vp = LinkViewProvider::attach(&mut ctx, &mut doc, link, &props).unwrap();
    let peers = Peers::new();
    let outcome = vp
        .update_data(&mut ctx, &mut doc, &peers, &props, &LinkProperty::LinkedObject)
        .unwrap();
    assert!(!outcome.icon_changed);
    assert!(!ctx.is_linked(vp.handle()));

    doc.set_restoring(link, false);
    let outcome = vp
        .finish_restoring(&mut ctx, &mut doc, &peers, &props)
        .unwrap();
    assert!(outcome.icon_changed);
    assert!(ctx.is_linked(vp.handle()));
    let bounds = ctx.graph().bounding_box(vp.root()).unwrap();
    assert_eq!(bounds.min, [5.0, 0.0, 0.0]);

    vp.set_visible(&mut ctx, &mut doc, false).unwrap();
    assert_eq!(ctx.graph().bounding_box(vp.root()), None);
    assert!(!doc.is_force_updated(part));
}

#[test]
fn array_follows_placement_and_visibility_lists() {
    let mut ctx = LinkContext::new(LinkConfig::default());
    let mut doc = MemoryDocument::new("Doc");
    let part = doc.add_part(ctx.graph_mut(), "Box", unit_box([0.0; 3]));
    let link = doc.add_object("Array");
    let mut props = LinkProperties {
        element_count: 3,
        placement_list: Some(
            (0..3)
                .map(|i| Placement::from_translation([2.0 * f64::from(i), 0.0, 0.0]))
                .collect(),
        ),
        visibility_list: vec![true, true, false],
        ..linked_to(part)
    };
    let peers = Peers::new();
    let mut vp = attach_linked(&mut ctx, &mut doc, link, &props);
    let h = vp.handle();
    vp.update_data(&mut ctx, &mut doc, &peers, &props, &LinkProperty::ElementCount)
        .unwrap();
    assert_eq!(ctx.size(h), 3);
    assert_eq!(ctx.bounding_box(h).unwrap().max, [3.0, 1.0, 1.0]);

    props.visibility_list.clear();
    vp.update_data(
        &mut ctx,
        &mut doc,
        &peers,
        &props,
        &LinkProperty::VisibilityList { touched: Vec::new() },
    )
    .unwrap();
    assert_eq!(ctx.bounding_box(h).unwrap().max, [5.0, 1.0, 1.0]);

    if let Some(list) = props.placement_list.as_mut() {
        list[2] = Placement::from_translation([10.0, 0.0, 0.0]);
        list[0] = Placement::from_translation([-4.0, 0.0, 0.0]);
    }
    vp.update_data(
        &mut ctx,
        &mut doc,
        &peers,
        &props,
        &LinkProperty::PlacementList { touched: vec![2] },
    )
    .unwrap();
    let bounds = ctx.bounding_box(h).unwrap();
    assert_eq!(bounds.max, [11.0, 1.0, 1.0]);
    assert_eq!(bounds.min, [0.0, 0.0, 0.0]);

    props.scale_list = vec![[2.0; 3]];
    vp.update_data(
        &mut ctx,
        &mut doc,
        &peers,
        &props,
        &LinkProperty::ScaleList { touched: Vec::new() },
    )
    .unwrap();
    let bounds = ctx.bounding_box(h).unwrap();
    assert_eq!(bounds.min, [-4.0, 0.0, 0.0]);
    assert_eq!(bounds.max, [11.0, 2.0, 2.0]);
}

#[test]
fn recompute_refreshes_sub_object_placement() {
    let mut ctx = LinkContext::new(LinkConfig::default());
    let mut doc = MemoryDocument::new("Doc");
    let body = doc.add_container(ctx.graph_mut(), "Body");
    let pad = doc.add_part(ctx.graph_mut(), "Pad", unit_box([0.0; 3]));
    doc.add_to_container(ctx.graph_mut(), body, pad);
    let link = doc.add_object("Link");
    let props = LinkProperties {
        sub_name: "Pad.".into(),
        link_transform: true,
        ..linked_to(body)
    };
    let mut vp = attach_linked(&mut ctx, &mut doc, link, &props);
    let h = vp.handle();
    assert!(ctx.has_subs(h));
    assert_eq!(ctx.linked_object(h, false), Ok(Some(pad)));
    assert_eq!(ctx.bounding_box(h).unwrap().min, [0.0, 0.0, 0.0]);

    doc.set_placement(
        ctx.graph_mut(),
        pad,
        Transform3d::from_translation(3.0, 0.0, 0.0),
    );
    assert_eq!(ctx.bounding_box(h).unwrap().min, [0.0, 0.0, 0.0]);
    vp.update_data(&mut ctx, &mut doc, &Peers::new(), &props, &LinkProperty::Recomputed)
        .unwrap();
    assert_eq!(ctx.bounding_box(h).unwrap().min, [3.0, 0.0, 0.0]);
}

#[test]
fn visibility_list_applies_only_touched_slots() {
    let mut ctx = LinkContext::new(LinkConfig::default());
    let mut doc = MemoryDocument::new("Doc");
    let part = doc.add_part(ctx.graph_mut(), "Box", unit_box([0.0; 3]));
    let link = doc.add_object("Array");
    let mut props = LinkProperties {
        element_count: 4,
        placement_list: Some(vec![Placement::default(); 4]),
        visibility_list: vec![true, false, true, false],
        ..linked_to(part)
    };
    let peers = Peers::new();
    let mut vp = attach_linked(&mut ctx, &mut doc, link, &props);
    let h = vp.handle();
    vp.update_data(&mut ctx, &mut doc, &peers, &props, &LinkProperty::ElementCount)
        .unwrap();
    let shown = |ctx: &LinkContext| -> Vec<bool> {
        (0..4).map(|i| ctx.is_element_visible(h, i)).collect()
    };
    assert_eq!(shown(&ctx), [true, false, true, false]);

    props.visibility_list = vec![false];
    vp.update_data(
        &mut ctx,
        &mut doc,
        &peers,
        &props,
        &LinkProperty::VisibilityList { touched: vec![0] },
    )
    .unwrap();
    assert_eq!(shown(&ctx), [false, false, true, false]);

    vp.update_data(
        &mut ctx,
        &mut doc,
        &peers,
        &props,
        &LinkProperty::VisibilityList { touched: vec![3, 9] },
    )
    .unwrap();
    assert_eq!(shown(&ctx), [false, false, true, true]);

    vp.update_data(
        &mut ctx,
        &mut doc,
        &peers,
        &props,
        &LinkProperty::VisibilityList { touched: Vec::new() },
    )
    .unwrap();
    assert_eq!(shown(&ctx), [false, true, true, true]);
}
