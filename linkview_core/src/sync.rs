// Copyright 2026 the Linkview Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Synchronization rules between a link object's properties and its handle.
//!
//! [`LinkViewProvider`] is the view side of one link object. The document
//! layer keeps the link's persistent state in a [`LinkProperties`] value and
//! the view-only state in [`ViewProperties`]; after changing a field it calls
//! [`update_data`](LinkViewProvider::update_data) or
//! [`on_changed`](LinkViewProvider::on_changed) naming what changed, and the
//! provider applies the matching handle operations:
//!
//! | Change | Effect |
//! |---|---|
//! | linked object, sub-elements | sub-names rebuilt, node type chosen, `set_link` |
//! | link transform | node type chosen again |
//! | placement, link placement, scale | provider transform updated |
//! | element count | `set_size`, then every slot's transform and visibility |
//! | placement list, scale list | touched slots' transforms (all when none touched) |
//! | visibility list | touched slots' visibility (all when none touched) |
//! | element list | `set_children` with the element objects |
//! | show element (turned off) | element materials folded into the material lists |
//! | recomputed | `update_link` when sub-objects are linked |
//!
//! The provider's own graph is `root [transform, mode switch [link root]]`.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use crate::context::LinkContext;
use crate::error::LinkError;
use crate::handle::{HandleId, NodeType};
use crate::object::{Icon, LinkedObjectSource, ObjectId};
use crate::scene::{
    Detail, LineStyle, Material, NodeId, NodeKind, PickedPoint, ScenePath,
};
use crate::subname::{array_index, check_subname};
use crate::trace::TraceSink;
use crate::transform::{Rotation, Transform3d, TransformParts};

/// Icon name of a plain link.
pub const LINK_ICON: &str = "Link";
/// Icon name of a link array.
pub const LINK_ARRAY_ICON: &str = "LinkArray";
/// Icon name of a link group.
pub const LINK_GROUP_ICON: &str = "LinkGroup";
/// Icon name of an element of a link array.
pub const LINK_ELEMENT_ICON: &str = "LinkElement";

/// A rigid placement.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Placement {
    /// Position.
    pub translation: [f64; 3],
    /// Orientation.
    pub rotation: Rotation,
}

impl Placement {
    /// A pure translation.
    #[must_use]
    pub fn from_translation(translation: [f64; 3]) -> Self {
        Self {
            translation,
            rotation: Rotation::IDENTITY,
        }
    }

    /// The placement as a matrix.
    #[must_use]
    pub fn to_matrix(&self) -> Transform3d {
        let [x, y, z] = self.translation;
        Transform3d::from_translation(x, y, z) * Transform3d::from_rotation(self.rotation)
    }
}

/// What kind of object carries the link properties.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ExtensionKind {
    /// A link with a linked-object property.
    #[default]
    Link,
    /// A group: an element list but no linked object.
    Group,
    /// One element of a link array.
    Element,
}

/// The document-side state of a link.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkProperties {
    /// Kind of link object.
    pub kind: ExtensionKind,
    /// The linked object.
    pub linked_object: Option<ObjectId>,
    /// Sub-object path prefix for every sub-element, like `"Body."`.
    pub sub_name: String,
    /// A single sub-element.
    pub sub_element: Option<String>,
    /// Further sub-elements.
    pub sub_elements: Vec<String>,
    /// Whether the link shows the linked object with its own placement.
    pub link_transform: bool,
    /// The object's placement.
    pub placement: Placement,
    /// A separate placement of the linked content, when the object has one.
    pub link_placement: Option<Placement>,
    /// Per-axis scale.
    pub scale: [f64; 3],
    /// Number of array elements.
    pub element_count: usize,
    /// Whether array elements exist as separate objects.
    pub show_element: bool,
    /// Per-element placements, when the object has the property.
    pub placement_list: Option<Vec<Placement>>,
    /// Per-element scales.
    pub scale_list: Vec<[f64; 3]>,
    /// Per-element visibility; missing entries are visible.
    pub visibility_list: Vec<bool>,
    /// Element objects.
    pub element_list: Vec<ObjectId>,
}

impl Default for LinkProperties {
    fn default() -> Self {
        Self {
            kind: ExtensionKind::Link,
            linked_object: None,
            sub_name: String::new(),
            sub_element: None,
            sub_elements: Vec::new(),
            link_transform: false,
            placement: Placement::default(),
            link_placement: None,
            scale: [1.0; 3],
            element_count: 0,
            show_element: false,
            placement_list: None,
            scale_list: Vec::new(),
            visibility_list: Vec::new(),
            element_list: Vec::new(),
        }
    }
}

impl LinkProperties {
    /// Whether every array slot is backed by an element object.
    #[must_use]
    pub fn has_elements(&self) -> bool {
        !self.element_list.is_empty() && self.element_list.len() == self.element_count
    }

    /// Whether the link is a group.
    #[must_use]
    pub fn is_group(&self) -> bool {
        self.kind == ExtensionKind::Group
    }

    fn element_matrix(&self, index: usize) -> Transform3d {
        let mut mat = self
            .placement_list
            .as_ref()
            .and_then(|list| list.get(index))
            .map_or(Transform3d::IDENTITY, Placement::to_matrix);
        if let Some(&[sx, sy, sz]) = self.scale_list.get(index) {
            mat = mat * Transform3d::from_scale(sx, sy, sz);
        }
        mat
    }
}

/// A changed link property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkProperty {
    /// The linked object was recomputed.
    Recomputed,
    /// [`LinkProperties::scale`].
    Scale,
    /// [`LinkProperties::placement`].
    Placement,
    /// [`LinkProperties::link_placement`].
    LinkPlacement,
    /// [`LinkProperties::linked_object`] or [`LinkProperties::sub_name`].
    LinkedObject,
    /// [`LinkProperties::sub_element`] or [`LinkProperties::sub_elements`].
    SubElements,
    /// [`LinkProperties::link_transform`].
    LinkTransform,
    /// [`LinkProperties::element_count`].
    ElementCount,
    /// [`LinkProperties::show_element`].
    ShowElement,
    /// [`LinkProperties::placement_list`], with the touched indices; none
    /// touched means all.
    PlacementList {
        /// Changed indices.
        touched: Vec<usize>,
    },
    /// [`LinkProperties::scale_list`], with the touched indices; none
    /// touched means all.
    ScaleList {
        /// Changed indices.
        touched: Vec<usize>,
    },
    /// [`LinkProperties::visibility_list`], with the touched indices; none
    /// touched means all.
    VisibilityList {
        /// Changed indices.
        touched: Vec<usize>,
    },
    /// [`LinkProperties::element_list`].
    ElementList,
}

/// The view-side state of a link.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewProperties {
    /// Whether picks may select the link's content.
    pub selectable: bool,
    /// Whether [`shape_material`](Self::shape_material) overrides the
    /// linked object's materials.
    pub override_material: bool,
    /// The override material.
    pub shape_material: Material,
    /// Line style override.
    pub draw_style: LineStyle,
    /// Line width for the draw style override.
    pub line_width: f32,
    /// Point size for the draw style override.
    pub point_size: f32,
    /// Per-element materials.
    pub material_list: Vec<Material>,
    /// Which per-element materials apply.
    pub override_material_list: Vec<bool>,
}

impl ViewProperties {
    /// Defaults taken from the configuration.
    #[must_use]
    pub fn new(config: &crate::LinkConfig) -> Self {
        Self {
            selectable: true,
            override_material: false,
            shape_material: Material::with_packed_diffuse(config.default_link_color),
            draw_style: LineStyle::None,
            line_width: config.default_line_width,
            point_size: config.default_line_width,
            material_list: Vec::new(),
            override_material_list: Vec::new(),
        }
    }
}

/// A changed view property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewProperty {
    /// [`ViewProperties::selectable`].
    Selectable,
    /// [`ViewProperties::override_material`].
    OverrideMaterial,
    /// [`ViewProperties::shape_material`].
    ShapeMaterial,
    /// [`ViewProperties::material_list`].
    MaterialList,
    /// [`ViewProperties::override_material_list`].
    OverrideMaterialList,
    /// [`ViewProperties::draw_style`].
    DrawStyle,
    /// [`ViewProperties::line_width`].
    LineWidth,
    /// [`ViewProperties::point_size`].
    PointSize,
}

/// Access to the view properties of other link objects, used to carry
/// element materials across collapsing and expanding an array.
pub trait PeerViews {
    /// The view properties of a link object's provider.
    fn view_properties(&self, obj: ObjectId) -> Option<&ViewProperties>;
}

impl PeerViews for BTreeMap<ObjectId, ViewProperties> {
    fn view_properties(&self, obj: ObjectId) -> Option<&ViewProperties> {
        self.get(&obj)
    }
}

/// Material state to hand back to an element object's view.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementMaterial {
    /// The element object.
    pub object: ObjectId,
    /// New [`ViewProperties::override_material`], if any.
    pub override_material: Option<bool>,
    /// New [`ViewProperties::shape_material`], if any.
    pub shape_material: Option<Material>,
}

/// Side effects of a synchronization step for the document layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SyncOutcome {
    /// The tree icon should be refreshed.
    pub icon_changed: bool,
    /// Element views to update.
    pub element_materials: Vec<ElementMaterial>,
}

impl SyncOutcome {
    fn merge(&mut self, other: Self) {
        self.icon_changed |= other.icon_changed;
        self.element_materials.extend(other.element_materials);
    }
}

/// The view provider of one link object.
#[derive(Debug)]
pub struct LinkViewProvider {
    object: ObjectId,
    handle: HandleId,
    root: NodeId,
    transform: NodeId,
    mode_switch: NodeId,
    has_sub_name: bool,
    has_sub_element: bool,
    icon: &'static str,
    /// View-side properties. Call [`on_changed`](Self::on_changed) after
    /// modifying them.
    pub view: ViewProperties,
}

impl LinkViewProvider {
    /// Creates the provider of `object` with its own handle.
    ///
    /// Element objects start hidden.
    pub fn attach<T: TraceSink, S: LinkedObjectSource + ?Sized>(
        ctx: &mut LinkContext<T>,
        src: &mut S,
        object: ObjectId,
        props: &LinkProperties,
    ) -> Result<Self, LinkError> {
        let handle = ctx.create_handle();
        let link_root = ctx.link_root(handle)?;
        let graph = ctx.graph_mut();
        let root = graph.create_named(NodeKind::Separator, "link-view");
        let transform = graph.create_node(NodeKind::Transform(TransformParts::IDENTITY));
        let mode_switch = graph.create_named(NodeKind::Switch { which: Some(0) }, "display-mode");
        graph.add_child(root, transform);
        graph.add_child(root, mode_switch);
        graph.add_child(mode_switch, link_root);

        let mut provider = Self {
            object,
            handle,
            root,
            transform,
            mode_switch,
            has_sub_name: false,
            has_sub_element: false,
            icon: LINK_ICON,
            view: ViewProperties::new(ctx.config()),
        };
        provider.check_icon(props);
        if props.kind == ExtensionKind::Element {
            ctx.graph_mut().set_which(mode_switch, None);
        }
        ctx.set_owner(src, handle, Some(object))?;
        Ok(provider)
    }

    /// Destroys the handle and the provider's nodes.
    pub fn detach<T: TraceSink, S: LinkedObjectSource + ?Sized>(
        self,
        ctx: &mut LinkContext<T>,
        src: &mut S,
    ) -> Result<(), LinkError> {
        ctx.destroy_handle(src, self.handle)?;
        let graph = ctx.graph_mut();
        for node in [self.mode_switch, self.transform, self.root] {
            if graph.is_alive(node) {
                graph.remove_all_children(node);
                graph.destroy_node(node);
            }
        }
        Ok(())
    }

    /// The link object.
    #[must_use]
    pub fn object(&self) -> ObjectId {
        self.object
    }

    /// The provider's handle.
    #[must_use]
    pub fn handle(&self) -> HandleId {
        self.handle
    }

    /// Root of the provider's graph.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The provider's own transform node.
    #[must_use]
    pub fn transform_node(&self) -> NodeId {
        self.transform
    }

    /// The provider's display-mode switch.
    #[must_use]
    pub fn mode_switch(&self) -> NodeId {
        self.mode_switch
    }

    /// Whether the link addresses sub-objects.
    #[must_use]
    pub fn has_sub_name(&self) -> bool {
        self.has_sub_name
    }

    /// Whether the link addresses sub-elements.
    #[must_use]
    pub fn has_sub_element(&self) -> bool {
        self.has_sub_element
    }

    /// Name of the provider's own icon.
    #[must_use]
    pub fn icon_name(&self) -> &'static str {
        self.icon
    }

    /// Name of the overlay marking the link kind on the linked icon.
    #[must_use]
    pub fn overlay_name(&self) -> &'static str {
        if self.has_sub_element {
            "LinkSubElement"
        } else if self.has_sub_name {
            "LinkSubOverlay"
        } else {
            "LinkOverlay"
        }
    }

    /// The tree icon: the linked object's icon with the link overlay, or
    /// the provider's own icon when nothing is linked.
    pub fn icon<T: TraceSink, S: LinkedObjectSource + ?Sized>(
        &self,
        ctx: &mut LinkContext<T>,
        src: &S,
    ) -> Icon {
        let linked = ctx.linked_object(self.handle, false).ok().flatten();
        if linked.is_some_and(|obj| obj != self.object)
            && let Some(icon) = ctx.linked_icon(src, self.handle, Some(self.overlay_name()))
        {
            return icon;
        }
        Icon::named(self.icon)
    }

    /// Shows or hides the link.
    pub fn set_visible<T: TraceSink, S: LinkedObjectSource + ?Sized>(
        &self,
        ctx: &mut LinkContext<T>,
        src: &mut S,
        visible: bool,
    ) -> Result<(), LinkError> {
        ctx.graph_mut()
            .set_which(self.mode_switch, visible.then_some(0));
        ctx.set_handle_visible(src, self.handle, visible)
    }

    /// Applies a change of a link property.
    ///
    /// Ignored while the link object is being restored; see
    /// [`finish_restoring`](Self::finish_restoring).
    pub fn update_data<T: TraceSink, S: LinkedObjectSource + ?Sized, P: PeerViews + ?Sized>(
        &mut self,
        ctx: &mut LinkContext<T>,
        src: &mut S,
        peers: &P,
        props: &LinkProperties,
        prop: &LinkProperty,
    ) -> Result<SyncOutcome, LinkError> {
        if src.is_restoring(self.object) {
            return Ok(SyncOutcome::default());
        }
        self.apply(ctx, src, peers, props, prop)
    }

    /// Replays every property once loading finished.
    pub fn finish_restoring<T: TraceSink, S: LinkedObjectSource + ?Sized, P: PeerViews + ?Sized>(
        &mut self,
        ctx: &mut LinkContext<T>,
        src: &mut S,
        peers: &P,
        props: &LinkProperties,
    ) -> Result<SyncOutcome, LinkError> {
        ctx.set_draw_style(
            self.handle,
            self.view.draw_style,
            self.view.line_width,
            self.view.point_size,
        )?;
        let placement = if props.link_placement.is_some() {
            LinkProperty::LinkPlacement
        } else {
            LinkProperty::Placement
        };
        let mut outcome = SyncOutcome::default();
        for prop in [
            LinkProperty::LinkedObject,
            placement,
            LinkProperty::Scale,
            LinkProperty::ElementCount,
            LinkProperty::PlacementList {
                touched: Vec::new(),
            },
            LinkProperty::ElementList,
        ] {
            outcome.merge(self.apply(ctx, src, peers, props, &prop)?);
        }
        self.apply_material(ctx)?;
        Ok(outcome)
    }

    fn apply<T: TraceSink, S: LinkedObjectSource + ?Sized, P: PeerViews + ?Sized>(
        &mut self,
        ctx: &mut LinkContext<T>,
        src: &mut S,
        peers: &P,
        props: &LinkProperties,
        prop: &LinkProperty,
    ) -> Result<SyncOutcome, LinkError> {
        let h = self.handle;
        let mut outcome = SyncOutcome::default();
        match prop {
            LinkProperty::Recomputed => {
                if ctx.has_subs(h) {
                    ctx.update_link(src, h)?;
                }
            }
            LinkProperty::Scale => {
                let mut parts = ctx.graph().transform(self.transform);
                parts.scale = props.scale;
                ctx.graph_mut().set_transform(self.transform, parts);
                let [x, y, z] = props.scale;
                ctx.render_double_side(h, x * y * z < 0.0)?;
            }
            LinkProperty::Placement | LinkProperty::LinkPlacement => {
                let placement = match (prop, props.link_placement) {
                    (LinkProperty::Placement, None) => Some(props.placement),
                    (LinkProperty::LinkPlacement, link) => link,
                    _ => None,
                };
                if let Some(placement) = placement {
                    let mut parts = ctx.graph().transform(self.transform);
                    parts.translation = placement.translation;
                    parts.rotation = placement.rotation;
                    ctx.graph_mut().set_transform(self.transform, parts);
                }
            }
            LinkProperty::LinkedObject | LinkProperty::SubElements => {
                let subs = self.collect_subs(props);
                self.set_node_type(ctx, src, props)?;
                ctx.set_link(src, h, props.linked_object, subs.as_slice())?;
                outcome.icon_changed = true;
            }
            LinkProperty::LinkTransform => self.set_node_type(ctx, src, props)?,
            LinkProperty::ElementCount => {
                if !props.show_element {
                    ctx.set_size(src, h, props.element_count)?;
                    if props.placement_list.is_some() {
                        self.update_element_transforms(ctx, props, &[])?;
                        self.update_element_visibility(ctx, props, &[]);
                    }
                }
                outcome.icon_changed = self.check_icon(props);
            }
            LinkProperty::ShowElement => {
                if !props.show_element && !props.element_list.is_empty() {
                    self.collapse_element_materials(peers, props);
                    ctx.set_size(src, h, props.element_count)?;
                    self.apply_material(ctx)?;
                }
            }
            LinkProperty::PlacementList { touched } | LinkProperty::ScaleList { touched } => {
                if ctx.size(h) > 0 && !props.show_element && props.placement_list.is_some() {
                    self.update_element_transforms(ctx, props, touched)?;
                }
            }
            LinkProperty::VisibilityList { touched } => {
                self.update_element_visibility(ctx, props, touched);
            }
            LinkProperty::ElementList => {
                if props.show_element {
                    outcome.element_materials = self.expand_element_materials(props);
                    ctx.set_children(
                        src,
                        h,
                        &props.element_list,
                        &props.visibility_list,
                        crate::cache::SnapshotKind::Visible,
                    )?;
                }
                outcome.icon_changed = self.check_icon(props);
            }
        }
        Ok(outcome)
    }

    /// Applies a change of a view property.
    pub fn on_changed<T: TraceSink, S: LinkedObjectSource + ?Sized>(
        &mut self,
        ctx: &mut LinkContext<T>,
        src: &S,
        prop: ViewProperty,
    ) -> Result<(), LinkError> {
        if src.is_restoring(self.object) {
            return Ok(());
        }
        let h = self.handle;
        match prop {
            ViewProperty::Selectable => {}
            ViewProperty::OverrideMaterial => {
                if self.view.override_material {
                    self.apply_material(ctx)?;
                } else {
                    ctx.set_material(h, None, None)?;
                    for i in 0..ctx.size(h) {
                        ctx.set_material(h, Some(i), None)?;
                    }
                }
            }
            ViewProperty::ShapeMaterial => {
                if self.view.override_material {
                    ctx.set_material(h, None, Some(&self.view.shape_material))?;
                }
            }
            ViewProperty::MaterialList | ViewProperty::OverrideMaterialList => {
                self.apply_material(ctx)?;
            }
            ViewProperty::DrawStyle | ViewProperty::LineWidth | ViewProperty::PointSize => {
                ctx.set_draw_style(
                    h,
                    self.view.draw_style,
                    self.view.line_width,
                    self.view.point_size,
                )?;
            }
        }
        Ok(())
    }

    /// Objects shown below the link in the tree.
    ///
    /// A plain array claims the linked object, since its slots are not
    /// objects. Groups and arrays with element objects claim the elements.
    /// A plain link passes on the linked object's own children.
    pub fn claim_children<T: TraceSink, S: LinkedObjectSource + ?Sized>(
        &self,
        ctx: &LinkContext<T>,
        src: &S,
        props: &LinkProperties,
    ) -> Vec<ObjectId> {
        if !props.show_element && props.element_count > 0 {
            return self.true_linked(ctx).into_iter().collect();
        }
        if props.has_elements() || props.is_group() {
            return props.element_list.clone();
        }
        if !self.has_sub_name
            && let Some(linked) = self.true_linked(ctx)
        {
            return src.claim_children(linked);
        }
        Vec::new()
    }

    /// Names what `pick` hit, with element objects named instead of array
    /// slots.
    pub fn element_picked<T: TraceSink, S: LinkedObjectSource + ?Sized>(
        &self,
        ctx: &LinkContext<T>,
        src: &S,
        props: &LinkProperties,
        pick: &PickedPoint,
    ) -> Option<String> {
        if !self.view.selectable {
            return None;
        }
        let name = ctx.element_picked(src, self.handle, pick)?;
        if !(props.is_group() || props.has_elements()) {
            return Some(name);
        }
        let (index, rest) = array_index(&name)?;
        let element = src.name(*props.element_list.get(index)?)?;
        Some(alloc::format!("{element}.{rest}"))
    }

    /// Resolves `sub` below the provider root, appending the nodes it
    /// addresses to `path`. Element objects may be named instead of array
    /// slots. On failure `path` is restored.
    pub fn detail_path<T: TraceSink, S: LinkedObjectSource + ?Sized>(
        &self,
        ctx: &LinkContext<T>,
        src: &S,
        props: &LinkProperties,
        sub: &str,
        path: &mut ScenePath,
    ) -> Option<Detail> {
        let len = path.len();
        path.append(ctx.graph(), self.root);
        path.append(ctx.graph(), self.mode_switch);

        let mut indexed = None;
        if !sub.is_empty()
            && (props.is_group() || props.has_elements())
            && array_index(sub).is_none()
        {
            indexed = props.element_list.iter().enumerate().find_map(|(i, &obj)| {
                let rest = check_subname(src.name(obj)?, sub)?;
                Some(alloc::format!("{i}.{rest}"))
            });
        }
        let sub = indexed.as_deref().unwrap_or(sub);
        let found = ctx.detail_path(src, self.handle, sub, path);
        if found.is_none() {
            path.truncate(len);
        }
        found
    }

    fn true_linked<T: TraceSink>(&self, ctx: &LinkContext<T>) -> Option<ObjectId> {
        ctx.linked_object(self.handle, true)
            .ok()
            .flatten()
            .filter(|&obj| obj != self.object)
    }

    fn collect_subs(&mut self, props: &LinkProperties) -> Vec<String> {
        let prefix = props.sub_name.as_str();
        let mut subs = Vec::new();
        self.has_sub_element = false;
        if let Some(element) = &props.sub_element {
            self.has_sub_element = true;
            subs.push(alloc::format!("{prefix}{element}"));
        }
        for element in props.sub_elements.iter().filter(|s| !s.is_empty()) {
            self.has_sub_element = true;
            subs.push(alloc::format!("{prefix}{element}"));
        }
        if subs.is_empty() && !prefix.is_empty() {
            subs.push(prefix.into());
        }
        self.has_sub_name = !subs.is_empty();
        subs
    }

    fn set_node_type<T: TraceSink, S: LinkedObjectSource + ?Sized>(
        &self,
        ctx: &mut LinkContext<T>,
        src: &mut S,
        props: &LinkProperties,
    ) -> Result<(), LinkError> {
        if props.is_group() {
            return Ok(());
        }
        let node_type = match (self.has_sub_name, props.link_transform) {
            (true, true) => NodeType::Container,
            (true, false) => NodeType::ContainerTransform,
            (false, true) => NodeType::Snapshot(crate::cache::SnapshotKind::Visible),
            (false, false) => NodeType::Snapshot(crate::cache::SnapshotKind::Transform),
        };
        ctx.set_node_type(src, self.handle, node_type, true)
    }

    /// Returns whether the icon changed.
    fn check_icon(&mut self, props: &LinkProperties) -> bool {
        let icon = match props.kind {
            ExtensionKind::Element => LINK_ELEMENT_ICON,
            ExtensionKind::Group => LINK_GROUP_ICON,
            ExtensionKind::Link if props.element_count > 0 => LINK_ARRAY_ICON,
            ExtensionKind::Link => LINK_ICON,
        };
        let changed = icon != self.icon;
        self.icon = icon;
        changed
    }

    fn update_element_transforms<T: TraceSink>(
        &self,
        ctx: &mut LinkContext<T>,
        props: &LinkProperties,
        touched: &[usize],
    ) -> Result<(), LinkError> {
        for i in touched_slots(ctx.size(self.handle), touched) {
            ctx.set_transform(self.handle, Some(i), &props.element_matrix(i))?;
        }
        Ok(())
    }

    fn update_element_visibility<T: TraceSink>(
        &self,
        ctx: &mut LinkContext<T>,
        props: &LinkProperties,
        touched: &[usize],
    ) {
        for i in touched_slots(ctx.size(self.handle), touched) {
            let visible = props.visibility_list.get(i).copied().unwrap_or(true);
            ctx.set_element_visible(self.handle, i, visible);
        }
    }

    /// Folds the element objects' materials into the material lists before
    /// the elements go away.
    fn collapse_element_materials<P: PeerViews + ?Sized>(
        &mut self,
        peers: &P,
        props: &LinkProperties,
    ) {
        let count = props.element_list.len();
        let mut materials = Vec::with_capacity(count);
        let mut overrides = alloc::vec![false; count];
        let mut any_override = false;
        let mut any_material = false;
        for (i, &obj) in props.element_list.iter().enumerate() {
            let Some(peer) = peers.view_properties(obj) else {
                materials.push(self.view.shape_material);
                continue;
            };
            any_override |= peer.override_material;
            any_material |= any_override || peer.shape_material != self.view.shape_material;
            materials.push(peer.shape_material);
            overrides[i] = peer.override_material;
        }
        if !any_override {
            overrides.clear();
        }
        if !any_material {
            materials.clear();
        }
        self.view.override_material_list = overrides;
        self.view.material_list = materials;
    }

    /// Hands the material lists back to the element objects and clears
    /// them.
    fn expand_element_materials(&mut self, props: &LinkProperties) -> Vec<ElementMaterial> {
        if self.view.override_material_list.is_empty() && self.view.material_list.is_empty() {
            return Vec::new();
        }
        let out = props
            .element_list
            .iter()
            .enumerate()
            .map(|(i, &object)| ElementMaterial {
                object,
                override_material: self.view.override_material_list.get(i).copied(),
                shape_material: self.view.material_list.get(i).copied(),
            })
            .collect();
        self.view.override_material_list.clear();
        self.view.material_list.clear();
        out
    }

    fn apply_material<T: TraceSink>(&self, ctx: &mut LinkContext<T>) -> Result<(), LinkError> {
        let h = self.handle;
        if self.view.override_material {
            ctx.set_material(h, None, Some(&self.view.shape_material))?;
        }
        for i in 0..ctx.size(h) {
            if self.view.override_material_list.get(i) == Some(&true)
                && let Some(material) = self.view.material_list.get(i)
            {
                ctx.set_material(h, Some(i), Some(material))?;
            }
        }
        Ok(())
    }
}

/// Slots below `size` named in `touched`, or every slot when none are.
fn touched_slots(size: usize, touched: &[usize]) -> impl Iterator<Item = usize> + '_ {
    (0..size).filter(move |i| touched.is_empty() || touched.contains(i))
}
