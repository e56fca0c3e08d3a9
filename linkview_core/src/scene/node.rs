// Copyright 2026 the Linkview Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node kinds and their property payloads.

use crate::transform::{Transform3d, TransformParts};

/// An RGB triple with components in `0.0..=1.0`.
pub type Color = [f32; 3];

/// Surface material values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    /// Ambient reflectance.
    pub ambient: Color,
    /// Diffuse color.
    pub diffuse: Color,
    /// Specular reflectance.
    pub specular: Color,
    /// Emitted light.
    pub emissive: Color,
    /// Shininess in `0.0..=1.0`.
    pub shininess: f32,
    /// Transparency in `0.0..=1.0`.
    pub transparency: f32,
}

impl Material {
    /// The default gray material.
    pub const DEFAULT: Self = Self {
        ambient: [0.2, 0.2, 0.2],
        diffuse: [0.8, 0.8, 0.8],
        specular: [0.0, 0.0, 0.0],
        emissive: [0.0, 0.0, 0.0],
        shininess: 0.2,
        transparency: 0.0,
    };

    /// The default material with its diffuse color replaced by a packed
    /// `0xRRGGBBAA` value. The alpha byte is ignored.
    #[must_use]
    pub fn with_packed_diffuse(packed: u32) -> Self {
        let channel = |shift: u32| ((packed >> shift) & 0xff) as f32 / 255.0;
        Self {
            diffuse: [channel(24), channel(16), channel(8)],
            ..Self::DEFAULT
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Line styles selectable for a link's draw style override.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LineStyle {
    /// No override.
    #[default]
    None,
    /// Continuous lines.
    Solid,
    /// Long dashes.
    Dashed,
    /// Short dashes.
    Dotted,
    /// Alternating dash and dot.
    Dashdot,
}

impl LineStyle {
    /// The 16-bit stipple pattern for this style.
    #[must_use]
    pub const fn pattern(self) -> u16 {
        match self {
            Self::Dashed => 0xf00f,
            Self::Dotted => 0x0f0f,
            Self::Dashdot => 0xff88,
            Self::None | Self::Solid => 0xffff,
        }
    }
}

/// Payload of a material node.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MaterialNode {
    /// Whether the values override materials further down the graph.
    pub is_override: bool,
    /// The material values.
    pub values: Material,
}

/// Payload of a draw style node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawStyleNode {
    /// Whether the style overrides draw styles further down the graph.
    pub is_override: bool,
    /// Line width in pixels.
    pub line_width: f32,
    /// Point size in pixels.
    pub point_size: f32,
    /// 16-bit line stipple pattern.
    pub line_pattern: u16,
}

impl Default for DrawStyleNode {
    fn default() -> Self {
        Self {
            is_override: false,
            line_width: 1.0,
            point_size: 1.0,
            line_pattern: 0xffff,
        }
    }
}

/// Payload of a shape hints node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShapeHintsNode {
    /// Whether the hints override hints further down the graph.
    pub is_override: bool,
    /// Render back faces with two-sided lighting.
    pub double_sided: bool,
}

/// An axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: [f64; 3],
    /// Maximum corner.
    pub max: [f64; 3],
}

impl Aabb {
    /// Creates a box from two corners, normalizing their order per axis.
    #[must_use]
    pub fn new(a: [f64; 3], b: [f64; 3]) -> Self {
        let mut min = a;
        let mut max = b;
        for i in 0..3 {
            if min[i] > max[i] {
                core::mem::swap(&mut min[i], &mut max[i]);
            }
        }
        Self { min, max }
    }

    /// Returns the smallest box containing both boxes.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        let mut out = self;
        for i in 0..3 {
            out.min[i] = out.min[i].min(other.min[i]);
            out.max[i] = out.max[i].max(other.max[i]);
        }
        out
    }

    /// Returns the box enclosing this box after mapping through `t`.
    #[must_use]
    pub fn transformed(self, t: &Transform3d) -> Self {
        let mut out: Option<Self> = None;
        for corner in 0..8 {
            let p = [
                if corner & 1 == 0 { self.min[0] } else { self.max[0] },
                if corner & 2 == 0 { self.min[1] } else { self.max[1] },
                if corner & 4 == 0 { self.min[2] } else { self.max[2] },
            ];
            let q = t.transform_point(p);
            let b = Self { min: q, max: q };
            out = Some(match out {
                Some(acc) => acc.union(b),
                None => b,
            });
        }
        out.unwrap_or(self)
    }
}

/// What a node is, together with its kind-specific payload.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeKind {
    /// Groups children and scopes the traversal state they change.
    Separator,
    /// Groups children without scoping traversal state.
    Group,
    /// A separator that also records secondary selection highlights.
    SelectionRoot,
    /// Traverses at most one child.
    Switch {
        /// The selected child, or `None` to traverse nothing.
        which: Option<usize>,
    },
    /// Applies a transform to subsequent siblings.
    Transform(TransformParts),
    /// Sets the material for subsequent siblings.
    Material(MaterialNode),
    /// Sets line and point styling for subsequent siblings.
    DrawStyle(DrawStyleNode),
    /// Sets shape hints for subsequent siblings.
    ShapeHints(ShapeHintsNode),
    /// Renderable geometry.
    Shape {
        /// Local-space bounds of the geometry.
        bounds: Aabb,
    },
}

impl NodeKind {
    /// A switch that selects nothing.
    pub const EMPTY_SWITCH: Self = Self::Switch { which: None };

    /// Whether nodes of this kind may have children.
    #[must_use]
    pub const fn is_group(&self) -> bool {
        matches!(
            self,
            Self::Separator | Self::Group | Self::SelectionRoot | Self::Switch { .. }
        )
    }

    /// Whether traversal state changed below this node stays below it.
    #[must_use]
    pub const fn scopes_state(&self) -> bool {
        matches!(self, Self::Separator | Self::SelectionRoot)
    }

    /// A short lowercase label used in diagnostics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Separator => "separator",
            Self::Group => "group",
            Self::SelectionRoot => "selection-root",
            Self::Switch { .. } => "switch",
            Self::Transform(_) => "transform",
            Self::Material(_) => "material",
            Self::DrawStyle(_) => "draw-style",
            Self::ShapeHints(_) => "shape-hints",
            Self::Shape { .. } => "shape",
        }
    }
}
