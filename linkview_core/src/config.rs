// Copyright 2026 the Linkview Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Process-wide link configuration.

/// Settings resolved once at startup and passed to
/// [`LinkContext::new`](crate::LinkContext::new).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinkConfig {
    /// Edge length in pixels of composited link icons.
    pub icon_size: u32,
    /// How many nested links [`linked_object`] follows before giving up.
    ///
    /// [`linked_object`]: crate::LinkContext::linked_object
    pub max_link_depth: usize,
    /// Packed `0xRRGGBBAA` diffuse color of a link's override material.
    pub default_link_color: u32,
    /// Default line width and point size for draw style overrides.
    pub default_line_width: f32,
}

impl LinkConfig {
    /// Desktop defaults.
    #[must_use]
    pub const fn desktop() -> Self {
        Self {
            icon_size: 16,
            max_link_depth: 100,
            default_link_color: 0x66FF_FF00,
            default_line_width: 2.0,
        }
    }

    /// Defaults for high-density displays.
    #[must_use]
    pub const fn hidpi() -> Self {
        Self {
            icon_size: 32,
            ..Self::desktop()
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::desktop()
    }
}
