// Copyright 2026 the Linkview Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! The scene graph uses multi-channel dirty tracking (via
//! [`understory_dirty`]) to report which parts of the graph a renderer has
//! to revisit. Each channel represents an independent category of change.
//!
//! # Propagation semantics
//!
//! Every edge adds a dependency from the parent onto the child, so marking a
//! node with [`EagerPolicy`](understory_dirty::EagerPolicy) also marks every
//! ancestor. A snapshot sub-tree shared by several link roots therefore
//! reports all of those roots when it is rebuilt.
//!
//! # Consumption
//!
//! [`NodeStore::evaluate`](crate::scene::NodeStore::evaluate) drains all
//! channels and surfaces the results as
//! [`GraphChanges`](crate::scene::GraphChanges).

use understory_dirty::Channel;

/// Children were added, removed or replaced.
pub const STRUCTURE: Channel = Channel::new(0);

/// A switch node selected a different child.
pub const SWITCH: Channel = Channel::new(1);

/// A transform node changed.
pub const TRANSFORM: Channel = Channel::new(2);

/// A material, draw style or shape hints node changed.
pub const MATERIAL: Channel = Channel::new(3);

/// Selection highlights recorded on a selection root changed.
pub const SELECTION: Channel = Channel::new(4);

/// All channels, in drain order.
pub const ALL: [Channel; 5] = [STRUCTURE, SWITCH, TRANSFORM, MATERIAL, SELECTION];
