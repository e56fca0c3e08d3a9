// Copyright 2026 the Linkview Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Usage errors reported by link operations.
//!
//! Only caller mistakes surface as [`LinkError`]. Failing to resolve a name,
//! a pick or a vanished object is reported as `None`/`false` by the
//! operation itself, and graph consistency violations panic.

use crate::handle::HandleId;

/// A rejected link operation. State is left unchanged.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    /// A raw node type outside `-2..=2`.
    #[error("invalid node type {0}")]
    InvalidNodeType(i32),
    /// A raw snapshot kind outside `0..=2`.
    #[error("invalid snapshot kind {0}")]
    InvalidSnapshotKind(i32),
    /// An element index past the end of the element array.
    #[error("element index {index} out of range (size {len})")]
    IndexOutOfRange {
        /// The rejected index.
        index: usize,
        /// The current element count.
        len: usize,
    },
    /// Following nested links did not terminate within the configured depth.
    #[error("link chain deeper than {0}")]
    LinkDepthExceeded(usize),
    /// The handle was destroyed or never existed.
    #[error("unknown link handle {0:?}")]
    UnknownHandle(HandleId),
}
