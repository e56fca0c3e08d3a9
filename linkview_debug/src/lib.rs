// Copyright 2026 the Linkview Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, and Chrome trace export for linkview
//! diagnostics.
//!
//! This crate provides [`TraceSink`](linkview_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`]: compact binary recording with
//!   [`recorder::decode`] for playback.
//! - [`chrome::export`]: writes Chrome Trace Event Format JSON from recorded
//!   bytes.
//!
//! [`dump`] renders a scene graph as an indented tree, which is the quickest
//! way to see what a link handle currently shows.

pub mod chrome;
pub mod dump;
pub mod pretty;
pub mod recorder;
