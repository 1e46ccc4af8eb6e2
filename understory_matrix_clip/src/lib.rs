// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_matrix_clip --heading-base-level=0

//! Understory Matrix Clip: transform and cull-rect tracking for tree walks.
//!
//! Renderers and damage trackers that walk a retained tree depth-first need
//! to know, at every node, the composed local-to-device transform and the
//! device-space area that clips still leave visible. This crate provides:
//!
//! - [`Matrix`]: a column-major 4×4 transform with projective rect mapping.
//! - [`MatrixClipState`]: transform plus device cull rect, clip operations,
//!   and "does this shape cover the cull rect" predicates.
//! - [`MatrixClipTracker`]: a save/restore stack over [`MatrixClipState`].
//! - [`IntRect`] / [`IntSize`]: pixel-grid geometry for damage rectangles.
//! - [`rect`]: helpers for Kurbo rectangles where zero-area means empty.
//!
//! ## Conservative by construction
//!
//! The cull rect is always a superset of the truly visible area. Clips are
//! folded in through their device-space bounding boxes, difference clips are
//! ignored, and queries that cannot be answered soundly (for example the
//! local cull rect under perspective) answer "cull nothing" with
//! [`rect::GIANT_RECT`]. Coverage predicates err the other way: they may
//! report that a rotated shape does not cover the cull rect even when it
//! does, but never the reverse.
//!
//! ```rust
//! use kurbo::Rect;
//! use understory_matrix_clip::{ClipOp, Matrix, MatrixClipTracker};
//!
//! let mut tracker = MatrixClipTracker::new(Rect::new(0.0, 0.0, 800.0, 600.0));
//! tracker.save();
//! tracker.current_mut().transform(&Matrix::translate(100.0, 100.0));
//! tracker
//!     .current_mut()
//!     .clip_rect(Rect::new(0.0, 0.0, 50.0, 50.0), ClipOp::Intersect, true);
//! assert_eq!(
//!     tracker.current().device_cull_rect(),
//!     Rect::new(100.0, 100.0, 150.0, 150.0)
//! );
//! tracker.restore();
//! assert_eq!(
//!     tracker.current().device_cull_rect(),
//!     Rect::new(0.0, 0.0, 800.0, 600.0)
//! );
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod int_rect;
mod matrix;
pub mod rect;
mod state;
mod tracker;

pub use int_rect::{IntRect, IntSize};
pub use matrix::Matrix;
pub use state::{ClipOp, MatrixClipState};
pub use tracker::MatrixClipTracker;
