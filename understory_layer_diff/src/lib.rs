// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_layer_diff --heading-base-level=0

//! Understory Layer Diff: damage computation by diffing retained layer trees.
//!
//! A retained renderer keeps the previous frame's layer tree around. Walking
//! the new tree and the old one in lock step tells it which device pixels
//! actually changed, so it can repaint only those.
//!
//! This crate provides the walk state, independent of any particular layer
//! implementation:
//!
//! - [`DiffContext`]: the transform/cull stack, per-subtree dirtiness, the
//!   append-only list of painted rects, readbacks, and running damage.
//! - [`PaintRegion`] / [`PaintRegionMap`]: where each layer painted, kept
//!   from one frame to the next.
//! - [`Damage`]: the final pixel rectangles for the frame and the target buffer.
//! - [`DiffStatistics`] and the [`DiffTrace`] sink for explaining a pass.
//!
//! ## Minimal example
//!
//! ```rust
//! use kurbo::Rect;
//! use understory_layer_diff::{DiffContext, LayerId, PaintRegionMap};
//! use understory_matrix_clip::{IntRect, IntSize};
//!
//! let frame = IntSize::new(1000, 1000);
//! let layer = LayerId::next();
//!
//! // Draw one layer at 100x100 in the first frame.
//! let empty = PaintRegionMap::new();
//! let mut first = DiffContext::new(frame, &empty, false, false);
//! first.with_subtree(|ctx| {
//!     ctx.mark_subtree_dirty(&ctx.old_layer_paint_region(layer));
//!     ctx.add_layer_bounds(Rect::new(0.0, 0.0, 100.0, 100.0));
//!     let region = ctx.current_subtree_region();
//!     ctx.set_layer_paint_region(layer, region);
//! });
//! let previous = first.into_paint_regions();
//!
//! // The layer grows; damage covers both the old and the new footprint.
//! let mut second = DiffContext::new(frame, &previous, false, false);
//! second.with_subtree(|ctx| {
//!     let old = ctx.old_layer_paint_region(layer);
//!     ctx.mark_subtree_dirty(&old);
//!     ctx.add_layer_bounds(Rect::new(0.0, 0.0, 200.0, 150.0));
//! });
//! let damage = second.compute_damage(IntRect::ZERO, 1, 1);
//! assert_eq!(damage.frame_damage, IntRect::new(0, 0, 200, 150));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod context;
mod damage;
mod paint_region;
mod statistics;
pub mod trace;

pub use context::{DiffContext, FilterBoundsAdjustment};
pub use damage::Damage;
pub use paint_region::{LayerId, PaintRegion, PaintRegionMap, RegionFlags, SubtreeRegion};
pub use statistics::DiffStatistics;
pub use trace::{DiffEvent, DiffRecorder, DiffTrace};
