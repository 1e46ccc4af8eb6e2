// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_frame_damage --heading-base-level=0

//! Understory Frame Damage: partial repaint for retained layer trees.
//!
//! Each frame, [`FrameDamage`] diffs the new [`LayerTree`](understory_layer_tree::LayerTree)
//! against the last painted one and reports the smallest pixel rect that
//! must be repainted. [`CompositorContext`] drives a whole frame around
//! that: damage, admission control, preroll, the embedder's say, and paint.
//!
//! - [`FrameDamage`] and [`RetainedFrame`]: damage against the previous frame.
//! - [`should_perform_partial_repaint`]: whether a clip is worth using.
//! - [`DamageHistory`]: per-buffer damage for surfaces that cycle buffers.
//! - [`CompositorContext`] / [`ScopedFrame`]: the frame driver.
//! - [`FrameTimer`]: raster timings in host ticks.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use kurbo::{Point, Rect};
//! use peniko::Color;
//! use understory_frame_damage::{
//!     CompositorConfig, CompositorContext, FramebufferInfo, RasterStatus,
//! };
//! use understory_layer_tree::{Layer, LayerTree, Picture, PictureLayer, PictureOp, RecordingCanvas};
//! use understory_matrix_clip::{IntRect, IntSize};
//!
//! let square = |size: f64| {
//!     Arc::new(Picture::new(vec![PictureOp::FillRect {
//!         rect: Rect::new(0.0, 0.0, size, size),
//!         color: Color::WHITE,
//!     }]))
//! };
//! let frame = IntSize::new(1000, 1000);
//! let mut compositor = CompositorContext::new(CompositorConfig::default());
//! let buffer = FramebufferInfo::partial(IntRect::ZERO);
//!
//! // The first frame has nothing to diff against.
//! let small: Arc<dyn Layer> = Arc::new(PictureLayer::new(Point::ZERO, square(100.0)));
//! let first = Arc::new(LayerTree::new(Some(small.clone()), frame).unwrap());
//! let mut scoped = compositor.acquire_frame(0);
//! assert_eq!(
//!     scoped.raster(&first, &buffer, &mut RecordingCanvas::new(), None),
//!     RasterStatus::Success
//! );
//! assert_eq!(scoped.submit_info().frame_damage, Some(IntRect::new(0, 0, 1000, 1000)));
//! scoped.finish(16);
//!
//! // Growing the layer damages its old and new bounds.
//! let large: Arc<dyn Layer> =
//!     Arc::new(PictureLayer::new(Point::ZERO, square(150.0)).replacing(&*small));
//! let second = Arc::new(LayerTree::new(Some(large), frame).unwrap());
//! let mut scoped = compositor.acquire_frame(16);
//! scoped.raster(&second, &buffer, &mut RecordingCanvas::new(), None);
//! assert_eq!(scoped.submit_info().frame_damage, Some(IntRect::new(0, 0, 150, 150)));
//! scoped.finish(20);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod compositor;
mod config;
mod frame_damage;
mod history;
mod partial_repaint;
mod timer;

pub use compositor::{
    CompositorContext, ExternalViewEmbedder, PostPrerollResult, RasterStatus, ScopedFrame,
    SubmitInfo,
};
pub use config::{CompositorConfig, FramebufferInfo};
pub use frame_damage::{FrameDamage, RetainedFrame};
pub use history::DamageHistory;
pub use partial_repaint::{
    DEFAULT_PARTIAL_REPAINT_THRESHOLD, partial_repaint_admitted, should_perform_partial_repaint,
};
pub use timer::{DEFAULT_LAP_LIMIT, FrameTimer};
