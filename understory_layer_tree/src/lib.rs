// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_layer_tree --heading-base-level=0

//! Understory Layer Tree: retained compositing layers.
//!
//! A frame is described by an immutable tree of [`Layer`]s shared through
//! `Arc`. Building the next frame reuses the `Arc`s of everything that did
//! not change, which lets the diff skip whole subtrees.
//!
//! Every layer takes part in three passes:
//!
//! - **diff** against the previous frame's tree through a
//!   [`DiffContext`](understory_layer_diff::DiffContext), recording where it
//!   paints and what changed;
//! - **preroll**, collecting what the compositor must know up front (for
//!   example whether anything reads back from the surface);
//! - **paint** into a [`Canvas`].
//!
//! Provided layers:
//!
//! - [`ContainerLayer`]: groups children; also embedded by every layer with children.
//! - [`PictureLayer`]: draws a shared [`Picture`].
//! - [`TransformLayer`], [`OpacityLayer`], [`ClipLayer`].
//! - [`ImageFilterLayer`] and [`BackdropFilterLayer`] with [`ImageFilter`].
//! - [`TextureLayer`] for externally produced content.
//!
//! ## Identity
//!
//! Each layer instance has a [`unique_id`](Layer::unique_id). A layer built to
//! replace one from the previous frame carries over its
//! [`original_layer_id`](Layer::original_layer_id) (see
//! [`PictureLayer::replacing`] and [`ContainerLayer::replacing`]); that is
//! how the diff pairs old and new children.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use kurbo::{Point, Rect};
//! use peniko::Color;
//! use understory_layer_diff::{DiffContext, PaintRegionMap};
//! use understory_layer_tree::{ContainerLayer, Layer, LayerTree, Picture, PictureLayer, PictureOp};
//! use understory_matrix_clip::{IntRect, IntSize};
//!
//! let square = |size: f64| {
//!     Arc::new(Picture::new(vec![PictureOp::FillRect {
//!         rect: Rect::new(0.0, 0.0, size, size),
//!         color: Color::WHITE,
//!     }]))
//! };
//! let frame = IntSize::new(400, 400);
//!
//! let a: Arc<dyn Layer> = Arc::new(PictureLayer::new(Point::new(0.0, 0.0), square(10.0)));
//! let b: Arc<dyn Layer> = Arc::new(PictureLayer::new(Point::new(100.0, 0.0), square(10.0)));
//! let first = LayerTree::new(
//!     Some(Arc::new(ContainerLayer::new(vec![a.clone(), b.clone()]))),
//!     frame,
//! )
//! .unwrap();
//! let empty = PaintRegionMap::new();
//! let mut ctx = DiffContext::new(frame, &empty, false, false);
//! first.diff(&mut ctx, None);
//! let regions = ctx.into_paint_regions();
//!
//! // Grow `a`; keep `b` as is.
//! let grown: Arc<dyn Layer> =
//!     Arc::new(PictureLayer::new(Point::new(0.0, 0.0), square(20.0)).replacing(&*a));
//! let root = ContainerLayer::new(vec![grown, b]).replacing(&**first.root().unwrap());
//! let second = LayerTree::new(Some(Arc::new(root)), frame).unwrap();
//! let mut ctx = DiffContext::new(frame, &regions, false, false);
//! second.diff(&mut ctx, Some(&first));
//! let damage = ctx.compute_damage(IntRect::ZERO, 1, 1);
//! assert_eq!(damage.frame_damage, IntRect::new(0, 0, 20, 20));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod canvas;
mod clip;
mod container;
mod context;
mod filter;
mod layer;
mod picture;
mod texture;
mod transform;
mod tree;

pub use canvas::{Canvas, CanvasOp, RecordingCanvas, SaveLayer};
pub use clip::{ClipBehavior, ClipLayer, ClipShape};
pub use container::ContainerLayer;
pub use context::{PaintContext, PrerollContext};
pub use filter::{BackdropFilterLayer, ImageFilter, ImageFilterLayer};
pub use layer::{Layer, LayerIdentity, downcast_layer};
pub use picture::{MAX_OPS_TO_COMPARE, Picture, PictureLayer, PictureOp};
pub use texture::TextureLayer;
pub use transform::{OpacityLayer, TransformLayer};
pub use tree::{FrameSizeError, LayerTree, PrerollResult};

pub use understory_layer_diff::LayerId;

pub(crate) use layer::{mark_dirty_if, old_as};
