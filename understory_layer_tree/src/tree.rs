// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One frame's layer tree.

use alloc::sync::Arc;
use core::fmt;

use kurbo::Rect;
use understory_layer_diff::DiffContext;
use understory_matrix_clip::{IntRect, IntSize};

use crate::{Canvas, Layer, PaintContext, PrerollContext};

/// Frame dimensions that cannot describe a surface.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct FrameSizeError {
    /// The rejected size.
    pub size: IntSize,
}

impl fmt::Debug for FrameSizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FrameSizeError {{ width: {}, height: {} }}",
            self.size.width, self.size.height
        )
    }
}

impl fmt::Display for FrameSizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frame size {}x{} has a negative dimension",
            self.size.width, self.size.height
        )
    }
}

impl core::error::Error for FrameSizeError {}

/// What preroll found out about a frame.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PrerollResult {
    /// Some layer reads back from the surface while painting.
    pub surface_needs_readback: bool,
    /// A texture layer is visible.
    pub has_texture_layer: bool,
}

/// A frame's layer tree: an optional root and the frame size in pixels.
#[derive(Clone, Debug)]
pub struct LayerTree {
    root: Option<Arc<dyn Layer>>,
    frame_size: IntSize,
}

impl LayerTree {
    /// Creates a tree.
    ///
    /// A zero-sized frame is accepted and paints nothing.
    ///
    /// # Errors
    ///
    /// Returns [`FrameSizeError`] if either dimension is negative.
    pub fn new(root: Option<Arc<dyn Layer>>, frame_size: IntSize) -> Result<Self, FrameSizeError> {
        if frame_size.width < 0 || frame_size.height < 0 {
            return Err(FrameSizeError { size: frame_size });
        }
        Ok(Self { root, frame_size })
    }

    /// The root layer, if any.
    #[must_use]
    pub fn root(&self) -> Option<&Arc<dyn Layer>> {
        self.root.as_ref()
    }

    /// Frame size in pixels.
    #[must_use]
    pub fn frame_size(&self) -> IntSize {
        self.frame_size
    }

    /// The whole frame as a device rect.
    #[must_use]
    pub fn frame_rect(&self) -> Rect {
        IntRect::from_size(self.frame_size).to_rect()
    }

    /// Diffs the root against `old`'s root.
    ///
    /// Pass `None` to diff against an empty previous frame.
    pub fn diff(&self, ctx: &mut DiffContext<'_>, old: Option<&Self>) {
        let Some(root) = &self.root else {
            return;
        };
        let old_root = old.and_then(|old| old.root.as_deref());
        root.diff(ctx, old_root);
    }

    /// Runs preroll over the tree, culled to the device rect `cull_rect`.
    #[must_use]
    pub fn preroll(&self, cull_rect: Rect) -> PrerollResult {
        let mut ctx = PrerollContext::new(cull_rect);
        if let Some(root) = &self.root {
            root.preroll(&mut ctx);
        }
        PrerollResult {
            surface_needs_readback: ctx.surface_needs_readback(),
            has_texture_layer: ctx.has_texture_layer(),
        }
    }

    /// Paints the tree into `canvas`, culled to the device rect `cull_rect`.
    pub fn paint(&self, canvas: &mut dyn Canvas, cull_rect: Rect) {
        self.paint_with_integral_transform(canvas, cull_rect, false);
    }

    /// Like [`paint`](Self::paint), optionally snapping raster-cached layers
    /// to whole pixels.
    ///
    /// Pass the same answer the diff used, so painted pixels match the
    /// recorded paint regions.
    pub fn paint_with_integral_transform(
        &self,
        canvas: &mut dyn Canvas,
        cull_rect: Rect,
        integral_transform: bool,
    ) {
        let Some(root) = &self.root else {
            return;
        };
        let mut ctx =
            PaintContext::new(canvas, cull_rect).with_integral_transform(integral_transform);
        if !ctx.content_culled(root.paint_bounds()) {
            root.paint(&mut ctx);
        }
    }
}
