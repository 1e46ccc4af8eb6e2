// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Walk state for the preroll and paint passes.

use core::fmt;

use kurbo::Rect;
use understory_matrix_clip::rect::intersects;
use understory_matrix_clip::{ClipOp, Matrix, MatrixClipState, MatrixClipTracker};

use crate::{Canvas, ClipShape, SaveLayer};

/// State threaded through [`Layer::preroll`](crate::Layer::preroll).
///
/// Preroll runs before paint with the same cull rect. It tells the
/// compositor whether the frame needs a surface it can read back from and
/// whether any texture layer is visible.
#[derive(Clone, Debug)]
pub struct PrerollContext {
    tracker: MatrixClipTracker,
    surface_needs_readback: bool,
    has_texture_layer: bool,
}

impl PrerollContext {
    /// Creates a context culled to the device rect `cull_rect`.
    #[must_use]
    pub fn new(cull_rect: Rect) -> Self {
        Self {
            tracker: MatrixClipTracker::new(cull_rect),
            surface_needs_readback: false,
            has_texture_layer: false,
        }
    }

    /// The current transform and cull rect.
    #[must_use]
    pub fn state(&self) -> &MatrixClipState {
        self.tracker.current()
    }

    /// Mutable access to the current transform and cull rect.
    pub fn state_mut(&mut self) -> &mut MatrixClipState {
        self.tracker.current_mut()
    }

    /// Composes `matrix` onto the current transform.
    pub fn transform(&mut self, matrix: &Matrix) {
        self.tracker.current_mut().transform(matrix);
    }

    /// Whether clipping has removed everything.
    #[must_use]
    pub fn is_cull_rect_empty(&self) -> bool {
        self.tracker.current().is_cull_rect_empty()
    }

    /// Runs `f` with the transform and cull rect restored afterwards.
    pub fn with_save<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let count = self.tracker.save();
        let result = f(self);
        self.tracker.restore_to_count(count);
        result
    }

    /// Records that some layer reads back from the surface.
    pub fn mark_surface_needs_readback(&mut self) {
        self.surface_needs_readback = true;
    }

    /// Whether some layer reads back from the surface.
    #[must_use]
    pub fn surface_needs_readback(&self) -> bool {
        self.surface_needs_readback
    }

    /// Records that a visible texture layer exists.
    pub fn mark_has_texture_layer(&mut self) {
        self.has_texture_layer = true;
    }

    /// Whether a visible texture layer exists.
    #[must_use]
    pub fn has_texture_layer(&self) -> bool {
        self.has_texture_layer
    }
}

/// State threaded through [`Layer::paint`](crate::Layer::paint).
///
/// Mirrors every save, transform and clip onto both the canvas and a tracked
/// [`MatrixClipState`], so layers can skip content outside the cull rect and
/// skip clips that would not remove anything.
///
/// With integral transforms enabled, layers that the diff records at
/// whole-pixel offsets snap the canvas the same way before drawing.
pub struct PaintContext<'a> {
    canvas: &'a mut dyn Canvas,
    tracker: MatrixClipTracker,
    integral_transform: bool,
}

impl fmt::Debug for PaintContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaintContext")
            .field("tracker", &self.tracker)
            .field("integral_transform", &self.integral_transform)
            .finish_non_exhaustive()
    }
}

impl<'a> PaintContext<'a> {
    /// Creates a context painting into `canvas`, culled to the device rect `cull_rect`.
    #[must_use]
    pub fn new(canvas: &'a mut dyn Canvas, cull_rect: Rect) -> Self {
        Self {
            canvas,
            tracker: MatrixClipTracker::new(cull_rect),
            integral_transform: false,
        }
    }

    /// Enables whole-pixel snapping for layers that request it.
    ///
    /// Must agree with the diff: on when a raster cache is in use and
    /// Impeller is not.
    #[must_use]
    pub fn with_integral_transform(mut self, integral_transform: bool) -> Self {
        self.integral_transform = integral_transform;
        self
    }

    /// Whether whole-pixel snapping is enabled.
    #[must_use]
    pub fn integral_transform(&self) -> bool {
        self.integral_transform
    }

    /// The canvas being painted.
    pub fn canvas(&mut self) -> &mut dyn Canvas {
        &mut *self.canvas
    }

    /// The current transform and cull rect.
    #[must_use]
    pub fn state(&self) -> &MatrixClipState {
        self.tracker.current()
    }

    /// Whether content with these local bounds is outside the cull rect.
    ///
    /// With integral transforms, descendants may be drawn up to a pixel away
    /// from where the current transform puts them, so the check allows that
    /// much slack.
    #[must_use]
    pub fn content_culled(&self, local_bounds: Rect) -> bool {
        let state = self.tracker.current();
        if !self.integral_transform {
            return state.content_culled(local_bounds);
        }
        let device = state.map_rect(local_bounds).inflate(1.0, 1.0);
        !intersects(device, state.device_cull_rect())
    }

    /// Saves canvas and tracked state.
    pub fn save(&mut self) {
        self.tracker.save();
        self.canvas.save();
    }

    /// Saves tracked state and starts an offscreen layer.
    pub fn save_layer(&mut self, layer: SaveLayer) {
        self.tracker.save();
        self.canvas.save_layer(layer);
    }

    /// Restores canvas and tracked state.
    pub fn restore(&mut self) {
        self.canvas.restore();
        self.tracker.restore();
    }

    /// Composes `matrix` onto the canvas and tracked transform.
    pub fn transform(&mut self, matrix: &Matrix) {
        self.tracker.current_mut().transform(matrix);
        self.canvas.transform(matrix);
    }

    /// Rounds the translation of a scale-translate transform to whole pixels.
    ///
    /// Does nothing unless integral transforms are enabled.
    pub fn make_transform_integral(&mut self) {
        if !self.integral_transform {
            return;
        }
        if let Some(matrix) = self.tracker.matrix().with_integral_translation() {
            self.tracker.current_mut().set_transform(matrix);
            self.canvas.set_transform(&matrix);
        }
    }

    /// Intersects the canvas and tracked clip with `shape`.
    pub fn clip(&mut self, shape: &ClipShape, anti_alias: bool) {
        shape.apply(self.tracker.current_mut(), ClipOp::Intersect, anti_alias);
        self.canvas.clip(shape, ClipOp::Intersect, anti_alias);
    }
}
