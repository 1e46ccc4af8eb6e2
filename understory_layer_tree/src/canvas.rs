// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The drawing surface layers paint into.

use alloc::sync::Arc;
use alloc::vec::Vec;

use kurbo::Rect;
use peniko::Color;
use understory_matrix_clip::{ClipOp, Matrix};

use crate::{ClipShape, ImageFilter, Picture};

/// Parameters for an offscreen layer pushed with [`Canvas::save_layer`].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SaveLayer {
    /// Optional bounds hint, in local coordinates.
    pub bounds: Option<Rect>,
    /// Opacity applied when compositing the layer back (`255` is opaque).
    pub alpha: Option<u8>,
    /// Filter applied to the layer's content when compositing.
    pub filter: Option<ImageFilter>,
    /// Filter applied to the backdrop before the layer's content is drawn.
    pub backdrop: Option<ImageFilter>,
}

impl SaveLayer {
    /// A plain save layer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bounds hint.
    #[must_use]
    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Sets the opacity.
    #[must_use]
    pub fn with_alpha(mut self, alpha: u8) -> Self {
        self.alpha = Some(alpha);
        self
    }

    /// Sets the content filter.
    #[must_use]
    pub fn with_filter(mut self, filter: ImageFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Sets the backdrop filter.
    #[must_use]
    pub fn with_backdrop(mut self, filter: ImageFilter) -> Self {
        self.backdrop = Some(filter);
        self
    }
}

/// A drawing backend.
///
/// The canvas keeps its own transform and clip stack; `save`, `save_layer`
/// and `restore` must be balanced by the caller.
pub trait Canvas {
    /// Pushes the transform and clip.
    fn save(&mut self);

    /// Pushes the transform and clip and starts an offscreen layer.
    fn save_layer(&mut self, layer: SaveLayer);

    /// Pops the most recent `save` or `save_layer`.
    fn restore(&mut self);

    /// Composes `matrix` onto the current transform.
    fn transform(&mut self, matrix: &Matrix);

    /// Replaces the current transform.
    fn set_transform(&mut self, matrix: &Matrix);

    /// Intersects (or subtracts) a shape from the clip.
    fn clip(&mut self, shape: &ClipShape, op: ClipOp, anti_alias: bool);

    /// Replaces every pixel inside the clip with `color`.
    fn clear(&mut self, color: Color);

    /// Draws a recorded picture.
    fn draw_picture(&mut self, picture: &Arc<Picture>);

    /// Draws an external texture into `bounds`.
    ///
    /// A frozen texture keeps showing its last frame.
    fn draw_texture(&mut self, texture_id: u64, bounds: Rect, freeze: bool);
}

/// A call recorded by [`RecordingCanvas`].
#[derive(Clone, Debug, PartialEq)]
pub enum CanvasOp {
    /// [`Canvas::save`].
    Save,
    /// [`Canvas::save_layer`].
    SaveLayer(SaveLayer),
    /// [`Canvas::restore`].
    Restore,
    /// [`Canvas::transform`].
    Transform(Matrix),
    /// [`Canvas::set_transform`].
    SetTransform(Matrix),
    /// [`Canvas::clip`].
    Clip {
        /// Clip geometry.
        shape: ClipShape,
        /// Combine mode.
        op: ClipOp,
        /// Whether edges are anti-aliased.
        anti_alias: bool,
    },
    /// [`Canvas::clear`].
    Clear(Color),
    /// [`Canvas::draw_picture`].
    DrawPicture(Arc<Picture>),
    /// [`Canvas::draw_texture`].
    DrawTexture {
        /// Texture to draw.
        texture_id: u64,
        /// Destination bounds.
        bounds: Rect,
        /// Whether the texture is frozen.
        freeze: bool,
    },
}

/// A [`Canvas`] that records every call, for tests and inspection.
#[derive(Clone, Debug, Default)]
pub struct RecordingCanvas {
    ops: Vec<CanvasOp>,
    depth: usize,
}

impl RecordingCanvas {
    /// Creates an empty recording.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded calls, oldest first.
    #[must_use]
    pub fn ops(&self) -> &[CanvasOp] {
        &self.ops
    }

    /// Number of unbalanced saves.
    #[must_use]
    pub fn save_depth(&self) -> usize {
        self.depth
    }

    /// Pictures drawn, in order.
    pub fn pictures(&self) -> impl Iterator<Item = &Arc<Picture>> + '_ {
        self.ops.iter().filter_map(|op| match op {
            CanvasOp::DrawPicture(picture) => Some(picture),
            _ => None,
        })
    }

    /// Takes the recorded calls, leaving the canvas empty.
    pub fn take_ops(&mut self) -> Vec<CanvasOp> {
        core::mem::take(&mut self.ops)
    }
}

impl Canvas for RecordingCanvas {
    fn save(&mut self) {
        self.depth += 1;
        self.ops.push(CanvasOp::Save);
    }

    fn save_layer(&mut self, layer: SaveLayer) {
        self.depth += 1;
        self.ops.push(CanvasOp::SaveLayer(layer));
    }

    fn restore(&mut self) {
        assert!(self.depth > 0, "RecordingCanvas::restore without a matching save");
        self.depth -= 1;
        self.ops.push(CanvasOp::Restore);
    }

    fn transform(&mut self, matrix: &Matrix) {
        self.ops.push(CanvasOp::Transform(*matrix));
    }

    fn set_transform(&mut self, matrix: &Matrix) {
        self.ops.push(CanvasOp::SetTransform(*matrix));
    }

    fn clip(&mut self, shape: &ClipShape, op: ClipOp, anti_alias: bool) {
        self.ops.push(CanvasOp::Clip {
            shape: shape.clone(),
            op,
            anti_alias,
        });
    }

    fn clear(&mut self, color: Color) {
        self.ops.push(CanvasOp::Clear(color));
    }

    fn draw_picture(&mut self, picture: &Arc<Picture>) {
        self.ops.push(CanvasOp::DrawPicture(picture.clone()));
    }

    fn draw_texture(&mut self, texture_id: u64, bounds: Rect, freeze: bool) {
        self.ops.push(CanvasOp::DrawTexture {
            texture_id,
            bounds,
            freeze,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_in_order() {
        let mut canvas = RecordingCanvas::new();
        canvas.save();
        canvas.transform(&Matrix::translate(1.0, 2.0));
        canvas.save_layer(SaveLayer::new().with_alpha(128));
        canvas.clear(Color::TRANSPARENT);
        canvas.restore();
        canvas.restore();
        assert_eq!(canvas.save_depth(), 0);
        assert_eq!(
            canvas.ops(),
            &[
                CanvasOp::Save,
                CanvasOp::Transform(Matrix::translate(1.0, 2.0)),
                CanvasOp::SaveLayer(SaveLayer {
                    alpha: Some(128),
                    ..SaveLayer::default()
                }),
                CanvasOp::Clear(Color::TRANSPARENT),
                CanvasOp::Restore,
                CanvasOp::Restore,
            ]
        );
    }

    #[test]
    #[should_panic(expected = "without a matching save")]
    fn unbalanced_restore_panics() {
        RecordingCanvas::new().restore();
    }
}
