// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recorded drawing content and the layer that places it.

use alloc::sync::Arc;
use alloc::vec::Vec;

use kurbo::{Point, Rect, RoundedRect, Shape, Vec2};
use peniko::Color;
use understory_layer_diff::{DiffContext, LayerId};
use understory_matrix_clip::Matrix;
use understory_matrix_clip::rect::join;

use crate::{Layer, LayerIdentity, PaintContext, PrerollContext, mark_dirty_if, old_as};

/// Pictures with more ops than this are never compared op by op.
pub const MAX_OPS_TO_COMPARE: usize = 200;

/// One drawing command in a [`Picture`].
#[derive(Clone, Debug, PartialEq)]
pub enum PictureOp {
    /// Fill a rectangle.
    FillRect {
        /// Rectangle in picture space.
        rect: Rect,
        /// Fill color.
        color: Color,
    },
    /// Fill a rounded rectangle.
    FillRoundedRect {
        /// Shape in picture space.
        rect: RoundedRect,
        /// Fill color.
        color: Color,
    },
    /// Stroke the outline of a rectangle.
    StrokeRect {
        /// Rectangle in picture space.
        rect: Rect,
        /// Stroke width.
        width: f64,
        /// Stroke color.
        color: Color,
    },
}

impl PictureOp {
    /// Conservative bounds of what the op touches.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        match self {
            Self::FillRect { rect, .. } => *rect,
            Self::FillRoundedRect { rect, .. } => rect.bounding_box(),
            Self::StrokeRect { rect, width, .. } => rect.inflate(width * 0.5, width * 0.5),
        }
    }
}

/// An immutable list of drawing commands with precomputed bounds.
///
/// Pictures are shared with [`Arc`]; two layers holding the same `Arc` are
/// known to draw the same thing without comparing ops.
#[derive(Clone, Debug, PartialEq)]
pub struct Picture {
    ops: Vec<PictureOp>,
    bounds: Rect,
}

impl Picture {
    /// Creates a picture from its ops.
    #[must_use]
    pub fn new(ops: Vec<PictureOp>) -> Self {
        let bounds = ops.iter().map(PictureOp::bounds).fold(Rect::ZERO, join);
        Self { ops, bounds }
    }

    /// The recorded ops.
    #[must_use]
    pub fn ops(&self) -> &[PictureOp] {
        &self.ops
    }

    /// Number of recorded ops.
    #[must_use]
    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    /// Union of all op bounds, in picture space.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }
}

/// Draws a shared [`Picture`] at an offset.
#[derive(Debug)]
pub struct PictureLayer {
    identity: LayerIdentity,
    offset: Point,
    picture: Arc<Picture>,
}

impl PictureLayer {
    /// Creates a picture layer.
    #[must_use]
    pub fn new(offset: Point, picture: Arc<Picture>) -> Self {
        Self {
            identity: LayerIdentity::new(),
            offset,
            picture,
        }
    }

    /// Marks this layer as the replacement of `old` in the tree.
    #[must_use]
    pub fn replacing(mut self, old: &dyn Layer) -> Self {
        self.identity = LayerIdentity::replacing(old);
        self
    }

    /// The picture drawn by this layer.
    #[must_use]
    pub fn picture(&self) -> &Arc<Picture> {
        &self.picture
    }

    /// Offset of the picture in parent space.
    #[must_use]
    pub fn offset(&self) -> Point {
        self.offset
    }

    fn offset_vec(&self) -> Vec2 {
        self.offset.to_vec2()
    }

    fn same_content(&self, ctx: &mut DiffContext<'_>, old: &Self) -> bool {
        let stats = ctx.statistics_mut();
        if Arc::ptr_eq(&self.picture, &old.picture) {
            stats.add_same_instance_picture();
            return true;
        }
        if self.picture.op_count() > MAX_OPS_TO_COMPARE
            || old.picture.op_count() > MAX_OPS_TO_COMPARE
        {
            stats.add_picture_too_complex_to_compare();
            return false;
        }
        stats.add_deep_compare_picture();
        let equal = self.picture == old.picture;
        if equal {
            stats.add_different_instance_but_equal_picture();
        }
        equal
    }
}

impl Layer for PictureLayer {
    fn unique_id(&self) -> LayerId {
        self.identity.unique
    }

    fn original_layer_id(&self) -> LayerId {
        self.identity.original
    }

    fn paint_bounds(&self) -> Rect {
        self.picture.bounds() + self.offset_vec()
    }

    fn diff(&self, ctx: &mut DiffContext<'_>, old: Option<&dyn Layer>) {
        ctx.with_subtree(|ctx| {
            let changed = match old_as::<Self>(old) {
                Some(prev) => prev.offset != self.offset || !self.same_content(ctx, prev),
                None => {
                    ctx.statistics_mut().add_new_picture();
                    true
                }
            };
            mark_dirty_if(ctx, old, changed);
            ctx.push_transform(&Matrix::translate(self.offset.x, self.offset.y));
            ctx.will_paint_with_integral_transform();
            ctx.add_layer_bounds(self.picture.bounds());
            let region = ctx.current_subtree_region();
            ctx.set_layer_paint_region(self.unique_id(), region);
        });
    }

    fn preroll(&self, _ctx: &mut PrerollContext) {}

    fn paint(&self, ctx: &mut PaintContext<'_>) {
        let offset = Matrix::translate(self.offset.x, self.offset.y);
        ctx.save();
        ctx.transform(&offset);
        ctx.make_transform_integral();
        ctx.canvas().draw_picture(&self.picture);
        ctx.restore();
    }
}
