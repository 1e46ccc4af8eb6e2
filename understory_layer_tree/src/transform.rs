// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transform and opacity layers.

use kurbo::{Point, Rect};
use understory_layer_diff::{DiffContext, LayerId};
use understory_matrix_clip::Matrix;

use crate::{
    ContainerLayer, Layer, PaintContext, PrerollContext, SaveLayer, mark_dirty_if, old_as,
};

/// Applies a transform to its children.
#[derive(Debug)]
pub struct TransformLayer {
    container: ContainerLayer,
    transform: Matrix,
    paint_bounds: Rect,
}

impl TransformLayer {
    /// Creates a transform layer over `container`'s children.
    #[must_use]
    pub fn new(transform: Matrix, container: ContainerLayer) -> Self {
        let paint_bounds = transform.map_rect(container.paint_bounds());
        Self {
            container,
            transform,
            paint_bounds,
        }
    }

    /// The applied transform.
    #[must_use]
    pub fn transform(&self) -> &Matrix {
        &self.transform
    }

    /// The transformed children.
    #[must_use]
    pub fn container(&self) -> &ContainerLayer {
        &self.container
    }
}

impl Layer for TransformLayer {
    fn unique_id(&self) -> LayerId {
        self.container.unique_id()
    }

    fn original_layer_id(&self) -> LayerId {
        self.container.original_layer_id()
    }

    fn paint_bounds(&self) -> Rect {
        self.paint_bounds
    }

    fn diff(&self, ctx: &mut DiffContext<'_>, old: Option<&dyn Layer>) {
        ctx.with_subtree(|ctx| {
            let prev = old_as::<Self>(old);
            let changed = prev.is_none_or(|prev| prev.transform != self.transform);
            mark_dirty_if(ctx, old, changed);
            ctx.push_transform(&self.transform);
            self.container
                .diff_children(ctx, prev.map(|prev| &prev.container));
            let region = ctx.current_subtree_region();
            ctx.set_layer_paint_region(self.unique_id(), region);
        });
    }

    fn preserve_paint_region(&self, ctx: &mut DiffContext<'_>) {
        self.container.preserve_paint_region(ctx);
    }

    fn preroll(&self, ctx: &mut PrerollContext) {
        ctx.with_save(|ctx| {
            ctx.transform(&self.transform);
            self.container.preroll_children(ctx);
        });
    }

    fn paint(&self, ctx: &mut PaintContext<'_>) {
        ctx.save();
        ctx.transform(&self.transform);
        self.container.paint_children(ctx);
        ctx.restore();
    }
}

/// Composites its children at reduced opacity, offset by `offset`.
#[derive(Debug)]
pub struct OpacityLayer {
    container: ContainerLayer,
    alpha: u8,
    offset: Point,
    paint_bounds: Rect,
}

impl OpacityLayer {
    /// Creates an opacity layer. `alpha` of `255` is fully opaque.
    #[must_use]
    pub fn new(alpha: u8, offset: Point, container: ContainerLayer) -> Self {
        let paint_bounds = container.paint_bounds() + offset.to_vec2();
        Self {
            container,
            alpha,
            offset,
            paint_bounds,
        }
    }

    /// The opacity.
    #[must_use]
    pub fn alpha(&self) -> u8 {
        self.alpha
    }
}

impl Layer for OpacityLayer {
    fn unique_id(&self) -> LayerId {
        self.container.unique_id()
    }

    fn original_layer_id(&self) -> LayerId {
        self.container.original_layer_id()
    }

    fn paint_bounds(&self) -> Rect {
        self.paint_bounds
    }

    fn diff(&self, ctx: &mut DiffContext<'_>, old: Option<&dyn Layer>) {
        ctx.with_subtree(|ctx| {
            let prev = old_as::<Self>(old);
            let changed =
                prev.is_none_or(|prev| prev.alpha != self.alpha || prev.offset != self.offset);
            mark_dirty_if(ctx, old, changed);
            ctx.push_transform(&Matrix::translate(self.offset.x, self.offset.y));
            if ctx.has_raster_cache() {
                ctx.will_paint_with_integral_transform();
            }
            self.container
                .diff_children(ctx, prev.map(|prev| &prev.container));
            let region = ctx.current_subtree_region();
            ctx.set_layer_paint_region(self.unique_id(), region);
        });
    }

    fn preserve_paint_region(&self, ctx: &mut DiffContext<'_>) {
        self.container.preserve_paint_region(ctx);
    }

    fn preroll(&self, ctx: &mut PrerollContext) {
        ctx.with_save(|ctx| {
            ctx.transform(&Matrix::translate(self.offset.x, self.offset.y));
            self.container.preroll_children(ctx);
        });
    }

    fn paint(&self, ctx: &mut PaintContext<'_>) {
        ctx.save();
        ctx.transform(&Matrix::translate(self.offset.x, self.offset.y));
        ctx.make_transform_integral();
        if self.alpha == u8::MAX {
            self.container.paint_children(ctx);
        } else {
            let bounds = self.container.paint_bounds();
            ctx.save_layer(SaveLayer::new().with_bounds(bounds).with_alpha(self.alpha));
            self.container.paint_children(ctx);
            ctx.restore();
        }
        ctx.restore();
    }
}
