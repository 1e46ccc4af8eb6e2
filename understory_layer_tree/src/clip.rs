// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clipping layers.

use kurbo::{BezPath, Ellipse, Rect, RoundedRect, Shape};
use understory_layer_diff::{DiffContext, LayerId};
use understory_matrix_clip::rect::intersect_or_empty;
use understory_matrix_clip::{ClipOp, MatrixClipState};

use crate::{
    ContainerLayer, Layer, PaintContext, PrerollContext, SaveLayer, mark_dirty_if, old_as,
};

/// Geometry of a clip, in local coordinates.
#[derive(Clone, Debug, PartialEq)]
pub enum ClipShape {
    /// An axis-aligned rectangle.
    Rect(Rect),
    /// The ellipse inscribed in a rectangle.
    Oval(Rect),
    /// A rounded rectangle.
    RoundedRect(RoundedRect),
    /// An arbitrary path (non-zero fill).
    Path(BezPath),
}

impl ClipShape {
    /// Bounding box of the shape.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        match self {
            Self::Rect(rect) | Self::Oval(rect) => *rect,
            Self::RoundedRect(rrect) => rrect.rect(),
            Self::Path(path) => path.bounding_box(),
        }
    }

    /// Applies the clip to a tracked state.
    pub fn apply(&self, state: &mut MatrixClipState, op: ClipOp, anti_alias: bool) {
        match self {
            Self::Rect(rect) => state.clip_rect(*rect, op, anti_alias),
            Self::Oval(bounds) => state.clip_oval(*bounds, op, anti_alias),
            Self::RoundedRect(rrect) => state.clip_rrect(rrect, op, anti_alias),
            Self::Path(path) => state.clip_path(path, op, anti_alias),
        }
    }

    /// Whether the shape covers the state's whole cull rect, making the clip redundant.
    ///
    /// Paths are never considered covering.
    #[must_use]
    pub fn covers_cull(&self, state: &MatrixClipState) -> bool {
        match self {
            Self::Rect(rect) => state.rect_covers_cull(*rect),
            Self::Oval(bounds) => state.oval_covers_cull(*bounds),
            Self::RoundedRect(rrect) => state.rrect_covers_cull(rrect),
            Self::Path(_) => false,
        }
    }

    /// The shape as a path, for canvases that only clip to paths.
    #[must_use]
    pub fn to_path(&self, tolerance: f64) -> BezPath {
        match self {
            Self::Rect(rect) => rect.to_path(tolerance),
            Self::Oval(bounds) => Ellipse::from_rect(*bounds).to_path(tolerance),
            Self::RoundedRect(rrect) => rrect.to_path(tolerance),
            Self::Path(path) => path.clone(),
        }
    }
}

/// How a [`ClipLayer`] clips its children.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ClipBehavior {
    /// Pixel-aligned clip without anti-aliasing.
    HardEdge,
    /// Anti-aliased clip.
    #[default]
    AntiAlias,
    /// Anti-aliased clip with an intermediate layer, which avoids bleeding
    /// at the clip edge at the cost of an offscreen pass.
    AntiAliasWithSaveLayer,
}

impl ClipBehavior {
    /// Whether the clip is anti-aliased.
    #[must_use]
    pub fn is_anti_aliased(self) -> bool {
        !matches!(self, Self::HardEdge)
    }

    /// Whether the clip paints through a save layer.
    #[must_use]
    pub fn uses_save_layer(self) -> bool {
        matches!(self, Self::AntiAliasWithSaveLayer)
    }
}

/// Clips its children to a [`ClipShape`].
#[derive(Debug)]
pub struct ClipLayer {
    container: ContainerLayer,
    shape: ClipShape,
    behavior: ClipBehavior,
    paint_bounds: Rect,
}

impl ClipLayer {
    /// Creates a clip layer over `container`'s children.
    #[must_use]
    pub fn new(shape: ClipShape, behavior: ClipBehavior, container: ContainerLayer) -> Self {
        let paint_bounds = intersect_or_empty(container.paint_bounds(), shape.bounds());
        Self {
            container,
            shape,
            behavior,
            paint_bounds,
        }
    }

    /// The clip geometry.
    #[must_use]
    pub fn shape(&self) -> &ClipShape {
        &self.shape
    }

    /// The clip behavior.
    #[must_use]
    pub fn behavior(&self) -> ClipBehavior {
        self.behavior
    }
}

impl Layer for ClipLayer {
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
                prev.is_none_or(|prev| prev.behavior != self.behavior || prev.shape != self.shape);
            mark_dirty_if(ctx, old, changed);
            if self.behavior.uses_save_layer() && ctx.has_raster_cache() {
                ctx.will_paint_with_integral_transform();
            }
            if ctx.push_cull_rect(self.shape.bounds(), self.behavior.is_anti_aliased()) {
                self.container
                    .diff_children(ctx, prev.map(|prev| &prev.container));
            }
            let region = ctx.current_subtree_region();
            ctx.set_layer_paint_region(self.unique_id(), region);
        });
    }

    fn preserve_paint_region(&self, ctx: &mut DiffContext<'_>) {
        self.container.preserve_paint_region(ctx);
    }

    fn preroll(&self, ctx: &mut PrerollContext) {
        ctx.with_save(|ctx| {
            let anti_alias = self.behavior.is_anti_aliased();
            self.shape
                .apply(ctx.state_mut(), ClipOp::Intersect, anti_alias);
            if !ctx.is_cull_rect_empty() {
                self.container.preroll_children(ctx);
            }
        });
    }

    fn paint(&self, ctx: &mut PaintContext<'_>) {
        ctx.save();
        if !self.shape.covers_cull(ctx.state()) {
            ctx.clip(&self.shape, self.behavior.is_anti_aliased());
        }
        if self.behavior.uses_save_layer() {
            ctx.make_transform_integral();
            ctx.save_layer(SaveLayer::new().with_bounds(self.paint_bounds));
            self.container.paint_children(ctx);
            ctx.restore();
        } else {
            self.container.paint_children(ctx);
        }
        ctx.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_bounds() {
        let rrect = RoundedRect::new(0.0, 0.0, 20.0, 10.0, 3.0);
        assert_eq!(
            ClipShape::RoundedRect(rrect).bounds(),
            Rect::new(0.0, 0.0, 20.0, 10.0)
        );
        let path = Rect::new(1.0, 2.0, 3.0, 4.0).to_path(0.1);
        assert_eq!(ClipShape::Path(path).bounds(), Rect::new(1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn paths_never_cover() {
        let state = MatrixClipState::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        let path = Rect::new(-100.0, -100.0, 100.0, 100.0).to_path(0.1);
        assert!(!ClipShape::Path(path).covers_cull(&state));
        assert!(ClipShape::Rect(Rect::new(-100.0, -100.0, 100.0, 100.0)).covers_cull(&state));
    }

    #[test]
    fn behavior_flags() {
        assert!(!ClipBehavior::HardEdge.is_anti_aliased());
        assert!(ClipBehavior::AntiAlias.is_anti_aliased());
        assert!(ClipBehavior::AntiAliasWithSaveLayer.uses_save_layer());
        assert!(!ClipBehavior::AntiAlias.uses_save_layer());
    }
}
